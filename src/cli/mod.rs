//! # Command-Line Interface
//!
//! The `sb` entry point.
//!
//! ```bash
//! sb [--file build.toml] [switches] [targets]
//! sb compile test --skipTests
//! sb --listTargets
//! ```
//!
//! `--file` must come before any switch or target; everything after the
//! first switch or target is handed to the runtime as is.
//!
//! ## Exit Status
//!
//! `0` on success. Each category of [`BuildError`](crate::error::BuildError)
//! has its own status, see [`BuildError::exit_code`](crate::error::BuildError::exit_code).
//!
//! ## Diagnostics
//!
//! Structured `tracing` events go to stderr, filtered by `RUST_LOG`
//! (`warn` by default, `debug` with `--debug`).

mod app;

pub use app::{run, Cli};
