//! # Build File Parser
//!
//! Reads `build.toml` into a [`Project`](crate::domain::Project):
//!
//! 1. `${global.NAME}` references are replaced from `~/.savant/config.toml`
//! 2. project, workflow, dependencies and publications are read
//! 3. plugins are loaded, so they can add targets
//! 4. targets from the file are added and the target graph is built
//!
//! Malformed declarations fail with a [`BuildError::Parse`](crate::error::BuildError::Parse)
//! that shows the expected form.

mod build_file;
mod global;

pub use build_file::BuildFileParser;
pub use global::{savant_dir, GlobalConfiguration};
