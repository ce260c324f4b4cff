//! # Runtime
//!
//! Turns command-line arguments into a [`RuntimeConfiguration`] and runs the
//! requested targets of a parsed project.
//!
//! ## Arguments
//!
//! | Argument | Effect |
//! |----------|--------|
//! | `--noColor` | Plain output |
//! | `--debug` | Debug output |
//! | `--help` | Usage, switches and targets |
//! | `--listTargets` | Targets with their descriptions |
//! | `--version` | Tool version |
//! | `--name`, `--name=value` | Free switch, visible to plugins |
//! | anything else | Target to run |
//!
//! ## Scheduling
//!
//! [`ProjectRunner`] runs every dependency of a target before the target,
//! and never runs a target twice in one invocation.

mod configuration;
mod runner;

pub use configuration::{RuntimeConfiguration, Switches};
pub use runner::{BuildRunner, ProjectRunner};
