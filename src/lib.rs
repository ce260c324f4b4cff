//! Savant - a dependency-resolving build tool
//!
//! Savant resolves a project's transitive artifact dependencies, fetches and
//! publishes artifacts through a chain of repositories, and runs a graph of
//! named build targets. Plugins are artifacts too, resolved the same way.

pub mod cli;
pub mod dependency;
pub mod domain;
pub mod error;
pub mod output;
pub mod parser;
pub mod plugin;
pub mod runtime;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use domain::{Artifact, ArtifactId, Project, ProjectHandle, Target, Version};
pub use error::BuildError;
