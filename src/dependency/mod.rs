//! # Dependency Resolution
//!
//! Three stages, each producing an immutable graph:
//!
//! | Stage | Function | Output |
//! |-------|----------|--------|
//! | Build | [`build_graph`] | [`DependencyGraph`], several versions per artifact |
//! | Reduce | [`reduce`] | [`ArtifactGraph`], one version per artifact |
//! | Resolve | [`resolve`] | [`ResolvedArtifactGraph`], a local file per artifact |
//!
//! [`DependencyService`] runs the stages against one workflow.

mod builder;
mod reducer;
mod resolver;
mod rules;

pub use builder::{build_graph, DependencyEdge, DependencyGraph};
pub use reducer::{reduce, ArtifactGraph, CompatibilityError};
pub use resolver::{resolve, Classpath, ResolvedArtifact, ResolvedArtifactGraph};
pub use rules::{TraversalRule, TraversalRules};

use crate::domain::{Artifact, Dependencies, Publication};
use crate::error::BuildError;
use crate::workflow::Workflow;

/// Dependency operations bound to a workflow
#[derive(Debug, Clone, Copy)]
pub struct DependencyService<'a> {
    workflow: &'a Workflow,
}

impl<'a> DependencyService<'a> {
    pub fn new(workflow: &'a Workflow) -> Self {
        Self { workflow }
    }

    pub fn build_graph(
        &self,
        root: &Artifact,
        dependencies: &Dependencies,
        rules: &TraversalRules,
    ) -> Result<DependencyGraph, BuildError> {
        build_graph(root, dependencies, self.workflow, rules)
    }

    pub fn reduce(&self, graph: &DependencyGraph) -> Result<ArtifactGraph, BuildError> {
        reduce(graph)
    }

    pub fn resolve(&self, graph: &ArtifactGraph, rules: &TraversalRules) -> Result<ResolvedArtifactGraph, BuildError> {
        resolve(graph, self.workflow, rules)
    }

    /// Builds and reduces in one go
    pub fn artifact_graph(
        &self,
        root: &Artifact,
        dependencies: &Dependencies,
        rules: &TraversalRules,
    ) -> Result<ArtifactGraph, BuildError> {
        self.reduce(&self.build_graph(root, dependencies, rules)?)
    }

    /// Publishes the file, optional source and metadata of a publication
    pub fn publish(&self, publication: &Publication) -> Result<(), BuildError> {
        tracing::debug!(artifact = %publication.artifact, "publishing");
        self.workflow.publish(
            &publication.artifact,
            &publication.metadata,
            &publication.file,
            publication.source.as_deref(),
        )
    }
}
