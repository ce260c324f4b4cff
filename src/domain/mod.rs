//! Domain model for the build engine
//!
//! Artifacts, dependency declarations, targets and the project, plus the
//! generic graph both target scheduling and dependency resolution use.

mod artifact;
mod dependencies;
mod graph;
mod project;
mod target;

pub use artifact::{
    Artifact, ArtifactError, ArtifactId, ArtifactMetaData, License, Version, VersionError, VersionMappings,
    DEFAULT_TYPE,
};
pub use dependencies::{Dependencies, DependencyGroup};
pub use graph::{CyclicError, Graph, Traversal};
pub use project::{Project, ProjectHandle, Publication, Publications};
pub use target::{build_target_graph, Target, TargetAction};
