//! Fatal build errors
//!
//! Every module has its own error type; they all end up here. Each variant
//! maps to a distinct process exit status.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::dependency::CompatibilityError;
use crate::domain::{ArtifactError, CyclicError, VersionError};
use crate::plugin::PluginLoadError;
use crate::workflow::ProcessError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Build file [{}] does not exist", .0.display())]
    MissingBuildFile(PathBuf),

    #[error("{0}")]
    Parse(String),

    #[error(transparent)]
    Cyclic(#[from] CyclicError),

    #[error("The artifact [{artifact}] could not be found in any of the configured repositories")]
    ArtifactMissing { artifact: String },

    #[error("The metadata (AMD) record for [{artifact}] could not be found in any of the configured repositories")]
    MetaDataMissing { artifact: String },

    #[error("Unable to fetch [{item}] from {process}: {source}")]
    ProcessFailure {
        item: String,
        process: String,
        #[source]
        source: ProcessError,
    },

    #[error("The digest of [{item}] from {process} does not match its record (expected {expected}, got {actual})")]
    DigestMismatch {
        item: String,
        process: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Compatibility(#[from] CompatibilityError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("Invalid target [{0}]. It does not exist in the build file")]
    UnknownTarget(String),

    #[error(transparent)]
    PluginLoad(#[from] PluginLoadError),

    #[error("Unable to publish [{item}] to {process}: {source}")]
    Publish {
        item: String,
        process: String,
        #[source]
        source: ProcessError,
    },

    #[error("Build failed: {0}")]
    BuildFailure(String),

    #[error("I/O error on [{}]: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// Process exit status for this category of failure
    pub fn exit_code(&self) -> u8 {
        match self {
            BuildError::MissingBuildFile(_) => 2,
            BuildError::Parse(_) => 3,
            BuildError::Cyclic(_) => 4,
            BuildError::ArtifactMissing { .. } => 5,
            BuildError::MetaDataMissing { .. } => 6,
            BuildError::ProcessFailure { .. } => 7,
            BuildError::DigestMismatch { .. } => 8,
            BuildError::Compatibility(_) => 9,
            BuildError::Version(_) => 10,
            BuildError::UnknownTarget(_) => 11,
            BuildError::PluginLoad(_) => 12,
            BuildError::Publish { .. } => 13,
            BuildError::BuildFailure(_) => 14,
            BuildError::Io { .. } => 15,
        }
    }
}

impl From<ArtifactError> for BuildError {
    fn from(error: ArtifactError) -> Self {
        match error {
            ArtifactError::Version(version) => BuildError::Version(version),
            other => BuildError::Parse(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let errors = [
            BuildError::MissingBuildFile(PathBuf::from("build.toml")),
            BuildError::Parse("bad".into()),
            BuildError::Cyclic(CyclicError {
                node: "a".into(),
                path: vec!["a".into(), "a".into()],
            }),
            BuildError::ArtifactMissing { artifact: "a".into() },
            BuildError::MetaDataMissing { artifact: "a".into() },
            BuildError::UnknownTarget("clear".into()),
            BuildError::BuildFailure("x".into()),
        ];

        let mut codes: Vec<u8> = errors.iter().map(BuildError::exit_code).collect();
        assert!(codes.iter().all(|code| *code > 1));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn version_errors_keep_their_category() {
        let err: BuildError = ArtifactError::Version(VersionError::NotSemantic("x".into())).into();
        assert_eq!(err.exit_code(), 10);

        let err: BuildError = ArtifactError::InvalidSpec("x".into()).into();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn unknown_target_names_the_target() {
        assert!(BuildError::UnknownTarget("clear".into()).to_string().contains("clear"));
    }
}
