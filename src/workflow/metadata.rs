//! On-disk form of artifact metadata (AMD) records
//!
//! Stored as JSON beside the artifact (`<name>-<version>.<type>.amd`).
//! Versions are kept as the raw upstream strings so that consumers can
//! apply their own version mappings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    Artifact, ArtifactError, ArtifactId, ArtifactMetaData, Dependencies, DependencyGroup, License,
    VersionMappings,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetaDataRecord {
    #[serde(default)]
    pub licenses: Vec<License>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, GroupRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupRecord {
    #[serde(default = "default_export")]
    pub export: bool,

    #[serde(default)]
    pub dependencies: Vec<DependencyRecord>,
}

fn default_export() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DependencyRecord {
    /// Full specification: `group:project:name:version:type`
    pub id: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_compatibility_check: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<ArtifactId>,
}

impl DependencyRecord {
    pub fn from_artifact(artifact: &Artifact) -> Self {
        Self {
            id: format!(
                "{}:{}:{}:{}:{}",
                artifact.id.group,
                artifact.id.project,
                artifact.id.name,
                artifact.repository_version(),
                artifact.id.artifact_type
            ),
            skip_compatibility_check: artifact.skip_compatibility_check,
            exclusions: artifact.exclusions.clone(),
        }
    }
}

impl MetaDataRecord {
    pub fn from_metadata(metadata: &ArtifactMetaData) -> Self {
        let dependencies = metadata
            .dependencies
            .groups()
            .map(|group| {
                let record = GroupRecord {
                    export: group.export,
                    dependencies: group.dependencies.iter().map(DependencyRecord::from_artifact).collect(),
                };
                (group.name.clone(), record)
            })
            .collect();

        Self {
            licenses: metadata.licenses.clone(),
            dependencies,
        }
    }

    /// Converts the record into metadata, resolving non-semantic versions
    /// through `mappings`
    pub fn into_metadata(self, mappings: &VersionMappings) -> Result<ArtifactMetaData, ArtifactError> {
        let mut groups = Vec::with_capacity(self.dependencies.len());
        for (name, group) in self.dependencies {
            let mut artifacts = Vec::with_capacity(group.dependencies.len());
            for dependency in group.dependencies {
                let mut artifact = Artifact::parse_with_mappings(&dependency.id, mappings)?;
                artifact.skip_compatibility_check = dependency.skip_compatibility_check;
                artifact.exclusions = dependency.exclusions;
                artifacts.push(artifact);
            }
            groups.push(DependencyGroup::new(name, group.export, artifacts));
        }

        Ok(ArtifactMetaData::new(Dependencies::new(groups), self.licenses))
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
