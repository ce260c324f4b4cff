//! Artifact identity, versions and licenses
//!
//! Specification formats:
//! - `group:name:version` (project = name, type = `jar`)
//! - `group:name:version:type` (project = name)
//! - `group:project:name:version:type`
//!
//! Exclusions omit the version: `group:name`, `group:project:name` or
//! `group:project:name:type`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dependencies::Dependencies;

/// Default artifact type when a specification omits it
pub const DEFAULT_TYPE: &str = "jar";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Invalid version [{0}]. Versions must be semantic (major.minor.patch)")]
    NotSemantic(String),

    #[error(
        "Invalid version [{version}] for artifact [{artifact}]. The version is not semantic. \
         Add a mapping to the workflow like this:\n\n  [workflow.mappings]\n  \"{artifact}\" = \"1.0.0\""
    )]
    MissingMapping { artifact: String, version: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error(
        "Invalid artifact specification [{0}]. It must look like `group:name:version`, \
         `group:name:version:type` or `group:project:name:version:type`"
    )]
    InvalidSpec(String),

    #[error("Invalid exclusion [{0}]. It must look like `group:name`, `group:project:name` or `group:project:name:type`")]
    InvalidExclusion(String),

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// A semantic version (`major.minor.patch[-prerelease][+build]`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(semver::Version);

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    /// Parses a semantic version. `1` and `1.2` are accepted and padded
    /// with zeros.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(version) = semver::Version::parse(s) {
            return Ok(Self(version));
        }

        let parts: Vec<&str> = s.split('.').collect();
        let numeric = |part: &&str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        if parts.len() < 3 && parts.iter().all(numeric) {
            let mut padded = parts.join(".");
            for _ in parts.len()..3 {
                padded.push_str(".0");
            }
            if let Ok(version) = semver::Version::parse(&padded) {
                return Ok(Self(version));
            }
        }

        Err(VersionError::NotSemantic(s.to_string()))
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

/// A license identifier such as `ApacheV2_0` or `BSD`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct License {
    pub identifier: String,
}

impl License {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

/// Identity of a publishable unit, independent of its version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId {
    pub group: String,
    pub project: String,
    pub name: String,
    pub artifact_type: String,
}

impl ArtifactId {
    pub fn new(
        group: impl Into<String>,
        project: impl Into<String>,
        name: impl Into<String>,
        artifact_type: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            project: project.into(),
            name: name.into(),
            artifact_type: artifact_type.into(),
        }
    }

    /// Returns the `group:project` key used by version mappings
    fn mapping_key(&self, version: &str) -> String {
        format!("{}:{}:{}", self.group, self.project, version)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.group, self.project, self.name, self.artifact_type)
    }
}

impl FromStr for ArtifactId {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(ArtifactError::InvalidExclusion(s.to_string()));
        }

        match parts.as_slice() {
            [group, name] => Ok(Self::new(*group, *name, *name, DEFAULT_TYPE)),
            [group, project, name] => Ok(Self::new(*group, *project, *name, DEFAULT_TYPE)),
            [group, project, name, artifact_type] => Ok(Self::new(*group, *project, *name, *artifact_type)),
            _ => Err(ArtifactError::InvalidExclusion(s.to_string())),
        }
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = ArtifactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.to_string()
    }
}

/// Tables that turn non-semantic upstream versions into semantic ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMappings {
    /// `group:project:raw-version` -> semantic version
    pub mappings: HashMap<String, Version>,

    /// `group:project:range` -> concrete version string
    pub range_mappings: HashMap<String, String>,
}

impl VersionMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, key: impl Into<String>, version: Version) -> Self {
        self.mappings.insert(key.into(), version);
        self
    }

    pub fn map_range(mut self, key: impl Into<String>, version: impl Into<String>) -> Self {
        self.range_mappings.insert(key.into(), version.into());
        self
    }
}

/// A dependency requirement: identity, requested version and constraints
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub id: ArtifactId,
    pub version: Version,

    /// The upstream version string when it was not semantic
    pub non_semantic_version: Option<String>,

    /// Artifacts that must not be pulled in anywhere below this one
    pub exclusions: Vec<ArtifactId>,

    /// Exempts this request from version-conflict detection
    pub skip_compatibility_check: bool,
}

impl Artifact {
    pub fn new(id: ArtifactId, version: Version) -> Self {
        Self {
            id,
            version,
            non_semantic_version: None,
            exclusions: Vec::new(),
            skip_compatibility_check: false,
        }
    }

    /// Parses a specification that must carry a semantic version
    pub fn parse(spec: &str) -> Result<Self, ArtifactError> {
        Self::parse_with_mappings(spec, &VersionMappings::default())
    }

    /// Parses a specification, resolving a non-semantic version through the
    /// mapping tables
    pub fn parse_with_mappings(spec: &str, mappings: &VersionMappings) -> Result<Self, ArtifactError> {
        let parts: Vec<&str> = spec.trim().split(':').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(ArtifactError::InvalidSpec(spec.to_string()));
        }

        let (id, raw_version) = match parts.as_slice() {
            [group, name, version] => (ArtifactId::new(*group, *name, *name, DEFAULT_TYPE), *version),
            [group, name, version, artifact_type] => {
                (ArtifactId::new(*group, *name, *name, *artifact_type), *version)
            }
            [group, project, name, version, artifact_type] => {
                (ArtifactId::new(*group, *project, *name, *artifact_type), *version)
            }
            _ => return Err(ArtifactError::InvalidSpec(spec.to_string())),
        };

        let raw_version = mappings
            .range_mappings
            .get(&id.mapping_key(raw_version))
            .map(String::as_str)
            .unwrap_or(raw_version);

        match raw_version.parse::<Version>() {
            Ok(version) => Ok(Self::new(id, version)),
            Err(_) => {
                let key = id.mapping_key(raw_version);
                let version = mappings.mappings.get(&key).cloned().ok_or_else(|| VersionError::MissingMapping {
                    artifact: key.clone(),
                    version: raw_version.to_string(),
                })?;

                Ok(Self {
                    non_semantic_version: Some(raw_version.to_string()),
                    ..Self::new(id, version)
                })
            }
        }
    }

    pub fn with_exclusions(mut self, exclusions: impl IntoIterator<Item = ArtifactId>) -> Self {
        self.exclusions.extend(exclusions);
        self
    }

    pub fn skip_compatibility_check(mut self) -> Self {
        self.skip_compatibility_check = true;
        self
    }

    /// The version string used in repository paths
    pub fn repository_version(&self) -> String {
        self.non_semantic_version
            .clone()
            .unwrap_or_else(|| self.version.to_string())
    }

    /// Relative path of the artifact file: `group/project/version/name-version.type`
    ///
    /// Dots in the group become directory separators.
    pub fn artifact_path(&self) -> String {
        format!("{}/{}", self.directory(), self.artifact_file())
    }

    /// Relative path of the metadata record (AMD)
    pub fn metadata_path(&self) -> String {
        format!("{}.amd", self.artifact_path())
    }

    /// Relative path of the source archive
    pub fn source_path(&self) -> String {
        let version = self.repository_version();
        format!(
            "{}/{}-{}-src.{}",
            self.directory(),
            self.id.name,
            version,
            self.id.artifact_type
        )
    }

    fn directory(&self) -> String {
        format!(
            "{}/{}/{}",
            self.id.group.replace('.', "/"),
            self.id.project,
            self.repository_version()
        )
    }

    fn artifact_file(&self) -> String {
        format!("{}-{}.{}", self.id.name, self.repository_version(), self.id.artifact_type)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.id.group, self.id.project, self.id.name, self.version, self.id.artifact_type
        )
    }
}

impl FromStr for Artifact {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Metadata published beside an artifact: its licenses and the dependency
/// groups it exports to consumers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactMetaData {
    pub licenses: Vec<License>,
    pub dependencies: Dependencies,
}

impl ArtifactMetaData {
    pub fn new(dependencies: Dependencies, licenses: impl IntoIterator<Item = License>) -> Self {
        Self {
            licenses: licenses.into_iter().collect(),
            dependencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_short_form() {
        let artifact = Artifact::parse("org.example:foo:1.0.0").unwrap();

        assert_eq!(artifact.id, ArtifactId::new("org.example", "foo", "foo", "jar"));
        assert_eq!(artifact.version, Version::new(1, 0, 0));
        assert!(artifact.non_semantic_version.is_none());
    }

    #[test]
    fn parse_with_type() {
        let artifact = Artifact::parse("org.example:foo:1.0.0:zip").unwrap();
        assert_eq!(artifact.id.artifact_type, "zip");
        assert_eq!(artifact.id.project, "foo");
    }

    #[test]
    fn parse_full_form() {
        let artifact = Artifact::parse("org.example:foo:foo-api:2.1.0:jar").unwrap();
        assert_eq!(artifact.id.project, "foo");
        assert_eq!(artifact.id.name, "foo-api");
        assert_eq!(artifact.to_string(), "org.example:foo:foo-api:2.1.0:jar");
    }

    #[test]
    fn parse_invalid_spec() {
        assert!(matches!(Artifact::parse("org.example"), Err(ArtifactError::InvalidSpec(_))));
        assert!(matches!(Artifact::parse("a::1.0.0"), Err(ArtifactError::InvalidSpec(_))));
    }

    #[test]
    fn short_versions_are_padded() {
        assert_eq!("1.2".parse::<Version>().unwrap(), Version::new(1, 2, 0));
        assert_eq!("3".parse::<Version>().unwrap(), Version::new(3, 0, 0));
    }

    #[test]
    fn prerelease_versions_order_before_release() {
        let pre: Version = "1.0.0-RC1".parse().unwrap();
        let release: Version = "1.0.0".parse().unwrap();
        assert!(pre < release);
    }

    #[test]
    fn non_semantic_without_mapping_fails() {
        let err = Artifact::parse("org.badver:badver:1.0.0.Final").unwrap_err();

        match err {
            ArtifactError::Version(VersionError::MissingMapping { artifact, version }) => {
                assert_eq!(artifact, "org.badver:badver:1.0.0.Final");
                assert_eq!(version, "1.0.0.Final");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(Artifact::parse("org.badver:badver:1.0.0.Final")
            .unwrap_err()
            .to_string()
            .contains("workflow.mappings"));
    }

    #[test]
    fn non_semantic_with_mapping() {
        let mappings = VersionMappings::new().map("org.badver:badver:1.0.0.Final", Version::new(1, 0, 0));
        let artifact = Artifact::parse_with_mappings("org.badver:badver:1.0.0.Final", &mappings).unwrap();

        assert_eq!(artifact.version, Version::new(1, 0, 0));
        assert_eq!(artifact.non_semantic_version.as_deref(), Some("1.0.0.Final"));
        assert_eq!(
            artifact.artifact_path(),
            "org/badver/badver/1.0.0.Final/badver-1.0.0.Final.jar"
        );
    }

    #[test]
    fn range_mapping_then_semantic() {
        let mappings = VersionMappings::new().map_range("org.range:range:[1.0,2.0)", "1.5");
        let artifact = Artifact::parse_with_mappings("org.range:range:[1.0,2.0)", &mappings).unwrap();
        assert_eq!(artifact.version, Version::new(1, 5, 0));
    }

    #[test]
    fn repository_paths() {
        let artifact = Artifact::parse("org.savantbuild.test:multiple-versions:1.1.0").unwrap();

        assert_eq!(
            artifact.artifact_path(),
            "org/savantbuild/test/multiple-versions/1.1.0/multiple-versions-1.1.0.jar"
        );
        assert_eq!(
            artifact.metadata_path(),
            "org/savantbuild/test/multiple-versions/1.1.0/multiple-versions-1.1.0.jar.amd"
        );
        assert_eq!(
            artifact.source_path(),
            "org/savantbuild/test/multiple-versions/1.1.0/multiple-versions-1.1.0-src.jar"
        );
    }

    #[test]
    fn exclusion_forms() {
        assert_eq!(
            "org.example:foo".parse::<ArtifactId>().unwrap(),
            ArtifactId::new("org.example", "foo", "foo", "jar")
        );
        assert_eq!(
            "org.example:foo:bar:zip".parse::<ArtifactId>().unwrap(),
            ArtifactId::new("org.example", "foo", "bar", "zip")
        );
        assert!("org.example".parse::<ArtifactId>().is_err());
    }

    #[test]
    fn version_serde_as_string() {
        let json = serde_json::to_string(&Version::new(1, 2, 3)).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let parsed: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Version::new(1, 2, 3));
    }
}
