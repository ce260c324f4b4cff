//! Maven-layout package repository
//!
//! Artifacts are located with the Maven layout
//! (`group/artifactId/version/artifactId-version.type`). Metadata is
//! derived from the POM: `compile`, `runtime` and `provided` scoped
//! dependencies become exported groups of the same name. Test, system and
//! optional dependencies are dropped, as are dependencies whose version is
//! inherited or computed from properties. Maven repositories carry no
//! BLAKE3 records, so nothing is verified.

use serde::Deserialize;

use super::metadata::{DependencyRecord, GroupRecord, MetaDataRecord};
use super::url::UrlProcess;
use super::{Fetched, Item, ProcessError};
use crate::domain::{Artifact, License};

#[derive(Debug, Clone)]
pub struct MavenProcess {
    http: UrlProcess,
}

#[derive(Debug, Default, Deserialize)]
struct Pom {
    #[serde(default)]
    dependencies: PomDependencies,

    #[serde(default)]
    licenses: PomLicenses,
}

#[derive(Debug, Default, Deserialize)]
struct PomDependencies {
    #[serde(default)]
    dependency: Vec<PomDependency>,
}

#[derive(Debug, Deserialize)]
struct PomDependency {
    #[serde(rename = "groupId")]
    group_id: String,

    #[serde(rename = "artifactId")]
    artifact_id: String,

    version: Option<String>,
    scope: Option<String>,

    #[serde(rename = "type")]
    dependency_type: Option<String>,

    optional: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PomLicenses {
    #[serde(default)]
    license: Vec<PomLicense>,
}

#[derive(Debug, Deserialize)]
struct PomLicense {
    name: Option<String>,
}

impl MavenProcess {
    pub fn new(url: &str, username: Option<String>, password: Option<String>) -> Result<Self, ProcessError> {
        Ok(Self {
            http: UrlProcess::new(url, username, password)?,
        })
    }

    pub fn base(&self) -> &url::Url {
        self.http.base()
    }

    fn path(artifact: &Artifact, suffix: &str) -> String {
        let version = artifact.repository_version();
        format!(
            "{}/{}/{}/{}-{}{}",
            artifact.id.group.replace('.', "/"),
            artifact.id.name,
            version,
            artifact.id.name,
            version,
            suffix
        )
    }

    pub fn fetch(&self, artifact: &Artifact, item: Item) -> Result<Option<Fetched>, ProcessError> {
        match item {
            Item::File => {
                let path = Self::path(artifact, &format!(".{}", artifact.id.artifact_type));
                Ok(self.http.get(&path)?.map(Fetched::unverified))
            }
            Item::Source => {
                let path = Self::path(artifact, "-sources.jar");
                Ok(self.http.get(&path)?.map(Fetched::unverified))
            }
            Item::MetaData => {
                let path = Self::path(artifact, ".pom");
                let Some(bytes) = self.http.get(&path)? else {
                    return Ok(None);
                };

                let record = pom_to_record(&bytes).map_err(|message| ProcessError::InvalidMetaData {
                    item: path.clone(),
                    message,
                })?;
                let bytes = record.to_bytes().map_err(|e| ProcessError::InvalidMetaData {
                    item: path,
                    message: e.to_string(),
                })?;

                Ok(Some(Fetched::unverified(bytes)))
            }
        }
    }
}

fn pom_to_record(bytes: &[u8]) -> Result<MetaDataRecord, String> {
    let text = String::from_utf8_lossy(bytes);
    let pom: Pom = quick_xml::de::from_str(&text).map_err(|e| e.to_string())?;

    let mut record = MetaDataRecord {
        licenses: pom
            .licenses
            .license
            .into_iter()
            .filter_map(|license| license.name)
            .map(License::new)
            .collect(),
        ..MetaDataRecord::default()
    };

    for dependency in pom.dependencies.dependency {
        if dependency.optional.as_deref().map(str::trim) == Some("true") {
            continue;
        }

        let group = match dependency.scope.as_deref().map(str::trim) {
            None | Some("compile") => "compile",
            Some("runtime") => "runtime",
            Some("provided") => "provided",
            Some(_) => continue,
        };

        let Some(version) = dependency.version.map(|v| v.trim().to_string()) else {
            tracing::warn!(artifact = %dependency.artifact_id, "skipping POM dependency without a version");
            continue;
        };
        if version.contains("${") {
            tracing::warn!(artifact = %dependency.artifact_id, %version, "skipping POM dependency with a property version");
            continue;
        }

        let dependency_type = dependency.dependency_type.unwrap_or_else(|| "jar".to_string());
        let id = format!(
            "{}:{}:{}:{}:{}",
            dependency.group_id.trim(),
            dependency.artifact_id.trim(),
            dependency.artifact_id.trim(),
            version,
            dependency_type.trim()
        );

        record
            .dependencies
            .entry(group.to_string())
            .or_insert_with(|| GroupRecord {
                export: true,
                dependencies: Vec::new(),
            })
            .dependencies
            .push(DependencyRecord {
                id,
                skip_compatibility_check: false,
                exclusions: Vec::new(),
            });
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Version, VersionMappings};

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>org.example</groupId>
  <artifactId>app</artifactId>
  <version>1.0.0</version>
  <licenses>
    <license><name>Apache-2.0</name></license>
  </licenses>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>core</artifactId>
      <version>2.1.0</version>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>driver</artifactId>
      <version>1.2.3</version>
      <scope>runtime</scope>
    </dependency>
    <dependency>
      <groupId>org.testng</groupId>
      <artifactId>testng</artifactId>
      <version>6.8.7</version>
      <scope>test</scope>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>extra</artifactId>
      <version>1.0.0</version>
      <optional>true</optional>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>managed</artifactId>
    </dependency>
  </dependencies>
</project>"#;

    #[test]
    fn pom_scopes_become_groups() {
        let metadata = pom_to_record(POM.as_bytes())
            .unwrap()
            .into_metadata(&VersionMappings::default())
            .unwrap();

        let compile = metadata.dependencies.group("compile").unwrap();
        assert_eq!(compile.dependencies.len(), 1);
        assert_eq!(compile.dependencies[0].id.name, "core");
        assert_eq!(compile.dependencies[0].version, Version::new(2, 1, 0));

        let runtime = metadata.dependencies.group("runtime").unwrap();
        assert_eq!(runtime.dependencies[0].id.name, "driver");

        assert!(metadata.dependencies.group("test").is_none());
        assert_eq!(metadata.licenses, vec![License::new("Apache-2.0")]);
    }

    #[test]
    fn pom_without_dependencies() {
        let record = pom_to_record(b"<project><artifactId>lonely</artifactId></project>").unwrap();
        assert!(record.dependencies.is_empty());
    }

    #[test]
    fn maven_layout_uses_artifact_name() {
        let artifact = Artifact::parse("org.example:proj:app:1.0.0:jar").unwrap();
        assert_eq!(
            MavenProcess::path(&artifact, ".pom"),
            "org/example/app/1.0.0/app-1.0.0.pom"
        );
    }
}
