//! Per-user configuration in `~/.savant/config.toml`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::Deserialize;

use crate::error::BuildError;

const REFERENCE_PREFIX: &str = "${global.";

/// `~/.savant`, or `.savant` when the home directory is unknown
pub fn savant_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".savant"))
        .unwrap_or_else(|| PathBuf::from(".savant"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GlobalFile {
    cache_dir: Option<PathBuf>,

    #[serde(flatten)]
    properties: BTreeMap<String, String>,
}

/// Read-only properties shared by every build of the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfiguration {
    path: PathBuf,
    cache_dir: Option<PathBuf>,
    properties: BTreeMap<String, String>,
}

impl GlobalConfiguration {
    pub fn default_path() -> PathBuf {
        savant_dir().join("config.toml")
    }

    /// Loads the user's configuration. A missing file means no properties.
    pub fn load() -> Result<Self, BuildError> {
        Self::load_from(Self::default_path())
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, BuildError> {
        let path = path.into();
        if !path.is_file() {
            return Ok(Self {
                path,
                ..Self::default()
            });
        }

        let contents = fs::read_to_string(&path).map_err(|source| BuildError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    pub fn parse(contents: &str, path: impl Into<PathBuf>) -> Result<Self, BuildError> {
        let path = path.into();
        let file: GlobalFile = toml::from_str(contents).map_err(|e| {
            BuildError::BuildFailure(format!(
                "Unable to load global configuration file [{}]: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            path,
            cache_dir: file.cache_dir,
            properties: file.properties,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Root of the local artifact cache
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| savant_dir().join("cache"))
    }

    pub fn property(&self, name: &str) -> Result<&str, BuildError> {
        self.properties.get(name).map(String::as_str).ok_or_else(|| {
            BuildError::BuildFailure(format!(
                "Missing global configuration property [{}]. You must define this property in the global \
                 configuration file [{}]",
                name,
                self.path.display()
            ))
        })
    }

    /// Replaces every `${global.NAME}` in `text`
    pub fn substitute(&self, text: &str) -> Result<String, BuildError> {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(REFERENCE_PREFIX) {
            result.push_str(&rest[..start]);
            let reference = &rest[start + REFERENCE_PREFIX.len()..];
            let end = reference
                .find('}')
                .ok_or_else(|| BuildError::Parse(format!("Unterminated global property reference in [{text}]")))?;
            result.push_str(self.property(&reference[..end])?);
            rest = &reference[end + 1..];
        }
        result.push_str(rest);

        Ok(result)
    }
}
