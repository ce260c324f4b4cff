//! # Workflow
//!
//! Ordered fetch and publish process chains.
//!
//! ## Fetch
//!
//! Processes are tried in declared order and the first one that has the
//! item wins. Anything fetched from a non-cache process is promoted into
//! every cache process that appears earlier in the chain. Bytes are checked
//! against their BLAKE3 record; a mismatch aborts the fetch. A transport
//! failure is logged and the chain moves on, but if the last process fails
//! the failure is returned.
//!
//! ## Publish
//!
//! Every publish process receives the item, in declared order. Publishing
//! is not transactional.
//!
//! ## On-disk layout
//!
//! ```text
//! <cache>/org/example/leaf/1.0.0/leaf-1.0.0.jar
//! <cache>/org/example/leaf/1.0.0/leaf-1.0.0.jar.blake3
//! <cache>/org/example/leaf/1.0.0/leaf-1.0.0.jar.amd
//! <cache>/org/example/leaf/1.0.0/leaf-1.0.0.jar.amd.blake3
//! <cache>/org/example/leaf/1.0.0/leaf-1.0.0-src.jar
//! ```

mod cache;
mod digest;
mod maven;
mod metadata;
mod subversion;
mod url;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{Artifact, ArtifactMetaData, VersionMappings};
use crate::error::BuildError;

pub use cache::CacheProcess;
pub use digest::{digest_bytes, digest_file, digest_path, DIGEST_EXTENSION};
pub use maven::MavenProcess;
pub use metadata::{DependencyRecord, GroupRecord, MetaDataRecord};
pub use subversion::SubversionProcess;
pub use url::UrlProcess;

/// Repository used by the standard workflow
pub const STANDARD_REPOSITORY: &str = "https://repository.savantbuild.org";

/// Failure of a single process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Unable to reach [{url}]: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request for [{url}] failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error on [{}]: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Digest record [{}] is not a BLAKE3 hex digest", path.display())]
    InvalidDigest { path: PathBuf },

    #[error("Invalid repository URL [{url}]: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid metadata for [{item}]: {message}")]
    InvalidMetaData { item: String, message: String },

    #[error("The {0} process does not support publishing")]
    PublishUnsupported(&'static str),

    #[error("Command [{command}] failed: {message}")]
    Command { command: String, message: String },
}

/// The three files kept for every artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    File,
    MetaData,
    Source,
}

impl Item {
    /// Relative repository path of this item for `artifact`
    pub fn path(self, artifact: &Artifact) -> String {
        match self {
            Item::File => artifact.artifact_path(),
            Item::MetaData => artifact.metadata_path(),
            Item::Source => artifact.source_path(),
        }
    }
}

/// What a process hands back when it has an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Already on local disk
    Local { path: PathBuf, digest: Option<String> },

    /// Downloaded into memory
    Bytes { bytes: Vec<u8>, digest: Option<String> },
}

impl Fetched {
    /// Bytes from a repository that publishes no digest records
    pub fn unverified(bytes: Vec<u8>) -> Self {
        Fetched::Bytes { bytes, digest: None }
    }

    pub fn digest(&self) -> Option<&str> {
        match self {
            Fetched::Local { digest, .. } | Fetched::Bytes { digest, .. } => digest.as_deref(),
        }
    }
}

/// One fetch/publish backend
#[derive(Debug, Clone)]
pub enum Process {
    Cache(CacheProcess),
    Url(UrlProcess),
    Maven(MavenProcess),
    Subversion(SubversionProcess),
}

impl Process {
    /// Human readable name used in errors and logs
    pub fn name(&self) -> String {
        match self {
            Process::Cache(cache) => format!("cache [{}]", cache.dir().display()),
            Process::Url(url) => format!("url [{}]", url.base()),
            Process::Maven(maven) => format!("maven [{}]", maven.base()),
            Process::Subversion(svn) => format!("subversion [{}]", svn.repository()),
        }
    }

    pub fn is_cache(&self) -> bool {
        matches!(self, Process::Cache(_))
    }

    pub fn fetch(&self, artifact: &Artifact, item: Item) -> Result<Option<Fetched>, ProcessError> {
        match self {
            Process::Cache(cache) => cache.fetch(&item.path(artifact)),
            Process::Url(url) => url.fetch(&item.path(artifact)),
            Process::Maven(maven) => maven.fetch(artifact, item),
            Process::Subversion(svn) => svn.fetch(&item.path(artifact)),
        }
    }

    pub fn publish(&self, path: &str, bytes: &[u8]) -> Result<(), ProcessError> {
        match self {
            Process::Cache(cache) => cache.store(path, bytes).map(|_| ()),
            Process::Subversion(svn) => svn.publish(path, bytes),
            Process::Url(_) => Err(ProcessError::PublishUnsupported("url")),
            Process::Maven(_) => Err(ProcessError::PublishUnsupported("maven")),
        }
    }
}

/// Prioritized fallback chain
#[derive(Debug, Clone)]
pub struct FetchWorkflow {
    pub processes: Vec<Process>,

    /// Where promoted items land when no earlier cache exists
    scratch: CacheProcess,
}

impl Default for FetchWorkflow {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FetchWorkflow {
    pub fn new(processes: Vec<Process>) -> Self {
        Self {
            processes,
            scratch: CacheProcess::new(std::env::temp_dir().join("savant-fetch")),
        }
    }

    /// Overrides the directory used for items that have no cache to land in
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch = CacheProcess::new(dir);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Fetches one item and returns its local path
    ///
    /// `Ok(None)` means no process had the item.
    pub fn fetch_item(&self, artifact: &Artifact, item: Item) -> Result<Option<PathBuf>, BuildError> {
        let path = item.path(artifact);
        let mut last_failure = None;

        for (index, process) in self.processes.iter().enumerate() {
            let fetched = match process.fetch(artifact, item) {
                Ok(Some(fetched)) => fetched,
                Ok(None) => {
                    tracing::trace!(item = %path, process = %process.name(), "not found");
                    last_failure = None;
                    continue;
                }
                Err(source) => {
                    tracing::warn!(item = %path, process = %process.name(), error = %source, "fetch failed, trying next process");
                    last_failure = Some((process.name(), source));
                    continue;
                }
            };

            tracing::debug!(item = %path, process = %process.name(), "fetched");
            return self.accept(&path, index, process, fetched).map(Some);
        }

        match last_failure {
            Some((process, source)) => Err(BuildError::ProcessFailure {
                item: path,
                process,
                source,
            }),
            None => Ok(None),
        }
    }

    /// Verifies a fetched item and promotes it into the earlier caches
    fn accept(&self, path: &str, index: usize, process: &Process, fetched: Fetched) -> Result<PathBuf, BuildError> {
        let expected = fetched.digest().map(str::to_string);
        let (bytes, local) = match fetched {
            Fetched::Local { path: local, .. } => {
                let bytes = fs::read(&local).map_err(|source| BuildError::Io {
                    path: local.clone(),
                    source,
                })?;
                (bytes, Some(local))
            }
            Fetched::Bytes { bytes, .. } => (bytes, None),
        };

        if let Some(expected) = expected {
            let actual = digest_bytes(&bytes);
            if actual != expected {
                return Err(BuildError::DigestMismatch {
                    item: path.to_string(),
                    process: process.name(),
                    expected,
                    actual,
                });
            }
        }

        if process.is_cache() {
            if let Some(local) = local {
                return Ok(local);
            }
        }

        let earlier: Vec<&Process> = self.processes[..index].iter().filter(|p| p.is_cache()).collect();
        if earlier.is_empty() {
            return self.store(&self.scratch, path, &bytes);
        }

        let mut first = None;
        for cache in earlier {
            let Process::Cache(cache) = cache else { continue };
            tracing::debug!(item = %path, cache = %cache.dir().display(), "promoting");
            let stored = self.store(cache, path, &bytes)?;
            first.get_or_insert(stored);
        }

        first.ok_or_else(|| BuildError::BuildFailure(format!("Unable to promote [{path}]")))
    }

    fn store(&self, cache: &CacheProcess, path: &str, bytes: &[u8]) -> Result<PathBuf, BuildError> {
        cache.store(path, bytes).map_err(|source| BuildError::ProcessFailure {
            item: path.to_string(),
            process: format!("cache [{}]", cache.dir().display()),
            source,
        })
    }
}

/// Fan-out publish chain
#[derive(Debug, Clone, Default)]
pub struct PublishWorkflow {
    pub processes: Vec<Process>,
}

impl PublishWorkflow {
    pub fn new(processes: Vec<Process>) -> Self {
        Self { processes }
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Writes one item to every process, stopping at the first failure
    pub fn publish_item(&self, artifact: &Artifact, item: Item, bytes: &[u8]) -> Result<(), BuildError> {
        let path = item.path(artifact);
        for process in &self.processes {
            tracing::debug!(item = %path, process = %process.name(), "publishing");
            process.publish(&path, bytes).map_err(|source| BuildError::Publish {
                item: path.clone(),
                process: process.name(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Fetch and publish configuration of a project
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    pub fetch: FetchWorkflow,
    pub publish: PublishWorkflow,
    pub mappings: VersionMappings,
}

impl Workflow {
    pub fn new(fetch: FetchWorkflow, publish: PublishWorkflow) -> Self {
        Self {
            fetch,
            publish,
            mappings: VersionMappings::default(),
        }
    }

    /// Fetch from the local cache then the public repository; publish to
    /// the local cache
    pub fn standard(cache_dir: impl Into<PathBuf>) -> Result<Self, ProcessError> {
        let cache = CacheProcess::new(cache_dir);
        let remote = UrlProcess::new(STANDARD_REPOSITORY, None, None)?;

        Ok(Self::new(
            FetchWorkflow::new(vec![Process::Cache(cache.clone()), Process::Url(remote)]),
            PublishWorkflow::new(vec![Process::Cache(cache)]),
        ))
    }

    pub fn with_mappings(mut self, mappings: VersionMappings) -> Self {
        self.mappings = mappings;
        self
    }

    /// Fetches and parses the metadata record of an artifact
    pub fn fetch_metadata(&self, artifact: &Artifact) -> Result<ArtifactMetaData, BuildError> {
        let path = self
            .fetch
            .fetch_item(artifact, Item::MetaData)?
            .ok_or_else(|| BuildError::MetaDataMissing {
                artifact: artifact.to_string(),
            })?;

        let bytes = fs::read(&path).map_err(|source| BuildError::Io {
            path: path.clone(),
            source,
        })?;
        let record = MetaDataRecord::from_bytes(&bytes).map_err(|e| {
            BuildError::Parse(format!("Invalid metadata record [{}] for [{}]: {}", path.display(), artifact, e))
        })?;

        Ok(record.into_metadata(&self.mappings)?)
    }

    /// Guarantees a local copy of the artifact file
    pub fn fetch_artifact(&self, artifact: &Artifact) -> Result<PathBuf, BuildError> {
        self.fetch
            .fetch_item(artifact, Item::File)?
            .ok_or_else(|| BuildError::ArtifactMissing {
                artifact: artifact.to_string(),
            })
    }

    /// Source archives are optional
    pub fn fetch_source(&self, artifact: &Artifact) -> Result<Option<PathBuf>, BuildError> {
        self.fetch.fetch_item(artifact, Item::Source)
    }

    /// Publishes an artifact file, its optional source file and its
    /// metadata record to every publish process
    pub fn publish(
        &self,
        artifact: &Artifact,
        metadata: &ArtifactMetaData,
        file: &Path,
        source: Option<&Path>,
    ) -> Result<(), BuildError> {
        let read = |path: &Path| {
            fs::read(path).map_err(|source| BuildError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        let record = MetaDataRecord::from_metadata(metadata)
            .to_bytes()
            .map_err(|e| BuildError::BuildFailure(format!("Unable to encode metadata for [{artifact}]: {e}")))?;
        let file_bytes = read(file)?;
        let source_bytes = source.map(read).transpose()?;

        self.publish.publish_item(artifact, Item::File, &file_bytes)?;
        if let Some(source_bytes) = source_bytes {
            self.publish.publish_item(artifact, Item::Source, &source_bytes)?;
        }
        self.publish.publish_item(artifact, Item::MetaData, &record)?;

        Ok(())
    }
}
