//! Local artifact cache
//!
//! Files live under the cache directory using the repository layout
//! (`group/project/version/name-version.type`) with a digest record beside
//! each file. All writes are atomic (temp file + rename) and hold an
//! exclusive `fs2` lock while the temp file is written.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::digest::{digest_bytes, digest_path, parse_digest};
use super::{Fetched, ProcessError};

/// Fetch and publish process backed by a local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheProcess {
    dir: PathBuf,
}

impl CacheProcess {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Looks up a cached file and its digest record
    ///
    /// A file without a digest record is treated as absent.
    pub fn fetch(&self, item: &str) -> Result<Option<Fetched>, ProcessError> {
        let path = self.dir.join(item);
        if !path.is_file() {
            return Ok(None);
        }

        let record_path = self.dir.join(digest_path(item));
        if !record_path.is_file() {
            tracing::debug!(path = %path.display(), "cached file has no digest record");
            return Ok(None);
        }

        let contents = fs::read_to_string(&record_path).map_err(|source| ProcessError::Io {
            path: record_path.clone(),
            source,
        })?;
        let digest = parse_digest(&contents).ok_or(ProcessError::InvalidDigest { path: record_path })?;

        Ok(Some(Fetched::Local {
            path,
            digest: Some(digest),
        }))
    }

    /// Stores a file and its digest record, returning the cached path
    pub fn store(&self, item: &str, bytes: &[u8]) -> Result<PathBuf, ProcessError> {
        let path = self.dir.join(item);
        write_atomic(&path, bytes)?;

        let record = format!("{}\n", digest_bytes(bytes));
        write_atomic(&self.dir.join(digest_path(item)), record.as_bytes())?;

        tracing::debug!(path = %path.display(), "stored in cache");
        Ok(path)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ProcessError> {
    let io_error = |source| ProcessError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(io_error)?;

        file.lock_exclusive().map_err(io_error)?;

        let mut writer = BufWriter::new(&file);
        writer.write_all(bytes).map_err(io_error)?;
        writer.flush().map_err(io_error)?;
        drop(writer);
        file.sync_all().map_err(io_error)?;
    }

    fs::rename(&temp_path, path).map_err(io_error)
}
