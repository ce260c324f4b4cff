//! Subversion-backed repository
//!
//! Fetches with `svn export` and publishes with `svn import`, both run
//! non-interactively through the `svn` binary on the PATH.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

use super::digest::{digest_bytes, digest_path, parse_digest};
use super::{Fetched, ProcessError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubversionProcess {
    repository: String,
    username: Option<String>,
    password: Option<String>,
    program: OsString,
}

impl SubversionProcess {
    pub fn new(repository: impl Into<String>, username: Option<String>, password: Option<String>) -> Self {
        let repository = repository.into();
        Self {
            repository: repository.trim_end_matches('/').to_string(),
            username,
            password,
            program: "svn".into(),
        }
    }

    #[cfg(test)]
    fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn url(&self, item: &str) -> String {
        format!("{}/{}", self.repository, item)
    }

    /// Builds the argument list for one `svn` invocation
    fn arguments(&self, subcommand: &str, rest: Vec<OsString>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![subcommand.into(), "--non-interactive".into()];
        if let Some(username) = &self.username {
            args.push("--username".into());
            args.push(username.into());
        }
        if let Some(password) = &self.password {
            args.push("--password".into());
            args.push(password.into());
        }
        args.extend(rest);
        args
    }

    /// Runs `svn` and captures its output, whether or not it succeeded
    fn invoke(&self, subcommand: &str, rest: Vec<OsString>) -> Result<Output, ProcessError> {
        Command::new(&self.program)
            .args(self.arguments(subcommand, rest))
            .output()
            .map_err(|e| ProcessError::Command {
                command: format!("svn {subcommand}"),
                message: e.to_string(),
            })
    }

    /// `Ok(None)` when the remote path does not exist
    fn export(&self, item: &str, into: &Path) -> Result<Option<Vec<u8>>, ProcessError> {
        let target = into.join("export");
        let output = self.invoke("export", vec![self.url(item).into(), target.clone().into_os_string()])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing(&stderr) {
                return Ok(None);
            }
            return Err(failure("export", &stderr));
        }

        let bytes = fs::read(&target).map_err(|source| ProcessError::Io { path: target, source })?;
        Ok(Some(bytes))
    }

    fn import(&self, local: &Path, name: &str) -> Result<(), ProcessError> {
        let message = format!("Publishing [{name}]");
        let output = self.invoke(
            "import",
            vec!["-m".into(), message.into(), local.as_os_str().to_owned(), self.url(name).into()],
        )?;

        if output.status.success() {
            Ok(())
        } else {
            Err(failure("import", &String::from_utf8_lossy(&output.stderr)))
        }
    }

    pub fn fetch(&self, item: &str) -> Result<Option<Fetched>, ProcessError> {
        let temp = TempDir::new().map_err(|source| ProcessError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

        let Some(bytes) = self.export(item, temp.path())? else {
            return Ok(None);
        };

        let record_dir = temp.path().join("record");
        fs::create_dir_all(&record_dir).map_err(|source| ProcessError::Io {
            path: record_dir.clone(),
            source,
        })?;
        let Some(record) = self.export(&digest_path(item), &record_dir)? else {
            tracing::debug!(item, repository = %self.repository, "file has no digest record");
            return Ok(None);
        };

        let digest = parse_digest(&String::from_utf8_lossy(&record)).ok_or_else(|| ProcessError::InvalidDigest {
            path: digest_path(item).into(),
        })?;

        Ok(Some(Fetched::Bytes {
            bytes,
            digest: Some(digest),
        }))
    }

    /// Imports the file and its digest record
    pub fn publish(&self, item: &str, bytes: &[u8]) -> Result<(), ProcessError> {
        let temp = TempDir::new().map_err(|source| ProcessError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

        let record = format!("{}\n", digest_bytes(bytes));
        for (name, contents) in [(item.to_string(), bytes), (digest_path(item), record.as_bytes())] {
            let local = temp.path().join("import");
            fs::write(&local, contents).map_err(|source| ProcessError::Io {
                path: local.clone(),
                source,
            })?;

            self.import(&local, &name)?;
        }

        Ok(())
    }
}

fn failure(subcommand: &str, stderr: &str) -> ProcessError {
    ProcessError::Command {
        command: format!("svn {subcommand}"),
        message: stderr.trim().to_string(),
    }
}

fn is_missing(stderr: &str) -> bool {
    stderr.contains("E170000") || stderr.contains("E160013") || stderr.contains("path not found")
}
