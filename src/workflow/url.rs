//! Remote repository reached over HTTP(S)
//!
//! Files are fetched with a GET relative to the base URL. A 404 means the
//! repository does not have the file; any other failure is a transport
//! failure. Publishing is not supported.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use url::Url;

use super::digest::{digest_path, parse_digest};
use super::{Fetched, ProcessError};

#[derive(Debug, Clone)]
pub struct UrlProcess {
    base: Url,
    username: Option<String>,
    password: Option<String>,
    client: Client,
}

impl UrlProcess {
    pub fn new(url: &str, username: Option<String>, password: Option<String>) -> Result<Self, ProcessError> {
        let mut base = url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let base = Url::parse(&base).map_err(|e| ProcessError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let client = Client::builder()
            .user_agent(concat!("savant/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ProcessError::Transport {
                url: url.to_string(),
                source,
            })?;

        Ok(Self {
            base,
            username,
            password,
            client,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Downloads a file relative to the base URL
    pub fn get(&self, item: &str) -> Result<Option<Vec<u8>>, ProcessError> {
        let url = self.base.join(item).map_err(|e| ProcessError::InvalidUrl {
            url: format!("{}{}", self.base, item),
            message: e.to_string(),
        })?;

        let mut request = self.client.get(url.clone());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        tracing::debug!(%url, "GET");
        let transport = |source| ProcessError::Transport {
            url: url.to_string(),
            source,
        };
        let response = request.send().map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response.bytes().map_err(transport)?;
                Ok(Some(bytes.to_vec()))
            }
            status => Err(ProcessError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    /// Fetches a file together with its digest record
    ///
    /// A file without a digest record is treated as absent.
    pub fn fetch(&self, item: &str) -> Result<Option<Fetched>, ProcessError> {
        let Some(bytes) = self.get(item)? else {
            return Ok(None);
        };

        let Some(record) = self.get(&digest_path(item))? else {
            tracing::debug!(item, base = %self.base, "remote file has no digest record");
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_gets_trailing_slash() {
        let process = UrlProcess::new("https://repository.savantbuild.org/repo", None, None).unwrap();
        assert_eq!(process.base().as_str(), "https://repository.savantbuild.org/repo/");
    }

    #[test]
    fn invalid_url_rejected() {
        assert!(matches!(
            UrlProcess::new("not a url", None, None),
            Err(ProcessError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn unreachable_host_is_a_transport_failure() {
        let process = UrlProcess::new("http://127.0.0.1:9/", None, None).unwrap();
        assert!(matches!(process.get("a/b.jar"), Err(ProcessError::Transport { .. })));
    }
}
