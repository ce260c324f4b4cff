//! Helpers shared by unit tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use flate2::write::GzEncoder;
use flate2::Compression;
use tiny_http::{Response, Server, StatusCode};

use crate::domain::{Artifact, ArtifactMetaData, Dependencies, DependencyGroup, License};
use crate::workflow::{digest_bytes, digest_path, CacheProcess, FetchWorkflow, Item, MetaDataRecord, Process, PublishWorkflow, Workflow};

/// In-process HTTP repository that counts requests
pub struct RemoteRepository {
    url: String,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<AtomicUsize>,
}

impl RemoteRepository {
    pub fn start() -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let files: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::default();
        let requests = Arc::new(AtomicUsize::new(0));

        let served = Arc::clone(&files);
        let counter = Arc::clone(&requests);
        thread::spawn(move || {
            for request in server.incoming_requests() {
                counter.fetch_add(1, Ordering::SeqCst);
                let path = request.url().trim_start_matches('/').to_string();
                let body = served.lock().unwrap().get(&path).cloned();
                let _ = match body {
                    Some(bytes) => request.respond(Response::from_data(bytes)),
                    None => request.respond(Response::empty(StatusCode(404))),
                };
            }
        });

        Self {
            url: format!("http://127.0.0.1:{port}/"),
            files,
            requests,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn put(&self, path: &str, bytes: &[u8]) {
        self.files.lock().unwrap().insert(path.to_string(), bytes.to_vec());
    }

    pub fn put_with_digest(&self, path: &str, bytes: &[u8]) {
        self.put(path, bytes);
        self.put(&digest_path(path), digest_bytes(bytes).as_bytes());
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Builds metadata from `(group, [specs])` pairs
pub fn metadata(groups: &[(&str, &[&str])]) -> ArtifactMetaData {
    let groups = groups.iter().map(|(name, specs)| {
        DependencyGroup::new(*name, true, specs.iter().map(|spec| Artifact::parse(spec).unwrap()))
    });
    ArtifactMetaData::new(Dependencies::new(groups), [License::new("ApacheV2_0")])
}

/// Publishes an artifact file and metadata record into a cache directory
pub fn publish(dir: &Path, spec: &str, metadata: &ArtifactMetaData) {
    publish_artifact(dir, &Artifact::parse(spec).unwrap(), metadata);
}

pub fn publish_artifact(dir: &Path, artifact: &Artifact, metadata: &ArtifactMetaData) {
    let cache = CacheProcess::new(dir);
    let record = MetaDataRecord::from_metadata(metadata).to_bytes().unwrap();
    cache.store(&Item::File.path(artifact), artifact.to_string().as_bytes()).unwrap();
    cache.store(&Item::MetaData.path(artifact), &record).unwrap();
}

/// Workflow that fetches from and publishes to a single cache directory
pub fn cache_workflow(dir: &Path) -> Workflow {
    Workflow::new(
        FetchWorkflow::new(vec![Process::Cache(CacheProcess::new(dir))]),
        PublishWorkflow::new(vec![Process::Cache(CacheProcess::new(dir))]),
    )
}

/// Builds a gzip'd tar plugin archive holding the given entries
pub fn plugin_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, contents.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Publishes a plugin archive whose descriptor names `class`, with empty metadata
pub fn install_plugin(dir: &Path, spec: &str, class: &str) -> Artifact {
    let artifact = Artifact::parse(spec).unwrap();
    let descriptor = format!("plugin-class = \"{class}\"\n");
    install_archive(dir, &artifact, &plugin_archive(&[("savant-plugin.toml", &descriptor)]));
    artifact
}

pub fn install_archive(dir: &Path, artifact: &Artifact, archive: &[u8]) {
    let cache = CacheProcess::new(dir);
    let record = MetaDataRecord::from_metadata(&ArtifactMetaData::default()).to_bytes().unwrap();
    cache.store(&Item::File.path(artifact), archive).unwrap();
    cache.store(&Item::MetaData.path(artifact), &record).unwrap();
}
