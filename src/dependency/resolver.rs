//! Resolution of a reduced graph to local files

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::{Artifact, ArtifactId};
use crate::error::BuildError;
use crate::workflow::Workflow;

use super::reducer::ArtifactGraph;
use super::rules::TraversalRules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub artifact: Artifact,
    pub file: PathBuf,
    pub source: Option<PathBuf>,
}

/// Every artifact of a reduced graph with its local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifactGraph {
    pub root: Artifact,

    /// In the order they were reached from the root
    artifacts: Vec<ResolvedArtifact>,

    index: BTreeMap<ArtifactId, usize>,
}

impl ResolvedArtifactGraph {
    pub fn get(&self, id: &ArtifactId) -> Option<&ResolvedArtifact> {
        self.index.get(id).map(|idx| &self.artifacts[*idx])
    }

    pub fn get_path(&self, id: &ArtifactId) -> Option<&Path> {
        self.get(id).map(|resolved| resolved.file.as_path())
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ResolvedArtifact> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn to_classpath(&self) -> Classpath {
        Classpath {
            paths: self.artifacts.iter().map(|resolved| resolved.file.clone()).collect(),
        }
    }
}

/// Ordered list of local artifact files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    pub paths: Vec<PathBuf>,
}

impl Classpath {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Platform path-list form (`a.jar:b.jar` on Unix)
    pub fn to_os_string(&self) -> OsString {
        std::env::join_paths(&self.paths).unwrap_or_default()
    }
}

impl fmt::Display for Classpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_os_string().to_string_lossy())
    }
}

/// Fetches the file of every artifact in the graph, plus sources when the
/// rule for the group it was reached through asks for them
pub fn resolve(
    graph: &ArtifactGraph,
    workflow: &Workflow,
    rules: &TraversalRules,
) -> Result<ResolvedArtifactGraph, BuildError> {
    let mut reached: Vec<(Artifact, bool)> = Vec::new();
    let mut fetch_source = false;

    graph.walk(|_, to, group, depth| {
        if depth == 1 {
            fetch_source = rules.get(group).map(|rule| rule.fetch_source).unwrap_or(false);
        }
        reached.push((to.clone(), fetch_source));
    });

    let mut resolved = ResolvedArtifactGraph {
        root: graph.root.clone(),
        artifacts: Vec::with_capacity(reached.len()),
        index: BTreeMap::new(),
    };

    for (artifact, fetch_source) in reached {
        let file = workflow.fetch_artifact(&artifact)?;
        let source = if fetch_source {
            let source = workflow.fetch_source(&artifact)?;
            if source.is_none() {
                tracing::debug!(%artifact, "no source archive");
            }
            source
        } else {
            None
        };

        tracing::debug!(%artifact, file = %file.display(), "resolved");
        resolved.index.insert(artifact.id.clone(), resolved.artifacts.len());
        resolved.artifacts.push(ResolvedArtifact { artifact, file, source });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::builder::build_graph;
    use crate::dependency::reducer::reduce;
    use crate::domain::{Dependencies, DependencyGroup};
    use crate::test_support::{cache_workflow, metadata, publish};
    use crate::workflow::{CacheProcess, Item};
    use tempfile::TempDir;

    #[test]
    fn every_artifact_gets_a_readable_file() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "org.example:a:1.0.0", &metadata(&[("compile", &["org.example:b:1.0.0"])]));
        publish(dir.path(), "org.example:b:1.0.0", &metadata(&[("runtime", &["org.example:c:1.0.0"])]));
        publish(dir.path(), "org.example:c:1.0.0", &metadata(&[]));

        let root = Artifact::parse("org.example:project:1.0.0").unwrap();
        let dependencies = Dependencies::new([DependencyGroup::new(
            "compile",
            true,
            [Artifact::parse("org.example:a:1.0.0").unwrap()],
        )]);
        let workflow = cache_workflow(dir.path());
        let rules = TraversalRules::project();

        let reduced = reduce(&build_graph(&root, &dependencies, &workflow, &rules).unwrap()).unwrap();
        let resolved = resolve(&reduced, &workflow, &rules).unwrap();

        assert_eq!(resolved.len(), 3);
        for artifact in resolved.artifacts() {
            assert!(artifact.file.is_file());
            assert!(std::fs::read(&artifact.file).is_ok());
        }

        let classpath = resolved.to_classpath();
        assert_eq!(classpath.len(), 3);
        assert_eq!(
            classpath.paths[0],
            dir.path().join("org/example/a/1.0.0/a-1.0.0.jar")
        );
        assert!(resolved
            .get_path(&Artifact::parse("org.example:c:1.0.0").unwrap().id)
            .is_some());
    }

    #[test]
    fn missing_file_is_artifact_missing() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact::parse("org.example:a:1.0.0").unwrap();
        let record = crate::workflow::MetaDataRecord::from_metadata(&metadata(&[])).to_bytes().unwrap();
        CacheProcess::new(dir.path()).store(&Item::MetaData.path(&artifact), &record).unwrap();

        let root = Artifact::parse("org.example:project:1.0.0").unwrap();
        let dependencies = Dependencies::new([DependencyGroup::new("compile", true, [artifact])]);
        let workflow = cache_workflow(dir.path());
        let rules = TraversalRules::project();

        let reduced = reduce(&build_graph(&root, &dependencies, &workflow, &rules).unwrap()).unwrap();
        assert!(matches!(
            resolve(&reduced, &workflow, &rules),
            Err(BuildError::ArtifactMissing { .. })
        ));
    }

    #[test]
    fn sources_fetched_when_rule_asks() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "org.example:a:1.0.0", &metadata(&[]));
        let artifact = Artifact::parse("org.example:a:1.0.0").unwrap();
        CacheProcess::new(dir.path()).store(&artifact.source_path(), b"sources").unwrap();

        let root = Artifact::parse("org.example:project:1.0.0").unwrap();
        let dependencies = Dependencies::new([DependencyGroup::new("runtime", true, [artifact.clone()])]);
        let workflow = cache_workflow(dir.path());
        let rules = TraversalRules::plugin();

        let reduced = reduce(&build_graph(&root, &dependencies, &workflow, &rules).unwrap()).unwrap();
        let resolved = resolve(&reduced, &workflow, &rules).unwrap();

        let source = resolved.get(&artifact.id).unwrap().source.as_ref().unwrap();
        assert_eq!(std::fs::read(source).unwrap(), b"sources");
    }

    #[test]
    fn classpath_display_joins_paths() {
        let classpath = Classpath {
            paths: vec![PathBuf::from("/a.jar"), PathBuf::from("/b.jar")],
        };
        let expected = std::env::join_paths(["/a.jar", "/b.jar"]).unwrap();
        assert_eq!(classpath.to_string(), expected.to_string_lossy());
    }
}
