//! The project being built

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use super::artifact::{Artifact, ArtifactId, ArtifactMetaData, License, Version, DEFAULT_TYPE};
use super::dependencies::Dependencies;
use super::graph::Graph;
use super::target::{build_target_graph, Target};
use crate::dependency::{ArtifactGraph, DependencyService, TraversalRules};
use crate::error::BuildError;
use crate::output::Output;
use crate::plugin::Plugin;
use crate::workflow::Workflow;

/// Shared, mutable project. Plugins and target actions hold a clone.
pub type ProjectHandle = Rc<RefCell<Project>>;

/// A file the project publishes, with the metadata that goes with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub artifact: Artifact,
    pub metadata: ArtifactMetaData,
    pub file: PathBuf,
    pub source: Option<PathBuf>,
}

/// Publications grouped by name (`main`, `test`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Publications {
    groups: BTreeMap<String, Vec<Publication>>,
}

impl Publications {
    pub fn add(&mut self, group: impl Into<String>, publication: Publication) -> &mut Self {
        self.groups.entry(group.into()).or_default().push(publication);
        self
    }

    pub fn group(&self, group: &str) -> &[Publication] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all(&self) -> impl Iterator<Item = &Publication> {
        self.groups.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Project {
    pub directory: PathBuf,
    pub group: String,
    pub name: String,
    pub version: Option<Version>,
    pub licenses: Vec<License>,

    pub dependencies: Dependencies,
    pub workflow: Workflow,
    pub publications: Publications,

    pub targets: BTreeMap<String, Target>,
    pub target_graph: Graph<String, ()>,

    /// Where plugins look for their own configuration files
    pub plugin_configuration_directory: PathBuf,

    /// Loaded plugins by local name
    pub plugins: BTreeMap<String, Rc<dyn Plugin>>,

    pub output: Rc<dyn Output>,

    artifact_graph: Option<ArtifactGraph>,
}

impl Project {
    pub fn new(directory: impl Into<PathBuf>, output: Rc<dyn Output>) -> Self {
        Self {
            directory: directory.into(),
            group: String::new(),
            name: String::new(),
            version: None,
            licenses: Vec::new(),
            dependencies: Dependencies::default(),
            workflow: Workflow::default(),
            publications: Publications::default(),
            targets: BTreeMap::new(),
            target_graph: Graph::new(),
            plugin_configuration_directory: crate::parser::savant_dir().join("plugins"),
            plugins: BTreeMap::new(),
            output,
            artifact_graph: None,
        }
    }

    pub fn into_handle(self) -> ProjectHandle {
        Rc::new(RefCell::new(self))
    }

    /// Adds a target, replacing any target with the same name
    pub fn add_target(&mut self, target: Target) {
        if self.targets.contains_key(&target.name) {
            tracing::debug!(target = %target.name, "replacing target");
        }
        self.targets.insert(target.name.clone(), target);
    }

    /// Rebuilds the target graph from the declared targets
    pub fn build_target_graph(&mut self) -> Result<(), BuildError> {
        self.target_graph = build_target_graph(&self.targets)?;
        Ok(())
    }

    /// The project as an artifact (`group:name:version:jar`)
    pub fn to_artifact(&self) -> Result<Artifact, BuildError> {
        let version = self.version.clone().ok_or_else(|| {
            BuildError::BuildFailure(format!("The project [{}:{}] has no version", self.group, self.name))
        })?;

        Ok(Artifact::new(
            ArtifactId::new(&self.group, &self.name, &self.name, DEFAULT_TYPE),
            version,
        ))
    }

    /// The reduced dependency graph, built on first use
    pub fn artifact_graph(&mut self) -> Result<&ArtifactGraph, BuildError> {
        if self.artifact_graph.is_none() {
            let root = self.to_artifact()?;
            let service = DependencyService::new(&self.workflow);
            let graph = service.artifact_graph(&root, &self.dependencies, &TraversalRules::project())?;
            self.artifact_graph = Some(graph);
        }

        self.artifact_graph
            .as_ref()
            .ok_or_else(|| BuildError::BuildFailure("Dependency graph unavailable".into()))
    }

    /// Publishes every publication through the publish workflow
    pub fn integrate(&self) -> Result<(), BuildError> {
        let service = DependencyService::new(&self.workflow);
        for publication in self.publications.all() {
            self.output.info(&format!("Publishing [{}]", publication.artifact));
            service.publish(publication)?;
        }
        Ok(())
    }

    /// Metadata describing the project to consumers
    pub fn metadata(&self) -> ArtifactMetaData {
        ArtifactMetaData::new(self.dependencies.exported(), self.licenses.iter().cloned())
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("directory", &self.directory)
            .field("group", &self.group)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemoryOutput;
    use crate::test_support::{cache_workflow, metadata, publish};
    use crate::workflow::digest_path;
    use tempfile::TempDir;

    fn project(dir: &std::path::Path) -> Project {
        let mut project = Project::new(dir, Rc::new(MemoryOutput::new()));
        project.group = "org.example".into();
        project.name = "project".into();
        project.version = Some(Version::new(1, 0, 0));
        project.workflow = cache_workflow(&dir.join("cache"));
        project
    }

    #[test]
    fn to_artifact_uses_name_as_project() {
        let dir = TempDir::new().unwrap();
        let artifact = project(dir.path()).to_artifact().unwrap();
        assert_eq!(artifact.to_string(), "org.example:project:project:1.0.0:jar");
    }

    #[test]
    fn to_artifact_without_version_fails() {
        let dir = TempDir::new().unwrap();
        let mut project = project(dir.path());
        project.version = None;
        assert!(matches!(project.to_artifact(), Err(BuildError::BuildFailure(_))));
    }

    #[test]
    fn publications_grouped_by_name() {
        let publication = Publication {
            artifact: Artifact::parse("org.example:project:1.0.0").unwrap(),
            metadata: ArtifactMetaData::default(),
            file: PathBuf::from("build/jars/project-1.0.0.jar"),
            source: None,
        };

        let mut publications = Publications::default();
        publications
            .add("main", publication.clone())
            .add("test", publication.clone())
            .add("main", publication);

        assert_eq!(publications.len(), 3);
        assert_eq!(publications.group("main").len(), 2);
        assert!(publications.group("missing").is_empty());
        assert_eq!(publications.all().count(), 3);
    }

    #[test]
    fn integrate_publishes_everything() {
        let dir = TempDir::new().unwrap();
        let mut project = project(dir.path());
        let file = dir.path().join("project.jar");
        std::fs::write(&file, b"jar").unwrap();

        let artifact = project.to_artifact().unwrap();
        project.publications.add(
            "main",
            Publication {
                artifact: artifact.clone(),
                metadata: project.metadata(),
                file,
                source: None,
            },
        );

        project.integrate().unwrap();
        let cache = dir.path().join("cache");
        assert!(cache.join(artifact.artifact_path()).is_file());
        assert!(cache.join(digest_path(&artifact.metadata_path())).is_file());
    }

    #[test]
    fn artifact_graph_is_built_once() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("cache");
        publish(&cache, "org.example:a:1.0.0", &metadata(&[]));

        let mut project = project(dir.path());
        project.dependencies = Dependencies::new([crate::domain::DependencyGroup::new(
            "compile",
            true,
            [Artifact::parse("org.example:a:1.0.0").unwrap()],
        )]);

        assert_eq!(project.artifact_graph().unwrap().len(), 1);

        // Later changes to the cache are not seen
        std::fs::remove_dir_all(&cache).unwrap();
        assert_eq!(project.artifact_graph().unwrap().len(), 1);
    }
}
