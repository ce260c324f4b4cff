//! Plugin resolution and instantiation
//!
//! A plugin is resolved in a graph of its own, rooted at a synthetic
//! zero-version artifact, so that the project never appears as a node of its
//! own plugin's graph.

use std::rc::Rc;

use super::descriptor::read_plugin_class;
use super::registry::{ConstructError, Lookup, TypeRegistry};
use super::{Plugin, PluginContext, PluginLoadError};
use crate::dependency::{DependencyService, ResolvedArtifactGraph, TraversalRules};
use crate::domain::{Artifact, ArtifactId, Dependencies, DependencyGroup, ProjectHandle, Version, DEFAULT_TYPE};
use crate::error::BuildError;
use crate::output::Output;
use crate::runtime::RuntimeConfiguration;
use crate::workflow::Workflow;

const ROOT_GROUP: &str = "__savantLoadPluginGroup__";
const ROOT_NAME: &str = "__savantLoadPluginName__";

/// Root of every plugin graph
pub fn plugin_root() -> Artifact {
    Artifact::new(
        ArtifactId::new(ROOT_GROUP, ROOT_NAME, ROOT_NAME, DEFAULT_TYPE),
        Version::new(0, 0, 0),
    )
}

/// Loads plugins into a project
pub struct PluginLoader {
    project: ProjectHandle,
    runtime: Rc<RuntimeConfiguration>,
    output: Rc<dyn Output>,
    registry: TypeRegistry,
}

impl PluginLoader {
    pub fn new(project: ProjectHandle, runtime: Rc<RuntimeConfiguration>, output: Rc<dyn Output>) -> Self {
        Self {
            project,
            runtime,
            output,
            registry: TypeRegistry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Resolves `artifact`, instantiates the type its descriptor names and
    /// registers the instance on the project as `name`
    pub fn load(&self, name: &str, artifact: &Artifact) -> Result<Rc<dyn Plugin>, BuildError> {
        self.output
            .debug(&format!("Loading plugin [{name}] with artifact [{artifact}]"));

        // The borrow ends before the constructor runs; constructors touch the project
        let workflow = {
            let project = self.project.borrow();
            if project.workflow.fetch.is_empty() || project.workflow.publish.is_empty() {
                return Err(PluginLoadError::MissingWorkflow.into());
            }
            project.workflow.clone()
        };

        let (class, classpath) = self.resolve(name, artifact, &workflow)?;
        let constructor = match self.registry.lookup(&class, &classpath) {
            Lookup::NotFound => {
                return Err(PluginLoadError::ClassNotFound {
                    plugin: name.to_string(),
                    class,
                }
                .into())
            }
            Lookup::NoConstructor => {
                return Err(PluginLoadError::MissingConstructor {
                    plugin: name.to_string(),
                    class,
                }
                .into())
            }
            Lookup::Found(constructor) => Rc::clone(constructor),
        };

        let context = PluginContext {
            project: Rc::clone(&self.project),
            runtime: Rc::clone(&self.runtime),
            output: Rc::clone(&self.output),
        };

        let instance = match constructor(&context) {
            Ok(instance) => instance,
            Err(ConstructError::Build(error)) => return Err(error),
            Err(ConstructError::Other(source)) => {
                return Err(PluginLoadError::Construction {
                    plugin: name.to_string(),
                    class,
                    source,
                }
                .into())
            }
        };

        let plugin = match instance.downcast::<Rc<dyn Plugin>>() {
            Ok(plugin) => *plugin,
            Err(_) => {
                return Err(PluginLoadError::NotAPlugin {
                    plugin: name.to_string(),
                    class,
                }
                .into())
            }
        };

        tracing::debug!(plugin = name, %class, "plugin loaded");
        self.project
            .borrow_mut()
            .plugins
            .insert(name.to_string(), Rc::clone(&plugin));

        Ok(plugin)
    }

    /// Resolves the plugin's classpath and reads the type its descriptor names
    fn resolve(
        &self,
        name: &str,
        artifact: &Artifact,
        workflow: &Workflow,
    ) -> Result<(String, ResolvedArtifactGraph), BuildError> {
        let root = plugin_root();
        let dependencies = Dependencies::new([DependencyGroup::new("runtime", false, [artifact.clone()])]);
        let rules = TraversalRules::plugin();

        let service = DependencyService::new(workflow);
        let graph = service.artifact_graph(&root, &dependencies, &rules)?;
        let resolved = service.resolve(&graph, &rules)?;

        let path = resolved
            .get_path(&artifact.id)
            .ok_or_else(|| BuildError::ArtifactMissing {
                artifact: artifact.to_string(),
            })?;

        self.output
            .debug(&format!("Classpath for plugin [{name}] is [{}]", resolved.to_classpath()));

        let class = read_plugin_class(path, name)?;
        Ok((class, resolved))
    }
}
