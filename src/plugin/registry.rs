//! Types that can be instantiated by name
//!
//! The registry is the only place where plugin types are looked up
//! dynamically. Every entry names the artifact that provides the type, and
//! a lookup only succeeds when that artifact is on the resolved classpath.
//! An entry may lack a standard constructor, and a constructor may produce
//! something that is not a plugin; the loader reports both.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use super::{Plugin, PluginContext};
use crate::dependency::ResolvedArtifactGraph;
use crate::domain::ArtifactId;
use crate::error::BuildError;

/// Failure raised by a plugin constructor
#[derive(Debug, Error)]
pub enum ConstructError {
    /// A build error the plugin wants reported as is
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Standard constructor: `(project, runtime configuration, output)`
pub type Constructor = Rc<dyn Fn(&PluginContext) -> Result<Box<dyn Any>, ConstructError>>;

#[derive(Clone)]
struct Entry {
    provider: ArtifactId,
    constructor: Option<Constructor>,
}

#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Entry>,
}

/// Result of looking a type up
pub enum Lookup<'a> {
    NotFound,
    NoConstructor,
    Found(&'a Constructor),
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the plugins that ship with the tool
    pub fn builtin() -> Self {
        use super::dependency::DependencyPlugin;

        let mut registry = Self::new();
        registry.register_plugin(DependencyPlugin::provider(), DependencyPlugin::TYPE_NAME, |context| {
            Ok(DependencyPlugin::new(context))
        });
        registry
    }

    /// Registers a plugin type provided by the `provider` artifact
    pub fn register_plugin<P, F>(&mut self, provider: ArtifactId, name: impl Into<String>, constructor: F)
    where
        P: Plugin + 'static,
        F: Fn(&PluginContext) -> Result<P, ConstructError> + 'static,
    {
        let constructor: Constructor = Rc::new(move |context: &PluginContext| {
            let plugin: Rc<dyn Plugin> = Rc::new(constructor(context)?);
            Ok(Box::new(plugin) as Box<dyn Any>)
        });
        self.insert(provider, name.into(), Some(constructor));
    }

    /// Registers any type with a constructor
    pub fn register(&mut self, provider: ArtifactId, name: impl Into<String>, constructor: Constructor) {
        self.insert(provider, name.into(), Some(constructor));
    }

    /// Registers a type that has no standard constructor
    pub fn register_without_constructor(&mut self, provider: ArtifactId, name: impl Into<String>) {
        self.insert(provider, name.into(), None);
    }

    fn insert(&mut self, provider: ArtifactId, name: String, constructor: Option<Constructor>) {
        self.types.insert(name, Entry { provider, constructor });
    }

    /// Looks `name` up among the types provided by `classpath`
    pub fn lookup(&self, name: &str, classpath: &ResolvedArtifactGraph) -> Lookup<'_> {
        let Some(entry) = self.types.get(name) else {
            return Lookup::NotFound;
        };
        if classpath.get(&entry.provider).is_none() {
            tracing::debug!(class = name, provider = %entry.provider, "type provider is not on the classpath");
            return Lookup::NotFound;
        }

        match &entry.constructor {
            None => Lookup::NoConstructor,
            Some(constructor) => Lookup::Found(constructor),
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
