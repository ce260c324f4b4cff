//! # Plugin System
//!
//! Plugins are published artifacts like any other dependency.
//!
//! ## Loading
//!
//! ```text
//! artifact ── build graph ── reduce ── resolve ── archive
//!                                                   │
//!                        savant-plugin.toml ◄───────┘
//!                              │ plugin-class
//!                              ▼
//!                         TypeRegistry ── constructor(context) ── Rc<dyn Plugin>
//! ```
//!
//! The plugin is resolved in its own graph, rooted at a synthetic artifact,
//! so that it never collides with the project's graph.
//!
//! ## Constructors
//!
//! A plugin type is instantiated with a [`PluginContext`] holding the
//! project, the runtime configuration and the output. A constructor that
//! fails with [`ConstructError::Build`] has its error reported unchanged.
//!
//! ## Built-in Plugins
//!
//! - `org.savantbuild.plugin.dependency.DependencyPlugin`: adds the
//!   `dependency-tree` target

mod dependency;
mod descriptor;
mod loader;
mod registry;

use std::any::Any;
use std::io;
use std::rc::Rc;

use thiserror::Error;

use crate::domain::ProjectHandle;
use crate::output::Output;
use crate::runtime::RuntimeConfiguration;

pub use dependency::DependencyPlugin;
pub use descriptor::{read_plugin_class, DESCRIPTOR_NAME};
pub use loader::{plugin_root, PluginLoader};
pub use registry::{ConstructError, Constructor, Lookup, TypeRegistry};

/// Extension code loaded into a build
pub trait Plugin: Any {
    fn as_any(&self) -> &dyn Any;
}

/// Everything a plugin receives at construction
#[derive(Clone)]
pub struct PluginContext {
    pub project: ProjectHandle,
    pub runtime: Rc<RuntimeConfiguration>,
    pub output: Rc<dyn Output>,
}

#[derive(Debug, Error)]
pub enum PluginLoadError {
    #[error(
        "Your project uses plugins but doesn't have a workflow defined to fetch them. \
         Define a workflow in your build file like this:\n\n  [workflow]\n  standard = true"
    )]
    MissingWorkflow,

    #[error("Invalid plugin [{plugin}]. The archive does not contain a {} descriptor", DESCRIPTOR_NAME)]
    MissingDescriptor { plugin: String },

    #[error("Invalid plugin [{plugin}]. The {} descriptor does not name a plugin-class", DESCRIPTOR_NAME)]
    MissingPluginClass { plugin: String },

    #[error("Invalid plugin [{plugin}]. The {} descriptor is not valid TOML: {message}", DESCRIPTOR_NAME)]
    InvalidDescriptor { plugin: String, message: String },

    #[error("Unable to load plugin [{plugin}] because the plugin archive could not be read")]
    Unreadable {
        plugin: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to load plugin [{plugin}] because the plugin class [{class}] was not found on the plugin classpath")]
    ClassNotFound { plugin: String, class: String },

    #[error("Unable to load plugin [{plugin}] because the plugin class [{class}] does not implement the Plugin trait")]
    NotAPlugin { plugin: String, class: String },

    #[error(
        "Unable to load plugin [{plugin}] because the plugin class [{class}] could not be instantiated. \
         It must have a constructor like this:\n\n  fn new(context: &PluginContext) -> Result<MyPlugin, ConstructError>\n"
    )]
    MissingConstructor { plugin: String, class: String },

    #[error("Unable to load plugin [{plugin}] because the plugin class [{class}] could not be instantiated")]
    Construction {
        plugin: String,
        class: String,
        #[source]
        source: anyhow::Error,
    },
}
