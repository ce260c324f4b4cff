//! Built-in plugin that prints the project's dependency tree

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{Plugin, PluginContext};
use crate::domain::{ArtifactId, Project, ProjectHandle, Target, DEFAULT_TYPE};
use crate::error::BuildError;
use crate::output::Output;

/// The project owns its plugins, so the plugin only holds a weak handle back
pub struct DependencyPlugin {
    project: Weak<RefCell<Project>>,
    output: Rc<dyn Output>,
}

impl DependencyPlugin {
    pub const TYPE_NAME: &'static str = "org.savantbuild.plugin.dependency.DependencyPlugin";

    /// Artifact that ships this plugin
    pub fn provider() -> ArtifactId {
        ArtifactId::new("org.savantbuild.plugin", "dependency", "dependency", DEFAULT_TYPE)
    }

    /// Registers the `dependency-tree` target on the project
    pub fn new(context: &PluginContext) -> Self {
        let project = Rc::downgrade(&context.project);
        let output = Rc::clone(&context.output);

        let target = Target::new("dependency-tree", {
            let project = Weak::clone(&project);
            let output = Rc::clone(&output);
            move || {
                let project = project
                    .upgrade()
                    .ok_or_else(|| BuildError::BuildFailure("The project is no longer available".into()))?;
                let tree = project.borrow_mut().artifact_graph()?.render();
                output.info(&tree);
                Ok(())
            }
        })
        .with_description("Prints the project's resolved dependency tree");

        context.project.borrow_mut().add_target(target);

        Self { project, output }
    }

    /// The project, while it is still alive
    pub fn project(&self) -> Option<ProjectHandle> {
        self.project.upgrade()
    }

    pub fn output(&self) -> &Rc<dyn Output> {
        &self.output
    }
}

impl Plugin for DependencyPlugin {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
