//! Target execution

use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use super::configuration::RuntimeConfiguration;
use crate::domain::{ProjectHandle, TargetAction, Traversal};
use crate::error::BuildError;
use crate::output::Output;
use crate::parser::BuildFileParser;

/// Runs targets of a project, each at most once per run
pub struct ProjectRunner {
    output: Rc<dyn Output>,
}

impl ProjectRunner {
    pub fn new(output: Rc<dyn Output>) -> Self {
        Self { output }
    }

    /// Runs each requested target after everything it depends on
    pub fn run(&self, project: &ProjectHandle, targets: &[String]) -> Result<(), BuildError> {
        let mut executed = HashSet::new();
        for name in targets {
            for (target, action) in self.schedule(project, name)? {
                if executed.contains(&target) {
                    continue;
                }

                self.output.info(&format!(":[{target}]:"));
                action()?;
                self.output.info("");
                executed.insert(target);
            }
        }

        Ok(())
    }

    /// Dependencies first, the target itself last. Actions are cloned out so
    /// no borrow of the project is held while they run.
    fn schedule(&self, project: &ProjectHandle, name: &str) -> Result<Vec<(String, TargetAction)>, BuildError> {
        let project = project.borrow();
        if !project.targets.contains_key(name) {
            self.output.error(&format!("Invalid target [{name}]"));
            return Err(BuildError::UnknownTarget(name.to_string()));
        }

        let mut order = Vec::new();
        project
            .target_graph
            .traverse_post_order(&name.to_string(), Traversal::Down, |_, dependency, _, _| {
                order.push(dependency.clone());
            })?;
        order.push(name.to_string());

        order
            .into_iter()
            .map(|target| match project.targets.get(&target) {
                Some(found) => Ok((target, Rc::clone(&found.action))),
                None => Err(BuildError::UnknownTarget(target)),
            })
            .collect()
    }
}

/// Parses the build file and then prints help, lists targets or runs them
pub struct BuildRunner {
    output: Rc<dyn Output>,
}

impl BuildRunner {
    pub fn new(output: Rc<dyn Output>) -> Self {
        Self { output }
    }

    pub fn run(&self, build_file: &Path, runtime: Rc<RuntimeConfiguration>) -> Result<(), BuildError> {
        let parser = BuildFileParser::new(Rc::clone(&self.output), Rc::clone(&runtime));
        let project = parser.parse(build_file)?;

        if runtime.help {
            self.print_help(&project);
            return Ok(());
        }

        if runtime.list_targets {
            self.print_targets(&project);
            return Ok(());
        }

        ProjectRunner::new(Rc::clone(&self.output)).run(&project, &runtime.targets)
    }

    fn print_help(&self, project: &ProjectHandle) {
        let lines = [
            "Usage: sb [switches] [targets]",
            "",
            "Switches:",
            "",
            "   --noColor      Disables the colorized output",
            "   --debug        Enables debug output",
            "   --help         Displays the help message",
            "   --listTargets  Lists the build targets",
            "   --version      Displays the version",
            "",
            "Any other argument starting with '--' is a switch. Switches can have values:",
            "",
            "   --switch",
            "   --switch=value",
            "",
        ];
        for line in lines {
            self.output.info(line);
        }
        self.print_targets(project);
    }

    fn print_targets(&self, project: &ProjectHandle) {
        self.output.info("Targets in the project build file:");
        self.output.info("");
        for (name, target) in &project.borrow().targets {
            let description = target.description.as_deref().unwrap_or("No description");
            self.output.info(&format!("  {name}: {description}"));
        }
    }
}
