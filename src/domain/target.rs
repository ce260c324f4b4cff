//! Named build targets and the graph between them

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::graph::Graph;
use crate::error::BuildError;

/// The work a target performs
pub type TargetAction = Rc<dyn Fn() -> Result<(), BuildError>>;

/// A named, invocable unit of build work
#[derive(Clone)]
pub struct Target {
    pub name: String,
    pub description: Option<String>,

    /// Names of the targets that must run first, in declared order
    pub dependencies: Vec<String>,

    pub action: TargetAction,
}

impl Target {
    pub fn new(name: impl Into<String>, action: impl Fn() -> Result<(), BuildError> + 'static) -> Self {
        Self {
            name: name.into(),
            description: None,
            dependencies: Vec::new(),
            action: Rc::new(action),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Builds the target graph. Targets without dependencies are not in it.
pub fn build_target_graph(targets: &BTreeMap<String, Target>) -> Result<Graph<String, ()>, BuildError> {
    let mut graph = Graph::new();

    for (name, target) in targets {
        for dependency in &target.dependencies {
            if !targets.contains_key(dependency) {
                return Err(BuildError::Parse(format!(
                    "Invalid dependsOn for target [{name}]. Target [{dependency}] does not exist"
                )));
            }

            graph.add_edge(name.clone(), dependency.clone(), ())?;
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(list: Vec<Target>) -> BTreeMap<String, Target> {
        list.into_iter().map(|t| (t.name.clone(), t)).collect()
    }

    #[test]
    fn graph_follows_depends_on() {
        let targets = targets(vec![
            Target::new("compile", || Ok(())),
            Target::new("test", || Ok(())).depends_on(["compile"]),
            Target::new("clean", || Ok(())),
        ]);

        let graph = build_target_graph(&targets).unwrap();
        assert!(graph.contains(&"test".to_string()));
        assert!(graph.contains(&"compile".to_string()));
        assert!(!graph.contains(&"clean".to_string()));
    }

    #[test]
    fn missing_dependency_is_a_parse_error() {
        let targets = targets(vec![Target::new("test", || Ok(())).depends_on(["compile"])]);

        match build_target_graph(&targets) {
            Err(BuildError::Parse(message)) => {
                assert_eq!(
                    message,
                    "Invalid dependsOn for target [test]. Target [compile] does not exist"
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn cyclic_targets_are_rejected() {
        let targets = targets(vec![
            Target::new("a", || Ok(())).depends_on(["b"]),
            Target::new("b", || Ok(())).depends_on(["a"]),
        ]);

        assert!(matches!(build_target_graph(&targets), Err(BuildError::Cyclic(_))));
    }
}
