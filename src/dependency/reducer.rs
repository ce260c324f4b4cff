//! Graph reduction and compatibility checking
//!
//! Nodes are visited dependents-first. Only requests made by the version
//! of the origin that was itself chosen count; the highest of them wins.
//! Two different versions requested without `skip-compatibility-check`
//! are a conflict.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::domain::{Artifact, ArtifactId, Graph, Traversal, Version};
use crate::error::BuildError;

use super::builder::{DependencyEdge, DependencyGraph};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CompatibilityError {
    pub artifact: ArtifactId,
    pub versions: Vec<Version>,

    /// Path from the root to each conflicting request
    pub paths: Vec<Vec<String>>,

    /// The dependency graph with the conflicting artifact marked
    pub tree: String,
}

impl fmt::Display for CompatibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let versions: Vec<String> = self.versions.iter().map(ToString::to_string).collect();
        writeln!(
            f,
            "The artifact [{}] has incompatible versions in your dependencies. The versions are [{}]",
            self.artifact,
            versions.join(", ")
        )?;
        for path in &self.paths {
            writeln!(f, "  {}", path.join(" -> "))?;
        }
        write!(f, "\n{}", self.tree)
    }
}

/// One chosen version per artifact identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactGraph {
    pub root: Artifact,
    pub graph: Graph<Artifact, String>,
}

impl ArtifactGraph {
    /// Artifacts in the graph, excluding the root
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.graph.nodes().filter(move |artifact| *artifact != &self.root)
    }

    pub fn version(&self, id: &ArtifactId) -> Option<&Version> {
        self.graph.nodes().find(|a| a.id == *id).map(|a| &a.version)
    }

    pub fn len(&self) -> usize {
        self.artifacts().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walks down from the root, visiting every artifact once in
    /// declaration order
    pub fn walk<F>(&self, mut visitor: F)
    where
        F: FnMut(&Artifact, &Artifact, &str, usize),
    {
        let mut seen = HashSet::new();
        let _ = self.graph.traverse(&self.root, Traversal::Down, |from, to, group, depth| {
            let first = seen.insert(to.clone());
            if first {
                visitor(from, to, group, depth);
            }
            first
        });
    }

    /// Indented tree of the reduced graph
    pub fn render(&self) -> String {
        let mut lines = vec![self.root.to_string()];
        let _ = self.graph.traverse(&self.root, Traversal::Down, |_, to, group, depth| {
            lines.push(format!("{}{} [{}]", "  ".repeat(depth), to, group));
            true
        });
        lines.join("\n")
    }
}

/// Collapses the graph to one version per artifact
///
/// Fails with [`BuildError::Compatibility`] on a version conflict.
pub fn reduce(dependencies: &DependencyGraph) -> Result<ArtifactGraph, BuildError> {
    let order = dependencies.graph.topological_order()?;
    let mut chosen: HashMap<ArtifactId, Version> = HashMap::new();
    chosen.insert(dependencies.root.id.clone(), dependencies.root.version.clone());

    for id in order.iter().rev() {
        if *id == dependencies.root.id {
            continue;
        }

        let live = live_requests(dependencies, &chosen, id);
        if live.is_empty() {
            tracing::trace!(artifact = %id, "no longer reachable");
            continue;
        }

        let checked: BTreeSet<&Version> = live
            .iter()
            .filter(|(_, edge)| !edge.skip_compatibility_check)
            .map(|(_, edge)| &edge.dependency_version)
            .collect();
        if checked.len() > 1 {
            return Err(conflict(dependencies, &chosen, id, &live).into());
        }

        if let Some(version) = live.iter().map(|(_, edge)| &edge.dependency_version).max() {
            tracing::debug!(artifact = %id, %version, "chosen");
            chosen.insert(id.clone(), version.clone());
        }
    }

    let artifact = |id: &ArtifactId| chosen.get(id).map(|version| dependencies.artifact(id, version));

    let mut graph = Graph::new();
    let root = dependencies.artifact(&dependencies.root.id, &dependencies.root.version);
    graph.add_node(root.clone());

    let mut added = HashSet::new();
    for (origin, destination, edge) in dependencies.graph.edges() {
        if chosen.get(origin) != Some(&edge.dependent_version) {
            continue;
        }
        let (Some(from), Some(to)) = (artifact(origin), artifact(destination)) else {
            continue;
        };
        if added.insert((origin.clone(), destination.clone(), edge.group.clone())) {
            graph.add_edge(from, to, edge.group.clone())?;
        }
    }

    Ok(ArtifactGraph { root, graph })
}

/// Requests for `id` made by the chosen version of their origin
fn live_requests<'a>(
    dependencies: &'a DependencyGraph,
    chosen: &HashMap<ArtifactId, Version>,
    id: &ArtifactId,
) -> Vec<(&'a ArtifactId, &'a DependencyEdge)> {
    dependencies
        .graph
        .incoming(id)
        .into_iter()
        .filter(|(origin, edge)| chosen.get(*origin) == Some(&edge.dependent_version))
        .collect()
}

fn conflict(
    dependencies: &DependencyGraph,
    chosen: &HashMap<ArtifactId, Version>,
    id: &ArtifactId,
    live: &[(&ArtifactId, &DependencyEdge)],
) -> CompatibilityError {
    let mut versions = BTreeSet::new();
    let mut paths = Vec::new();

    for (origin, edge) in live.iter().filter(|(_, edge)| !edge.skip_compatibility_check) {
        versions.insert(edge.dependency_version.clone());

        let mut path = path_from_root(dependencies, chosen, origin);
        path.push(dependencies.artifact(id, &edge.dependency_version).to_string());
        paths.push(path);
    }

    CompatibilityError {
        artifact: id.clone(),
        versions: versions.into_iter().collect(),
        paths,
        tree: dependencies.render(Some(id)),
    }
}

fn path_from_root(
    dependencies: &DependencyGraph,
    chosen: &HashMap<ArtifactId, Version>,
    node: &ArtifactId,
) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = node.clone();

    while let Some(version) = chosen.get(&current) {
        path.push(dependencies.artifact(&current, version).to_string());
        if current == dependencies.root.id {
            break;
        }

        match live_requests(dependencies, chosen, &current).first() {
            Some((origin, _)) => current = (*origin).clone(),
            None => break,
        }
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::builder::build_graph;
    use crate::dependency::rules::TraversalRules;
    use crate::domain::{ArtifactMetaData, Dependencies, DependencyGroup};
    use crate::test_support::{cache_workflow, metadata, publish, publish_artifact};
    use tempfile::TempDir;

    fn root() -> Artifact {
        Artifact::parse("org.example:project:1.0.0").unwrap()
    }

    fn id(spec: &str) -> ArtifactId {
        Artifact::parse(spec).unwrap().id
    }

    /// a -> c@1.0.0, b -> c@1.1.0
    fn diamond(dir: &std::path::Path, skip_lower: bool) -> DependencyGraph {
        let mut lower = Artifact::parse("org.example:c:1.0.0").unwrap();
        lower.skip_compatibility_check = skip_lower;
        let a_metadata = ArtifactMetaData::new(
            Dependencies::new([DependencyGroup::new("compile", true, [lower])]),
            [],
        );

        publish(dir, "org.example:a:1.0.0", &a_metadata);
        publish(dir, "org.example:b:1.0.0", &metadata(&[("compile", &["org.example:c:1.1.0"])]));
        publish(dir, "org.example:c:1.0.0", &metadata(&[]));
        publish(dir, "org.example:c:1.1.0", &metadata(&[]));

        let dependencies = Dependencies::new([DependencyGroup::new(
            "compile",
            true,
            [
                Artifact::parse("org.example:a:1.0.0").unwrap(),
                Artifact::parse("org.example:b:1.0.0").unwrap(),
            ],
        )]);

        build_graph(&root(), &dependencies, &cache_workflow(dir), &TraversalRules::project()).unwrap()
    }

    fn compatibility_error(result: Result<ArtifactGraph, BuildError>) -> CompatibilityError {
        match result {
            Err(BuildError::Compatibility(err)) => err,
            other => panic!("expected a compatibility error, got {other:?}"),
        }
    }

    #[test]
    fn conflicting_versions_are_rejected() {
        let dir = TempDir::new().unwrap();
        let err = compatibility_error(reduce(&diamond(dir.path(), false)));

        assert_eq!(err.artifact, id("org.example:c:1.0.0"));
        assert_eq!(err.versions, vec![Version::new(1, 0, 0), Version::new(1, 1, 0)]);
        assert_eq!(
            err.paths[0],
            vec![
                "org.example:project:project:1.0.0:jar",
                "org.example:a:a:1.0.0:jar",
                "org.example:c:c:1.0.0:jar"
            ]
        );
        assert!(err.to_string().contains("incompatible versions"));
    }

    #[test]
    fn skip_compatibility_lets_highest_win() {
        let dir = TempDir::new().unwrap();
        let reduced = reduce(&diamond(dir.path(), true)).unwrap();

        assert_eq!(reduced.version(&id("org.example:c:1.0.0")), Some(&Version::new(1, 1, 0)));
        assert_eq!(reduced.len(), 3);
    }

    #[test]
    fn dependencies_of_losing_versions_are_dropped() {
        let dir = TempDir::new().unwrap();
        let a = ArtifactMetaData::new(
            Dependencies::new([DependencyGroup::new(
                "compile",
                true,
                [Artifact::parse("org.example:c:1.0.0").unwrap().skip_compatibility_check()],
            )]),
            [],
        );
        publish_artifact(dir.path(), &Artifact::parse("org.example:a:1.0.0").unwrap(), &a);
        publish(dir.path(), "org.example:b:1.0.0", &metadata(&[("compile", &["org.example:c:1.1.0"])]));
        publish(dir.path(), "org.example:c:1.0.0", &metadata(&[("compile", &["org.example:old:1.0.0"])]));
        publish(dir.path(), "org.example:c:1.1.0", &metadata(&[]));
        publish(dir.path(), "org.example:old:1.0.0", &metadata(&[]));

        let dependencies = Dependencies::new([DependencyGroup::new(
            "compile",
            true,
            [
                Artifact::parse("org.example:a:1.0.0").unwrap(),
                Artifact::parse("org.example:b:1.0.0").unwrap(),
            ],
        )]);

        let graph = build_graph(&root(), &dependencies, &cache_workflow(dir.path()), &TraversalRules::project()).unwrap();
        assert!(graph.graph.contains(&id("org.example:old:1.0.0")));

        let reduced = reduce(&graph).unwrap();
        assert!(reduced.version(&id("org.example:old:1.0.0")).is_none());
        assert_eq!(reduced.version(&id("org.example:c:1.0.0")), Some(&Version::new(1, 1, 0)));
    }

    #[test]
    fn same_version_twice_is_not_a_conflict() {
        let dir = TempDir::new().unwrap();
        publish(dir.path(), "org.example:a:1.0.0", &metadata(&[("compile", &["org.example:c:1.0.0"])]));
        publish(dir.path(), "org.example:c:1.0.0", &metadata(&[]));

        let dependencies = Dependencies::new([DependencyGroup::new(
            "compile",
            true,
            [
                Artifact::parse("org.example:a:1.0.0").unwrap(),
                Artifact::parse("org.example:c:1.0.0").unwrap(),
            ],
        )]);

        let graph = build_graph(&root(), &dependencies, &cache_workflow(dir.path()), &TraversalRules::project()).unwrap();
        let reduced = reduce(&graph).unwrap();

        assert_eq!(reduced.len(), 2);
        let mut walked = Vec::new();
        reduced.walk(|_, to, _, _| walked.push(to.id.name.clone()));
        assert_eq!(walked, vec!["a", "c"]);
    }
}
