//! Transitive dependency graph
//!
//! Nodes are artifact identities; every edge records the version of the
//! origin it belongs to and the version it requests, so several versions of
//! one artifact can coexist until the graph is reduced.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write;

use crate::domain::{Artifact, ArtifactId, ArtifactMetaData, Dependencies, Graph, License, Version};
use crate::error::BuildError;
use crate::workflow::Workflow;

use super::rules::{TraversalRule, TraversalRules};

/// One dependency request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    /// Version of the origin that declares this dependency
    pub dependent_version: Version,

    /// Version requested for the destination
    pub dependency_version: Version,

    /// Group the dependency is declared in
    pub group: String,

    pub licenses: Vec<License>,
    pub skip_compatibility_check: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    pub root: Artifact,
    pub graph: Graph<ArtifactId, DependencyEdge>,

    /// Upstream version strings of artifacts that were mapped
    non_semantic: HashMap<(ArtifactId, Version), String>,
}

impl DependencyGraph {
    pub fn new(root: Artifact) -> Self {
        let mut graph = Graph::new();
        graph.add_node(root.id.clone());
        Self {
            root,
            graph,
            non_semantic: HashMap::new(),
        }
    }

    /// Rebuilds the artifact for a node at a version
    pub fn artifact(&self, id: &ArtifactId, version: &Version) -> Artifact {
        let mut artifact = Artifact::new(id.clone(), version.clone());
        artifact.non_semantic_version = self.non_semantic.get(&(id.clone(), version.clone())).cloned();
        artifact
    }

    /// Dependencies declared by `id` at `version`
    pub fn requests_from(&self, id: &ArtifactId, version: &Version) -> Vec<(&ArtifactId, &DependencyEdge)> {
        self.graph
            .outgoing(id)
            .into_iter()
            .filter(|(_, edge)| edge.dependent_version == *version)
            .collect()
    }

    fn add(&mut self, origin: &ArtifactId, dependency: &Artifact, edge: DependencyEdge) -> Result<(), BuildError> {
        if let Some(raw) = &dependency.non_semantic_version {
            self.non_semantic
                .insert((dependency.id.clone(), dependency.version.clone()), raw.clone());
        }

        let exists = self
            .graph
            .outgoing(origin)
            .iter()
            .any(|(destination, existing)| **destination == dependency.id && **existing == edge);
        if !exists {
            self.graph.add_edge(origin.clone(), dependency.id.clone(), edge)?;
        }
        Ok(())
    }

    /// Renders the graph as an indented tree, marking `highlight`
    pub fn render(&self, highlight: Option<&ArtifactId>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.root);
        self.render_node(&self.root.id, &self.root.version, 1, highlight, &mut out);
        out
    }

    fn render_node(
        &self,
        id: &ArtifactId,
        version: &Version,
        depth: usize,
        highlight: Option<&ArtifactId>,
        out: &mut String,
    ) {
        for (destination, edge) in self.requests_from(id, version) {
            let artifact = self.artifact(destination, &edge.dependency_version);
            let marker = if highlight == Some(destination) { "  <-- CONFLICT" } else { "" };
            let _ = writeln!(out, "{}{} [{}]{}", "  ".repeat(depth), artifact, edge.group, marker);
            self.render_node(destination, &edge.dependency_version, depth + 1, highlight, out);
        }
    }
}

/// Expands `dependencies` of `root` into the full transitive graph
pub fn build_graph(
    root: &Artifact,
    dependencies: &Dependencies,
    workflow: &Workflow,
    rules: &TraversalRules,
) -> Result<DependencyGraph, BuildError> {
    let mut builder = Builder {
        workflow,
        graph: DependencyGraph::new(root.clone()),
        metadata: HashMap::new(),
        expanded: HashSet::new(),
    };

    let direct = TraversalRule::direct(false);
    for group in dependencies.groups() {
        let rule = rules.get(&group.name).unwrap_or_else(|| {
            tracing::debug!(group = %group.name, "no traversal rule, only direct dependencies are used");
            &direct
        });

        for dependency in &group.dependencies {
            builder.expand(&root.id, &root.version, dependency, &group.name, rule, &BTreeSet::new())?;
        }
    }

    Ok(builder.graph)
}

struct Builder<'a> {
    workflow: &'a Workflow,
    graph: DependencyGraph,
    metadata: HashMap<(ArtifactId, Version), ArtifactMetaData>,

    /// Expansions done so far, with the exclusions in effect for each. The
    /// same artifact reached under different exclusions is expanded again.
    expanded: HashSet<(ArtifactId, Version, BTreeSet<ArtifactId>)>,
}

impl Builder<'_> {
    fn fetch_metadata(&mut self, artifact: &Artifact) -> Result<ArtifactMetaData, BuildError> {
        let key = (artifact.id.clone(), artifact.version.clone());
        if let Some(metadata) = self.metadata.get(&key) {
            return Ok(metadata.clone());
        }

        let metadata = self.workflow.fetch_metadata(artifact)?;
        self.metadata.insert(key, metadata.clone());
        Ok(metadata)
    }

    fn expand(
        &mut self,
        origin: &ArtifactId,
        origin_version: &Version,
        dependency: &Artifact,
        group: &str,
        rule: &TraversalRule,
        exclusions: &BTreeSet<ArtifactId>,
    ) -> Result<(), BuildError> {
        if exclusions.contains(&dependency.id) {
            tracing::debug!(artifact = %dependency.id, from = %origin, "excluded");
            return Ok(());
        }

        let metadata = self.fetch_metadata(dependency)?;
        let edge = DependencyEdge {
            dependent_version: origin_version.clone(),
            dependency_version: dependency.version.clone(),
            group: group.to_string(),
            licenses: metadata.licenses.clone(),
            skip_compatibility_check: dependency.skip_compatibility_check,
        };
        tracing::trace!(from = %origin, to = %dependency, group, "edge");
        self.graph.add(origin, dependency, edge)?;

        if !rule.transitive {
            return Ok(());
        }

        let mut below = exclusions.clone();
        below.extend(dependency.exclusions.iter().cloned());

        let key = (dependency.id.clone(), dependency.version.clone(), below.clone());
        if !self.expanded.insert(key) {
            return Ok(());
        }

        for child_group in metadata.dependencies.groups() {
            if !child_group.export || !rule.follows(&child_group.name) {
                continue;
            }

            for child in &child_group.dependencies {
                self.expand(&dependency.id, &dependency.version, child, &child_group.name, rule, &below)?;
            }
        }

        Ok(())
    }
}
