//! Generic directed graph with valued edges
//!
//! Shared by target scheduling and artifact resolution. An edge
//! `origin -> destination` means "origin depends on destination".
//! Uses petgraph for storage and topological ordering; traversal is done
//! here so that edge order follows insertion order and cycles are reported
//! with the offending path.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use thiserror::Error;

/// A cycle found while building or walking a graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cyclic dependency on [{node}]. Path: [{}]", path.join(" -> "))]
pub struct CyclicError {
    /// The node that closes the cycle
    pub node: String,

    /// The path that leads back to `node`
    pub path: Vec<String>,
}

/// Direction of a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Toward dependencies (follows edges from origin to destination)
    Down,

    /// Toward dependents (follows edges backwards)
    Up,
}

impl Traversal {
    fn direction(self) -> Direction {
        match self {
            Traversal::Down => Direction::Outgoing,
            Traversal::Up => Direction::Incoming,
        }
    }
}

/// Directed graph with a value on every edge
#[derive(Debug, Clone)]
pub struct Graph<N, E> {
    graph: DiGraph<N, E>,
    node_map: HashMap<N, NodeIndex>,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }
}

impl<N, E> Graph<N, E>
where
    N: Clone + Eq + Hash + fmt::Display,
{
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node without any edges. Returns false if it already existed.
    pub fn add_node(&mut self, node: N) -> bool {
        if self.node_map.contains_key(&node) {
            return false;
        }

        let idx = self.graph.add_node(node.clone());
        self.node_map.insert(node, idx);
        true
    }

    fn index_or_insert(&mut self, node: &N) -> NodeIndex {
        if let Some(idx) = self.node_map.get(node) {
            return *idx;
        }

        let idx = self.graph.add_node(node.clone());
        self.node_map.insert(node.clone(), idx);
        idx
    }

    /// Adds an edge `origin -> destination`, creating either node if needed
    ///
    /// Fails without modifying the graph if the edge would close a cycle.
    pub fn add_edge(&mut self, origin: N, destination: N, value: E) -> Result<(), CyclicError> {
        if origin == destination {
            return Err(CyclicError {
                node: origin.to_string(),
                path: vec![origin.to_string(), destination.to_string()],
            });
        }

        if let (Some(&from), Some(&to)) = (self.node_map.get(&origin), self.node_map.get(&destination)) {
            if let Some(back) = self.path_between(to, from) {
                let mut path = vec![origin.to_string()];
                path.extend(back.into_iter().map(|idx| self.graph[idx].to_string()));
                return Err(CyclicError {
                    node: origin.to_string(),
                    path,
                });
            }
        }

        let from = self.index_or_insert(&origin);
        let to = self.index_or_insert(&destination);
        self.graph.add_edge(from, to, value);
        Ok(())
    }

    /// Breadth-first search for a path of outgoing edges
    fn path_between(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(parent) = parents.get(&cursor) {
                    path.push(*parent);
                    cursor = *parent;
                }
                path.reverse();
                return Some(path);
            }

            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if seen.insert(next) {
                    parents.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Edges touching `idx` in the given direction, in insertion order
    fn ordered_edges(&self, idx: NodeIndex, direction: Direction) -> Vec<EdgeReference<'_, E>> {
        let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
        edges.sort_by_key(|edge| edge.id());
        edges
    }

    fn far_end(edge: &EdgeReference<'_, E>, direction: Direction) -> NodeIndex {
        match direction {
            Direction::Outgoing => edge.target(),
            Direction::Incoming => edge.source(),
        }
    }

    fn cyclic(&self, node: NodeIndex, active: &[NodeIndex]) -> CyclicError {
        let mut path: Vec<String> = active.iter().map(|idx| self.graph[*idx].to_string()).collect();
        path.push(self.graph[node].to_string());
        CyclicError {
            node: self.graph[node].to_string(),
            path,
        }
    }

    /// Walks the graph from `start`, calling `visitor(from, to, edge, depth)`
    /// for every edge reached
    ///
    /// `from` is the node being expanded and `to` the neighbour in the
    /// traversal direction. Returning false from the visitor stops the walk
    /// from descending below `to`. Depth starts at 1 for the edges of
    /// `start`. A node met again while it is still on the active path is
    /// reported as a cycle.
    pub fn traverse<F>(&self, start: &N, traversal: Traversal, mut visitor: F) -> Result<(), CyclicError>
    where
        F: FnMut(&N, &N, &E, usize) -> bool,
    {
        let Some(&idx) = self.node_map.get(start) else {
            return Ok(());
        };

        let mut active = Vec::new();
        self.walk(idx, traversal.direction(), 1, &mut active, &mut visitor)
    }

    fn walk<F>(
        &self,
        idx: NodeIndex,
        direction: Direction,
        depth: usize,
        active: &mut Vec<NodeIndex>,
        visitor: &mut F,
    ) -> Result<(), CyclicError>
    where
        F: FnMut(&N, &N, &E, usize) -> bool,
    {
        active.push(idx);
        for edge in self.ordered_edges(idx, direction) {
            let next = Self::far_end(&edge, direction);
            if active.contains(&next) {
                return Err(self.cyclic(next, active));
            }

            if visitor(&self.graph[idx], &self.graph[next], edge.weight(), depth) {
                self.walk(next, direction, depth + 1, active, visitor)?;
            }
        }
        active.pop();

        Ok(())
    }

    /// Walks the graph from `start` and reports every reachable node once,
    /// after everything beyond it has been reported
    ///
    /// With [`Traversal::Down`] this yields dependencies before the nodes
    /// that depend on them. The visitor receives the first edge that reached
    /// the node.
    pub fn traverse_post_order<F>(&self, start: &N, traversal: Traversal, mut visitor: F) -> Result<(), CyclicError>
    where
        F: FnMut(&N, &N, &E, usize),
    {
        let Some(&idx) = self.node_map.get(start) else {
            return Ok(());
        };

        let mut active = Vec::new();
        let mut finished = HashSet::new();
        self.walk_post_order(idx, traversal.direction(), 1, &mut active, &mut finished, &mut visitor)
    }

    fn walk_post_order<F>(
        &self,
        idx: NodeIndex,
        direction: Direction,
        depth: usize,
        active: &mut Vec<NodeIndex>,
        finished: &mut HashSet<NodeIndex>,
        visitor: &mut F,
    ) -> Result<(), CyclicError>
    where
        F: FnMut(&N, &N, &E, usize),
    {
        active.push(idx);
        for edge in self.ordered_edges(idx, direction) {
            let next = Self::far_end(&edge, direction);
            if active.contains(&next) {
                return Err(self.cyclic(next, active));
            }

            if finished.contains(&next) {
                continue;
            }

            self.walk_post_order(next, direction, depth + 1, active, finished, visitor)?;
            finished.insert(next);
            visitor(&self.graph[idx], &self.graph[next], edge.weight(), depth);
        }
        active.pop();

        Ok(())
    }

    /// Returns all nodes in dependency order (dependencies first)
    pub fn topological_order(&self) -> Result<Vec<N>, CyclicError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().rev().map(|idx| self.graph[idx].clone()).collect()),
            Err(cycle) => {
                let node = self.graph[cycle.node_id()].to_string();
                Err(CyclicError {
                    path: vec![node.clone()],
                    node,
                })
            }
        }
    }

    /// Returns the direct dependencies of a node with their edge values
    pub fn outgoing(&self, node: &N) -> Vec<(&N, &E)> {
        self.neighbours(node, Direction::Outgoing)
    }

    /// Returns the direct dependents of a node with their edge values
    pub fn incoming(&self, node: &N) -> Vec<(&N, &E)> {
        self.neighbours(node, Direction::Incoming)
    }

    fn neighbours(&self, node: &N, direction: Direction) -> Vec<(&N, &E)> {
        let Some(&idx) = self.node_map.get(node) else {
            return vec![];
        };

        self.ordered_edges(idx, direction)
            .into_iter()
            .map(|edge| (&self.graph[Self::far_end(&edge, direction)], edge.weight()))
            .collect()
    }

    /// Returns every edge as `(origin, destination, value)` in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (&N, &N, &E)> {
        self.graph
            .edge_references()
            .map(|edge| (&self.graph[edge.source()], &self.graph[edge.target()], edge.weight()))
    }

    /// Returns true if the graph contains the node
    pub fn contains(&self, node: &N) -> bool {
        self.node_map.contains_key(node)
    }

    /// Returns all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.graph.node_weights()
    }

    /// Returns the number of nodes in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Returns the number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl<N, E> PartialEq for Graph<N, E>
where
    N: Clone + Eq + Hash + fmt::Display,
    E: Eq + Hash,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() || self.edge_count() != other.edge_count() {
            return false;
        }

        if !self.nodes().all(|node| other.contains(node)) {
            return false;
        }

        let mut counts: HashMap<(&N, &N, &E), isize> = HashMap::new();
        for edge in self.edges() {
            *counts.entry(edge).or_default() += 1;
        }
        for edge in other.edges() {
            *counts.entry(edge).or_default() -= 1;
        }

        counts.values().all(|count| *count == 0)
    }
}

impl<N, E> Eq for Graph<N, E>
where
    N: Clone + Eq + Hash + fmt::Display,
    E: Eq + Hash,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn graph(edges: &[(&str, &str)]) -> Graph<String, ()> {
        let mut graph = Graph::new();
        for (origin, destination) in edges {
            graph
                .add_edge(origin.to_string(), destination.to_string(), ())
                .unwrap();
        }
        graph
    }

    #[test]
    fn empty_graph() {
        let graph: Graph<String, ()> = Graph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
    }

    #[test]
    fn add_edge_creates_nodes() {
        let graph = graph(&[("test", "compile")]);

        assert_eq!(graph.len(), 2);
        assert!(graph.contains(&"test".to_string()));
        assert!(graph.contains(&"compile".to_string()));
        assert_eq!(graph.outgoing(&"test".to_string()).len(), 1);
        assert_eq!(graph.incoming(&"compile".to_string()).len(), 1);
    }

    #[test]
    fn self_loop_rejected() {
        let mut graph: Graph<String, ()> = Graph::new();
        let err = graph.add_edge("a".into(), "a".into(), ()).unwrap_err();

        assert_eq!(err.node, "a");
        assert!(graph.is_empty());
    }

    #[test]
    fn cycle_rejected_with_path() {
        let mut graph = graph(&[("a", "b"), ("b", "c")]);
        let err = graph.add_edge("c".into(), "a".into(), ()).unwrap_err();

        assert_eq!(err.path, vec!["c", "a", "b", "c"]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn traverse_down_in_insertion_order() {
        let graph = graph(&[("int", "test"), ("test", "compile"), ("test", "copyResources")]);
        let mut seen = Vec::new();

        graph
            .traverse(&"int".to_string(), Traversal::Down, |from, to, _, depth| {
                seen.push(format!("{}->{}@{}", from, to, depth));
                true
            })
            .unwrap();

        assert_eq!(seen, vec!["int->test@1", "test->compile@2", "test->copyResources@2"]);
    }

    #[test]
    fn traverse_up_reaches_dependents() {
        let graph = graph(&[("int", "test"), ("test", "compile")]);
        let mut seen = Vec::new();

        graph
            .traverse(&"compile".to_string(), Traversal::Up, |_, to, _, _| {
                seen.push(to.clone());
                true
            })
            .unwrap();

        assert_eq!(seen, vec!["test", "int"]);
    }

    #[test]
    fn visitor_can_stop_descent() {
        let graph = graph(&[("a", "b"), ("b", "c")]);
        let mut seen = Vec::new();

        graph
            .traverse(&"a".to_string(), Traversal::Down, |_, to, _, _| {
                seen.push(to.clone());
                false
            })
            .unwrap();

        assert_eq!(seen, vec!["b"]);
    }

    #[test]
    fn post_order_visits_dependencies_first_and_once() {
        let graph = graph(&[("int", "test"), ("int", "compile"), ("test", "compile"), ("test", "copyResources")]);
        let mut seen = Vec::new();

        graph
            .traverse_post_order(&"int".to_string(), Traversal::Down, |_, to, _, _| seen.push(to.clone()))
            .unwrap();

        assert_eq!(seen, vec!["compile", "copyResources", "test"]);
    }

    #[test]
    fn traverse_unknown_start_is_noop() {
        let graph = graph(&[("a", "b")]);
        let mut calls = 0;
        graph
            .traverse(&"zzz".to_string(), Traversal::Down, |_, _, _, _| {
                calls += 1;
                true
            })
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let graph = graph(&[("a", "b"), ("b", "c")]);
        let order = graph.topological_order().unwrap();

        let pos = |n: &str| order.iter().position(|o| o == n).unwrap();
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
    }

    #[test]
    fn structural_equality() {
        let mut first: Graph<String, u32> = Graph::new();
        first.add_edge("a".into(), "b".into(), 1).unwrap();
        first.add_edge("a".into(), "c".into(), 2).unwrap();

        let mut second: Graph<String, u32> = Graph::new();
        second.add_edge("a".into(), "c".into(), 2).unwrap();
        second.add_edge("a".into(), "b".into(), 1).unwrap();

        assert_eq!(first, second);

        second.add_edge("a".into(), "b".into(), 1).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn edge_values_matter_for_equality() {
        let mut first: Graph<String, u32> = Graph::new();
        first.add_edge("a".into(), "b".into(), 1).unwrap();

        let mut second: Graph<String, u32> = Graph::new();
        second.add_edge("a".into(), "b".into(), 2).unwrap();

        assert_ne!(first, second);
    }

    proptest! {
        #[test]
        fn graph_never_accepts_a_cycle(edges in proptest::collection::vec((0u8..8, 0u8..8), 0..40)) {
            let mut graph: Graph<String, ()> = Graph::new();
            for (origin, destination) in edges {
                let _ = graph.add_edge(origin.to_string(), destination.to_string(), ());
            }

            prop_assert!(graph.topological_order().is_ok());

            let nodes: Vec<String> = graph.nodes().cloned().collect();
            for node in &nodes {
                prop_assert!(graph.traverse(node, Traversal::Down, |_, _, _, _| true).is_ok());
                let post_order_ok = graph.traverse_post_order(node, Traversal::Up, |_, _, _, _| {}).is_ok();
                prop_assert!(post_order_ok);
            }
        }
    }
}
