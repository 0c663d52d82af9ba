//! Directed acyclic graph for task dependency management.
//!
//! Used by the readiness evaluator to validate that a project's dependency
//! graph is acyclic before computing the ready set. A cycle is a
//! configuration error, never silently tolerated.
//!
//! **Note:** This module is internal to `collabflow-orch` to preserve
//! freedom to change internals.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Display;
use std::hash::Hash;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::{Error, Result};

/// A directed acyclic graph over values of type `T`.
///
/// Supports:
/// - Adding nodes and directed edges
/// - Topological sorting (Kahn's algorithm, deterministic tie-breaking)
/// - Cycle detection with path extraction
#[derive(Debug, Clone)]
pub struct Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    /// The underlying petgraph graph.
    graph: DiGraph<T, ()>,
    /// Map from node value to node index for fast lookup.
    index_map: HashMap<T, NodeIndex>,
    /// Insertion order for deterministic tie-breaking in toposort.
    insertion_order: Vec<NodeIndex>,
}

impl<T> Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    /// Creates a new empty DAG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index_map: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    /// Returns the number of nodes in the DAG.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Adds a node to the DAG.
    ///
    /// If the node already exists, this is a no-op.
    /// Returns the node index for use with `add_edge`.
    pub fn add_node(&mut self, value: T) -> NodeIndex {
        if let Some(&idx) = self.index_map.get(&value) {
            return idx;
        }
        let idx = self.graph.add_node(value.clone());
        self.index_map.insert(value, idx);
        self.insertion_order.push(idx);
        idx
    }

    /// Adds a directed edge from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if either node index is invalid.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> Result<()> {
        self.graph
            .node_weight(from)
            .ok_or_else(|| Error::GraphNodeNotFound {
                node: format!("index {}", from.index()),
            })?;
        self.graph
            .node_weight(to)
            .ok_or_else(|| Error::GraphNodeNotFound {
                node: format!("index {}", to.index()),
            })?;

        self.graph.add_edge(from, to, ());
        Ok(())
    }

    /// Returns a topologically sorted list of nodes.
    ///
    /// Uses Kahn's algorithm with deterministic tie-breaking: when
    /// multiple nodes have zero in-degree, they are processed in
    /// insertion order for reproducible results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] with the cycle path if the graph
    /// contains a cycle.
    pub fn toposort(&self) -> Result<Vec<T>> {
        let node_count = self.graph.node_count();
        if node_count == 0 {
            return Ok(Vec::new());
        }

        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::with_capacity(node_count);
        for idx in self.graph.node_indices() {
            in_degree.insert(idx, 0);
        }
        for edge in self.graph.edge_references() {
            *in_degree.entry(edge.target()).or_insert(0) += 1;
        }

        let mut queue: VecDeque<NodeIndex> = self
            .insertion_order
            .iter()
            .filter(|&&idx| in_degree.get(&idx).copied().unwrap_or(0) == 0)
            .copied()
            .collect();

        let mut result = Vec::with_capacity(node_count);

        while let Some(idx) = queue.pop_front() {
            let node = self
                .graph
                .node_weight(idx)
                .ok_or_else(|| Error::GraphNodeNotFound {
                    node: format!("index {}", idx.index()),
                })?
                .clone();
            result.push(node);

            let mut neighbors: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect();

            // Sort by insertion order position for deterministic ordering
            neighbors.sort_by_key(|n| {
                self.insertion_order
                    .iter()
                    .position(|&i| i == *n)
                    .unwrap_or(usize::MAX)
            });

            for neighbor in neighbors {
                if let Some(deg) = in_degree.get_mut(&neighbor) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        // If we didn't visit all nodes, the remainder contains a cycle.
        if result.len() != node_count {
            let remaining: HashSet<NodeIndex> = in_degree
                .iter()
                .filter(|(_, &deg)| deg > 0)
                .map(|(&idx, _)| idx)
                .collect();
            return Err(Error::CycleDetected {
                cycle: self.extract_cycle(&remaining),
            });
        }

        Ok(result)
    }

    /// Walks successors among the remaining (cyclic) nodes until a node
    /// repeats, then returns the cycle path as display strings.
    fn extract_cycle(&self, remaining: &HashSet<NodeIndex>) -> Vec<String> {
        let Some(&start) = self
            .insertion_order
            .iter()
            .find(|idx| remaining.contains(idx))
        else {
            return Vec::new();
        };

        let mut path: Vec<NodeIndex> = Vec::new();
        let mut seen: HashMap<NodeIndex, usize> = HashMap::new();
        let mut current = start;

        loop {
            if let Some(&pos) = seen.get(&current) {
                path.push(current);
                return path
                    .iter()
                    .skip(pos)
                    .filter_map(|&idx| self.graph.node_weight(idx))
                    .map(ToString::to_string)
                    .collect();
            }
            seen.insert(current, path.len());
            path.push(current);

            // Every remaining node has an outgoing edge into the remainder,
            // so this walk must revisit a node.
            let mut successors: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .filter(|idx| remaining.contains(idx))
                .collect();
            successors.sort_by_key(|n| {
                self.insertion_order
                    .iter()
                    .position(|&i| i == *n)
                    .unwrap_or(usize::MAX)
            });

            match successors.first() {
                Some(&next) => current = next,
                None => {
                    return path
                        .iter()
                        .filter_map(|&idx| self.graph.node_weight(idx))
                        .map(ToString::to_string)
                        .collect();
                }
            }
        }
    }
}

impl<T> Default for Dag<T>
where
    T: Clone + Eq + Hash + Display,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dag_from_edges(edges: &[(&str, &str)]) -> Dag<String> {
        let mut dag = Dag::new();
        for (from, to) in edges {
            let f = dag.add_node((*from).to_string());
            let t = dag.add_node((*to).to_string());
            dag.add_edge(f, t).unwrap();
        }
        dag
    }

    #[test]
    fn empty_dag_toposorts_to_empty() {
        let dag: Dag<String> = Dag::new();
        assert!(dag.toposort().unwrap().is_empty());
    }

    #[test]
    fn linear_chain_sorts_in_order() {
        let dag = dag_from_edges(&[("a", "b"), ("b", "c")]);
        assert_eq!(dag.toposort().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn tie_break_uses_insertion_order() {
        let mut dag = Dag::new();
        dag.add_node("b".to_string());
        dag.add_node("a".to_string());
        let sorted = dag.toposort().unwrap();
        assert_eq!(sorted, vec!["b", "a"]);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let dag = dag_from_edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let sorted = dag.toposort().unwrap();
        assert_eq!(sorted.len(), 4);
        assert_eq!(sorted[0], "a");
        assert_eq!(sorted[3], "d");
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let dag = dag_from_edges(&[("a", "b"), ("b", "a")]);
        let err = dag.toposort().unwrap_err();
        match err {
            Error::CycleDetected { cycle } => {
                assert!(cycle.len() >= 2, "cycle path should name its members");
                assert!(cycle.contains(&"a".to_string()));
                assert!(cycle.contains(&"b".to_string()));
            }
            other => panic!("expected CycleDetected, got {other}"),
        }
    }

    #[test]
    fn self_dependency_is_detected() {
        let dag = dag_from_edges(&[("a", "a")]);
        assert!(matches!(
            dag.toposort(),
            Err(Error::CycleDetected { .. })
        ));
    }

    #[test]
    fn cycle_with_acyclic_prefix_is_detected() {
        // a -> b -> c -> d -> b
        let dag = dag_from_edges(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "b")]);
        let err = dag.toposort().unwrap_err();
        match err {
            Error::CycleDetected { cycle } => {
                assert!(cycle.contains(&"b".to_string()));
                assert!(!cycle.contains(&"a".to_string()), "a is not on the cycle");
            }
            other => panic!("expected CycleDetected, got {other}"),
        }
    }

    #[test]
    fn duplicate_add_node_is_noop() {
        let mut dag = Dag::new();
        let first = dag.add_node("a".to_string());
        let second = dag.add_node("a".to_string());
        assert_eq!(first, second);
        assert_eq!(dag.node_count(), 1);
    }
}
