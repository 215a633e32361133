//! The decontractible graph of one level.
//!
//! # Invariants
//! - Node keys are unique; edge keys `(tail, head)` are unique.
//! - Every edge's endpoints are nodes of the graph.
//! - Every node and edge lives at the graph's level.
//! - `successors`/`predecessors` mirror the edge map exactly.
//!
//! Failed mutations leave the graph unchanged.
//!
//! # Determinism
//! All containers are ordered, so `nodes()`, `edges()` and adjacency iterate
//! in ascending key order on every run.

use crate::core::{EdgeKey, NodeKey, Superedge, Supernode};
use crate::error::GraphError;
use std::collections::{BTreeMap, BTreeSet};

/// Nodes and directed edges of one level, keyed for lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecGraph {
    level: usize,
    nodes: BTreeMap<NodeKey, Supernode>,
    edges: BTreeMap<EdgeKey, Superedge>,
    successors: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
    predecessors: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
}

impl DecGraph {
    /// Creates an empty base (level 0) graph.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph at `level`.
    pub fn at_level(level: usize) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Builds a base graph from node keys and `(tail, head)` pairs.
    pub fn from_parts<N, E, K>(nodes: N, edges: E) -> Result<Self, GraphError>
    where
        N: IntoIterator<Item = K>,
        E: IntoIterator<Item = (K, K)>,
        K: Into<NodeKey>,
    {
        let mut graph = Self::new();
        for key in nodes {
            graph.add_node(Supernode::new(key))?;
        }
        for (tail, head) in edges {
            graph.add_edge(Superedge::new(tail, head))?;
        }
        Ok(graph)
    }

    /// The level this graph lives at.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Height of the graph: the greatest node height, 0 when empty.
    pub fn height(&self) -> usize {
        self.nodes.values().map(Supernode::height).max().unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Inserts a node.
    pub fn add_node(&mut self, node: Supernode) -> Result<(), GraphError> {
        if node.level() != self.level {
            return Err(GraphError::LevelMismatch {
                expected: self.level,
                found: node.level(),
            });
        }
        if self.nodes.contains_key(node.key()) {
            return Err(GraphError::DuplicateKey(node.key().to_string()));
        }
        let key = node.key().clone();
        self.successors.insert(key.clone(), BTreeSet::new());
        self.predecessors.insert(key.clone(), BTreeSet::new());
        self.nodes.insert(key, node);
        Ok(())
    }

    /// Inserts an edge between two existing nodes.
    pub fn add_edge(&mut self, edge: Superedge) -> Result<(), GraphError> {
        if !self.nodes.contains_key(edge.tail()) || !self.nodes.contains_key(edge.head()) {
            return Err(GraphError::DanglingEndpoint {
                tail: edge.tail().clone(),
                head: edge.head().clone(),
            });
        }
        if edge.level() != self.level {
            return Err(GraphError::LevelMismatch {
                expected: self.level,
                found: edge.level(),
            });
        }
        if self.edges.contains_key(edge.key()) {
            return Err(GraphError::DuplicateKey(edge.key().to_string()));
        }
        let key = edge.key().clone();
        self.successors
            .entry(key.tail.clone())
            .or_default()
            .insert(key.head.clone());
        self.predecessors
            .entry(key.head.clone())
            .or_default()
            .insert(key.tail.clone());
        self.edges.insert(key, edge);
        Ok(())
    }

    /// Removes a node that has no incident edges.
    pub fn remove_node(&mut self, key: &NodeKey) -> Result<Supernode, GraphError> {
        if !self.nodes.contains_key(key) {
            return Err(GraphError::MissingNode(key.clone()));
        }
        let has_edges = self.successors.get(key).is_some_and(|s| !s.is_empty())
            || self.predecessors.get(key).is_some_and(|p| !p.is_empty());
        if has_edges {
            return Err(GraphError::IncidentEdges(key.clone()));
        }
        self.successors.remove(key);
        self.predecessors.remove(key);
        self.nodes
            .remove(key)
            .ok_or_else(|| GraphError::MissingNode(key.clone()))
    }

    /// Removes a node together with its incident edges.
    pub fn remove_node_with_edges(
        &mut self,
        key: &NodeKey,
    ) -> Result<(Supernode, Vec<Superedge>), GraphError> {
        if !self.nodes.contains_key(key) {
            return Err(GraphError::MissingNode(key.clone()));
        }
        let mut removed = Vec::new();
        for edge in self.incident_edges(key) {
            removed.push(self.remove_edge(&edge)?);
        }
        let node = self.remove_node(key)?;
        Ok((node, removed))
    }

    /// Removes an edge.
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Result<Superedge, GraphError> {
        let edge = self
            .edges
            .remove(key)
            .ok_or_else(|| GraphError::MissingEdge(key.clone()))?;
        if let Some(succ) = self.successors.get_mut(&key.tail) {
            succ.remove(&key.head);
        }
        if let Some(pred) = self.predecessors.get_mut(&key.head) {
            pred.remove(&key.tail);
        }
        Ok(edge)
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Looks up a node.
    #[inline]
    pub fn node(&self, key: &NodeKey) -> Option<&Supernode> {
        self.nodes.get(key)
    }

    /// Looks up a node for mutation.
    #[inline]
    pub fn node_mut(&mut self, key: &NodeKey) -> Option<&mut Supernode> {
        self.nodes.get_mut(key)
    }

    /// Looks up an edge.
    #[inline]
    pub fn edge(&self, key: &EdgeKey) -> Option<&Superedge> {
        self.edges.get(key)
    }

    /// Looks up an edge for mutation.
    #[inline]
    pub fn edge_mut(&mut self, key: &EdgeKey) -> Option<&mut Superedge> {
        self.edges.get_mut(key)
    }

    /// Checks whether a node exists.
    #[inline]
    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Checks whether an edge exists.
    #[inline]
    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    /// Checks whether the edge `tail -> head` exists.
    pub fn has_edge(&self, tail: &NodeKey, head: &NodeKey) -> bool {
        self.successors
            .get(tail)
            .is_some_and(|succ| succ.contains(head))
    }

    /// All nodes, ascending by key. Each call starts a fresh sequence.
    pub fn nodes(&self) -> impl Iterator<Item = &Supernode> + '_ {
        self.nodes.values()
    }

    /// All edges, ascending by `(tail, head)`. Each call starts a fresh sequence.
    pub fn edges(&self) -> impl Iterator<Item = &Superedge> + '_ {
        self.edges.values()
    }

    /// All nodes for mutation, ascending by key.
    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Supernode> + '_ {
        self.nodes.values_mut()
    }

    /// All edges for mutation, ascending by `(tail, head)`.
    pub(crate) fn edges_mut(&mut self) -> impl Iterator<Item = &mut Superedge> + '_ {
        self.edges.values_mut()
    }

    /// All node keys, ascending.
    pub fn node_keys(&self) -> impl Iterator<Item = &NodeKey> + '_ {
        self.nodes.keys()
    }

    /// All edge keys, ascending.
    pub fn edge_keys(&self) -> impl Iterator<Item = &EdgeKey> + '_ {
        self.edges.keys()
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------------
    // Adjacency
    // ------------------------------------------------------------------------

    /// Heads of the edges leaving `key`.
    pub fn successors<'a>(&'a self, key: &NodeKey) -> impl Iterator<Item = &'a NodeKey> + 'a {
        self.successors.get(key).into_iter().flatten()
    }

    /// Tails of the edges entering `key`.
    pub fn predecessors<'a>(&'a self, key: &NodeKey) -> impl Iterator<Item = &'a NodeKey> + 'a {
        self.predecessors.get(key).into_iter().flatten()
    }

    /// Nodes adjacent to `key` in either direction, ascending, without `key` itself.
    pub fn neighbors(&self, key: &NodeKey) -> BTreeSet<NodeKey> {
        self.successors(key)
            .chain(self.predecessors(key))
            .filter(|other| *other != key)
            .cloned()
            .collect()
    }

    /// Keys of every edge with `key` as tail or head, each listed once.
    pub fn incident_edges(&self, key: &NodeKey) -> Vec<EdgeKey> {
        let outgoing = self
            .successors(key)
            .map(|head| EdgeKey::new(key.clone(), head.clone()));
        let incoming = self
            .predecessors(key)
            .filter(|tail| *tail != key)
            .map(|tail| EdgeKey::new(tail.clone(), key.clone()));
        outgoing.chain(incoming).collect()
    }

    /// The subgraph on `keys` with every edge between them.
    ///
    /// Keys that are not nodes of this graph are ignored.
    pub fn induced_subgraph(&self, keys: &BTreeSet<NodeKey>) -> DecGraph {
        let mut sub = DecGraph::at_level(self.level);
        for key in keys {
            if let Some(node) = self.nodes.get(key) {
                sub.successors.insert(key.clone(), BTreeSet::new());
                sub.predecessors.insert(key.clone(), BTreeSet::new());
                sub.nodes.insert(key.clone(), node.clone());
            }
        }
        for (key, edge) in &self.edges {
            if sub.nodes.contains_key(&key.tail) && sub.nodes.contains_key(&key.head) {
                sub.successors
                    .entry(key.tail.clone())
                    .or_default()
                    .insert(key.head.clone());
                sub.predecessors
                    .entry(key.head.clone())
                    .or_default()
                    .insert(key.tail.clone());
                sub.edges.insert(key.clone(), edge.clone());
            }
        }
        sub
    }
}
