//! The update quadruple: the net change between two versions of a graph.
//!
//! Recording is net. Adding then removing the same key within one quadruple
//! cancels, and so does removing then re-adding it. A quadruple handed to a
//! consumer is self-consistent: every removed node's incident edges are
//! removed too, and every added edge's endpoints exist after the change.

use crate::core::{EdgeKey, NodeKey};
use crate::graph::DecGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Nodes and edges removed and added between two versions of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuadruple {
    /// Nodes present before and absent after.
    pub nodes_removed: BTreeSet<NodeKey>,
    /// Nodes absent before and present after.
    pub nodes_added: BTreeSet<NodeKey>,
    /// Edges present before and absent after.
    pub edges_removed: BTreeSet<EdgeKey>,
    /// Edges absent before and present after.
    pub edges_added: BTreeSet<EdgeKey>,
}

impl UpdateQuadruple {
    /// Creates an empty quadruple.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The quadruple turning `old` into `new`, compared by key.
    pub fn between(old: &DecGraph, new: &DecGraph) -> Self {
        let old_nodes: BTreeSet<&NodeKey> = old.node_keys().collect();
        let new_nodes: BTreeSet<&NodeKey> = new.node_keys().collect();
        let old_edges: BTreeSet<&EdgeKey> = old.edge_keys().collect();
        let new_edges: BTreeSet<&EdgeKey> = new.edge_keys().collect();
        Self {
            nodes_removed: old_nodes.difference(&new_nodes).map(|k| (*k).clone()).collect(),
            nodes_added: new_nodes.difference(&old_nodes).map(|k| (*k).clone()).collect(),
            edges_removed: old_edges.difference(&new_edges).map(|k| (*k).clone()).collect(),
            edges_added: new_edges.difference(&old_edges).map(|k| (*k).clone()).collect(),
        }
    }

    /// Records a node addition, cancelling a prior removal.
    pub fn record_node_added(&mut self, key: NodeKey) {
        if !self.nodes_removed.remove(&key) {
            self.nodes_added.insert(key);
        }
    }

    /// Records a node removal, cancelling a prior addition.
    pub fn record_node_removed(&mut self, key: NodeKey) {
        if !self.nodes_added.remove(&key) {
            self.nodes_removed.insert(key);
        }
    }

    /// Records an edge addition, cancelling a prior removal.
    pub fn record_edge_added(&mut self, key: EdgeKey) {
        if !self.edges_removed.remove(&key) {
            self.edges_added.insert(key);
        }
    }

    /// Records an edge removal, cancelling a prior addition.
    pub fn record_edge_removed(&mut self, key: EdgeKey) {
        if !self.edges_added.remove(&key) {
            self.edges_removed.insert(key);
        }
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.nodes_removed.is_empty()
            && self.nodes_added.is_empty()
            && self.edges_removed.is_empty()
            && self.edges_added.is_empty()
    }

    /// Total number of recorded changes.
    pub fn len(&self) -> usize {
        self.nodes_removed.len()
            + self.nodes_added.len()
            + self.edges_removed.len()
            + self.edges_added.len()
    }
}
