//! Core entities of decontractible graphs.
//!
//! Every node at every level is a [`Supernode`] and every edge a [`Superedge`].
//! A base (level 0) node is a supernode with an empty decontraction; a base
//! edge is a superedge that aggregates nothing.
//!
//! # Invariants
//! - A supernode at level `L` only contains nodes of level `L - 1`, and a
//!   superedge at level `L` only aggregates edges of level `L - 1`.
//! - Every edge hidden inside a [`Decontraction`] has both endpoints among the
//!   decontraction's member nodes.
//! - Keys are unique within their owning graph; edge identity is the ordered
//!   pair `(tail, head)`.
//!
//! # Ownership
//! A decontraction holds the *keys* of the lower-level entities it contains.
//! The lower-level entities stay owned by the graph one level down, and the
//! lower node → supernode back-reference is an index held by the contraction
//! scheme (see [`crate::scheme::ContractionScheme::supernode_of`]).

use crate::error::GraphError;
use crate::fingerprint::Signature;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Open-ended attribute map assigned by decoration callbacks.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Key of a node, unique within its owning graph.
///
/// Supernode keys are formatted `{level}_{scheme-name}_{id}`.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Creates a key from any string.
    #[inline]
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    /// Formats the key of a supernode built at `level` by the scheme `name`.
    pub fn supernode(level: usize, name: &str, id: u64) -> Self {
        Self(format!("{level}_{name}_{id}"))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a directed edge: the ordered pair `(tail, head)`.
///
/// Orders by `(tail, head)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source endpoint.
    pub tail: NodeKey,
    /// Target endpoint.
    pub head: NodeKey,
}

impl EdgeKey {
    /// Creates an edge key.
    #[inline]
    pub fn new(tail: impl Into<NodeKey>, head: impl Into<NodeKey>) -> Self {
        Self {
            tail: tail.into(),
            head: head.into(),
        }
    }

    /// Returns `true` for a self-loop.
    #[inline]
    pub fn is_loop(&self) -> bool {
        self.tail == self.head
    }

    /// Returns `true` if `key` is the tail or the head.
    #[inline]
    pub fn touches(&self, key: &NodeKey) -> bool {
        &self.tail == key || &self.head == key
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.tail, self.head)
    }
}

/// Monotonic id allocator owned by a single scheme.
///
/// The first id handed out is 1. Ids are never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdCounter {
    last: u64,
}

impl IdCounter {
    /// Creates a counter whose first id is 1.
    #[inline]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Allocates the next id.
    #[inline]
    pub fn next_id(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}

// ----------------------------------------------------------------------------
// Decontraction
// ----------------------------------------------------------------------------

/// The nested graph of a supernode: the lower-level nodes it contains and the
/// lower-level edges hidden inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decontraction {
    nodes: BTreeSet<NodeKey>,
    edges: BTreeSet<EdgeKey>,
}

impl Decontraction {
    /// Creates an empty decontraction.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Member nodes, ascending.
    #[inline]
    pub fn nodes(&self) -> &BTreeSet<NodeKey> {
        &self.nodes
    }

    /// Hidden edges, ascending.
    #[inline]
    pub fn edges(&self) -> &BTreeSet<EdgeKey> {
        &self.edges
    }

    /// Returns `true` if there are no member nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a member node.
    pub fn add_node(&mut self, key: NodeKey) -> Result<(), GraphError> {
        if self.nodes.contains(&key) {
            return Err(GraphError::DuplicateKey(key.to_string()));
        }
        self.nodes.insert(key);
        Ok(())
    }

    /// Hides an edge between two member nodes.
    pub fn add_edge(&mut self, edge: EdgeKey) -> Result<(), GraphError> {
        if !self.nodes.contains(&edge.tail) || !self.nodes.contains(&edge.head) {
            return Err(GraphError::DanglingEndpoint {
                tail: edge.tail,
                head: edge.head,
            });
        }
        if self.edges.contains(&edge) {
            return Err(GraphError::DuplicateKey(edge.to_string()));
        }
        self.edges.insert(edge);
        Ok(())
    }

    /// Removes a member node that no hidden edge touches.
    pub fn remove_node(&mut self, key: &NodeKey) -> Result<(), GraphError> {
        if !self.nodes.contains(key) {
            return Err(GraphError::MissingNode(key.clone()));
        }
        if self.edges.iter().any(|edge| edge.touches(key)) {
            return Err(GraphError::IncidentEdges(key.clone()));
        }
        self.nodes.remove(key);
        Ok(())
    }

    /// Removes a hidden edge.
    pub fn remove_edge(&mut self, edge: &EdgeKey) -> Result<(), GraphError> {
        if self.edges.remove(edge) {
            Ok(())
        } else {
            Err(GraphError::MissingEdge(edge.clone()))
        }
    }

    /// Returns `true` if `key` is a member node.
    #[inline]
    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.nodes.contains(key)
    }

    /// Returns `true` if `edge` is hidden here.
    #[inline]
    pub fn contains_edge(&self, edge: &EdgeKey) -> bool {
        self.edges.contains(edge)
    }
}

// ----------------------------------------------------------------------------
// Supernode
// ----------------------------------------------------------------------------

/// A node of a decontractible graph at any level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supernode {
    key: NodeKey,
    level: usize,
    dec: Decontraction,
    signature: Signature,
    /// Attributes assigned by decoration.
    pub attributes: Attributes,
}

impl Supernode {
    /// Creates a base (level 0) node.
    pub fn new(key: impl Into<NodeKey>) -> Self {
        Self::with_signature(key.into(), 0, Signature::default())
    }

    /// Creates an empty supernode at `level` realizing `signature`.
    pub fn with_signature(key: NodeKey, level: usize, signature: Signature) -> Self {
        Self {
            key,
            level,
            dec: Decontraction::new(),
            signature,
            attributes: Attributes::new(),
        }
    }

    /// The node's key.
    #[inline]
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    /// The level the node lives at.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Height of the hierarchy below this node, equal to its level.
    #[inline]
    pub fn height(&self) -> usize {
        self.level
    }

    /// The nested graph of lower-level keys.
    #[inline]
    pub fn dec(&self) -> &Decontraction {
        &self.dec
    }

    /// The grouping signature this supernode realizes.
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Adds a lower-level node to the nested graph.
    pub fn add_node(&mut self, child: &Supernode) -> Result<(), GraphError> {
        self.check_child_level(child.level)?;
        self.dec.add_node(child.key.clone())
    }

    /// Hides a lower-level edge inside this supernode.
    pub fn add_edge(&mut self, edge: &Superedge) -> Result<(), GraphError> {
        self.check_child_level(edge.level)?;
        self.dec.add_edge(edge.key.clone())
    }

    /// Removes a lower-level node from the nested graph.
    pub fn remove_node(&mut self, key: &NodeKey) -> Result<(), GraphError> {
        self.dec.remove_node(key)
    }

    /// Removes a hidden lower-level edge.
    pub fn remove_edge(&mut self, edge: &EdgeKey) -> Result<(), GraphError> {
        self.dec.remove_edge(edge)
    }

    fn check_child_level(&self, found: usize) -> Result<(), GraphError> {
        match self.level.checked_sub(1) {
            Some(expected) if expected == found => Ok(()),
            expected => Err(GraphError::LevelMismatch {
                expected: expected.unwrap_or(0),
                found,
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Superedge
// ----------------------------------------------------------------------------

/// A directed edge of a decontractible graph at any level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Superedge {
    key: EdgeKey,
    level: usize,
    dec: BTreeSet<EdgeKey>,
    /// Attributes assigned by decoration.
    pub attributes: Attributes,
}

impl Superedge {
    /// Creates a base (level 0) edge.
    pub fn new(tail: impl Into<NodeKey>, head: impl Into<NodeKey>) -> Self {
        Self::at_level(EdgeKey::new(tail, head), 0)
    }

    /// Creates an empty superedge at `level`.
    pub fn at_level(key: EdgeKey, level: usize) -> Self {
        Self {
            key,
            level,
            dec: BTreeSet::new(),
            attributes: Attributes::new(),
        }
    }

    /// The edge's key.
    #[inline]
    pub fn key(&self) -> &EdgeKey {
        &self.key
    }

    /// Tail endpoint.
    #[inline]
    pub fn tail(&self) -> &NodeKey {
        &self.key.tail
    }

    /// Head endpoint.
    #[inline]
    pub fn head(&self) -> &NodeKey {
        &self.key.head
    }

    /// The level the edge lives at.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Aggregated lower-level edges.
    #[inline]
    pub fn dec(&self) -> &BTreeSet<EdgeKey> {
        &self.dec
    }

    /// Aggregates a lower-level edge.
    pub fn add_edge(&mut self, edge: &Superedge) -> Result<(), GraphError> {
        if self.level.checked_sub(1) != Some(edge.level) {
            return Err(GraphError::LevelMismatch {
                expected: self.level.saturating_sub(1),
                found: edge.level,
            });
        }
        if !self.dec.insert(edge.key.clone()) {
            return Err(GraphError::DuplicateKey(edge.key.to_string()));
        }
        Ok(())
    }

    /// Releases an aggregated lower-level edge.
    pub fn remove_edge(&mut self, edge: &EdgeKey) -> Result<(), GraphError> {
        if self.dec.remove(edge) {
            Ok(())
        } else {
            Err(GraphError::MissingEdge(edge.clone()))
        }
    }
}
