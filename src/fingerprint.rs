//! Value identity and structural fingerprints.
//!
//! Component sets are compared by value, not by id: two sets with the same
//! members are the same set. Their value identity is a SHA-256 digest over the
//! sorted member keys, and a grouping [`Signature`] is the ordered set of
//! those digests.
//!
//! [`LevelContents`] derives an id-independent fingerprint of a whole level by
//! hashing every entity from the base keys it ultimately contains. Two levels
//! with the same fingerprint partition the same base nodes the same way and
//! aggregate the same base edges the same way, whatever their supernode ids.
//!
//! # Determinism
//! Every digest is taken over sorted inputs with domain separation and a
//! length prefix, so the same content always hashes the same.
//!
//! # Citations
//! - SHA-256: NIST FIPS 180-4 (2015)
//! - Domain separation & length prefixing: Bernstein et al., "How to hash into elliptic curves" (2009)

use crate::core::{EdgeKey, NodeKey};
use crate::error::GraphError;
use crate::graph::DecGraph;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Prefix shared by every domain tag of this crate.
pub const DOMAIN_PREFIX: &[u8] = b"MLG:";

/// Domain tag for component-set value identity.
pub const DOMAIN_COMPONENT_SET_V0: &[u8] = b"COMPONENT_SET";
/// Domain tag for base node content.
pub const DOMAIN_BASE_NODE_V0: &[u8] = b"BASE_NODE";
/// Domain tag for supernode content.
pub const DOMAIN_SUPERNODE_V0: &[u8] = b"SUPERNODE_CONTENT";
/// Domain tag for edge content.
pub const DOMAIN_EDGE_V0: &[u8] = b"EDGE_CONTENT";
/// Domain tag for whole-level fingerprints.
pub const DOMAIN_LEVEL_V0: &[u8] = b"LEVEL_FINGERPRINT";

/// A 256-bit hash value.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub [u8; 32]);

impl HashValue {
    /// Returns the raw byte array.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes SHA-256 of the given data with domain separation.
    ///
    /// The digest input is `b"MLG:<domain>:v1" || len(data) as u64 LE || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_PREFIX);
        hasher.update(domain);
        hasher.update(b":v1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Hashes a count-prefixed sequence of hashes.
    pub fn combine<'a, I>(domain: &[u8], parts: I) -> Self
    where
        I: IntoIterator<Item = &'a HashValue>,
    {
        let mut data = Vec::new();
        append_hashes(&mut data, parts);
        Self::hash_with_domain(domain, &data)
    }
}

impl std::fmt::Display for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HashValue({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

fn append_hashes<'a, I>(data: &mut Vec<u8>, parts: I)
where
    I: IntoIterator<Item = &'a HashValue>,
{
    let start = data.len();
    data.extend_from_slice(&0u64.to_le_bytes());
    let mut count = 0u64;
    for part in parts {
        data.extend_from_slice(part.as_bytes());
        count += 1;
    }
    data[start..start + 8].copy_from_slice(&count.to_le_bytes());
}

/// Value identity of a component set: a digest of its sorted member keys.
pub fn component_set_fingerprint(members: &BTreeSet<NodeKey>) -> HashValue {
    let mut data = Vec::new();
    data.extend_from_slice(&(members.len() as u64).to_le_bytes());
    for key in members {
        let bytes = key.as_str().as_bytes();
        data.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        data.extend_from_slice(bytes);
    }
    HashValue::hash_with_domain(DOMAIN_COMPONENT_SET_V0, &data)
}

// ----------------------------------------------------------------------------
// Grouping signatures
// ----------------------------------------------------------------------------

/// The set of component sets a node belongs to, compared by value.
///
/// The empty signature groups every node that belongs to no component set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(BTreeSet<HashValue>);

impl Signature {
    /// The empty signature.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if the node belongs to no component set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of component sets in the signature.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Fingerprints of the component sets, ascending.
    pub fn iter(&self) -> impl Iterator<Item = &HashValue> {
        self.0.iter()
    }

    /// Returns `true` if the signature includes the set with `fingerprint`.
    #[inline]
    pub fn contains(&self, fingerprint: &HashValue) -> bool {
        self.0.contains(fingerprint)
    }
}

impl FromIterator<HashValue> for Signature {
    fn from_iter<T: IntoIterator<Item = HashValue>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ----------------------------------------------------------------------------
// Id-independent level contents
// ----------------------------------------------------------------------------

/// Content hashes of every node and edge of one level, derived from base keys.
#[derive(Debug, Clone, Default)]
pub struct LevelContents {
    nodes: BTreeMap<NodeKey, HashValue>,
    edges: BTreeMap<EdgeKey, HashValue>,
}

impl LevelContents {
    /// Contents of the base graph: each node hashes its own key.
    pub fn base(graph: &DecGraph) -> Self {
        let nodes: BTreeMap<_, _> = graph
            .node_keys()
            .map(|key| {
                let hash = HashValue::hash_with_domain(DOMAIN_BASE_NODE_V0, key.as_str().as_bytes());
                (key.clone(), hash)
            })
            .collect();
        let mut edges = BTreeMap::new();
        for edge in graph.edges() {
            // Endpoints always exist in a well-formed graph.
            if let Some(hash) = edge_content(&nodes, edge.key(), std::iter::empty()) {
                edges.insert(edge.key().clone(), hash);
            }
        }
        Self { nodes, edges }
    }

    /// Contents of `graph`, the level directly above `self`.
    pub fn lift(&self, graph: &DecGraph) -> Result<Self, GraphError> {
        let mut nodes = BTreeMap::new();
        for node in graph.nodes() {
            let mut members = node
                .dec()
                .nodes()
                .iter()
                .map(|key| self.node(key))
                .collect::<Result<Vec<_>, _>>()?;
            members.sort();
            let mut hidden = node
                .dec()
                .edges()
                .iter()
                .map(|key| self.edge(key))
                .collect::<Result<Vec<_>, _>>()?;
            hidden.sort();

            let mut data = Vec::new();
            append_hashes(&mut data, &members);
            append_hashes(&mut data, &hidden);
            let hash = HashValue::hash_with_domain(DOMAIN_SUPERNODE_V0, &data);
            nodes.insert(node.key().clone(), hash);
        }

        let mut edges = BTreeMap::new();
        for edge in graph.edges() {
            let mut aggregated = edge
                .dec()
                .iter()
                .map(|key| self.edge(key))
                .collect::<Result<Vec<_>, _>>()?;
            aggregated.sort();
            let hash = edge_content(&nodes, edge.key(), aggregated.iter())
                .ok_or_else(|| GraphError::MissingEdge(edge.key().clone()))?;
            edges.insert(edge.key().clone(), hash);
        }
        Ok(Self { nodes, edges })
    }

    /// Content hash of a node of this level.
    pub fn node(&self, key: &NodeKey) -> Result<HashValue, GraphError> {
        self.nodes
            .get(key)
            .copied()
            .ok_or_else(|| GraphError::MissingNode(key.clone()))
    }

    /// Content hash of an edge of this level.
    pub fn edge(&self, key: &EdgeKey) -> Result<HashValue, GraphError> {
        self.edges
            .get(key)
            .copied()
            .ok_or_else(|| GraphError::MissingEdge(key.clone()))
    }

    /// Fingerprint of the whole level: sorted node and edge contents.
    pub fn fingerprint(&self) -> HashValue {
        let mut nodes: Vec<_> = self.nodes.values().copied().collect();
        nodes.sort();
        let mut edges: Vec<_> = self.edges.values().copied().collect();
        edges.sort();

        let mut data = Vec::new();
        append_hashes(&mut data, &nodes);
        append_hashes(&mut data, &edges);
        HashValue::hash_with_domain(DOMAIN_LEVEL_V0, &data)
    }
}

fn edge_content<'a, I>(
    nodes: &BTreeMap<NodeKey, HashValue>,
    key: &EdgeKey,
    aggregated: I,
) -> Option<HashValue>
where
    I: IntoIterator<Item = &'a HashValue>,
{
    let tail = nodes.get(&key.tail)?;
    let head = nodes.get(&key.head)?;
    let mut data = Vec::new();
    data.extend_from_slice(tail.as_bytes());
    data.extend_from_slice(head.as_bytes());
    append_hashes(&mut data, aggregated);
    Some(HashValue::hash_with_domain(DOMAIN_EDGE_V0, &data))
}
