//! Component sets and the component-set table.
//!
//! A grouping strategy produces component sets: groups of co-located
//! lower-level nodes such as one strongly connected component, the node set
//! of one simple cycle, or one maximal clique. Sets may overlap. The table
//! maps every lower-level node to the sets it belongs to; that set of sets is
//! the node's grouping [`Signature`].
//!
//! # Invariants
//! - No two sets in a table have the same members.
//! - `memberships[n]` contains `id` iff `sets[id].members` contains `n`.
//! - Ids are allocated by the owning scheme and never reused.

use crate::core::{Attributes, IdCounter, NodeKey};
use crate::fingerprint::{component_set_fingerprint, HashValue, Signature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Identifier of a component set, unique within its scheme.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentSetId(u64);

impl ComponentSetId {
    /// Creates an id from a raw `u64`.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw `u64` representation.
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentSetId({})", self.0)
    }
}

/// A group of lower-level nodes produced by a grouping strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSet {
    id: ComponentSetId,
    members: BTreeSet<NodeKey>,
    fingerprint: HashValue,
    /// Attributes assigned by decoration.
    pub attributes: Attributes,
}

impl ComponentSet {
    /// The set's id.
    #[inline]
    pub fn id(&self) -> ComponentSetId {
        self.id
    }

    /// Member nodes, ascending.
    #[inline]
    pub fn members(&self) -> &BTreeSet<NodeKey> {
        &self.members
    }

    /// Value identity of the set.
    #[inline]
    pub fn fingerprint(&self) -> HashValue {
        self.fingerprint
    }

    /// Number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the set has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns `true` if `key` is a member.
    #[inline]
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.members.contains(key)
    }
}

/// Ids that left and entered a table during [`CompTable::replace_region`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionChange {
    /// Sets dropped because their value no longer occurs.
    pub removed: Vec<ComponentSetId>,
    /// Sets created because their value did not occur before.
    pub added: Vec<ComponentSetId>,
}

/// Assignment of each lower-level node to the component sets it belongs to.
#[derive(Debug, Clone, Default)]
pub struct CompTable {
    sets: BTreeMap<ComponentSetId, ComponentSet>,
    memberships: BTreeMap<NodeKey, BTreeSet<ComponentSetId>>,
    by_value: HashMap<HashValue, ComponentSetId>,
}

impl CompTable {
    /// Creates an empty table.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table over `nodes` from raw member sets.
    ///
    /// Every node of `nodes` gets an entry, possibly with no sets. Sets with
    /// identical members are stored once; empty sets are skipped.
    pub fn from_sets<'a, N, S>(nodes: N, sets: S, ids: &mut IdCounter) -> Self
    where
        N: IntoIterator<Item = &'a NodeKey>,
        S: IntoIterator<Item = BTreeSet<NodeKey>>,
    {
        let mut table = Self::new();
        for key in nodes {
            table.ensure_node(key.clone());
        }
        for members in sets {
            table.insert(members, ids);
        }
        table
    }

    /// Registers a node with no sets if it is not yet known.
    pub fn ensure_node(&mut self, key: NodeKey) {
        self.memberships.entry(key).or_default();
    }

    /// Inserts a set, returning its id and whether it was newly created.
    ///
    /// A set whose value already occurs keeps the existing id. Returns `None`
    /// for an empty member set.
    pub fn insert(
        &mut self,
        members: BTreeSet<NodeKey>,
        ids: &mut IdCounter,
    ) -> Option<(ComponentSetId, bool)> {
        if members.is_empty() {
            return None;
        }
        let fingerprint = component_set_fingerprint(&members);
        if let Some(&id) = self.by_value.get(&fingerprint) {
            return Some((id, false));
        }
        let id = ComponentSetId::new(ids.next_id());
        for key in &members {
            self.memberships.entry(key.clone()).or_default().insert(id);
        }
        self.by_value.insert(fingerprint, id);
        self.sets.insert(
            id,
            ComponentSet {
                id,
                members,
                fingerprint,
                attributes: Attributes::new(),
            },
        );
        Some((id, true))
    }

    /// Drops a set and its membership entries.
    pub fn remove_set(&mut self, id: ComponentSetId) -> Option<ComponentSet> {
        let set = self.sets.remove(&id)?;
        self.by_value.remove(&set.fingerprint);
        for key in &set.members {
            if let Some(ids) = self.memberships.get_mut(key) {
                ids.remove(&id);
            }
        }
        Some(set)
    }

    /// Forgets a node and drops every set it belonged to.
    ///
    /// Returns the other members of the dropped sets.
    pub fn remove_node(&mut self, key: &NodeKey) -> BTreeSet<NodeKey> {
        let mates = self.mates(key);
        let ids = self.memberships.remove(key).unwrap_or_default();
        for id in ids {
            self.remove_set(id);
        }
        mates
    }

    /// Other members of every set `key` belongs to.
    pub fn mates(&self, key: &NodeKey) -> BTreeSet<NodeKey> {
        self.sets_of(key)
            .flat_map(|set| set.members.iter())
            .filter(|other| *other != key)
            .cloned()
            .collect()
    }

    /// Replaces every set touching `region` with `new_sets`.
    ///
    /// `region` must be closed: a set with one member inside has all members
    /// inside. Sets whose value occurs both before and after keep their id.
    /// Every node of `region` ends up registered.
    pub fn replace_region<I>(
        &mut self,
        region: &BTreeSet<NodeKey>,
        new_sets: I,
        ids: &mut IdCounter,
    ) -> RegionChange
    where
        I: IntoIterator<Item = BTreeSet<NodeKey>>,
    {
        let incoming: BTreeMap<HashValue, BTreeSet<NodeKey>> = new_sets
            .into_iter()
            .filter(|members| !members.is_empty())
            .map(|members| (component_set_fingerprint(&members), members))
            .collect();

        let stale: BTreeSet<ComponentSetId> = region
            .iter()
            .filter_map(|key| self.memberships.get(key))
            .flatten()
            .copied()
            .collect();

        let mut change = RegionChange::default();
        for id in stale {
            let keep = self
                .sets
                .get(&id)
                .is_some_and(|set| incoming.contains_key(&set.fingerprint));
            if !keep {
                self.remove_set(id);
                change.removed.push(id);
            }
        }
        for key in region {
            self.ensure_node(key.clone());
        }
        for (fingerprint, members) in incoming {
            if self.by_value.contains_key(&fingerprint) {
                continue;
            }
            if let Some((id, true)) = self.insert(members, ids) {
                change.added.push(id);
            }
        }
        change
    }

    /// Looks up a set by id.
    #[inline]
    pub fn get(&self, id: ComponentSetId) -> Option<&ComponentSet> {
        self.sets.get(&id)
    }

    /// Looks up a set for mutation.
    #[inline]
    pub fn get_mut(&mut self, id: ComponentSetId) -> Option<&mut ComponentSet> {
        self.sets.get_mut(&id)
    }

    /// Looks up a set by its value identity.
    pub fn by_fingerprint(&self, fingerprint: &HashValue) -> Option<&ComponentSet> {
        self.by_value
            .get(fingerprint)
            .and_then(|id| self.sets.get(id))
    }

    /// Sets containing `key`, ascending by id.
    pub fn sets_of<'a>(&'a self, key: &NodeKey) -> impl Iterator<Item = &'a ComponentSet> + 'a {
        self.memberships
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.sets.get(id))
    }

    /// The grouping signature of `key`.
    pub fn signature(&self, key: &NodeKey) -> Signature {
        self.sets_of(key).map(ComponentSet::fingerprint).collect()
    }

    /// Returns `true` if some set contains both `a` and `b`.
    ///
    /// For `a == b` this is whether `a` belongs to any set.
    pub fn shares_component_set(&self, a: &NodeKey, b: &NodeKey) -> bool {
        self.sets_of(a).any(|set| set.contains(b))
    }

    /// Returns `true` if the node has an entry.
    #[inline]
    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.memberships.contains_key(key)
    }

    /// All sets, ascending by id.
    pub fn sets(&self) -> impl Iterator<Item = &ComponentSet> + '_ {
        self.sets.values()
    }

    /// All sets for mutation, ascending by id.
    pub fn sets_mut(&mut self) -> impl Iterator<Item = &mut ComponentSet> + '_ {
        self.sets.values_mut()
    }

    /// Number of sets.
    #[inline]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if the table has no sets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of registered nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.memberships.len()
    }
}
