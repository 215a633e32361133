//! Contraction schemes: one level of abstraction over the level below.
//!
//! A scheme owns the decontractible graph of its level, the component-set
//! table its strategy produced, a signature → supernode table and the lower
//! node → supernode index. Lower nodes with the same grouping signature share
//! a supernode; a lower edge is aggregated by the superedge between its
//! endpoints' supernodes, or hidden inside their common supernode.
//!
//! # Lifecycle
//! uninitialized → [`ContractionScheme::contract`] → valid →
//! [`ContractionScheme::update`] → valid. A failed update invalidates the
//! scheme; only `contract` makes it valid again.
//!
//! # Invariants
//! - At most one live supernode per signature, and every supernode's members
//!   have exactly its signature.
//! - Every lower edge is held by exactly one aggregate: a superedge or a
//!   supernode's hidden edges.
//! - No superedge and no supernode is empty.
//! - Supernode and component-set ids are never reused within a scheme.
//!
//! # Concurrency
//! Single writer. `contract`, `update` and `invalidate` take `&mut self`.

use crate::component::{CompTable, ComponentSetId};
use crate::core::{EdgeKey, IdCounter, NodeKey, Superedge, Supernode};
use crate::decorate::Decorators;
use crate::error::{ContractionError, GraphError};
use crate::fingerprint::Signature;
use crate::graph::{traversal, DecGraph};
use crate::quadruple::UpdateQuadruple;
use crate::strategy::ContractionStrategy;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Mutable structure of one level.
#[derive(Debug, Clone, Default)]
struct SchemeState {
    graph: DecGraph,
    table: CompTable,
    supernodes: BTreeMap<Signature, NodeKey>,
    membership: BTreeMap<NodeKey, NodeKey>,
}

impl SchemeState {
    fn new(level: usize, table: CompTable) -> Self {
        Self {
            graph: DecGraph::at_level(level),
            table,
            ..Self::default()
        }
    }
}

/// Builds one level from a lower graph and keeps it consistent as the lower
/// graph changes.
#[derive(Debug, Clone)]
pub struct ContractionScheme {
    strategy: Arc<dyn ContractionStrategy>,
    decorators: Decorators,
    level: usize,
    state: SchemeState,
    supernode_ids: IdCounter,
    set_ids: IdCounter,
    valid: bool,
}

impl ContractionScheme {
    /// Creates an uninitialized level 1 scheme.
    pub fn new(strategy: Arc<dyn ContractionStrategy>) -> Self {
        Self {
            strategy,
            decorators: Decorators::new(),
            level: 1,
            state: SchemeState::new(1, CompTable::new()),
            supernode_ids: IdCounter::new(),
            set_ids: IdCounter::new(),
            valid: false,
        }
    }

    /// Builder: set the decoration callbacks.
    pub fn with_decorators(mut self, decorators: Decorators) -> Self {
        self.decorators = decorators;
        self
    }

    /// Builder: set the level this scheme builds (at least 1).
    pub fn with_level(mut self, level: usize) -> Self {
        self.set_level(level);
        self
    }

    /// Moves the scheme to `level`, discarding any structure built so far.
    pub(crate) fn set_level(&mut self, level: usize) {
        let level = level.max(1);
        if level != self.level {
            self.level = level;
            self.state = SchemeState::new(level, CompTable::new());
            self.valid = false;
        }
    }

    /// An uninitialized scheme with the same strategy, decorators and level.
    pub fn fresh(&self) -> Self {
        Self::new(Arc::clone(&self.strategy))
            .with_decorators(self.decorators.clone())
            .with_level(self.level)
    }

    /// Name of the grouping strategy.
    #[inline]
    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    /// The grouping strategy.
    #[inline]
    pub fn strategy(&self) -> &Arc<dyn ContractionStrategy> {
        &self.strategy
    }

    /// The level this scheme builds.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Whether incremental updates can be trusted.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Marks the scheme invalid; the next `update` fails until `contract` runs.
    pub fn invalidate(&mut self) {
        if self.valid {
            tracing::debug!(level = self.level, strategy = self.name(), "scheme invalidated");
        }
        self.valid = false;
    }

    /// The graph of this level.
    #[inline]
    pub fn graph(&self) -> &DecGraph {
        &self.state.graph
    }

    /// The current component-set table.
    #[inline]
    pub fn table(&self) -> &CompTable {
        &self.state.table
    }

    /// The supernode currently containing the lower node `key`.
    pub fn supernode_of(&self, key: &NodeKey) -> Option<&NodeKey> {
        self.state.membership.get(key)
    }

    // ------------------------------------------------------------------------
    // Full reconstruction
    // ------------------------------------------------------------------------

    /// Rebuilds this level from scratch over `lower`.
    ///
    /// Builds into fresh state and swaps it in only on success, so a failed
    /// call leaves the scheme exactly as it was.
    pub fn contract(&mut self, lower: &DecGraph) -> Result<(), ContractionError> {
        let _span = tracing::debug_span!("contract", level = self.level, strategy = self.name()).entered();

        let mut set_ids = self.set_ids.clone();
        let mut supernode_ids = self.supernode_ids.clone();
        let table = self.strategy.contraction_function(lower, &mut set_ids)?;
        let mut state = SchemeState::new(self.level, table);
        {
            let mut builder = Builder::new(self.level, self.strategy.name(), &mut state, &mut supernode_ids);
            for key in lower.node_keys() {
                let signature = builder.state.table.signature(key);
                builder.place(lower, key, signature)?;
            }
            for edge in lower.edge_keys() {
                builder.route_edge(lower, edge)?;
            }
        }

        for node in state.graph.nodes_mut() {
            self.decorators.decorate_supernode(node);
        }
        for edge in state.graph.edges_mut() {
            self.decorators.decorate_superedge(edge);
        }
        for set in state.table.sets_mut() {
            self.decorators.decorate_component_set(set);
        }

        self.state = state;
        self.set_ids = set_ids;
        self.supernode_ids = supernode_ids;
        self.valid = true;
        tracing::debug!(
            level = self.level,
            strategy = self.name(),
            supernodes = self.state.graph.node_count(),
            superedges = self.state.graph.edge_count(),
            component_sets = self.state.table.len(),
            "contracted level"
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Incremental update
    // ------------------------------------------------------------------------

    /// Repairs this level after the lower graph changed by `quad`.
    ///
    /// `lower` is the lower graph *after* the change. Returns the net change
    /// at this level, to be handed to the level above.
    ///
    /// A strategy failure is returned before anything is mutated and leaves
    /// the scheme valid. Any other failure invalidates the scheme.
    pub fn update(
        &mut self,
        lower: &DecGraph,
        quad: &UpdateQuadruple,
    ) -> Result<UpdateQuadruple, ContractionError> {
        if !self.valid {
            return Err(ContractionError::NotContracted { level: self.level });
        }
        let _span = tracing::debug_span!("update", level = self.level, strategy = self.name()).entered();

        let region = self.region(lower, quad);
        let new_sets = if region.is_empty() {
            Vec::new()
        } else {
            self.strategy.component_sets(lower, &region)?
        };

        match self.apply(lower, quad, &region, new_sets) {
            Ok(delta) => {
                tracing::debug!(
                    level = self.level,
                    incoming = quad.len(),
                    outgoing = delta.len(),
                    region = region.len(),
                    "updated level"
                );
                Ok(delta)
            }
            Err(err) => {
                self.valid = false;
                tracing::warn!(
                    level = self.level,
                    strategy = self.name(),
                    "update failed, scheme invalidated: {err}"
                );
                Err(err)
            }
        }
    }

    /// Lower nodes whose component sets must be recomputed for `quad`.
    ///
    /// The result is a union of weakly connected components of `lower`, and
    /// contains every member of any current set it touches.
    fn region(&self, lower: &DecGraph, quad: &UpdateQuadruple) -> BTreeSet<NodeKey> {
        if !self.strategy.is_incremental() {
            return lower.node_keys().cloned().collect();
        }
        let table = &self.state.table;
        let strategy = &self.strategy;
        let mut seeds = BTreeSet::new();
        for edge in &quad.edges_removed {
            seeds.extend(strategy.update_removed_edge(lower, table, edge));
        }
        for node in &quad.nodes_removed {
            seeds.extend(strategy.update_removed_node(lower, table, node));
            seeds.extend(table.mates(node));
        }
        for node in &quad.nodes_added {
            seeds.extend(strategy.update_added_node(lower, table, node));
            seeds.insert(node.clone());
        }
        for edge in &quad.edges_added {
            seeds.extend(strategy.update_added_edge(lower, table, edge));
        }

        let mut region = traversal::weak_closure(lower, &seeds);
        loop {
            let extra: BTreeSet<NodeKey> = region
                .iter()
                .flat_map(|key| table.sets_of(key))
                .flat_map(|set| set.members())
                .filter(|key| lower.contains_node(key) && !region.contains(*key))
                .cloned()
                .collect();
            if extra.is_empty() {
                return region;
            }
            region.extend(traversal::weak_closure(lower, &extra));
        }
    }

    fn apply(
        &mut self,
        lower: &DecGraph,
        quad: &UpdateQuadruple,
        region: &BTreeSet<NodeKey>,
        new_sets: Vec<BTreeSet<NodeKey>>,
    ) -> Result<UpdateQuadruple, ContractionError> {
        let level = self.level;
        let fail = |err: GraphError| ContractionError::inconsistent(level, err.to_string());
        let mut builder = Builder::new(level, self.strategy.name(), &mut self.state, &mut self.supernode_ids);

        for edge in &quad.edges_removed {
            if lower.contains_edge(edge) {
                return Err(ContractionError::inconsistent(
                    level,
                    format!("removed edge {edge} is still in the lower graph"),
                ));
            }
            builder.detach_edge(edge).map_err(fail)?;
        }

        let mut vacated = BTreeSet::new();
        for node in &quad.nodes_removed {
            if lower.contains_node(node) {
                return Err(ContractionError::inconsistent(
                    level,
                    format!("removed node {node} is still in the lower graph"),
                ));
            }
            vacated.insert(builder.detach_node(node).map_err(fail)?);
            builder.state.table.remove_node(node);
        }
        for supernode in &vacated {
            builder.retire_if_empty(supernode).map_err(fail)?;
        }

        let change = builder
            .state
            .table
            .replace_region(region, new_sets, &mut self.set_ids);
        tracing::trace!(
            level,
            sets_added = change.added.len(),
            sets_removed = change.removed.len(),
            "regrouped region"
        );

        for node in &quad.nodes_added {
            if !lower.contains_node(node) {
                return Err(ContractionError::inconsistent(
                    level,
                    format!("added node {node} is not in the lower graph"),
                ));
            }
            if builder.state.membership.contains_key(node) {
                return Err(ContractionError::inconsistent(
                    level,
                    format!("added node {node} is already placed"),
                ));
            }
            let signature = builder.state.table.signature(node);
            builder.place(lower, node, signature).map_err(fail)?;
        }

        for edge in &quad.edges_added {
            if !lower.contains_edge(edge) {
                return Err(ContractionError::inconsistent(
                    level,
                    format!("added edge {edge} is not in the lower graph"),
                ));
            }
            builder.route_edge(lower, edge).map_err(fail)?;
        }

        let mut moves = Vec::new();
        for key in region {
            let owner = builder.owner(key).map_err(|_| {
                ContractionError::inconsistent(level, format!("lower node {key} has no supernode"))
            })?;
            let wanted = builder.state.table.signature(key);
            let current = builder
                .state
                .graph
                .node(&owner)
                .map(Supernode::signature)
                .ok_or_else(|| fail(GraphError::MissingNode(owner.clone())))?;
            if current != &wanted {
                moves.push((key.clone(), wanted));
            }
        }
        builder.move_nodes(lower, moves).map_err(fail)?;

        let Builder {
            delta,
            touched_nodes,
            touched_edges,
            ..
        } = builder;

        for key in &touched_nodes {
            if let Some(node) = self.state.graph.node_mut(key) {
                self.decorators.decorate_supernode(node);
            }
        }
        for key in &touched_edges {
            if let Some(edge) = self.state.graph.edge_mut(key) {
                self.decorators.decorate_superedge(edge);
            }
        }
        for id in change.added {
            if let Some(set) = self.state.table.get_mut(id) {
                self.decorators.decorate_component_set(set);
            }
        }
        Ok(delta)
    }

    /// Ids of the component sets realizing the signature of `supernode`.
    pub fn component_sets_of(&self, supernode: &NodeKey) -> Vec<ComponentSetId> {
        self.state
            .graph
            .node(supernode)
            .into_iter()
            .flat_map(|node| node.signature().iter())
            .filter_map(|fingerprint| self.state.table.by_fingerprint(fingerprint))
            .map(|set| set.id())
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Structural edits shared by contract and update
// ----------------------------------------------------------------------------

/// Applies placement and routing edits to one level and records their net
/// effect.
struct Builder<'s> {
    level: usize,
    name: &'s str,
    state: &'s mut SchemeState,
    ids: &'s mut IdCounter,
    delta: UpdateQuadruple,
    touched_nodes: BTreeSet<NodeKey>,
    touched_edges: BTreeSet<EdgeKey>,
}

impl<'s> Builder<'s> {
    fn new(level: usize, name: &'s str, state: &'s mut SchemeState, ids: &'s mut IdCounter) -> Self {
        Self {
            level,
            name,
            state,
            ids,
            delta: UpdateQuadruple::new(),
            touched_nodes: BTreeSet::new(),
            touched_edges: BTreeSet::new(),
        }
    }

    fn owner(&self, key: &NodeKey) -> Result<NodeKey, GraphError> {
        self.state
            .membership
            .get(key)
            .cloned()
            .ok_or_else(|| GraphError::MissingNode(key.clone()))
    }

    fn supernode_mut(&mut self, key: &NodeKey) -> Result<&mut Supernode, GraphError> {
        self.state
            .graph
            .node_mut(key)
            .ok_or_else(|| GraphError::MissingNode(key.clone()))
    }

    fn allocate(&mut self, signature: Signature) -> Result<NodeKey, GraphError> {
        let key = NodeKey::supernode(self.level, self.name, self.ids.next_id());
        let node = Supernode::with_signature(key.clone(), self.level, signature.clone());
        self.state.graph.add_node(node)?;
        self.state.supernodes.insert(signature, key.clone());
        self.delta.record_node_added(key.clone());
        tracing::trace!(supernode = %key, "allocated supernode");
        Ok(key)
    }

    /// Puts the lower node `key` into the supernode for `signature`.
    fn place(&mut self, lower: &DecGraph, key: &NodeKey, signature: Signature) -> Result<(), GraphError> {
        let child = lower
            .node(key)
            .ok_or_else(|| GraphError::MissingNode(key.clone()))?;
        let target = match self.state.supernodes.get(&signature).cloned() {
            Some(existing) => existing,
            None => self.allocate(signature)?,
        };
        self.supernode_mut(&target)?.add_node(child)?;
        self.state.membership.insert(key.clone(), target.clone());
        self.touched_nodes.insert(target);
        Ok(())
    }

    /// Takes the lower node `key` out of its supernode, returning that supernode.
    fn detach_node(&mut self, key: &NodeKey) -> Result<NodeKey, GraphError> {
        let owner = self.owner(key)?;
        self.supernode_mut(&owner)?.remove_node(key)?;
        self.state.membership.remove(key);
        self.touched_nodes.insert(owner.clone());
        Ok(owner)
    }

    /// Removes `key` from the graph and the signature table if it has no members.
    fn retire_if_empty(&mut self, key: &NodeKey) -> Result<(), GraphError> {
        let signature = match self.state.graph.node(key) {
            Some(node) if node.dec().is_empty() => node.signature().clone(),
            _ => return Ok(()),
        };
        self.state.graph.remove_node(key)?;
        if self.state.supernodes.get(&signature) == Some(key) {
            self.state.supernodes.remove(&signature);
        }
        self.touched_nodes.remove(key);
        self.delta.record_node_removed(key.clone());
        tracing::trace!(supernode = %key, "retired empty supernode");
        Ok(())
    }

    /// Hands the lower edge to the aggregate its endpoints currently resolve to.
    fn route_edge(&mut self, lower: &DecGraph, edge: &EdgeKey) -> Result<(), GraphError> {
        let lower_edge = lower
            .edge(edge)
            .ok_or_else(|| GraphError::MissingEdge(edge.clone()))?;
        let tail = self.owner(&edge.tail)?;
        let head = self.owner(&edge.head)?;
        if tail == head {
            self.supernode_mut(&tail)?.add_edge(lower_edge)?;
            self.touched_nodes.insert(tail);
            return Ok(());
        }

        let key = EdgeKey::new(tail, head);
        if !self.state.graph.contains_edge(&key) {
            self.state
                .graph
                .add_edge(Superedge::at_level(key.clone(), self.level))?;
            self.delta.record_edge_added(key.clone());
        }
        self.state
            .graph
            .edge_mut(&key)
            .ok_or_else(|| GraphError::MissingEdge(key.clone()))?
            .add_edge(lower_edge)?;
        self.touched_edges.insert(key);
        Ok(())
    }

    /// Takes the lower edge out of its aggregate, dropping an emptied superedge.
    fn detach_edge(&mut self, edge: &EdgeKey) -> Result<(), GraphError> {
        let tail = self.owner(&edge.tail)?;
        let head = self.owner(&edge.head)?;
        if tail == head {
            self.supernode_mut(&tail)?.remove_edge(edge)?;
            self.touched_nodes.insert(tail);
            return Ok(());
        }

        let key = EdgeKey::new(tail, head);
        let superedge = self
            .state
            .graph
            .edge_mut(&key)
            .ok_or_else(|| GraphError::MissingEdge(key.clone()))?;
        superedge.remove_edge(edge)?;
        if superedge.dec().is_empty() {
            self.state.graph.remove_edge(&key)?;
            self.touched_edges.remove(&key);
            self.delta.record_edge_removed(key);
        } else {
            self.touched_edges.insert(key);
        }
        Ok(())
    }

    /// Moves lower nodes to the supernodes of their new signatures, carrying
    /// their incident edges along.
    fn move_nodes(&mut self, lower: &DecGraph, moves: Vec<(NodeKey, Signature)>) -> Result<(), GraphError> {
        if moves.is_empty() {
            return Ok(());
        }
        let carried: BTreeSet<EdgeKey> = moves
            .iter()
            .flat_map(|(key, _)| lower.incident_edges(key))
            .collect();
        for edge in &carried {
            self.detach_edge(edge)?;
        }

        let mut vacated = BTreeSet::new();
        for (key, signature) in moves {
            let from = self.detach_node(&key)?;
            self.place(lower, &key, signature)?;
            tracing::trace!(
                node = %key,
                from = %from,
                to = ?self.state.membership.get(&key),
                "moved node"
            );
            vacated.insert(from);
        }

        for edge in &carried {
            self.route_edge(lower, edge)?;
        }
        for supernode in &vacated {
            self.retire_if_empty(supernode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleConfig;
    use crate::core::Attributes;
    use crate::error::StrategyError;
    use crate::fingerprint::LevelContents;
    use crate::strategy::{CliqueStrategy, CycleStrategy, SccStrategy};
    use serde_json::json;

    fn keys(items: &[&str]) -> BTreeSet<NodeKey> {
        items.iter().map(|k| NodeKey::from(*k)).collect()
    }

    fn triangle() -> DecGraph {
        DecGraph::from_parts(["a", "b", "c"], [("a", "b"), ("b", "c"), ("c", "a")]).unwrap()
    }

    fn contracted(strategy: Arc<dyn ContractionStrategy>, lower: &DecGraph) -> ContractionScheme {
        let mut scheme = ContractionScheme::new(strategy);
        scheme.contract(lower).unwrap();
        scheme
    }

    fn fingerprint(lower: &DecGraph, scheme: &ContractionScheme) -> crate::fingerprint::HashValue {
        LevelContents::base(lower)
            .lift(scheme.graph())
            .unwrap()
            .fingerprint()
    }

    /// Removes `node` and its incident edges from `lower` and describes it.
    fn remove_with_edges(lower: &mut DecGraph, node: &str) -> UpdateQuadruple {
        let key = NodeKey::from(node);
        let (_, edges) = lower.remove_node_with_edges(&key).unwrap();
        let mut quad = UpdateQuadruple::new();
        quad.nodes_removed.insert(key);
        quad.edges_removed.extend(edges.iter().map(|e| e.key().clone()));
        quad
    }

    fn add_edge(lower: &mut DecGraph, tail: &str, head: &str) -> UpdateQuadruple {
        lower.add_edge(Superedge::new(tail, head)).unwrap();
        let mut quad = UpdateQuadruple::new();
        quad.edges_added.insert(EdgeKey::new(tail, head));
        quad
    }

    /// One cycle collapses into one supernode with every edge hidden.
    #[test]
    fn cycle_collapses_into_one_supernode() {
        let lower = triangle();
        let scheme = contracted(Arc::new(CycleStrategy::new()), &lower);
        let graph = scheme.graph();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);

        let node = graph.nodes().next().unwrap();
        assert_eq!(node.key().as_str(), "1_cycles_1");
        assert_eq!(node.dec().nodes(), &keys(&["a", "b", "c"]));
        assert_eq!(node.dec().edges().len(), 3);
        assert_eq!(scheme.supernode_of(&NodeKey::from("b")), Some(node.key()));
        assert!(scheme.is_valid());
    }

    /// Under cycles, losing `b` leaves `a` and `c` unclustered together.
    #[test]
    fn cycle_scheme_after_removing_a_node() {
        let mut lower = triangle();
        let mut scheme = contracted(Arc::new(CycleStrategy::new()), &lower);
        let quad = remove_with_edges(&mut lower, "b");

        let delta = scheme.update(&lower, &quad).unwrap();
        let graph = scheme.graph();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        let node = graph.nodes().next().unwrap();
        assert_eq!(node.dec().nodes(), &keys(&["a", "c"]));
        assert!(node.signature().is_empty());
        assert!(node.dec().contains_edge(&EdgeKey::new("c", "a")));

        assert_eq!(delta.nodes_removed, keys(&["1_cycles_1"]));
        assert_eq!(delta.nodes_added, keys(&["1_cycles_2"]));
        assert_eq!(fingerprint(&lower, &scheme), fingerprint(&lower, &contracted(Arc::new(CycleStrategy::new()), &lower)));
    }

    /// Under SCCs, losing `b` splits the level into two supernodes and a superedge.
    #[test]
    fn scc_scheme_after_removing_a_node() {
        let mut lower = triangle();
        let mut scheme = contracted(Arc::new(SccStrategy::new()), &lower);
        let quad = remove_with_edges(&mut lower, "b");

        let delta = scheme.update(&lower, &quad).unwrap();
        let graph = scheme.graph();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let a = scheme.supernode_of(&NodeKey::from("a")).unwrap();
        let c = scheme.supernode_of(&NodeKey::from("c")).unwrap();
        assert_ne!(a, c);
        let edge = graph.edge(&EdgeKey::new(c.clone(), a.clone())).unwrap();
        assert_eq!(edge.dec(), &BTreeSet::from([EdgeKey::new("c", "a")]));

        assert_eq!(delta.nodes_removed.len(), 1);
        assert_eq!(delta.nodes_added.len(), 2);
        assert_eq!(delta.edges_added.len(), 1);
    }

    /// Contracting twice gives the same structure.
    #[test]
    fn idempotent_rebuild() {
        let lower = DecGraph::from_parts(
            ["a", "b", "c", "d", "e"],
            [("a", "b"), ("b", "a"), ("b", "c"), ("c", "d"), ("d", "c"), ("d", "e")],
        )
        .unwrap();
        let mut scheme = contracted(Arc::new(SccStrategy::new()), &lower);
        let first = fingerprint(&lower, &scheme);
        let first_ids: Vec<_> = scheme.graph().node_keys().cloned().collect();
        scheme.contract(&lower).unwrap();
        assert_eq!(fingerprint(&lower, &scheme), first);
        let second_ids: Vec<_> = scheme.graph().node_keys().cloned().collect();
        assert!(first_ids.iter().all(|id| !second_ids.contains(id)));
    }

    /// An edge closing a cycle merges SCC supernodes like a rebuild would.
    #[test]
    fn added_edge_merges_sccs() {
        let mut lower = DecGraph::from_parts(["a", "b", "c", "d"], [("a", "b"), ("b", "c"), ("c", "d")]).unwrap();
        let mut scheme = contracted(Arc::new(SccStrategy::new()), &lower);
        assert_eq!(scheme.graph().node_count(), 4);

        let quad = add_edge(&mut lower, "c", "a");
        let delta = scheme.update(&lower, &quad).unwrap();
        assert_eq!(scheme.graph().node_count(), 2);
        assert_eq!(scheme.graph().edge_count(), 1);
        assert_eq!(delta.nodes_removed.len(), 3);
        assert_eq!(delta.nodes_added.len(), 1);

        let rebuilt = contracted(Arc::new(SccStrategy::new()), &lower);
        assert_eq!(fingerprint(&lower, &scheme), fingerprint(&lower, &rebuilt));
    }

    /// An edge inside an existing aggregate changes nothing at this level.
    #[test]
    fn redundant_edge_yields_empty_delta() {
        let mut lower = DecGraph::from_parts(["a", "b", "c"], [("a", "b"), ("b", "a"), ("b", "c")]).unwrap();
        let mut scheme = contracted(Arc::new(SccStrategy::new()), &lower);
        let quad = add_edge(&mut lower, "a", "c");
        let delta = scheme.update(&lower, &quad).unwrap();
        assert!(delta.is_empty());
        let ab = scheme.supernode_of(&NodeKey::from("a")).unwrap().clone();
        let c = scheme.supernode_of(&NodeKey::from("c")).unwrap().clone();
        assert_eq!(scheme.graph().edge(&EdgeKey::new(ab, c)).unwrap().dec().len(), 2);
    }

    /// Added nodes are placed by their recomputed signature.
    #[test]
    fn added_node_and_edges() {
        let mut lower = DecGraph::from_parts(["a", "b"], [("a", "b"), ("b", "a")]).unwrap();
        let mut scheme = contracted(Arc::new(CliqueStrategy::new()), &lower);
        assert_eq!(scheme.graph().node_count(), 1);

        lower.add_node(Supernode::new("c")).unwrap();
        lower.add_edge(Superedge::new("c", "a")).unwrap();
        lower.add_edge(Superedge::new("b", "c")).unwrap();
        let mut quad = UpdateQuadruple::new();
        quad.nodes_added.insert(NodeKey::from("c"));
        quad.edges_added.insert(EdgeKey::new("c", "a"));
        quad.edges_added.insert(EdgeKey::new("b", "c"));

        scheme.update(&lower, &quad).unwrap();
        assert_eq!(scheme.graph().node_count(), 1);
        let node = scheme.graph().nodes().next().unwrap();
        assert_eq!(node.dec().nodes(), &keys(&["a", "b", "c"]));
        assert_eq!(node.dec().edges().len(), 4);
        let rebuilt = contracted(Arc::new(CliqueStrategy::new()), &lower);
        assert_eq!(fingerprint(&lower, &scheme), fingerprint(&lower, &rebuilt));
    }

    /// Supernode ids keep growing across updates.
    #[test]
    fn ids_are_never_reused() {
        let mut lower = DecGraph::from_parts(["a", "b"], [("a", "b")]).unwrap();
        let mut scheme = contracted(Arc::new(SccStrategy::new()), &lower);
        let quad = add_edge(&mut lower, "b", "a");
        scheme.update(&lower, &quad).unwrap();
        let merged = scheme.supernode_of(&NodeKey::from("a")).unwrap().clone();
        assert_eq!(merged.as_str(), "1_sccs_3");

        lower.remove_edge(&EdgeKey::new("b", "a")).unwrap();
        let mut quad = UpdateQuadruple::new();
        quad.edges_removed.insert(EdgeKey::new("b", "a"));
        scheme.update(&lower, &quad).unwrap();
        let split: BTreeSet<_> = scheme.graph().node_keys().map(|k| k.as_str().to_owned()).collect();
        assert_eq!(split, BTreeSet::from(["1_sccs_4".to_owned(), "1_sccs_5".to_owned()]));
    }

    /// A quadruple the scheme cannot honour invalidates it.
    #[test]
    fn inconsistent_update_invalidates() {
        let lower = triangle();
        let mut scheme = contracted(Arc::new(SccStrategy::new()), &lower);

        let mut bogus = UpdateQuadruple::new();
        bogus.edges_removed.insert(EdgeKey::new("a", "c"));
        let err = scheme.update(&lower, &bogus).unwrap_err();
        assert!(matches!(err, ContractionError::InconsistentUpdate { level: 1, .. }));
        assert!(!scheme.is_valid());

        let err = scheme.update(&lower, &UpdateQuadruple::new()).unwrap_err();
        assert_eq!(err, ContractionError::NotContracted { level: 1 });

        scheme.contract(&lower).unwrap();
        assert!(scheme.is_valid());
    }

    /// A removed node still present below is rejected.
    #[test]
    fn removed_node_still_present_is_inconsistent() {
        let lower = triangle();
        let mut scheme = contracted(Arc::new(CycleStrategy::new()), &lower);
        let mut bogus = UpdateQuadruple::new();
        bogus.nodes_removed.insert(NodeKey::from("a"));
        assert!(scheme.update(&lower, &bogus).unwrap_err().taints_scheme());
    }

    /// A failing strategy leaves the previous structure in place.
    #[test]
    fn strategy_failure_leaves_state_untouched() {
        let small = DecGraph::from_parts(["a", "b"], [("a", "b"), ("b", "a")]).unwrap();
        let strategy = CycleStrategy::new().with_limits(CycleConfig::new().with_max_cycles(1));
        let mut scheme = contracted(Arc::new(strategy), &small);
        let before = fingerprint(&small, &scheme);

        let big = DecGraph::from_parts(["a", "b", "c"], [("a", "b"), ("b", "a"), ("b", "c"), ("c", "b")]).unwrap();
        let err = scheme.contract(&big).unwrap_err();
        assert!(matches!(err, ContractionError::Strategy(StrategyError::LimitExceeded { .. })));
        assert!(scheme.is_valid());
        assert_eq!(fingerprint(&small, &scheme), before);

        let mut grown = small.clone();
        grown.add_node(Supernode::new("c")).unwrap();
        grown.add_edge(Superedge::new("b", "c")).unwrap();
        grown.add_edge(Superedge::new("c", "b")).unwrap();
        let mut quad = UpdateQuadruple::new();
        quad.nodes_added.insert(NodeKey::from("c"));
        quad.edges_added.insert(EdgeKey::new("b", "c"));
        quad.edges_added.insert(EdgeKey::new("c", "b"));
        assert!(matches!(scheme.update(&grown, &quad), Err(ContractionError::Strategy(_))));
        assert!(scheme.is_valid());
        assert_eq!(fingerprint(&small, &scheme), before);
    }

    /// Decoration runs on build and again on touched entities.
    #[test]
    fn decoration_on_contract_and_update() {
        let decorators = Decorators::new()
            .with_supernode(|node| Attributes::from([("size".to_owned(), json!(node.dec().nodes().len()))]))
            .with_superedge(|edge| Attributes::from([("weight".to_owned(), json!(edge.dec().len()))]))
            .with_component_set(|set| Attributes::from([("members".to_owned(), json!(set.len()))]));
        let mut lower = DecGraph::from_parts(["a", "b", "c"], [("a", "b"), ("b", "a"), ("b", "c")]).unwrap();
        let mut scheme = ContractionScheme::new(Arc::new(SccStrategy::new())).with_decorators(decorators);
        scheme.contract(&lower).unwrap();

        let ab = scheme.supernode_of(&NodeKey::from("a")).unwrap().clone();
        let c = scheme.supernode_of(&NodeKey::from("c")).unwrap().clone();
        assert_eq!(scheme.graph().node(&ab).unwrap().attributes["size"], json!(2));
        let edge_key = EdgeKey::new(ab.clone(), c.clone());
        assert_eq!(scheme.graph().edge(&edge_key).unwrap().attributes["weight"], json!(1));
        assert!(scheme.table().sets().all(|set| set.attributes.contains_key("members")));

        let quad = add_edge(&mut lower, "a", "c");
        scheme.update(&lower, &quad).unwrap();
        assert_eq!(scheme.graph().edge(&edge_key).unwrap().attributes["weight"], json!(2));
        assert_eq!(scheme.component_sets_of(&ab).len(), 1);
    }

    /// Groups each weak component, recomputed over the whole graph.
    #[derive(Debug)]
    struct WeakComponents;

    impl ContractionStrategy for WeakComponents {
        fn name(&self) -> &str {
            "wcc"
        }

        fn component_sets(
            &self,
            graph: &DecGraph,
            region: &BTreeSet<NodeKey>,
        ) -> Result<Vec<BTreeSet<NodeKey>>, StrategyError> {
            Ok(traversal::weak_components(graph, region))
        }

        fn is_incremental(&self) -> bool {
            false
        }
    }

    /// Non-incremental strategies still produce a proper net delta.
    #[test]
    fn non_incremental_strategy() {
        let mut lower = DecGraph::from_parts(["a", "b", "c"], [("a", "b")]).unwrap();
        let mut scheme = contracted(Arc::new(WeakComponents), &lower);
        assert_eq!(scheme.graph().node_count(), 2);

        let quad = add_edge(&mut lower, "b", "c");
        let delta = scheme.update(&lower, &quad).unwrap();
        assert_eq!(scheme.graph().node_count(), 1);
        assert_eq!(delta.nodes_removed.len(), 2);
        assert_eq!(delta.nodes_added.len(), 1);
        assert!(delta.edges_added.is_empty());
        assert_eq!(scheme.graph().node_keys().next().unwrap().as_str(), "1_wcc_3");
    }

    /// A fresh copy keeps configuration but not structure.
    #[test]
    fn fresh_scheme_is_uninitialized() {
        let scheme = contracted(Arc::new(SccStrategy::new()), &triangle()).with_level(1);
        let copy = scheme.fresh();
        assert_eq!(copy.name(), "sccs");
        assert_eq!(copy.level(), 1);
        assert!(!copy.is_valid());
        assert!(copy.graph().is_empty());
    }
}
