//! The multilevel stack: a base graph and the contraction schemes built on it.
//!
//! Level 0 is the base graph. Level `i` (1-based) is the graph built by the
//! `i`-th scheme over level `i - 1`. A change to the base graph enters as an
//! [`UpdateQuadruple`] and is pushed upward one level at a time, each level's
//! net delta becoming the input of the next.
//!
//! # Invariants
//! - Strategy names are unique within a stack.
//! - Scheme `i` is at level `i`.
//! - A level whose incremental update failed is invalid, and so is every
//!   level above it, until it is rebuilt.

use crate::core::{EdgeKey, NodeKey, Superedge, Supernode};
use crate::error::{ContractionError, GraphError};
use crate::fingerprint::{HashValue, LevelContents};
use crate::graph::DecGraph;
use crate::quadruple::UpdateQuadruple;
use crate::scheme::ContractionScheme;
use std::collections::BTreeSet;

/// A base graph and the ordered stack of levels above it.
#[derive(Debug, Clone)]
pub struct MultilevelGraph {
    base: DecGraph,
    schemes: Vec<ContractionScheme>,
}

impl MultilevelGraph {
    /// Creates an unbuilt stack. Scheme `i` in `schemes` builds level `i + 1`.
    pub fn new(base: DecGraph, mut schemes: Vec<ContractionScheme>) -> Result<Self, ContractionError> {
        if base.level() != 0 {
            return Err(GraphError::LevelMismatch {
                expected: 0,
                found: base.level(),
            }
            .into());
        }
        let mut names = BTreeSet::new();
        for scheme in &schemes {
            if !names.insert(scheme.name().to_owned()) {
                return Err(ContractionError::DuplicateStrategyName(scheme.name().to_owned()));
            }
        }
        for (idx, scheme) in schemes.iter_mut().enumerate() {
            scheme.set_level(idx + 1);
        }
        Ok(Self { base, schemes })
    }

    /// Contracts every level bottom-up, stopping at the first failure.
    ///
    /// A failing level and every level above it are left invalid.
    pub fn build(&mut self) -> Result<(), ContractionError> {
        for idx in 0..self.schemes.len() {
            let (lower, scheme) = self.split_level(idx);
            if let Err(err) = scheme.contract(lower) {
                self.invalidate_levels(idx);
                return Err(err);
            }
        }
        tracing::debug!(height = self.height(), "built multilevel graph");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// Number of levels above the base graph.
    #[inline]
    pub fn height(&self) -> usize {
        self.schemes.len()
    }

    /// The base graph.
    #[inline]
    pub fn base(&self) -> &DecGraph {
        &self.base
    }

    /// The graph at `level`; level 0 is the base graph.
    pub fn level(&self, level: usize) -> Result<&DecGraph, ContractionError> {
        if level == 0 {
            return Ok(&self.base);
        }
        self.scheme(level).map(ContractionScheme::graph)
    }

    /// The scheme building `level` (1-based).
    pub fn scheme(&self, level: usize) -> Result<&ContractionScheme, ContractionError> {
        level
            .checked_sub(1)
            .and_then(|idx| self.schemes.get(idx))
            .ok_or(ContractionError::UnknownLevel(level))
    }

    /// Schemes in level order.
    pub fn schemes(&self) -> impl Iterator<Item = &ContractionScheme> + '_ {
        self.schemes.iter()
    }

    /// Whether every level is valid.
    pub fn is_valid(&self) -> bool {
        self.schemes.iter().all(ContractionScheme::is_valid)
    }

    /// The supernode at `level + 1` containing `key` of `level`.
    pub fn supernode_of(&self, level: usize, key: &NodeKey) -> Result<Option<&NodeKey>, ContractionError> {
        Ok(self.scheme(level + 1)?.supernode_of(key))
    }

    /// The nested graph of the supernode `key` at `level`: the members and
    /// hidden edges it holds, taken from `level - 1`.
    ///
    /// A base node has an empty nested graph.
    pub fn decontract(&self, level: usize, key: &NodeKey) -> Result<DecGraph, ContractionError> {
        let node = self
            .level(level)?
            .node(key)
            .ok_or_else(|| GraphError::MissingNode(key.clone()))?;
        match level.checked_sub(1) {
            Some(below) => Ok(self.level(below)?.induced_subgraph(node.dec().nodes())),
            None => Ok(DecGraph::new()),
        }
    }

    /// Every base node under the supernode `key` at `level`.
    pub fn expand(&self, level: usize, key: &NodeKey) -> Result<BTreeSet<NodeKey>, ContractionError> {
        let graph = self.level(level)?;
        if !graph.contains_node(key) {
            return Err(GraphError::MissingNode(key.clone()).into());
        }
        let mut frontier = BTreeSet::from([key.clone()]);
        for current in (1..=level).rev() {
            let graph = self.level(current)?;
            frontier = frontier
                .iter()
                .filter_map(|key| graph.node(key))
                .flat_map(|node| node.dec().nodes().iter().cloned())
                .collect();
        }
        Ok(frontier)
    }

    /// Id-independent fingerprint of `level`, derived from base keys.
    ///
    /// Two stacks over the same base graph with the same strategies have
    /// equal fingerprints at every level, whatever ids they allocated.
    pub fn structural_fingerprint(&self, level: usize) -> Result<HashValue, ContractionError> {
        if level > self.height() {
            return Err(ContractionError::UnknownLevel(level));
        }
        let mut contents = LevelContents::base(&self.base);
        for scheme in &self.schemes[..level] {
            contents = contents.lift(scheme.graph())?;
        }
        Ok(contents.fingerprint())
    }

    // ------------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------------

    /// Pushes a base-graph change up through every level.
    ///
    /// The base graph must already reflect `quad`. Returns the delta each
    /// level produced, bottom-up. Propagation stops at the first level whose
    /// delta is empty, even when a level above it is invalid. An invalid
    /// level reached by a non-empty delta (or level 1, always) is rebuilt by
    /// full contraction together with every level above it. A failure
    /// invalidates the failing level and everything above it.
    pub fn apply_update(&mut self, quad: UpdateQuadruple) -> Result<Vec<UpdateQuadruple>, ContractionError> {
        let mut deltas = Vec::new();
        let mut incoming = quad;
        for idx in 0..self.schemes.len() {
            if idx > 0 && incoming.is_empty() {
                break;
            }
            if !self.schemes[idx].is_valid() {
                deltas.extend(self.rebuild_from(idx)?);
                break;
            }
            if incoming.is_empty() {
                break;
            }
            let (lower, scheme) = self.split_level(idx);
            match scheme.update(lower, &incoming) {
                Ok(delta) => {
                    deltas.push(delta.clone());
                    incoming = delta;
                }
                Err(err) => {
                    self.invalidate_levels(idx);
                    return Err(err);
                }
            }
        }
        Ok(deltas)
    }

    /// Marks `level` and every level above it invalid.
    ///
    /// Level 0 is the base graph and cannot be invalid; it is treated as 1.
    pub fn invalidate_from(&mut self, level: usize) -> Result<(), ContractionError> {
        if level > self.height() {
            return Err(ContractionError::UnknownLevel(level));
        }
        self.invalidate_levels(level.saturating_sub(1));
        Ok(())
    }

    /// Validates `edit`, applies it to the base graph and propagates it.
    ///
    /// A rejected edit leaves the base graph and every level unchanged.
    pub fn commit(&mut self, edit: GraphEdit) -> Result<Vec<UpdateQuadruple>, ContractionError> {
        edit.validate(&self.base)?;
        let quad = edit.apply(&mut self.base)?;
        tracing::debug!(
            nodes_added = quad.nodes_added.len(),
            nodes_removed = quad.nodes_removed.len(),
            edges_added = quad.edges_added.len(),
            edges_removed = quad.edges_removed.len(),
            "committed base edit"
        );
        self.apply_update(quad)
    }

    fn rebuild_from(&mut self, start: usize) -> Result<Vec<UpdateQuadruple>, ContractionError> {
        let mut deltas = Vec::new();
        for idx in start..self.schemes.len() {
            let old = self.schemes[idx].graph().clone();
            let (lower, scheme) = self.split_level(idx);
            if let Err(err) = scheme.contract(lower) {
                self.invalidate_levels(idx);
                return Err(err);
            }
            deltas.push(UpdateQuadruple::between(&old, self.schemes[idx].graph()));
        }
        tracing::debug!(from = start + 1, "rebuilt invalid levels");
        Ok(deltas)
    }

    fn invalidate_levels(&mut self, start: usize) {
        if start < self.schemes.len() {
            tracing::warn!(from = start + 1, height = self.height(), "invalidating levels");
        }
        for scheme in self.schemes.iter_mut().skip(start) {
            scheme.invalidate();
        }
    }

    /// The graph below scheme `idx` together with that scheme.
    fn split_level(&mut self, idx: usize) -> (&DecGraph, &mut ContractionScheme) {
        let (below, rest) = self.schemes.split_at_mut(idx);
        let lower = match below.last() {
            Some(scheme) => scheme.graph(),
            None => &self.base,
        };
        (lower, &mut rest[0])
    }
}

// ----------------------------------------------------------------------------
// Base-graph edits
// ----------------------------------------------------------------------------

/// A batch of base-graph edits applied atomically by [`MultilevelGraph::commit`].
///
/// Removals apply before additions. Removing a node also removes its
/// incident edges.
#[derive(Debug, Clone, Default)]
pub struct GraphEdit {
    nodes_added: Vec<Supernode>,
    edges_added: Vec<Superedge>,
    nodes_removed: BTreeSet<NodeKey>,
    edges_removed: BTreeSet<EdgeKey>,
}

impl GraphEdit {
    /// Creates an empty edit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a base node.
    pub fn add_node(self, key: impl Into<NodeKey>) -> Self {
        self.with_node(Supernode::new(key))
    }

    /// Adds a prepared base node, attributes included.
    pub fn with_node(mut self, node: Supernode) -> Self {
        self.nodes_added.push(node);
        self
    }

    /// Adds a base edge.
    pub fn add_edge(self, tail: impl Into<NodeKey>, head: impl Into<NodeKey>) -> Self {
        self.with_edge(Superedge::new(tail, head))
    }

    /// Adds a prepared base edge, attributes included.
    pub fn with_edge(mut self, edge: Superedge) -> Self {
        self.edges_added.push(edge);
        self
    }

    /// Removes a base node and its incident edges.
    pub fn remove_node(mut self, key: impl Into<NodeKey>) -> Self {
        self.nodes_removed.insert(key.into());
        self
    }

    /// Removes a base edge.
    pub fn remove_edge(mut self, tail: impl Into<NodeKey>, head: impl Into<NodeKey>) -> Self {
        self.edges_removed.insert(EdgeKey::new(tail, head));
        self
    }

    /// Whether the edit changes nothing.
    pub fn is_empty(&self) -> bool {
        self.nodes_added.is_empty()
            && self.edges_added.is_empty()
            && self.nodes_removed.is_empty()
            && self.edges_removed.is_empty()
    }

    /// Checks the edit against `base` without touching it.
    fn validate(&self, base: &DecGraph) -> Result<(), GraphError> {
        for edge in &self.edges_removed {
            if !base.contains_edge(edge) {
                return Err(GraphError::MissingEdge(edge.clone()));
            }
        }
        for key in &self.nodes_removed {
            if !base.contains_node(key) {
                return Err(GraphError::MissingNode(key.clone()));
            }
        }

        let mut added = BTreeSet::new();
        for node in &self.nodes_added {
            if node.level() != base.level() {
                return Err(GraphError::LevelMismatch {
                    expected: base.level(),
                    found: node.level(),
                });
            }
            let taken = base.contains_node(node.key()) && !self.nodes_removed.contains(node.key());
            if taken || !added.insert(node.key()) {
                return Err(GraphError::DuplicateKey(node.key().to_string()));
            }
        }

        let survives = |key: &NodeKey| base.contains_node(key) && !self.nodes_removed.contains(key);
        let mut added_edges = BTreeSet::new();
        for edge in &self.edges_added {
            let key = edge.key();
            if !(survives(&key.tail) || added.contains(&key.tail))
                || !(survives(&key.head) || added.contains(&key.head))
            {
                return Err(GraphError::DanglingEndpoint {
                    tail: key.tail.clone(),
                    head: key.head.clone(),
                });
            }
            if edge.level() != base.level() {
                return Err(GraphError::LevelMismatch {
                    expected: base.level(),
                    found: edge.level(),
                });
            }
            let taken = base.contains_edge(key)
                && !self.edges_removed.contains(key)
                && survives(&key.tail)
                && survives(&key.head);
            if taken || !added_edges.insert(key) {
                return Err(GraphError::DuplicateKey(key.to_string()));
            }
        }
        Ok(())
    }

    /// Applies a validated edit to `base`, returning the net change.
    fn apply(self, base: &mut DecGraph) -> Result<UpdateQuadruple, GraphError> {
        let mut quad = UpdateQuadruple::new();
        for edge in &self.edges_removed {
            base.remove_edge(edge)?;
            quad.record_edge_removed(edge.clone());
        }
        for key in &self.nodes_removed {
            let (_, edges) = base.remove_node_with_edges(key)?;
            for edge in edges {
                quad.record_edge_removed(edge.key().clone());
            }
            quad.record_node_removed(key.clone());
        }
        for node in self.nodes_added {
            let key = node.key().clone();
            base.add_node(node)?;
            quad.record_node_added(key);
        }
        for edge in self.edges_added {
            let key = edge.key().clone();
            base.add_edge(edge)?;
            quad.record_edge_added(key);
        }
        Ok(quad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{CliqueStrategy, CycleStrategy, SccStrategy};
    use std::sync::Arc;

    fn keys(items: &[&str]) -> BTreeSet<NodeKey> {
        items.iter().map(|k| NodeKey::from(*k)).collect()
    }

    /// A triangle feeding a 2-cycle, plus an isolated node.
    fn sample_base() -> DecGraph {
        DecGraph::from_parts(
            ["a", "b", "c", "d", "e", "f"],
            [("a", "b"), ("b", "c"), ("c", "a"), ("c", "d"), ("d", "e"), ("e", "d")],
        )
        .unwrap()
    }

    fn schemes() -> Vec<ContractionScheme> {
        vec![
            ContractionScheme::new(Arc::new(SccStrategy::new())),
            ContractionScheme::new(Arc::new(CliqueStrategy::new())),
        ]
    }

    fn cycles_over_sccs() -> Vec<ContractionScheme> {
        vec![
            ContractionScheme::new(Arc::new(CycleStrategy::new())),
            ContractionScheme::new(Arc::new(SccStrategy::new())),
        ]
    }

    fn built_with(base: DecGraph, make: fn() -> Vec<ContractionScheme>) -> MultilevelGraph {
        let mut stack = MultilevelGraph::new(base, make()).unwrap();
        stack.build().unwrap();
        stack
    }

    fn built(base: DecGraph) -> MultilevelGraph {
        built_with(base, schemes)
    }

    fn assert_matches_rebuild(stack: &MultilevelGraph) {
        assert_matches_rebuild_with(stack, schemes);
    }

    fn assert_matches_rebuild_with(stack: &MultilevelGraph, make: fn() -> Vec<ContractionScheme>) {
        let fresh = built_with(stack.base().clone(), make);
        for level in 0..=stack.height() {
            assert_eq!(
                stack.structural_fingerprint(level).unwrap(),
                fresh.structural_fingerprint(level).unwrap(),
                "level {level}"
            );
        }
    }

    /// Duplicate strategy names are rejected.
    #[test]
    fn duplicate_names_rejected() {
        let schemes = vec![
            ContractionScheme::new(Arc::new(SccStrategy::new())),
            ContractionScheme::new(Arc::new(SccStrategy::new())),
        ];
        let err = MultilevelGraph::new(sample_base(), schemes).unwrap_err();
        assert_eq!(err, ContractionError::DuplicateStrategyName("sccs".to_owned()));
    }

    /// Building assigns levels and produces every level.
    #[test]
    fn build_two_levels() {
        let stack = built(sample_base());
        assert_eq!(stack.height(), 2);
        assert!(stack.is_valid());
        assert_eq!(stack.scheme(1).unwrap().level(), 1);
        assert_eq!(stack.scheme(2).unwrap().level(), 2);

        let level1 = stack.level(1).unwrap();
        assert_eq!(level1.node_count(), 3);
        assert_eq!(level1.edge_count(), 1);
        assert_eq!(level1.level(), 1);

        let level2 = stack.level(2).unwrap();
        assert_eq!(level2.node_count(), 2);
        assert_eq!(level2.edge_count(), 0);
        assert!(level2.node_keys().all(|k| k.as_str().starts_with("2_cliques_")));
        assert_eq!(stack.level(3).unwrap_err(), ContractionError::UnknownLevel(3));
    }

    /// Navigation walks between levels.
    #[test]
    fn navigation() {
        let stack = built(sample_base());
        let abc = stack.supernode_of(0, &NodeKey::from("a")).unwrap().unwrap().clone();
        assert_eq!(stack.supernode_of(0, &NodeKey::from("c")).unwrap(), Some(&abc));
        let top = stack.supernode_of(1, &abc).unwrap().unwrap().clone();

        let nested = stack.decontract(1, &abc).unwrap();
        assert_eq!(nested.node_keys().cloned().collect::<BTreeSet<_>>(), keys(&["a", "b", "c"]));
        assert_eq!(nested.edge_count(), 3);

        assert_eq!(stack.expand(2, &top).unwrap(), keys(&["a", "b", "c", "d", "e"]));
        assert_eq!(stack.expand(0, &NodeKey::from("f")).unwrap(), keys(&["f"]));
        assert!(stack.decontract(0, &NodeKey::from("f")).unwrap().is_empty());
        assert!(stack.expand(1, &NodeKey::from("nope")).is_err());
        assert_eq!(
            stack.supernode_of(2, &top).unwrap_err(),
            ContractionError::UnknownLevel(3)
        );
    }

    /// A committed edge propagates and matches a rebuild at every level.
    #[test]
    fn commit_propagates_edge() {
        let mut stack = built(sample_base());
        let deltas = stack.commit(GraphEdit::new().add_edge("e", "a")).unwrap();
        assert_eq!(deltas.len(), 2);
        assert_eq!(stack.level(1).unwrap().node_count(), 2);
        assert_eq!(stack.level(2).unwrap().node_count(), 2);
        assert_matches_rebuild(&stack);
    }

    /// Removing a node cascades to its edges and propagates.
    #[test]
    fn commit_removes_node_with_edges() {
        let mut stack = built(sample_base());
        stack.commit(GraphEdit::new().remove_node("c")).unwrap();
        assert!(!stack.base().contains_node(&NodeKey::from("c")));
        assert_eq!(stack.base().edge_count(), 3);
        assert_eq!(stack.level(1).unwrap().node_count(), 4);
        assert_matches_rebuild(&stack);
    }

    /// A mixed batch gives the same levels as a rebuild.
    #[test]
    fn commit_mixed_batch() {
        let mut stack = built(sample_base());
        let edit = GraphEdit::new()
            .remove_edge("c", "d")
            .add_node("g")
            .add_edge("f", "g")
            .add_edge("g", "f")
            .add_edge("d", "a");
        stack.commit(edit).unwrap();
        assert_matches_rebuild(&stack);

        let edit = GraphEdit::new().remove_node("g").add_node("g").add_edge("g", "a");
        stack.commit(edit).unwrap();
        assert_eq!(stack.base().incident_edges(&NodeKey::from("g")).len(), 1);
        assert_matches_rebuild(&stack);
    }

    /// A rejected batch leaves the base graph unchanged.
    #[test]
    fn invalid_edit_is_rejected_atomically() {
        let mut stack = built(sample_base());
        let before = stack.base().clone();

        let dangling = GraphEdit::new().add_node("g").add_edge("g", "zz");
        assert!(matches!(
            stack.commit(dangling),
            Err(ContractionError::Graph(GraphError::DanglingEndpoint { .. }))
        ));
        let duplicate = GraphEdit::new().remove_edge("a", "b").add_node("a");
        assert!(matches!(
            stack.commit(duplicate),
            Err(ContractionError::Graph(GraphError::DuplicateKey(_)))
        ));
        let missing = GraphEdit::new().remove_edge("b", "a");
        assert!(matches!(
            stack.commit(missing),
            Err(ContractionError::Graph(GraphError::MissingEdge(_)))
        ));
        let orphaned = GraphEdit::new().remove_node("a").add_edge("b", "a");
        assert!(stack.commit(orphaned).is_err());

        assert_eq!(stack.base(), &before);
        assert!(stack.is_valid());
    }

    /// A change absorbed by level 1 never reaches level 2.
    #[test]
    fn empty_delta_short_circuits() {
        let mut stack = built(sample_base());
        let top_before = stack.level(2).unwrap().clone();
        let deltas = stack.commit(GraphEdit::new().add_edge("a", "c")).unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(deltas[0].is_empty());
        assert_eq!(stack.level(2).unwrap(), &top_before);

        assert!(stack.apply_update(UpdateQuadruple::new()).unwrap().is_empty());
    }

    /// Invalid levels are rebuilt on the next update and report their delta.
    #[test]
    fn invalid_levels_are_rebuilt() {
        let mut stack = built(sample_base());
        stack.invalidate_from(2).unwrap();
        assert!(stack.scheme(1).unwrap().is_valid());
        assert!(!stack.scheme(2).unwrap().is_valid());

        let deltas = stack.commit(GraphEdit::new().add_edge("e", "a")).unwrap();
        assert_eq!(deltas.len(), 2);
        assert!(stack.is_valid());
        assert!(!deltas[1].nodes_removed.is_empty());
        assert_matches_rebuild(&stack);

        assert_eq!(stack.invalidate_from(3), Err(ContractionError::UnknownLevel(3)));
        stack.invalidate_from(0).unwrap();
        assert!(stack.schemes().all(|s| !s.is_valid()));
    }

    /// A quadruple the levels cannot honour invalidates the stack from there.
    #[test]
    fn failed_update_invalidates_upward() {
        let mut stack = built(sample_base());
        let mut bogus = UpdateQuadruple::new();
        bogus.edges_removed.insert(EdgeKey::new("a", "b"));
        let err = stack.apply_update(bogus).unwrap_err();
        assert!(err.taints_scheme());
        assert!(!stack.scheme(1).unwrap().is_valid());
        assert!(!stack.scheme(2).unwrap().is_valid());

        stack.build().unwrap();
        assert!(stack.is_valid());
        assert_matches_rebuild(&stack);
    }

    /// Cycles at level 1 feed SCCs at level 2.
    #[test]
    fn cycles_then_sccs() {
        let mut stack = built_with(sample_base(), cycles_over_sccs);
        assert_eq!(stack.level(1).unwrap().node_count(), 3);

        stack.commit(GraphEdit::new().remove_edge("e", "d")).unwrap();
        assert_matches_rebuild_with(&stack, cycles_over_sccs);
    }

    /// An invalid upper level stays untouched when the level below absorbs the change.
    #[test]
    fn empty_delta_skips_invalid_level() {
        let base = DecGraph::from_parts(["a", "b", "c"], [("a", "b"), ("b", "a"), ("b", "c")]).unwrap();
        let mut stack = built(base);
        stack.invalidate_from(2).unwrap();

        let deltas = stack.commit(GraphEdit::new().add_edge("a", "c")).unwrap();
        assert_eq!(deltas.len(), 1);
        assert!(deltas[0].is_empty());
        assert!(stack.scheme(1).unwrap().is_valid());
        assert!(!stack.scheme(2).unwrap().is_valid());

        stack.build().unwrap();
        assert_matches_rebuild(&stack);
    }

    /// An invalid level 1 is rebuilt even for an empty quadruple.
    #[test]
    fn invalid_first_level_rebuilt_on_empty_update() {
        let mut stack = built(sample_base());
        stack.invalidate_from(1).unwrap();
        let deltas = stack.apply_update(UpdateQuadruple::new()).unwrap();
        assert_eq!(deltas.len(), 2);
        assert!(stack.is_valid());
        assert_matches_rebuild(&stack);
    }
}
