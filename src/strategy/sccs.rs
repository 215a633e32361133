//! Strongly connected components as component sets.
//!
//! Every node belongs to exactly one SCC, singletons included, so every node
//! has a one-element signature and each supernode is one SCC.
//!
//! # Citations
//! - Tarjan, "Depth-first search and linear graph algorithms", SIAM J. Computing (1972)

use super::{endpoints, per_component, ContractionStrategy};
use crate::component::CompTable;
use crate::config::{EngineConfig, ParallelConfig};
use crate::core::{EdgeKey, NodeKey};
use crate::error::StrategyError;
use crate::graph::{traversal, DecGraph};
use std::collections::{BTreeMap, BTreeSet};

/// Groups nodes by strongly connected component.
#[derive(Debug, Clone, Default)]
pub struct SccStrategy {
    parallel: ParallelConfig,
}

impl SccStrategy {
    /// Name used in supernode keys.
    pub const NAME: &'static str = "sccs";

    /// Creates the strategy with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the strategy from an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            parallel: config.parallel.clone(),
        }
    }
}

impl ContractionStrategy for SccStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn component_sets(
        &self,
        graph: &DecGraph,
        region: &BTreeSet<NodeKey>,
    ) -> Result<Vec<BTreeSet<NodeKey>>, StrategyError> {
        per_component(graph, region, &self.parallel, |component| {
            Ok(strongly_connected_components(graph, component))
        })
    }

    fn update_added_edge(&self, graph: &DecGraph, table: &CompTable, edge: &EdgeKey) -> BTreeSet<NodeKey> {
        if table.shares_component_set(&edge.tail, &edge.head)
            || !traversal::reaches(graph, &edge.head, &edge.tail)
        {
            return BTreeSet::new();
        }
        endpoints(edge)
    }

    fn update_removed_edge(&self, _graph: &DecGraph, table: &CompTable, edge: &EdgeKey) -> BTreeSet<NodeKey> {
        if edge.is_loop() || !table.shares_component_set(&edge.tail, &edge.head) {
            return BTreeSet::new();
        }
        endpoints(edge)
    }
}

struct Frame<'a> {
    node: &'a NodeKey,
    successors: Vec<&'a NodeKey>,
    next: usize,
}

#[derive(Default)]
struct Tarjan<'a> {
    index: BTreeMap<&'a NodeKey, usize>,
    lowlink: BTreeMap<&'a NodeKey, usize>,
    on_stack: BTreeSet<&'a NodeKey>,
    stack: Vec<&'a NodeKey>,
    next_index: usize,
    components: Vec<BTreeSet<NodeKey>>,
}

impl<'a> Tarjan<'a> {
    fn enter(&mut self, graph: &'a DecGraph, nodes: &'a BTreeSet<NodeKey>, v: &'a NodeKey) -> Frame<'a> {
        self.index.insert(v, self.next_index);
        self.lowlink.insert(v, self.next_index);
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);
        let successors = graph
            .successors(v)
            .filter_map(|w| nodes.get(w))
            .collect();
        Frame {
            node: v,
            successors,
            next: 0,
        }
    }

    fn lower(&mut self, v: &'a NodeKey, value: usize) {
        if let Some(low) = self.lowlink.get_mut(v) {
            *low = (*low).min(value);
        }
    }

    fn finish(&mut self, v: &'a NodeKey) {
        if self.lowlink.get(v) != self.index.get(v) {
            return;
        }
        let mut component = BTreeSet::new();
        while let Some(w) = self.stack.pop() {
            self.on_stack.remove(w);
            component.insert(w.clone());
            if w == v {
                break;
            }
        }
        self.components.push(component);
    }
}

/// Strongly connected components of the subgraph induced by `nodes`.
///
/// Iterative Tarjan; roots are tried in ascending key order.
pub fn strongly_connected_components(graph: &DecGraph, nodes: &BTreeSet<NodeKey>) -> Vec<BTreeSet<NodeKey>> {
    let mut tarjan = Tarjan::default();
    for root in nodes {
        if !graph.contains_node(root) || tarjan.index.contains_key(root) {
            continue;
        }
        let mut calls = vec![tarjan.enter(graph, nodes, root)];
        while let Some(frame) = calls.last_mut() {
            let v = frame.node;
            if let Some(&w) = frame.successors.get(frame.next) {
                frame.next += 1;
                if !tarjan.index.contains_key(w) {
                    let child = tarjan.enter(graph, nodes, w);
                    calls.push(child);
                } else if tarjan.on_stack.contains(w) {
                    if let Some(w_index) = tarjan.index.get(w).copied() {
                        tarjan.lower(v, w_index);
                    }
                }
            } else {
                calls.pop();
                if let (Some(parent), Some(v_low)) = (calls.last(), tarjan.lowlink.get(v).copied()) {
                    tarjan.lower(parent.node, v_low);
                }
                tarjan.finish(v);
            }
        }
    }
    tarjan.components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IdCounter;

    fn keys(items: &[&str]) -> BTreeSet<NodeKey> {
        items.iter().map(|k| NodeKey::from(*k)).collect()
    }

    fn sorted(mut sets: Vec<BTreeSet<NodeKey>>) -> Vec<BTreeSet<NodeKey>> {
        sets.sort();
        sets
    }

    /// Two cycles joined by a bridge and a dangling tail.
    fn sample() -> DecGraph {
        DecGraph::from_parts(
            ["a", "b", "c", "d", "e", "f"],
            [("a", "b"), ("b", "a"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "c"), ("e", "f")],
        )
        .unwrap()
    }

    /// SCCs including singletons.
    #[test]
    fn finds_components_and_singletons() {
        let g = sample();
        let all: BTreeSet<NodeKey> = g.node_keys().cloned().collect();
        let sccs = sorted(strongly_connected_components(&g, &all));
        assert_eq!(sccs, vec![keys(&["a", "b"]), keys(&["c", "d", "e"]), keys(&["f"])]);
    }

    /// Low links climb through nested back edges and ignore finished components.
    #[test]
    fn nested_back_edges_and_cross_edges() {
        let g = DecGraph::from_parts(
            ["a", "b", "c", "d", "x", "y"],
            [
                ("a", "b"),
                ("b", "c"),
                ("c", "d"),
                ("d", "b"),
                ("c", "a"),
                ("x", "y"),
                ("y", "x"),
                ("y", "a"),
            ],
        )
        .unwrap();
        let all: BTreeSet<NodeKey> = g.node_keys().cloned().collect();
        let sccs = sorted(strongly_connected_components(&g, &all));
        assert_eq!(sccs, vec![keys(&["a", "b", "c", "d"]), keys(&["x", "y"])]);

        let subset = keys(&["b", "c", "d", "y"]);
        let sccs = sorted(strongly_connected_components(&g, &subset));
        assert_eq!(sccs, vec![keys(&["b", "c", "d"]), keys(&["y"])]);
    }

    /// Long chains do not recurse.
    #[test]
    fn long_cycle_is_one_component() {
        let names: Vec<String> = (0..5_000).map(|i| format!("n{i:05}")).collect();
        let edges: Vec<(String, String)> = (0..names.len())
            .map(|i| (names[i].clone(), names[(i + 1) % names.len()].clone()))
            .collect();
        let g = DecGraph::from_parts(names.clone(), edges).unwrap();
        let all: BTreeSet<NodeKey> = g.node_keys().cloned().collect();
        let sccs = strongly_connected_components(&g, &all);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 5_000);
    }

    /// Contraction function registers every node in one set.
    #[test]
    fn contraction_function_covers_all_nodes() {
        let g = sample();
        let table = SccStrategy::new()
            .contraction_function(&g, &mut IdCounter::new())
            .unwrap();
        assert_eq!(table.len(), 3);
        for key in g.node_keys() {
            assert_eq!(table.signature(key).len(), 1);
        }
    }

    /// Added edges only matter when they close a cycle across SCCs.
    #[test]
    fn added_edge_hook_narrowing() {
        let mut g = sample();
        let strategy = SccStrategy::new();
        let table = strategy.contraction_function(&g, &mut IdCounter::new()).unwrap();

        g.add_edge(crate::core::Superedge::new("a", "c")).unwrap();
        let inside = EdgeKey::new("a", "c");
        assert!(strategy.update_added_edge(&g, &table, &inside).is_empty());

        g.add_edge(crate::core::Superedge::new("f", "a")).unwrap();
        let closing = EdgeKey::new("f", "a");
        assert_eq!(strategy.update_added_edge(&g, &table, &closing), keys(&["a", "f"]));

        g.add_edge(crate::core::Superedge::new("d", "c")).unwrap();
        assert!(strategy
            .update_added_edge(&g, &table, &EdgeKey::new("d", "c"))
            .is_empty());
    }

    /// Removed edges only matter inside an SCC.
    #[test]
    fn removed_edge_hook_narrowing() {
        let g = sample();
        let strategy = SccStrategy::new();
        let table = strategy.contraction_function(&g, &mut IdCounter::new()).unwrap();
        assert!(strategy
            .update_removed_edge(&g, &table, &EdgeKey::new("b", "c"))
            .is_empty());
        assert_eq!(
            strategy.update_removed_edge(&g, &table, &EdgeKey::new("d", "e")),
            keys(&["d", "e"])
        );
    }
}
