//! Simple-cycle membership as component sets.
//!
//! One set per distinct node set of a simple cycle; a self-loop is a cycle
//! of length one. Nodes on no cycle have the empty signature and collapse
//! into a single "unclustered" supernode.
//!
//! Enumeration is exponential in the worst case and guarded by
//! [`CycleConfig`]: cycles longer than `max_length` are skipped, and more
//! than `max_cycles` cycles in one call fail with
//! [`StrategyError::LimitExceeded`].
//!
//! # Citations
//! - Johnson, "Finding all the elementary circuits of a directed graph", SIAM J. Computing (1975)

use super::sccs::strongly_connected_components;
use super::{endpoints, per_component, ContractionStrategy};
use crate::component::CompTable;
use crate::config::{CycleConfig, EngineConfig, ParallelConfig};
use crate::core::{EdgeKey, NodeKey};
use crate::error::StrategyError;
use crate::graph::{traversal, DecGraph};
use std::collections::{BTreeMap, BTreeSet};

/// Groups nodes by the simple cycles they lie on.
#[derive(Debug, Clone, Default)]
pub struct CycleStrategy {
    parallel: ParallelConfig,
    limits: CycleConfig,
}

impl CycleStrategy {
    /// Name used in supernode keys.
    pub const NAME: &'static str = "cycles";

    /// Creates the strategy with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the strategy from an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            parallel: config.parallel.clone(),
            limits: config.cycles.clone(),
        }
    }

    /// Builder: replace the enumeration guards.
    pub fn with_limits(mut self, limits: CycleConfig) -> Self {
        self.limits = limits;
        self
    }
}

impl ContractionStrategy for CycleStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn component_sets(
        &self,
        graph: &DecGraph,
        region: &BTreeSet<NodeKey>,
    ) -> Result<Vec<BTreeSet<NodeKey>>, StrategyError> {
        per_component(graph, region, &self.parallel, |component| {
            let mut found = BTreeSet::new();
            for scc in strongly_connected_components(graph, component) {
                simple_cycles(graph, &scc, &self.limits, &mut found)?;
            }
            Ok(found.into_iter().collect())
        })
    }

    fn update_added_edge(&self, graph: &DecGraph, _table: &CompTable, edge: &EdgeKey) -> BTreeSet<NodeKey> {
        if traversal::reaches(graph, &edge.head, &edge.tail) {
            endpoints(edge)
        } else {
            BTreeSet::new()
        }
    }

    fn update_removed_edge(&self, _graph: &DecGraph, table: &CompTable, edge: &EdgeKey) -> BTreeSet<NodeKey> {
        if table.shares_component_set(&edge.tail, &edge.head) {
            endpoints(edge)
        } else {
            BTreeSet::new()
        }
    }
}

struct Frame<'a> {
    successors: Vec<&'a NodeKey>,
    next: usize,
}

/// Adds the node set of every simple cycle inside `scc` to `found`.
///
/// Each cycle is enumerated once, from its smallest node, walking only
/// through larger nodes.
fn simple_cycles(
    graph: &DecGraph,
    scc: &BTreeSet<NodeKey>,
    limits: &CycleConfig,
    found: &mut BTreeSet<BTreeSet<NodeKey>>,
) -> Result<(), StrategyError> {
    let rank: BTreeMap<&NodeKey, usize> = scc.iter().enumerate().map(|(i, key)| (key, i)).collect();
    let max_length = limits.max_length.unwrap_or(usize::MAX);
    let mut cycles = 0usize;

    for (start_rank, start) in scc.iter().enumerate() {
        let mut path: Vec<&NodeKey> = vec![start];
        let mut on_path: BTreeSet<&NodeKey> = BTreeSet::from([start]);
        let mut calls = vec![Frame {
            successors: ranked_successors(graph, &rank, start, start_rank),
            next: 0,
        }];

        while let Some(frame) = calls.last_mut() {
            let Some(&w) = frame.successors.get(frame.next) else {
                calls.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(done);
                }
                continue;
            };
            frame.next += 1;

            if w == start {
                cycles += 1;
                if cycles > limits.max_cycles {
                    return Err(StrategyError::LimitExceeded {
                        strategy: CycleStrategy::NAME.to_owned(),
                        limit: limits.max_cycles,
                    });
                }
                found.insert(path.iter().map(|k| (*k).clone()).collect());
                continue;
            }
            if on_path.contains(w) || path.len() >= max_length {
                continue;
            }
            path.push(w);
            on_path.insert(w);
            calls.push(Frame {
                successors: ranked_successors(graph, &rank, w, start_rank),
                next: 0,
            });
        }
    }
    Ok(())
}

/// Successors of `key` inside the SCC whose rank is at least `min_rank`.
fn ranked_successors<'a>(
    graph: &'a DecGraph,
    rank: &BTreeMap<&NodeKey, usize>,
    key: &NodeKey,
    min_rank: usize,
) -> Vec<&'a NodeKey> {
    graph
        .successors(key)
        .filter(|w| rank.get(*w).is_some_and(|&r| r >= min_rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IdCounter, Superedge};

    fn keys(items: &[&str]) -> BTreeSet<NodeKey> {
        items.iter().map(|k| NodeKey::from(*k)).collect()
    }

    fn all_sets(strategy: &CycleStrategy, g: &DecGraph) -> Result<Vec<BTreeSet<NodeKey>>, StrategyError> {
        let all: BTreeSet<NodeKey> = g.node_keys().cloned().collect();
        let mut sets = strategy.component_sets(g, &all)?;
        sets.sort();
        Ok(sets)
    }

    /// One triangle gives one set; nodes off the cycle get none.
    #[test]
    fn triangle_plus_tail() {
        let g = DecGraph::from_parts(
            ["a", "b", "c", "d"],
            [("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")],
        )
        .unwrap();
        let strategy = CycleStrategy::new();
        assert_eq!(all_sets(&strategy, &g).unwrap(), vec![keys(&["a", "b", "c"])]);

        let table = strategy.contraction_function(&g, &mut IdCounter::new()).unwrap();
        assert!(table.signature(&NodeKey::from("d")).is_empty());
    }

    /// Overlapping cycles and self-loops are distinct sets.
    #[test]
    fn overlapping_cycles_and_self_loops() {
        let g = DecGraph::from_parts(
            ["a", "b", "c", "x"],
            [("a", "b"), ("b", "a"), ("b", "c"), ("c", "a"), ("x", "x")],
        )
        .unwrap();
        let sets = all_sets(&CycleStrategy::new(), &g).unwrap();
        assert_eq!(
            sets,
            vec![keys(&["a", "b"]), keys(&["a", "b", "c"]), keys(&["x"])]
        );
    }

    /// Cycles with the same node set collapse into one set.
    #[test]
    fn same_node_set_counted_once() {
        let g = DecGraph::from_parts(
            ["a", "b", "c"],
            [("a", "b"), ("b", "c"), ("c", "a"), ("a", "c"), ("c", "b"), ("b", "a")],
        )
        .unwrap();
        let sets = all_sets(&CycleStrategy::new(), &g).unwrap();
        assert_eq!(
            sets,
            vec![
                keys(&["a", "b"]),
                keys(&["a", "b", "c"]),
                keys(&["a", "c"]),
                keys(&["b", "c"]),
            ]
        );
    }

    /// Length and count guards apply.
    #[test]
    fn guards() {
        let g = DecGraph::from_parts(
            ["a", "b", "c"],
            [("a", "b"), ("b", "c"), ("c", "a"), ("a", "c"), ("c", "b"), ("b", "a")],
        )
        .unwrap();
        let short = CycleStrategy::new().with_limits(CycleConfig::new().with_max_length(2));
        assert_eq!(all_sets(&short, &g).unwrap().len(), 3);

        let few = CycleStrategy::new().with_limits(CycleConfig::new().with_max_cycles(2));
        assert_eq!(
            all_sets(&few, &g),
            Err(StrategyError::LimitExceeded {
                strategy: "cycles".to_owned(),
                limit: 2
            })
        );
    }

    /// Hooks ignore edges that close no cycle and edges between unrelated nodes.
    #[test]
    fn hook_narrowing() {
        let mut g = DecGraph::from_parts(["a", "b", "c"], [("a", "b"), ("b", "a")]).unwrap();
        let strategy = CycleStrategy::new();
        let table = strategy.contraction_function(&g, &mut IdCounter::new()).unwrap();

        g.add_edge(Superedge::new("b", "c")).unwrap();
        assert!(strategy
            .update_added_edge(&g, &table, &EdgeKey::new("b", "c"))
            .is_empty());
        g.add_edge(Superedge::new("c", "a")).unwrap();
        assert_eq!(
            strategy.update_added_edge(&g, &table, &EdgeKey::new("c", "a")),
            keys(&["a", "c"])
        );
        assert!(strategy
            .update_removed_edge(&g, &table, &EdgeKey::new("b", "c"))
            .is_empty());
        assert_eq!(
            strategy.update_removed_edge(&g, &table, &EdgeKey::new("a", "b")),
            keys(&["a", "b"])
        );
    }
}
