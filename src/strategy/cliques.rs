//! Maximal-clique membership as component sets.
//!
//! Cliques are taken on the undirected, loop-free view of the graph: `u` and
//! `v` are adjacent when `u -> v` or `v -> u` exists. Every isolated node is a
//! maximal clique of size one. Cliques smaller than
//! [`CliqueConfig::min_size`] form no set.
//!
//! # Citations
//! - Bron & Kerbosch, "Algorithm 457: finding all cliques of an undirected graph", CACM (1973)
//! - Tomita, Tanaka & Takahashi, "The worst-case time complexity for generating all maximal cliques" (2006)

use super::{endpoints, per_component, ContractionStrategy};
use crate::component::CompTable;
use crate::config::{CliqueConfig, EngineConfig, ParallelConfig};
use crate::core::{EdgeKey, NodeKey};
use crate::error::StrategyError;
use crate::graph::DecGraph;
use std::collections::{BTreeMap, BTreeSet};

/// Groups nodes by the maximal cliques they belong to.
#[derive(Debug, Clone, Default)]
pub struct CliqueStrategy {
    parallel: ParallelConfig,
    filter: CliqueConfig,
}

impl CliqueStrategy {
    /// Name used in supernode keys.
    pub const NAME: &'static str = "cliques";

    /// Creates the strategy with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the strategy from an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            parallel: config.parallel.clone(),
            filter: config.cliques.clone(),
        }
    }

    /// Builder: replace the clique filter.
    pub fn with_filter(mut self, filter: CliqueConfig) -> Self {
        self.filter = filter;
        self
    }
}

impl ContractionStrategy for CliqueStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn component_sets(
        &self,
        graph: &DecGraph,
        region: &BTreeSet<NodeKey>,
    ) -> Result<Vec<BTreeSet<NodeKey>>, StrategyError> {
        let min_size = self.filter.min_size;
        per_component(graph, region, &self.parallel, |component| {
            Ok(maximal_cliques(graph, component)
                .into_iter()
                .filter(|clique| clique.len() >= min_size)
                .collect())
        })
    }

    fn update_added_edge(&self, _graph: &DecGraph, table: &CompTable, edge: &EdgeKey) -> BTreeSet<NodeKey> {
        // Endpoints sharing a clique were already adjacent.
        if edge.is_loop() || table.shares_component_set(&edge.tail, &edge.head) {
            return BTreeSet::new();
        }
        endpoints(edge)
    }

    fn update_removed_edge(&self, graph: &DecGraph, _table: &CompTable, edge: &EdgeKey) -> BTreeSet<NodeKey> {
        if edge.is_loop() || graph.has_edge(&edge.head, &edge.tail) {
            return BTreeSet::new();
        }
        endpoints(edge)
    }
}

type Adjacency<'a> = BTreeMap<&'a NodeKey, BTreeSet<&'a NodeKey>>;

/// Maximal cliques of the undirected, loop-free subgraph induced by `nodes`.
pub fn maximal_cliques(graph: &DecGraph, nodes: &BTreeSet<NodeKey>) -> Vec<BTreeSet<NodeKey>> {
    let adjacency: Adjacency<'_> = nodes
        .iter()
        .filter(|key| graph.contains_node(key))
        .map(|key| {
            let neighbors = graph
                .successors(key)
                .chain(graph.predecessors(key))
                .filter(|other| *other != key)
                .filter_map(|other| nodes.get(other))
                .collect();
            (key, neighbors)
        })
        .collect();

    let mut cliques = Vec::new();
    let candidates: BTreeSet<&NodeKey> = adjacency.keys().copied().collect();
    bron_kerbosch(&adjacency, &mut Vec::new(), candidates, BTreeSet::new(), &mut cliques);
    cliques
}

fn bron_kerbosch<'a>(
    adjacency: &Adjacency<'a>,
    clique: &mut Vec<&'a NodeKey>,
    mut candidates: BTreeSet<&'a NodeKey>,
    mut excluded: BTreeSet<&'a NodeKey>,
    out: &mut Vec<BTreeSet<NodeKey>>,
) {
    if candidates.is_empty() {
        if excluded.is_empty() {
            out.push(clique.iter().map(|k| (*k).clone()).collect());
        }
        return;
    }

    let empty = BTreeSet::new();
    let neighbors = |key: &NodeKey| adjacency.get(key).unwrap_or(&empty);

    // Pivot on the node with the most neighbours among the candidates.
    let pivot = candidates
        .iter()
        .chain(excluded.iter())
        .max_by_key(|&&key| neighbors(key).intersection(&candidates).count())
        .copied();
    let branch: Vec<&NodeKey> = match pivot {
        Some(pivot) => candidates.difference(neighbors(pivot)).copied().collect(),
        None => candidates.iter().copied().collect(),
    };

    for v in branch {
        let v_neighbors = neighbors(v);
        clique.push(v);
        bron_kerbosch(
            adjacency,
            clique,
            candidates.intersection(v_neighbors).copied().collect(),
            excluded.intersection(v_neighbors).copied().collect(),
            out,
        );
        clique.pop();
        candidates.remove(v);
        excluded.insert(v);
    }
}
