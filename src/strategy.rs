//! Grouping strategies: the rule deciding which lower-level nodes belong together.
//!
//! A strategy turns a decontractible graph into component sets. The scheme
//! consumes the resulting [`CompTable`] and never looks inside the rule.
//!
//! - [`SccStrategy`]: one set per strongly connected component.
//! - [`CycleStrategy`]: one set per node set of a simple cycle.
//! - [`CliqueStrategy`]: one set per maximal clique of the undirected view.
//!
//! # Incremental contract
//! The four `update_*` hooks are called after the lower graph has been
//! mutated and before the scheme's table is. Each returns *seed* nodes whose
//! membership may have changed. The scheme closes the seeds over weakly
//! connected components and over shared component sets, then asks
//! [`ContractionStrategy::component_sets`] for that region only. A strategy
//! whose sets never span two weakly connected components is therefore exact
//! under regional recomputation; a hook may return fewer seeds whenever it can
//! show that nothing changed. Strategies that cannot meet this return `false`
//! from [`ContractionStrategy::is_incremental`] and are recomputed over the
//! whole graph on every update.
//!
//! # Determinism
//! Given the same graph and region, `component_sets` returns the same sets.

use crate::component::CompTable;
use crate::config::ParallelConfig;
use crate::core::{EdgeKey, IdCounter, NodeKey};
use crate::error::StrategyError;
use crate::graph::{traversal, DecGraph};
use crate::parallel;
use std::collections::BTreeSet;
use std::fmt;

/// A pluggable grouping rule.
pub trait ContractionStrategy: fmt::Debug + Send + Sync {
    /// Name of the rule, unique within one multilevel stack.
    fn name(&self) -> &str;

    /// Component sets of the subgraph induced by `region`.
    ///
    /// `region` is a union of weakly connected components of `graph`.
    fn component_sets(
        &self,
        graph: &DecGraph,
        region: &BTreeSet<NodeKey>,
    ) -> Result<Vec<BTreeSet<NodeKey>>, StrategyError>;

    /// Builds the full component-set table of `graph`.
    fn contraction_function(
        &self,
        graph: &DecGraph,
        ids: &mut IdCounter,
    ) -> Result<CompTable, StrategyError> {
        let all: BTreeSet<NodeKey> = graph.node_keys().cloned().collect();
        let sets = self.component_sets(graph, &all)?;
        Ok(CompTable::from_sets(all.iter(), sets, ids))
    }

    /// Whether regional recomputation is exact for this rule.
    fn is_incremental(&self) -> bool {
        true
    }

    /// Seeds for a node added to the lower graph.
    fn update_added_node(&self, _graph: &DecGraph, _table: &CompTable, node: &NodeKey) -> BTreeSet<NodeKey> {
        BTreeSet::from([node.clone()])
    }

    /// Seeds for a node removed from the lower graph.
    fn update_removed_node(&self, _graph: &DecGraph, table: &CompTable, node: &NodeKey) -> BTreeSet<NodeKey> {
        table.mates(node)
    }

    /// Seeds for an edge added to the lower graph.
    fn update_added_edge(&self, _graph: &DecGraph, _table: &CompTable, edge: &EdgeKey) -> BTreeSet<NodeKey> {
        endpoints(edge)
    }

    /// Seeds for an edge removed from the lower graph.
    fn update_removed_edge(&self, _graph: &DecGraph, _table: &CompTable, edge: &EdgeKey) -> BTreeSet<NodeKey> {
        endpoints(edge)
    }
}

/// Both endpoints of `edge`.
pub fn endpoints(edge: &EdgeKey) -> BTreeSet<NodeKey> {
    BTreeSet::from([edge.tail.clone(), edge.head.clone()])
}

/// Splits `region` into weakly connected components and maps `per_component`
/// over them through the data-parallel helper.
pub(crate) fn per_component<F>(
    graph: &DecGraph,
    region: &BTreeSet<NodeKey>,
    config: &ParallelConfig,
    per_component: F,
) -> Result<Vec<BTreeSet<NodeKey>>, StrategyError>
where
    F: Fn(&BTreeSet<NodeKey>) -> Result<Vec<BTreeSet<NodeKey>>, StrategyError> + Send + Sync,
{
    let components = traversal::weak_components(graph, region);
    let results = parallel::try_par_map(components, |component| per_component(&component), config)?;
    Ok(results.into_iter().flatten().collect())
}

pub mod cliques;
pub mod cycles;
pub mod sccs;

pub use cliques::CliqueStrategy;
pub use cycles::CycleStrategy;
pub use sccs::SccStrategy;
