//! multilevel-graphs: incrementally maintained hierarchies of graph abstractions.
//!
//! A base graph is grouped into *supernodes* and *superedges* by a pluggable
//! grouping strategy (strongly connected components, simple cycles, maximal
//! cliques). The grouped graph is grouped again, and so on, giving a stack of
//! progressively coarser graphs. Each level is *decontractible*: every
//! supernode records the lower nodes it contains and the lower edges hidden
//! inside it, and every superedge records the lower edges it aggregates.
//!
//! When the base graph changes, the change is described by an
//! [`UpdateQuadruple`] and pushed up the stack. Each
//! [`ContractionScheme`] repairs its own level and reports the net change at
//! that level to the level above, recomputing groupings only over the region
//! the change can affect.
//!
//! # Structure
//! - [`core`]: keys, supernodes, superedges and their decontractions.
//! - [`graph`]: the decontractible graph and traversal helpers.
//! - [`component`]: component sets and the component-set table.
//! - [`strategy`]: the grouping contract and its three implementations.
//! - [`scheme`]: one level, built by `contract` and repaired by `update`.
//! - [`multilevel`]: the stack of levels and base-graph edits.
//! - [`fingerprint`]: value identity of component sets and whole levels.
//!
//! # Example
//!
//! ```
//! use multilevel_graphs::prelude::*;
//! use std::sync::Arc;
//!
//! let base = DecGraph::from_parts(["a", "b", "c"], [("a", "b"), ("b", "a"), ("b", "c")]).unwrap();
//! let schemes = vec![ContractionScheme::new(Arc::new(SccStrategy::new()))];
//! let mut stack = MultilevelGraph::new(base, schemes).unwrap();
//! stack.build().unwrap();
//! assert_eq!(stack.level(1).unwrap().node_count(), 2);
//!
//! stack.commit(GraphEdit::new().add_edge("c", "a")).unwrap();
//! assert_eq!(stack.level(1).unwrap().node_count(), 1);
//! ```
//!
//! # References
//!
//! - Tarjan, R. "Depth-first search and linear graph algorithms" (1972)
//! - Johnson, D. B. "Finding all the elementary circuits of a directed graph" (1975)
//! - Bron, C., Kerbosch, J. "Algorithm 457: finding all cliques of an undirected graph" (1973)

pub mod component;
pub mod config;
pub mod core;
pub mod decorate;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod multilevel;
pub mod parallel;
pub mod quadruple;
pub mod scheme;
pub mod strategy;

pub use crate::component::{CompTable, ComponentSet, ComponentSetId};
pub use crate::core::{Attributes, EdgeKey, NodeKey, Superedge, Supernode};
pub use crate::error::{ConfigError, ContractionError, GraphError, StrategyError};
pub use crate::graph::DecGraph;
pub use crate::multilevel::{GraphEdit, MultilevelGraph};
pub use crate::quadruple::UpdateQuadruple;
pub use crate::scheme::ContractionScheme;
pub use crate::strategy::{CliqueStrategy, ContractionStrategy, CycleStrategy, SccStrategy};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::component::{CompTable, ComponentSet, ComponentSetId};
    pub use crate::config::{CliqueConfig, CycleConfig, EngineConfig, ParallelConfig};
    pub use crate::core::{Attributes, Decontraction, EdgeKey, IdCounter, NodeKey, Superedge, Supernode};
    pub use crate::decorate::Decorators;
    pub use crate::error::{ConfigError, ContractionError, GraphError, StrategyError};
    pub use crate::fingerprint::{HashValue, LevelContents, Signature};
    pub use crate::graph::DecGraph;
    pub use crate::multilevel::{GraphEdit, MultilevelGraph};
    pub use crate::quadruple::UpdateQuadruple;
    pub use crate::scheme::ContractionScheme;
    pub use crate::strategy::{CliqueStrategy, ContractionStrategy, CycleStrategy, SccStrategy};
}
