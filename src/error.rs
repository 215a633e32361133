//! Error types for the contraction engine.
//!
//! Errors are split by concern: graph mutations (`GraphError`), grouping
//! strategies (`StrategyError`), scheme and stack operations
//! (`ContractionError`) and configuration (`ConfigError`).
//!
//! # Locality
//! - `GraphError` fails the single `add_*`/`remove_*` call that raised it and
//!   leaves the graph untouched.
//! - `ContractionError::InconsistentUpdate` taints the scheme that raised it;
//!   the scheme must be rebuilt with `contract` before it is trusted again.

use crate::core::{EdgeKey, NodeKey};
use thiserror::Error;

/// Failure of a single graph mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// A node or edge with this identity already exists.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The edge's tail or head is not a node of the graph.
    #[error("dangling endpoint on edge {tail} -> {head}")]
    DanglingEndpoint {
        /// Tail key of the rejected edge.
        tail: NodeKey,
        /// Head key of the rejected edge.
        head: NodeKey,
    },

    /// The referenced node does not exist.
    #[error("node {0} does not exist")]
    MissingNode(NodeKey),

    /// The referenced edge does not exist.
    #[error("edge {0} does not exist")]
    MissingEdge(EdgeKey),

    /// The node still has incident edges and cannot be removed.
    #[error("node {0} still has incident edges")]
    IncidentEdges(NodeKey),

    /// A child node was added to a supernode from the wrong level.
    #[error("level mismatch: expected a level {expected} node, found level {found}")]
    LevelMismatch {
        /// Level the supernode accepts children from.
        expected: usize,
        /// Level of the rejected child.
        found: usize,
    },
}

/// Failure reported by a grouping strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StrategyError {
    /// An enumeration guard was exceeded.
    #[error("strategy {strategy} exceeded its limit of {limit}")]
    LimitExceeded {
        /// Name of the strategy.
        strategy: String,
        /// The configured limit.
        limit: usize,
    },

    /// Any other strategy-specific failure.
    #[error("strategy failed: {0}")]
    Failed(String),
}

/// Failure of a contraction scheme or multilevel stack operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ContractionError {
    /// A graph mutation failed during full reconstruction.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The grouping strategy failed.
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// An incremental update found no entity where it expected one.
    #[error("inconsistent update at level {level}: {reason}")]
    InconsistentUpdate {
        /// Level of the scheme that rejected the update.
        level: usize,
        /// What the update step could not find.
        reason: String,
    },

    /// An incremental update was requested on an invalid scheme.
    #[error("scheme at level {level} is not contracted")]
    NotContracted {
        /// Level of the invalid scheme.
        level: usize,
    },

    /// Two schemes in one stack share a strategy name.
    #[error("duplicate strategy name in stack: {0}")]
    DuplicateStrategyName(String),

    /// The requested level does not exist in the stack.
    #[error("level {0} does not exist")]
    UnknownLevel(usize),
}

impl ContractionError {
    /// Creates an `InconsistentUpdate` error.
    pub fn inconsistent<S: Into<String>>(level: usize, reason: S) -> Self {
        Self::InconsistentUpdate {
            level,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error invalidates the scheme that raised it.
    pub fn taints_scheme(&self) -> bool {
        matches!(self, Self::InconsistentUpdate { .. })
    }
}

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `min_components` must be at least 1.
    #[error("parallel min_components must be at least 1")]
    InvalidMinComponents,

    /// `max_length` must be at least 1 when set.
    #[error("cycle max_length must be at least 1")]
    InvalidMaxCycleLength,

    /// `max_cycles` must be at least 1.
    #[error("cycle max_cycles must be at least 1")]
    InvalidMaxCycles,

    /// `min_size` must be at least 1.
    #[error("clique min_size must be at least 1")]
    InvalidMinCliqueSize,

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
