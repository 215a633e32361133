//! Decontractible graphs and traversal helpers.
//!
//! - `DecGraph`: keyed nodes and edges of one level with adjacency indices.
//! - `traversal`: weak components, closures and reachability over a `DecGraph`.

pub mod dec_graph;
pub mod traversal;

pub use dec_graph::DecGraph;
