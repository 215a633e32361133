//! Breadth-first traversals over a [`DecGraph`].
//!
//! All traversals visit neighbours in ascending key order, so their results
//! do not depend on insertion history.

use super::DecGraph;
use crate::core::NodeKey;
use std::collections::{BTreeSet, VecDeque};

/// Every node weakly connected to one of `seeds`.
///
/// Seeds that are not nodes of `graph` are ignored.
pub fn weak_closure<'a, I>(graph: &DecGraph, seeds: I) -> BTreeSet<NodeKey>
where
    I: IntoIterator<Item = &'a NodeKey>,
{
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    for seed in seeds {
        if graph.contains_node(seed) && visited.insert(seed.clone()) {
            queue.push_back(seed.clone());
        }
    }
    while let Some(key) = queue.pop_front() {
        for next in graph.successors(&key).chain(graph.predecessors(&key)) {
            if visited.insert(next.clone()) {
                queue.push_back(next.clone());
            }
        }
    }
    visited
}

/// Partitions `region` into weakly connected components of the subgraph it
/// induces, ordered by their smallest key.
pub fn weak_components(graph: &DecGraph, region: &BTreeSet<NodeKey>) -> Vec<BTreeSet<NodeKey>> {
    let mut seen: BTreeSet<&NodeKey> = BTreeSet::new();
    let mut components = Vec::new();
    for start in region {
        if !graph.contains_node(start) || !seen.insert(start) {
            continue;
        }
        let mut component = BTreeSet::from([start.clone()]);
        let mut queue = VecDeque::from([start]);
        while let Some(key) = queue.pop_front() {
            for next in graph.successors(key).chain(graph.predecessors(key)) {
                if let Some(next) = region.get(next) {
                    if seen.insert(next) {
                        component.insert(next.clone());
                        queue.push_back(next);
                    }
                }
            }
        }
        components.push(component);
    }
    components
}

/// Returns `true` if a directed path leads from `from` to `to`.
///
/// A node reaches itself.
pub fn reaches(graph: &DecGraph, from: &NodeKey, to: &NodeKey) -> bool {
    if !graph.contains_node(from) || !graph.contains_node(to) {
        return false;
    }
    if from == to {
        return true;
    }
    let mut visited = BTreeSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(key) = queue.pop_front() {
        for next in graph.successors(key) {
            if next == to {
                return true;
            }
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    false
}
