//! # Pattern Matching
//!
//! Finds occurrences of a pattern graph inside a target graph. A match is
//! an injective node mapping that preserves types, attribute containment,
//! and every pattern edge. Extra target edges between matched nodes are
//! allowed; matching is against edge subsets, not induced subgraphs, so a
//! single-node pattern matches every node of compatible type.
//!
//! The search is exhaustive: candidate filtering by type and attributes,
//! then enumeration of node subsets and their bijections. This is
//! exponential in pattern size, which is acceptable for the small hand
//! written patterns rules use in practice.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::engine::graph::{attrs_contained, NodeId, TypedGraph};

/// A match of a pattern in a target graph: pattern node id to target node
/// id. Deterministically ordered.
pub type Instance = BTreeMap<NodeId, NodeId>;

/// Returns every match of `pattern` in `target`, in a deterministic order.
///
/// The empty pattern matches once, with an empty instance.
pub fn find_matching(pattern: &TypedGraph, target: &TypedGraph) -> Vec<Instance> {
    if pattern.node_count() == 0 {
        return vec![Instance::new()];
    }

    // A target node is a candidate if it could carry at least one pattern
    // node; everything else can never appear in a match.
    let pattern_types: FxHashSet<&str> = pattern.nodes().map(|(_, d)| d.ty.as_str()).collect();
    let candidates: Vec<&NodeId> = target
        .nodes()
        .filter(|(_, data)| {
            pattern_types.contains(data.ty.as_str())
                && pattern
                    .nodes()
                    .any(|(_, p)| p.ty == data.ty && attrs_contained(&p.attrs, &data.attrs))
        })
        .map(|(id, _)| id)
        .collect();
    if candidates.len() < pattern.node_count() {
        return Vec::new();
    }

    // Restrict the search to the induced subgraph on the candidates; edges
    // between candidate nodes are unchanged by the restriction.
    let kept: BTreeSet<NodeId> = candidates.iter().map(|id| (*id).clone()).collect();
    let restricted = target.subgraph(&kept);

    let pattern_nodes: Vec<&NodeId> = pattern.nodes().map(|(id, _)| id).collect();
    let mut instances = Vec::new();
    for subset in candidates.iter().combinations(pattern_nodes.len()) {
        for assignment in subset.iter().permutations(subset.len()) {
            let mapping: Instance = pattern_nodes
                .iter()
                .zip(assignment)
                .map(|(p, t)| ((*p).clone(), (***t).clone()))
                .collect();
            if is_match(pattern, &restricted, &mapping) {
                instances.push(mapping);
            }
        }
    }
    instances
}

/// Checks whether `mapping` is a valid match of `pattern` in `target`.
pub(crate) fn is_match(pattern: &TypedGraph, target: &TypedGraph, mapping: &Instance) -> bool {
    for (p, t) in mapping {
        let (Some(pd), Some(td)) = (pattern.node(p), target.node(t)) else {
            return false;
        };
        if pd.ty != td.ty || !attrs_contained(&pd.attrs, &td.attrs) {
            return false;
        }
    }
    for ((u, v), pattern_attrs) in pattern.edges() {
        let (Some(tu), Some(tv)) = (mapping.get(u), mapping.get(v)) else {
            return false;
        };
        match target.edge(tu, tv) {
            Some(target_attrs) if attrs_contained(pattern_attrs, target_attrs) => {}
            _ => return false,
        }
    }
    true
}
