use std::collections::BTreeMap;

use regraft::{find_matching, AttrValue, Attrs, Instance, NodeId, TypedGraph};

fn node(g: &mut TypedGraph, id: &str, ty: &str) {
    g.add_node(id, ty, Attrs::new()).unwrap();
}

fn edge(g: &mut TypedGraph, from: &str, to: &str) {
    g.add_edge(&from.into(), &to.into(), Attrs::new()).unwrap();
}

/// Reference matcher: all injective node mappings, checked the slow way.
fn brute_force(pattern: &TypedGraph, target: &TypedGraph) -> Vec<Instance> {
    let pattern_nodes: Vec<NodeId> = pattern.nodes().map(|(id, _)| id.clone()).collect();
    let target_nodes: Vec<NodeId> = target.nodes().map(|(id, _)| id.clone()).collect();
    let mut found = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    assign(
        pattern,
        target,
        &pattern_nodes,
        &target_nodes,
        &mut current,
        &mut found,
    );
    found.sort();
    found
}

fn assign(
    pattern: &TypedGraph,
    target: &TypedGraph,
    pattern_nodes: &[NodeId],
    target_nodes: &[NodeId],
    current: &mut Vec<NodeId>,
    found: &mut Vec<Instance>,
) {
    if current.len() == pattern_nodes.len() {
        let mapping: Instance = pattern_nodes
            .iter()
            .cloned()
            .zip(current.iter().cloned())
            .collect();
        if is_valid(pattern, target, &mapping) {
            found.push(mapping);
        }
        return;
    }
    for candidate in target_nodes {
        if current.contains(candidate) {
            continue;
        }
        current.push(candidate.clone());
        assign(pattern, target, pattern_nodes, target_nodes, current, found);
        current.pop();
    }
}

fn is_valid(pattern: &TypedGraph, target: &TypedGraph, mapping: &BTreeMap<NodeId, NodeId>) -> bool {
    for (p, t) in mapping {
        let pd = pattern.node(p).unwrap();
        let td = target.node(t).unwrap();
        if pd.ty != td.ty {
            return false;
        }
        if !pd.attrs.iter().all(|(k, v)| {
            td.attrs
                .get(k)
                .is_some_and(|other| v.contained_in(other))
        }) {
            return false;
        }
    }
    for ((u, v), attrs) in pattern.edges() {
        match target.edge(&mapping[u], &mapping[v]) {
            Some(target_attrs) => {
                if !attrs.iter().all(|(k, value)| {
                    target_attrs
                        .get(k)
                        .is_some_and(|other| value.contained_in(other))
                }) {
                    return false;
                }
            }
            None => return false,
        }
    }
    true
}

#[test]
fn matcher_agrees_with_brute_force_enumeration() {
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "T");
    node(&mut pattern, "q", "T");
    edge(&mut pattern, "p", "q");

    // A diamond with a tail and one off-type node.
    let mut target = TypedGraph::new();
    for id in ["a", "b", "c", "d", "e"] {
        node(&mut target, id, "T");
    }
    node(&mut target, "u", "U");
    edge(&mut target, "a", "b");
    edge(&mut target, "a", "c");
    edge(&mut target, "b", "d");
    edge(&mut target, "c", "d");
    edge(&mut target, "d", "e");
    edge(&mut target, "u", "a");

    let mut found = find_matching(&pattern, &target);
    found.sort();
    assert_eq!(found, brute_force(&pattern, &target));
    assert_eq!(found.len(), 5);
}

#[test]
fn triangle_pattern_finds_all_rotations() {
    let mut pattern = TypedGraph::new();
    for id in ["p", "q", "r"] {
        node(&mut pattern, id, "T");
    }
    edge(&mut pattern, "p", "q");
    edge(&mut pattern, "q", "r");
    edge(&mut pattern, "r", "p");

    let mut target = TypedGraph::new();
    for id in ["a", "b", "c"] {
        node(&mut target, id, "T");
    }
    edge(&mut target, "a", "b");
    edge(&mut target, "b", "c");
    edge(&mut target, "c", "a");

    // A directed triangle matched against itself has three rotations.
    let found = find_matching(&pattern, &target);
    assert_eq!(found.len(), 3);
    let mut sorted = found.clone();
    sorted.sort();
    assert_eq!(sorted, brute_force(&pattern, &target));
}

#[test]
fn isolated_pattern_node_matches_connected_target_nodes() {
    // The pattern places no edge requirement, so a well-connected target
    // node is still a match for an isolated pattern node.
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "T");

    let mut target = TypedGraph::new();
    node(&mut target, "hub", "T");
    node(&mut target, "spoke", "T");
    edge(&mut target, "hub", "spoke");
    edge(&mut target, "spoke", "hub");

    assert_eq!(find_matching(&pattern, &target).len(), 2);
}

#[test]
fn scalar_attrs_require_equality_sets_require_subset() {
    let mut pattern = TypedGraph::new();
    let mut attrs = Attrs::new();
    attrs.insert("n".into(), AttrValue::Int(5));
    attrs.insert("tags".into(), AttrValue::set(["a"]));
    pattern.add_node("p", "T", attrs).unwrap();

    let mut target = TypedGraph::new();
    let mut good = Attrs::new();
    good.insert("n".into(), AttrValue::Int(5));
    good.insert("tags".into(), AttrValue::set(["a", "b"]));
    good.insert("extra".into(), AttrValue::Bool(true));
    target.add_node("good", "T", good).unwrap();
    let mut bad = Attrs::new();
    bad.insert("n".into(), AttrValue::Int(6));
    bad.insert("tags".into(), AttrValue::set(["a", "b"]));
    target.add_node("bad", "T", bad).unwrap();

    let found = find_matching(&pattern, &target);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0][&NodeId::from("p")].as_str(), "good");
}

#[test]
fn no_matches_when_the_pattern_is_larger_than_the_target() {
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "T");
    node(&mut pattern, "q", "T");
    let mut target = TypedGraph::new();
    node(&mut target, "a", "T");
    assert!(find_matching(&pattern, &target).is_empty());
}

#[test]
fn self_loop_pattern_only_matches_self_loops() {
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "T");
    edge(&mut pattern, "p", "p");

    let mut target = TypedGraph::new();
    node(&mut target, "looped", "T");
    node(&mut target, "plain", "T");
    edge(&mut target, "looped", "looped");
    edge(&mut target, "looped", "plain");

    let found = find_matching(&pattern, &target);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0][&NodeId::from("p")].as_str(), "looped");
}
