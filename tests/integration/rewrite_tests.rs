use regraft::{
    apply_rule, compile_rule, find_matching, parse_commands, transform_instance, AttrValue,
    Attrs, Instance, NodeId, TypedGraph,
};

fn node(g: &mut TypedGraph, id: &str, ty: &str) {
    g.add_node(id, ty, Attrs::new()).unwrap();
}

fn edge(g: &mut TypedGraph, from: &str, to: &str) {
    g.add_edge(&from.into(), &to.into(), Attrs::new()).unwrap();
}

fn attrs(pairs: &[(&str, AttrValue)]) -> Attrs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn instance(pairs: &[(&str, &str)]) -> Instance {
    pairs
        .iter()
        .map(|(p, h)| (NodeId::from(*p), NodeId::from(*h)))
        .collect()
}

/// A small social graph used across tests.
fn social() -> TypedGraph {
    let mut g = TypedGraph::new();
    g.add_node(
        "alice",
        "Person",
        attrs(&[("age", AttrValue::Int(34))]),
    )
    .unwrap();
    g.add_node("bob", "Person", attrs(&[("age", AttrValue::Int(41))]))
        .unwrap();
    node(&mut g, "acme", "Org");
    g.add_edge(
        &"alice".into(),
        &"acme".into(),
        attrs(&[("role", AttrValue::Str("dev".into()))]),
    )
    .unwrap();
    g.add_edge(
        &"bob".into(),
        &"acme".into(),
        attrs(&[("role", AttrValue::Str("ops".into()))]),
    )
    .unwrap();
    edge(&mut g, "alice", "bob");
    g
}

#[test]
fn end_to_end_clone_via_matching() {
    let mut g = social();
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "Org");
    let rule = compile_rule(&pattern, "clone p as mirror").unwrap();

    let instances = find_matching(rule.lhs(), &g);
    assert_eq!(instances.len(), 1);
    let out = apply_rule(&mut g, &instances[0], &rule).unwrap();

    let mirror = &out[&NodeId::from("mirror")];
    assert_eq!(g.node_count(), 4);
    // The copy inherits both membership edges with their attributes.
    assert_eq!(
        g.edge(&"alice".into(), mirror).unwrap().get("role"),
        Some(&AttrValue::Str("dev".into()))
    );
    assert_eq!(
        g.edge(&"bob".into(), mirror).unwrap().get("role"),
        Some(&AttrValue::Str("ops".into()))
    );
}

#[test]
fn end_to_end_merge_collapses_parallel_edges() {
    let mut g = social();
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "Person");
    node(&mut pattern, "q", "Person");
    let rule = compile_rule(&pattern, "merge [p, q] as person").unwrap();

    let out = apply_rule(&mut g, &instance(&[("p", "alice"), ("q", "bob")]), &rule).unwrap();
    let merged = &out[&NodeId::from("person")];

    assert_eq!(g.node_count(), 2);
    // Ages differ, so the merged value is a normalized set.
    assert_eq!(
        g.node(merged).unwrap().attrs.get("age"),
        Some(&AttrValue::set(["34", "41"]))
    );
    // The two membership edges collapse into one; union keeps both roles.
    assert_eq!(
        g.edge(merged, &"acme".into()).unwrap().get("role"),
        Some(&AttrValue::set(["dev", "ops"]))
    );
    // alice -> bob becomes a self-loop on the merged node.
    assert!(g.has_edge(merged, merged));
}

#[test]
fn delete_then_add_reuses_the_freed_identifier_space() {
    let mut g = social();
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "Person");
    let rule = compile_rule(
        &pattern,
        "delete_node p\nadd_node successor type Person {age: 0}",
    )
    .unwrap();

    let out = apply_rule(&mut g, &instance(&[("p", "alice")]), &rule).unwrap();
    assert!(!g.has_node(&"alice".into()));
    // alice's edges went with her.
    assert!(!g.has_edge(&"successor".into(), &"acme".into()));
    assert_eq!(out[&NodeId::from("successor")].as_str(), "successor");
    assert_eq!(
        g.node(&"successor".into()).unwrap().attrs.get("age"),
        Some(&AttrValue::Int(0))
    );
}

#[test]
fn repeated_application_drains_all_matches() {
    let mut g = social();
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "Person");
    node(&mut pattern, "q", "Person");
    let rule = compile_rule(&pattern, "merge [p, q]").unwrap();

    // One merge leaves a single Person, so the pattern stops matching.
    let instances = find_matching(rule.lhs(), &g);
    assert_eq!(instances.len(), 2);
    apply_rule(&mut g, &instances[0], &rule).unwrap();
    assert!(find_matching(rule.lhs(), &g).is_empty());
}

#[test]
fn merge_edges_method_intersection_drops_disagreeing_attrs() {
    let mut g = social();
    let commands =
        parse_commands("merge [p, q] method intersection as person edges intersection").unwrap();
    transform_instance(
        &mut g,
        &instance(&[("p", "alice"), ("q", "bob")]),
        &commands,
    )
    .unwrap();

    // Roles disagree and intersect to nothing, so the key disappears.
    let membership = g.edge(&"person".into(), &"acme".into()).unwrap();
    assert_eq!(membership.get("role"), None);
    // Ages disagree too; intersection drops the node attribute as well.
    assert_eq!(g.node(&"person".into()).unwrap().attrs.get("age"), None);
}

#[test]
fn rule_reuse_across_disjoint_matches() {
    let mut g = TypedGraph::new();
    for id in ["a1", "a2", "b1", "b2"] {
        node(&mut g, id, "T");
    }
    edge(&mut g, "a1", "a2");
    edge(&mut g, "b1", "b2");

    let mut pattern = TypedGraph::new();
    node(&mut pattern, "x", "T");
    node(&mut pattern, "y", "T");
    edge(&mut pattern, "x", "y");
    let rule = compile_rule(&pattern, "delete_edge x y\nadd_edge y x").unwrap();

    for inst in [
        instance(&[("x", "a1"), ("y", "a2")]),
        instance(&[("x", "b1"), ("y", "b2")]),
    ] {
        apply_rule(&mut g, &inst, &rule).unwrap();
    }
    assert!(g.has_edge(&"a2".into(), &"a1".into()));
    assert!(g.has_edge(&"b2".into(), &"b1".into()));
    assert!(!g.has_edge(&"a1".into(), &"a2".into()));
    assert!(!g.has_edge(&"b1".into(), &"b2".into()));
}

#[test]
fn rhs_instance_covers_every_rhs_node() {
    let mut g = social();
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "Person");
    let rule = compile_rule(
        &pattern,
        "clone p as twin\nadd_node observer type Person\nadd_edge observer p",
    )
    .unwrap();

    let out = apply_rule(&mut g, &instance(&[("p", "alice")]), &rule).unwrap();
    for (r, _) in rule.rhs().nodes() {
        let placed = &out[r];
        assert!(g.has_node(placed), "rhs node '{r}' placed at missing '{placed}'");
    }
    assert_eq!(out.len(), rule.rhs().node_count());
}

#[test]
fn failed_application_leaves_the_graph_intact() {
    let mut g = social();
    let before = g.clone();
    let mut pattern = TypedGraph::new();
    node(&mut pattern, "p", "Org");
    let rule = compile_rule(&pattern, "delete_node p").unwrap();

    // Wrong type at the matched node.
    let err = apply_rule(&mut g, &instance(&[("p", "alice")]), &rule);
    assert!(err.is_err());
    assert_eq!(g, before);
}
