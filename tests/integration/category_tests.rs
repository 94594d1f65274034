use regraft::engine::category::{pullback, pullback_complement, pushout};
use regraft::storage::cypher::pullback_queries;
use regraft::{Attrs, Homomorphism, NodeId, RewriteError, TypedGraph};

fn graph(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> TypedGraph {
    let mut g = TypedGraph::new();
    for (id, ty) in nodes {
        g.add_node(*id, *ty, Attrs::new()).unwrap();
    }
    for (u, v) in edges {
        g.add_edge(&(*u).into(), &(*v).into(), Attrs::new()).unwrap();
    }
    g
}

fn hom(source: &TypedGraph, target: &TypedGraph, pairs: &[(&str, &str)]) -> Homomorphism {
    let mapping = pairs
        .iter()
        .map(|(s, t)| (NodeId::from(*s), NodeId::from(*t)))
        .collect();
    Homomorphism::new(source.clone(), target.clone(), mapping).unwrap()
}

#[test]
fn pullback_of_two_typed_graphs_over_a_type_graph() {
    // Type graph: agent -> resource. Two instance graphs typed by it.
    let types = graph(&[("agent", "M"), ("resource", "M")], &[("agent", "resource")]);
    let left = graph(
        &[("a1", "M"), ("a2", "M"), ("r", "M")],
        &[("a1", "r"), ("a2", "r")],
    );
    let right = graph(&[("a", "M"), ("r1", "M"), ("r2", "M")], &[("a", "r1")]);
    let lt = hom(
        &left,
        &types,
        &[("a1", "agent"), ("a2", "agent"), ("r", "resource")],
    );
    let rt = hom(
        &right,
        &types,
        &[("a", "agent"), ("r1", "resource"), ("r2", "resource")],
    );

    let (apex, to_left, to_right) = pullback(&lt, &rt).unwrap();
    // 2 agent pairs and 2 resource pairs.
    assert_eq!(apex.node_count(), 4);
    // Edges exist only where both sides have one: a1-r and a2-r on the
    // left, a-r1 on the right, giving two apex edges.
    assert_eq!(apex.edge_count(), 2);
    assert!(apex.has_edge(&"a1_a".into(), &"r_r1".into()));
    assert!(apex.has_edge(&"a2_a".into(), &"r_r1".into()));
    assert_eq!(to_left.image(&"a1_a".into()), Some(&"a1".into()));
    assert_eq!(to_right.image(&"a1_a".into()), Some(&"a".into()));
}

#[test]
fn pushout_then_projections_commute_with_the_span() {
    let p = graph(&[("shared", "T")], &[]);
    let l = graph(&[("shared", "T"), ("only_l", "T")], &[("only_l", "shared")]);
    let r = graph(&[("shared", "T"), ("only_r", "T")], &[("shared", "only_r")]);
    let pl = hom(&p, &l, &[("shared", "shared")]);
    let pr = hom(&p, &r, &[("shared", "shared")]);

    let (colimit, to_g_l, to_g_r) = pushout(&pl, &pr).unwrap();
    assert_eq!(colimit.node_count(), 3);
    assert_eq!(colimit.edge_count(), 2);
    // The square commutes on the shared node.
    for (n, _) in p.nodes() {
        let via_l = to_g_l.image(pl.image(n).unwrap()).unwrap();
        let via_r = to_g_r.image(pr.image(n).unwrap()).unwrap();
        assert_eq!(via_l, via_r);
    }
}

#[test]
fn pullback_complement_then_pushout_restores_the_host() {
    // Deleting nothing: A = B, so the complement is all of D and pushing
    // out along it rebuilds a graph of the same shape.
    let b = graph(&[("x", "T")], &[]);
    let d = graph(&[("x", "T"), ("n", "T")], &[("x", "n")]);
    let ab = hom(&b, &b, &[("x", "x")]);
    let bd = hom(&b, &d, &[("x", "x")]);

    let (complement, a_to_c, _) = pullback_complement(&ab, &bd).unwrap();
    assert_eq!(complement.node_count(), 2);
    assert_eq!(complement.edge_count(), 1);

    let (rebuilt, _, _) = pushout(&a_to_c, &ab).unwrap();
    assert_eq!(rebuilt.node_count(), d.node_count());
    assert_eq!(rebuilt.edge_count(), d.edge_count());
}

#[test]
fn strict_deletion_refuses_what_the_applier_would_allow() {
    // The applier's permissive phase would drop the incident edge; the
    // categorical construction refuses instead.
    let a = graph(&[], &[]);
    let b = graph(&[("x", "T")], &[]);
    let d = graph(&[("x", "T"), ("n", "T")], &[("n", "x")]);
    let ab = Homomorphism::new(a, b.clone(), Default::default()).unwrap();
    let bd = hom(&b, &d, &[("x", "x")]);

    let err = pullback_complement(&ab, &bd).unwrap_err();
    assert!(matches!(err, RewriteError::NoComplement(_)));
}

#[test]
fn cypher_fragments_come_in_fixed_order() {
    let q = pullback_queries("action_graph", "nugget", "meta_model", None);
    assert!(q
        .create_nodes
        .starts_with("OPTIONAL MATCH (n:action_graph)-[:typing]->(:meta_model)<-[:typing]-(m:nugget)"));
    assert!(q
        .create_nodes
        .contains("CREATE (new_node_a:pb_action_graph_nugget_meta_model)"));
    // Node fragment first: the edge fragment joins over typing edges the
    // node fragment creates.
    assert!(q.create_edges.starts_with("MATCH (x:pb_action_graph_nugget_meta_model)"));
    assert!(q.create_edges.trim_end().ends_with("SET r += new_props"));
}
