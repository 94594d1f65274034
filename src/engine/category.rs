//! # Categorical Constructions
//!
//! The standalone limits and colimits behind rule application: pushout,
//! pullback, and pullback complement over typed attributed graphs. The
//! applier in [`crate::engine::rewrite`] uses a permissive deletion phase;
//! the pullback complement here is the strict counterpart that refuses to
//! delete a node with uncovered incident edges.
//!
//! Node identifiers in constructed graphs are derived from the input
//! identifiers (pair `{b}_{c}` for pullbacks, joined class names for
//! pushouts) and freshened on collision.

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::errors::RewriteError;
use crate::engine::graph::{intersect_attrs, union_attrs, Attrs, NodeId, TypedGraph};
use crate::engine::rule::Homomorphism;

/// Computes the pullback of the cospan `B -> D <- C`.
///
/// Returns the apex `A` together with its projections `A -> B` and
/// `A -> C`. `A` has one node per pair of `B`/`C` nodes sharing a `D`
/// image, carrying the intersection of the pair's attributes, and an edge
/// wherever both projections have one.
pub fn pullback(
    b_to_d: &Homomorphism,
    c_to_d: &Homomorphism,
) -> Result<(TypedGraph, Homomorphism, Homomorphism), RewriteError> {
    if b_to_d.target() != c_to_d.target() {
        return Err(RewriteError::SpanMismatch(
            "pullback legs target different graphs".into(),
        ));
    }

    let b = b_to_d.source();
    let c = c_to_d.source();
    let mut apex = TypedGraph::new();
    let mut to_b: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut to_c: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    // Pair identity, for the edge pass below.
    let mut pairs: Vec<(NodeId, NodeId, NodeId)> = Vec::new();

    for (bn, bd) in b.nodes() {
        for (cn, cd) in c.nodes() {
            if b_to_d.image(bn) != c_to_d.image(cn) {
                continue;
            }
            let id = apex.fresh_id(&format!("{bn}_{cn}"));
            let id = apex.add_node(id, bd.ty.clone(), intersect_attrs(&bd.attrs, &cd.attrs))?;
            to_b.insert(id.clone(), bn.clone());
            to_c.insert(id.clone(), cn.clone());
            pairs.push((id, bn.clone(), cn.clone()));
        }
    }

    for (a1, b1, c1) in &pairs {
        for (a2, b2, c2) in &pairs {
            let (Some(b_attrs), Some(c_attrs)) = (b.edge(b1, b2), c.edge(c1, c2)) else {
                continue;
            };
            apex.add_edge(a1, a2, intersect_attrs(b_attrs, c_attrs))?;
        }
    }

    let left = Homomorphism::new(apex.clone(), b.clone(), to_b)?;
    let right = Homomorphism::new(apex.clone(), c.clone(), to_c)?;
    Ok((apex, left, right))
}

/// Computes the pushout of the span `L <- P -> R`.
///
/// Returns the colimit `G` together with the injections `L -> G` and
/// `R -> G`. Nodes of `L` and `R` sharing a `P` preimage are identified;
/// each identified class carries the union of its members' attributes.
pub fn pushout(
    p_to_l: &Homomorphism,
    p_to_r: &Homomorphism,
) -> Result<(TypedGraph, Homomorphism, Homomorphism), RewriteError> {
    if p_to_l.source() != p_to_r.source() {
        return Err(RewriteError::SpanMismatch(
            "pushout legs start from different graphs".into(),
        ));
    }

    let l = p_to_l.target();
    let r = p_to_r.target();

    // Tag every L and R node, then glue along the shared source.
    let mut uf = UnionFind::default();
    let mut index: BTreeMap<(Side, NodeId), usize> = BTreeMap::new();
    for (n, _) in l.nodes() {
        let id = uf.make_set();
        index.insert((Side::Left, n.clone()), id);
    }
    for (n, _) in r.nodes() {
        let id = uf.make_set();
        index.insert((Side::Right, n.clone()), id);
    }
    for (p, _) in p_to_l.source().nodes() {
        let (li, ri) = match (p_to_l.image(p), p_to_r.image(p)) {
            (Some(li), Some(ri)) => (li, ri),
            _ => {
                return Err(RewriteError::Homomorphism(format!(
                    "node '{p}' is unmapped by one of the legs"
                )))
            }
        };
        uf.union(
            index[&(Side::Left, li.clone())],
            index[&(Side::Right, ri.clone())],
        );
    }

    // One colimit node per class, named after its members.
    let mut classes: BTreeMap<usize, Vec<&(Side, NodeId)>> = BTreeMap::new();
    for (key, id) in &index {
        classes.entry(uf.find(*id)).or_default().push(key);
    }
    let mut colimit = TypedGraph::new();
    let mut placement: BTreeMap<(Side, NodeId), NodeId> = BTreeMap::new();
    for members in classes.values() {
        let names: BTreeSet<&str> = members.iter().map(|(_, n)| n.as_str()).collect();
        let base = names.into_iter().collect::<Vec<_>>().join("_");
        let mut ty: Option<String> = None;
        let mut attrs = Attrs::new();
        for (side, n) in members.iter() {
            let graph = match side {
                Side::Left => l,
                Side::Right => r,
            };
            let data = graph.node(n).ok_or_else(|| {
                RewriteError::Internal(format!("pushout member '{n}' vanished"))
            })?;
            ty.get_or_insert_with(|| data.ty.clone());
            attrs = union_attrs(&attrs, &data.attrs);
        }
        let id = colimit.fresh_id(&base);
        let id = colimit.add_node(id, ty.unwrap_or_default(), attrs)?;
        for member in members {
            placement.insert((*member).clone(), id.clone());
        }
    }

    // Project both edge sets, unioning attributes on collision.
    for (side, graph) in [(Side::Left, l), (Side::Right, r)] {
        for ((u, v), attrs) in graph.edges() {
            let gu = placement[&(side, u.clone())].clone();
            let gv = placement[&(side, v.clone())].clone();
            match colimit.edge(&gu, &gv) {
                Some(existing) => {
                    let combined = union_attrs(existing, attrs);
                    colimit.update_edge_attrs(&gu, &gv, &combined)?;
                }
                None => colimit.add_edge(&gu, &gv, attrs.clone())?,
            }
        }
    }

    let left_mapping = l
        .nodes()
        .map(|(n, _)| (n.clone(), placement[&(Side::Left, n.clone())].clone()))
        .collect();
    let right_mapping = r
        .nodes()
        .map(|(n, _)| (n.clone(), placement[&(Side::Right, n.clone())].clone()))
        .collect();
    let left = Homomorphism::new(l.clone(), colimit.clone(), left_mapping)?;
    let right = Homomorphism::new(r.clone(), colimit.clone(), right_mapping)?;
    Ok((colimit, left, right))
}

/// Computes the final pullback complement of `A -> B -> D`.
///
/// Returns `C` with `A -> C` and the inclusion `C -> D`, where `C` is `D`
/// minus the image of everything in `B` outside the image of `A`. Both
/// input homomorphisms must be injective, and the removal must not leave a
/// dangling edge; otherwise no complement exists and
/// [`RewriteError::NoComplement`] is returned.
pub fn pullback_complement(
    a_to_b: &Homomorphism,
    b_to_d: &Homomorphism,
) -> Result<(TypedGraph, Homomorphism, Homomorphism), RewriteError> {
    if a_to_b.target() != b_to_d.source() {
        return Err(RewriteError::SpanMismatch(
            "composition mismatch between the two homomorphisms".into(),
        ));
    }
    if !a_to_b.is_injective() || !b_to_d.is_injective() {
        return Err(RewriteError::NoComplement(
            "both homomorphisms must be injective".into(),
        ));
    }

    let b = a_to_b.target();
    let d = b_to_d.target();

    let a_image: BTreeSet<&NodeId> = a_to_b.mapping().values().collect();
    let mut removed_nodes: BTreeSet<NodeId> = BTreeSet::new();
    for (bn, _) in b.nodes() {
        if a_image.contains(bn) {
            continue;
        }
        let dn = b_to_d.image(bn).ok_or_else(|| {
            RewriteError::Homomorphism(format!("node '{bn}' has no image in the cospan target"))
        })?;
        removed_nodes.insert(dn.clone());
    }

    // A preserved B edge is one covered by an A edge.
    let a_edge_images: BTreeSet<(NodeId, NodeId)> = a_to_b
        .source()
        .edges()
        .filter_map(|((u, v), _)| {
            match (a_to_b.image(u), a_to_b.image(v)) {
                (Some(bu), Some(bv)) => Some((bu.clone(), bv.clone())),
                _ => None,
            }
        })
        .collect();
    let mut removed_edges: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    for ((bu, bv), _) in b.edges() {
        if a_edge_images.contains(&(bu.clone(), bv.clone())) {
            continue;
        }
        match (b_to_d.image(bu), b_to_d.image(bv)) {
            (Some(du), Some(dv)) => {
                removed_edges.insert((du.clone(), dv.clone()));
            }
            _ => {
                return Err(RewriteError::Homomorphism(format!(
                    "edge '{bu}'->'{bv}' has no image in the cospan target"
                )))
            }
        }
    }

    // Strict deletion: every edge incident to a removed node must itself
    // be covered by a removed B edge.
    for ((du, dv), _) in d.edges() {
        let incident = removed_nodes.contains(du) || removed_nodes.contains(dv);
        if incident && !removed_edges.contains(&(du.clone(), dv.clone())) {
            return Err(RewriteError::NoComplement(format!(
                "removing a node would leave edge '{du}'->'{dv}' dangling"
            )));
        }
    }

    let mut complement = TypedGraph::new();
    for (dn, data) in d.nodes() {
        if !removed_nodes.contains(dn) {
            complement.add_node(dn.clone(), data.ty.clone(), data.attrs.clone())?;
        }
    }
    for ((du, dv), attrs) in d.edges() {
        if removed_nodes.contains(du)
            || removed_nodes.contains(dv)
            || removed_edges.contains(&(du.clone(), dv.clone()))
        {
            continue;
        }
        complement.add_edge(du, dv, attrs.clone())?;
    }

    let a_mapping = a_to_b
        .mapping()
        .iter()
        .map(|(a, bn)| {
            b_to_d
                .image(bn)
                .cloned()
                .map(|dn| (a.clone(), dn))
                .ok_or_else(|| {
                    RewriteError::Homomorphism(format!(
                        "node '{bn}' has no image in the cospan target"
                    ))
                })
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    let inclusion_mapping = complement
        .nodes()
        .map(|(n, _)| (n.clone(), n.clone()))
        .collect();

    let into_complement = Homomorphism::new(a_to_b.source().clone(), complement.clone(), a_mapping)?;
    let inclusion = Homomorphism::new(complement.clone(), d.clone(), inclusion_mapping)?;
    Ok((complement, into_complement, inclusion))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Left,
    Right,
}

/// Forest-based union-find over dense indices.
#[derive(Debug, Default)]
struct UnionFind {
    parents: Vec<usize>,
}

impl UnionFind {
    fn make_set(&mut self) -> usize {
        let id = self.parents.len();
        self.parents.push(id);
        id
    }

    fn find(&self, mut current: usize) -> usize {
        while self.parents[current] != current {
            current = self.parents[current];
        }
        current
    }

    fn union(&mut self, a: usize, b: usize) -> usize {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parents[rb] = ra;
        }
        ra
    }
}
