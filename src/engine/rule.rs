//! # Rules and Homomorphisms
//!
//! A rewriting rule is a span of graph homomorphisms
//!
//! ```text
//!        left           right
//!   LHS <---- Preserved ----> RHS
//! ```
//!
//! sharing the preserved core as common source. A non-injective left leg
//! clones nodes; a non-injective right leg merges them; nodes of the core
//! missing from the RHS image are deleted; RHS nodes outside the image are
//! added.
//!
//! Rules are built either directly from a validated span
//! ([`Rule::from_span`]) or compiled from a pattern plus a sequence of
//! edit commands ([`Rule::compile`]).

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::errors::RewriteError;
use crate::engine::graph::{attrs_contained, Attrs, NodeId, TypedGraph};
use crate::frontend::ast::Command;

/// A typed graph homomorphism: a total node mapping that preserves node
/// types, attribute containment, and edges (with edge-attribute
/// containment).
#[derive(Debug, Clone)]
pub struct Homomorphism {
    source: TypedGraph,
    target: TypedGraph,
    mapping: BTreeMap<NodeId, NodeId>,
}

impl Homomorphism {
    /// Builds a homomorphism, validating every preservation condition.
    pub fn new(
        source: TypedGraph,
        target: TypedGraph,
        mapping: BTreeMap<NodeId, NodeId>,
    ) -> Result<Self, RewriteError> {
        for (id, data) in source.nodes() {
            let image = mapping.get(id).ok_or_else(|| {
                RewriteError::Homomorphism(format!("node '{id}' has no image"))
            })?;
            let image_data = target.node(image).ok_or_else(|| {
                RewriteError::Homomorphism(format!(
                    "node '{id}' maps to '{image}', which is not in the target"
                ))
            })?;
            if data.ty != image_data.ty {
                return Err(RewriteError::Homomorphism(format!(
                    "node '{id}' of type '{}' maps to '{image}' of type '{}'",
                    data.ty, image_data.ty
                )));
            }
            if !attrs_contained(&data.attrs, &image_data.attrs) {
                return Err(RewriteError::Homomorphism(format!(
                    "attributes of node '{id}' are not contained in those of '{image}'"
                )));
            }
        }
        for ((u, v), attrs) in source.edges() {
            let (iu, iv) = (&mapping[u], &mapping[v]);
            match target.edge(iu, iv) {
                Some(image_attrs) if attrs_contained(attrs, image_attrs) => {}
                Some(_) => {
                    return Err(RewriteError::Homomorphism(format!(
                        "attributes of edge '{u}'->'{v}' are not contained in those of \
                         '{iu}'->'{iv}'"
                    )))
                }
                None => {
                    return Err(RewriteError::Homomorphism(format!(
                        "edge '{u}'->'{v}' has no image edge '{iu}'->'{iv}'"
                    )))
                }
            }
        }
        Ok(Self {
            source,
            target,
            mapping,
        })
    }

    /// Builds a homomorphism without validation.
    ///
    /// Used by [`Rule::compile`], whose intersection-method merges can
    /// legitimately shrink target attributes below containment.
    pub(crate) fn new_unchecked(
        source: TypedGraph,
        target: TypedGraph,
        mapping: BTreeMap<NodeId, NodeId>,
    ) -> Self {
        Self {
            source,
            target,
            mapping,
        }
    }

    /// The identity homomorphism on `graph`.
    pub fn identity(graph: &TypedGraph) -> Self {
        let mapping = graph
            .nodes()
            .map(|(id, _)| (id.clone(), id.clone()))
            .collect();
        Self {
            source: graph.clone(),
            target: graph.clone(),
            mapping,
        }
    }

    pub fn source(&self) -> &TypedGraph {
        &self.source
    }

    pub fn target(&self) -> &TypedGraph {
        &self.target
    }

    pub fn mapping(&self) -> &BTreeMap<NodeId, NodeId> {
        &self.mapping
    }

    /// The image of a source node, if mapped.
    pub fn image(&self, id: &NodeId) -> Option<&NodeId> {
        self.mapping.get(id)
    }

    /// Whether no two source nodes share an image.
    pub fn is_injective(&self) -> bool {
        let images: BTreeSet<&NodeId> = self.mapping.values().collect();
        images.len() == self.mapping.len()
    }
}

/// A rewriting rule: the span `LHS <- Preserved -> RHS`.
#[derive(Debug, Clone)]
pub struct Rule {
    left: Homomorphism,
    right: Homomorphism,
}

impl Rule {
    /// Builds a rule from two homomorphisms sharing the preserved core.
    pub fn from_span(left: Homomorphism, right: Homomorphism) -> Result<Self, RewriteError> {
        check_span(&left, &right)?;
        Ok(Self { left, right })
    }

    /// The identity rule on `lhs`: matches and changes nothing.
    pub fn identity(lhs: &TypedGraph) -> Self {
        Self {
            left: Homomorphism::identity(lhs),
            right: Homomorphism::identity(lhs),
        }
    }

    /// The preserved core shared by both legs.
    pub fn p(&self) -> &TypedGraph {
        self.left.source()
    }

    /// The pattern matched against the host graph.
    pub fn lhs(&self) -> &TypedGraph {
        self.left.target()
    }

    /// The replacement graph.
    pub fn rhs(&self) -> &TypedGraph {
        self.right.target()
    }

    pub fn left(&self) -> &Homomorphism {
        &self.left
    }

    pub fn right(&self) -> &Homomorphism {
        &self.right
    }

    /// Compiles a command sequence against a pattern into a rule.
    ///
    /// The preserved core and RHS both start as copies of the pattern with
    /// identity legs; each command then edits them:
    ///
    /// - `clone` duplicates the node in the core and the RHS, pointing both
    ///   copies at the one pattern node (the left leg becomes non-injective);
    /// - `merge` collapses RHS nodes, re-pointing the right leg (which
    ///   becomes non-injective);
    /// - `add_node`/`add_edge` extend only the RHS;
    /// - `delete_node`/`delete_edge` shrink the core and the RHS.
    pub fn compile(lhs: &TypedGraph, commands: &[Command]) -> Result<Self, RewriteError> {
        let mut p = lhs.clone();
        let mut rhs = lhs.clone();
        let mut pl: BTreeMap<NodeId, NodeId> = lhs
            .nodes()
            .map(|(id, _)| (id.clone(), id.clone()))
            .collect();
        let mut pr = pl.clone();

        for command in commands {
            match command {
                Command::Clone { node, name } => {
                    let lhs_image = pl
                        .get(node)
                        .ok_or_else(|| {
                            RewriteError::Graph(format!("cannot clone unknown node '{node}'"))
                        })?
                        .clone();
                    let cloned = p.clone_node(node, name.as_deref())?;
                    rhs.clone_node(node, Some(cloned.as_str()))?;
                    pl.insert(cloned.clone(), lhs_image);
                    pr.insert(cloned.clone(), cloned);
                }
                Command::Merge {
                    nodes,
                    method,
                    name,
                    edges_method,
                } => {
                    let merged = rhs.merge_nodes(
                        nodes,
                        method.unwrap_or_default(),
                        name.as_deref(),
                        edges_method.unwrap_or_default(),
                    )?;
                    for image in pr.values_mut() {
                        if nodes.contains(image) {
                            *image = merged.clone();
                        }
                    }
                }
                Command::AddNode { name, ty, attrs } => {
                    let id = match name {
                        Some(n) => NodeId::from(n.as_str()),
                        None => rhs.fresh_id("node"),
                    };
                    rhs.add_node(id, ty.clone().unwrap_or_default(), attrs.clone())?;
                }
                Command::DeleteNode { node } => {
                    let mut known = false;
                    if p.has_node(node) {
                        p.remove_node(node)?;
                        pl.remove(node);
                        known = true;
                    }
                    if rhs.has_node(node) {
                        rhs.remove_node(node)?;
                        known = true;
                    }
                    pr.remove(node);
                    if !known {
                        return Err(RewriteError::Graph(format!(
                            "cannot delete unknown node '{node}'"
                        )));
                    }
                }
                Command::AddEdge { from, to, attrs } => {
                    rhs.add_edge(from, to, attrs.clone())?;
                }
                Command::DeleteEdge { from, to } => {
                    let mut known = false;
                    if p.has_edge(from, to) {
                        p.remove_edge(from, to)?;
                        known = true;
                    }
                    if rhs.has_edge(from, to) {
                        rhs.remove_edge(from, to)?;
                        known = true;
                    }
                    if !known {
                        return Err(RewriteError::Graph(format!(
                            "cannot delete unknown edge '{from}'->'{to}'"
                        )));
                    }
                }
            }
        }

        Ok(Self {
            left: Homomorphism::new_unchecked(p.clone(), lhs.clone(), pl),
            right: Homomorphism::new_unchecked(p, rhs, pr),
        })
    }
}

/// Checks that the two legs agree on the preserved core.
pub fn check_span(left: &Homomorphism, right: &Homomorphism) -> Result<(), RewriteError> {
    let left_nodes: BTreeSet<&NodeId> = left.source().nodes().map(|(id, _)| id).collect();
    let right_nodes: BTreeSet<&NodeId> = right.source().nodes().map(|(id, _)| id).collect();
    if left_nodes != right_nodes {
        return Err(RewriteError::SpanMismatch(
            "the legs disagree on the preserved core's nodes".into(),
        ));
    }
    let left_edges: BTreeSet<&(NodeId, NodeId)> =
        left.source().edges().map(|(k, _)| k).collect();
    let right_edges: BTreeSet<&(NodeId, NodeId)> =
        right.source().edges().map(|(k, _)| k).collect();
    if left_edges != right_edges {
        return Err(RewriteError::SpanMismatch(
            "the legs disagree on the preserved core's edges".into(),
        ));
    }
    Ok(())
}
