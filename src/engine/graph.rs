//! # Typed Attributed Graph
//!
//! The core data model: directed graphs whose nodes carry an immutable type
//! tag and a string-keyed attribute map, and whose edges (at most one per
//! ordered node pair) carry an attribute map of their own.
//!
//! Attribute comparison throughout the crate is *containment*: `a` matches
//! `b` iff every key of `a` is present in `b` with an equal scalar value,
//! or — for set-valued attributes — a superset.
//!
//! ## Invariants
//!
//! - Every edge endpoint is a node in the same graph.
//! - Node identifiers are unique within a graph.
//! - A node's type never changes after creation; cloning and merging mint
//!   fresh identifiers, they do not retype.
//!
//! All mutators return `Result` and reject operations that would break the
//! invariants. Node and edge storage is ordered (`BTreeMap`) so iteration
//! order is deterministic, which keeps matching and rewriting reproducible.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::engine::errors::RewriteError;

/// A node identifier, unique within its graph.
///
/// Identifiers are names rather than dense indices: cloning and merging
/// derive fresh names from existing ones (`n_copy`, `a_b`), and rule
/// commands refer to pattern nodes by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(String);

impl NodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An attribute value: a scalar or a set of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Set(BTreeSet<String>),
}

impl AttrValue {
    /// Builds a set value from string elements.
    pub fn set<I, S>(elems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Set(elems.into_iter().map(Into::into).collect())
    }

    /// Containment test: scalars must be equal; a set is contained in a
    /// superset. A scalar is never contained in a set or vice versa.
    pub fn contained_in(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::Set(a), AttrValue::Set(b)) => a.is_subset(b),
            (a, b) => a == b,
        }
    }

    /// Renders the value as a set of strings, for merge policies that
    /// combine scalar and set values.
    fn to_set(&self) -> BTreeSet<String> {
        match self {
            AttrValue::Str(s) => BTreeSet::from([s.clone()]),
            AttrValue::Int(i) => BTreeSet::from([i.to_string()]),
            AttrValue::Bool(b) => BTreeSet::from([b.to_string()]),
            AttrValue::Set(s) => s.clone(),
        }
    }

    /// Combines two values under the union policy.
    ///
    /// Equal values stay as they are; differing values are normalized to
    /// string sets and unioned.
    pub fn union(&self, other: &AttrValue) -> AttrValue {
        if self == other {
            return self.clone();
        }
        let mut set = self.to_set();
        set.extend(other.to_set());
        AttrValue::Set(set)
    }

    /// Combines two values under the intersection policy.
    ///
    /// Returns `None` when nothing is shared, in which case the key is
    /// dropped from the merged map.
    pub fn intersection(&self, other: &AttrValue) -> Option<AttrValue> {
        if self == other {
            return Some(self.clone());
        }
        let a = self.to_set();
        let b = other.to_set();
        let shared: BTreeSet<String> = a.intersection(&b).cloned().collect();
        if shared.is_empty() {
            None
        } else {
            Some(AttrValue::Set(shared))
        }
    }
}

/// A string-keyed attribute map.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Subdict containment: every key of `sub` is present in `sup` with a
/// contained value.
pub fn attrs_contained(sub: &Attrs, sup: &Attrs) -> bool {
    sub.iter()
        .all(|(k, v)| sup.get(k).is_some_and(|sv| v.contained_in(sv)))
}

/// Key-wise union of two attribute maps.
pub fn union_attrs(a: &Attrs, b: &Attrs) -> Attrs {
    let mut out = a.clone();
    for (k, v) in b {
        match out.get(k) {
            Some(existing) => {
                let merged = existing.union(v);
                out.insert(k.clone(), merged);
            }
            None => {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    out
}

/// Key-wise intersection of two attribute maps.
///
/// Keys present in only one map, or whose values share nothing, are dropped.
pub fn intersect_attrs(a: &Attrs, b: &Attrs) -> Attrs {
    let mut out = Attrs::new();
    for (k, v) in a {
        if let Some(other) = b.get(k) {
            if let Some(shared) = v.intersection(other) {
                out.insert(k.clone(), shared);
            }
        }
    }
    out
}

/// Policy for combining attribute maps when nodes (or duplicate edges) are
/// merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrMergeMethod {
    #[default]
    Union,
    Intersection,
}

impl AttrMergeMethod {
    fn combine(self, a: &Attrs, b: &Attrs) -> Attrs {
        match self {
            AttrMergeMethod::Union => union_attrs(a, b),
            AttrMergeMethod::Intersection => intersect_attrs(a, b),
        }
    }
}

impl FromStr for AttrMergeMethod {
    type Err = RewriteError;

    fn from_str(s: &str) -> Result<Self, RewriteError> {
        match s {
            "union" => Ok(AttrMergeMethod::Union),
            "intersection" => Ok(AttrMergeMethod::Intersection),
            other => Err(RewriteError::Graph(format!(
                "unknown merge method '{other}' (expected 'union' or 'intersection')"
            ))),
        }
    }
}

/// A node's payload: an immutable type tag and an attribute map.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeData {
    /// The node type tag (e.g. "Person"). Never changes after creation.
    pub ty: String,
    /// The node's attributes.
    pub attrs: Attrs,
}

/// A directed typed attributed graph.
///
/// Nodes and edges live in ordered maps keyed by [`NodeId`] and ordered
/// `(NodeId, NodeId)` pairs respectively, so at most one edge exists per
/// ordered pair and all iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypedGraph {
    nodes: BTreeMap<NodeId, NodeData>,
    edges: BTreeMap<(NodeId, NodeId), Attrs>,
}

impl TypedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Looks up an edge's attributes by its ordered endpoint pair.
    pub fn edge(&self, from: &NodeId, to: &NodeId) -> Option<&Attrs> {
        self.edges.get(&(from.clone(), to.clone()))
    }

    pub fn has_edge(&self, from: &NodeId, to: &NodeId) -> bool {
        self.edges.contains_key(&(from.clone(), to.clone()))
    }

    /// Iterates nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeData)> {
        self.nodes.iter()
    }

    /// Iterates edges in endpoint order.
    pub fn edges(&self) -> impl Iterator<Item = (&(NodeId, NodeId), &Attrs)> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Adds a node. Fails if the identifier is already taken.
    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        ty: impl Into<String>,
        attrs: Attrs,
    ) -> Result<NodeId, RewriteError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(RewriteError::Graph(format!("node '{id}' already exists")));
        }
        self.nodes.insert(
            id.clone(),
            NodeData {
                ty: ty.into(),
                attrs,
            },
        );
        Ok(id)
    }

    /// Removes a node and every incident edge.
    ///
    /// Incident edges are dropped outright, never reported as dangling;
    /// the applier's deletion phase relies on this permissive behavior.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(), RewriteError> {
        if self.nodes.remove(id).is_none() {
            return Err(RewriteError::Graph(format!("node '{id}' does not exist")));
        }
        self.edges.retain(|(s, t), _| s != id && t != id);
        Ok(())
    }

    /// Adds an edge between two existing nodes.
    ///
    /// Fails if either endpoint is missing or the ordered pair already has
    /// an edge; use [`TypedGraph::update_edge_attrs`] for the
    /// "already present, merge attributes" case.
    pub fn add_edge(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        attrs: Attrs,
    ) -> Result<(), RewriteError> {
        for endpoint in [from, to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(RewriteError::Graph(format!(
                    "edge endpoint '{endpoint}' does not exist"
                )));
            }
        }
        let key = (from.clone(), to.clone());
        if self.edges.contains_key(&key) {
            return Err(RewriteError::Graph(format!(
                "edge '{from}'->'{to}' already exists"
            )));
        }
        self.edges.insert(key, attrs);
        Ok(())
    }

    /// Merges attributes into an existing edge.
    pub fn update_edge_attrs(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        attrs: &Attrs,
    ) -> Result<(), RewriteError> {
        let existing = self
            .edges
            .get_mut(&(from.clone(), to.clone()))
            .ok_or_else(|| RewriteError::Graph(format!("edge '{from}'->'{to}' does not exist")))?;
        for (k, v) in attrs {
            existing.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    /// Merges attributes into an existing node.
    pub fn update_node_attrs(&mut self, id: &NodeId, attrs: &Attrs) -> Result<(), RewriteError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| RewriteError::Graph(format!("node '{id}' does not exist")))?;
        for (k, v) in attrs {
            node.attrs.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    pub fn remove_edge(&mut self, from: &NodeId, to: &NodeId) -> Result<(), RewriteError> {
        if self.edges.remove(&(from.clone(), to.clone())).is_none() {
            return Err(RewriteError::Graph(format!(
                "edge '{from}'->'{to}' does not exist"
            )));
        }
        Ok(())
    }

    /// Returns an identifier not yet used in this graph, derived from `base`.
    pub fn fresh_id(&self, base: &str) -> NodeId {
        let candidate = NodeId::new(base);
        if !self.nodes.contains_key(&candidate) {
            return candidate;
        }
        let mut i = 1usize;
        loop {
            let candidate = NodeId::new(format!("{base}_{i}"));
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    /// Clones a node under a fresh identifier, duplicating its type,
    /// attributes, and every incident edge (a self-loop becomes a
    /// self-loop on the clone).
    ///
    /// `name` overrides the generated `<node>_copy` identifier and must be
    /// unused.
    pub fn clone_node(
        &mut self,
        node: &NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, RewriteError> {
        let data = self
            .nodes
            .get(node)
            .ok_or_else(|| RewriteError::Graph(format!("node '{node}' does not exist")))?
            .clone();
        let clone_id = match name {
            Some(n) => {
                let id = NodeId::new(n);
                if self.nodes.contains_key(&id) {
                    return Err(RewriteError::Graph(format!("node '{id}' already exists")));
                }
                id
            }
            None => self.fresh_id(&format!("{node}_copy")),
        };

        let incident: Vec<((NodeId, NodeId), Attrs)> = self
            .edges
            .iter()
            .filter(|((s, t), _)| s == node || t == node)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.nodes.insert(clone_id.clone(), data);
        for ((s, t), attrs) in incident {
            let s = if s == *node { clone_id.clone() } else { s };
            let t = if t == *node { clone_id.clone() } else { t };
            self.edges.insert((s, t), attrs);
        }
        Ok(clone_id)
    }

    /// Merges a set of same-typed nodes into one fresh node.
    ///
    /// Attributes are combined per `method`. Every edge formerly incident
    /// to a merged node is re-pointed at the survivor; edges between merged
    /// nodes become a self-loop. Duplicate edges created by the
    /// re-pointing are collapsed, combining their attributes per
    /// `edges_method`.
    ///
    /// `name` overrides the generated identifier (the member names joined
    /// with `_`).
    pub fn merge_nodes(
        &mut self,
        nodes: &[NodeId],
        method: AttrMergeMethod,
        name: Option<&str>,
        edges_method: AttrMergeMethod,
    ) -> Result<NodeId, RewriteError> {
        if nodes.len() < 2 {
            return Err(RewriteError::Graph(
                "merge requires at least two nodes".into(),
            ));
        }
        let mut ty: Option<String> = None;
        let mut attrs: Option<Attrs> = None;
        for id in nodes {
            let data = self
                .nodes
                .get(id)
                .ok_or_else(|| RewriteError::Graph(format!("node '{id}' does not exist")))?;
            match &ty {
                None => ty = Some(data.ty.clone()),
                Some(t) if *t != data.ty => {
                    return Err(RewriteError::Graph(format!(
                        "cannot merge nodes of different types ('{t}' vs '{}')",
                        data.ty
                    )))
                }
                Some(_) => {}
            }
            attrs = Some(match attrs {
                None => data.attrs.clone(),
                Some(acc) => method.combine(&acc, &data.attrs),
            });
        }
        let ty = ty.unwrap_or_default();
        let attrs = attrs.unwrap_or_default();

        let merged_set: BTreeSet<&NodeId> = nodes.iter().collect();
        let base = nodes
            .iter()
            .map(NodeId::as_str)
            .collect::<Vec<_>>()
            .join("_");

        // Pull out every incident edge before touching the node set, then
        // re-insert with re-pointed endpoints, collapsing duplicates.
        let incident: Vec<((NodeId, NodeId), Attrs)> = self
            .edges
            .iter()
            .filter(|((s, t), _)| merged_set.contains(s) || merged_set.contains(t))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for ((s, t), _) in &incident {
            self.edges.remove(&(s.clone(), t.clone()));
        }
        for id in nodes {
            self.nodes.remove(id);
        }

        // A caller-supplied name may re-use one of the merged identifiers
        // (they are gone by now) but not collide with a surviving node.
        let merged_id = match name {
            Some(n) => {
                let id = NodeId::new(n);
                if self.nodes.contains_key(&id) {
                    return Err(RewriteError::Graph(format!("node '{id}' already exists")));
                }
                id
            }
            None => self.fresh_id(&base),
        };
        self.nodes.insert(
            merged_id.clone(),
            NodeData {
                ty,
                attrs,
            },
        );

        for ((s, t), edge_attrs) in incident {
            let s = if merged_set.contains(&s) {
                merged_id.clone()
            } else {
                s
            };
            let t = if merged_set.contains(&t) {
                merged_id.clone()
            } else {
                t
            };
            match self.edges.get(&(s.clone(), t.clone())) {
                Some(existing) => {
                    let combined = edges_method.combine(existing, &edge_attrs);
                    self.edges.insert((s, t), combined);
                }
                None => {
                    self.edges.insert((s, t), edge_attrs);
                }
            }
        }
        Ok(merged_id)
    }

    /// Returns the induced subgraph over the given node set: those nodes,
    /// and every edge whose both endpoints are kept.
    pub fn subgraph(&self, keep: &BTreeSet<NodeId>) -> TypedGraph {
        let nodes: BTreeMap<NodeId, NodeData> = self
            .nodes
            .iter()
            .filter(|(id, _)| keep.contains(id))
            .map(|(id, data)| (id.clone(), data.clone()))
            .collect();
        let edges: BTreeMap<(NodeId, NodeId), Attrs> = self
            .edges
            .iter()
            .filter(|((s, t), _)| keep.contains(s) && keep.contains(t))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        TypedGraph { nodes, edges }
    }
}
