//! # Rule Application
//!
//! Applies a compiled rule at a match. Application is split into two
//! stages: [`RewritePlan::analyze`] computes the full changeset against an
//! immutable graph and can fail without side effects;
//! [`RewritePlan::commit`] then replays it against the live graph. A
//! failed analyze leaves the graph untouched.
//!
//! The committed changeset runs in five phases, in this order:
//!
//! 1. attribute propagation (RHS attributes are unioned into matched
//!    nodes and edges),
//! 2. deletion (pattern nodes/edges absent from the preserved core;
//!    edges left dangling by a node deletion are dropped silently),
//! 3. addition (RHS nodes/edges outside the right leg's image; adding an
//!    edge that already exists merges attributes instead),
//! 4. merging (one RHS node with several core preimages),
//! 5. cloning (one pattern node with several core preimages).
//!
//! The returned [`RhsInstance`] maps every RHS node to the node of the
//! transformed graph that carries it.

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::errors::RewriteError;
use crate::engine::graph::{union_attrs, Attrs, NodeData, NodeId, TypedGraph};
use crate::engine::matching::{is_match, Instance};
use crate::engine::rule::{check_span, Rule};
use crate::frontend::ast::Command;

/// Where each RHS node landed in the transformed graph.
pub type RhsInstance = BTreeMap<NodeId, NodeId>;

/// A fully analyzed changeset for one rule application.
#[derive(Debug, Clone)]
pub struct RewritePlan {
    node_attr_updates: Vec<(NodeId, Attrs)>,
    edge_attr_updates: Vec<((NodeId, NodeId), Attrs)>,
    delete_edges: Vec<(NodeId, NodeId)>,
    delete_nodes: Vec<NodeId>,
    add_nodes: Vec<(NodeId, NodeData)>,
    add_edges: Vec<((NodeId, NodeId), Attrs)>,
    merges: Vec<(NodeId, Vec<NodeId>)>,
    clones: Vec<(NodeId, Vec<NodeId>)>,
    rhs_instance: RhsInstance,
}

impl RewritePlan {
    /// Computes the changeset for applying `rule` at `instance`, without
    /// touching `graph`.
    ///
    /// Fails if the rule's span is inconsistent or `instance` is not an
    /// injective match of the rule's pattern in `graph`.
    pub fn analyze(
        graph: &TypedGraph,
        instance: &Instance,
        rule: &Rule,
    ) -> Result<RewritePlan, RewriteError> {
        check_span(rule.left(), rule.right())?;
        for (core, _) in rule.p().nodes() {
            if rule.left().image(core).is_none() || rule.right().image(core).is_none() {
                return Err(RewriteError::Homomorphism(format!(
                    "core node '{core}' is unmapped by one of the legs"
                )));
            }
        }
        validate_instance(graph, instance, rule)?;

        let p = rule.p();
        let lhs = rule.lhs();
        let rhs = rule.rhs();
        let pl = rule.left().mapping();
        let pr = rule.right().mapping();

        let host = |core| host_image(pl, instance, core);

        // Phase 1: attribute propagation. Values are unioned here so that
        // the commit's key-overwriting update is a pure replay.
        let mut node_attr_updates = Vec::new();
        for (core, r) in pr {
            let (Some(rhs_data), Some(w)) = (rhs.node(r), host(core).ok()) else {
                continue;
            };
            if rhs_data.attrs.is_empty() {
                continue;
            }
            let current = graph
                .node(w)
                .map(|d| &d.attrs)
                .ok_or_else(|| RewriteError::Internal(format!("host node '{w}' vanished")))?;
            node_attr_updates.push((w.clone(), union_attrs(current, &rhs_data.attrs)));
        }
        let mut edge_attr_updates = Vec::new();
        for ((u, v), _) in p.edges() {
            let (Some(ru), Some(rv)) = (pr.get(u), pr.get(v)) else {
                continue;
            };
            let Some(rhs_attrs) = rhs.edge(ru, rv) else {
                continue;
            };
            if rhs_attrs.is_empty() {
                continue;
            }
            let (wu, wv) = (host(u)?.clone(), host(v)?.clone());
            if let Some(current) = graph.edge(&wu, &wv) {
                edge_attr_updates.push(((wu, wv), union_attrs(current, rhs_attrs)));
            }
        }

        // Phase 2: deletion. A pattern node/edge with no core preimage is
        // removed from the host graph.
        let preserved_lhs: BTreeSet<&NodeId> = pl.values().collect();
        let mut delete_nodes = Vec::new();
        for (l, _) in lhs.nodes() {
            if !preserved_lhs.contains(l) {
                delete_nodes.push(instance[l].clone());
            }
        }
        let preserved_lhs_edges: BTreeSet<(&NodeId, &NodeId)> = p
            .edges()
            .map(|((u, v), _)| (&pl[u], &pl[v]))
            .collect();
        let mut delete_edges = Vec::new();
        for ((lu, lv), _) in lhs.edges() {
            if preserved_lhs.contains(lu)
                && preserved_lhs.contains(lv)
                && !preserved_lhs_edges.contains(&(lu, lv))
            {
                delete_edges.push((instance[lu].clone(), instance[lv].clone()));
            }
        }

        // Phase 3: addition. RHS nodes outside the right leg's image get
        // fresh host identifiers, reserved against both the host graph and
        // each other.
        let rhs_image: BTreeSet<&NodeId> = pr.values().collect();
        let mut rhs_instance: RhsInstance = RhsInstance::new();
        for (core, r) in pr {
            let w = host(core)?;
            rhs_instance.entry(r.clone()).or_insert_with(|| w.clone());
        }
        let mut reserved: BTreeSet<NodeId> = BTreeSet::new();
        let mut add_nodes = Vec::new();
        for (r, data) in rhs.nodes() {
            if rhs_image.contains(r) {
                continue;
            }
            let fresh = fresh_reserved(graph, &reserved, r.as_str());
            reserved.insert(fresh.clone());
            rhs_instance.insert(r.clone(), fresh.clone());
            add_nodes.push((fresh, data.clone()));
        }
        let preserved_rhs_edges: BTreeSet<(&NodeId, &NodeId)> = p
            .edges()
            .map(|((u, v), _)| (&pr[u], &pr[v]))
            .collect();
        let mut add_edges = Vec::new();
        for ((ru, rv), attrs) in rhs.edges() {
            if !preserved_rhs_edges.contains(&(ru, rv)) {
                add_edges.push(((ru.clone(), rv.clone()), attrs.clone()));
            }
        }

        // Phase 4: merging. One RHS node with several distinct host
        // preimages collapses them.
        let mut merges = Vec::new();
        for (r, _) in rhs.nodes() {
            let mut members = BTreeSet::new();
            for (core, image) in pr {
                if image == r {
                    members.insert(host(core)?.clone());
                }
            }
            if members.len() >= 2 {
                merges.push((r.clone(), members.into_iter().collect()));
            }
        }

        // Phase 5: cloning. One pattern node with several core preimages
        // is copied; the first preimage (in identifier order) keeps the
        // original host node, each further one gets a clone.
        let mut clones = Vec::new();
        for (l, _) in lhs.nodes() {
            let preimages: Vec<&NodeId> = pl
                .iter()
                .filter(|(_, image)| *image == l)
                .map(|(core, _)| core)
                .collect();
            if preimages.len() >= 2 {
                // Each extra preimage is recorded under its RHS placement,
                // so commit can point the RHS instance at the clone.
                let mut extras = Vec::with_capacity(preimages.len() - 1);
                for core in &preimages[1..] {
                    let r = pr.get(*core).ok_or_else(|| {
                        RewriteError::Internal(format!(
                            "core node '{core}' has no right-leg image"
                        ))
                    })?;
                    extras.push(r.clone());
                }
                clones.push((instance[l].clone(), extras));
            }
        }

        Ok(RewritePlan {
            node_attr_updates,
            edge_attr_updates,
            delete_edges,
            delete_nodes,
            add_nodes,
            add_edges,
            merges,
            clones,
            rhs_instance,
        })
    }

    /// Host nodes this plan will delete.
    pub fn deleted_nodes(&self) -> &[NodeId] {
        &self.delete_nodes
    }

    /// Host identifiers reserved for nodes this plan will add.
    pub fn added_nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.add_nodes.iter().map(|(id, _)| id)
    }

    /// Replays the changeset against `graph`, consuming the plan.
    ///
    /// Returns the final RHS instance. The plan must have been analyzed
    /// against this graph in its current state.
    pub fn commit(self, graph: &mut TypedGraph) -> Result<RhsInstance, RewriteError> {
        let plan = self;
        let mut rhs_instance = plan.rhs_instance;

        for (w, attrs) in &plan.node_attr_updates {
            graph.update_node_attrs(w, attrs)?;
        }
        for ((wu, wv), attrs) in &plan.edge_attr_updates {
            graph.update_edge_attrs(wu, wv, attrs)?;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "attribute phase done ({} node, {} edge updates)",
            plan.node_attr_updates.len(),
            plan.edge_attr_updates.len()
        );

        for (wu, wv) in &plan.delete_edges {
            graph.remove_edge(wu, wv)?;
        }
        for w in &plan.delete_nodes {
            graph.remove_node(w)?;
        }

        for (id, data) in plan.add_nodes {
            graph.add_node(id, data.ty, data.attrs)?;
        }
        for ((ru, rv), attrs) in &plan.add_edges {
            let wu = rhs_instance
                .get(ru)
                .ok_or_else(|| {
                    RewriteError::Internal(format!("added edge endpoint '{ru}' unplaced"))
                })?
                .clone();
            let wv = rhs_instance
                .get(rv)
                .ok_or_else(|| {
                    RewriteError::Internal(format!("added edge endpoint '{rv}' unplaced"))
                })?
                .clone();
            if graph.has_edge(&wu, &wv) {
                graph.update_edge_attrs(&wu, &wv, attrs)?;
            } else {
                graph.add_edge(&wu, &wv, attrs.clone())?;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "deletion and addition phases done ({} nodes deleted, {} edges added)",
            plan.delete_nodes.len(),
            plan.add_edges.len()
        );

        // Merging can retire host identifiers that later phases still
        // refer to; aliases track where each retired node went.
        let mut aliases: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for (r, members) in &plan.merges {
            let current: BTreeSet<NodeId> =
                members.iter().map(|m| resolve(&aliases, m)).collect();
            let current: Vec<NodeId> = current.into_iter().collect();
            if current.len() < 2 {
                if let Some(only) = current.first() {
                    rhs_instance.insert(r.clone(), only.clone());
                }
                continue;
            }
            let merged = graph.merge_nodes(&current, Default::default(), None, Default::default())?;
            for member in &current {
                aliases.insert(member.clone(), merged.clone());
            }
            rhs_instance.insert(r.clone(), merged.clone());
            #[cfg(feature = "tracing")]
            tracing::debug!("merged {:?} into '{}'", current, merged);
        }

        for (original, extras) in plan.clones {
            let target = resolve(&aliases, &original);
            for placement in extras {
                let cloned = graph.clone_node(&target, None)?;
                rhs_instance.insert(placement, cloned);
            }
        }

        for image in rhs_instance.values_mut() {
            let current = resolve(&aliases, image);
            *image = current;
        }
        Ok(rhs_instance)
    }
}

/// Applies `rule` at `instance`, mutating `graph`.
///
/// Equivalent to [`RewritePlan::analyze`] followed by
/// [`RewritePlan::commit`]; a failed analyze leaves `graph` unchanged.
pub fn apply_rule(
    graph: &mut TypedGraph,
    instance: &Instance,
    rule: &Rule,
) -> Result<RhsInstance, RewriteError> {
    RewritePlan::analyze(graph, instance, rule)?.commit(graph)
}

/// Applies edit commands directly to `graph`, without compiling a rule.
///
/// Node names in the commands are resolved through `instance` where
/// possible and taken literally otherwise, so the same command text works
/// against a match or against the graph itself.
pub fn transform_instance(
    graph: &mut TypedGraph,
    instance: &Instance,
    commands: &[Command],
) -> Result<(), RewriteError> {
    let resolve = |id: &NodeId| instance.get(id).unwrap_or(id).clone();
    for command in commands {
        match command {
            Command::Clone { node, name } => {
                graph.clone_node(&resolve(node), name.as_deref())?;
            }
            Command::Merge {
                nodes,
                method,
                name,
                edges_method,
            } => {
                let members: Vec<NodeId> = nodes.iter().map(&resolve).collect();
                graph.merge_nodes(
                    &members,
                    method.unwrap_or_default(),
                    name.as_deref(),
                    edges_method.unwrap_or_default(),
                )?;
            }
            Command::AddNode { name, ty, attrs } => {
                let id = match name {
                    Some(n) => NodeId::from(n.as_str()),
                    None => graph.fresh_id("node"),
                };
                graph.add_node(id, ty.clone().unwrap_or_default(), attrs.clone())?;
            }
            Command::DeleteNode { node } => {
                graph.remove_node(&resolve(node))?;
            }
            Command::AddEdge { from, to, attrs } => {
                let (wu, wv) = (resolve(from), resolve(to));
                if graph.has_edge(&wu, &wv) {
                    graph.update_edge_attrs(&wu, &wv, attrs)?;
                } else {
                    graph.add_edge(&wu, &wv, attrs.clone())?;
                }
            }
            Command::DeleteEdge { from, to } => {
                graph.remove_edge(&resolve(from), &resolve(to))?;
            }
        }
    }
    Ok(())
}

fn validate_instance(
    graph: &TypedGraph,
    instance: &Instance,
    rule: &Rule,
) -> Result<(), RewriteError> {
    for (l, _) in rule.lhs().nodes() {
        if !instance.contains_key(l) {
            return Err(RewriteError::Homomorphism(format!(
                "instance is missing pattern node '{l}'"
            )));
        }
    }
    let images: BTreeSet<&NodeId> = instance.values().collect();
    if images.len() != instance.len() {
        return Err(RewriteError::Homomorphism(
            "instance is not injective".into(),
        ));
    }
    if !is_match(rule.lhs(), graph, instance) {
        return Err(RewriteError::Homomorphism(
            "instance is not a match of the pattern".into(),
        ));
    }
    Ok(())
}

/// Host-graph image of a preserved-core node: through the left leg, then
/// through the match instance.
fn host_image<'a>(
    pl: &'a BTreeMap<NodeId, NodeId>,
    instance: &'a Instance,
    core: &NodeId,
) -> Result<&'a NodeId, RewriteError> {
    pl.get(core)
        .and_then(|l| instance.get(l))
        .ok_or_else(|| RewriteError::Internal(format!("core node '{core}' has no host image")))
}

/// Follows merge aliases to a node's current identifier.
fn resolve(aliases: &BTreeMap<NodeId, NodeId>, id: &NodeId) -> NodeId {
    let mut current = id;
    while let Some(next) = aliases.get(current) {
        current = next;
    }
    current.clone()
}

fn fresh_reserved(graph: &TypedGraph, reserved: &BTreeSet<NodeId>, base: &str) -> NodeId {
    let candidate = NodeId::new(base);
    if !graph.has_node(&candidate) && !reserved.contains(&candidate) {
        return candidate;
    }
    let mut i = 1usize;
    loop {
        let candidate = NodeId::new(format!("{base}_{i}"));
        if !graph.has_node(&candidate) && !reserved.contains(&candidate) {
            return candidate;
        }
        i += 1;
    }
}
