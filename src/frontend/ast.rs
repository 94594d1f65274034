//! # Command AST
//!
//! Tagged-union representation of the six graph-edit commands. One variant
//! per keyword, each carrying strongly-typed required and optional fields,
//! so a missing field is a compile-time error rather than a runtime
//! membership test.
//!
//! Commands are produced by [`crate::frontend::parser::parse_commands`] and
//! consumed by the rule compiler ([`crate::engine::rule::Rule::compile`])
//! and by the direct-application helper
//! ([`crate::engine::rewrite::transform_instance`]).

use crate::engine::graph::{AttrMergeMethod, Attrs, NodeId};

/// A single parsed edit directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `clone n [as name]` — duplicate a pattern node. In a compiled rule
    /// this makes the left leg non-injective: the matched node is cloned
    /// at apply time.
    Clone {
        node: NodeId,
        name: Option<String>,
    },
    /// `merge [n1, n2, ...] [method m] [as name] [edges m]` — collapse the
    /// listed nodes into one. In a compiled rule this makes the right leg
    /// non-injective: the matched nodes are merged at apply time.
    Merge {
        nodes: Vec<NodeId>,
        method: Option<AttrMergeMethod>,
        name: Option<String>,
        edges_method: Option<AttrMergeMethod>,
    },
    /// `add_node [name] [type T] [{attrs}]` — a node created fresh by the
    /// rule (no preimage in the preserved core).
    AddNode {
        name: Option<String>,
        ty: Option<String>,
        attrs: Attrs,
    },
    /// `delete_node n` — the node exists in the match pattern but is not
    /// preserved.
    DeleteNode { node: NodeId },
    /// `add_edge n1 n2 [{attrs}]` — an edge created fresh by the rule.
    AddEdge {
        from: NodeId,
        to: NodeId,
        attrs: Attrs,
    },
    /// `delete_edge n1 n2` — the edge is dropped from the preserved core.
    DeleteEdge { from: NodeId, to: NodeId },
}
