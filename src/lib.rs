//! # Regraft - Algebraic Graph Rewriting
//!
//! Regraft rewrites typed attributed graphs with double-pushout-style
//! rules: spans of homomorphisms whose non-injective legs express cloning
//! and merging, on top of plain addition and deletion.
//!
//! ## Architecture
//!
//! The system is organized into several modules:
//!
//! - **frontend**: Parser and AST for the edit-command language
//! - **engine**: Graphs, matching, rules, application, and the
//!   categorical constructions behind them
//! - **storage**: Cypher query generation for Neo4j-backed graphs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use regraft::{apply_rule, compile_rule, find_matching, TypedGraph};
//!
//! let mut pattern = TypedGraph::new();
//! pattern.add_node("x", "Person", Default::default())?;
//!
//! let rule = compile_rule(&pattern, "clone x as x2")?;
//! for instance in find_matching(rule.lhs(), &graph) {
//!     apply_rule(&mut graph, &instance, &rule)?;
//! }
//! ```

#![forbid(unsafe_code)]

pub mod engine;
pub mod frontend;
pub mod storage;

// Re-export commonly used types
pub use engine::category::{pullback, pullback_complement, pushout};
pub use engine::errors::RewriteError;
pub use engine::graph::{AttrMergeMethod, AttrValue, Attrs, NodeId, TypedGraph};
pub use engine::matching::{find_matching, Instance};
pub use engine::rewrite::{apply_rule, transform_instance, RewritePlan, RhsInstance};
pub use engine::rule::{Homomorphism, Rule};
pub use frontend::ast::Command;
pub use frontend::parser::{parse_command, parse_commands};

/// Parses command text and compiles it against a pattern in one step.
///
/// Equivalent to [`parse_commands`] followed by [`Rule::compile`].
///
/// # Example
///
/// ```rust,ignore
/// use regraft::compile_rule;
///
/// let rule = compile_rule(&pattern, "merge [a, b] as ab")?;
/// ```
pub fn compile_rule(lhs: &TypedGraph, commands: &str) -> Result<Rule, RewriteError> {
    let commands = parse_commands(commands)?;
    Rule::compile(lhs, &commands)
}
