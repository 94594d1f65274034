//! The rewriting engine for typed attributed graphs.
//!
//! This module provides:
//! - **errors**: Error types for parse and rewrite failures
//! - **graph**: Core typed attributed graph data structure
//! - **matching**: Subgraph isomorphism matching for rule patterns
//! - **rule**: Homomorphisms, rule spans, and command compilation
//! - **rewrite**: Two-stage rule application (analyze, then commit)
//! - **category**: Pushout, pullback, and pullback-complement constructions

pub mod category;
pub mod errors;
pub mod graph;
pub mod matching;
pub mod rewrite;
pub mod rule;
