//! Query generation for graph-database backends.
//!
//! This module provides:
//! - **cypher**: Cypher query text for running constructions on Neo4j

pub mod cypher;
