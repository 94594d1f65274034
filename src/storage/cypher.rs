//! # Cypher Query Generation
//!
//! Renders the pullback construction as Cypher query text, for hosts that
//! keep their graphs in Neo4j rather than in memory. Graphs are node
//! labels; the homomorphisms `B -> D` and `C -> D` are materialized as
//! `typing` relationships and graph edges as `edge` relationships.
//!
//! Two fragments are produced and must run in order, in one transaction:
//! the first creates the apex nodes with intersected properties and their
//! typing edges, the second joins over those typing edges to create the
//! apex's graph edges. Property intersection uses `apoc.map.fromPairs`.
//!
//! Labels are interpolated verbatim; callers are responsible for passing
//! well-formed label names.

use std::collections::BTreeSet;
use std::fmt::Write;

/// The two Cypher fragments computing a pullback on the database side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullbackQueries {
    /// Creates the apex nodes and their `typing` edges.
    pub create_nodes: String,
    /// Creates the apex's graph edges. Run after `create_nodes`.
    pub create_edges: String,
}

/// Renders the pullback of `B -> D <- C` as Cypher.
///
/// `a` names the apex's label; when `None`, `pb_<b>_<c>_<d>` is used.
pub fn pullback_queries(b: &str, c: &str, d: &str, a: Option<&str>) -> PullbackQueries {
    let a = match a {
        Some(a) => a.to_string(),
        None => format!("pb_{b}_{c}_{d}"),
    };

    // Fragment 1: one apex node per pair of B/C nodes typed by the same D
    // node, carrying the pair's shared properties.
    let mut carry: BTreeSet<String> = BTreeSet::new();
    let mut query = String::new();
    let _ = writeln!(
        query,
        "OPTIONAL MATCH (n:{b})-[:typing]->(:{d})<-[:typing]-(m:{c})"
    );
    carry.insert("n".into());
    carry.insert("m".into());
    query.push_str(&merge_properties("n", "m", "new_props", &carry));
    carry.insert("new_props".into());
    let _ = writeln!(query, "CREATE (new_node_a:{a})");
    query.push_str("SET new_node_a.id = toString(id(new_node_a))\n");
    carry.insert("new_node_a".into());
    query.push_str("SET new_node_a += new_props\n");
    carry.remove("new_props");
    query.push_str(&with_vars(&carry));
    query.push_str(&create_edge("new_node_a", "n", "typing"));
    query.push_str(&create_edge("new_node_a", "m", "typing"));

    // Fragment 2: an apex edge wherever both projections have one.
    let mut carry: BTreeSet<String> = ["x".into(), "y".into()].into();
    let mut query2 = String::new();
    let _ = writeln!(
        query2,
        "MATCH (x:{a})-[:typing]->(:{b})-[r1:edge]->(:{b})<-[:typing]-(y:{a}),"
    );
    let _ = writeln!(query2, "(x)-[:typing]->(:{c})-[r2:edge]->(:{c})<-[:typing]-(y)");
    carry.insert("r1".into());
    carry.insert("r2".into());
    query2.push_str(&merge_properties("r1", "r2", "new_props", &carry));
    query2.push_str("MERGE (x)-[r:edge]->(y)\n");
    query2.push_str("SET r += new_props\n");

    PullbackQueries {
        create_nodes: query,
        create_edges: query2,
    }
}

/// Renders `result` as the map of properties shared (same key, same value)
/// by `left` and `right`, keeping `carry` in scope.
fn merge_properties(left: &str, right: &str, result: &str, carry: &BTreeSet<String>) -> String {
    let vars = carry.iter().cloned().collect::<Vec<_>>().join(", ");
    let mut out = String::new();
    let _ = writeln!(
        out,
        "WITH {vars}, [k IN keys(properties({left})) WHERE k IN keys(properties({right})) \
         AND properties({left})[k] = properties({right})[k]] AS shared_keys"
    );
    let _ = writeln!(
        out,
        "WITH {vars}, apoc.map.fromPairs([k IN shared_keys | [k, properties({left})[k]]]) \
         AS {result}"
    );
    out
}

fn with_vars(carry: &BTreeSet<String>) -> String {
    let vars = carry.iter().cloned().collect::<Vec<_>>().join(", ");
    format!("WITH {vars}\n")
}

fn create_edge(from: &str, to: &str, label: &str) -> String {
    format!("CREATE ({from})-[:{label}]->({to})\n")
}
