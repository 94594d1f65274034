//! # Command Parser
//!
//! Parses edit-command text into [`Command`] records using the Pest parser
//! generator. The parser is a stateless pure function: each non-empty line
//! is parsed independently, and failures are structured errors rather than
//! shared parser state.
//!
//! ## Error Handling
//!
//! A line whose first token is an identifier other than the six supported
//! keywords fails with [`RewriteError::UnknownCommand`]; any other
//! malformed line fails with [`RewriteError::Parse`], embedding the
//! offending line verbatim. The first failing line aborts the whole parse.
//!
//! ## Grammar
//!
//! The grammar is defined in `grammar/commands.pest` using Pest's PEG
//! syntax.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::engine::errors::RewriteError;
use crate::engine::graph::{AttrValue, Attrs, NodeId};
use crate::frontend::ast::Command;

#[derive(Parser)]
#[grammar = "grammar/commands.pest"]
struct CommandParser;

const KEYWORDS: [&str; 6] = [
    "clone",
    "merge",
    "add_node",
    "delete_node",
    "add_edge",
    "delete_edge",
];

/// Parses a block of command text, one command per non-empty line.
///
/// Blank lines and `#` comment lines are skipped.
pub fn parse_commands(text: &str) -> Result<Vec<Command>, RewriteError> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        out.push(parse_command(line)?);
    }
    Ok(out)
}

/// Parses a single command line.
pub fn parse_command(line: &str) -> Result<Command, RewriteError> {
    let mut pairs = CommandParser::parse(Rule::command_line, line)
        .map_err(|_| classify_failure(line))?;
    let command_line = pairs
        .next()
        .ok_or_else(|| RewriteError::Parse(line.to_string()))?;
    let cmd = command_line
        .into_inner()
        .next()
        .ok_or_else(|| RewriteError::Parse(line.to_string()))?;
    build_command(cmd, line)
}

/// Distinguishes "recognized grammar, unknown keyword" from plain parse
/// failures. An unparseable line with a keyword-shaped first token that is
/// not one of the six commands is reported as unknown.
fn classify_failure(line: &str) -> RewriteError {
    let first = line.split_whitespace().next().unwrap_or("");
    let keyword_shaped =
        !first.is_empty() && first.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if keyword_shaped && !KEYWORDS.contains(&first) {
        RewriteError::UnknownCommand(first.to_string())
    } else {
        RewriteError::Parse(line.to_string())
    }
}

fn build_command(cmd: Pair<Rule>, line: &str) -> Result<Command, RewriteError> {
    match cmd.as_rule() {
        Rule::clone_cmd => {
            let mut node = None;
            let mut name = None;
            for p in cmd.into_inner() {
                match p.as_rule() {
                    Rule::ident => node = Some(NodeId::from(p.as_str())),
                    Rule::as_clause => name = Some(clause_ident(p)?),
                    _ => {}
                }
            }
            Ok(Command::Clone {
                node: node.ok_or_else(|| RewriteError::Parse(line.to_string()))?,
                name,
            })
        }
        Rule::merge_cmd => {
            let mut nodes = Vec::new();
            let mut method = None;
            let mut name = None;
            let mut edges_method = None;
            for p in cmd.into_inner() {
                match p.as_rule() {
                    Rule::node_list => {
                        nodes = p
                            .into_inner()
                            .filter(|i| i.as_rule() == Rule::ident)
                            .map(|i| NodeId::from(i.as_str()))
                            .collect();
                    }
                    Rule::method_clause => method = Some(clause_method(p)?),
                    Rule::as_clause => name = Some(clause_ident(p)?),
                    Rule::edges_clause => edges_method = Some(clause_method(p)?),
                    _ => {}
                }
            }
            Ok(Command::Merge {
                nodes,
                method,
                name,
                edges_method,
            })
        }
        Rule::add_node_cmd => {
            let mut name = None;
            let mut ty = None;
            let mut attrs = Attrs::new();
            for p in cmd.into_inner() {
                match p.as_rule() {
                    Rule::ident => name = Some(p.as_str().to_string()),
                    Rule::type_clause => ty = Some(clause_ident(p)?),
                    Rule::attr_map => attrs = build_attrs(p, line)?,
                    _ => {}
                }
            }
            Ok(Command::AddNode { name, ty, attrs })
        }
        Rule::delete_node_cmd => {
            let node = cmd
                .into_inner()
                .find(|p| p.as_rule() == Rule::ident)
                .map(|p| NodeId::from(p.as_str()))
                .ok_or_else(|| RewriteError::Parse(line.to_string()))?;
            Ok(Command::DeleteNode { node })
        }
        Rule::add_edge_cmd => {
            let mut idents = Vec::new();
            let mut attrs = Attrs::new();
            for p in cmd.into_inner() {
                match p.as_rule() {
                    Rule::ident => idents.push(NodeId::from(p.as_str())),
                    Rule::attr_map => attrs = build_attrs(p, line)?,
                    _ => {}
                }
            }
            let [from, to] = <[NodeId; 2]>::try_from(idents)
                .map_err(|_| RewriteError::Parse(line.to_string()))?;
            Ok(Command::AddEdge { from, to, attrs })
        }
        Rule::delete_edge_cmd => {
            let idents: Vec<NodeId> = cmd
                .into_inner()
                .filter(|p| p.as_rule() == Rule::ident)
                .map(|p| NodeId::from(p.as_str()))
                .collect();
            let [from, to] = <[NodeId; 2]>::try_from(idents)
                .map_err(|_| RewriteError::Parse(line.to_string()))?;
            Ok(Command::DeleteEdge { from, to })
        }
        _ => Err(RewriteError::Parse(line.to_string())),
    }
}

/// Extracts the identifier from an `as`/`type` clause.
fn clause_ident(clause: Pair<Rule>) -> Result<String, RewriteError> {
    let line = clause.as_str().to_string();
    clause
        .into_inner()
        .find(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .ok_or(RewriteError::Parse(line))
}

/// Extracts the merge method from a `method`/`edges` clause.
fn clause_method(
    clause: Pair<Rule>,
) -> Result<crate::engine::graph::AttrMergeMethod, RewriteError> {
    let line = clause.as_str().to_string();
    clause
        .into_inner()
        .find(|p| p.as_rule() == Rule::merge_method)
        .ok_or(RewriteError::Parse(line))?
        .as_str()
        .parse()
}

fn build_attrs(map: Pair<Rule>, line: &str) -> Result<Attrs, RewriteError> {
    let mut attrs = Attrs::new();
    for pair in map.into_inner() {
        if pair.as_rule() != Rule::attr_pair {
            continue;
        }
        let mut key = None;
        let mut value = None;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::attr_key => key = Some(key_text(p)),
                Rule::attr_value => value = Some(build_value(p, line)?),
                _ => {}
            }
        }
        match (key, value) {
            (Some(k), Some(v)) => {
                attrs.insert(k, v);
            }
            _ => return Err(RewriteError::Parse(line.to_string())),
        }
    }
    Ok(attrs)
}

fn key_text(key: Pair<Rule>) -> String {
    match key.clone().into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::string => unquote(inner.as_str()),
        Some(inner) => inner.as_str().to_string(),
        None => key.as_str().to_string(),
    }
}

fn build_value(value: Pair<Rule>, line: &str) -> Result<AttrValue, RewriteError> {
    let inner = value
        .into_inner()
        .next()
        .ok_or_else(|| RewriteError::Parse(line.to_string()))?;
    match inner.as_rule() {
        Rule::set_value => {
            let elems = inner
                .into_inner()
                .filter(|p| p.as_rule() == Rule::set_elem)
                .map(|p| match p.clone().into_inner().next() {
                    Some(e) if e.as_rule() == Rule::string => unquote(e.as_str()),
                    Some(e) => e.as_str().to_string(),
                    None => p.as_str().to_string(),
                });
            Ok(AttrValue::set(elems))
        }
        Rule::string => Ok(AttrValue::Str(unquote(inner.as_str()))),
        Rule::boolean => Ok(AttrValue::Bool(inner.as_str() == "true")),
        Rule::integer => inner
            .as_str()
            .parse::<i64>()
            .map(AttrValue::Int)
            .map_err(|_| RewriteError::Parse(line.to_string())),
        Rule::ident => Ok(AttrValue::Str(inner.as_str().to_string())),
        _ => Err(RewriteError::Parse(line.to_string())),
    }
}

fn unquote(s: &str) -> String {
    s.trim_matches('"').to_string()
}
