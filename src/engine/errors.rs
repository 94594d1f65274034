//! Error types for regraft rewriting.

use thiserror::Error;

/// Errors that can occur during command parsing, rule compilation, or
/// rule application.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// Every failure is synchronous and aborts the whole compile/apply call;
/// no partial-result recovery is attempted. An absence of matches is *not*
/// an error: [`crate::engine::matching::find_matching`] returns an empty
/// vector instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RewriteError {
    /// A command line that does not conform to the command grammar.
    ///
    /// Carries the offending line verbatim.
    #[error("Cannot parse command '{0}'")]
    Parse(String),

    /// A well-formed line whose keyword is not one of the six supported
    /// edit commands.
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    /// A rule's left and right homomorphisms disagree on the shared
    /// preserved core's nodes or edges.
    #[error("span mismatch: {0}")]
    SpanMismatch(String),

    /// A constructed mapping fails type, attribute, or edge preservation.
    #[error("invalid homomorphism: {0}")]
    Homomorphism(String),

    /// A graph mutation was rejected: missing node/edge, duplicate
    /// identifier, endpoint outside the graph, and similar.
    #[error("graph error: {0}")]
    Graph(String),

    /// No pullback complement exists for the given pair of homomorphisms
    /// (non-injective match, or a deletion that would leave a dangling edge).
    #[error("no pullback complement: {0}")]
    NoComplement(String),

    /// An unexpected condition during execution.
    ///
    /// This should be used only for programmer errors, not user errors.
    #[error("internal error: {0}")]
    Internal(String),
}
