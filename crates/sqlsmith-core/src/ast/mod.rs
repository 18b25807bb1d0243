//! AST productions and the retry harness that drives random generation.
//!
//! Every production (grammar node) carries a `level` (depth from the root,
//! used to damp recursion probabilities), a `retries` count (how many failed
//! attempts the factory made before this node succeeded), and knows how to
//! [`Production::emit`] its SQL text and [`Production::accept`] a visitor in
//! post-order. Parent back-references are deliberately *not* modeled as
//! pointers: the design notes call them diagnostic-only and never mutated
//! through, and in Rust a real back-pointer across an owned tree is a
//! lifetime or arena problem for no behavioral gain — `level` is threaded
//! down at construction time instead, and retry totals are aggregated by the
//! stats visitor walking the finished tree rather than by mutating an
//! ancestor chain during construction.
//!
//! The retry harness ([`with_retry`]) is the self-healing mechanism described
//! in the design: a factory closure is retried, with a fresh random choice
//! each time, until it succeeds or the local retry budget
//! ([`DEFAULT_RETRY_LIMIT`]) is exhausted. No partially constructed node ever
//! escapes a failed attempt — a closure either returns a complete node or an
//! error, never a half-built value with side effects already applied to the
//! enclosing scope.

pub mod bool_expr;
pub mod expr;
pub mod query_spec;
pub mod table_ref;

use crate::error::ProductionError;
use crate::visitor::Visitor;

/// Default per-node retry budget before a production gives up and surfaces
/// [`ProductionError::RetryBudgetExceeded`] to its caller.
pub const DEFAULT_RETRY_LIMIT: u32 = 100;

/// Shared contract for every AST node.
pub trait Production: std::fmt::Debug {
    /// Depth from the statement root.
    fn level(&self) -> usize;

    /// Count of failed attempts the factory made before this node succeeded.
    fn retries(&self) -> u32;

    /// Stable production-category name, used by the statistics visitor to
    /// build its histogram and by the GraphML dumper as a node label.
    fn kind(&self) -> &'static str;

    /// Appends this node's SQL rendering to `out`.
    fn emit(&self, out: &mut String);

    /// Post-order traversal: visits children first, then self. Leaf
    /// productions just visit self.
    fn accept(&self, visitor: &mut dyn Visitor);

    /// Convenience: renders this node's SQL text as an owned `String`.
    fn to_sql(&self) -> String {
        let mut out = String::new();
        self.emit(&mut out);
        out
    }
}

/// Runs `attempt` in a loop, retrying on a recoverable [`ProductionError`]
/// until it succeeds or [`DEFAULT_RETRY_LIMIT`] attempts have failed.
///
/// `attempt` receives the number of prior failed attempts, so a successful
/// node can record that count as its own `retries` field — this is the
/// Rust-shaped equivalent of the source's `retry()` call incrementing a
/// counter across reconstructed attempts.
pub(crate) fn with_retry<T>(
    mut attempt: impl FnMut(u32) -> Result<T, ProductionError>,
) -> Result<T, ProductionError> {
    with_retry_limited(DEFAULT_RETRY_LIMIT, &mut attempt)
}

pub(crate) fn with_retry_limited<T>(
    limit: u32,
    attempt: &mut impl FnMut(u32) -> Result<T, ProductionError>,
) -> Result<T, ProductionError> {
    let mut retries = 0u32;
    loop {
        match attempt(retries) {
            Ok(value) => return Ok(value),
            Err(_) if retries < limit => retries += 1,
            Err(_) => return Err(ProductionError::RetryBudgetExceeded),
        }
    }
}
