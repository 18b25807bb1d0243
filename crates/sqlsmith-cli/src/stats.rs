//! Run-level reporting: aggregated generation stats, a deduplicated error
//! tally, and the query/AST dump sinks for `--dump-queries`/`--dump-ast`.
//!
//! The error tally is purely observational. It exists so an operator can see
//! which device-under-test error messages recurred across a run; it never
//! feeds back into the generator's production weights, which stay fixed for
//! the whole run regardless of what the device under test rejects.

use std::collections::HashMap;
use std::io::Write;

use sqlsmith_core::{Production, StatsVisitor};

use crate::dut::Outcome;

/// Tallies generation-shape stats (node counts, retries, depth, per-kind
/// histogram) across every statement produced in a run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub statements: u64,
    pub nodes: u64,
    pub retries: u64,
    pub max_depth: usize,
    pub kind_histogram: HashMap<&'static str, u64>,
    pub outcomes: HashMap<&'static str, u64>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_statement(&mut self, query: &dyn Production) {
        let mut visitor = StatsVisitor::new();
        query.accept(&mut visitor);
        self.statements += 1;
        self.nodes += visitor.nodes;
        self.retries += u64::from(visitor.retries);
        self.max_depth = self.max_depth.max(visitor.max_level);
        for (kind, count) in visitor.histogram {
            *self.kind_histogram.entry(kind).or_insert(0) += count;
        }
    }

    pub fn record_outcome(&mut self, outcome: &Outcome) {
        let tag = match outcome {
            Outcome::Success => "success",
            Outcome::Syntax => "syntax",
            Outcome::Timeout => "timeout",
            Outcome::Broken => "broken",
            Outcome::Other(_) => "other",
        };
        *self.outcomes.entry(tag).or_insert(0) += 1;
    }

    pub fn log_summary(&self) {
        tracing::info!(
            statements = self.statements,
            nodes = self.nodes,
            retries = self.retries,
            max_depth = self.max_depth,
            "generation run complete"
        );
        for (tag, count) in &self.outcomes {
            tracing::info!(outcome = tag, count, "outcome tally");
        }
    }
}

/// Deduplicated counter of device-under-test error messages, kept separate
/// from [`RunStats`] since it tallies *text*, not generation shape.
#[derive(Debug, Default)]
pub struct ErrorTally {
    counts: HashMap<String, u64>,
}

impl ErrorTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, message: &str) {
        let line = message.lines().next().unwrap_or(message);
        *self.counts.entry(line.to_string()).or_insert(0) += 1;
    }

    pub fn log_summary(&self) {
        let mut entries: Vec<_> = self.counts.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1));
        for (message, count) in entries {
            tracing::warn!(count, message, "recurring device-under-test error");
        }
    }
}

/// Writes each generated statement's SQL text to `out`, one per line,
/// for `--dump-queries`.
pub fn dump_query(out: &mut impl Write, query: &dyn Production) -> std::io::Result<()> {
    writeln!(out, "{}", query.to_sql())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlsmith_core::catalog::{Catalog, Column, Table};
    use sqlsmith_core::{statement_factory, Rng, Scope};
    use std::sync::Arc;

    fn sample_catalog() -> Arc<Catalog> {
        let mut cat = Catalog::empty().with_builtin_mysql_routines();
        cat.add_table(Table::new(
            "t1",
            "t1",
            vec![Column::new("a", cat.inttype.clone())],
            true,
            true,
        ));
        Arc::new(cat)
    }

    #[test]
    fn test_record_statement_accumulates_nodes() {
        let cat = sample_catalog();
        let mut scope = Scope::root(cat);
        let mut rng = Rng::seed_from_u64(1);
        let mut stats = RunStats::new();
        for _ in 0..5 {
            if let Ok(query) = statement_factory(&mut scope, &mut rng) {
                stats.record_statement(&query);
            }
        }
        assert!(stats.statements <= 5);
        assert!(stats.nodes >= stats.statements);
    }

    #[test]
    fn test_record_outcome_tallies_by_kind() {
        let mut stats = RunStats::new();
        stats.record_outcome(&Outcome::Success);
        stats.record_outcome(&Outcome::Success);
        stats.record_outcome(&Outcome::Syntax);
        assert_eq!(stats.outcomes["success"], 2);
        assert_eq!(stats.outcomes["syntax"], 1);
    }

    #[test]
    fn test_error_tally_dedupes_by_message() {
        let mut tally = ErrorTally::new();
        tally.record("unknown column 'x'");
        tally.record("unknown column 'x'");
        tally.record("unknown table 'y'");
        assert_eq!(tally.counts["unknown column 'x'"], 2);
        assert_eq!(tally.counts["unknown table 'y'"], 1);
    }

    #[test]
    fn test_error_tally_dedupes_by_first_line_only() {
        let mut tally = ErrorTally::new();
        tally.record("unknown column 'x'\nat line 12 of the query");
        tally.record("unknown column 'x'\nat line 40 of a different query");
        assert_eq!(tally.counts.len(), 1);
        assert_eq!(tally.counts["unknown column 'x'"], 2);
    }

    #[test]
    fn test_dump_query_writes_sql_line() {
        let cat = sample_catalog();
        let mut buf = Vec::new();
        for seed in 0..50u64 {
            let mut scope = Scope::root(cat.clone());
            let mut rng = Rng::seed_from_u64(seed);
            if let Ok(query) = statement_factory(&mut scope, &mut rng) {
                dump_query(&mut buf, &query).unwrap();
                break;
            }
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.is_empty() || text.starts_with("select "));
    }
}
