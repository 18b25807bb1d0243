//! Post-order AST traversal and its two built-in consumers.
//!
//! [`Visitor`] is a single-method trait; productions route `accept` calls
//! through their concrete type so a visitor can tally per-category
//! statistics without needing to match on every variant itself. Two
//! independent consumers are provided: [`StatsVisitor`] (node/retry/depth
//! tallies for the host's stderr logger) and [`GraphmlDumper`] (an AST dump
//! for `--dump-ast`, restored from `original_source/dump.hh`).

use std::collections::HashMap;
use std::io::{self, Write};

use crate::ast::Production;

/// A single visitation hook, called once per production in post-order.
pub trait Visitor {
    fn visit(&mut self, node: &dyn Production);
}

/// Tallies total node count, maximum depth, cumulative retries, and a
/// histogram keyed by production category. Mirrors `stats_visitor` in
/// `original_source/log.cc`.
#[derive(Debug, Default)]
pub struct StatsVisitor {
    pub nodes: u64,
    pub max_level: usize,
    pub retries: u64,
    pub histogram: HashMap<&'static str, u64>,
}

impl StatsVisitor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Visitor for StatsVisitor {
    fn visit(&mut self, node: &dyn Production) {
        self.nodes += 1;
        self.max_level = self.max_level.max(node.level());
        self.retries += u64::from(node.retries());
        *self.histogram.entry(node.kind()).or_insert(0) += 1;
    }
}

/// Writes a GraphML `<graph>` document for one generated AST: one `<node>`
/// per production visited, one `<edge>` linking each node to the previous
/// node at a shallower-or-equal level (a simple, stack-based approximation
/// of parent/child that needs no back-pointers on the productions
/// themselves — see `ast` module docs on why parent pointers aren't
/// modeled). The node `label` is the production's `kind()`.
///
/// This is the second, independent consumer of `accept(visitor)`: it proves
/// the visitor interface is not special-cased to statistics collection.
pub struct GraphmlDumper<'a, W: Write> {
    out: &'a mut W,
    next_id: u64,
    /// Stack of (node id, level) for the most recently visited ancestors,
    /// used to link edges without parent pointers.
    stack: Vec<(u64, usize)>,
    graph_index: u64,
}

impl<'a, W: Write> GraphmlDumper<'a, W> {
    pub fn new(out: &'a mut W, graph_index: u64) -> Self {
        Self {
            out,
            next_id: 0,
            stack: Vec::new(),
            graph_index,
        }
    }

    /// Emits the opening `<graph>` tag. Call once before `accept`.
    pub fn start(&mut self) -> io::Result<()> {
        writeln!(self.out, "<graph id=\"g{}\" edgedefault=\"directed\">", self.graph_index)
    }

    /// Emits the closing `</graph>` tag. Call once after `accept`.
    pub fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out, "</graph>")
    }
}

impl<'a, W: Write> Visitor for GraphmlDumper<'a, W> {
    fn visit(&mut self, node: &dyn Production) {
        let id = self.next_id;
        self.next_id += 1;

        // Post-order traversal means a node's already-visited children sit
        // at the top of the stack with a deeper level than `node`; pop them
        // off (they're this node's descendants, not its siblings) before
        // finding the parent this node attaches to.
        while matches!(self.stack.last(), Some((_, lvl)) if *lvl > node.level()) {
            self.stack.pop();
        }

        let _ = writeln!(
            self.out,
            "  <node id=\"n{id}\"><data key=\"label\">{}</data></node>",
            node.kind()
        );

        if let Some((parent_id, _)) = self.stack.last() {
            let _ = writeln!(
                self.out,
                "  <edge source=\"n{parent_id}\" target=\"n{id}\"/>"
            );
        }

        self.stack.push((id, node.level()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeProd {
        level: usize,
        retries: u32,
        kind: &'static str,
    }

    impl Production for FakeProd {
        fn level(&self) -> usize {
            self.level
        }
        fn retries(&self) -> u32 {
            self.retries
        }
        fn kind(&self) -> &'static str {
            self.kind
        }
        fn emit(&self, out: &mut String) {
            out.push_str(self.kind);
        }
        fn accept(&self, visitor: &mut dyn Visitor) {
            visitor.visit(self);
        }
    }

    #[test]
    fn test_stats_visitor_tallies_nodes_and_retries() {
        let mut stats = StatsVisitor::new();
        let a = FakeProd {
            level: 0,
            retries: 2,
            kind: "query_spec",
        };
        let b = FakeProd {
            level: 1,
            retries: 1,
            kind: "value_expr",
        };
        a.accept(&mut stats);
        b.accept(&mut stats);

        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.max_level, 1);
        assert_eq!(stats.retries, 3);
        assert_eq!(stats.histogram.get("query_spec"), Some(&1));
        assert_eq!(stats.histogram.get("value_expr"), Some(&1));
    }

    #[test]
    fn test_graphml_dumper_emits_nodes_and_edges() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut dumper = GraphmlDumper::new(&mut buf, 0);
            dumper.start().unwrap();
            let root = FakeProd {
                level: 0,
                retries: 0,
                kind: "query_spec",
            };
            let child = FakeProd {
                level: 1,
                retries: 0,
                kind: "value_expr",
            };
            // Post-order: child visited before the parent that contains it.
            child.accept(&mut dumper);
            root.accept(&mut dumper);
            dumper.finish().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("<graph id=\"g0\""));
        assert!(text.contains("query_spec"));
        assert!(text.contains("value_expr"));
        assert!(text.contains("</graph>"));
    }
}
