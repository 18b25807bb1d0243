//! Boolean expressions: comparisons, AND/OR/NOT, and truth-valued leaves.
//!
//! Every `BoolExpr` has static type `BOOLEAN` by construction — there is no
//! `ty` field to check because there is only one possible value.

use crate::ast::expr::ValueExpr;
use crate::ast::{with_retry, Production};
use crate::error::ProductionError;
use crate::rng::Rng;
use crate::scope::Scope;
use crate::visitor::Visitor;

#[derive(Debug)]
pub enum BoolExprKind {
    Comparison {
        op: &'static str,
        lhs: Box<ValueExpr>,
        rhs: Box<ValueExpr>,
    },
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Not(Box<BoolExpr>),
    TruthLiteral(bool),
}

/// A boolean-typed expression node.
#[derive(Debug)]
pub struct BoolExpr {
    level: usize,
    retries: u32,
    pub kind: BoolExprKind,
}

const COMPARISON_OPS: &[&str] = &["<", "<=", ">", ">=", "=", "<>"];

impl BoolExpr {
    /// Builds a boolean expression, retrying variant selection on recoverable
    /// failure (per §4.4: "subject to the same retry harness").
    pub fn factory(scope: &Scope, rng: &mut Rng, level: usize) -> Result<BoolExpr, ProductionError> {
        with_retry(|retries| Self::build(scope, rng, level, retries))
    }

    fn build(scope: &Scope, rng: &mut Rng, level: usize, retries: u32) -> Result<BoolExpr, ProductionError> {
        let recurse_ok = level < 2 + rng.d6() as usize;
        let roll = rng.d6();

        let kind = if !recurse_ok || roll <= 2 {
            Self::build_comparison(scope, rng, level)
                .unwrap_or(BoolExprKind::TruthLiteral(rng.d6() > 3))
        } else {
            match roll {
                3 => BoolExprKind::Not(Box::new(BoolExpr::factory(scope, rng, level + 1)?)),
                4 => BoolExprKind::And(
                    Box::new(BoolExpr::factory(scope, rng, level + 1)?),
                    Box::new(BoolExpr::factory(scope, rng, level + 1)?),
                ),
                5 => BoolExprKind::Or(
                    Box::new(BoolExpr::factory(scope, rng, level + 1)?),
                    Box::new(BoolExpr::factory(scope, rng, level + 1)?),
                ),
                _ => Self::build_comparison(scope, rng, level)
                    .unwrap_or(BoolExprKind::TruthLiteral(rng.d6() > 3)),
            }
        };

        Ok(BoolExpr {
            level,
            retries,
            kind,
        })
    }

    fn build_comparison(scope: &Scope, rng: &mut Rng, level: usize) -> Result<BoolExprKind, ProductionError> {
        let ty = rng.pick(&scope.catalog.types)?.clone();
        let op = *rng.pick(COMPARISON_OPS)?;
        let lhs = ValueExpr::factory(scope, rng, level + 1, Some(&ty))?;
        let rhs = ValueExpr::factory(scope, rng, level + 1, Some(&ty))?;
        Ok(BoolExprKind::Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }
}

impl Production for BoolExpr {
    fn level(&self) -> usize {
        self.level
    }

    fn retries(&self) -> u32 {
        self.retries
    }

    fn kind(&self) -> &'static str {
        match &self.kind {
            BoolExprKind::Comparison { .. } => "comparison",
            BoolExprKind::And(..) => "bool_and",
            BoolExprKind::Or(..) => "bool_or",
            BoolExprKind::Not(_) => "bool_not",
            BoolExprKind::TruthLiteral(_) => "truth_literal",
        }
    }

    fn emit(&self, out: &mut String) {
        match &self.kind {
            BoolExprKind::Comparison { op, lhs, rhs } => {
                out.push('(');
                lhs.emit(out);
                out.push(' ');
                out.push_str(op);
                out.push(' ');
                rhs.emit(out);
                out.push(')');
            }
            BoolExprKind::And(a, b) => {
                out.push('(');
                a.emit(out);
                out.push_str(" and ");
                b.emit(out);
                out.push(')');
            }
            BoolExprKind::Or(a, b) => {
                out.push('(');
                a.emit(out);
                out.push_str(" or ");
                b.emit(out);
                out.push(')');
            }
            BoolExprKind::Not(inner) => {
                out.push_str("not (");
                inner.emit(out);
                out.push(')');
            }
            BoolExprKind::TruthLiteral(b) => {
                out.push_str(if *b { "true" } else { "false" });
            }
        }
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        match &self.kind {
            BoolExprKind::Comparison { lhs, rhs, .. } => {
                lhs.accept(visitor);
                rhs.accept(visitor);
            }
            BoolExprKind::And(a, b) | BoolExprKind::Or(a, b) => {
                a.accept(visitor);
                b.accept(visitor);
            }
            BoolExprKind::Not(inner) => inner.accept(visitor),
            BoolExprKind::TruthLiteral(_) => {}
        }
        visitor.visit(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AliasedRelation, Catalog, Column, Table};
    use crate::scope::Scope;
    use std::rc::Rc;
    use std::sync::Arc;

    fn scope_with_one_table() -> Scope {
        let mut cat = Catalog::empty().with_builtin_mysql_routines();
        cat.add_table(Table::new(
            "t1",
            "t1",
            vec![Column::new("a", cat.inttype.clone())],
            true,
            true,
        ));
        let mut scope = Scope::root(Arc::new(cat));
        let rel = Rc::new(AliasedRelation::new("ref_0", scope.tables[0].columns.clone()));
        scope.push_ref(rel);
        scope
    }

    #[test]
    fn test_bool_expr_always_emits_nonempty_sql() {
        let scope = scope_with_one_table();
        let mut rng = Rng::seed_from_u64(99);
        let expr = BoolExpr::factory(&scope, &mut rng, 0).unwrap();
        assert!(!expr.to_sql().is_empty());
    }

    #[test]
    fn test_deep_level_forces_leaf() {
        let scope = scope_with_one_table();
        let mut rng = Rng::seed_from_u64(5);
        let expr = BoolExpr::factory(&scope, &mut rng, 100).unwrap();
        assert!(matches!(
            expr.kind,
            BoolExprKind::Comparison { .. } | BoolExprKind::TruthLiteral(_)
        ));
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let scope = scope_with_one_table();
        let mut rng1 = Rng::seed_from_u64(3);
        let mut rng2 = Rng::seed_from_u64(3);
        let e1 = BoolExpr::factory(&scope, &mut rng1, 0).unwrap();
        let e2 = BoolExpr::factory(&scope, &mut rng2, 0).unwrap();
        assert_eq!(e1.to_sql(), e2.to_sql());
    }
}
