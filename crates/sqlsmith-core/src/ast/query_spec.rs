//! FROM lists, SELECT lists, and query specifications — §4.3.7 through
//! §4.3.10, the top of the grammar.

use std::rc::Rc;

use crate::ast::bool_expr::BoolExpr;
use crate::ast::expr::ValueExpr;
use crate::ast::table_ref::TableRef;
use crate::ast::{with_retry, Production};
use crate::catalog::{AliasedRelation, Column};
use crate::error::ProductionError;
use crate::rng::Rng;
use crate::scope::Scope;
use crate::types::Type;
use crate::visitor::Visitor;

/// §4.3.7: a single top-level table_ref. The source always builds exactly
/// one; the comma-separated grammar in §6.3 and the emitter below already
/// support more, so a multi-element FROM list is a documented extension
/// point (§9), not dead code — `table_refs` is a `Vec` for that reason even
/// though `factory` only ever pushes one element.
#[derive(Debug)]
pub struct FromClause {
    level: usize,
    retries: u32,
    pub refs: Vec<Rc<AliasedRelation>>,
    pub table_refs: Vec<TableRef>,
}

impl FromClause {
    pub fn factory(scope: &Scope, rng: &mut Rng, level: usize) -> Result<FromClause, ProductionError> {
        with_retry(|retries| {
            let tref = TableRef::factory(scope, rng, level + 1)?;
            Ok(FromClause {
                level,
                retries,
                refs: tref.refs.clone(),
                table_refs: vec![tref],
            })
        })
    }
}

impl Production for FromClause {
    fn level(&self) -> usize {
        self.level
    }
    fn retries(&self) -> u32 {
        self.retries
    }
    fn kind(&self) -> &'static str {
        "from_clause"
    }
    fn emit(&self, out: &mut String) {
        out.push_str("from ");
        for (i, tref) in self.table_refs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            tref.emit(out);
        }
    }
    fn accept(&self, visitor: &mut dyn Visitor) {
        for tref in &self.table_refs {
            tref.accept(visitor);
        }
        visitor.visit(self);
    }
}

/// §4.3.8: repeated value_exprs, each bound to a synthesized `cN` alias,
/// continuing while `d6() > 1` (expected ≈1.2 extra columns beyond the
/// first — a geometric tail). Builds the `derived_columns` a containing
/// `table_subquery` exposes as its relation's column list.
#[derive(Debug)]
pub struct SelectList {
    level: usize,
    retries: u32,
    pub items: Vec<(ValueExpr, String)>,
    pub derived_columns: Vec<Column>,
}

impl SelectList {
    pub fn factory(scope: &Scope, rng: &mut Rng, level: usize) -> Result<SelectList, ProductionError> {
        with_retry(|retries| Self::build(scope, rng, level, retries))
    }

    fn build(scope: &Scope, rng: &mut Rng, level: usize, retries: u32) -> Result<SelectList, ProductionError> {
        let mut items = Vec::new();
        let mut derived_columns = Vec::new();
        let mut n: u32 = 0;
        loop {
            let expr = ValueExpr::factory(scope, rng, level + 1, None)?;
            let alias = format!("c{n}");
            derived_columns.push(Column::new(alias.clone(), expr.ty.clone()));
            items.push((expr, alias));
            n += 1;
            if !(rng.d6() > 1) {
                break;
            }
        }
        Ok(SelectList {
            level,
            retries,
            items,
            derived_columns,
        })
    }
}

impl Production for SelectList {
    fn level(&self) -> usize {
        self.level
    }
    fn retries(&self) -> u32 {
        self.retries
    }
    fn kind(&self) -> &'static str {
        "select_list"
    }
    fn emit(&self, out: &mut String) {
        for (i, (expr, alias)) in self.items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            expr.emit(out);
            out.push_str(" as ");
            out.push_str(alias);
        }
    }
    fn accept(&self, visitor: &mut dyn Visitor) {
        for (expr, _) in &self.items {
            expr.accept(visitor);
        }
        visitor.visit(self);
    }
}

/// §4.3.9: `select [distinct] <cols> from <refs> where <pred> [limit n]`.
#[derive(Debug)]
pub struct QuerySpec {
    level: usize,
    retries: u32,
    pub distinct: bool,
    pub select_list: SelectList,
    pub from_clause: FromClause,
    pub where_clause: Box<BoolExpr>,
    pub limit: Option<u32>,
}

impl QuerySpec {
    pub fn factory(scope: &Scope, rng: &mut Rng, level: usize) -> Result<QuerySpec, ProductionError> {
        with_retry(|retries| Self::build(scope, rng, level, retries))
    }

    fn build(scope: &Scope, rng: &mut Rng, level: usize, retries: u32) -> Result<QuerySpec, ProductionError> {
        // from_clause first so its refs populate scope before select_list /
        // where are built (§4.3.9, §5 ordering guarantee).
        let mut inner_scope = scope.nested();
        let from_clause = FromClause::factory(&inner_scope, rng, level + 1)?;
        for rel in &from_clause.refs {
            inner_scope.push_ref(rel.clone());
        }
        let select_list = SelectList::factory(&inner_scope, rng, level + 1)?;
        let where_clause = BoolExpr::factory(&inner_scope, rng, level + 1)?;

        // DISTINCT with probability 1/100.
        let distinct = rng.d100() == 1;
        // LIMIT with probability 5/6 (`d6() > 1`), value in [2, 200].
        let limit = if rng.d6() > 1 {
            Some(rng.d100() + rng.d100())
        } else {
            None
        };

        Ok(QuerySpec {
            level,
            retries,
            distinct,
            select_list,
            from_clause,
            where_clause: Box::new(where_clause),
            limit,
        })
    }

    /// §4.3.4: builds a scalar-subquery body whose select list is a single
    /// column of `required` type, so the enclosing `value_expr` can embed
    /// `(SELECT ...)` wherever a scalar of that type is needed.
    pub fn scalar_subquery(
        scope: &Scope,
        rng: &mut Rng,
        level: usize,
        required: &Type,
    ) -> Result<QuerySpec, ProductionError> {
        with_retry(|retries| Self::build_scalar(scope, rng, level, required, retries))
    }

    fn build_scalar(
        scope: &Scope,
        rng: &mut Rng,
        level: usize,
        required: &Type,
        retries: u32,
    ) -> Result<QuerySpec, ProductionError> {
        let mut inner_scope = scope.nested();
        let from_clause = FromClause::factory(&inner_scope, rng, level + 1)?;
        for rel in &from_clause.refs {
            inner_scope.push_ref(rel.clone());
        }
        let expr = ValueExpr::factory(&inner_scope, rng, level + 1, Some(required))?;
        let alias = "c0".to_string();
        let select_list = SelectList {
            level: level + 1,
            retries: 0,
            derived_columns: vec![Column::new(alias.clone(), expr.ty.clone())],
            items: vec![(expr, alias)],
        };
        let where_clause = BoolExpr::factory(&inner_scope, rng, level + 1)?;

        Ok(QuerySpec {
            level,
            retries,
            distinct: false,
            select_list,
            from_clause,
            where_clause: Box::new(where_clause),
            limit: None,
        })
    }

    /// The column list a `table_subquery` wrapping this query exposes to its
    /// enclosing scope, a.k.a. the derived table (§3, `select_list` entry).
    pub fn derived_columns(&self) -> &[Column] {
        &self.select_list.derived_columns
    }
}

impl Production for QuerySpec {
    fn level(&self) -> usize {
        self.level
    }
    fn retries(&self) -> u32 {
        self.retries
    }
    fn kind(&self) -> &'static str {
        "query_spec"
    }
    fn emit(&self, out: &mut String) {
        out.push_str("select ");
        if self.distinct {
            out.push_str("distinct ");
        }
        self.select_list.emit(out);
        out.push(' ');
        self.from_clause.emit(out);
        out.push_str(" where ");
        self.where_clause.emit(out);
        if let Some(n) = self.limit {
            out.push_str(&format!(" limit {n}"));
        }
    }
    fn accept(&self, visitor: &mut dyn Visitor) {
        self.from_clause.accept(visitor);
        self.select_list.accept(visitor);
        self.where_clause.accept(visitor);
        visitor.visit(self);
    }
}

/// §4.3.10: resets the per-statement alias counters, then builds a
/// top-level `query_spec` with no parent. `QuerySpec::factory`'s own retry
/// harness already restarts the whole statement on an unrecovered failure,
/// since `build` re-rolls every choice point from scratch on each attempt.
pub fn statement_factory(scope: &mut Scope, rng: &mut Rng) -> Result<QuerySpec, ProductionError> {
    scope.new_stmt();
    QuerySpec::factory(scope, rng, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Table};
    use std::sync::Arc;

    fn catalog_two_tables() -> Arc<Catalog> {
        let mut cat = Catalog::empty().with_builtin_mysql_routines();
        cat.add_table(Table::new(
            "t1",
            "t1",
            vec![
                Column::new("a", cat.inttype.clone()),
                Column::new("b", cat.varchartype.clone()),
            ],
            true,
            true,
        ));
        cat.add_table(Table::new(
            "t1",
            "t2",
            vec![
                Column::new("a", cat.inttype.clone()),
                Column::new("c", cat.doubletype.clone()),
            ],
            true,
            true,
        ));
        Arc::new(cat)
    }

    #[test]
    fn test_statement_factory_produces_well_formed_select() {
        let cat = catalog_two_tables();
        let mut scope = Scope::root(cat);
        let mut rng = Rng::seed_from_u64(1);
        let query = statement_factory(&mut scope, &mut rng).unwrap();
        let sql = query.to_sql();
        assert!(sql.starts_with("select "));
        assert!(sql.contains(" from "));
        assert!(sql.contains(" where "));
        assert!(!query.select_list.items.is_empty());
    }

    #[test]
    fn test_statement_factory_is_deterministic() {
        let cat = catalog_two_tables();
        let mut scope1 = Scope::root(cat.clone());
        let mut scope2 = Scope::root(cat);
        let mut rng1 = Rng::seed_from_u64(7);
        let mut rng2 = Rng::seed_from_u64(7);
        let q1 = statement_factory(&mut scope1, &mut rng1).unwrap();
        let q2 = statement_factory(&mut scope2, &mut rng2).unwrap();
        assert_eq!(q1.to_sql(), q2.to_sql());
    }

    #[test]
    fn test_limit_bound_when_present() {
        let cat = catalog_two_tables();
        for seed in 0..200u64 {
            let mut scope = Scope::root(cat.clone());
            let mut rng = Rng::seed_from_u64(seed);
            let query = statement_factory(&mut scope, &mut rng).unwrap();
            if let Some(n) = query.limit {
                assert!((2..=200).contains(&n));
            }
        }
    }

    #[test]
    fn test_new_stmt_resets_aliases_between_statements() {
        let cat = catalog_two_tables();
        let mut scope = Scope::root(cat);
        let mut rng = Rng::seed_from_u64(3);
        let q1 = statement_factory(&mut scope, &mut rng).unwrap();
        let q2 = statement_factory(&mut scope, &mut rng).unwrap();
        // Both statements start their alias counters at ref_0 again.
        assert!(q1.to_sql().contains("ref_0"));
        assert!(q2.to_sql().contains("ref_0"));
    }

    #[test]
    fn test_empty_catalog_table_or_query_name_fails_cleanly() {
        let cat = Arc::new(Catalog::empty().with_builtin_mysql_routines());
        let mut scope = Scope::root(cat);
        let mut rng = Rng::seed_from_u64(1);
        // With zero tables, from_clause can never succeed; the statement
        // factory must return an error, not panic.
        assert!(statement_factory(&mut scope, &mut rng).is_err());
    }
}
