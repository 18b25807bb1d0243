//! The lexical environment threaded through production construction.
//!
//! A [`Scope`] carries the tables available for `FROM`-list selection, the
//! named relations currently visible for column references, a handle to the
//! read-only catalog, and the per-statement alias counter. Nested scopes
//! (subqueries, join conditions) are created by cloning the parent scope:
//! `tables`/`refs`/`catalog` are inherited by value (cheap — `Arc`/`Rc`
//! pointers), while `stmt_seq` is inherited by reference so alias uniqueness
//! holds across the whole statement's tree, not just within one scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::catalog::{AliasedRelation, Catalog, Column, Table};
use crate::types::Type;

type StmtSeq = Rc<RefCell<HashMap<String, u32>>>;

/// Lexical scope: visible tables, in-scope named relations, and the shared
/// per-statement identifier counters.
#[derive(Debug, Clone)]
pub struct Scope {
    pub tables: Vec<Arc<Table>>,
    pub refs: Vec<Rc<AliasedRelation>>,
    pub catalog: Arc<Catalog>,
    stmt_seq: StmtSeq,
}

impl Scope {
    /// Builds the root scope for a fresh top-level statement: all catalog
    /// tables visible, no column references yet.
    pub fn root(catalog: Arc<Catalog>) -> Self {
        let tables = catalog.tables.clone();
        Self {
            tables,
            refs: Vec::new(),
            catalog,
            stmt_seq: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Resets the per-statement alias counters. Called once per top-level
    /// statement so that `ref_0`, `subq_0`, etc. restart at a fresh tree.
    pub fn new_stmt(&mut self) {
        self.stmt_seq = Rc::new(RefCell::new(HashMap::new()));
    }

    /// Generates a unique identifier with the given prefix: `<prefix>_<n>`,
    /// where `n` is a monotonically increasing counter shared by every scope
    /// descended from the same top-level statement.
    pub fn stmt_uid(&self, prefix: &str) -> String {
        let mut seq = self.stmt_seq.borrow_mut();
        let counter = seq.entry(prefix.to_string()).or_insert(0);
        let id = format!("{prefix}_{counter}");
        *counter += 1;
        id
    }

    /// All `(relation, column)` pairs in scope whose column type is
    /// consistent with `required`.
    pub fn refs_of_type(&self, required: &Type) -> Vec<(Rc<AliasedRelation>, Column)> {
        let mut result = Vec::new();
        for rel in &self.refs {
            for col in &rel.columns {
                if required.consistent(&col.ty) {
                    result.push((rel.clone(), col.clone()));
                }
            }
        }
        result
    }

    /// Adds a named relation to column-reference scope.
    pub fn push_ref(&mut self, rel: Rc<AliasedRelation>) {
        self.refs.push(rel);
    }

    /// A fresh child scope: same tables, catalog, and `stmt_seq` (so alias
    /// uniqueness still holds statement-wide), but no inherited column
    /// references. Used wherever the design calls for "a fresh scope"
    /// nested under the current statement — subquery bodies, the union
    /// scope built for `expr_join_cond`, etc.
    pub fn nested(&self) -> Self {
        Self {
            tables: self.tables.clone(),
            refs: Vec::new(),
            catalog: self.catalog.clone(),
            stmt_seq: self.stmt_seq.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Column;

    fn catalog_with_two_tables() -> Arc<Catalog> {
        let mut cat = Catalog::empty();
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
    fn test_root_scope_sees_all_tables() {
        let cat = catalog_with_two_tables();
        let scope = Scope::root(cat);
        assert_eq!(scope.tables.len(), 2);
        assert!(scope.refs.is_empty());
    }

    #[test]
    fn test_stmt_uid_increments_per_prefix() {
        let cat = catalog_with_two_tables();
        let scope = Scope::root(cat);
        assert_eq!(scope.stmt_uid("ref"), "ref_0");
        assert_eq!(scope.stmt_uid("ref"), "ref_1");
        assert_eq!(scope.stmt_uid("subq"), "subq_0");
        assert_eq!(scope.stmt_uid("ref"), "ref_2");
    }

    #[test]
    fn test_stmt_uid_shared_across_clones() {
        // A nested scope derived via clone() shares the same counter map —
        // this is the invariant that makes alias uniqueness hold across an
        // entire query tree, not just one scope.
        let cat = catalog_with_two_tables();
        let scope = Scope::root(cat);
        let nested = scope.clone();
        assert_eq!(scope.stmt_uid("ref"), "ref_0");
        assert_eq!(nested.stmt_uid("ref"), "ref_1");
    }

    #[test]
    fn test_new_stmt_resets_counters() {
        let cat = catalog_with_two_tables();
        let mut scope = Scope::root(cat);
        assert_eq!(scope.stmt_uid("ref"), "ref_0");
        scope.new_stmt();
        assert_eq!(scope.stmt_uid("ref"), "ref_0");
    }

    #[test]
    fn test_nested_shares_stmt_seq_but_not_refs() {
        let cat = catalog_with_two_tables();
        let mut scope = Scope::root(cat);
        let rel = Rc::new(AliasedRelation::new("ref_0", scope.tables[0].columns.clone()));
        scope.push_ref(rel);
        let child = scope.nested();
        assert!(child.refs.is_empty());
        assert_eq!(child.tables.len(), scope.tables.len());
        assert_eq!(scope.stmt_uid("ref"), "ref_0");
        assert_eq!(child.stmt_uid("ref"), "ref_1");
    }

    #[test]
    fn test_refs_of_type_filters_by_consistency() {
        let cat = catalog_with_two_tables();
        let mut scope = Scope::root(cat.clone());
        let rel = Rc::new(AliasedRelation::new(
            "ref_0",
            cat.tables[0].columns.clone(),
        ));
        scope.push_ref(rel);
        let matches = scope.refs_of_type(&cat.inttype);
        assert_eq!(matches.len(), 1);
        assert_eq!(&*matches[0].1.name, "a");
    }
}
