//! Catalog model: tables, columns, operators, and routines.
//!
//! The catalog is populated once by an external schema loader (the
//! `sqlsmith-cli` host talks to a live MySQL-compatible database; tests build
//! catalogs by hand) and is read-only to the grammar engine from that point
//! on. See the Concurrency & Resource Model: the catalog is immutable after
//! schema load, so sharing it across nested scopes via `Arc` needs no
//! synchronization beyond the `Arc` itself.

use std::sync::Arc;

use crate::types::{Type, TypeRegistry};

/// A single column: a name and its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: Arc<str>,
    pub ty: Type,
}

impl Column {
    pub fn new(name: impl Into<Arc<str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A base table or view, as reported by the schema loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub schema: Arc<str>,
    pub name: Arc<str>,
    pub columns: Vec<Column>,
    pub insertable: bool,
    pub base_table: bool,
}

impl Table {
    pub fn new(
        schema: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        columns: Vec<Column>,
        insertable: bool,
        base_table: bool,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns,
            insertable,
            base_table,
        }
    }

    /// `schema.name`, the qualified identifier used to reference this table
    /// in a FROM clause.
    pub fn ident(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// A named relation currently visible for column resolution: an alias bound
/// over some underlying column list.
///
/// The source implementation has the alias *borrow* the underlying
/// relation's column list. Modeling that borrow in Rust would tie every
/// `AliasedRelation` to the lifetime of the table or derived subquery it
/// wraps, which is awkward once the relation is threaded through an owned,
/// long-lived [`crate::scope::Scope`]. Columns are small (a name and a
/// type), so this clones them into the alias instead; the alias's column
/// list is immutable after construction either way, so the observable
/// behavior is identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasedRelation {
    pub alias: Arc<str>,
    pub columns: Vec<Column>,
}

impl AliasedRelation {
    pub fn new(alias: impl Into<Arc<str>>, columns: Vec<Column>) -> Self {
        Self {
            alias: alias.into(),
            columns,
        }
    }

    pub fn ident(&self) -> &str {
        &self.alias
    }
}

/// A binary operator: `lhs OP rhs -> result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub name: Arc<str>,
    pub lhs: Type,
    pub rhs: Type,
    pub result: Type,
}

impl Op {
    pub fn new(name: impl Into<Arc<str>>, lhs: Type, rhs: Type, result: Type) -> Self {
        Self {
            name: name.into(),
            lhs,
            rhs,
            result,
        }
    }
}

/// A scalar or aggregate routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routine {
    pub schema: Arc<str>,
    pub name: Arc<str>,
    pub argtypes: Vec<Type>,
    pub restype: Type,
}

impl Routine {
    pub fn new(
        schema: impl Into<Arc<str>>,
        name: impl Into<Arc<str>>,
        argtypes: Vec<Type>,
        restype: Type,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            argtypes,
            restype,
        }
    }

    pub fn ident(&self) -> String {
        if self.schema.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }
}

/// Sentinel type handles every schema loader must provide, plus the
/// enumerable list of concrete types expression grammar can draw from when no
/// required type is given.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub tables: Vec<Arc<Table>>,
    pub types: Vec<Type>,
    pub operators: Vec<Op>,
    pub routines: Vec<Routine>,
    pub aggregates: Vec<Routine>,
    pub booltype: Type,
    pub inttype: Type,
    pub doubletype: Type,
    pub varchartype: Type,
    pub internaltype: Type,
    pub arraytype: Type,
    pub registry: TypeRegistry,
}

impl Catalog {
    /// Builds an empty catalog with just the sentinel types registered — the
    /// minimal viable catalog, useful as a starting point for a custom schema
    /// loader or for tests.
    pub fn empty() -> Self {
        let mut registry = TypeRegistry::new();
        let booltype = registry.register("BOOLEAN");
        let inttype = registry.register("INTEGER");
        let doubletype = registry.register("DOUBLE");
        let varchartype = registry.register("VARCHAR");
        let internaltype = registry.register("internal");
        let arraytype = registry.register("ARRAY");

        Self {
            tables: Vec::new(),
            types: vec![
                booltype.clone(),
                inttype.clone(),
                doubletype.clone(),
                varchartype.clone(),
            ],
            operators: Vec::new(),
            routines: Vec::new(),
            aggregates: Vec::new(),
            booltype,
            inttype,
            doubletype,
            varchartype,
            internaltype,
            arraytype,
            registry,
        }
    }

    /// Seeds the comparison operators, scalar routines, and aggregates that
    /// `original_source/mysql.cc`'s `schema_mysql` constructor registers by
    /// hand for a MySQL-compatible target.
    pub fn with_builtin_mysql_routines(mut self) -> Self {
        let int_ty = self.inttype.clone();
        let bool_ty = self.booltype.clone();
        let double_ty = self.doubletype.clone();
        let varchar_ty = self.varchartype.clone();

        for name in ["<", "<=", ">", ">=", "=", "<>"] {
            self.operators.push(Op::new(
                name,
                int_ty.clone(),
                int_ty.clone(),
                bool_ty.clone(),
            ));
        }

        let mut scalar = |name: &str, restype: Type, argtypes: Vec<Type>| {
            self.routines.push(Routine::new("", name, argtypes, restype));
        };
        scalar("abs", int_ty.clone(), vec![int_ty.clone()]);
        scalar("hex", varchar_ty.clone(), vec![varchar_ty.clone()]);
        scalar("length", int_ty.clone(), vec![varchar_ty.clone()]);
        scalar("lower", varchar_ty.clone(), vec![varchar_ty.clone()]);
        scalar("ltrim", varchar_ty.clone(), vec![varchar_ty.clone()]);
        scalar("rtrim", varchar_ty.clone(), vec![varchar_ty.clone()]);
        scalar("trim", varchar_ty.clone(), vec![varchar_ty.clone()]);
        scalar("round", int_ty.clone(), vec![double_ty.clone()]);
        scalar("upper", varchar_ty.clone(), vec![varchar_ty.clone()]);
        scalar(
            "instr",
            int_ty.clone(),
            vec![varchar_ty.clone(), varchar_ty.clone()],
        );
        scalar(
            "substr",
            varchar_ty.clone(),
            vec![varchar_ty.clone(), int_ty.clone()],
        );
        self.routines.push(Routine::new(
            "",
            "substr",
            vec![varchar_ty.clone(), int_ty.clone(), int_ty.clone()],
            varchar_ty.clone(),
        ));

        self.aggregates
            .push(Routine::new("", "avg", vec![int_ty.clone()], int_ty.clone()));
        self.aggregates.push(Routine::new(
            "",
            "avg",
            vec![double_ty.clone()],
            double_ty.clone(),
        ));
        self.aggregates
            .push(Routine::new("", "count", vec![int_ty.clone()], int_ty.clone()));
        self.aggregates.push(Routine::new(
            "",
            "max",
            vec![double_ty.clone()],
            double_ty.clone(),
        ));
        self.aggregates
            .push(Routine::new("", "max", vec![int_ty.clone()], int_ty.clone()));
        self.aggregates.push(Routine::new(
            "",
            "sum",
            vec![double_ty.clone()],
            double_ty.clone(),
        ));
        self.aggregates
            .push(Routine::new("", "sum", vec![int_ty.clone()], int_ty.clone()));

        self
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.push(Arc::new(table));
    }
}
