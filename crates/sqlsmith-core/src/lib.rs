//! The typed grammar engine behind `sqlsmith`: given a populated [`Catalog`],
//! [`ast::query_spec::statement_factory`] synthesizes one randomly generated,
//! type-respecting `SELECT` statement per call. This crate owns the RNG, the
//! type-consistency relation, the catalog model, lexical scope, and the
//! grammar productions themselves; it knows nothing about how a schema was
//! loaded or where generated SQL gets sent — those are the host's job (see
//! the `sqlsmith-cli` crate).

pub mod ast;
pub mod catalog;
pub mod error;
pub mod rng;
pub mod scope;
pub mod types;
pub mod visitor;

pub use ast::query_spec::{statement_factory, QuerySpec};
pub use ast::Production;
pub use catalog::{AliasedRelation, Catalog, Column, Op, Routine, Table};
pub use error::ProductionError;
pub use rng::Rng;
pub use scope::Scope;
pub use types::{Type, TypeRegistry};
pub use visitor::{GraphmlDumper, StatsVisitor, Visitor};
