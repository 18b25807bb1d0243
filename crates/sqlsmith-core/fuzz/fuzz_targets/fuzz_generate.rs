//! Fuzz target for the statement factory.
//!
//! This tests that `statement_factory` never panics, regardless of seed or
//! catalog shape — only ever returns `Ok` or a recoverable `ProductionError`.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sqlsmith_core::catalog::{Catalog, Column, Table};
use sqlsmith_core::{statement_factory, Rng, Scope};
use std::sync::Arc;

/// Structured input: an RNG seed plus a small, arbitrary catalog shape, so
/// fuzzing explores both dice sequences and schema edge cases (zero tables,
/// zero columns, lopsided type distributions) rather than just the seed.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    seed: u64,
    tables: Vec<FuzzTable>,
}

#[derive(Debug, Arbitrary)]
struct FuzzTable {
    name_idx: u8,
    columns: Vec<u8>,
}

fn type_for(tag: u8, cat: &Catalog) -> sqlsmith_core::Type {
    match tag % 4 {
        0 => cat.inttype.clone(),
        1 => cat.varchartype.clone(),
        2 => cat.doubletype.clone(),
        _ => cat.booltype.clone(),
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut cat = Catalog::empty().with_builtin_mysql_routines();
    for (i, t) in input.tables.iter().take(8).enumerate() {
        let columns = t
            .columns
            .iter()
            .take(8)
            .enumerate()
            .map(|(j, tag)| Column::new(format!("c{j}"), type_for(*tag, &cat)))
            .collect::<Vec<_>>();
        cat.add_table(Table::new(
            "t1",
            format!("t{}_{}", i, t.name_idx),
            columns,
            true,
            true,
        ));
    }

    let mut scope = Scope::root(Arc::new(cat));
    let mut rng = Rng::seed_from_u64(input.seed);
    // Either a statement or a recoverable error is acceptable; a panic is not.
    let _ = statement_factory(&mut scope, &mut rng);
});
