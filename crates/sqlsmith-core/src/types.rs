//! The process-wide type registry and the type-consistency relation.
//!
//! A [`Type`] is a named descriptor, cheap to clone (an `Arc<str>` name plus a
//! flag). [`Type::consistent`] decides whether a value of type `rvalue` may
//! occupy a slot that demands `self`: by default this is identity equality on
//! the name, but a type registered as *generic* is consistent with any
//! concrete type, modeling Postgres-style pseudotypes (`anyarray` accepting
//! `int4array`). There must be no cycles in the consistency graph; since the
//! only override this registry supports is "generic accepts everything
//! concrete", and generic types are never themselves valid right-hand sides
//! for another generic type's check, cycles cannot arise.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    name: Arc<str>,
    generic: bool,
}

impl Type {
    fn new(name: impl Into<Arc<str>>, generic: bool) -> Self {
        Self {
            name: name.into(),
            generic,
        }
    }

    /// The type's name, e.g. `"INTEGER"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if this type widens to any concrete type (a pseudotype).
    pub fn is_generic(&self) -> bool {
        self.generic
    }

    /// Whether a value of type `rvalue` may fill a slot declared as `self`.
    ///
    /// Equality on name is the default; a generic `self` accepts anything.
    pub fn consistent(&self, rvalue: &Type) -> bool {
        self.generic || self.name == rvalue.name
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Registry mapping type names to descriptors.
///
/// Populated once at schema-load time and treated as immutable afterwards
/// (see the Concurrency & Resource Model: the catalog, of which this registry
/// is part, is read-only to the grammar engine).
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Type>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a concrete type, returning its descriptor. Re-registering
    /// the same name returns the existing descriptor unchanged.
    pub fn register(&mut self, name: impl Into<String>) -> Type {
        let name = name.into();
        self.types
            .entry(name.clone())
            .or_insert_with(|| Type::new(name, false))
            .clone()
    }

    /// Registers a generic (widening) pseudotype.
    pub fn register_generic(&mut self, name: impl Into<String>) -> Type {
        let name = name.into();
        self.types
            .entry(name.clone())
            .or_insert_with(|| Type::new(name, true))
            .clone()
    }

    /// Looks up a previously registered type by name.
    pub fn get(&self, name: &str) -> Option<Type> {
        self.types.get(name).cloned()
    }

    /// All registered types, in registration order is not guaranteed.
    pub fn all(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_consistent_with_itself() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.register("INTEGER");
        assert!(int_ty.consistent(&int_ty));
    }

    #[test]
    fn test_concrete_not_consistent_with_other() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.register("INTEGER");
        let varchar_ty = reg.register("VARCHAR");
        assert!(!int_ty.consistent(&varchar_ty));
    }

    #[test]
    fn test_generic_widens_to_concrete() {
        let mut reg = TypeRegistry::new();
        let any_array = reg.register_generic("anyarray");
        let int_array = reg.register("int4array");
        assert!(any_array.consistent(&int_array));
    }

    #[test]
    fn test_concrete_does_not_widen_to_generic() {
        let mut reg = TypeRegistry::new();
        let any_array = reg.register_generic("anyarray");
        let int_array = reg.register("int4array");
        assert!(!int_array.consistent(&any_array));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut reg = TypeRegistry::new();
        let a = reg.register("INTEGER");
        let b = reg.register("INTEGER");
        assert_eq!(a, b);
    }
}
