//! Named-constant tables and the scoped context that activates them.

use std::collections::HashMap;

use crate::eval::{Resolver, DEFAULT_MAX_PASSES};

/// Case-insensitive map from constant name to its raw text value.
///
/// Redefining a name replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantTable {
    values: HashMap<String, String>,
}

impl ConstantTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a constant.
    pub fn define(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(name.as_ref().trim().to_ascii_lowercase(), value.into());
    }

    /// Look up a constant's text value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.trim().to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Copy every definition of `other` into this table, `other` winning.
    pub fn merge(&mut self, other: &ConstantTable) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// Number of defined constants.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no constants are defined.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Stack of constant tables that are active for expression resolution.
///
/// Tables are pushed with [`ConstantsContext::begin`] and popped when the
/// returned [`ConstantsScope`] is dropped. With nothing pushed, resolution
/// performs no substitution.
#[derive(Debug)]
pub struct ConstantsContext {
    stack: Vec<ConstantTable>,
    max_passes: usize,
}

impl ConstantsContext {
    /// Create an inactive context.
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Override the substitution pass limit used by resolvers.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Activate `table` until the returned scope is dropped.
    pub fn begin(&mut self, table: ConstantTable) -> ConstantsScope<'_> {
        self.stack.push(table);
        ConstantsScope { ctx: self }
    }

    /// Whether any table is active.
    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Resolver over the currently active tables.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.stack).with_max_passes(self.max_passes)
    }
}

impl Default for ConstantsContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard returned by [`ConstantsContext::begin`]; pops its table on drop.
#[derive(Debug)]
pub struct ConstantsScope<'a> {
    ctx: &'a mut ConstantsContext,
}

impl ConstantsScope<'_> {
    /// Resolver over every table active in this scope.
    pub fn resolver(&self) -> Resolver<'_> {
        self.ctx.resolver()
    }

    /// Activate another table nested inside this scope.
    pub fn begin(&mut self, table: ConstantTable) -> ConstantsScope<'_> {
        self.ctx.begin(table)
    }
}

impl Drop for ConstantsScope<'_> {
    fn drop(&mut self) {
        self.ctx.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_last_wins() {
        let mut table = ConstantTable::new();
        table.define("Radius", "4");
        table.define("RADIUS", "10");
        assert_eq!(table.get("radius"), Some("10"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_scope_pops_on_drop() {
        let mut table = ConstantTable::new();
        table.define("SIZE", "8");

        let mut ctx = ConstantsContext::new();
        {
            let scope = ctx.begin(table);
            assert_eq!(scope.resolver().resolve("SIZE").unwrap(), 8);
        }
        assert!(!ctx.is_active());
        // Inactive: the name is no longer substituted and evaluates to 0.
        assert_eq!(ctx.resolver().resolve("SIZE").unwrap(), 0);
    }

    #[test]
    fn test_nested_scope_shadows_outer() {
        let mut outer = ConstantTable::new();
        outer.define("A", "1");
        outer.define("B", "2");
        let mut inner = ConstantTable::new();
        inner.define("A", "5");

        let mut ctx = ConstantsContext::new();
        let mut scope = ctx.begin(outer);
        {
            let nested = scope.begin(inner);
            let r = nested.resolver();
            assert_eq!(r.resolve("A").unwrap(), 5);
            assert_eq!(r.resolve("B").unwrap(), 2);
        }
        assert_eq!(scope.resolver().resolve("A").unwrap(), 1);
    }

    #[test]
    fn test_merge() {
        let mut a = ConstantTable::new();
        a.define("X", "1");
        let mut b = ConstantTable::new();
        b.define("x", "2");
        b.define("Y", "3");
        a.merge(&b);
        assert_eq!(a.get("X"), Some("2"));
        assert_eq!(a.get("y"), Some("3"));
    }
}
