//! Block-structured symbol table
//!
//! Scopes live in an arena and point at their parent by id. Class member
//! tables are scopes too: a class's member scope has its super-class's
//! member scope as parent, so inherited members resolve by the same walk.

use std::collections::{HashMap, HashSet};

use crate::types::{Type, ValueType};

// ==================== Scopes ====================

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// A scope: bindings plus the `const`/`global`/`nonlocal` name markers
#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    bindings: HashMap<String, Type>,
    consts: HashSet<String>,
    globals: HashSet<String>,
    nonlocals: HashSet<String>,
}

/// Arena of nested scopes
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    /// Create a table holding only the root (global) scope
    pub fn new() -> Self {
        Self { scopes: vec![Scope::default()] }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a new scope below `parent`
    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope { parent, ..Scope::default() });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Bind `name` in `scope`, overwriting any binding already there
    pub fn put(&mut self, scope: ScopeId, name: &str, ty: impl Into<Type>) -> &mut Self {
        let s = &mut self.scopes[scope.0];
        s.bindings.insert(name.to_string(), ty.into());
        self
    }

    /// Look up a name, searching from `scope` upward
    pub fn get(&self, scope: ScopeId, name: &str) -> Option<&Type> {
        let mut scope_id = Some(scope);
        while let Some(id) = scope_id {
            if let Some(ty) = self.scopes[id.0].bindings.get(name) {
                return Some(ty);
            }
            scope_id = self.scopes[id.0].parent;
        }
        None
    }

    /// Look up a name only in `scope`
    pub fn get_own(&self, scope: ScopeId, name: &str) -> Option<&Type> {
        self.scopes[scope.0].bindings.get(name)
    }

    pub fn declare_own(&self, scope: ScopeId, name: &str) -> bool {
        self.get_own(scope, name).is_some()
    }

    pub fn declare(&self, scope: ScopeId, name: &str) -> bool {
        self.get(scope, name).is_some()
    }

    /// Resolve `global name`: the root scope's binding, when it is a
    /// variable.
    pub fn declare_global(&self, scope: ScopeId, name: &str) -> Option<ValueType> {
        let mut root = scope;
        while let Some(parent) = self.parent(root) {
            root = parent;
        }
        self.get_own(root, name).and_then(Type::as_value).cloned()
    }

    /// Resolve `nonlocal name`: the nearest variable binding in an enclosing
    /// non-root scope, skipping scopes that re-home the name themselves.
    pub fn declare_nonlocal(&self, scope: ScopeId, name: &str) -> Option<ValueType> {
        let mut current = self.parent(scope)?;
        while let Some(parent) = self.parent(current) {
            if let Some(ty) = self.get_own(current, name) {
                if !ty.is_func() {
                    if self.is_global(current, name) {
                        return None;
                    }
                    if !self.is_nonlocal(current, name) {
                        return ty.as_value().cloned();
                    }
                }
            }
            current = parent;
        }
        None
    }

    // ==================== Markers ====================

    pub fn set_const(&mut self, scope: ScopeId, name: &str) {
        self.scopes[scope.0].consts.insert(name.to_string());
    }

    pub fn set_global(&mut self, scope: ScopeId, name: &str) {
        self.scopes[scope.0].globals.insert(name.to_string());
    }

    pub fn set_nonlocal(&mut self, scope: ScopeId, name: &str) {
        self.scopes[scope.0].nonlocals.insert(name.to_string());
    }

    /// A name is constant where its nearest binding is marked `const`
    pub fn is_const(&self, scope: ScopeId, name: &str) -> bool {
        let mut scope_id = Some(scope);
        while let Some(id) = scope_id {
            let s = &self.scopes[id.0];
            if s.bindings.contains_key(name) {
                return s.consts.contains(name);
            }
            scope_id = s.parent;
        }
        false
    }

    pub fn is_global(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope.0].globals.contains(name)
    }

    pub fn is_nonlocal(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope.0].nonlocals.contains(name)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FuncType;

    #[test]
    fn test_get_walks_parents() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.put(root, "x", ValueType::int());
        let inner = table.new_scope(Some(root));
        assert_eq!(table.get(inner, "x"), Some(&Type::Value(ValueType::int())));
        assert!(table.declare(inner, "x"));
        assert!(!table.declare_own(inner, "x"));
    }

    #[test]
    fn test_declare_global_rejects_functions_and_classes() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.put(root, "x", ValueType::str());
        table.put(root, "f", FuncType::new(vec![], ValueType::none()));
        table.put(root, "A", Type::Class("A".into()));
        let scope = table.new_scope(Some(root));
        assert_eq!(table.declare_global(scope, "x"), Some(ValueType::str()));
        assert_eq!(table.declare_global(scope, "f"), None);
        assert_eq!(table.declare_global(scope, "A"), None);
        assert_eq!(table.declare_global(scope, "y"), None);
    }

    #[test]
    fn test_declare_nonlocal_skips_root_and_rehomed_names() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.put(root, "g", ValueType::int());
        let outer = table.new_scope(Some(root));
        table.put(outer, "x", ValueType::bool());
        let middle = table.new_scope(Some(outer));
        table.put(middle, "x", ValueType::bool()).set_nonlocal(middle, "x");
        let inner = table.new_scope(Some(middle));

        assert_eq!(table.declare_nonlocal(inner, "x"), Some(ValueType::bool()));
        assert_eq!(table.declare_nonlocal(inner, "g"), None);
        assert_eq!(table.declare_nonlocal(outer, "x"), None);
    }

    #[test]
    fn test_declare_nonlocal_stops_at_global_marker() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.put(root, "x", ValueType::int());
        let outer = table.new_scope(Some(root));
        table.put(outer, "x", ValueType::int()).set_global(outer, "x");
        let inner = table.new_scope(Some(outer));
        assert_eq!(table.declare_nonlocal(inner, "x"), None);
    }

    #[test]
    fn test_const_follows_nearest_binding() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.put(root, "k", ValueType::int()).set_const(root, "k");
        let inner = table.new_scope(Some(root));
        assert!(table.is_const(inner, "k"));
        table.put(inner, "k", ValueType::int());
        assert!(!table.is_const(inner, "k"));
    }
}
