//! Class arena
//!
//! Classes are referenced by [`ClassId`]; each entry owns the id of its
//! member scope in the symbol table and the id of its super-class.

use std::collections::HashMap;

use crate::semantic::symbol_table::{ScopeId, SymbolTable};
use crate::types::type_system::{BOOL, EMPTY, INT, NONE, OBJECT, STR};
use crate::types::{ClassHierarchy, FuncType, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub name: String,
    pub super_class: Option<ClassId>,
    pub members: ScopeId,
}

/// All classes known to the program, predefined ones included
#[derive(Debug)]
pub struct ClassTable {
    entries: Vec<ClassEntry>,
    by_name: HashMap<String, ClassId>,
}

impl ClassTable {
    /// Install `object`, `int`, `str`, `bool`, `<None>` and `<Empty>`.
    pub fn with_builtins(symbols: &mut SymbolTable) -> Self {
        let mut table = Self { entries: Vec::new(), by_name: HashMap::new() };
        let object_members = symbols.new_scope(None);
        symbols.put(
            object_members,
            "__init__",
            FuncType::new(vec![ValueType::object()], ValueType::none()),
        );
        let object = table.insert(OBJECT, None, object_members);
        for name in [INT, STR, BOOL, NONE, EMPTY] {
            let members = symbols.new_scope(Some(object_members));
            table.insert(name, Some(object), members);
        }
        table
    }

    fn insert(&mut self, name: &str, super_class: Option<ClassId>, members: ScopeId) -> ClassId {
        let id = ClassId(self.entries.len());
        self.entries.push(ClassEntry { name: name.to_string(), super_class, members });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Register a user class. Its member scope starts out parentless until
    /// [`ClassTable::set_super`] links it.
    pub fn declare_class(&mut self, symbols: &mut SymbolTable, name: &str) -> ClassId {
        let members = symbols.new_scope(None);
        self.insert(name, None, members)
    }

    /// Link `class` below `super_class`: a fresh member scope whose parent is
    /// the super-class's member scope.
    pub fn set_super(&mut self, symbols: &mut SymbolTable, class: ClassId, super_class: ClassId) -> ScopeId {
        let parent_members = self.entries[super_class.0].members;
        let members = symbols.new_scope(Some(parent_members));
        let entry = &mut self.entries[class.0];
        entry.super_class = Some(super_class);
        entry.members = members;
        members
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn entry(&self, id: ClassId) -> &ClassEntry {
        &self.entries[id.0]
    }

    pub fn object(&self) -> ClassId {
        ClassId(0)
    }

    /// Member scope of the class a value type names, if any.
    pub fn members_of(&self, ty: &ValueType) -> Option<ScopeId> {
        let id = self.lookup(ty.class_name()?)?;
        Some(self.entry(id).members)
    }
}

impl ClassHierarchy for ClassTable {
    fn super_class_of(&self, class: &str) -> Option<&str> {
        let entry = self.entry(self.lookup(class)?);
        entry.super_class.map(|id| self.entry(id).name.as_str())
    }
}
