// Symbol Directories
// Function and variable tables built once from the AST

use crate::compiler::address_space::{Address, UNUSED_ADDRESS};
use crate::compiler::types::Type;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct VariableEntry {
    pub id: String,
    pub ty: Type,
    /// Declaration order within the owning directory
    pub position: usize,
    /// Assigned by the address pass
    pub address: Option<Address>,
    pub line: usize,
}

impl VariableEntry {
    pub fn new(id: impl Into<String>, ty: Type, line: usize) -> Self {
        VariableEntry {
            id: id.into(),
            ty,
            position: 0,
            address: None,
            line,
        }
    }
}

/// Name -> variable table for one scope (a function or the globals)
#[derive(Debug, Clone, Default)]
pub struct VariableDirectory {
    table: IndexMap<String, VariableEntry>,
}

impl VariableDirectory {
    pub fn new() -> Self {
        VariableDirectory {
            table: IndexMap::new(),
        }
    }

    /// Insert `entry`, stamping its declaration position.
    /// Returns false if the id is already declared.
    pub fn add(&mut self, mut entry: VariableEntry) -> bool {
        if self.table.contains_key(&entry.id) {
            return false;
        }
        entry.position = self.table.len();
        self.table.insert(entry.id.clone(), entry);
        true
    }

    pub fn get(&self, id: &str) -> Option<&VariableEntry> {
        self.table.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut VariableEntry> {
        self.table.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Entries in declaration order
    pub fn entries(&self) -> Vec<&VariableEntry> {
        let mut entries: Vec<&VariableEntry> = self.table.values().collect();
        entries.sort_by_key(|e| e.position);
        entries
    }

    pub fn ids_in_order(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.id.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub id: String,
    pub return_type: Type,
    pub params: Vec<Type>,
    pub vars: VariableDirectory,
    /// Instruction index of the first quad, -1 until emitted
    pub entry_address: Address,
    /// Local slots the activation uses
    pub footprint: usize,
    pub line: usize,
}

impl FunctionEntry {
    pub fn new(id: impl Into<String>, return_type: Type, line: usize) -> Self {
        FunctionEntry {
            id: id.into(),
            return_type,
            params: Vec::new(),
            vars: VariableDirectory::new(),
            entry_address: UNUSED_ADDRESS,
            footprint: 0,
            line,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionDirectory {
    table: IndexMap<String, FunctionEntry>,
}

impl FunctionDirectory {
    pub fn new() -> Self {
        FunctionDirectory {
            table: IndexMap::new(),
        }
    }

    /// Returns false if a function with the same id already exists
    pub fn add(&mut self, entry: FunctionEntry) -> bool {
        if self.table.contains_key(&entry.id) {
            return false;
        }
        self.table.insert(entry.id.clone(), entry);
        true
    }

    pub fn get(&self, id: &str) -> Option<&FunctionEntry> {
        self.table.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut FunctionEntry> {
        self.table.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.table.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FunctionEntry> {
        self.table.values_mut()
    }
}

/// Local-then-global name resolution for one function body
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub locals: &'a VariableDirectory,
    pub globals: &'a VariableDirectory,
}

impl<'a> Scope<'a> {
    pub fn new(locals: &'a VariableDirectory, globals: &'a VariableDirectory) -> Self {
        Scope { locals, globals }
    }

    pub fn lookup(&self, id: &str) -> Option<&'a VariableEntry> {
        self.locals.get(id).or_else(|| self.globals.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::types::ElementType;
    use test_log::test;

    #[test]
    fn test_variable_add_rejects_duplicates() {
        let mut dir = VariableDirectory::new();
        assert!(dir.add(VariableEntry::new("a", Type::int(), 1)));
        assert!(dir.add(VariableEntry::new("b", Type::float(), 2)));
        assert!(!dir.add(VariableEntry::new("a", Type::bool(), 3)));
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.get("a").map(|e| e.ty.clone()), Some(Type::int()));
    }

    #[test]
    fn test_positions_follow_declaration_order() {
        let mut dir = VariableDirectory::new();
        for name in ["z", "m", "a"] {
            dir.add(VariableEntry::new(name, Type::basic(ElementType::Char), 1));
        }
        assert_eq!(dir.ids_in_order(), vec!["z", "m", "a"]);
        assert_eq!(dir.get("a").map(|e| e.position), Some(2));
    }

    #[test]
    fn test_function_directory() {
        let mut funcs = FunctionDirectory::new();
        assert!(funcs.add(FunctionEntry::new("main", Type::void(), 1)));
        assert!(!funcs.add(FunctionEntry::new("main", Type::int(), 5)));
        let main = funcs.get("main").unwrap();
        assert_eq!(main.entry_address, -1);
        assert!(funcs.get("other").is_none());
    }

    #[test]
    fn test_scope_prefers_locals() {
        let mut globals = VariableDirectory::new();
        globals.add(VariableEntry::new("x", Type::int(), 1));
        globals.add(VariableEntry::new("g", Type::int(), 1));
        let mut locals = VariableDirectory::new();
        locals.add(VariableEntry::new("x", Type::float(), 2));

        let scope = Scope::new(&locals, &globals);
        assert_eq!(scope.lookup("x").map(|e| e.ty.clone()), Some(Type::float()));
        assert!(scope.lookup("g").is_some());
        assert!(scope.lookup("missing").is_none());
    }
}
