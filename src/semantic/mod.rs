//! Semantic analysis
//!
//! Declaration analysis builds the scopes and the class hierarchy, then type
//! checking annotates every expression with its inferred type. Errors are
//! collected, never thrown: analysis always runs to the end.

pub mod classes;
pub mod declarations;
pub mod diagnostics;
pub mod symbol_table;
pub mod typecheck;

pub use classes::{ClassEntry, ClassId, ClassTable};
pub use declarations::DeclarationAnalyzer;
pub use diagnostics::{Diagnostic, Diagnostics, SemanticError};
pub use symbol_table::{ScopeId, SymbolTable};
pub use typecheck::TypeChecker;

use log::info;

use crate::frontend::ast::{CompilerError, Program};
use crate::types::{FuncType, Type, ValueType};

/// Scopes and classes shared by both analysis phases
#[derive(Debug)]
pub struct Environment {
    pub symbols: SymbolTable,
    pub classes: ClassTable,
}

impl Environment {
    /// Fresh environment with the predefined classes and functions bound in
    /// the global scope
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let classes = ClassTable::with_builtins(&mut symbols);
        let globals = symbols.root();
        for class in ["object", "int", "str", "bool"] {
            symbols.put(globals, class, Type::Class(class.to_string()));
        }
        symbols
            .put(globals, "print", FuncType::new(vec![ValueType::object()], ValueType::none()))
            .put(globals, "len", FuncType::new(vec![ValueType::object()], ValueType::int()))
            .put(globals, "input", FuncType::new(vec![], ValueType::str()));
        Self { symbols, classes }
    }

    pub fn globals(&self) -> ScopeId {
        self.symbols.root()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of analyzing one program
#[derive(Debug)]
pub struct Analysis {
    pub env: Environment,
    pub diagnostics: Diagnostics,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Run declaration analysis then type checking over `program`. The
/// program's error bag is replaced by the diagnostics found.
pub fn analyze(program: &mut Program) -> Analysis {
    let mut env = Environment::new();
    let mut diagnostics = Diagnostics::new();
    DeclarationAnalyzer::new(&mut env, &mut diagnostics).analyze_program(program);
    TypeChecker::new(&mut env, &mut diagnostics).check_program(program);
    program.errors.errors = diagnostics.iter().map(CompilerError::from).collect();
    info!("semantic analysis finished with {} error(s)", diagnostics.len());
    Analysis { env, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::*;

    #[test]
    fn test_predefined_bindings() {
        let env = Environment::new();
        let globals = env.globals();
        assert!(matches!(env.symbols.get(globals, "int"), Some(Type::Class(_))));
        let print = env.symbols.get(globals, "print").and_then(Type::as_func).unwrap();
        assert_eq!(print.params, vec![ValueType::object()]);
        assert!(env.symbols.get(globals, "input").unwrap().is_func());
    }

    #[test]
    fn test_errors_copied_into_program() {
        let mut program = Program::new(vec![], vec![Stmt::ret(None)]);
        let analysis = analyze(&mut program);
        assert!(analysis.has_errors());
        assert_eq!(program.errors.errors.len(), 1);
        assert_eq!(program.errors.errors[0].message, "Return statement cannot appear at the top level");
    }
}
