//! Declaration analysis
//!
//! Populates the global scope, one local scope per function and one member
//! scope per class. Each declarative region is scanned in three passes:
//! discovery (duplicates, placeholders, `global`/`nonlocal`), variable
//! types, then nested functions and classes.

use std::collections::HashMap;

use log::debug;

use crate::frontend::ast::*;
use crate::semantic::classes::ClassId;
use crate::semantic::diagnostics::{Diagnostics, SemanticError};
use crate::semantic::symbol_table::ScopeId;
use crate::semantic::Environment;
use crate::types::{FuncType, Type, ValueType};

/// Walks declarations and installs their types in the environment
pub struct DeclarationAnalyzer<'a> {
    env: &'a mut Environment,
    diags: &'a mut Diagnostics,
    current: ScopeId,
    /// Classes registered in pass 1 with the super-class they resolved to
    /// there; a redeclared class name is not registered again
    declared_classes: HashMap<NodeId, (ClassId, ClassId)>,
}

impl<'a> DeclarationAnalyzer<'a> {
    pub fn new(env: &'a mut Environment, diags: &'a mut Diagnostics) -> Self {
        let current = env.globals();
        Self { env, diags, current, declared_classes: HashMap::new() }
    }

    /// Analyze all top-level declarations
    pub fn analyze_program(&mut self, program: &mut Program) {
        // Pass 1: discovery
        for decl in &program.declarations {
            self.check_duplicate(decl.identifier());
            let name = decl.name();
            match decl {
                Declaration::VarDef(_) => {
                    self.env.symbols.put(self.current, name, ValueType::object());
                }
                Declaration::ConstVarDef(_) => {
                    self.env.symbols.put(self.current, name, ValueType::object());
                    self.env.symbols.set_const(self.current, name);
                }
                Declaration::FuncDef(_) => {
                    self.env.symbols.put(self.current, name, placeholder_func());
                }
                Declaration::ClassDef(def) => {
                    let super_id = self.check_super_class(&def.super_class);
                    if !self.env.classes.contains(name) {
                        let id = self.env.classes.declare_class(&mut self.env.symbols, name);
                        self.declared_classes.insert(def.id, (id, super_id));
                    }
                    self.env.symbols.put(self.current, name, Type::Class(name.to_string()));
                }
                Declaration::GlobalDecl(_) | Declaration::NonLocalDecl(_) => {}
            }
        }

        // Pass 2: variable types
        for decl in &program.declarations {
            if let Declaration::VarDef(def) | Declaration::ConstVarDef(def) = decl {
                let ty = self.resolve_annotation(&def.var.annotation);
                self.env.symbols.put(self.current, decl.name(), ty);
            }
        }

        // Pass 3: functions and classes
        for decl in &mut program.declarations {
            match decl {
                Declaration::FuncDef(def) => {
                    let ty = self.analyze_func(def);
                    self.env.symbols.put(self.current, &def.name.name, ty);
                }
                Declaration::ClassDef(def) => {
                    self.analyze_class(def);
                    let name = def.name.name.clone();
                    self.env.symbols.put(self.current, &name, Type::Class(name.clone()));
                }
                _ => {}
            }
        }
        debug!("declaration analysis done: {} diagnostics", self.diags.len());
    }

    fn check_duplicate(&mut self, ident: &Identifier) {
        if self.env.symbols.declare_own(self.current, &ident.name) {
            self.diags.report(
                ident.id,
                ident.span,
                SemanticError::DuplicateDeclaration(ident.name.clone()),
            );
        }
    }

    /// Validate a super-class reference; an invalid one falls back to
    /// `object`.
    fn check_super_class(&mut self, super_class: &Identifier) -> ClassId {
        let name = &super_class.name;
        let error = if !self.env.symbols.declare(self.current, name) {
            SemanticError::SuperClassNotDefined(name.clone())
        } else {
            match self.env.classes.lookup(name) {
                None => SemanticError::SuperClassNotAClass(name.clone()),
                Some(_) if ValueType::class(name.as_str()).is_special() => {
                    SemanticError::CannotExtendSpecial(name.clone())
                }
                Some(id) => return id,
            }
        };
        self.diags.report(super_class.id, super_class.span, error);
        self.env.classes.object()
    }

    /// Type denoted by an annotation; unknown class names are reported on
    /// the innermost annotation node.
    fn resolve_annotation(&mut self, annotation: &TypeAnnotation) -> ValueType {
        let mut innermost = annotation;
        while let TypeAnnotationKind::ListType { element_type } = &innermost.kind {
            innermost = element_type;
        }
        if let TypeAnnotationKind::ClassType { class_name } = &innermost.kind {
            if !self.env.classes.contains(class_name) {
                self.diags.report(
                    innermost.id,
                    innermost.span,
                    SemanticError::InvalidAnnotation(class_name.clone()),
                );
            }
        }
        ValueType::from_annotation(annotation)
    }

    /// Build the local scope of `def` and return its signature
    fn analyze_func(&mut self, def: &mut FuncDef) -> FuncType {
        let scope = self.env.symbols.new_scope(Some(self.current));
        let saved = std::mem::replace(&mut self.current, scope);

        let mut params = Vec::with_capacity(def.params.len());
        for param in &def.params {
            let ident = &param.identifier;
            let ty = self.resolve_annotation(&param.annotation);
            params.push(ty.clone());
            if self.env.classes.contains(&ident.name) {
                self.diags.report(ident.id, ident.span, SemanticError::ShadowsClassName(ident.name.clone()));
                continue;
            }
            self.check_duplicate(ident);
            self.env.symbols.put(scope, &ident.name, ty);
        }

        // Pass 1: discovery
        for decl in &def.declarations {
            let ident = decl.identifier();
            let name = ident.name.as_str();
            self.check_duplicate(ident);
            let rebinding = matches!(decl, Declaration::GlobalDecl(_) | Declaration::NonLocalDecl(_));
            if self.env.classes.contains(name) && !rebinding {
                self.diags.report(ident.id, ident.span, SemanticError::ShadowsClassName(name.to_string()));
                continue;
            }
            match decl {
                Declaration::VarDef(_) => {
                    self.env.symbols.put(scope, name, ValueType::object());
                }
                Declaration::ConstVarDef(_) => {
                    self.env.symbols.put(scope, name, ValueType::object());
                    self.env.symbols.set_const(scope, name);
                }
                Declaration::FuncDef(_) => {
                    self.env.symbols.put(scope, name, placeholder_func());
                }
                Declaration::GlobalDecl(_) => match self.env.symbols.declare_global(scope, name) {
                    Some(ty) => {
                        self.env.symbols.put(scope, name, ty);
                        self.env.symbols.set_global(scope, name);
                        let root = self.env.symbols.root();
                        if self.env.symbols.is_const(root, name) {
                            self.env.symbols.set_const(scope, name);
                        }
                    }
                    None => {
                        self.diags.report(ident.id, ident.span, SemanticError::NotAGlobal(name.to_string()));
                    }
                },
                Declaration::NonLocalDecl(_) => match self.env.symbols.declare_nonlocal(scope, name) {
                    Some(ty) => {
                        let enclosing_const = self.env.symbols.is_const(saved, name);
                        self.env.symbols.put(scope, name, ty);
                        self.env.symbols.set_nonlocal(scope, name);
                        if enclosing_const {
                            self.env.symbols.set_const(scope, name);
                        }
                    }
                    None => {
                        self.diags.report(ident.id, ident.span, SemanticError::NotANonlocal(name.to_string()));
                    }
                },
                // Classes only appear at the top level
                Declaration::ClassDef(_) => {}
            }
        }

        // Pass 2: variable types
        for decl in &def.declarations {
            if let Declaration::VarDef(var) | Declaration::ConstVarDef(var) = decl {
                if self.env.classes.contains(decl.name()) {
                    continue;
                }
                let ty = self.resolve_annotation(&var.var.annotation);
                self.env.symbols.put(scope, decl.name(), ty);
            }
        }

        // Pass 3: nested functions
        for decl in &mut def.declarations {
            if let Declaration::FuncDef(nested) = decl {
                if self.env.classes.contains(&nested.name.name) {
                    continue;
                }
                let ty = self.analyze_func(nested);
                self.env.symbols.put(scope, &nested.name.name, ty);
            }
        }

        let ret = self.resolve_annotation(&def.return_type);
        def.scope = Some(scope);
        self.current = saved;
        FuncType::new(params, ret)
    }

    /// Link the class under its super-class and fill its member scope
    fn analyze_class(&mut self, def: &mut ClassDef) {
        let Some(&(class_id, super_id)) = self.declared_classes.get(&def.id) else {
            return;
        };
        let members = self.env.classes.set_super(&mut self.env.symbols, class_id, super_id);
        let class_type = ValueType::class(def.name.name.as_str());

        for decl in &mut def.declarations {
            let ident = decl.identifier().clone();
            let name = ident.name.as_str();
            if self.env.symbols.declare_own(members, name) {
                self.diags.report(ident.id, ident.span, SemanticError::DuplicateDeclaration(name.to_string()));
                continue;
            }
            let inherited = self.env.symbols.get(members, name).cloned();
            let redefines_attribute = match &inherited {
                Some(ty) => ty.as_value().is_some() || decl.is_variable(),
                None => false,
            };
            if redefines_attribute {
                self.diags.report(ident.id, ident.span, SemanticError::RedefinedAttribute(name.to_string()));
                continue;
            }

            let ty: Type = match decl {
                Declaration::VarDef(var) | Declaration::ConstVarDef(var) => {
                    self.resolve_annotation(&var.var.annotation).into()
                }
                Declaration::FuncDef(method) => {
                    let signature = self.analyze_func(method);
                    if let Some(Type::Func(parent)) = &inherited {
                        if !signature.can_override(parent) {
                            self.diags.report(ident.id, ident.span, SemanticError::BadOverride(name.to_string()));
                            continue;
                        }
                    }
                    if signature.params.first() != Some(&class_type) {
                        self.diags.report(ident.id, ident.span, SemanticError::BadReceiver(name.to_string()));
                    }
                    signature.into()
                }
                _ => continue,
            };
            self.env.symbols.put(members, name, ty);
        }
        debug!("class {} analyzed", def.name.name);
    }
}

/// Stand-in binding for a function until its signature is known
fn placeholder_func() -> FuncType {
    FuncType::new(Vec::new(), ValueType::object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::analyze;
    use pretty_assertions::assert_eq;

    fn int() -> TypeAnnotation {
        TypeAnnotation::class("int")
    }

    fn errors_of(declarations: Vec<Declaration>, statements: Vec<Stmt>) -> Vec<String> {
        let mut program = Program::new(declarations, statements);
        analyze(&mut program).diagnostics.messages()
    }

    fn method(name: &str, class: &str, ret: TypeAnnotation, body: Vec<Stmt>) -> Declaration {
        let this = TypedVar::new("self", TypeAnnotation::class(class));
        FuncDef::new(name, vec![this], ret, vec![], body).into()
    }

    #[test]
    fn test_duplicate_global() {
        let errors = errors_of(
            vec![Declaration::var("x", int(), Expr::int(1)), Declaration::var("x", int(), Expr::int(2))],
            vec![],
        );
        assert_eq!(errors, vec!["Duplicate declaration of identifier in same scope: x"]);
    }

    #[test]
    fn test_super_class_checks() {
        let errors = errors_of(
            vec![
                Declaration::var("v", int(), Expr::int(0)),
                ClassDef::new("A", "Missing", vec![]).into(),
                ClassDef::new("B", "v", vec![]).into(),
                ClassDef::new("C", "int", vec![]).into(),
            ],
            vec![],
        );
        assert_eq!(
            errors,
            vec![
                "Super-class not defined: Missing",
                "Super-class must be a class: v",
                "Cannot extend special class: int",
            ]
        );
    }

    #[test]
    fn test_class_cannot_extend_itself() {
        let errors = errors_of(vec![ClassDef::new("A", "A", vec![]).into()], vec![]);
        assert_eq!(errors, vec!["Super-class not defined: A"]);
    }

    #[test]
    fn test_local_cannot_shadow_class() {
        let f = FuncDef::new(
            "f",
            vec![TypedVar::new("str", int())],
            TypeAnnotation::none(),
            vec![Declaration::var("object", int(), Expr::int(0))],
            vec![],
        );
        let errors = errors_of(vec![f.into()], vec![]);
        assert_eq!(errors, vec!["Cannot shadow class name: str", "Cannot shadow class name: object"]);
    }

    #[test]
    fn test_global_and_nonlocal_resolution() {
        let inner = FuncDef::new(
            "inner",
            vec![],
            TypeAnnotation::none(),
            vec![Declaration::nonlocal("y"), Declaration::nonlocal("g")],
            vec![],
        );
        let outer = FuncDef::new(
            "outer",
            vec![],
            TypeAnnotation::none(),
            vec![
                Declaration::global("g"),
                Declaration::global("outer"),
                Declaration::var("y", int(), Expr::int(0)),
                inner.into(),
            ],
            vec![],
        );
        let errors = errors_of(vec![Declaration::var("g", int(), Expr::int(0)), outer.into()], vec![]);
        assert_eq!(errors, vec!["Not a global variable: outer", "Not a nonlocal variable: g"]);
    }

    #[test]
    fn test_invalid_annotation_in_list() {
        let list = TypeAnnotation::list(TypeAnnotation::class("Nope"));
        let errors = errors_of(vec![Declaration::var("x", list, Expr::none())], vec![]);
        assert_eq!(errors, vec!["Invalid type annotation; there is no class named: Nope"]);
    }

    #[test]
    fn test_override_with_different_signature() {
        let a = ClassDef::new(
            "A",
            "object",
            vec![method("f", "A", int(), vec![Stmt::ret(Some(Expr::int(1)))])],
        );
        let b = ClassDef::new(
            "B",
            "A",
            vec![method("f", "B", TypeAnnotation::class("bool"), vec![Stmt::ret(Some(Expr::bool(true)))])],
        );
        let errors = errors_of(vec![a.into(), b.into()], vec![]);
        assert_eq!(errors, vec!["Method overridden with different type signature: f"]);
    }

    #[test]
    fn test_attribute_redefinition_and_receiver() {
        let a = ClassDef::new("A", "object", vec![Declaration::var("x", int(), Expr::int(0))]);
        let b = ClassDef::new(
            "B",
            "A",
            vec![
                Declaration::var("x", int(), Expr::int(1)),
                method("g", "A", TypeAnnotation::none(), vec![]),
                Declaration::var("__init__", int(), Expr::int(0)),
            ],
        );
        let errors = errors_of(vec![a.into(), b.into()], vec![]);
        assert_eq!(
            errors,
            vec![
                "Cannot re-define attribute: x",
                "First parameter of the following method must be of the enclosing class: g",
                "Cannot re-define attribute: __init__",
            ]
        );
    }

    #[test]
    fn test_global_keeps_const_marker() {
        let f = FuncDef::new(
            "f",
            vec![],
            TypeAnnotation::none(),
            vec![Declaration::global("k")],
            vec![Stmt::assign(vec![Expr::id("k")], Expr::int(2))],
        );
        let errors = errors_of(vec![Declaration::constant("k", int(), Expr::int(1)), f.into()], vec![]);
        assert_eq!(errors, vec!["Cannot assign to a constant variable: k"]);
    }
}
