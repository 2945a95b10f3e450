//! Type checking
//!
//! Assigns an inferred type to every expression and reports type errors.
//! Every check produces a best-effort type so that analysis continues past
//! errors.

use log::{debug, warn};

use crate::frontend::ast::*;
use crate::semantic::diagnostics::{Diagnostics, SemanticError};
use crate::semantic::symbol_table::ScopeId;
use crate::semantic::Environment;
use crate::types::{can_assign, is_subclass, join, FuncType, Type, ValueType};
use crate::utils::Span;

/// Expression and statement type checker
pub struct TypeChecker<'a> {
    env: &'a mut Environment,
    diags: &'a mut Diagnostics,
    current: ScopeId,
    /// Declared return types of the enclosing functions, innermost last
    returns: Vec<ValueType>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(env: &'a mut Environment, diags: &'a mut Diagnostics) -> Self {
        let current = env.globals();
        Self { env, diags, current, returns: Vec::new() }
    }

    pub fn check_program(&mut self, program: &mut Program) {
        for decl in &mut program.declarations {
            self.check_declaration(decl);
        }
        for stmt in &mut program.statements {
            self.check_stmt(stmt);
        }
        debug!("type checking done: {} diagnostics", self.diags.len());
    }

    /// Run `f` with `scope` as the current scope, restoring the previous one
    /// afterwards.
    fn with_scope<R>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.current, scope);
        let result = f(self);
        self.current = saved;
        result
    }

    fn error(&mut self, node: NodeId, span: Span, error: SemanticError) {
        self.diags.report(node, span, error);
    }

    // ==================== Declarations ====================

    fn check_declaration(&mut self, decl: &mut Declaration) {
        match decl {
            Declaration::VarDef(def) => self.check_var_def(def, false),
            Declaration::ConstVarDef(def) => self.check_var_def(def, true),
            Declaration::FuncDef(def) => self.check_func(def),
            Declaration::ClassDef(def) => {
                for member in &mut def.declarations {
                    self.check_declaration(member);
                }
            }
            Declaration::GlobalDecl(_) | Declaration::NonLocalDecl(_) => {}
        }
    }

    fn check_var_def(&mut self, def: &mut VarDef, constant: bool) {
        let declared = ValueType::from_annotation(&def.var.annotation);
        let value = self.check_expr(&mut def.value);
        let ok = if constant && !value.is_none() {
            is_subclass(&self.env.classes, &value, &declared)
        } else {
            can_assign(&self.env.classes, &value, &declared)
        };
        if !ok {
            self.error(
                def.id,
                def.span,
                SemanticError::TypeMismatch { expected: declared.to_string(), got: value.to_string() },
            );
        }
    }

    fn check_func(&mut self, def: &mut FuncDef) {
        let Some(scope) = def.scope else {
            warn!("function {} has no scope; declaration analysis skipped it", def.name.name);
            return;
        };
        let ret = ValueType::from_annotation(&def.return_type);
        self.with_scope(scope, |checker| {
            checker.returns.push(ret.clone());
            for decl in &mut def.declarations {
                checker.check_declaration(decl);
            }
            for stmt in &mut def.statements {
                checker.check_stmt(stmt);
            }
            checker.returns.pop();
        });
        let none_allowed = can_assign(&self.env.classes, &ValueType::none(), &ret);
        if !none_allowed && !returns_on_all_paths(&def.statements) {
            self.error(def.name.id, def.name.span, SemanticError::MissingReturn(def.name.name.clone()));
        }
    }

    // ==================== Statements ====================

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        let (node, span) = (stmt.id, stmt.span);
        match &mut stmt.kind {
            StmtKind::ExprStmt { expr } => {
                self.check_expr(expr);
            }
            StmtKind::AssignStmt { targets, value } => self.check_assign(node, span, targets, value),
            StmtKind::IfStmt { condition, then_body, else_body } => {
                self.check_condition(node, span, condition);
                for s in then_body.iter_mut().chain(else_body.iter_mut()) {
                    self.check_stmt(s);
                }
            }
            StmtKind::WhileStmt { condition, body } => {
                self.check_condition(node, span, condition);
                for s in body {
                    self.check_stmt(s);
                }
            }
            StmtKind::ForStmt { identifier, iterable, body } => {
                let iterable_ty = self.check_expr(iterable);
                let element = if iterable_ty.is_str() {
                    Some(ValueType::str())
                } else if let Some(element) = iterable_ty.element_type() {
                    Some(element.clone())
                } else {
                    self.error(node, span, SemanticError::NotIterable(iterable_ty.to_string()));
                    None
                };
                self.check_target_binding(node, span, &identifier.name);
                let var_ty = self.lookup_variable(identifier.id, identifier.span, &identifier.name);
                identifier.inferred_type = Some(var_ty.clone().into());
                if let Some(element) = element {
                    if !can_assign(&self.env.classes, &element, &var_ty) {
                        self.error(
                            node,
                            span,
                            SemanticError::TypeMismatch { expected: var_ty.to_string(), got: element.to_string() },
                        );
                    }
                }
                for s in body {
                    self.check_stmt(s);
                }
            }
            StmtKind::ReturnStmt { value } => {
                let value_ty = value.as_mut().map(|v| self.check_expr(v));
                let Some(expected) = self.returns.last().cloned() else {
                    self.error(node, span, SemanticError::TopLevelReturn);
                    return;
                };
                match value_ty {
                    Some(ty) if !can_assign(&self.env.classes, &ty, &expected) => {
                        self.error(
                            node,
                            span,
                            SemanticError::TypeMismatch { expected: expected.to_string(), got: ty.to_string() },
                        );
                    }
                    None if !can_assign(&self.env.classes, &ValueType::none(), &expected) => {
                        self.error(node, span, SemanticError::MissingReturnValue(expected.to_string()));
                    }
                    _ => {}
                }
            }
        }
    }

    fn check_condition(&mut self, node: NodeId, span: Span, condition: &mut Expr) {
        let ty = self.check_expr(condition);
        if !ty.is_bool() {
            self.error(node, span, SemanticError::BadCondition(ty.to_string()));
        }
    }

    /// A name being assigned must be bound in the current scope and not
    /// constant.
    fn check_target_binding(&mut self, node: NodeId, span: Span, name: &str) {
        if !self.env.symbols.declare_own(self.current, name) {
            self.error(node, span, SemanticError::UndeclaredAssignTarget(name.to_string()));
        } else if self.env.symbols.is_const(self.current, name) {
            self.error(node, span, SemanticError::AssignToConstant(name.to_string()));
        }
    }

    fn check_assign(&mut self, node: NodeId, span: Span, targets: &mut [Expr], value: &mut Expr) {
        let value_ty = self.check_expr(value);
        for target in targets.iter_mut() {
            if let Some(name) = target.as_identifier() {
                let name = name.to_string();
                self.check_target_binding(node, span, &name);
            }
            let target_ty = self.check_expr(target);
            if let ExprKind::IndexExpr { list, .. } = &target.kind {
                if let Some(list_ty) = list.value_type() {
                    if !list_ty.is_list() {
                        let message = SemanticError::NotAListTarget(list_ty.to_string());
                        self.error(target.id, target.span, message);
                    }
                }
            }
            if !can_assign(&self.env.classes, &value_ty, &target_ty) {
                self.error(
                    node,
                    span,
                    SemanticError::TypeMismatch { expected: target_ty.to_string(), got: value_ty.to_string() },
                );
            }
        }
        if targets.len() > 1 && value_ty == ValueType::list(ValueType::none()) {
            self.error(node, span, SemanticError::MultiAssignNoneList);
        }
    }

    // ==================== Expressions ====================

    /// Infer, record and return the type of `expr`
    pub fn check_expr(&mut self, expr: &mut Expr) -> ValueType {
        let (node, span) = (expr.id, expr.span);
        let ty = match &mut expr.kind {
            ExprKind::IntegerLiteral { .. } => ValueType::int(),
            ExprKind::BooleanLiteral { .. } => ValueType::bool(),
            ExprKind::StringLiteral { .. } => ValueType::str(),
            ExprKind::NoneLiteral => ValueType::none(),
            ExprKind::Identifier { name } => {
                let name = name.clone();
                self.lookup_variable(node, span, &name)
            }
            ExprKind::BinaryExpr { left, operator, right } => {
                let op = *operator;
                let l = self.check_expr(left);
                let r = self.check_expr(right);
                self.check_binary(node, span, op, &l, &r)
            }
            ExprKind::UnaryExpr { operator, operand } => {
                let op = *operator;
                let t = self.check_expr(operand);
                let (ok, result) = match op {
                    UnaryOp::Neg => (t.is_int(), ValueType::int()),
                    UnaryOp::Not => (t.is_bool(), ValueType::bool()),
                };
                if !ok {
                    self.error(node, span, SemanticError::UnaryOperand { op: op.to_string(), operand: t.to_string() });
                }
                result
            }
            ExprKind::IfExpr { condition, then_expr, else_expr } => {
                self.check_condition(node, span, condition);
                let t = self.check_expr(then_expr);
                let e = self.check_expr(else_expr);
                join(&self.env.classes, &t, &e)
            }
            ExprKind::ListExpr { elements } => {
                let mut element_ty: Option<ValueType> = None;
                for element in elements.iter_mut() {
                    let t = self.check_expr(element);
                    element_ty = Some(match element_ty {
                        None => t,
                        Some(acc) => join(&self.env.classes, &acc, &t),
                    });
                }
                element_ty.map(ValueType::list).unwrap_or_else(ValueType::empty)
            }
            ExprKind::ForListExpr { element, identifier, iterable } => {
                let iterable_ty = self.check_expr(iterable);
                let item = match iterable_ty.element_type() {
                    Some(item) => item.clone(),
                    None => {
                        self.error(node, span, SemanticError::NotIterable(iterable_ty.to_string()));
                        ValueType::object()
                    }
                };
                if self.env.classes.contains(&identifier.name) {
                    let message = SemanticError::ShadowsClassName(identifier.name.clone());
                    self.error(identifier.id, identifier.span, message);
                }
                identifier.inferred_type = Some(item.clone().into());
                let scope = self.env.symbols.new_scope(Some(self.current));
                self.env.symbols.put(scope, &identifier.name, item);
                let element_ty = self.with_scope(scope, |checker| checker.check_expr(element));
                ValueType::list(element_ty)
            }
            ExprKind::IndexExpr { list, index } => {
                let list_ty = self.check_expr(list);
                let index_ty = self.check_expr(index);
                if !index_ty.is_int() {
                    self.error(node, span, SemanticError::NonIntegerIndex(index_ty.to_string()));
                }
                if list_ty.is_str() {
                    ValueType::str()
                } else if let Some(element) = list_ty.element_type() {
                    element.clone()
                } else {
                    self.error(node, span, SemanticError::NotIndexable(list_ty.to_string()));
                    ValueType::object()
                }
            }
            ExprKind::MemberExpr { object, member } => {
                let object_ty = self.check_expr(object);
                match self.member_type(&object_ty, &member.name).and_then(|t| t.as_value().cloned()) {
                    Some(ty) => ty,
                    None => {
                        let message = SemanticError::NoSuchAttribute {
                            member: member.name.clone(),
                            class: owner_name(&object_ty),
                        };
                        self.error(node, span, message);
                        ValueType::object()
                    }
                }
            }
            ExprKind::CallExpr { function, args } => {
                let arg_types: Vec<ValueType> = args.iter_mut().map(|a| self.check_expr(a)).collect();
                match self.env.symbols.get(self.current, &function.name).cloned() {
                    Some(Type::Class(class)) => {
                        let class_ty = ValueType::class(class.as_str());
                        if let Some(init) = self.member_type(&class_ty, "__init__").and_then(|t| t.as_func().cloned()) {
                            self.check_args(node, span, receiver_free(&init), &arg_types, 1);
                        }
                        class_ty
                    }
                    Some(Type::Func(func)) => {
                        function.inferred_type = Some(func.clone().into());
                        self.check_args(node, span, &func.params, &arg_types, 0);
                        func.ret
                    }
                    _ => {
                        self.error(node, span, SemanticError::NotCallable(function.name.clone()));
                        ValueType::object()
                    }
                }
            }
            ExprKind::MethodCallExpr { method, args } => {
                let ExprKind::MemberExpr { object, member } = &mut method.kind else {
                    warn!("method call target is not a member expression");
                    return ValueType::object();
                };
                let object_ty = self.check_expr(object);
                let member_name = member.name.clone();
                let arg_types: Vec<ValueType> = args.iter_mut().map(|a| self.check_expr(a)).collect();
                match self.member_type(&object_ty, &member_name).and_then(|t| t.as_func().cloned()) {
                    Some(func) => {
                        method.inferred_type = Some(func.clone().into());
                        self.check_args(node, span, receiver_free(&func), &arg_types, 1);
                        func.ret
                    }
                    None => {
                        let message = SemanticError::NoSuchMethod { member: member_name, class: owner_name(&object_ty) };
                        self.error(node, span, message);
                        ValueType::object()
                    }
                }
            }
        };
        expr.inferred_type = Some(ty.clone().into());
        ty
    }

    fn check_binary(&mut self, node: NodeId, span: Span, op: BinOp, l: &ValueType, r: &ValueType) -> ValueType {
        let (ok, result) = match op {
            BinOp::Sub | BinOp::Mul | BinOp::FloorDiv | BinOp::Mod => (l.is_int() && r.is_int(), ValueType::int()),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => (l.is_int() && r.is_int(), ValueType::bool()),
            BinOp::Eq | BinOp::Ne => (l == r && l.is_special(), ValueType::bool()),
            BinOp::And | BinOp::Or => (l.is_bool() && r.is_bool(), ValueType::bool()),
            BinOp::Is => (!l.is_special() && !r.is_special(), ValueType::bool()),
            BinOp::Add => match (l.element_type(), r.element_type()) {
                (Some(le), Some(re)) => (true, ValueType::list(join(&self.env.classes, le, re))),
                _ if l.is_int() && r.is_int() => (true, ValueType::int()),
                _ if l.is_str() && r.is_str() => (true, ValueType::str()),
                _ if l.is_int() || r.is_int() => (false, ValueType::int()),
                _ => (false, ValueType::object()),
            },
        };
        if !ok {
            let message = SemanticError::BinaryOperands { op: op.to_string(), left: l.to_string(), right: r.to_string() };
            self.error(node, span, message);
        }
        result
    }

    /// Check call arguments against parameter types. `first_index` is the
    /// number reported for the first parameter.
    fn check_args(&mut self, node: NodeId, span: Span, params: &[ValueType], args: &[ValueType], first_index: usize) {
        if params.len() != args.len() {
            self.error(node, span, SemanticError::ArgumentCount { expected: params.len(), got: args.len() });
            return;
        }
        for (i, (param, arg)) in params.iter().zip(args).enumerate() {
            if !can_assign(&self.env.classes, arg, param) {
                let message = SemanticError::ArgumentType {
                    expected: param.to_string(),
                    got: arg.to_string(),
                    index: i + first_index,
                };
                self.error(node, span, message);
                return;
            }
        }
    }

    fn lookup_variable(&mut self, node: NodeId, span: Span, name: &str) -> ValueType {
        match self.env.symbols.get(self.current, name) {
            Some(Type::Value(ty)) => ty.clone(),
            _ => {
                self.error(node, span, SemanticError::NotAVariable(name.to_string()));
                ValueType::object()
            }
        }
    }

    /// Attribute or method `name` of the class `ty` names, inherited ones
    /// included.
    fn member_type(&self, ty: &ValueType, name: &str) -> Option<Type> {
        let members = self.env.classes.members_of(ty)?;
        self.env.symbols.get(members, name).cloned()
    }
}

/// Parameters of a method signature without the receiver
fn receiver_free(func: &FuncType) -> &[ValueType] {
    func.params.get(1..).unwrap_or(&[])
}

/// An `if` covers when both branches cover, a `return` covers, and a block
/// covers when any of its statements does.
pub fn returns_on_all_paths(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::ReturnStmt { .. } => true,
        StmtKind::IfStmt { then_body, else_body, .. } => {
            returns_on_all_paths(then_body) && returns_on_all_paths(else_body)
        }
        _ => false,
    })
}

/// Class named in attribute and method lookup errors. List types have no
/// class name and are printed whole.
fn owner_name(ty: &ValueType) -> String {
    ty.class_name().map(str::to_string).unwrap_or_else(|| ty.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::analyze;
    use pretty_assertions::assert_eq;

    fn int() -> TypeAnnotation {
        TypeAnnotation::class("int")
    }

    fn errors_of(program: &mut Program) -> Vec<String> {
        analyze(program).diagnostics.messages()
    }

    fn func(name: &str, params: Vec<TypedVar>, ret: TypeAnnotation, body: Vec<Stmt>) -> Declaration {
        FuncDef::new(name, params, ret, vec![], body).into()
    }

    #[test]
    fn test_assignment_mismatch() {
        let mut program = Program::new(
            vec![Declaration::var("x", int(), Expr::int(1))],
            vec![Stmt::assign(vec![Expr::id("x")], Expr::str("hi"))],
        );
        assert_eq!(errors_of(&mut program), vec!["Expected type `int`; got type `str`"]);
    }

    #[test]
    fn test_missing_return() {
        let mut program = Program::new(vec![func("foo", vec![], int(), vec![])], vec![]);
        assert_eq!(
            errors_of(&mut program),
            vec!["All paths in this function/method must have a return statement: foo"]
        );
    }

    #[test]
    fn test_if_else_return_covers() {
        let body = vec![Stmt::if_else(
            Expr::bool(true),
            vec![Stmt::ret(Some(Expr::int(1)))],
            vec![Stmt::ret(Some(Expr::int(2)))],
        )];
        let mut program = Program::new(vec![func("f", vec![], int(), body)], vec![]);
        assert!(errors_of(&mut program).is_empty());

        let loop_only = vec![Stmt::while_loop(Expr::bool(true), vec![Stmt::ret(Some(Expr::int(1)))])];
        assert!(!returns_on_all_paths(&loop_only));
    }

    #[test]
    fn test_inferred_types_recorded() {
        let mut program = Program::new(
            vec![],
            vec![Stmt::expr(Expr::binary(
                Expr::list(vec![Expr::int(1)]),
                BinOp::Add,
                Expr::list(vec![Expr::none()]),
            ))],
        );
        assert!(errors_of(&mut program).is_empty());
        let StmtKind::ExprStmt { expr } = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        assert_eq!(expr.value_type(), Some(&ValueType::list(ValueType::object())));
    }

    #[test]
    fn test_binary_operand_errors_fall_back() {
        let mut program = Program::new(
            vec![],
            vec![
                Stmt::expr(Expr::binary(Expr::int(1), BinOp::Add, Expr::str("a"))),
                Stmt::expr(Expr::binary(Expr::int(1), BinOp::Eq, Expr::bool(true))),
            ],
        );
        assert_eq!(
            errors_of(&mut program),
            vec![
                "Cannot apply operator `+` on types `int` and `str`",
                "Cannot apply operator `==` on types `int` and `bool`",
            ]
        );
        let StmtKind::ExprStmt { expr } = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        assert_eq!(expr.value_type(), Some(&ValueType::int()));
    }

    #[test]
    fn test_call_arity_and_argument_types() {
        let f = func("f", vec![TypedVar::new("a", int())], int(), vec![Stmt::ret(Some(Expr::id("a")))]);
        let mut program = Program::new(
            vec![f],
            vec![
                Stmt::expr(Expr::call("f", vec![])),
                Stmt::expr(Expr::call("f", vec![Expr::bool(true)])),
                Stmt::expr(Expr::call("g", vec![])),
            ],
        );
        assert_eq!(
            errors_of(&mut program),
            vec![
                "Expected 1 arguments; got 0",
                "Expected type `int`; got type `bool` in parameter 0",
                "Not a function or class: g",
            ]
        );
    }

    #[test]
    fn test_method_call_numbers_from_one() {
        let this = TypedVar::new("self", TypeAnnotation::class("A"));
        let m: Declaration = FuncDef::new(
            "m",
            vec![this, TypedVar::new("n", int())],
            TypeAnnotation::none(),
            vec![],
            vec![],
        )
        .into();
        let class: Declaration = ClassDef::new("A", "object", vec![m]).into();
        let mut program = Program::new(
            vec![class],
            vec![
                Stmt::expr(Expr::method_call(Expr::call("A", vec![]), "m", vec![Expr::str("s")])),
                Stmt::expr(Expr::method_call(Expr::call("A", vec![]), "k", vec![])),
            ],
        );
        assert_eq!(
            errors_of(&mut program),
            vec![
                "Expected type `int`; got type `str` in parameter 1",
                "There is no method named `k` in class `A`",
            ]
        );
    }

    #[test]
    fn test_class_name_is_not_a_variable() {
        let mut program = Program::new(vec![], vec![Stmt::expr(Expr::id("int"))]);
        assert_eq!(errors_of(&mut program), vec!["Not a variable: int"]);
    }

    #[test]
    fn test_assignment_target_rules() {
        let f = func(
            "f",
            vec![],
            TypeAnnotation::none(),
            vec![Stmt::assign(vec![Expr::id("x")], Expr::int(1))],
        );
        let mut program = Program::new(
            vec![
                Declaration::var("x", int(), Expr::int(0)),
                Declaration::var("s", TypeAnnotation::class("str"), Expr::str("")),
                Declaration::var("a", TypeAnnotation::list(TypeAnnotation::class("object")), Expr::none()),
                Declaration::var("b", TypeAnnotation::list(TypeAnnotation::class("object")), Expr::none()),
                f,
            ],
            vec![
                Stmt::assign(vec![Expr::index(Expr::id("s"), Expr::int(0))], Expr::str("c")),
                Stmt::assign(vec![Expr::id("a"), Expr::id("b")], Expr::list(vec![Expr::none()])),
            ],
        );
        assert_eq!(
            errors_of(&mut program),
            vec![
                "Cannot assign to variable that is not explicitly declared in this scope: x",
                "`str` is not a list type",
                "Right-hand side of multiple assignment may not be [<None>]",
            ]
        );
    }

    #[test]
    fn test_return_rules() {
        let f = func("f", vec![], int(), vec![Stmt::ret(None)]);
        let mut program = Program::new(vec![f], vec![Stmt::ret(Some(Expr::int(1)))]);
        assert_eq!(
            errors_of(&mut program),
            vec!["Expected type `int`; got `None`", "Return statement cannot appear at the top level"]
        );
    }

    #[test]
    fn test_loops() {
        let mut program = Program::new(
            vec![Declaration::var("c", TypeAnnotation::class("str"), Expr::str(""))],
            vec![
                Stmt::for_loop("c", Expr::str("abc"), vec![]),
                Stmt::for_loop("c", Expr::int(3), vec![]),
                Stmt::while_loop(Expr::int(1), vec![]),
            ],
        );
        assert_eq!(
            errors_of(&mut program),
            vec!["Cannot iterate over value of type `int`", "Condition expression cannot be of type `int`"]
        );
    }

    #[test]
    fn test_comprehension_binds_fresh_scope() {
        let mut program = Program::new(
            vec![],
            vec![Stmt::expr(Expr::comprehension(
                Expr::binary(Expr::id("i"), BinOp::Mul, Expr::int(2)),
                "i",
                Expr::list(vec![Expr::int(1), Expr::int(2)]),
            ))],
        );
        assert!(errors_of(&mut program).is_empty());
        let StmtKind::ExprStmt { expr } = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        assert_eq!(expr.value_type(), Some(&ValueType::list(ValueType::int())));
    }

    #[test]
    fn test_missing_member_names_the_class() {
        let mut program = Program::new(
            vec![
                ClassDef::new("A", "object", vec![]).into(),
                Declaration::var("a", TypeAnnotation::class("A"), Expr::none()),
                Declaration::var("xs", TypeAnnotation::list(int()), Expr::none()),
            ],
            vec![
                Stmt::expr(Expr::member(Expr::id("a"), "n")),
                Stmt::expr(Expr::method_call(Expr::id("a"), "m", vec![])),
                Stmt::expr(Expr::member(Expr::id("xs"), "n")),
            ],
        );
        assert_eq!(
            errors_of(&mut program),
            vec![
                "There is no attribute named `n` in class `A`",
                "There is no method named `m` in class `A`",
                "There is no attribute named `n` in class `[int]`",
            ]
        );
    }
}
