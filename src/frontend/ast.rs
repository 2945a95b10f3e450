//! Abstract Syntax Tree for ChocoPy
//!
//! The node shapes follow the JSON the ChocoPy reference front end writes:
//! every node is an object tagged by `"kind"` with an optional
//! `"location"`. Semantic fields (`inferredType`, a function's scope) are
//! filled in by the analyzers and are never read from input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::semantic::ScopeId;
use crate::types::{Type, ValueType};
use crate::utils::Span;

// ==================== Node Identity ====================

/// Process-unique identity of an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::fresh()
    }
}

// ==================== Program ====================

/// A complete program (compilation unit)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "Program")]
pub struct Program {
    #[serde(default, rename = "location")]
    pub span: Span,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    #[serde(default)]
    pub statements: Vec<Stmt>,
    #[serde(default)]
    pub errors: Errors,
}

/// Error bag as carried by the typed AST
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "Errors")]
pub struct Errors {
    #[serde(default, rename = "location")]
    pub span: Span,
    #[serde(default)]
    pub errors: Vec<CompilerError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "CompilerError")]
pub struct CompilerError {
    #[serde(default, rename = "location")]
    pub span: Span,
    pub message: String,
    #[serde(default)]
    pub syntax: bool,
}

// ==================== Declarations ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Declaration {
    VarDef(VarDef),
    /// A variable that may not be reassigned
    ConstVarDef(VarDef),
    FuncDef(FuncDef),
    ClassDef(ClassDef),
    GlobalDecl(ScopeDecl),
    NonLocalDecl(ScopeDecl),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDef {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    pub var: TypedVar,
    /// Always a literal
    pub value: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDef {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    pub name: Identifier,
    #[serde(default)]
    pub params: Vec<TypedVar>,
    #[serde(rename = "returnType", default = "TypeAnnotation::none")]
    pub return_type: TypeAnnotation,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    #[serde(default)]
    pub statements: Vec<Stmt>,
    /// Local scope, installed by declaration analysis
    #[serde(skip)]
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    pub name: Identifier,
    #[serde(rename = "superClass")]
    pub super_class: Identifier,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

/// `global x` / `nonlocal x`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeDecl {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    pub variable: Identifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "TypedVar")]
pub struct TypedVar {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    pub identifier: Identifier,
    #[serde(rename = "type")]
    pub annotation: TypeAnnotation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeAnnotation {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    #[serde(flatten)]
    pub kind: TypeAnnotationKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeAnnotationKind {
    ClassType {
        #[serde(rename = "className")]
        class_name: String,
    },
    ListType {
        #[serde(rename = "elementType")]
        element_type: Box<TypeAnnotation>,
    },
}

impl Declaration {
    /// The name this declaration introduces (or rebinds).
    pub fn identifier(&self) -> &Identifier {
        match self {
            Declaration::VarDef(def) | Declaration::ConstVarDef(def) => &def.var.identifier,
            Declaration::FuncDef(def) => &def.name,
            Declaration::ClassDef(def) => &def.name,
            Declaration::GlobalDecl(decl) | Declaration::NonLocalDecl(decl) => &decl.variable,
        }
    }

    pub fn name(&self) -> &str {
        &self.identifier().name
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Declaration::VarDef(_) | Declaration::ConstVarDef(_))
    }
}

// ==================== Statements ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    #[serde(flatten)]
    pub kind: StmtKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StmtKind {
    ExprStmt {
        expr: Expr,
    },
    AssignStmt {
        targets: Vec<Expr>,
        value: Expr,
    },
    IfStmt {
        condition: Expr,
        #[serde(rename = "thenBody")]
        then_body: Vec<Stmt>,
        #[serde(rename = "elseBody", default)]
        else_body: Vec<Stmt>,
    },
    WhileStmt {
        condition: Expr,
        body: Vec<Stmt>,
    },
    ForStmt {
        identifier: Identifier,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    ReturnStmt {
        #[serde(default)]
        value: Option<Expr>,
    },
}

// ==================== Expressions ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    #[serde(rename = "inferredType", skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub inferred_type: Option<Type>,
    #[serde(flatten)]
    pub kind: ExprKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExprKind {
    IntegerLiteral {
        value: i32,
    },
    BooleanLiteral {
        value: bool,
    },
    StringLiteral {
        value: String,
    },
    NoneLiteral,
    Identifier {
        name: String,
    },
    BinaryExpr {
        left: Box<Expr>,
        operator: BinOp,
        right: Box<Expr>,
    },
    UnaryExpr {
        operator: UnaryOp,
        operand: Box<Expr>,
    },
    IfExpr {
        condition: Box<Expr>,
        #[serde(rename = "thenExpr")]
        then_expr: Box<Expr>,
        #[serde(rename = "elseExpr")]
        else_expr: Box<Expr>,
    },
    ListExpr {
        #[serde(default)]
        elements: Vec<Expr>,
    },
    /// `[element for identifier in iterable]`
    ForListExpr {
        element: Box<Expr>,
        identifier: Identifier,
        iterable: Box<Expr>,
    },
    IndexExpr {
        list: Box<Expr>,
        index: Box<Expr>,
    },
    MemberExpr {
        object: Box<Expr>,
        member: Identifier,
    },
    CallExpr {
        function: Identifier,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// `method` is always a `MemberExpr`
    MethodCallExpr {
        method: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
}

/// A bare name in a declaration, call target, member access or loop header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "Identifier")]
pub struct Identifier {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default, rename = "location")]
    pub span: Span,
    #[serde(rename = "inferredType", skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub inferred_type: Option<Type>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "//")]
    FloorDiv,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "is")]
    Is,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Is => "is",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "not")]
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
        })
    }
}

// ==================== Accessors ====================

impl Expr {
    /// The inferred value type, if type checking assigned one.
    pub fn value_type(&self) -> Option<&ValueType> {
        self.inferred_type.as_ref().and_then(Type::as_value)
    }

    /// `(object, member)` of a `MemberExpr`.
    pub fn as_member(&self) -> Option<(&Expr, &Identifier)> {
        match &self.kind {
            ExprKind::MemberExpr { object, member } => Some((object, member)),
            _ => None,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier { name } => Some(name),
            _ => None,
        }
    }
}

// ==================== Traversal ====================

impl Expr {
    /// Direct sub-expressions, in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::IntegerLiteral { .. }
            | ExprKind::BooleanLiteral { .. }
            | ExprKind::StringLiteral { .. }
            | ExprKind::NoneLiteral
            | ExprKind::Identifier { .. } => vec![],
            ExprKind::BinaryExpr { left, right, .. } => vec![&**left, &**right],
            ExprKind::UnaryExpr { operand, .. } => vec![&**operand],
            ExprKind::IfExpr { condition, then_expr, else_expr } => vec![&**condition, &**then_expr, &**else_expr],
            ExprKind::ListExpr { elements } => elements.iter().collect(),
            ExprKind::ForListExpr { element, iterable, .. } => vec![&**iterable, &**element],
            ExprKind::IndexExpr { list, index } => vec![&**list, &**index],
            ExprKind::MemberExpr { object, .. } => vec![&**object],
            ExprKind::CallExpr { args, .. } => args.iter().collect(),
            ExprKind::MethodCallExpr { method, args } => std::iter::once(&**method).chain(args.iter()).collect(),
        }
    }

    /// Visit this expression and every expression below it, parents first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

impl Stmt {
    /// Expressions owned directly by this statement
    pub fn exprs(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::ExprStmt { expr } => vec![expr],
            StmtKind::AssignStmt { targets, value } => std::iter::once(value).chain(targets.iter()).collect(),
            StmtKind::IfStmt { condition, .. } | StmtKind::WhileStmt { condition, .. } => vec![condition],
            StmtKind::ForStmt { iterable, .. } => vec![iterable],
            StmtKind::ReturnStmt { value } => value.iter().collect(),
        }
    }

    /// Nested statement blocks
    pub fn blocks(&self) -> Vec<&[Stmt]> {
        match &self.kind {
            StmtKind::IfStmt { then_body, else_body, .. } => vec![then_body.as_slice(), else_body.as_slice()],
            StmtKind::WhileStmt { body, .. } | StmtKind::ForStmt { body, .. } => vec![body.as_slice()],
            _ => vec![],
        }
    }
}

/// Visit every statement of `stmts`, nested blocks included
pub fn walk_stmts<'a>(stmts: &'a [Stmt], visit: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        visit(stmt);
        for block in stmt.blocks() {
            walk_stmts(block, visit);
        }
    }
}

// ==================== Constructors ====================

impl Program {
    pub fn new(declarations: Vec<Declaration>, statements: Vec<Stmt>) -> Self {
        Self { span: Span::dummy(), declarations, statements, errors: Errors::default() }
    }
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: NodeId::fresh(), span: Span::dummy(), inferred_type: None, name: name.into() }
    }
}

impl TypeAnnotation {
    pub fn class(name: impl Into<String>) -> Self {
        Self::from_kind(TypeAnnotationKind::ClassType { class_name: name.into() })
    }

    pub fn list(element: TypeAnnotation) -> Self {
        Self::from_kind(TypeAnnotationKind::ListType { element_type: Box::new(element) })
    }

    /// The implicit `<None>` return annotation.
    pub fn none() -> Self {
        Self::class(crate::types::type_system::NONE)
    }

    fn from_kind(kind: TypeAnnotationKind) -> Self {
        Self { id: NodeId::fresh(), span: Span::dummy(), kind }
    }
}

impl TypedVar {
    pub fn new(name: impl Into<String>, annotation: TypeAnnotation) -> Self {
        Self { id: NodeId::fresh(), span: Span::dummy(), identifier: Identifier::new(name), annotation }
    }
}

impl VarDef {
    pub fn new(name: impl Into<String>, annotation: TypeAnnotation, value: Expr) -> Self {
        Self { id: NodeId::fresh(), span: Span::dummy(), var: TypedVar::new(name, annotation), value }
    }
}

impl FuncDef {
    pub fn new(
        name: impl Into<String>,
        params: Vec<TypedVar>,
        return_type: TypeAnnotation,
        declarations: Vec<Declaration>,
        statements: Vec<Stmt>,
    ) -> Self {
        Self {
            id: NodeId::fresh(),
            span: Span::dummy(),
            name: Identifier::new(name),
            params,
            return_type,
            declarations,
            statements,
            scope: None,
        }
    }
}

impl ClassDef {
    pub fn new(name: impl Into<String>, super_class: impl Into<String>, declarations: Vec<Declaration>) -> Self {
        Self {
            id: NodeId::fresh(),
            span: Span::dummy(),
            name: Identifier::new(name),
            super_class: Identifier::new(super_class),
            declarations,
        }
    }
}

impl Declaration {
    pub fn var(name: impl Into<String>, annotation: TypeAnnotation, value: Expr) -> Self {
        Declaration::VarDef(VarDef::new(name, annotation, value))
    }

    pub fn constant(name: impl Into<String>, annotation: TypeAnnotation, value: Expr) -> Self {
        Declaration::ConstVarDef(VarDef::new(name, annotation, value))
    }

    pub fn global(name: impl Into<String>) -> Self {
        Declaration::GlobalDecl(ScopeDecl::new(name))
    }

    pub fn nonlocal(name: impl Into<String>) -> Self {
        Declaration::NonLocalDecl(ScopeDecl::new(name))
    }
}

impl ScopeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: NodeId::fresh(), span: Span::dummy(), variable: Identifier::new(name) }
    }
}

impl From<FuncDef> for Declaration {
    fn from(def: FuncDef) -> Self {
        Declaration::FuncDef(def)
    }
}

impl From<ClassDef> for Declaration {
    fn from(def: ClassDef) -> Self {
        Declaration::ClassDef(def)
    }
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self { id: NodeId::fresh(), span: Span::dummy(), kind }
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::ExprStmt { expr })
    }

    pub fn assign(targets: Vec<Expr>, value: Expr) -> Self {
        Self::new(StmtKind::AssignStmt { targets, value })
    }

    pub fn if_else(condition: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::IfStmt { condition, then_body, else_body })
    }

    pub fn while_loop(condition: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::WhileStmt { condition, body })
    }

    pub fn for_loop(name: impl Into<String>, iterable: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::ForStmt { identifier: Identifier::new(name), iterable, body })
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::ReturnStmt { value })
    }
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { id: NodeId::fresh(), span: Span::dummy(), inferred_type: None, kind }
    }

    pub fn int(value: i32) -> Self {
        Self::new(ExprKind::IntegerLiteral { value })
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::BooleanLiteral { value })
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::new(ExprKind::StringLiteral { value: value.into() })
    }

    pub fn none() -> Self {
        Self::new(ExprKind::NoneLiteral)
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Identifier { name: name.into() })
    }

    pub fn binary(left: Expr, operator: BinOp, right: Expr) -> Self {
        Self::new(ExprKind::BinaryExpr { left: Box::new(left), operator, right: Box::new(right) })
    }

    pub fn list(elements: Vec<Expr>) -> Self {
        Self::new(ExprKind::ListExpr { elements })
    }

    pub fn comprehension(element: Expr, name: impl Into<String>, iterable: Expr) -> Self {
        Self::new(ExprKind::ForListExpr {
            element: Box::new(element),
            identifier: Identifier::new(name),
            iterable: Box::new(iterable),
        })
    }

    pub fn index(list: Expr, index: Expr) -> Self {
        Self::new(ExprKind::IndexExpr { list: Box::new(list), index: Box::new(index) })
    }

    pub fn member(object: Expr, member: impl Into<String>) -> Self {
        Self::new(ExprKind::MemberExpr { object: Box::new(object), member: Identifier::new(member) })
    }

    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::CallExpr { function: Identifier::new(function), args })
    }

    pub fn method_call(object: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::MethodCallExpr { method: Box::new(Expr::member(object, method)), args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_distinct() {
        let a = Expr::int(1);
        let b = Expr::int(1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_declaration_identifier() {
        let decl = Declaration::var("x", TypeAnnotation::class("int"), Expr::int(0));
        assert_eq!(decl.name(), "x");
        assert!(decl.is_variable());
        let func: Declaration = FuncDef::new("f", vec![], TypeAnnotation::none(), vec![], vec![]).into();
        assert_eq!(func.name(), "f");
        assert!(!func.is_variable());
    }

    #[test]
    fn test_method_call_wraps_member() {
        let call = Expr::method_call(Expr::id("self"), "f", vec![]);
        let ExprKind::MethodCallExpr { method, .. } = &call.kind else {
            panic!("expected method call");
        };
        let (object, member) = method.as_member().unwrap();
        assert_eq!(object.as_identifier(), Some("self"));
        assert_eq!(member.name, "f");
    }
}
