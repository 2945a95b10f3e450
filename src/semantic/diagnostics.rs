//! Semantic diagnostics
//!
//! The message strings are part of the observable interface and match the
//! ChocoPy reference grader verbatim.

use std::collections::HashSet;
use std::fmt;

use log::trace;
use thiserror::Error;

use crate::frontend::ast::{CompilerError, NodeId};
use crate::utils::Span;

/// A semantic error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    // ==================== Declaration Errors ====================
    #[error("Duplicate declaration of identifier in same scope: {0}")]
    DuplicateDeclaration(String),

    #[error("Super-class not defined: {0}")]
    SuperClassNotDefined(String),

    #[error("Super-class must be a class: {0}")]
    SuperClassNotAClass(String),

    #[error("Cannot extend special class: {0}")]
    CannotExtendSpecial(String),

    #[error("Not a global variable: {0}")]
    NotAGlobal(String),

    #[error("Not a nonlocal variable: {0}")]
    NotANonlocal(String),

    #[error("Cannot shadow class name: {0}")]
    ShadowsClassName(String),

    #[error("Invalid type annotation; there is no class named: {0}")]
    InvalidAnnotation(String),

    #[error("Cannot re-define attribute: {0}")]
    RedefinedAttribute(String),

    #[error("Method overridden with different type signature: {0}")]
    BadOverride(String),

    #[error("First parameter of the following method must be of the enclosing class: {0}")]
    BadReceiver(String),

    // ==================== Expression Errors ====================
    #[error("Not a variable: {0}")]
    NotAVariable(String),

    #[error("Cannot apply operator `{op}` on types `{left}` and `{right}`")]
    BinaryOperands { op: String, left: String, right: String },

    #[error("Cannot apply operator `{op}` on type `{operand}`")]
    UnaryOperand { op: String, operand: String },

    #[error("Index is of non-integer type `{0}`")]
    NonIntegerIndex(String),

    #[error("Cannot index into type `{0}`")]
    NotIndexable(String),

    #[error("There is no attribute named `{member}` in class `{class}`")]
    NoSuchAttribute { member: String, class: String },

    #[error("There is no method named `{member}` in class `{class}`")]
    NoSuchMethod { member: String, class: String },

    #[error("Not a function or class: {0}")]
    NotCallable(String),

    #[error("Expected {expected} arguments; got {got}")]
    ArgumentCount { expected: usize, got: usize },

    #[error("Expected type `{expected}`; got type `{got}` in parameter {index}")]
    ArgumentType { expected: String, got: String, index: usize },

    #[error("Condition expression cannot be of type `{0}`")]
    BadCondition(String),

    #[error("Cannot iterate over value of type `{0}`")]
    NotIterable(String),

    // ==================== Statement Errors ====================
    #[error("Expected type `{expected}`; got type `{got}`")]
    TypeMismatch { expected: String, got: String },

    #[error("Expected type `{0}`; got `None`")]
    MissingReturnValue(String),

    #[error("Cannot assign to variable that is not explicitly declared in this scope: {0}")]
    UndeclaredAssignTarget(String),

    #[error("Cannot assign to a constant variable: {0}")]
    AssignToConstant(String),

    #[error("`{0}` is not a list type")]
    NotAListTarget(String),

    #[error("Right-hand side of multiple assignment may not be [<None>]")]
    MultiAssignNoneList,

    #[error("Return statement cannot appear at the top level")]
    TopLevelReturn,

    #[error("All paths in this function/method must have a return statement: {0}")]
    MissingReturn(String),
}

/// A semantic error attached to the node it was reported on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub node: NodeId,
    pub span: Span,
    pub error: SemanticError,
}

impl Diagnostic {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.error)
    }
}

impl From<&Diagnostic> for CompilerError {
    fn from(diag: &Diagnostic) -> Self {
        CompilerError { span: diag.span, message: diag.message(), syntax: false }
    }
}

/// Append-only error bag; each node carries at most one diagnostic
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    flagged: HashSet<NodeId>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `error` on `node` unless the node already has one.
    pub fn report(&mut self, node: NodeId, span: Span, error: SemanticError) {
        if !self.flagged.insert(node) {
            trace!("suppressed on already-flagged node: {}", error);
            return;
        }
        self.items.push(Diagnostic { node, span, error });
    }

    #[cfg(test)]
    pub fn has_error(&self, node: NodeId) -> bool {
        self.flagged.contains(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn messages(&self) -> Vec<String> {
        self.items.iter().map(Diagnostic::message).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_error_per_node() {
        let mut diags = Diagnostics::new();
        let node = NodeId::fresh();
        diags.report(node, Span::dummy(), SemanticError::TopLevelReturn);
        diags.report(node, Span::dummy(), SemanticError::NotAVariable("x".into()));
        assert_eq!(diags.messages(), vec!["Return statement cannot appear at the top level"]);
        assert!(diags.has_error(node));
    }

    #[test]
    fn test_published_wording() {
        let err = SemanticError::BinaryOperands { op: "+".into(), left: "int".into(), right: "str".into() };
        assert_eq!(err.to_string(), "Cannot apply operator `+` on types `int` and `str`");
        let err = SemanticError::ArgumentType { expected: "int".into(), got: "bool".into(), index: 1 };
        assert_eq!(err.to_string(), "Expected type `int`; got type `bool` in parameter 1");
    }

    #[test]
    fn test_display_includes_location() {
        let diag = Diagnostic {
            node: NodeId::fresh(),
            span: Span::new(3, 5, 3, 9),
            error: SemanticError::NotAVariable("y".into()),
        };
        assert_eq!(diag.to_string(), "3:5: Not a variable: y");
    }
}
