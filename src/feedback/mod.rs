//! Structured Feedback Module
//!
//! Provides machine-readable output for tooling:
//! - JSON diagnostic reports with fix suggestions
//! - Analysis statistics

use serde::{Deserialize, Serialize};

use crate::frontend::ast::Program;
use crate::semantic::{Diagnostic, SemanticError};
use crate::utils::Span;

// ==================== Structured Error Report ====================

/// A structured report for one semantic diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    /// Human-readable message, exactly as the checker reports it
    pub message: String,

    /// Location information
    pub location: Option<Location>,

    /// Suggested fixes
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,
}

impl Location {
    /// `None` for synthesized nodes without a source position
    pub fn from_span(file: &str, span: Span) -> Option<Self> {
        if span.is_dummy() {
            return None;
        }
        Some(Self {
            file: file.to_string(),
            line: span.line,
            column: span.col,
            end_line: Some(span.end_line),
            end_column: Some(span.end_col),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Description of the fix
    pub message: String,

    /// The replacement text
    pub replacement: Option<String>,

    /// Confidence in this suggestion (0.0 - 1.0)
    pub confidence: f64,
}

impl Suggestion {
    fn new(message: impl Into<String>, replacement: Option<String>, confidence: f64) -> Self {
        Self { message: message.into(), replacement, confidence }
    }
}

// ==================== Analysis Feedback ====================

/// Every diagnostic of one analyzed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    /// No semantic errors were found
    pub success: bool,

    /// Source file
    pub source_file: String,

    /// All errors, in the order they were reported
    pub diagnostics: Vec<ErrorReport>,

    /// Program statistics
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Top-level declarations
    pub declaration_count: usize,

    /// Top-level statements
    pub statement_count: usize,

    /// Diagnostics reported
    pub error_count: usize,
}

// ==================== Error Conversion ====================

impl ErrorReport {
    /// Create an error report from a semantic diagnostic
    pub fn from_diagnostic(diagnostic: &Diagnostic, file_name: &str) -> Self {
        let mut report = Self {
            code: error_code(&diagnostic.error).to_string(),
            message: diagnostic.message(),
            location: Location::from_span(file_name, diagnostic.span),
            suggestions: suggestions_for(&diagnostic.error),
        };
        report.sort_suggestions();
        report
    }

    /// Sort suggestions by confidence (highest first)
    pub fn sort_suggestions(&mut self) {
        self.suggestions
            .sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    }
}

/// Stable code per diagnostic kind
fn error_code(error: &SemanticError) -> &'static str {
    match error {
        SemanticError::DuplicateDeclaration(_) => "E0001",
        SemanticError::SuperClassNotDefined(_) => "E0002",
        SemanticError::SuperClassNotAClass(_) => "E0003",
        SemanticError::CannotExtendSpecial(_) => "E0004",
        SemanticError::NotAGlobal(_) => "E0005",
        SemanticError::NotANonlocal(_) => "E0006",
        SemanticError::ShadowsClassName(_) => "E0007",
        SemanticError::InvalidAnnotation(_) => "E0008",
        SemanticError::RedefinedAttribute(_) => "E0009",
        SemanticError::BadOverride(_) => "E0010",
        SemanticError::BadReceiver(_) => "E0011",
        SemanticError::NotAVariable(_) => "E0100",
        SemanticError::BinaryOperands { .. } => "E0101",
        SemanticError::UnaryOperand { .. } => "E0102",
        SemanticError::NonIntegerIndex(_) => "E0103",
        SemanticError::NotIndexable(_) => "E0104",
        SemanticError::NoSuchAttribute { .. } => "E0105",
        SemanticError::NoSuchMethod { .. } => "E0106",
        SemanticError::NotCallable(_) => "E0107",
        SemanticError::ArgumentCount { .. } => "E0108",
        SemanticError::ArgumentType { .. } => "E0109",
        SemanticError::BadCondition(_) => "E0110",
        SemanticError::NotIterable(_) => "E0111",
        SemanticError::TypeMismatch { .. } => "E0200",
        SemanticError::MissingReturnValue(_) => "E0201",
        SemanticError::UndeclaredAssignTarget(_) => "E0202",
        SemanticError::AssignToConstant(_) => "E0203",
        SemanticError::NotAListTarget(_) => "E0204",
        SemanticError::MultiAssignNoneList => "E0205",
        SemanticError::TopLevelReturn => "E0206",
        SemanticError::MissingReturn(_) => "E0207",
    }
}

/// Likely fixes for the common mistakes
fn suggestions_for(error: &SemanticError) -> Vec<Suggestion> {
    match error {
        SemanticError::UndeclaredAssignTarget(name) => vec![
            Suggestion::new(format!("Declare '{}' global in this function", name), Some(format!("global {}", name)), 0.7),
            Suggestion::new(format!("Declare '{}' nonlocal in this function", name), Some(format!("nonlocal {}", name)), 0.5),
            Suggestion::new(format!("Declare a local variable '{}'", name), None, 0.4),
        ],
        SemanticError::AssignToConstant(name) => vec![Suggestion::new(
            format!("Declare '{}' as a variable instead of a constant", name),
            None,
            0.8,
        )],
        SemanticError::ArgumentCount { expected, got } => {
            let message = if got < expected {
                format!("Add {} more argument(s)", expected - got)
            } else {
                format!("Remove {} extra argument(s)", got - expected)
            };
            vec![Suggestion::new(message, None, 0.9)]
        }
        SemanticError::MissingReturn(name) => vec![Suggestion::new(
            format!("Add a return statement at the end of '{}'", name),
            Some("return".to_string()),
            0.8,
        )],
        SemanticError::NotAGlobal(name) | SemanticError::NotANonlocal(name) => vec![Suggestion::new(
            format!("Declare '{}' in the enclosing scope first", name),
            None,
            0.6,
        )],
        SemanticError::InvalidAnnotation(name) => {
            vec![Suggestion::new(format!("Define a class named '{}'", name), None, 0.5)]
        }
        SemanticError::BadReceiver(name) => vec![Suggestion::new(
            format!("Make 'self' the first parameter of '{}'", name),
            None,
            0.8,
        )],
        SemanticError::TypeMismatch { expected, .. } => {
            vec![Suggestion::new(format!("Use a value of type {}", expected), None, 0.5)]
        }
        _ => vec![],
    }
}

impl DiagnosticsReport {
    /// Collect the diagnostics of an analyzed program
    pub fn new<'d>(
        source_file: impl Into<String>,
        program: &Program,
        diagnostics: impl IntoIterator<Item = &'d Diagnostic>,
    ) -> Self {
        let source_file = source_file.into();
        let reports: Vec<ErrorReport> =
            diagnostics.into_iter().map(|d| ErrorReport::from_diagnostic(d, &source_file)).collect();
        let stats = AnalysisStats {
            declaration_count: program.declarations.len(),
            statement_count: program.statements.len(),
            error_count: reports.len(),
        };
        Self { success: reports.is_empty(), source_file, diagnostics: reports, stats }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
