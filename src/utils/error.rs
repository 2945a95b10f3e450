//! Error handling for the ChocoPy pipeline
//!
//! Semantic diagnostics are not errors in this sense: they are collected in
//! `semantic::Diagnostics` and never abort a pass. This enum covers the
//! failures that stop the pipeline outright.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error
#[derive(Error, Debug)]
pub enum Error {
    // ==================== Input Errors ====================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed AST: {0}")]
    MalformedAst(#[from] serde_json::Error),

    // ==================== Code Generation Errors ====================
    #[error("Code generation error: {0}")]
    CodeGen(String),
}
