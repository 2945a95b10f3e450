//! Frontend module - AST and its JSON input

pub mod ast;
pub mod loader;
