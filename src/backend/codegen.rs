//! Code Generation trait - Backend abstraction

use crate::frontend::ast::Program;
use crate::utils::Result;

/// A target that turns an analyzed program into assembly text
pub trait CodeGen {
    /// Assembly for `program`. Runs after semantic analysis, so every
    /// expression carries its inferred type.
    fn generate(&mut self, program: &Program) -> Result<String>;

    /// Target architecture (e.g., "riscv32")
    fn target_triple(&self) -> &str;

    /// Backend name for log output
    fn name(&self) -> &str;
}
