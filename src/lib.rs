//! ChocoPy compiler
//!
//! Semantic analysis and RISC-V code generation for ChocoPy programs given
//! as JSON ASTs.
//!
//! ```no_run
//! use chocopy::frontend::loader::from_json;
//!
//! let mut program = from_json(r#"{"kind":"Program","declarations":[],"statements":[]}"#)?;
//! let compilation = chocopy::compile(&mut program)?;
//! assert!(compilation.diagnostics.is_empty());
//! println!("{}", compilation.assembly);
//! # Ok::<(), chocopy::utils::Error>(())
//! ```

pub mod backend;
pub mod feedback;
pub mod frontend;
pub mod semantic;
pub mod types;
pub mod utils;

use log::debug;

use backend::{CodeGen, CodeGenOptions, RiscVCodeGen};
use frontend::ast::Program;
use semantic::Diagnostics;
use utils::Result;

/// Output of the whole pipeline
#[derive(Debug)]
pub struct Compilation {
    /// Semantic errors; also copied into the program's error bag
    pub diagnostics: Diagnostics,
    /// RISC-V assembly, produced even when there are diagnostics
    pub assembly: String,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Analyze `program` and generate assembly with the default options
pub fn compile(program: &mut Program) -> Result<Compilation> {
    compile_with(program, CodeGenOptions::default())
}

pub fn compile_with(program: &mut Program, options: CodeGenOptions) -> Result<Compilation> {
    compile_to(program, &mut RiscVCodeGen::new(options))
}

/// Analyze `program` and generate code with `backend`
pub fn compile_to(program: &mut Program, backend: &mut dyn CodeGen) -> Result<Compilation> {
    let analysis = semantic::analyze(program);
    debug!(
        "generating {} code for {} with {} diagnostic(s)",
        backend.name(),
        backend.target_triple(),
        analysis.diagnostics.len()
    );
    let assembly = backend.generate(program)?;
    Ok(Compilation { diagnostics: analysis.diagnostics, assembly })
}
