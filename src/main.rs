//! ChocoPy Compiler
//!
//! Reads the JSON AST of a ChocoPy program, checks it and writes RISC-V
//! assembly.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use chocopy::backend::CodeGenOptions;
use chocopy::feedback::DiagnosticsReport;
use chocopy::frontend::ast::Program;
use chocopy::frontend::loader::{load_program, to_json};
use chocopy::semantic::{analyze, Diagnostics};

/// ChocoPy Compiler
#[derive(Parser, Debug)]
#[command(name = "chococ")]
#[command(version = "0.1.0")]
#[command(about = "ChocoPy compiler - semantic analysis and RISC-V code generation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input JSON AST file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit assembly even when semantic errors are present
    #[arg(long, global = true)]
    allow_errors: bool,

    /// Heap size in 4 KiB pages
    #[arg(long, global = true, default_value_t = 8192)]
    heap_pages: u32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a JSON AST file to RISC-V assembly
    Build {
        /// Input JSON AST file
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a program for semantic errors
    Check {
        /// Input JSON AST file
        input: PathBuf,

        /// Print diagnostics as JSON reports
        #[arg(long)]
        json: bool,
    },
    /// Write the typed AST as JSON
    Typecheck {
        /// Input JSON AST file
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print version information
    Version,
}

/// How a command finished, apart from hard failures
enum Outcome {
    Clean,
    SemanticErrors,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let options = CodeGenOptions { heap_pages: cli.heap_pages };

    let result = match &cli.command {
        Some(Commands::Build { input, output }) => compile_file(input, output.as_deref(), options, cli.allow_errors),
        Some(Commands::Check { input, json }) => check_file(input, *json),
        Some(Commands::Typecheck { input, output }) => typecheck_file(input, output.as_deref()),
        Some(Commands::Version) => {
            println!("chococ 0.1.0");
            println!("ChocoPy Compiler");
            println!("License: Apache-2.0");
            Ok(Outcome::Clean)
        }
        None => {
            // Default: compile the input file
            if let Some(ref input) = cli.input {
                compile_file(input, cli.output.as_deref(), options, cli.allow_errors)
            } else {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: chococ <FILE> or chococ build <FILE>");
                process::exit(2);
            }
        }
    };

    match result {
        Ok(Outcome::Clean) => {}
        Ok(Outcome::SemanticErrors) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

fn load(input: &Path) -> Result<Program> {
    load_program(input).with_context(|| format!("failed to load {}", input.display()))
}

fn print_diagnostics(input: &Path, diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{}:{}", input.display(), diagnostic);
    }
}

/// Compile a JSON AST file to assembly
fn compile_file(input: &Path, output: Option<&Path>, options: CodeGenOptions, allow_errors: bool) -> Result<Outcome> {
    println!("ChocoPy Compiler v0.1.0");
    println!("Compiling: {}", input.display());

    let mut program = load(input)?;
    let compilation = chocopy::compile_with(&mut program, options).context("code generation failed")?;
    if compilation.has_errors() {
        print_diagnostics(input, &compilation.diagnostics);
        if !allow_errors {
            eprintln!("{} semantic error(s); no assembly written", compilation.diagnostics.len());
            return Ok(Outcome::SemanticErrors);
        }
    } else {
        println!("  [✓] Semantic analysis passed");
    }

    let out_path = output.map(Path::to_path_buf).unwrap_or_else(|| input.with_extension("s"));
    fs::write(&out_path, &compilation.assembly).with_context(|| format!("failed to write {}", out_path.display()))?;
    info!("wrote {} bytes of assembly", compilation.assembly.len());
    println!("  [✓] Generated assembly: {}", out_path.display());

    Ok(if compilation.has_errors() { Outcome::SemanticErrors } else { Outcome::Clean })
}

/// Check a program for errors without generating code
fn check_file(input: &Path, json: bool) -> Result<Outcome> {
    let mut program = load(input)?;
    let analysis = analyze(&mut program);

    if json {
        let report = DiagnosticsReport::new(input.display().to_string(), &program, analysis.diagnostics.iter());
        println!("{}", report.to_json());
    } else if analysis.has_errors() {
        print_diagnostics(input, &analysis.diagnostics);
    } else {
        println!("✅ No errors found");
    }

    Ok(if analysis.has_errors() { Outcome::SemanticErrors } else { Outcome::Clean })
}

/// Write the typed AST, errors included
fn typecheck_file(input: &Path, output: Option<&Path>) -> Result<Outcome> {
    let mut program = load(input)?;
    let analysis = analyze(&mut program);
    let typed = to_json(&program).context("failed to serialize the typed AST")?;

    match output {
        Some(path) => fs::write(path, &typed).with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", typed),
    }

    Ok(if analysis.has_errors() { Outcome::SemanticErrors } else { Outcome::Clean })
}
