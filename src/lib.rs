//! Parce backend
//!
//! Compiles a parsed program (AST) down to three-address IR, optimizes it,
//! translates it to stack bytecode and runs that bytecode on a small VM.
//!
//! # Example
//!
//! ```no_run
//! use parce::frontend::ast::{Expr, Program, Stmt};
//! use parce::util::config::PipelineConfig;
//! use parce::{run_pipeline, Result};
//!
//! fn main() -> Result<()> {
//!     let program = Program::new(vec![
//!         Stmt::var_decl("x", Expr::number(2.0)),
//!         Stmt::print("x =", vec![Expr::var("x")]),
//!     ]);
//!     let mut output = Vec::new();
//!     run_pipeline(&program, &PipelineConfig::default(), &mut "".as_bytes(), &mut output)?;
//!     Ok(())
//! }
//! ```

#![warn(rust_2018_idioms)]

// Public modules
pub mod frontend;
pub mod middle;
pub mod vm;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};

use crate::frontend::ast::Program;
use crate::middle::optimizer::{OptimizeStats, Optimizer};
use crate::util::config::PipelineConfig;
use crate::vm::{Completion, Diagnostic, Value, VM};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tool name
pub const NAME: &str = "Parce";

/// Everything one compilation produces
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    /// IR straight out of lowering
    pub ir: Vec<middle::ir::Instruction>,
    /// IR after the optimizer
    pub optimized_ir: Vec<middle::ir::Instruction>,
    /// Stack bytecode generated from the optimized IR
    pub bytecode: Vec<vm::Instruction>,
    /// What the optimizer did
    pub stats: OptimizeStats,
}

/// Result of running a program to completion
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub completion: Completion,
    /// Final variable environment, sorted by name
    pub variables: BTreeMap<String, Value>,
    pub diagnostics: Vec<Diagnostic>,
    pub steps: u64,
}

impl RunReport {
    /// Value carried by a `RETURN`, if the program ended with one
    pub fn return_value(&self) -> Option<&Value> {
        match &self.completion {
            Completion::Return(value) => value.as_ref(),
            _ => None,
        }
    }
}

/// Lower, optimize and generate bytecode for a program
pub fn compile(
    program: &Program,
    config: &PipelineConfig,
) -> Result<Artifacts> {
    debug!("Compiling {} top-level statements", program.statements.len());
    let ir = middle::lower(program).context("Lowering failed")?;
    debug!("Lowered to {} IR instructions", ir.len());

    let mut optimizer = Optimizer::new(config.optimizer.clone());
    let optimized_ir = optimizer.optimize(ir.clone());
    let bytecode = middle::generate(&optimized_ir);
    debug!("Generated {} bytecode instructions", bytecode.len());

    Ok(Artifacts {
        ir,
        optimized_ir,
        bytecode,
        stats: optimizer.stats().clone(),
    })
}

/// Execute bytecode on a fresh VM
pub fn execute<R: BufRead, W: Write>(
    bytecode: Vec<vm::Instruction>,
    config: &PipelineConfig,
    input: &mut R,
    output: &mut W,
) -> Result<RunReport> {
    let mut machine =
        VM::with_config(bytecode, config.vm.clone()).context("Failed to load bytecode")?;
    let completion = machine.run(input, output).with_context(|| {
        format!("Execution failed at instruction {}", machine.pc().saturating_sub(1))
    })?;

    Ok(RunReport {
        completion,
        variables: machine
            .variables()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        diagnostics: machine.diagnostics().to_vec(),
        steps: machine.steps(),
    })
}

/// Compile and run a program
pub fn run_pipeline<R: BufRead, W: Write>(
    program: &Program,
    config: &PipelineConfig,
    input: &mut R,
    output: &mut W,
) -> Result<RunReport> {
    let artifacts = compile(program, config)?;
    execute(artifacts.bytecode, config, input, output)
}

/// Load a JSON AST file
pub fn load_program_file(path: &Path) -> Result<Program> {
    frontend::load_program(path)
        .with_context(|| format!("Failed to load AST: {}", path.display()))
}

/// Paths written by [`build_artifacts`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub ir: PathBuf,
    pub bytecode: PathBuf,
    pub output: PathBuf,
}

/// Compile an AST file, run it, and write `ir.txt`, `bytecode.txt` and
/// `output.txt` into `out_dir`
pub fn build_artifacts<R: BufRead>(
    source_path: &Path,
    out_dir: &Path,
    config: &PipelineConfig,
    input: &mut R,
) -> Result<(ArtifactPaths, RunReport)> {
    let program = load_program_file(source_path)?;
    let artifacts = compile(&program, config)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output dir: {}", out_dir.display()))?;
    let paths = ArtifactPaths {
        ir: out_dir.join("ir.txt"),
        bytecode: out_dir.join("bytecode.txt"),
        output: out_dir.join("output.txt"),
    };

    write_file(&paths.ir, &middle::ir::to_text(&artifacts.optimized_ir))?;
    write_file(&paths.bytecode, &vm::to_text(&artifacts.bytecode))?;

    let mut captured = Vec::new();
    let report = execute(artifacts.bytecode, config, input, &mut captured)?;
    fs::write(&paths.output, &captured)
        .with_context(|| format!("Failed to write output: {}", paths.output.display()))?;

    Ok((paths, report))
}

/// Parse a textual bytecode file
pub fn load_bytecode_file(path: &Path) -> Result<Vec<vm::Instruction>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read bytecode: {}", path.display()))?;
    vm::parse_program(&text)
        .with_context(|| format!("Failed to parse bytecode: {}", path.display()))
}

/// Read a textual IR file and return the optimized IR as text
pub fn optimize_ir_file(
    path: &Path,
    config: &PipelineConfig,
) -> Result<String> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read IR: {}", path.display()))?;
    let code = middle::ir::parse_program(&text)
        .with_context(|| format!("Failed to parse IR: {}", path.display()))?;
    let optimized = Optimizer::new(config.optimizer.clone()).optimize(code);
    Ok(middle::ir::to_text(&optimized))
}

fn write_file(
    path: &Path,
    content: &str,
) -> Result<()> {
    debug!("Writing {}", path.display());
    fs::write(path, content).with_context(|| format!("Failed to write: {}", path.display()))
}
