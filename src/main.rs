//! Parce - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parce::util::config::{resolve_config, PipelineConfig};
use parce::util::logger::{self, LogLevel};
use parce::vm::Completion;
use parce::{
    build_artifacts, compile, execute, load_bytecode_file, load_program_file, optimize_ir_file,
    RunReport, NAME, VERSION,
};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Compile a parsed program to IR and stack bytecode, then run it
#[derive(Parser, Debug)]
#[command(name = "parce")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./parce.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a JSON AST and write ir.txt, bytecode.txt and output.txt
    Build {
        /// AST file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// Feed READ from this file instead of stdin
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Compile and run a JSON AST on stdin/stdout
    Run {
        /// AST file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run a textual bytecode listing
    Exec {
        /// Bytecode file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Optimize a textual IR listing and print the result
    Optimize {
        /// IR file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = resolve_config(args.config.as_deref()).context("Failed to load configuration")?;
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log.level
    };
    logger::init_with_level(level);
    debug!("{} {} on {}", NAME, VERSION, std::env::consts::OS);

    match args.command {
        Commands::Build {
            file,
            output,
            input,
        } => build(&file, &output, input.as_deref(), &config)
            .with_context(|| format!("Failed to build: {}", file.display()))?,
        Commands::Run { file } => {
            let program = load_program_file(&file)?;
            let artifacts = compile(&program, &config)?;
            let report = run_on_stdio(artifacts.bytecode, &config)
                .with_context(|| format!("Failed to run: {}", file.display()))?;
            summarize(&report);
        }
        Commands::Exec { file } => {
            let bytecode = load_bytecode_file(&file)?;
            let report = run_on_stdio(bytecode, &config)
                .with_context(|| format!("Failed to execute: {}", file.display()))?;
            summarize(&report);
        }
        Commands::Optimize { file } => {
            let text = optimize_ir_file(&file, &config)?;
            println!("{}", text);
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

fn build(
    file: &Path,
    out_dir: &Path,
    input: Option<&Path>,
    config: &PipelineConfig,
) -> Result<()> {
    let (paths, report) = match input {
        Some(path) => {
            let handle = File::open(path)
                .with_context(|| format!("Failed to open input: {}", path.display()))?;
            build_artifacts(file, out_dir, config, &mut BufReader::new(handle))?
        }
        None => build_artifacts(file, out_dir, config, &mut io::stdin().lock())?,
    };
    summarize(&report);
    eprintln!("IR:       {}", paths.ir.display());
    eprintln!("Bytecode: {}", paths.bytecode.display());
    eprintln!("Output:   {}", paths.output.display());
    Ok(())
}

fn run_on_stdio(
    bytecode: Vec<parce::vm::Instruction>,
    config: &PipelineConfig,
) -> Result<RunReport> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = execute(bytecode, config, &mut stdin.lock(), &mut out)?;
    out.flush().context("Failed to flush stdout")?;
    Ok(report)
}

fn summarize(report: &RunReport) {
    if !report.diagnostics.is_empty() {
        warn!("{} runtime diagnostic(s) reported", report.diagnostics.len());
    }
    if let Completion::Return(Some(value)) = &report.completion {
        debug!("Program returned {}", value);
    }
    debug!("Executed {} steps", report.steps);
}
