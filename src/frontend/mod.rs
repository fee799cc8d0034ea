//! Frontend boundary
//!
//! Parsing source text is someone else's job. This module defines the AST the
//! backend consumes and loads it from the JSON form an external parser emits.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub mod ast;

pub use ast::{BinOp, Branch, Expr, Program, Stmt};

/// AST loading error
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed AST: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode a program from its JSON form
pub fn parse_program(json: &str) -> Result<Program, FrontendError> {
    let program: Program = serde_json::from_str(json)?;
    debug!("Decoded AST with {} top-level statements", program.statements.len());
    Ok(program)
}

/// Read and decode a program from a JSON file
pub fn load_program(path: &Path) -> Result<Program, FrontendError> {
    debug!("Loading AST from {}", path.display());
    let json = fs::read_to_string(path).map_err(|source| FrontendError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_program(&json)
}
