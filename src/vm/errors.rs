//! VM errors

use crate::vm::instructions::Instruction;
use crate::vm::opcode::Opcode;
use std::fmt;
use thiserror::Error;

/// VM result
pub type VMResult<T> = Result<T, VMError>;

/// VM errors
///
/// Every variant is fatal: the run stops and the VM moves to
/// [`VMStatus::Failed`](crate::vm::VMStatus). Index fields are 0-based
/// instruction indices, line fields are 1-based lines of bytecode text.
#[derive(Debug, Error)]
pub enum VMError {
    // === Bytecode text ===
    #[error("line {line}: unknown opcode `{mnemonic}`")]
    UnknownOpcode { line: usize, mnemonic: String },

    #[error("line {line}: `{opcode}` expects an operand")]
    MissingOperand { line: usize, opcode: Opcode },

    #[error("line {line}: invalid operand `{operand}` for `{opcode}`")]
    InvalidOperand {
        line: usize,
        opcode: Opcode,
        operand: String,
    },

    // === Label pre-scan ===
    #[error("undefined label `{label}` referenced by `{instruction}` at index {index}")]
    UndefinedLabel {
        label: String,
        index: usize,
        instruction: Instruction,
    },

    #[error("label `{label}` at index {index} was already defined at index {first}")]
    DuplicateLabel {
        label: String,
        index: usize,
        first: usize,
    },

    // === Execution ===
    #[error("stack underflow at index {index} (`{instruction}`)")]
    StackUnderflow { index: usize, instruction: Instruction },

    #[error("stack overflow at index {index}: depth limit {limit}")]
    StackOverflow { index: usize, limit: usize },

    #[error("type error at index {index} (`{instruction}`): {message}")]
    TypeError {
        index: usize,
        instruction: Instruction,
        message: String,
    },

    #[error("`{instruction}` at index {index} has no enclosing handler")]
    UnresolvedControlTransfer { index: usize, instruction: Instruction },

    #[error("execution exceeded the limit of {limit} steps")]
    StepLimitExceeded { limit: u64 },

    #[error("input closed while executing `READ` at index {index}")]
    InputClosed { index: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl VMError {
    /// Instruction index the error points at, if any
    pub fn index(&self) -> Option<usize> {
        match self {
            VMError::UndefinedLabel { index, .. }
            | VMError::DuplicateLabel { index, .. }
            | VMError::StackUnderflow { index, .. }
            | VMError::StackOverflow { index, .. }
            | VMError::TypeError { index, .. }
            | VMError::UnresolvedControlTransfer { index, .. }
            | VMError::InputClosed { index } => Some(*index),
            _ => None,
        }
    }
}

/// Non-fatal runtime conditions. Execution continues after each one.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// `DIV` with a zero divisor; the result is `f64::INFINITY`
    DivisionByZero { index: usize },
    /// Bare `PRINT` on an empty stack; nothing is printed
    StackUnderflow { index: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Diagnostic::DivisionByZero { index } => {
                write!(f, "division by zero at index {}, result is inf", index)
            }
            Diagnostic::StackUnderflow { index } => {
                write!(f, "PRINT on an empty stack at index {}, skipped", index)
            }
        }
    }
}
