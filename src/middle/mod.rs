//! Intermediate Representation (IR) and code generation
//!
//! This module handles the transformation from AST to bytecode:
//! lowering, optimization, and stack code generation.

pub mod codegen;
pub mod ir;
pub mod lower;
pub mod optimizer;

pub use codegen::{generate, BytecodeGenerator};
pub use ir::{Expr, Instruction, IrParseError, Operand};
pub use lower::{lower, LowerError, Lowerer, LoweringContext};
pub use optimizer::{optimize, Optimizer, OptimizerConfig};

#[cfg(test)]
mod tests;
