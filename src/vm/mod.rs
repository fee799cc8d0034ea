//! Virtual Machine and bytecode execution
//!
//! This module contains the stack-machine instruction set and its interpreter.

pub use errors::{Diagnostic, VMError, VMResult};
pub use executor::{Completion, VMConfig, VMStatus, Value, VM};
pub use instructions::{parse_instruction, parse_program, to_text, Instruction};
pub use opcode::{Opcode, OperandKind};

pub mod errors;
pub mod executor;
pub mod instructions;
pub mod opcode;
