//! 代码生成器
//!
//! 将优化后的中间表示（IR）转换为栈式字节码。
//! 每条 IR 指令独立翻译为零到多条字节码，与控制流语义无关。

pub mod generator;

pub use generator::BytecodeGenerator;

use crate::middle::ir::Instruction;
use crate::vm::instructions::Instruction as Bytecode;

/// 生成字节码
pub fn generate(ir: &[Instruction]) -> Vec<Bytecode> {
    BytecodeGenerator::new().generate(ir)
}

#[cfg(test)]
mod tests;
