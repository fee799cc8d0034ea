//! Bytecode Generator
//!
//! Translates three-address IR into stack-machine bytecode, one IR
//! instruction at a time. The translation is purely syntactic: labels and
//! jumps are copied through by name and resolved by the VM's label pre-scan.

use crate::middle::ir::{Expr, Instruction, Operand};
use crate::vm::instructions::Instruction as Bytecode;
use tracing::debug;

#[derive(Debug, Default)]
pub struct BytecodeGenerator {
    instructions: Vec<Bytecode>,
}

impl BytecodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(
        mut self,
        ir: &[Instruction],
    ) -> Vec<Bytecode> {
        for instr in ir {
            self.translate_instruction(instr);
        }
        debug!(
            "Generated {} bytecode instructions from {} IR instructions",
            self.instructions.len(),
            ir.len()
        );
        self.instructions
    }

    fn translate_instruction(
        &mut self,
        instr: &Instruction,
    ) {
        match instr {
            Instruction::Assign { dest, expr } => {
                match expr {
                    Expr::Value(value) => self.emit_load_operand(value),
                    Expr::Binary { lhs, op, rhs } => {
                        self.emit_load_operand(lhs);
                        self.emit_load_operand(rhs);
                        self.emit(Bytecode::binary(*op));
                    }
                    Expr::Read { prompt } => self.emit(Bytecode::Read(prompt.clone())),
                }
                self.emit(Bytecode::Store(dest.clone()));
            }
            Instruction::CondGoto { cond, label } => {
                self.emit_load_operand(cond);
                self.emit(Bytecode::Jnz(label.clone()));
            }
            Instruction::Goto { label } => self.emit(Bytecode::Jmp(label.clone())),
            Instruction::Label { name } => self.emit(Bytecode::Label(name.clone())),
            Instruction::Print { text, args } => {
                // 先打印字面文本，再按声明顺序打印各参数
                if !text.is_empty() {
                    self.emit(Bytecode::Print(Some(text.clone())));
                }
                for arg in args {
                    self.emit_load_operand(arg);
                    self.emit(Bytecode::Print(None));
                }
            }
            Instruction::Break => self.emit(Bytecode::Break),
            Instruction::Continue => self.emit(Bytecode::Continue),
            Instruction::Return { value } => {
                if let Some(value) = value {
                    self.emit_load_operand(value);
                }
                self.emit(Bytecode::Return);
            }
            Instruction::Comment { .. } => {}
        }
    }

    /// literal → `PUSH`, variable → `LOAD`
    fn emit_load_operand(
        &mut self,
        operand: &Operand,
    ) {
        let instr = match operand {
            Operand::Number(n) => Bytecode::Push(*n),
            Operand::Name(name) => Bytecode::Load(name.clone()),
        };
        self.emit(instr);
    }

    fn emit(
        &mut self,
        instr: Bytecode,
    ) {
        self.instructions.push(instr);
    }
}
