//! VM instructions
//!
//! Bytecode text form: one instruction per line, the mnemonic optionally
//! followed by one operand (`PUSH 5`, `STORE cont`, `JNZ L2`,
//! `PRINT "text"`). Blank lines and `#` comments are skipped when parsing.

use crate::frontend::ast::BinOp;
use crate::util::quote::{split_quoted, Quoted};
use crate::vm::errors::{VMError, VMResult};
use crate::vm::opcode::{Opcode, OperandKind};
use std::fmt;
use std::str::FromStr;

/// VM instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Push(f64),
    Load(String),
    Store(String),
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    Jnz(String),
    Jmp(String),
    Label(String),
    /// `PRINT "text"` with text, bare `PRINT` pops the top of the stack
    Print(Option<String>),
    Read(String),
    Break,
    Continue,
    Return,
}

impl Instruction {
    /// Get opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Push(_) => Opcode::Push,
            Instruction::Load(_) => Opcode::Load,
            Instruction::Store(_) => Opcode::Store,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::Mul => Opcode::Mul,
            Instruction::Div => Opcode::Div,
            Instruction::Gt => Opcode::Gt,
            Instruction::Lt => Opcode::Lt,
            Instruction::Ge => Opcode::Ge,
            Instruction::Le => Opcode::Le,
            Instruction::Eq => Opcode::Eq,
            Instruction::Ne => Opcode::Ne,
            Instruction::Jnz(_) => Opcode::Jnz,
            Instruction::Jmp(_) => Opcode::Jmp,
            Instruction::Label(_) => Opcode::Label,
            Instruction::Print(_) => Opcode::Print,
            Instruction::Read(_) => Opcode::Read,
            Instruction::Break => Opcode::Break,
            Instruction::Continue => Opcode::Continue,
            Instruction::Return => Opcode::Return,
        }
    }

    /// The operator-only instruction for a binary operator
    pub fn binary(op: BinOp) -> Self {
        match op {
            BinOp::Add => Instruction::Add,
            BinOp::Sub => Instruction::Sub,
            BinOp::Mul => Instruction::Mul,
            BinOp::Div => Instruction::Div,
            BinOp::Gt => Instruction::Gt,
            BinOp::Lt => Instruction::Lt,
            BinOp::Ge => Instruction::Ge,
            BinOp::Le => Instruction::Le,
            BinOp::Eq => Instruction::Eq,
            BinOp::Ne => Instruction::Ne,
        }
    }

    /// Label referenced by a jump
    pub fn jump_target(&self) -> Option<&str> {
        match self {
            Instruction::Jnz(label) | Instruction::Jmp(label) => Some(label),
            _ => None,
        }
    }

    /// Build an instruction from its opcode and raw operand text
    fn from_parts(
        opcode: Opcode,
        operand: Option<&str>,
        line: usize,
    ) -> VMResult<Self> {
        let operand = operand.map(str::trim).filter(|s| !s.is_empty());
        let missing = || VMError::MissingOperand { line, opcode };
        let invalid = |operand: &str| VMError::InvalidOperand {
            line,
            opcode,
            operand: operand.to_string(),
        };

        let name = |operand: Option<&str>| -> VMResult<String> {
            let operand = operand.ok_or_else(missing)?;
            if operand.contains(char::is_whitespace) {
                return Err(invalid(operand));
            }
            Ok(operand.to_string())
        };
        let text = |operand: &str| -> VMResult<String> {
            match split_quoted(operand) {
                Ok((text, rest)) if rest.trim().is_empty() => Ok(text),
                _ => Err(invalid(operand)),
            }
        };

        if opcode.operand_kind() == OperandKind::None {
            if let Some(extra) = operand {
                return Err(invalid(extra));
            }
        }

        Ok(match opcode {
            Opcode::Push => {
                let raw = operand.ok_or_else(missing)?;
                Instruction::Push(raw.parse::<f64>().map_err(|_| invalid(raw))?)
            }
            Opcode::Load => Instruction::Load(name(operand)?),
            Opcode::Store => Instruction::Store(name(operand)?),
            Opcode::Jnz => Instruction::Jnz(name(operand)?),
            Opcode::Jmp => Instruction::Jmp(name(operand)?),
            Opcode::Label => Instruction::Label(name(operand)?),
            Opcode::Print => Instruction::Print(operand.map(&text).transpose()?),
            Opcode::Read => Instruction::Read(text(operand.ok_or_else(missing)?)?),
            Opcode::Add => Instruction::Add,
            Opcode::Sub => Instruction::Sub,
            Opcode::Mul => Instruction::Mul,
            Opcode::Div => Instruction::Div,
            Opcode::Gt => Instruction::Gt,
            Opcode::Lt => Instruction::Lt,
            Opcode::Ge => Instruction::Ge,
            Opcode::Le => Instruction::Le,
            Opcode::Eq => Instruction::Eq,
            Opcode::Ne => Instruction::Ne,
            Opcode::Break => Instruction::Break,
            Opcode::Continue => Instruction::Continue,
            Opcode::Return => Instruction::Return,
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let opcode = self.opcode();
        match self {
            Instruction::Push(n) => write!(f, "{} {}", opcode, n),
            Instruction::Load(name)
            | Instruction::Store(name)
            | Instruction::Jnz(name)
            | Instruction::Jmp(name)
            | Instruction::Label(name) => write!(f, "{} {}", opcode, name),
            Instruction::Print(Some(text)) | Instruction::Read(text) => {
                write!(f, "{} {}", opcode, Quoted(text))
            }
            _ => write!(f, "{}", opcode),
        }
    }
}

/// Parse one line of bytecode text. `line` is 1-based and only used for errors.
pub fn parse_instruction(
    text: &str,
    line: usize,
) -> VMResult<Instruction> {
    let text = text.trim();
    let (mnemonic, operand) = match text.split_once(char::is_whitespace) {
        Some((mnemonic, rest)) => (mnemonic, Some(rest)),
        None => (text, None),
    };
    let opcode = Opcode::from_name(mnemonic).ok_or_else(|| VMError::UnknownOpcode {
        line,
        mnemonic: mnemonic.to_string(),
    })?;
    Instruction::from_parts(opcode, operand, line)
}

impl FromStr for Instruction {
    type Err = VMError;

    fn from_str(s: &str) -> VMResult<Self> {
        parse_instruction(s, 1)
    }
}

/// Parse a whole bytecode listing
pub fn parse_program(text: &str) -> VMResult<Vec<Instruction>> {
    text.lines()
        .enumerate()
        .map(|(idx, raw)| (idx + 1, raw.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| parse_instruction(text, line))
        .collect()
}

/// Render a listing in the text form
pub fn to_text(code: &[Instruction]) -> String {
    code.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("\n")
}
