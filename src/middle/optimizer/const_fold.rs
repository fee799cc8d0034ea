//! 常量传播与常量折叠
//!
//! 单次前向扫描，维护 变量名 → 已知数值常量 的映射。
//! 标签是控制流汇合点：进入标签时清空映射，
//! 避免不同路径上的常量互相泄漏。

use crate::middle::ir::{Expr, Instruction, Operand};
use std::collections::HashMap;

/// 折叠统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstFoldStats {
    /// 被替换为常量的操作数
    pub substituted_operands: usize,
    /// 被折叠的二元表达式
    pub folded_exprs: usize,
    /// 在标签处丢弃的常量知识
    pub invalidations: usize,
}

/// 常量传播 + 折叠 pass
#[derive(Debug, Default)]
pub struct ConstFoldPass {
    constants: HashMap<String, f64>,
    stats: ConstFoldStats,
}

impl ConstFoldPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &ConstFoldStats {
        &self.stats
    }

    pub fn run(
        &mut self,
        code: Vec<Instruction>,
    ) -> Vec<Instruction> {
        self.constants.clear();
        code.into_iter().map(|inst| self.fold_instruction(inst)).collect()
    }

    fn fold_instruction(
        &mut self,
        inst: Instruction,
    ) -> Instruction {
        match inst {
            Instruction::Assign { dest, expr } => {
                let expr = match expr {
                    Expr::Value(v) => Expr::Value(self.substitute(v)),
                    Expr::Binary { lhs, op, rhs } => {
                        let lhs = self.substitute(lhs);
                        let rhs = self.substitute(rhs);
                        match (lhs.as_number(), rhs.as_number()) {
                            (Some(a), Some(b)) => {
                                self.stats.folded_exprs += 1;
                                Expr::Value(Operand::Number(op.apply(a, b)))
                            }
                            _ => Expr::Binary { lhs, op, rhs },
                        }
                    }
                    read @ Expr::Read { .. } => read,
                };
                match &expr {
                    Expr::Value(Operand::Number(n)) => {
                        self.constants.insert(dest.clone(), *n);
                    }
                    _ => {
                        self.constants.remove(&dest);
                    }
                }
                Instruction::Assign { dest, expr }
            }
            Instruction::Label { name } => {
                if !self.constants.is_empty() {
                    self.stats.invalidations += self.constants.len();
                    self.constants.clear();
                }
                Instruction::Label { name }
            }
            other => other,
        }
    }

    fn substitute(
        &mut self,
        operand: Operand,
    ) -> Operand {
        match operand {
            Operand::Name(name) => match self.constants.get(&name) {
                Some(value) => {
                    self.stats.substituted_operands += 1;
                    Operand::Number(*value)
                }
                None => Operand::Name(name),
            },
            literal => literal,
        }
    }
}
