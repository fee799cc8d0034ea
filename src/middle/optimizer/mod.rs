//! IR 优化器
//!
//! 两个固定的 pass，各运行一次（不迭代到不动点）：
//! 1. 常量传播 + 常量折叠（[`ConstFoldPass`]）
//! 2. 死代码消除（[`DcePass`]）
//!
//! 优化器不做输入校验：畸形的 IR 原样传下去。

pub mod const_fold;
pub mod dce;

pub use const_fold::{ConstFoldPass, ConstFoldStats};
pub use dce::{DcePass, DceStats};

use crate::middle::ir::Instruction;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 优化器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// 是否启用常量传播与折叠
    #[serde(default = "default_enabled")]
    pub constant_folding: bool,
    /// 是否启用死代码消除
    #[serde(default = "default_enabled")]
    pub dead_code_elimination: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            constant_folding: true,
            dead_code_elimination: true,
        }
    }
}

impl OptimizerConfig {
    /// 关闭全部 pass
    pub fn disabled() -> Self {
        Self {
            constant_folding: false,
            dead_code_elimination: false,
        }
    }
}

/// 优化统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub fold: ConstFoldStats,
    pub dce: DceStats,
}

/// IR 优化器
#[derive(Debug, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
    stats: OptimizeStats,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            stats: OptimizeStats::default(),
        }
    }

    pub fn stats(&self) -> &OptimizeStats {
        &self.stats
    }

    pub fn optimize(
        &mut self,
        code: Vec<Instruction>,
    ) -> Vec<Instruction> {
        let input_len = code.len();
        let mut code = code;

        if self.config.constant_folding {
            let mut pass = ConstFoldPass::new();
            code = pass.run(code);
            self.stats.fold = pass.stats().clone();
            debug!(
                "Constant folding: {} operands substituted, {} expressions folded",
                self.stats.fold.substituted_operands, self.stats.fold.folded_exprs
            );
        }

        if self.config.dead_code_elimination {
            let mut pass = DcePass::new();
            code = pass.run(code);
            self.stats.dce = pass.stats().clone();
            debug!(
                "Dead code elimination: {} assignments removed",
                self.stats.dce.removed
            );
        }

        debug!("Optimized {} -> {} IR instructions", input_len, code.len());
        code
    }
}

/// 以默认配置优化
pub fn optimize(code: Vec<Instruction>) -> Vec<Instruction> {
    Optimizer::default().optimize(code)
}

#[cfg(test)]
mod tests;
