//! 死代码消除 (Dead Code Elimination)
//!
//! 反向扫描维护活跃变量集合：
//! - 打印、跳转、条件跳转、标签、返回等指令总是保留，其中出现的变量标记为活跃
//! - 赋值只有在目标活跃时才保留，保留后右侧变量标记为活跃
//! - 活跃集合只增不减：被覆盖的旧赋值只要目标在后面被读过就保留
//! - `READ` 赋值会消费输入，总是保留
//!
//! 每条指令都按顺序落入下一条；跳转额外连一条到目标标签的边。
//! 循环的回边会让单次扫描漏掉循环中携带的更新（比如计数器自增），
//! 所以反向扫描重复到活跃集合不再变化为止。直线代码只需一次扫描。

use crate::middle::ir::{Expr, Instruction};
use std::collections::{HashMap, HashSet};
use tracing::trace;

type LiveSet = HashSet<String>;

/// DCE 统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DceStats {
    /// 删除的赋值数
    pub removed: usize,
    /// 反向扫描的轮数
    pub iterations: usize,
}

/// 死代码消除 pass
#[derive(Debug, Default)]
pub struct DcePass {
    stats: DceStats,
}

impl DcePass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &DceStats {
        &self.stats
    }

    pub fn run(
        &mut self,
        code: Vec<Instruction>,
    ) -> Vec<Instruction> {
        let live_out = self.analyze(&code);
        let before = code.len();
        let kept: Vec<Instruction> = code
            .into_iter()
            .zip(live_out)
            .filter(|(inst, live)| is_kept(inst, live))
            .map(|(inst, _)| inst)
            .collect();
        self.stats.removed = before - kept.len();
        kept
    }

    /// 计算每条指令之后的活跃变量集合
    fn analyze(
        &mut self,
        code: &[Instruction],
    ) -> Vec<LiveSet> {
        let labels: HashMap<&str, usize> = code
            .iter()
            .enumerate()
            .filter_map(|(idx, inst)| match inst {
                Instruction::Label { name } => Some((name.as_str(), idx)),
                _ => None,
            })
            .collect();

        let mut live_in: Vec<LiveSet> = vec![LiveSet::new(); code.len()];
        let mut live_out: Vec<LiveSet> = vec![LiveSet::new(); code.len()];
        self.stats.iterations = 0;

        loop {
            self.stats.iterations += 1;
            let mut changed = false;
            for idx in (0..code.len()).rev() {
                let mut out = LiveSet::new();
                if let Some(next) = live_in.get(idx + 1) {
                    out.extend(next.iter().cloned());
                }
                if let Some(target) = code[idx].jump_target().and_then(|l| labels.get(l)) {
                    out.extend(live_in[*target].iter().cloned());
                }

                let inn = transfer(&code[idx], &out);
                if inn != live_in[idx] {
                    live_in[idx] = inn;
                    changed = true;
                }
                live_out[idx] = out;
            }
            if !changed {
                break;
            }
        }
        trace!("DCE liveness converged after {} scans", self.stats.iterations);
        live_out
    }
}

fn is_kept(
    inst: &Instruction,
    live_out: &LiveSet,
) -> bool {
    match inst {
        Instruction::Assign {
            expr: Expr::Read { .. },
            ..
        } => true,
        Instruction::Assign { dest, .. } => live_out.contains(dest),
        _ => true,
    }
}

/// 活跃变量的传递函数
fn transfer(
    inst: &Instruction,
    out: &LiveSet,
) -> LiveSet {
    let mut live = out.clone();
    match inst {
        Instruction::Assign { expr, .. } => {
            if is_kept(inst, out) {
                live.extend(expr.uses().into_iter().map(String::from));
            }
        }
        other => live.extend(other.uses().into_iter().map(String::from)),
    }
    live
}
