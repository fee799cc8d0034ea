//! 优化器测试

use crate::frontend::ast::BinOp;
use crate::middle::ir::{parse_program, to_text, Expr, Instruction, Operand};
use crate::middle::optimizer::{optimize, ConstFoldPass, DcePass, Optimizer, OptimizerConfig};
use proptest::prelude::*;

fn ir(text: &str) -> Vec<Instruction> {
    parse_program(text).unwrap()
}

fn fold(text: &str) -> String {
    to_text(&ConstFoldPass::new().run(ir(text)))
}

fn dce(text: &str) -> String {
    to_text(&DcePass::new().run(ir(text)))
}

#[cfg(test)]
mod const_fold_tests {
    use super::*;

    #[test]
    fn test_propagate_and_fold() {
        assert_eq!(
            fold("x = 2\ny = 3\nz = x + y\nprint \"\", z"),
            "x = 2\ny = 3\nz = 5\nprint \"\", z"
        );
    }

    #[test]
    fn test_fold_chains_through_temps() {
        assert_eq!(
            fold("t0 = 2 * 3\nt1 = t0 - 1\na = t1"),
            "t0 = 6\nt1 = 5\na = 5"
        );
    }

    #[test]
    fn test_fold_uses_vm_semantics() {
        assert_eq!(
            fold("a = 1 / 0\nb = 3 > 2\nc = 3 <= 2\nd = 2 != 2"),
            "a = +inf\nb = 1\nc = 0\nd = 0"
        );
    }

    #[test]
    fn test_unknown_operand_blocks_fold() {
        assert_eq!(fold("a = 4\nb = a + n"), "a = 4\nb = 4 + n");
    }

    #[test]
    fn test_reassignment_forgets_constant() {
        assert_eq!(
            fold("a = 1\na = READ \"?\"\nb = a + 1\nc = n\nd = c * 2"),
            "a = 1\na = READ \"?\"\nb = a + 1\nc = n\nd = c * 2"
        );
    }

    #[test]
    fn test_non_assignments_pass_through() {
        let text = "a = 1\nif a goto L0\nprint \"v\", a\nreturn a";
        assert_eq!(fold(text), text);
    }

    #[test]
    fn test_label_clears_known_constants() {
        // x is 1 on the fall-through path and 2 on the jump path
        let text = "x = 1\nif c goto L1\nx = 2\nL1:\ny = x + 1\nprint \"\", y";
        let mut pass = ConstFoldPass::new();
        let out = pass.run(ir(text));
        assert_eq!(to_text(&out), text);
        assert_eq!(pass.stats().invalidations, 1);
        assert_eq!(pass.stats().folded_exprs, 0);
    }

    #[test]
    fn test_stats() {
        let mut pass = ConstFoldPass::new();
        pass.run(ir("x = 2\ny = x\nz = x + y"));
        assert_eq!(pass.stats().substituted_operands, 3);
        assert_eq!(pass.stats().folded_exprs, 1);
    }
}

#[cfg(test)]
mod dce_tests {
    use super::*;

    #[test]
    fn test_unused_assignment_removed() {
        assert_eq!(dce("a = 1\nb = 2\nprint \"v\", a"), "a = 1\nprint \"v\", a");
    }

    #[test]
    fn test_transitive_liveness() {
        assert_eq!(
            dce("t0 = a + b\nt1 = t0 * 2\nt2 = c - 1\nr = t1\nreturn r"),
            "t0 = a + b\nt1 = t0 * 2\nr = t1\nreturn r"
        );
    }

    #[test]
    fn test_overwritten_assignment_kept_when_read_later() {
        let text = "a = 1\na = 2\nprint \"\", a";
        assert_eq!(dce(text), text);

        let text = "a = READ \"p\"\nx = a\nx = a + 1\nprint \"v\", x";
        assert_eq!(dce(text), text);
    }

    #[test]
    fn test_overwritten_assignment_removed_when_never_read() {
        assert_eq!(dce("a = 1\nb = a\na = 2\nprint \"\", a"), "a = 1\na = 2\nprint \"\", a");
    }

    #[test]
    fn test_control_flow_kept() {
        let text = "L0:\nif c goto L1\ngoto L0\nL1:\nbreak\ncontinue\n# import x\nreturn";
        assert_eq!(dce(text), text);
    }

    #[test]
    fn test_read_always_kept() {
        assert_eq!(dce("t0 = READ \"skip\"\nn = t0"), "t0 = READ \"skip\"");
    }

    #[test]
    fn test_loop_carried_update_kept() {
        // counted loop: the increment is only read on the back edge
        let text = "t0 = 0\nL0:\nt1 = t0 >= 3\nif t1 goto L2\nk = t0\nprint \"\", k\n\
                    L1:\nt0 = t0 + 1\ngoto L0\nL2:";
        let mut pass = DcePass::new();
        assert_eq!(to_text(&pass.run(ir(text))), text);
        assert!(pass.stats().iterations > 1);
        assert_eq!(pass.stats().removed, 0);
    }

    #[test]
    fn test_value_live_across_forward_jump() {
        let text = "a = 5\ngoto L1\nL0:\nb = 1\nL1:\nprint \"\", a";
        assert_eq!(dce(text), "a = 5\ngoto L1\nL0:\nL1:\nprint \"\", a");
    }

    #[test]
    fn test_straight_line_single_scan() {
        let mut pass = DcePass::new();
        pass.run(ir("a = 1\nb = a\nprint \"\", b"));
        // one scan to settle, one to observe no change
        assert_eq!(pass.stats().iterations, 2);
    }
}

#[cfg(test)]
mod optimizer_tests {
    use super::*;

    #[test]
    fn test_fold_then_eliminate() {
        assert_eq!(
            to_text(&optimize(ir("x = 2\ny = 3\nz = x + y\nprint \"\", z"))),
            "z = 5\nprint \"\", z"
        );
    }

    #[test]
    fn test_reassigned_variable_keeps_first_value() {
        assert_eq!(
            to_text(&optimize(ir("x = 1\ny = x\nx = 2\nprint \"v\", x, y"))),
            "x = 1\ny = 1\nx = 2\nprint \"v\", x, y"
        );
    }

    #[test]
    fn test_disabled_is_identity() {
        let code = ir("x = 2\ny = 3\nz = x + y");
        let mut optimizer = Optimizer::new(OptimizerConfig::disabled());
        assert_eq!(optimizer.optimize(code.clone()), code);
        assert_eq!(optimizer.stats().dce.removed, 0);
    }

    #[test]
    fn test_fold_only() {
        let config = OptimizerConfig {
            constant_folding: true,
            dead_code_elimination: false,
        };
        let out = Optimizer::new(config).optimize(ir("x = 2\nz = x + 1"));
        assert_eq!(to_text(&out), "x = 2\nz = 3");
    }

    #[test]
    fn test_stats_reported() {
        let mut optimizer = Optimizer::default();
        optimizer.optimize(ir("a = 1\nb = 2\nprint \"v\", a"));
        assert_eq!(optimizer.stats().dce.removed, 1);
    }

    #[test]
    fn test_optimize_optimized_is_noop() {
        let once = optimize(ir(
            "i = 0\nL0:\nt0 = i < 3\nif t0 goto L1\ngoto L2\nL1:\nprint \"\", i\n\
             t1 = i + 1\ni = t1\ngoto L0\nL2:\nj = 4 * 2\nprint \"j\", j",
        ));
        assert_eq!(optimize(once.clone()), once);
    }
}

// --- property tests ---

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("a"), Just("b"), Just("c"), Just("t0"), Just("t1")].prop_map(String::from)
}

fn label_strategy() -> impl Strategy<Value = String> {
    (0..3usize).prop_map(|n| format!("L{}", n))
}

fn operand_strategy() -> impl Strategy<Value = Operand> {
    prop_oneof![
        (-5i32..5).prop_map(|n| Operand::Number(n as f64)),
        name_strategy().prop_map(Operand::Name),
    ]
}

fn op_strategy() -> impl Strategy<Value = BinOp> {
    (0..BinOp::ALL.len()).prop_map(|i| BinOp::ALL[i])
}

fn instruction_strategy() -> impl Strategy<Value = Instruction> {
    prop_oneof![
        4 => (name_strategy(), operand_strategy())
            .prop_map(|(d, v)| Instruction::assign(d, Expr::Value(v))),
        4 => (name_strategy(), operand_strategy(), op_strategy(), operand_strategy())
            .prop_map(|(d, lhs, op, rhs)| Instruction::assign(d, Expr::Binary { lhs, op, rhs })),
        1 => name_strategy().prop_map(|d| Instruction::assign(d, Expr::Read { prompt: String::new() })),
        2 => label_strategy().prop_map(Instruction::label),
        1 => label_strategy().prop_map(Instruction::goto),
        1 => (operand_strategy(), label_strategy())
            .prop_map(|(cond, label)| Instruction::CondGoto { cond, label }),
        2 => prop::collection::vec(operand_strategy(), 0..3)
            .prop_map(|args| Instruction::Print { text: String::new(), args }),
        1 => prop::option::of(operand_strategy()).prop_map(|value| Instruction::Return { value }),
    ]
}

proptest! {
    #[test]
    fn prop_optimize_is_idempotent(code in prop::collection::vec(instruction_strategy(), 0..40)) {
        // compared as text: a folded `0 / 0` is NaN, which never equals itself
        let once = optimize(code);
        prop_assert_eq!(to_text(&optimize(once.clone())), to_text(&once));
    }

    #[test]
    fn prop_dce_never_drops_effects(code in prop::collection::vec(instruction_strategy(), 0..40)) {
        let effects = |code: &[Instruction]| {
            code.iter()
                .filter(|i| !matches!(i, Instruction::Assign { expr: Expr::Value(_) | Expr::Binary { .. }, .. }))
                .cloned()
                .collect::<Vec<_>>()
        };
        let out = DcePass::new().run(code.clone());
        prop_assert_eq!(to_text(&effects(&out)), to_text(&effects(&code)));
    }
}
