//! 代码生成器测试

use crate::frontend::ast::BinOp;
use crate::middle::codegen::generate;
use crate::middle::ir::{self, Expr, Instruction, Operand};
use crate::vm::instructions::{to_text, Instruction as Bytecode};
use proptest::prelude::*;

fn gen_text(ir_text: &str) -> String {
    to_text(&generate(&ir::parse_program(ir_text).unwrap()))
}

/// 单条字节码对操作数栈深度的影响
fn stack_effect(inst: &Bytecode) -> i64 {
    match inst {
        Bytecode::Push(_) | Bytecode::Load(_) | Bytecode::Read(_) => 1,
        Bytecode::Store(_) | Bytecode::Jnz(_) | Bytecode::Print(None) | Bytecode::Return => -1,
        Bytecode::Add
        | Bytecode::Sub
        | Bytecode::Mul
        | Bytecode::Div
        | Bytecode::Gt
        | Bytecode::Lt
        | Bytecode::Ge
        | Bytecode::Le
        | Bytecode::Eq
        | Bytecode::Ne => -1,
        Bytecode::Jmp(_)
        | Bytecode::Label(_)
        | Bytecode::Print(Some(_))
        | Bytecode::Break
        | Bytecode::Continue => 0,
    }
}

#[cfg(test)]
mod translation_tests {
    use super::*;

    #[test]
    fn test_assign_literal_and_variable() {
        assert_eq!(gen_text("cont = 5\nx = cont"), "PUSH 5\nSTORE cont\nLOAD cont\nSTORE x");
    }

    #[test]
    fn test_assign_binary() {
        assert_eq!(gen_text("t0 = cont > 3"), "LOAD cont\nPUSH 3\nGT\nSTORE t0");
        for op in BinOp::ALL {
            let code = generate(&[Instruction::assign(
                "t",
                Expr::Binary {
                    lhs: Operand::Number(1.0),
                    op,
                    rhs: Operand::Number(2.0),
                },
            )]);
            assert_eq!(code[2], Bytecode::binary(op));
        }
    }

    #[test]
    fn test_assign_read() {
        assert_eq!(gen_text("t0 = READ \"n? \""), "READ \"n? \"\nSTORE t0");
    }

    #[test]
    fn test_jumps_and_labels() {
        assert_eq!(
            gen_text("if t0 goto L1\ngoto L0\nL1:\nL0:"),
            "LOAD t0\nJNZ L1\nJMP L0\nLABEL L1\nLABEL L0"
        );
        assert_eq!(gen_text("if 1 goto L1\nL1:"), "PUSH 1\nJNZ L1\nLABEL L1");
    }

    #[test]
    fn test_print_text_then_args() {
        assert_eq!(
            gen_text("print \"a and b\", a, 2"),
            "PRINT \"a and b\"\nLOAD a\nPRINT\nPUSH 2\nPRINT"
        );
    }

    #[test]
    fn test_print_empty_text_emits_only_args() {
        assert_eq!(gen_text("print \"\", i"), "LOAD i\nPRINT");
        assert_eq!(gen_text("print \"\""), "");
    }

    #[test]
    fn test_control_transfers() {
        assert_eq!(gen_text("break\ncontinue"), "BREAK\nCONTINUE");
        assert_eq!(gen_text("return t3"), "LOAD t3\nRETURN");
        assert_eq!(gen_text("return 0"), "PUSH 0\nRETURN");
        assert_eq!(gen_text("return"), "RETURN");
    }

    #[test]
    fn test_comment_emits_nothing() {
        assert_eq!(gen_text("# import lib\nx = 1"), "PUSH 1\nSTORE x");
    }

    #[test]
    fn test_conditional_example() {
        let ir_text = "cont = 5\nt0 = cont > 3\nif t0 goto L1\ngoto L0\nL1:\n\
                       print \"Cont es mayor a 3\"\ngoto L0\nL0:";
        assert_eq!(
            gen_text(ir_text),
            "PUSH 5\nSTORE cont\nLOAD cont\nPUSH 3\nGT\nSTORE t0\nLOAD t0\nJNZ L1\n\
             JMP L0\nLABEL L1\nPRINT \"Cont es mayor a 3\"\nJMP L0\nLABEL L0"
        );
    }
}

// --- property tests ---

fn operand_strategy() -> impl Strategy<Value = Operand> {
    prop_oneof![
        (-100i32..100).prop_map(|n| Operand::Number(n as f64)),
        "[a-z][a-z0-9]{0,3}".prop_map(Operand::Name),
    ]
}

fn instruction_strategy() -> impl Strategy<Value = Instruction> {
    let op = (0..BinOp::ALL.len()).prop_map(|i| BinOp::ALL[i]);
    prop_oneof![
        ("[a-z]", operand_strategy()).prop_map(|(d, v)| Instruction::assign(d, Expr::Value(v))),
        ("[a-z]", operand_strategy(), op, operand_strategy())
            .prop_map(|(d, lhs, op, rhs)| Instruction::assign(d, Expr::Binary { lhs, op, rhs })),
        "[a-z]".prop_map(|d| Instruction::assign(d, Expr::Read { prompt: "?".to_string() })),
        (operand_strategy(), "L[0-9]").prop_map(|(cond, label)| Instruction::CondGoto { cond, label }),
        "L[0-9]".prop_map(Instruction::goto),
        "L[0-9]".prop_map(Instruction::label),
        ("[a-z ]{0,6}", prop::collection::vec(operand_strategy(), 0..4))
            .prop_map(|(text, args)| Instruction::Print { text, args }),
    ]
}

proptest! {
    #[test]
    fn prop_each_instruction_is_stack_neutral(inst in instruction_strategy()) {
        let code = generate(std::slice::from_ref(&inst));
        let mut depth = 0i64;
        for bc in &code {
            depth += stack_effect(bc);
            prop_assert!(depth >= 0, "negative depth in {:?}", code);
        }
        prop_assert_eq!(depth, 0);
    }

    #[test]
    fn prop_listing_parses_back(code in prop::collection::vec(instruction_strategy(), 0..20)) {
        let bytecode = generate(&code);
        let reparsed = crate::vm::parse_program(&to_text(&bytecode)).unwrap();
        prop_assert_eq!(reparsed, bytecode);
    }
}
