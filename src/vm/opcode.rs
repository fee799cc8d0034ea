//! 字节码操作码定义
//!
//! 栈式指令集：操作数通过唯一的操作数栈传递。
//! 每个操作码最多携带一个操作数，操作数的种类由 [`OperandKind`] 描述。

use crate::frontend::ast::BinOp;
use std::fmt;

/// 操作数种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// 无操作数
    None,
    /// 数值字面量
    Number,
    /// 变量名或标签名
    Name,
    /// 引号包裹的文本，必须存在
    Text,
    /// 引号包裹的文本，可省略
    OptionalText,
}

/// 字节码操作码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // 栈与变量
    /// 压入数值
    Push,
    /// 读取变量压栈
    Load,
    /// 弹栈写入变量
    Store,

    // 算术
    Add,
    Sub,
    Mul,
    Div,

    // 比较（结果为 1.0 / 0.0）
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,

    // 控制流
    /// 弹栈，非零则跳转
    Jnz,
    /// 无条件跳转
    Jmp,
    /// 标签定义（跳转目标）
    Label,

    // 输入输出
    /// 带文本时打印文本，否则弹栈打印
    Print,
    /// 读取一行输入并压栈
    Read,

    // 非局部控制转移
    Break,
    Continue,
    Return,
}

impl Opcode {
    pub const ALL: [Opcode; 21] = [
        Opcode::Push,
        Opcode::Load,
        Opcode::Store,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Gt,
        Opcode::Lt,
        Opcode::Ge,
        Opcode::Le,
        Opcode::Eq,
        Opcode::Ne,
        Opcode::Jnz,
        Opcode::Jmp,
        Opcode::Label,
        Opcode::Print,
        Opcode::Read,
        Opcode::Break,
        Opcode::Continue,
        Opcode::Return,
    ];

    /// 获取指令助记符
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Push => "PUSH",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Gt => "GT",
            Opcode::Lt => "LT",
            Opcode::Ge => "GE",
            Opcode::Le => "LE",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Jnz => "JNZ",
            Opcode::Jmp => "JMP",
            Opcode::Label => "LABEL",
            Opcode::Print => "PRINT",
            Opcode::Read => "READ",
            Opcode::Break => "BREAK",
            Opcode::Continue => "CONTINUE",
            Opcode::Return => "RETURN",
        }
    }

    /// 从助记符查找操作码（区分大小写）
    pub fn from_name(name: &str) -> Option<Opcode> {
        Opcode::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn operand_kind(&self) -> OperandKind {
        match self {
            Opcode::Push => OperandKind::Number,
            Opcode::Load | Opcode::Store | Opcode::Jnz | Opcode::Jmp | Opcode::Label => {
                OperandKind::Name
            }
            Opcode::Read => OperandKind::Text,
            Opcode::Print => OperandKind::OptionalText,
            _ => OperandKind::None,
        }
    }

    /// 对应的二元运算符
    pub fn bin_op(&self) -> Option<BinOp> {
        match self {
            Opcode::Add => Some(BinOp::Add),
            Opcode::Sub => Some(BinOp::Sub),
            Opcode::Mul => Some(BinOp::Mul),
            Opcode::Div => Some(BinOp::Div),
            Opcode::Gt => Some(BinOp::Gt),
            Opcode::Lt => Some(BinOp::Lt),
            Opcode::Ge => Some(BinOp::Ge),
            Opcode::Le => Some(BinOp::Le),
            Opcode::Eq => Some(BinOp::Eq),
            Opcode::Ne => Some(BinOp::Ne),
            _ => None,
        }
    }

    /// 二元运算符对应的操作码
    pub fn from_bin_op(op: BinOp) -> Opcode {
        match op {
            BinOp::Add => Opcode::Add,
            BinOp::Sub => Opcode::Sub,
            BinOp::Mul => Opcode::Mul,
            BinOp::Div => Opcode::Div,
            BinOp::Gt => Opcode::Gt,
            BinOp::Lt => Opcode::Lt,
            BinOp::Ge => Opcode::Ge,
            BinOp::Le => Opcode::Le,
            BinOp::Eq => Opcode::Eq,
            BinOp::Ne => Opcode::Ne,
        }
    }

    /// 是否是跳转指令
    pub fn is_jump_op(&self) -> bool {
        matches!(self, Opcode::Jnz | Opcode::Jmp)
    }

    /// 是否是非局部控制转移
    pub fn is_control_transfer(&self) -> bool {
        matches!(self, Opcode::Break | Opcode::Continue | Opcode::Return)
    }
}

impl fmt::Display for Opcode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
