//! Abstract Syntax Tree types
//!
//! The tree is produced by an external front end and handed to the lowerer.
//! Every node is serde-serializable with an internal `kind` tag so a parser
//! written in any language can hand its output over as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl BinOp {
    /// All operators, in symbol-table order
    pub const ALL: [BinOp; 10] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::Gt,
        BinOp::Lt,
        BinOp::Ge,
        BinOp::Le,
        BinOp::Eq,
        BinOp::Ne,
    ];

    /// Source symbol of the operator
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Ge => ">=",
            BinOp::Le => "<=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
        }
    }

    /// Look up an operator by its source symbol
    pub fn from_symbol(symbol: &str) -> Option<BinOp> {
        BinOp::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Whether the operator yields a 1/0 truth value
    pub fn is_comparison(&self) -> bool {
        !matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }

    /// Apply the operator to two numbers.
    ///
    /// Division by zero yields `f64::INFINITY`, comparisons yield `1.0`/`0.0`.
    /// Shared by constant folding and the VM.
    pub fn apply(
        &self,
        lhs: f64,
        rhs: f64,
    ) -> f64 {
        let truth = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            BinOp::Add => lhs + rhs,
            BinOp::Sub => lhs - rhs,
            BinOp::Mul => lhs * rhs,
            BinOp::Div => {
                if rhs == 0.0 {
                    f64::INFINITY
                } else {
                    lhs / rhs
                }
            }
            BinOp::Gt => truth(lhs > rhs),
            BinOp::Lt => truth(lhs < rhs),
            BinOp::Ge => truth(lhs >= rhs),
            BinOp::Le => truth(lhs <= rhs),
            BinOp::Eq => truth(lhs == rhs),
            BinOp::Ne => truth(lhs != rhs),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    NumberLiteral {
        value: f64,
    },
    BoolLiteral {
        value: bool,
    },
    Variable {
        name: String,
    },
    BinaryExpr {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// Read one line of input, shown with `prompt`
    Read {
        prompt: String,
    },
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::NumberLiteral { value }
    }

    pub fn boolean(value: bool) -> Self {
        Expr::BoolLiteral { value }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable { name: name.into() }
    }

    pub fn binary(
        left: Expr,
        op: BinOp,
        right: Expr,
    ) -> Self {
        Expr::BinaryExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn read(prompt: impl Into<String>) -> Self {
        Expr::Read {
            prompt: prompt.into(),
        }
    }
}

/// One `if`/`elif` arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: Expr,
    pub block: Vec<Stmt>,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Stmt {
    VarDecl {
        name: String,
        expr: Expr,
    },
    Reassign {
        name: String,
        expr: Expr,
    },
    Print {
        text: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// `if` / `elif` chain with an optional trailing `else`
    If {
        branches: Vec<Branch>,
        #[serde(default)]
        else_block: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        block: Vec<Stmt>,
    },
    DoWhile {
        block: Vec<Stmt>,
        condition: Expr,
    },
    /// Run `block` `count` times with `variable` bound to 0, 1, ...
    For {
        variable: String,
        count: Expr,
        block: Vec<Stmt>,
    },
    Break,
    Continue,
    Return {
        #[serde(default)]
        expr: Option<Expr>,
    },
    Block {
        statements: Vec<Stmt>,
    },
    Import {
        path: String,
    },
}

impl Stmt {
    pub fn var_decl(
        name: impl Into<String>,
        expr: Expr,
    ) -> Self {
        Stmt::VarDecl {
            name: name.into(),
            expr,
        }
    }

    pub fn reassign(
        name: impl Into<String>,
        expr: Expr,
    ) -> Self {
        Stmt::Reassign {
            name: name.into(),
            expr,
        }
    }

    pub fn print(
        text: impl Into<String>,
        args: Vec<Expr>,
    ) -> Self {
        Stmt::Print {
            text: text.into(),
            args,
        }
    }
}

/// Program root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}
