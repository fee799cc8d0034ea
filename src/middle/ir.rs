//! Intermediate Representation
//!
//! Three-address code: every instruction has at most one operator and one
//! destination. The textual form (one instruction per line) is what the
//! `Display` impls print and what [`parse_program`] reads back:
//!
//! ```text
//! cont = 5
//! t0 = cont > 3
//! if t0 goto L1
//! goto L0
//! L1:
//! print "Cont es mayor a 3"
//! L0:
//! ```

use crate::frontend::ast::BinOp;
use crate::util::quote::{self, QuoteError, Quoted};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Instruction operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Numeric literal
    Number(f64),
    /// Variable or temporary
    Name(String),
}

impl Operand {
    pub fn name(name: impl Into<String>) -> Self {
        Operand::Name(name.into())
    }

    /// The referenced variable, if this is not a literal
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(name) => Some(name),
            Operand::Number(_) => None,
        }
    }

    /// The literal value, if this is a literal
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            Operand::Name(_) => None,
        }
    }

    /// Decode a single token.
    ///
    /// Literals start with a digit, `.` or a sign. Non-finite values are
    /// written `+inf`, `-inf` and `+nan`, so a variable named `inf` stays a name.
    pub fn parse_token(token: &str) -> Self {
        let numeric = match token.as_bytes() {
            [b'+' | b'-', ..] => true,
            [first, ..] => first.is_ascii_digit() || *first == b'.',
            [] => false,
        };
        match token.parse::<f64>() {
            Ok(n) if numeric => Operand::Number(n),
            _ => Operand::Name(token.to_string()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Operand::Number(n) if n.is_nan() => f.write_str("+nan"),
            Operand::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "+inf" } else { "-inf" })
            }
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Name(name) => f.write_str(name),
        }
    }
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `dest = value`
    Value(Operand),
    /// `dest = lhs op rhs`
    Binary {
        lhs: Operand,
        op: BinOp,
        rhs: Operand,
    },
    /// `dest = READ "prompt"`
    Read { prompt: String },
}

impl Expr {
    /// Variables read by this expression
    pub fn uses(&self) -> Vec<&str> {
        match self {
            Expr::Value(v) => v.as_name().into_iter().collect(),
            Expr::Binary { lhs, rhs, .. } => lhs.as_name().into_iter().chain(rhs.as_name()).collect(),
            Expr::Read { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Expr::Value(v) => write!(f, "{}", v),
            Expr::Binary { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::Read { prompt } => write!(f, "READ {}", Quoted(prompt)),
        }
    }
}

/// Instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Assign {
        dest: String,
        expr: Expr,
    },
    Label {
        name: String,
    },
    Goto {
        label: String,
    },
    CondGoto {
        cond: Operand,
        label: String,
    },
    Print {
        text: String,
        args: Vec<Operand>,
    },
    Break,
    Continue,
    Return {
        value: Option<Operand>,
    },
    /// No runtime effect; imports lower to this
    Comment {
        text: String,
    },
}

impl Instruction {
    pub fn assign(
        dest: impl Into<String>,
        expr: Expr,
    ) -> Self {
        Instruction::Assign {
            dest: dest.into(),
            expr,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Instruction::Label { name: name.into() }
    }

    pub fn goto(label: impl Into<String>) -> Self {
        Instruction::Goto {
            label: label.into(),
        }
    }

    /// Variables read by this instruction
    pub fn uses(&self) -> Vec<&str> {
        match self {
            Instruction::Assign { expr, .. } => expr.uses(),
            Instruction::CondGoto { cond, .. } => cond.as_name().into_iter().collect(),
            Instruction::Print { args, .. } => args.iter().filter_map(Operand::as_name).collect(),
            Instruction::Return { value } => value.iter().filter_map(Operand::as_name).collect(),
            Instruction::Label { .. }
            | Instruction::Goto { .. }
            | Instruction::Break
            | Instruction::Continue
            | Instruction::Comment { .. } => Vec::new(),
        }
    }

    /// Jump target, if this instruction can transfer control to a label
    pub fn jump_target(&self) -> Option<&str> {
        match self {
            Instruction::Goto { label } | Instruction::CondGoto { label, .. } => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Instruction::Assign { dest, expr } => write!(f, "{} = {}", dest, expr),
            Instruction::Label { name } => write!(f, "{}:", name),
            Instruction::Goto { label } => write!(f, "goto {}", label),
            Instruction::CondGoto { cond, label } => write!(f, "if {} goto {}", cond, label),
            Instruction::Print { text, args } => {
                write!(f, "print {}", Quoted(text))?;
                for arg in args {
                    write!(f, ", {}", arg)?;
                }
                Ok(())
            }
            Instruction::Break => f.write_str("break"),
            Instruction::Continue => f.write_str("continue"),
            Instruction::Return { value: Some(v) } => write!(f, "return {}", v),
            Instruction::Return { value: None } => f.write_str("return"),
            Instruction::Comment { text } => write!(f, "# {}", text),
        }
    }
}

/// Render a sequence in the one-instruction-per-line text form
pub fn to_text(code: &[Instruction]) -> String {
    code.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("\n")
}

/// IR text parse error
#[derive(Debug, Error, PartialEq)]
pub enum IrParseError {
    #[error("line {line}: malformed instruction `{text}`")]
    Malformed { line: usize, text: String },

    #[error("line {line}: unknown operator `{op}`")]
    UnknownOperator { line: usize, op: String },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: invalid escape `\\{escape}` in string literal")]
    InvalidEscape { line: usize, escape: char },
}

/// Parse IR text. Blank lines are skipped; `line` numbers in errors are 1-based.
pub fn parse_program(text: &str) -> Result<Vec<Instruction>, IrParseError> {
    let mut code = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        code.push(parse_line(line, idx + 1)?);
    }
    Ok(code)
}

impl FromStr for Instruction {
    type Err = IrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s.trim(), 1)
    }
}

fn parse_line(
    line: &str,
    lineno: usize,
) -> Result<Instruction, IrParseError> {
    let malformed = || IrParseError::Malformed {
        line: lineno,
        text: line.to_string(),
    };

    if let Some(text) = line.strip_prefix('#') {
        return Ok(Instruction::Comment {
            text: text.trim().to_string(),
        });
    }
    match line {
        "break" => return Ok(Instruction::Break),
        "continue" => return Ok(Instruction::Continue),
        "return" => return Ok(Instruction::Return { value: None }),
        _ => {}
    }
    if let Some(rest) = line.strip_prefix("return ") {
        return Ok(Instruction::Return {
            value: Some(single_operand(rest).ok_or_else(malformed)?),
        });
    }
    if let Some(rest) = line.strip_prefix("print ") {
        let rest = rest.trim_start();
        if rest.starts_with('"') {
            let (text, tail) = split_quoted(rest, lineno)?;
            let args = tail
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(Operand::parse_token)
                .collect();
            if !(tail.trim().is_empty() || tail.trim_start().starts_with(',')) {
                return Err(malformed());
            }
            return Ok(Instruction::Print { text, args });
        }
    }
    if let Some(rest) = line.strip_prefix("goto ") {
        return Ok(Instruction::goto(single_name(rest).ok_or_else(malformed)?));
    }
    if let Some(rest) = line.strip_prefix("if ") {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        if let [cond, "goto", label] = parts.as_slice() {
            return Ok(Instruction::CondGoto {
                cond: Operand::parse_token(cond),
                label: label.to_string(),
            });
        }
        return Err(malformed());
    }
    if let Some(name) = line.strip_suffix(':') {
        return Ok(Instruction::label(single_name(name).ok_or_else(malformed)?));
    }
    if let Some((dest, rhs)) = line.split_once('=') {
        let dest = single_name(dest).ok_or_else(malformed)?;
        let rhs = rhs.trim();
        let read_prompt = rhs
            .strip_prefix("READ")
            .map(str::trim_start)
            .filter(|p| p.starts_with('"'));
        if let Some(prompt) = read_prompt {
            let (prompt, tail) = split_quoted(prompt, lineno)?;
            if !tail.trim().is_empty() {
                return Err(malformed());
            }
            return Ok(Instruction::assign(dest, Expr::Read { prompt }));
        }
        let tokens: Vec<&str> = rhs.split_whitespace().collect();
        let expr = match tokens.as_slice() {
            [value] => Expr::Value(Operand::parse_token(value)),
            [lhs, op, rhs] => Expr::Binary {
                lhs: Operand::parse_token(lhs),
                op: BinOp::from_symbol(op).ok_or_else(|| IrParseError::UnknownOperator {
                    line: lineno,
                    op: op.to_string(),
                })?,
                rhs: Operand::parse_token(rhs),
            },
            _ => return Err(malformed()),
        };
        return Ok(Instruction::assign(dest, expr));
    }
    Err(malformed())
}

fn single_name(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty() && !s.contains(char::is_whitespace)).then(|| s.to_string())
}

fn single_operand(s: &str) -> Option<Operand> {
    single_name(s).map(|t| Operand::parse_token(&t))
}

/// Split `"text" rest` into the unquoted text and the rest
fn split_quoted(
    s: &str,
    lineno: usize,
) -> Result<(String, &str), IrParseError> {
    quote::split_quoted(s).map_err(|err| match err {
        QuoteError::Unterminated => IrParseError::UnterminatedString { line: lineno },
        QuoteError::InvalidEscape(escape) => IrParseError::InvalidEscape {
            line: lineno,
            escape,
        },
    })
}
