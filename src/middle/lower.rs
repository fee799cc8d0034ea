//! AST 到 IR 的降级（Lowering）
//!
//! 自底向上遍历 AST：表达式降级为（指令序列，可引用的值），
//! 语句降级为扁平的指令序列。
//!
//! ## 控制流
//!
//! - `if/elif/else`：两阶段生成，先生成全部条件测试，再生成各分支体
//! - `while` / `do-while` / `for`：显式标签 + 跳转
//! - `break` / `continue`：在降级时通过循环标签栈解析为 `goto`
//!
//! 标签与临时变量由 [`LoweringContext`] 持有的两个独立计数器分配，
//! 作用域为一次编译。

use crate::frontend::ast::{self, BinOp, Branch, Program, Stmt};
use crate::middle::ir::{Expr, Instruction, Operand};
use thiserror::Error;
use tracing::debug;

/// 降级错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("`break` outside of a loop")]
    BreakOutsideLoop,

    #[error("`continue` outside of a loop")]
    ContinueOutsideLoop,
}

pub type LowerResult<T> = Result<T, LowerError>;

type Code = Vec<Instruction>;

/// 标签生成器：`L0, L1, ...`
#[derive(Debug, Default)]
pub struct LabelGenerator {
    next_label: usize,
}

impl LabelGenerator {
    pub fn next(&mut self) -> String {
        let label = format!("L{}", self.next_label);
        self.next_label += 1;
        label
    }

    pub fn peek_next(&self) -> usize {
        self.next_label
    }
}

/// 临时变量分配器：`t0, t1, ...`
#[derive(Debug, Default)]
pub struct TempAllocator {
    next_temp: usize,
}

impl TempAllocator {
    pub fn next(&mut self) -> String {
        let temp = format!("t{}", self.next_temp);
        self.next_temp += 1;
        temp
    }

    pub fn peek_next(&self) -> usize {
        self.next_temp
    }
}

/// 循环的跳转目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopLabels {
    /// `continue` 的目标
    pub continue_label: String,
    /// `break` 的目标
    pub break_label: String,
}

/// 编译上下文
///
/// 持有一次编译的全部可变状态，不存在跨调用共享的全局计数器。
#[derive(Debug, Default)]
pub struct LoweringContext {
    labels: LabelGenerator,
    temps: TempAllocator,
    loops: Vec<LoopLabels>,
}

impl LoweringContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_label(&mut self) -> String {
        self.labels.next()
    }

    pub fn next_temp(&mut self) -> String {
        self.temps.next()
    }

    /// 已分配的标签数
    pub fn label_count(&self) -> usize {
        self.labels.peek_next()
    }

    /// 已分配的临时变量数
    pub fn temp_count(&self) -> usize {
        self.temps.peek_next()
    }

    /// 最内层循环
    pub fn current_loop(&self) -> Option<&LoopLabels> {
        self.loops.last()
    }
}

/// AST → IR 降级器
#[derive(Debug, Default)]
pub struct Lowerer {
    ctx: LoweringContext,
}

impl Lowerer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &LoweringContext {
        &self.ctx
    }

    /// 降级整个程序
    pub fn lower_program(
        &mut self,
        program: &Program,
    ) -> LowerResult<Vec<Instruction>> {
        let code = self.lower_block(&program.statements)?;
        debug!(
            "Lowered {} statements into {} IR instructions ({} temps, {} labels)",
            program.statements.len(),
            code.len(),
            self.ctx.temp_count(),
            self.ctx.label_count()
        );
        Ok(code)
    }

    fn lower_block(
        &mut self,
        stmts: &[Stmt],
    ) -> LowerResult<Code> {
        let mut code = Vec::new();
        for stmt in stmts {
            code.extend(self.lower_stmt(stmt)?);
        }
        Ok(code)
    }

    /// 降级语句
    pub fn lower_stmt(
        &mut self,
        stmt: &Stmt,
    ) -> LowerResult<Code> {
        match stmt {
            Stmt::VarDecl { name, expr } | Stmt::Reassign { name, expr } => {
                let (mut code, value) = self.lower_expr(expr);
                code.push(Instruction::assign(name.as_str(), Expr::Value(value)));
                Ok(code)
            }
            Stmt::Print { text, args } => {
                let mut code = Vec::new();
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let (arg_code, value) = self.lower_expr(arg);
                    code.extend(arg_code);
                    values.push(value);
                }
                code.push(Instruction::Print {
                    text: text.clone(),
                    args: values,
                });
                Ok(code)
            }
            Stmt::If {
                branches,
                else_block,
            } => self.lower_if(branches, else_block.as_deref()),
            Stmt::While { condition, block } => self.lower_while(condition, block),
            Stmt::DoWhile { block, condition } => self.lower_do_while(block, condition),
            Stmt::For {
                variable,
                count,
                block,
            } => self.lower_for(variable, count, block),
            Stmt::Break => {
                let target = self.ctx.current_loop().ok_or(LowerError::BreakOutsideLoop)?;
                Ok(vec![Instruction::goto(target.break_label.as_str())])
            }
            Stmt::Continue => {
                let target = self
                    .ctx
                    .current_loop()
                    .ok_or(LowerError::ContinueOutsideLoop)?;
                Ok(vec![Instruction::goto(target.continue_label.as_str())])
            }
            Stmt::Return { expr } => {
                let (mut code, value) = match expr {
                    Some(e) => {
                        let (code, value) = self.lower_expr(e);
                        (code, Some(value))
                    }
                    None => (Vec::new(), None),
                };
                code.push(Instruction::Return { value });
                Ok(code)
            }
            Stmt::Block { statements } => self.lower_block(statements),
            Stmt::Import { path } => Ok(vec![Instruction::Comment {
                text: format!("import {}", path),
            }]),
        }
    }

    /// 降级表达式，返回（指令序列，结果值）
    pub fn lower_expr(
        &mut self,
        expr: &ast::Expr,
    ) -> (Code, Operand) {
        match expr {
            ast::Expr::NumberLiteral { value } => (Vec::new(), Operand::Number(*value)),
            ast::Expr::BoolLiteral { value } => {
                (Vec::new(), Operand::Number(if *value { 1.0 } else { 0.0 }))
            }
            ast::Expr::Variable { name } => (Vec::new(), Operand::name(name.as_str())),
            ast::Expr::BinaryExpr { left, op, right } => {
                // 先左后右，保持求值顺序
                let (mut code, lhs) = self.lower_expr(left);
                let (rhs_code, rhs) = self.lower_expr(right);
                code.extend(rhs_code);
                let temp = self.ctx.next_temp();
                code.push(Instruction::assign(
                    temp.as_str(),
                    Expr::Binary { lhs, op: *op, rhs },
                ));
                (code, Operand::Name(temp))
            }
            ast::Expr::Read { prompt } => {
                let temp = self.ctx.next_temp();
                let code = vec![Instruction::assign(
                    temp.as_str(),
                    Expr::Read {
                        prompt: prompt.clone(),
                    },
                )];
                (code, Operand::Name(temp))
            }
        }
    }

    /// `if/elif/else` 链
    ///
    /// 分支体的标签必须在条件测试代码引用它之前确定，
    /// 所以先生成全部条件测试，再依次生成分支体。
    fn lower_if(
        &mut self,
        branches: &[Branch],
        else_block: Option<&[Stmt]>,
    ) -> LowerResult<Code> {
        let end_label = self.ctx.next_label();
        let branch_labels: Vec<String> = branches.iter().map(|_| self.ctx.next_label()).collect();
        let else_label = else_block.map(|_| self.ctx.next_label());

        let mut code = Vec::new();
        // 阶段一：条件测试，未命中则落入下一个条件
        for (branch, label) in branches.iter().zip(&branch_labels) {
            let (cond_code, cond) = self.lower_expr(&branch.condition);
            code.extend(cond_code);
            code.push(Instruction::CondGoto {
                cond,
                label: label.clone(),
            });
        }
        code.push(Instruction::goto(
            else_label.as_deref().unwrap_or(end_label.as_str()),
        ));

        // 阶段二：分支体
        for (branch, label) in branches.iter().zip(branch_labels) {
            code.push(Instruction::Label { name: label });
            code.extend(self.lower_block(&branch.block)?);
            code.push(Instruction::goto(end_label.as_str()));
        }
        if let (Some(block), Some(label)) = (else_block, else_label) {
            code.push(Instruction::Label { name: label });
            code.extend(self.lower_block(block)?);
            code.push(Instruction::goto(end_label.as_str()));
        }
        code.push(Instruction::Label { name: end_label });
        Ok(code)
    }

    /// `while`：`Lstart` / `Lbody` / `Lend`
    fn lower_while(
        &mut self,
        condition: &ast::Expr,
        block: &[Stmt],
    ) -> LowerResult<Code> {
        let start = self.ctx.next_label();
        let body = self.ctx.next_label();
        let end = self.ctx.next_label();

        let mut code = vec![Instruction::label(start.as_str())];
        let (cond_code, cond) = self.lower_expr(condition);
        code.extend(cond_code);
        code.push(Instruction::CondGoto {
            cond,
            label: body.clone(),
        });
        code.push(Instruction::goto(end.as_str()));
        code.push(Instruction::Label { name: body });
        code.extend(self.lower_loop_body(block, &start, &end)?);
        code.push(Instruction::goto(start));
        code.push(Instruction::Label { name: end });
        Ok(code)
    }

    /// `do-while`：循环体至少执行一次
    fn lower_do_while(
        &mut self,
        block: &[Stmt],
        condition: &ast::Expr,
    ) -> LowerResult<Code> {
        let start = self.ctx.next_label();
        let cond_label = self.ctx.next_label();
        let end = self.ctx.next_label();

        let mut code = vec![Instruction::label(start.as_str())];
        code.extend(self.lower_loop_body(block, &cond_label, &end)?);
        code.push(Instruction::Label { name: cond_label });
        let (cond_code, cond) = self.lower_expr(condition);
        code.extend(cond_code);
        code.push(Instruction::CondGoto { cond, label: start });
        code.push(Instruction::Label { name: end });
        Ok(code)
    }

    /// `for`：脱糖为计数循环
    ///
    /// ```text
    /// ti = 0
    /// Lstart:
    /// tc = ti >= count
    /// if tc goto Lend
    /// var = ti
    /// <body>
    /// Lnext:
    /// ti = ti + 1
    /// goto Lstart
    /// Lend:
    /// ```
    fn lower_for(
        &mut self,
        variable: &str,
        count: &ast::Expr,
        block: &[Stmt],
    ) -> LowerResult<Code> {
        let (mut code, mut bound) = self.lower_expr(count);
        // 用户变量可能在循环体内被改写，次数只求值一次
        if matches!(count, ast::Expr::Variable { .. }) {
            let snapshot = self.ctx.next_temp();
            code.push(Instruction::assign(snapshot.as_str(), Expr::Value(bound)));
            bound = Operand::Name(snapshot);
        }

        let counter = self.ctx.next_temp();
        let start = self.ctx.next_label();
        let next = self.ctx.next_label();
        let end = self.ctx.next_label();

        code.push(Instruction::assign(
            counter.as_str(),
            Expr::Value(Operand::Number(0.0)),
        ));
        code.push(Instruction::label(start.as_str()));
        let check = self.ctx.next_temp();
        code.push(Instruction::assign(
            check.as_str(),
            Expr::Binary {
                lhs: Operand::name(counter.as_str()),
                op: BinOp::Ge,
                rhs: bound,
            },
        ));
        code.push(Instruction::CondGoto {
            cond: Operand::Name(check),
            label: end.clone(),
        });
        code.push(Instruction::assign(
            variable,
            Expr::Value(Operand::name(counter.as_str())),
        ));
        code.extend(self.lower_loop_body(block, &next, &end)?);
        code.push(Instruction::label(next));
        code.push(Instruction::assign(
            counter.as_str(),
            Expr::Binary {
                lhs: Operand::name(counter.as_str()),
                op: BinOp::Add,
                rhs: Operand::Number(1.0),
            },
        ));
        code.push(Instruction::goto(start));
        code.push(Instruction::Label { name: end });
        Ok(code)
    }

    /// 在循环标签栈上降级循环体
    fn lower_loop_body(
        &mut self,
        block: &[Stmt],
        continue_label: &str,
        break_label: &str,
    ) -> LowerResult<Code> {
        self.ctx.loops.push(LoopLabels {
            continue_label: continue_label.to_string(),
            break_label: break_label.to_string(),
        });
        let body = self.lower_block(block);
        self.ctx.loops.pop();
        body
    }
}

/// 使用全新的编译上下文降级程序
pub fn lower(program: &Program) -> LowerResult<Vec<Instruction>> {
    Lowerer::new().lower_program(program)
}
