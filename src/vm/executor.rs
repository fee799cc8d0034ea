//! Virtual Machine executor
//!
//! 栈式字节码执行器：取指、译码、执行，从下标 0 开始。
//! 标签表在执行开始前一次性扫描建立，跳转目标缺失属于加载期错误。

use crate::frontend::ast::BinOp;
use crate::vm::errors::{Diagnostic, VMError, VMResult};
use crate::vm::instructions::Instruction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};
use tracing::{debug, trace, warn};

/// VM 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VMConfig {
    /// 操作数栈最大深度
    pub max_stack_depth: usize,
    /// 最大执行步数，`None` 表示不限制
    pub max_steps: Option<u64>,
    /// 是否逐条跟踪执行
    pub trace_execution: bool,
}

impl Default for VMConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: 64 * 1024,
            max_steps: None,
            trace_execution: false,
        }
    }
}

/// VM 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMStatus {
    Ready,
    Running,
    Finished,
    Failed,
}

/// 运行时值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    /// 只能由 `READ` 产生：无法解析为数字的输入
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// 按“整数，其次浮点数，最后原始文本”的顺序转换一行输入
    pub fn coerce(input: &str) -> Value {
        let trimmed = input.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Number(i as f64);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Number(f);
        }
        Value::Text(input.to_string())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// 单条指令的执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// 继续执行下一条（或跳转后的）指令
    Normal,
    Break,
    Continue,
    /// 程序在 `RETURN` 处结束，携带栈顶值（如果有）
    Return(Option<Value>),
}

/// 虚拟机
///
/// 每次运行使用一个新的实例：变量环境在构造时创建，运行结束前不会销毁。
#[derive(Debug)]
pub struct VM {
    /// 配置
    config: VMConfig,
    /// 状态
    status: VMStatus,
    /// 字节码
    code: Vec<Instruction>,
    /// 标签表：标签名 → 指令下标
    labels: HashMap<String, usize>,
    /// 操作数栈
    stack: Vec<Value>,
    /// 全局变量环境（单一作用域）
    vars: HashMap<String, Value>,
    /// 程序计数器
    pc: usize,
    /// 已执行步数
    steps: u64,
    /// 非致命诊断
    diagnostics: Vec<Diagnostic>,
}

impl VM {
    /// 加载字节码并建立标签表
    pub fn new(code: Vec<Instruction>) -> VMResult<Self> {
        Self::with_config(code, VMConfig::default())
    }

    pub fn with_config(
        code: Vec<Instruction>,
        config: VMConfig,
    ) -> VMResult<Self> {
        let labels = build_label_table(&code)?;
        debug!(
            "VM loaded {} instructions, {} labels",
            code.len(),
            labels.len()
        );
        Ok(Self {
            config,
            status: VMStatus::Ready,
            code,
            labels,
            stack: Vec::new(),
            vars: HashMap::new(),
            pc: 0,
            steps: 0,
            diagnostics: Vec::new(),
        })
    }

    pub fn config(&self) -> &VMConfig {
        &self.config
    }

    pub fn status(&self) -> VMStatus {
        self.status
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.vars
    }

    pub fn variable(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// 运行到末尾或 `RETURN`
    ///
    /// 输出按指令顺序逐条写入 `output` 并立即 flush。
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
    ) -> VMResult<Completion> {
        if self.status != VMStatus::Ready {
            return Err(VMError::InvalidState(format!(
                "VM cannot run from status {:?}; create a new instance",
                self.status
            )));
        }
        self.status = VMStatus::Running;

        let code = std::mem::take(&mut self.code);
        let result = self.run_loop(&code, input, output);
        self.code = code;

        match &result {
            Ok(completion) => {
                self.status = VMStatus::Finished;
                debug!("VM finished after {} steps: {:?}", self.steps, completion);
            }
            Err(e) => {
                self.status = VMStatus::Failed;
                debug!("VM failed after {} steps: {}", self.steps, e);
            }
        }
        result
    }

    /// 以字符串作为输入运行，返回捕获的输出
    pub fn run_to_string(
        &mut self,
        input: &str,
    ) -> VMResult<(Completion, String)> {
        let mut reader = input.as_bytes();
        let mut output = Vec::new();
        let completion = self.run(&mut reader, &mut output)?;
        Ok((completion, String::from_utf8_lossy(&output).into_owned()))
    }

    fn run_loop<R: BufRead, W: Write>(
        &mut self,
        code: &[Instruction],
        input: &mut R,
        output: &mut W,
    ) -> VMResult<Completion> {
        while let Some(inst) = code.get(self.pc) {
            if let Some(limit) = self.config.max_steps {
                if self.steps >= limit {
                    return Err(VMError::StepLimitExceeded { limit });
                }
            }
            self.steps += 1;
            let index = self.pc;
            self.pc += 1;

            if self.config.trace_execution {
                trace!("[{:04}] {:<16} stack={:?}", index, inst.to_string(), self.stack);
            }

            match self.execute(index, inst, input, output)? {
                Completion::Normal => {}
                Completion::Return(value) => return Ok(Completion::Return(value)),
                // 跳转已在降级阶段解析，这里没有可以接住它们的循环
                Completion::Break | Completion::Continue => {
                    return Err(VMError::UnresolvedControlTransfer {
                        index,
                        instruction: inst.clone(),
                    });
                }
            }
        }
        Ok(Completion::Normal)
    }

    fn execute<R: BufRead, W: Write>(
        &mut self,
        index: usize,
        inst: &Instruction,
        input: &mut R,
        output: &mut W,
    ) -> VMResult<Completion> {
        match inst {
            Instruction::Push(n) => self.push(index, Value::Number(*n))?,
            Instruction::Load(name) => {
                let value = match self.vars.get(name) {
                    Some(v) => v.clone(),
                    None => {
                        // 未定义的变量读作 0
                        trace!("LOAD of unset variable `{}` defaults to 0", name);
                        Value::default()
                    }
                };
                self.push(index, value)?;
            }
            Instruction::Store(name) => {
                let value = self.pop(index, inst)?;
                self.vars.insert(name.clone(), value);
            }
            Instruction::Add => self.binary(index, inst, BinOp::Add)?,
            Instruction::Sub => self.binary(index, inst, BinOp::Sub)?,
            Instruction::Mul => self.binary(index, inst, BinOp::Mul)?,
            Instruction::Div => self.binary(index, inst, BinOp::Div)?,
            Instruction::Gt => self.binary(index, inst, BinOp::Gt)?,
            Instruction::Lt => self.binary(index, inst, BinOp::Lt)?,
            Instruction::Ge => self.binary(index, inst, BinOp::Ge)?,
            Instruction::Le => self.binary(index, inst, BinOp::Le)?,
            Instruction::Eq => self.binary(index, inst, BinOp::Eq)?,
            Instruction::Ne => self.binary(index, inst, BinOp::Ne)?,
            Instruction::Jnz(label) => {
                let cond = self.pop(index, inst)?;
                let taken = match cond {
                    Value::Number(n) => n != 0.0,
                    Value::Text(_) => {
                        return Err(VMError::TypeError {
                            index,
                            instruction: inst.clone(),
                            message: "condition must be a number".to_string(),
                        })
                    }
                };
                if taken {
                    self.jump(label);
                }
            }
            Instruction::Jmp(label) => self.jump(label),
            Instruction::Label(_) => {}
            Instruction::Print(Some(text)) => {
                writeln!(output, "{}", text)?;
                output.flush()?;
            }
            Instruction::Print(None) => match self.stack.pop() {
                Some(value) => {
                    writeln!(output, "{}", value)?;
                    output.flush()?;
                }
                None => {
                    let diagnostic = Diagnostic::StackUnderflow { index };
                    warn!("{}", diagnostic);
                    self.diagnostics.push(diagnostic);
                }
            },
            Instruction::Read(prompt) => {
                write!(output, "{}", prompt)?;
                output.flush()?;
                let mut line = String::new();
                if input.read_line(&mut line)? == 0 {
                    return Err(VMError::InputClosed { index });
                }
                let line = line.trim_end_matches(['\n', '\r']);
                self.push(index, Value::coerce(line))?;
            }
            Instruction::Break => return Ok(Completion::Break),
            Instruction::Continue => return Ok(Completion::Continue),
            Instruction::Return => return Ok(Completion::Return(self.stack.pop())),
        }
        Ok(Completion::Normal)
    }

    fn push(
        &mut self,
        index: usize,
        value: Value,
    ) -> VMResult<()> {
        if self.stack.len() >= self.config.max_stack_depth {
            return Err(VMError::StackOverflow {
                index,
                limit: self.config.max_stack_depth,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(
        &mut self,
        index: usize,
        inst: &Instruction,
    ) -> VMResult<Value> {
        self.stack.pop().ok_or_else(|| VMError::StackUnderflow {
            index,
            instruction: inst.clone(),
        })
    }

    fn binary(
        &mut self,
        index: usize,
        inst: &Instruction,
        op: BinOp,
    ) -> VMResult<()> {
        if self.stack.len() < 2 {
            return Err(VMError::StackUnderflow {
                index,
                instruction: inst.clone(),
            });
        }
        let rhs = self.pop(index, inst)?;
        let lhs = self.pop(index, inst)?;

        let result = match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => {
                if op == BinOp::Div && *b == 0.0 {
                    let diagnostic = Diagnostic::DivisionByZero { index };
                    warn!("{}", diagnostic);
                    self.diagnostics.push(diagnostic);
                }
                op.apply(*a, *b)
            }
            (Value::Text(a), Value::Text(b)) if op == BinOp::Eq => truth(a == b),
            (Value::Text(a), Value::Text(b)) if op == BinOp::Ne => truth(a != b),
            _ if op == BinOp::Eq => 0.0,
            _ if op == BinOp::Ne => 1.0,
            _ => {
                return Err(VMError::TypeError {
                    index,
                    instruction: inst.clone(),
                    message: format!("cannot apply `{}` to {:?} and {:?}", op, lhs, rhs),
                })
            }
        };
        self.stack.push(Value::Number(result));
        Ok(())
    }

    /// 标签表在加载时已校验，查找必然成功
    fn jump(
        &mut self,
        label: &str,
    ) {
        if let Some(&target) = self.labels.get(label) {
            self.pc = target;
        }
    }
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// 预扫描：建立标签表并校验所有跳转目标
fn build_label_table(code: &[Instruction]) -> VMResult<HashMap<String, usize>> {
    let mut labels = HashMap::new();
    for (index, inst) in code.iter().enumerate() {
        if let Instruction::Label(name) = inst {
            if let Some(&first) = labels.get(name) {
                return Err(VMError::DuplicateLabel {
                    label: name.clone(),
                    index,
                    first,
                });
            }
            labels.insert(name.clone(), index);
        }
    }
    for (index, inst) in code.iter().enumerate() {
        if let Some(label) = inst.jump_target() {
            if !labels.contains_key(label) {
                return Err(VMError::UndefinedLabel {
                    label: label.to_string(),
                    index,
                    instruction: inst.clone(),
                });
            }
        }
    }
    Ok(labels)
}
