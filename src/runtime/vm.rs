use std::cmp::Ordering;
use std::rc::Rc;

use thiserror::Error;
use tracing::{Level, debug, trace};

use crate::bytecode::chunk::{Chunk, read_long_index};
use crate::bytecode::compile::compile_source;
use crate::bytecode::compile_error::CompileError;
use crate::bytecode::disasm::{disassemble_instruction, format_value};
use crate::bytecode::op::OpCode;
use crate::lang::object::Heap;
use crate::lang::value::Value;
use crate::runtime::runtime_error::{
    RuntimeError, division_by_zero, mismatched_operands, overflow, type_error,
};
use crate::runtime::stack::Stack;

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub initial_stack_capacity: usize,
    pub max_stack_size: usize,
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            initial_stack_capacity: 8,
            max_stack_size: 10_000,
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Ready,
    Running,
    HaltedOk,
    HaltedError,
}

/// Three-way outcome of `Vm::interpret`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl InterpretError {
    pub fn kind(&self) -> InterpretResult {
        match self {
            InterpretError::Compile(_) => InterpretResult::CompileError,
            InterpretError::Runtime(_) => InterpretResult::RuntimeError,
        }
    }
}

/// Stack machine for compiled chunks.
///
/// The heap outlives individual runs, so strings interned by one
/// `interpret` call are shared with the next. The operand stack is cleared
/// at the start of every run.
pub struct Vm {
    heap: Heap,
    stack: Stack,
    config: VmConfig,
    state: VmState,
    steps: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            heap: Heap::new(),
            stack: Stack::new(config.initial_stack_capacity, config.max_stack_size),
            config,
            state: VmState::Ready,
            steps: 0,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn stack(&self) -> &[Value] {
        self.stack.as_slice()
    }

    /// Compiles and runs `source`, returning the value of the expression.
    pub fn interpret(&mut self, source: &str) -> Result<Value, InterpretError> {
        let source: Rc<str> = Rc::from(source);
        let chunk = match compile_source(&source, &mut self.heap) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.state = VmState::HaltedError;
                return Err(e.into());
            }
        };
        Ok(self.run(&chunk)?)
    }

    /// Executes `chunk` until its return instruction.
    ///
    /// String constants in `chunk` must belong to this VM's heap.
    pub fn run(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        self.stack.reset();
        self.steps = 0;
        self.state = VmState::Running;

        match self.execute(chunk) {
            Ok(value) => {
                self.state = VmState::HaltedOk;
                debug!(steps = self.steps, result = %format_value(&value, &self.heap), "run finished");
                Ok(value)
            }
            Err(e) => {
                self.state = VmState::HaltedError;
                debug!(steps = self.steps, error = %e, "run failed");
                Err(e)
            }
        }
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::new(&format!(
                    "execution step limit exceeded ({})",
                    max
                )));
            }
        }

        Ok(())
    }

    fn execute(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        let mut ip: usize = 0;

        loop {
            let offset = ip;
            let Some(&byte) = chunk.code.get(ip) else {
                return Err(RuntimeError::new("reached end of code without OP_RETURN")
                    .with_line(chunk.line_at(offset.saturating_sub(1))));
            };

            if tracing::enabled!(Level::TRACE) {
                self.trace_cycle(chunk, offset);
            }

            let result = self.check_limits().and_then(|()| {
                let op = OpCode::try_from(byte)
                    .map_err(|b| RuntimeError::new(&format!("unknown opcode {}", b)))?;
                ip += 1;
                self.step(op, chunk, &mut ip)
            });

            match result {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => return Err(e.with_line(chunk.line_at(offset))),
            }
        }
    }

    /// Runs one instruction. Returns the result value on `OP_RETURN`.
    fn step(
        &mut self,
        op: OpCode,
        chunk: &Chunk,
        ip: &mut usize,
    ) -> Result<Option<Value>, RuntimeError> {
        match op {
            // Literals
            OpCode::Constant | OpCode::ConstantLong => {
                let value = self.read_constant(op, chunk, ip)?;
                self.stack.push(value)?;
            }
            OpCode::True => self.stack.push(Value::Bool(true))?,
            OpCode::False => self.stack.push(Value::Bool(false))?,

            // Arithmetic
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::IntDiv
            | OpCode::Mod => self.arithmetic(op)?,

            OpCode::Negate => {
                let value = match self.stack.pop()? {
                    Value::Integer(n) => {
                        Value::Integer(n.checked_neg().ok_or_else(|| overflow("negate"))?)
                    }
                    Value::Real(r) => Value::Real(-r),
                    other => return Err(type_error("negate", "a number", other.type_name())),
                };
                self.stack.push(value)?;
            }

            // Logic
            OpCode::Not => {
                let b = self.pop_bool("NOT")?;
                self.stack.push(Value::Bool(!b))?;
            }
            OpCode::And | OpCode::Or => {
                let symbol = symbol(op);
                let b = self.pop_bool(symbol)?;
                let a = self.pop_bool(symbol)?;
                let result = if op == OpCode::And { a && b } else { a || b };
                self.stack.push(Value::Bool(result))?;
            }

            // Strings
            OpCode::Concat => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let (Value::Obj(x), Value::Obj(y)) = (a, b) else {
                    let got = if matches!(a, Value::Obj(_)) { b } else { a };
                    return Err(type_error("&", "strings", got.type_name()));
                };
                let joined = self
                    .heap
                    .concat(x, y)
                    .ok_or_else(|| RuntimeError::new("string operand is not in the heap"))?;
                self.stack.push(Value::Obj(joined))?;
            }

            // Comparison
            OpCode::Equal | OpCode::NotEqual => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let equal = a.is_equal(&b, &self.heap);
                let result = if op == OpCode::Equal { equal } else { !equal };
                self.stack.push(Value::Bool(result))?;
            }
            OpCode::Less | OpCode::LessEqual | OpCode::Greater | OpCode::GreaterEqual => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = compare(op, a, b)?;
                self.stack.push(Value::Bool(result))?;
            }

            OpCode::Return => return Ok(Some(self.stack.pop()?)),
        }

        Ok(None)
    }

    fn read_constant(
        &mut self,
        op: OpCode,
        chunk: &Chunk,
        ip: &mut usize,
    ) -> Result<Value, RuntimeError> {
        let width = op.operand_len();
        let bytes = chunk
            .code
            .get(*ip..*ip + width)
            .ok_or_else(|| RuntimeError::new(&format!("truncated operand for {}", op)))?;
        let index = match bytes {
            [short] => *short as usize,
            [a, b, c] => read_long_index([*a, *b, *c]),
            _ => return Err(RuntimeError::new(&format!("bad operand width for {}", op))),
        };
        *ip += width;

        chunk.constants.get(index).copied().ok_or_else(|| {
            RuntimeError::new(&format!("constant index {} out of range", index))
        })
    }

    fn arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let symbol = symbol(op);

        let result = match (a, b) {
            (Value::Integer(x), Value::Integer(y)) => Value::Integer(integer_arithmetic(op, x, y)?),
            (Value::Real(x), Value::Real(y)) => Value::Real(real_arithmetic(op, x, y)?),
            (x, y) if x.is_number() && y.is_number() => {
                return Err(mismatched_operands(symbol, x.type_name(), y.type_name()));
            }
            (x, y) => {
                let got = if x.is_number() { y } else { x };
                return Err(type_error(symbol, "numbers", got.type_name()));
            }
        };

        self.stack.push(result)
    }

    fn pop_bool(&mut self, op: &str) -> Result<bool, RuntimeError> {
        match self.stack.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(type_error(op, "booleans", other.type_name())),
        }
    }

    fn trace_cycle(&self, chunk: &Chunk, offset: usize) {
        let stack: String = self
            .stack
            .as_slice()
            .iter()
            .map(|v| format!("[ {} ]", format_value(v, &self.heap)))
            .collect();
        let (instruction, _) = disassemble_instruction(chunk, &self.heap, offset);
        trace!(stack = %stack, "{}", instruction);
    }
}

fn symbol(op: OpCode) -> &'static str {
    match op {
        OpCode::Add => "+",
        OpCode::Sub => "-",
        OpCode::Mul => "*",
        OpCode::Div => "/",
        OpCode::IntDiv => "DIV",
        OpCode::Mod => "MOD",
        OpCode::And => "AND",
        OpCode::Or => "OR",
        OpCode::Not => "NOT",
        OpCode::Negate => "negate",
        OpCode::Concat => "&",
        OpCode::Equal => "=",
        OpCode::NotEqual => "<>",
        OpCode::Less => "<",
        OpCode::LessEqual => "<=",
        OpCode::Greater => ">",
        OpCode::GreaterEqual => ">=",
        _ => op.name(),
    }
}

fn integer_arithmetic(op: OpCode, x: i64, y: i64) -> Result<i64, RuntimeError> {
    let symbol = symbol(op);
    match op {
        OpCode::Add => x.checked_add(y).ok_or_else(|| overflow(symbol)),
        OpCode::Sub => x.checked_sub(y).ok_or_else(|| overflow(symbol)),
        OpCode::Mul => x.checked_mul(y).ok_or_else(|| overflow(symbol)),
        OpCode::Div | OpCode::IntDiv => {
            if y == 0 {
                return Err(division_by_zero());
            }
            x.checked_div(y).ok_or_else(|| overflow(symbol))
        }
        OpCode::Mod => {
            if y == 0 {
                return Err(division_by_zero());
            }
            Ok(x.wrapping_rem(y))
        }
        _ => Err(RuntimeError::new(&format!("{} is not arithmetic", op))),
    }
}

fn real_arithmetic(op: OpCode, x: f64, y: f64) -> Result<f64, RuntimeError> {
    match op {
        OpCode::Add => Ok(x + y),
        OpCode::Sub => Ok(x - y),
        OpCode::Mul => Ok(x * y),
        OpCode::Div => Ok(x / y),
        OpCode::IntDiv | OpCode::Mod => Err(type_error(symbol(op), "integers", "real")),
        _ => Err(RuntimeError::new(&format!("{} is not arithmetic", op))),
    }
}

/// Ordered comparison of two scalars of the same type.
fn compare(op: OpCode, a: Value, b: Value) -> Result<bool, RuntimeError> {
    let ordering: Option<Ordering> = match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(&y)),
        (Value::Char(x), Value::Char(y)) => Some(x.cmp(&y)),
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(&y)),
        (Value::Real(x), Value::Real(y)) => x.partial_cmp(&y),
        (Value::Obj(_), Value::Obj(_)) => {
            return Err(type_error(symbol(op), "booleans, characters or numbers", "string"));
        }
        (x, y) => return Err(mismatched_operands(symbol(op), x.type_name(), y.type_name())),
    };

    // NaN is unordered: every ordered comparison with it is false
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        OpCode::Less => ordering.is_lt(),
        OpCode::LessEqual => ordering.is_le(),
        OpCode::Greater => ordering.is_gt(),
        OpCode::GreaterEqual => ordering.is_ge(),
        _ => return Err(RuntimeError::new(&format!("{} is not a comparison", op))),
    })
}
