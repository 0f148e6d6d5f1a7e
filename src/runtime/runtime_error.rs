use thiserror::Error;

/// Failure while executing a chunk.
///
/// `line` is the source line of the instruction that failed, when the chunk
/// records one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{message}", at_line(.line))]
pub struct RuntimeError {
    pub message: String,
    pub line: Option<u32>,
}

fn at_line(line: &Option<u32>) -> String {
    match line {
        Some(line) => format!("line {}: ", line),
        None => String::new(),
    }
}

impl RuntimeError {
    pub fn new(msg: &str) -> Self {
        RuntimeError {
            message: msg.to_string(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: Option<u32>) -> Self {
        if self.line.is_none() {
            self.line = line;
        }
        self
    }
}

pub fn type_error(op: &str, expected: &str, got: &str) -> RuntimeError {
    RuntimeError::new(&format!(
        "type error: {} expects {}, got {}",
        op, expected, got
    ))
}

pub fn mismatched_operands(op: &str, left: &str, right: &str) -> RuntimeError {
    RuntimeError::new(&format!(
        "type error: {} operands must have the same type, got {} and {}",
        op, left, right
    ))
}

pub fn division_by_zero() -> RuntimeError {
    RuntimeError::new("division by zero")
}

pub fn overflow(op: &str) -> RuntimeError {
    RuntimeError::new(&format!("integer overflow in {}", op))
}

pub fn stack_underflow() -> RuntimeError {
    RuntimeError::new("stack underflow")
}
