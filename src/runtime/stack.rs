use crate::lang::value::Value;
use crate::runtime::runtime_error::{RuntimeError, stack_underflow};

/// Operand stack with a hard size limit.
#[derive(Debug)]
pub struct Stack {
    values: Vec<Value>,
    max_size: usize,
}

impl Stack {
    pub fn new(initial_capacity: usize, max_size: usize) -> Self {
        Stack {
            values: Vec::with_capacity(initial_capacity),
            max_size,
        }
    }

    pub fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.values.len() >= self.max_size {
            return Err(RuntimeError::new(&format!(
                "stack size limit exceeded ({})",
                self.max_size
            )));
        }
        self.values.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.values.pop().ok_or_else(stack_underflow)
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}
