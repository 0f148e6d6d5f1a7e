use serde::{Deserialize, Serialize};

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::op::OpCode;
use crate::lang::value::Value;

/// Largest constant index the short form can carry.
pub const MAX_SHORT_CONSTANT: usize = u8::MAX as usize;

/// Number of constants addressable by the three-byte long form.
pub const MAX_CONSTANTS: usize = 1 << 24;

/// `count` consecutive code bytes that came from `line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRun {
    pub line: u32,
    pub count: u32,
}

/// One compiled unit: instruction bytes, their constant pool and a
/// run-length encoded line table.
///
/// The run counts always sum to `code.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    lines: Vec<LineRun>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one code byte tagged with its source line.
    pub fn write(&mut self, byte: impl Into<u8>, line: u32) {
        self.code.push(byte.into());
        match self.lines.last_mut() {
            Some(run) if run.line == line => run.count += 1,
            _ => self.lines.push(LineRun { line, count: 1 }),
        }
    }

    /// Appends `value` to the pool and returns its index. Values are never
    /// deduplicated here.
    pub fn add_constant(&mut self, value: Value, line: u32) -> Result<usize, CompileError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants {
                line,
                limit: MAX_CONSTANTS,
            });
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    /// Adds `value` and emits the load for it, short form when the index
    /// fits one byte.
    pub fn write_constant(&mut self, value: Value, line: u32) -> Result<usize, CompileError> {
        let index = self.add_constant(value, line)?;
        if index <= MAX_SHORT_CONSTANT {
            self.write(OpCode::Constant, line);
            self.write(index as u8, line);
        } else {
            self.write(OpCode::ConstantLong, line);
            for byte in &(index as u32).to_le_bytes()[..3] {
                self.write(*byte, line);
            }
        }
        Ok(index)
    }

    /// Source line of the code byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        let mut end = 0usize;
        for run in &self.lines {
            end += run.count as usize;
            if offset < end {
                return Some(run.line);
            }
        }
        None
    }

    pub fn lines(&self) -> &[LineRun] {
        &self.lines
    }

    /// Rebuilds a chunk from its parts. Returns `None` when the line runs do
    /// not cover exactly `code.len()` bytes.
    pub fn from_parts(code: Vec<u8>, constants: Vec<Value>, lines: Vec<LineRun>) -> Option<Self> {
        let covered: usize = lines.iter().map(|r| r.count as usize).sum();
        if covered != code.len() || lines.iter().any(|r| r.count == 0) {
            return None;
        }
        Some(Chunk {
            code,
            constants,
            lines,
        })
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Decodes the three operand bytes of a long constant load.
pub fn read_long_index(bytes: [u8; 3]) -> usize {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_runs_collapse_same_line() {
        let mut chunk = Chunk::new();
        chunk.write(OpCode::True, 1);
        chunk.write(OpCode::False, 1);
        chunk.write(OpCode::Equal, 2);
        chunk.write(OpCode::Not, 2);
        chunk.write(OpCode::Return, 1);

        assert_eq!(
            chunk.lines(),
            &[
                LineRun { line: 1, count: 2 },
                LineRun { line: 2, count: 2 },
                LineRun { line: 1, count: 1 },
            ]
        );
        let total: u32 = chunk.lines().iter().map(|r| r.count).sum();
        assert_eq!(total as usize, chunk.len());
    }

    #[test]
    fn test_line_at() {
        let mut chunk = Chunk::new();
        chunk.write(OpCode::True, 3);
        chunk.write(OpCode::Negate, 4);
        chunk.write(OpCode::Return, 4);

        assert_eq!(chunk.line_at(0), Some(3));
        assert_eq!(chunk.line_at(1), Some(4));
        assert_eq!(chunk.line_at(2), Some(4));
        assert_eq!(chunk.line_at(3), None);
    }

    #[test]
    fn test_constants_are_not_deduplicated() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Integer(1), 1).unwrap(), 0);
        assert_eq!(chunk.add_constant(Value::Integer(1), 1).unwrap(), 1);
        assert_eq!(chunk.constants.len(), 2);
    }

    #[test]
    fn test_short_then_long_constant_form() {
        let mut chunk = Chunk::new();
        for n in 0..=255 {
            chunk.write_constant(Value::Integer(n), 1).unwrap();
        }
        assert_eq!(chunk.len(), 256 * 2);
        assert_eq!(chunk.code[510], u8::from(OpCode::Constant));
        assert_eq!(chunk.code[511], 255);

        let index = chunk.write_constant(Value::Integer(256), 1).unwrap();
        assert_eq!(index, 256);
        assert_eq!(&chunk.code[512..], &[u8::from(OpCode::ConstantLong), 0x00, 0x01, 0x00]);
        assert_eq!(read_long_index([0x00, 0x01, 0x00]), 256);
    }

    #[test]
    fn test_long_index_is_little_endian() {
        assert_eq!(read_long_index([0x56, 0x34, 0x12]), 0x12_3456);
        assert_eq!(read_long_index([0xff, 0xff, 0xff]), MAX_CONSTANTS - 1);
    }

    #[test]
    fn test_from_parts_checks_line_coverage() {
        let code = vec![u8::from(OpCode::True), u8::from(OpCode::Return)];
        let good = vec![LineRun { line: 1, count: 2 }];
        let short = vec![LineRun { line: 1, count: 1 }];

        assert!(Chunk::from_parts(code.clone(), vec![], good).is_some());
        assert!(Chunk::from_parts(code, vec![], short).is_none());
    }
}
