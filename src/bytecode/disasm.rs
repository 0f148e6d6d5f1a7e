use std::fmt::Write;

use thiserror::Error;

use crate::bytecode::chunk::{Chunk, read_long_index};
use crate::bytecode::op::OpCode;
use crate::lang::object::Heap;
use crate::lang::value::{Value, format_real};

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: OpCode,
    /// Constant index for the two load forms.
    pub operand: Option<usize>,
    pub line: u32,
}

impl Instruction {
    /// Encoded size in bytes.
    pub fn width(&self) -> usize {
        1 + self.opcode.operand_len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {byte} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("truncated operand for {opcode} at offset {offset}")]
    Truncated { offset: usize, opcode: OpCode },

    #[error("offset {offset} is past the end of the code")]
    OutOfRange { offset: usize },

    #[error("no line recorded for offset {offset}")]
    MissingLine { offset: usize },
}

/// Decodes the instruction starting at `offset`.
pub fn decode_at(chunk: &Chunk, offset: usize) -> Result<Instruction, DecodeError> {
    let byte = *chunk
        .code
        .get(offset)
        .ok_or(DecodeError::OutOfRange { offset })?;
    let opcode = OpCode::try_from(byte).map_err(|byte| DecodeError::UnknownOpcode { offset, byte })?;

    let operand_bytes = chunk
        .code
        .get(offset + 1..offset + 1 + opcode.operand_len())
        .ok_or(DecodeError::Truncated { offset, opcode })?;

    let operand = match opcode {
        OpCode::Constant => Some(operand_bytes[0] as usize),
        OpCode::ConstantLong => Some(read_long_index([
            operand_bytes[0],
            operand_bytes[1],
            operand_bytes[2],
        ])),
        _ => None,
    };

    let line = chunk
        .line_at(offset)
        .ok_or(DecodeError::MissingLine { offset })?;

    Ok(Instruction {
        offset,
        opcode,
        operand,
        line,
    })
}

/// Decodes the whole instruction stream.
pub fn disassemble(chunk: &Chunk) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    while offset < chunk.len() {
        let instruction = decode_at(chunk, offset)?;
        offset += instruction.width();
        instructions.push(instruction);
    }
    Ok(instructions)
}

/// Renders a value for listings and traces. Owned strings print as
/// `"text"`, strings pointing into source text as `&"text"`.
pub fn format_value(value: &Value, heap: &Heap) -> String {
    match value {
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Char(c) => format!("'{}'", *c as char),
        Value::Real(r) => format_real(*r),
        Value::Integer(n) => format!("{}", n),
        Value::Obj(r) => match heap.get(*r) {
            Some(s) if s.is_owned() => format!("\"{}\"", s.as_str()),
            Some(s) => format!("&\"{}\"", s.as_str()),
            None => format!("<dangling #{}>", r.index()),
        },
    }
}

/// One listing row for the instruction at `offset`, without a trailing
/// newline, plus the offset of the next instruction.
pub fn disassemble_instruction(chunk: &Chunk, heap: &Heap, offset: usize) -> (String, usize) {
    let mut out = String::new();
    let _ = write!(out, "{:04} ", offset);

    let line = chunk.line_at(offset);
    if offset > 0 && line == chunk.line_at(offset - 1) {
        out.push_str("   | ");
    } else {
        match line {
            Some(line) => {
                let _ = write!(out, "{:4} ", line);
            }
            None => out.push_str("   ? "),
        }
    }

    match decode_at(chunk, offset) {
        Ok(ins) => {
            match ins.operand {
                Some(index) => {
                    let constant = chunk
                        .constants
                        .get(index)
                        .map(|v| format_value(v, heap))
                        .unwrap_or_else(|| "<bad constant>".to_string());
                    let _ = write!(out, "{:<16} {:4} '{}'", ins.opcode.name(), index, constant);
                }
                None => out.push_str(ins.opcode.name()),
            }
            (out, offset + ins.width())
        }
        Err(DecodeError::UnknownOpcode { byte, .. }) => {
            let _ = write!(out, "Unknown opcode {}", byte);
            (out, offset + 1)
        }
        Err(e) => {
            let _ = write!(out, "{}", e);
            (out, chunk.len())
        }
    }
}

/// Full listing of `chunk` under a `== name ==` header.
pub fn disassemble_to_string(chunk: &Chunk, heap: &Heap, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);
    let mut offset = 0;
    while offset < chunk.len() {
        let (row, next) = disassemble_instruction(chunk, heap, offset);
        out.push_str(&row);
        out.push('\n');
        offset = next;
    }
    out
}

pub fn print_chunk(chunk: &Chunk, heap: &Heap, name: &str) {
    print!("{}", disassemble_to_string(chunk, heap, name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile::compile_source;
    use std::rc::Rc;

    fn compile(src: &str) -> (Chunk, Heap) {
        let mut heap = Heap::new();
        let chunk = compile_source(&Rc::from(src), &mut heap).expect("compile should succeed");
        (chunk, heap)
    }

    fn opcodes(chunk: &Chunk) -> Vec<OpCode> {
        disassemble(chunk)
            .expect("decode should succeed")
            .iter()
            .map(|i| i.opcode)
            .collect()
    }

    #[test]
    fn test_decode_matches_tree_order() {
        let (chunk, _) = compile("NOT (1 < 2) OR 3 >= 4");
        assert_eq!(
            opcodes(&chunk),
            vec![
                OpCode::Constant,
                OpCode::Constant,
                OpCode::Less,
                OpCode::Not,
                OpCode::Constant,
                OpCode::Constant,
                OpCode::GreaterEqual,
                OpCode::Or,
                OpCode::Return,
            ]
        );
    }

    #[test]
    fn test_listing_format() {
        let (chunk, heap) = compile("1 +\n2.5");
        let listing = disassemble_to_string(&chunk, &heap, "test");
        let expected = "\
== test ==
0000    1 OP_CONSTANT         0 '1'
0002    2 OP_CONSTANT         1 '2.5'
0004    1 OP_ADD
0005    | OP_RETURN
";
        assert_eq!(listing, expected);
    }

    #[test]
    fn test_long_constant_decodes_index() {
        let mut chunk = Chunk::new();
        for n in 0..300 {
            chunk.write_constant(Value::Integer(n), 1).unwrap();
        }
        let instructions = disassemble(&chunk).unwrap();
        let last = instructions.last().unwrap();
        assert_eq!(last.opcode, OpCode::ConstantLong);
        assert_eq!(last.operand, Some(299));
        assert_eq!(last.width(), 4);
    }

    #[test]
    fn test_unknown_opcode() {
        let mut chunk = Chunk::new();
        chunk.write(200u8, 1);
        assert_eq!(
            disassemble(&chunk),
            Err(DecodeError::UnknownOpcode {
                offset: 0,
                byte: 200
            })
        );

        let heap = Heap::new();
        let listing = disassemble_to_string(&chunk, &heap, "bad");
        assert!(listing.contains("Unknown opcode 200"), "listing was: {}", listing);
    }

    #[test]
    fn test_truncated_operand() {
        let mut chunk = Chunk::new();
        chunk.write(OpCode::ConstantLong, 1);
        chunk.write(0u8, 1);
        assert!(matches!(
            disassemble(&chunk),
            Err(DecodeError::Truncated { offset: 0, .. })
        ));
    }

    #[test]
    fn test_format_value() {
        let mut heap = Heap::new();
        let owned = heap.copy_string("own");
        let source: Rc<str> = Rc::from("\"lit\"");
        let referenced = heap.ref_string(&source, 1, 3);

        assert_eq!(format_value(&Value::Bool(false), &heap), "FALSE");
        assert_eq!(format_value(&Value::Char(b'c'), &heap), "'c'");
        assert_eq!(format_value(&Value::Real(0.5), &heap), "0.5");
        assert_eq!(format_value(&Value::Integer(7), &heap), "7");
        assert_eq!(format_value(&Value::Obj(owned), &heap), "\"own\"");
        assert_eq!(format_value(&Value::Obj(referenced), &heap), "&\"lit\"");
    }
}
