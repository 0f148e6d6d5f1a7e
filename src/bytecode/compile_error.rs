use thiserror::Error;

use crate::frontend::parser_error::ParserError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The source never produced a tree.
    #[error(transparent)]
    Parse(#[from] ParserError),

    /// The constant pool outgrew the widest constant operand.
    #[error("line {line}: too many constants in one chunk (limit {limit})")]
    TooManyConstants { line: u32, limit: usize },

    /// A literal node whose payload does not describe a valid value.
    #[error("line {line}: malformed {what} literal")]
    MalformedLiteral { line: u32, what: &'static str },
}

impl CompileError {
    pub fn line(&self) -> u32 {
        match self {
            CompileError::Parse(e) => e.line,
            CompileError::TooManyConstants { line, .. } => *line,
            CompileError::MalformedLiteral { line, .. } => *line,
        }
    }
}
