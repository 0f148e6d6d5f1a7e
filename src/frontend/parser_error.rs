use thiserror::Error;

/// A lexical or syntax error with its source line.
///
/// `lexeme` is the text of the offending token (empty at end of input, and
/// empty for lexical errors, whose message already describes the problem).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}{}", at(.lexeme))]
pub struct ParserError {
    pub message: String,
    pub line: u32,
    pub lexeme: String,
}

fn at(lexeme: &str) -> String {
    if lexeme.is_empty() {
        String::new()
    } else {
        format!(" at '{}'", lexeme)
    }
}

impl ParserError {
    pub fn new(message: impl Into<String>, line: u32, lexeme: impl Into<String>) -> Self {
        ParserError {
            message: message.into(),
            line,
            lexeme: lexeme.into(),
        }
    }
}
