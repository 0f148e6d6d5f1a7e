use crate::frontend::token::{Token, TokenKind};

/// On-demand scanner over a source buffer.
///
/// Tokens borrow their lexemes from the source; nothing is copied. Lexical
/// problems do not stop the scan: they come back as `TokenKind::Error`
/// tokens whose lexeme is the diagnostic message.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    pos: usize,
    line: u32,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            finished: false,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    fn is_at_end(&self) -> bool {
        // a NUL byte terminates the buffer the same way the end of the slice does
        self.pos >= self.bytes.len() || self.bytes[self.pos] == 0
    }

    fn current(&self) -> Option<u8> {
        if self.is_at_end() {
            None
        } else {
            Some(self.bytes[self.pos])
        }
    }

    fn peek(&self) -> Option<u8> {
        if self.is_at_end() {
            return None;
        }
        self.bytes.get(self.pos + 1).copied().filter(|b| *b != 0)
    }

    fn advance(&mut self) -> u8 {
        let ch = self.bytes[self.pos];
        self.pos += 1;
        ch
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.current() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn make(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.pos],
            start: self.start,
            line: self.line,
        }
    }

    fn error(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            start: self.start,
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            match ch {
                b' ' | b'\t' | b'\r' => {
                    self.advance();
                }
                b'/' if self.peek() == Some(b'/') => {
                    while self.current().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) -> Token<'src> {
        while self
            .current()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let kind = TokenKind::keyword(&self.source[self.start..self.pos]);
        self.make(kind)
    }

    fn read_number(&mut self) -> Token<'src> {
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Only treat '.' as a decimal point if followed by a digit
        if self.current() == Some(b'.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            return self.make(TokenKind::Real);
        }

        self.make(TokenKind::Integer)
    }

    /// Scans up to `delimiter`, counting newlines. Returns the line the
    /// literal started on, or `None` if the input ran out first.
    fn read_delimited(&mut self, delimiter: u8) -> Option<u32> {
        let start_line = self.line;
        while let Some(ch) = self.current() {
            if ch == delimiter {
                self.advance();
                return Some(start_line);
            }
            if ch == b'\n' {
                self.line += 1;
            }
            self.advance();
        }
        None
    }

    fn read_string(&mut self) -> Token<'src> {
        match self.read_delimited(b'"') {
            Some(start_line) => Token {
                line: start_line,
                ..self.make(TokenKind::String)
            },
            None => self.error("unterminated string"),
        }
    }

    fn read_char(&mut self) -> Token<'src> {
        let Some(start_line) = self.read_delimited(b'\'') else {
            return self.error("unterminated character literal");
        };

        match self.pos - self.start {
            2 => self.error("empty character literal"),
            3 => Token {
                line: start_line,
                ..self.make(TokenKind::Char)
            },
            _ => self.error("multi-character character literal"),
        }
    }

    fn skip_utf8_continuation(&mut self) {
        while self.current().is_some_and(|c| (c & 0xC0) == 0x80) {
            self.advance();
        }
    }

    /// Scans the next token. After the end of input every call yields `Eof`.
    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.pos;

        if self.is_at_end() {
            return self.make(TokenKind::Eof);
        }

        let ch = self.advance();

        if ch.is_ascii_alphabetic() || ch == b'_' {
            return self.read_identifier();
        }
        if ch.is_ascii_digit() {
            return self.read_number();
        }

        match ch {
            b'\n' => {
                let token = self.make(TokenKind::Eol);
                self.line += 1;
                token
            }
            b'+' => self.make(TokenKind::Plus),
            b'-' => self.make(TokenKind::Minus),
            b'*' => self.make(TokenKind::Star),
            b'/' => self.make(TokenKind::Slash),
            b'&' => self.make(TokenKind::Ampersand),
            b'^' => self.make(TokenKind::Caret),
            b':' => self.make(TokenKind::Colon),
            b',' => self.make(TokenKind::Comma),
            b'(' => self.make(TokenKind::LParen),
            b')' => self.make(TokenKind::RParen),
            b'[' => self.make(TokenKind::LBracket),
            b']' => self.make(TokenKind::RBracket),
            b'.' => self.make(TokenKind::Dot),
            b'=' => self.make(TokenKind::Eq),
            b'<' => {
                if self.matches(b'-') {
                    self.make(TokenKind::Assign)
                } else if self.matches(b'=') {
                    self.make(TokenKind::LtEq)
                } else if self.matches(b'>') {
                    self.make(TokenKind::NotEq)
                } else {
                    self.make(TokenKind::Lt)
                }
            }
            b'>' => {
                if self.matches(b'=') {
                    self.make(TokenKind::GtEq)
                } else {
                    self.make(TokenKind::Gt)
                }
            }
            b'"' => self.read_string(),
            b'\'' => self.read_char(),
            _ => {
                self.skip_utf8_continuation();
                self.error("unexpected character")
            }
        }
    }

    /// Collects every token up to and including `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token<'src>> {
        self.collect()
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}
