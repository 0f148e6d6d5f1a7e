use std::fmt::Write;

use crate::frontend::token::{Token, TokenKind};

/// Prints a token listing, one token per row: the line number (or `|` when
/// it repeats the previous row's line), a kind class and the lexeme.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if true, prints the kind's Debug name instead of its class
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: false,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const RED: &'static str = "\x1b[31m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn debug(mut self) -> Self {
        self.show_debug_repr = true;
        self
    }

    pub fn dump(&self, tokens: &[Token<'_>]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Token<'_>]) -> String {
        let mut out = String::new();
        let mut line = None;
        for token in tokens {
            self.render_one(&mut out, token, line == Some(token.line));
            line = Some(token.line);
        }
        out
    }

    fn render_one(&self, out: &mut String, token: &Token<'_>, same_line: bool) {
        let colr = if self.color { self.color(token.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        if same_line {
            out.push_str("    | ");
        } else {
            let _ = write!(out, "{:5} ", token.line);
        }

        let kind = if self.show_debug_repr {
            format!("{:?}", token.kind)
        } else {
            self.kind(token.kind).to_string()
        };

        let _ = writeln!(out, "{}{:<8} {}{}", colr, kind, token, reset);
    }

    fn kind(&self, kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Eol => "EOL",
            TokenKind::Eof => "EOF",
            TokenKind::Error => "ERROR",
            TokenKind::Ident => "IDENT",
            TokenKind::True | TokenKind::False => "BOOL",
            TokenKind::Char => "CHAR",
            TokenKind::Date => "DATE",
            TokenKind::Integer => "INT",
            TokenKind::Real => "REAL",
            TokenKind::String => "STRING",
            TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::LtEq
            | TokenKind::Gt
            | TokenKind::GtEq => "CMP",
            k if k.is_operator() => "OP",
            _ => "KEYWORD",
        }
    }

    fn color(&self, kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Eol | TokenKind::Eof => Self::DIM,
            TokenKind::Error => Self::RED,
            TokenKind::String | TokenKind::Char => Self::GRN,
            TokenKind::Ident => Self::YEL,
            k if k.is_literal() => Self::CYN,
            k if k.is_operator() => Self::MAG,
            _ => Self::RESET,
        }
    }
}
