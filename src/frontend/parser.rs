use std::collections::HashMap;
use std::rc::Rc;

use crate::frontend::lexer::Lexer;
use crate::frontend::parser_error::ParserError;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::arena::{NodeArena, NodeId};
use crate::lang::node::{Ast, BinaryOp, Node, NodeKind, UnaryOp};

/// Binding power, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    /// The next tighter level; used for the right operand of left-associative
    /// operators.
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

type PrefixFn<'src> = fn(&mut Parser<'src>) -> Result<NodeId, ParserError>;
type InfixFn<'src> = fn(&mut Parser<'src>, NodeId) -> Result<NodeId, ParserError>;

struct ParseRule<'src> {
    prefix: Option<PrefixFn<'src>>,
    infix: Option<InfixFn<'src>>,
    precedence: Precedence,
}

fn rule<'src>(kind: TokenKind) -> ParseRule<'src> {
    use TokenKind as K;

    let (prefix, infix, precedence): (Option<PrefixFn<'src>>, Option<InfixFn<'src>>, _) =
        match kind {
            K::Char | K::False | K::Integer | K::Real | K::String | K::True => {
                (Some(Parser::literal), None, Precedence::None)
            }
            K::LParen => (Some(Parser::group), None, Precedence::None),
            K::Not => (Some(Parser::unary), None, Precedence::None),
            K::Minus => (Some(Parser::unary), Some(Parser::binary), Precedence::Term),
            K::Plus | K::Ampersand => (None, Some(Parser::binary), Precedence::Term),
            K::Star | K::Slash | K::Div | K::Mod => {
                (None, Some(Parser::binary), Precedence::Factor)
            }
            K::Eq | K::NotEq => (None, Some(Parser::binary), Precedence::Equality),
            K::Lt | K::LtEq | K::Gt | K::GtEq => {
                (None, Some(Parser::binary), Precedence::Comparison)
            }
            K::And => (None, Some(Parser::binary), Precedence::And),
            K::Or => (None, Some(Parser::binary), Precedence::Or),
            _ => (None, None, Precedence::None),
        };

    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    use TokenKind as K;

    Some(match kind {
        K::Plus => BinaryOp::Add,
        K::Minus => BinaryOp::Sub,
        K::Star => BinaryOp::Mul,
        K::Slash => BinaryOp::Div,
        K::Div => BinaryOp::IntDiv,
        K::Mod => BinaryOp::Mod,
        K::And => BinaryOp::And,
        K::Or => BinaryOp::Or,
        K::Ampersand => BinaryOp::Concat,
        K::Eq => BinaryOp::Equal,
        K::NotEq => BinaryOp::NotEqual,
        K::Gt => BinaryOp::Greater,
        K::GtEq => BinaryOp::GreaterEqual,
        K::Lt => BinaryOp::Less,
        K::LtEq => BinaryOp::LessEqual,
        _ => return None,
    })
}

/// Limits that keep parsing, compiling and printing a tree within the
/// native stack.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Deepest chain of nested prefix operators and parentheses.
    pub max_nesting: usize,
    /// Tallest tree accepted, counting long operator chains too.
    pub max_tree_height: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_nesting: 256,
            max_tree_height: 1024,
        }
    }
}

/// Pratt parser for one expression.
///
/// Pulls tokens from the lexer on demand with one token of lookahead.
/// End-of-line tokens are skipped, so an expression may span lines. The
/// first problem ends the parse: there is no recovery.
pub struct Parser<'src> {
    source: &'src Rc<str>,
    lexer: Lexer<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    arena: NodeArena,
    config: ParserConfig,
    depth: usize,
    heights: HashMap<NodeId, u32>,
}

/// Parses `source` into a syntax tree owned by a fresh arena.
pub fn parse(source: &Rc<str>) -> Result<Ast, ParserError> {
    Parser::new(source).parse()
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src Rc<str>) -> Self {
        Self::with_arena(source, NodeArena::new())
    }

    pub fn with_arena(source: &'src Rc<str>, arena: NodeArena) -> Self {
        Self::with_config(source, arena, ParserConfig::default())
    }

    pub fn with_config(source: &'src Rc<str>, arena: NodeArena, config: ParserConfig) -> Self {
        let start = Token {
            kind: TokenKind::Eof,
            lexeme: "",
            start: 0,
            line: 1,
        };
        Parser {
            source,
            lexer: Lexer::new(source),
            current: start,
            previous: start,
            arena,
            config,
            depth: 0,
            heights: HashMap::new(),
        }
    }

    /// Parses one expression followed by end of input.
    pub fn parse(mut self) -> Result<Ast, ParserError> {
        self.advance()?;
        let root = self.expression()?;
        self.consume(TokenKind::Eof, "expected end of input")?;

        tracing::debug!(nodes = self.arena.len(), "parsed expression");

        Ok(Ast {
            source: Rc::clone(self.source),
            arena: self.arena,
            root,
        })
    }

    // Token stream

    fn advance(&mut self) -> Result<(), ParserError> {
        self.previous = self.current;
        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::Eol => continue,
                TokenKind::Error => {
                    return Err(ParserError::new(token.lexeme, token.line, ""));
                }
                _ => {
                    self.current = token;
                    return Ok(());
                }
            }
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<(), ParserError> {
        if self.current.kind == kind {
            self.advance()
        } else {
            Err(self.error_at(self.current, message))
        }
    }

    fn error_at(&self, token: Token<'src>, message: &str) -> ParserError {
        let lexeme = match token.kind {
            TokenKind::Eof => "",
            _ => token.lexeme,
        };
        let message = if token.kind == TokenKind::Eof {
            format!("{} at end", message)
        } else {
            message.to_string()
        };
        ParserError::new(message, token.line, lexeme)
    }

    fn node(&mut self, token: Token<'src>, kind: NodeKind) -> Result<NodeId, ParserError> {
        let height = match kind {
            NodeKind::Unary { expr, .. } | NodeKind::Group(expr) => self.height(expr) + 1,
            NodeKind::Binary { lhs, rhs, .. } => self.height(lhs).max(self.height(rhs)) + 1,
            _ => 1,
        };
        if height > self.config.max_tree_height {
            return Err(self.error_at(token, "expression too complex"));
        }

        let id = self.arena.alloc(Node {
            line: token.line,
            kind,
        });
        self.heights.insert(id, height);
        Ok(id)
    }

    fn height(&self, id: NodeId) -> u32 {
        self.heights.get(&id).copied().unwrap_or(1)
    }

    // Grammar

    fn expression(&mut self) -> Result<NodeId, ParserError> {
        self.parse_precedence(Precedence::Assignment)
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> Result<NodeId, ParserError> {
        if self.depth >= self.config.max_nesting {
            return Err(self.error_at(self.current, "expression nested too deeply"));
        }
        self.depth += 1;
        let result = self.parse_operand(precedence);
        self.depth -= 1;
        result
    }

    fn parse_operand(&mut self, precedence: Precedence) -> Result<NodeId, ParserError> {
        self.advance()?;
        let Some(prefix) = rule(self.previous.kind).prefix else {
            return Err(self.error_at(self.previous, "expected expression"));
        };
        let mut expr = prefix(self)?;

        while precedence <= rule(self.current.kind).precedence {
            self.advance()?;
            let Some(infix) = rule(self.previous.kind).infix else {
                return Err(self.error_at(self.previous, "expected operator"));
            };
            expr = infix(self, expr)?;
        }

        Ok(expr)
    }

    fn literal(&mut self) -> Result<NodeId, ParserError> {
        let token = self.previous;
        let kind = match token.kind {
            TokenKind::True => NodeKind::Bool(true),
            TokenKind::False => NodeKind::Bool(false),
            TokenKind::Integer => match token.lexeme.parse::<i64>() {
                Ok(n) => NodeKind::Integer(n),
                Err(_) => return Err(self.error_at(token, "integer literal out of range")),
            },
            TokenKind::Real => match token.lexeme.parse::<f64>() {
                Ok(r) => NodeKind::Real(r),
                Err(_) => return Err(self.error_at(token, "malformed real literal")),
            },
            // lexer guarantees exactly one byte between the quotes
            TokenKind::Char => NodeKind::Char(token.lexeme.as_bytes()[1]),
            TokenKind::String => NodeKind::String {
                start: token.start,
                len: token.len(),
            },
            _ => return Err(self.error_at(token, "expected literal")),
        };
        self.node(token, kind)
    }

    fn group(&mut self) -> Result<NodeId, ParserError> {
        let token = self.previous;
        let inner = self.expression()?;
        self.consume(TokenKind::RParen, "expected ')' after expression")?;
        self.node(token, NodeKind::Group(inner))
    }

    fn unary(&mut self) -> Result<NodeId, ParserError> {
        let token = self.previous;
        let op = match token.kind {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            _ => return Err(self.error_at(token, "expected unary operator")),
        };
        let expr = self.parse_precedence(Precedence::Unary)?;
        self.node(token, NodeKind::Unary { op, expr })
    }

    fn binary(&mut self, lhs: NodeId) -> Result<NodeId, ParserError> {
        let token = self.previous;
        let Some(op) = binary_op(token.kind) else {
            return Err(self.error_at(token, "expected binary operator"));
        };
        let rhs = self.parse_precedence(rule(token.kind).precedence.next())?;
        self.node(token, NodeKind::Binary { op, lhs, rhs })
    }
}
