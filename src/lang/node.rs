use std::rc::Rc;

use super::arena::{NodeArena, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    And,
    Or,
    Concat,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl BinaryOp {
    /// Surface spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "DIV",
            BinaryOp::Mod => "MOD",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Concat => "&",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT",
            UnaryOp::Negate => "-",
        }
    }
}

/// Payload of a syntax tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Literals
    Bool(bool),
    Char(u8),
    Real(f64),
    Integer(i64),
    /// Byte range of the string lexeme in the source, quotes included.
    String { start: usize, len: usize },

    // Single child
    Unary { op: UnaryOp, expr: NodeId },
    Group(NodeId),

    // Two children
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub line: u32,
    pub kind: NodeKind,
}

/// A parsed expression: the arena that owns every node, the root, and the
/// source the string literals point into.
#[derive(Debug)]
pub struct Ast {
    pub source: Rc<str>,
    pub arena: NodeArena,
    pub root: NodeId,
}

impl Ast {
    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    pub fn root_node(&self) -> &Node {
        self.arena.get(self.root)
    }

    /// Source text of a string literal, quotes included.
    pub fn lexeme(&self, start: usize, len: usize) -> &str {
        &self.source[start..start + len]
    }

    fn fmt_node(&self, id: NodeId, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            NodeKind::Char(c) => write!(f, "'{}'", *c as char),
            NodeKind::Real(r) => write!(f, "{:.6}", r),
            NodeKind::Integer(n) => write!(f, "{}", n),
            NodeKind::String { start, len } => write!(f, "{}", self.lexeme(*start, *len)),
            NodeKind::Unary { op, expr } => {
                write!(f, "({} ", op.symbol())?;
                self.fmt_node(*expr, f)?;
                write!(f, ")")
            }
            NodeKind::Group(inner) => {
                write!(f, "(")?;
                self.fmt_node(*inner, f)?;
                write!(f, ")")
            }
            NodeKind::Binary { op, lhs, rhs } => {
                write!(f, "(")?;
                self.fmt_node(*lhs, f)?;
                write!(f, " {} ", op.symbol())?;
                self.fmt_node(*rhs, f)?;
                write!(f, ")")
            }
        }
    }
}

impl std::fmt::Display for Ast {
    /// Fully parenthesised rendering of the tree.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_node(self.root, f)
    }
}
