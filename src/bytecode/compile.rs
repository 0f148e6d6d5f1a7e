use std::rc::Rc;

use crate::{
    bytecode::{chunk::Chunk, compile_error::CompileError, op::OpCode},
    frontend::parser,
    lang::{
        arena::NodeId,
        node::{Ast, BinaryOp, NodeKind, UnaryOp},
        object::Heap,
        value::Value,
    },
};

/// Lowers one syntax tree to one `Chunk`.
///
/// Emission is a single post-order walk: operands first, then the operator.
/// String literals are interned into `heap` as references into the tree's
/// source, so the chunk's string constants are only meaningful together with
/// that heap.
pub struct Compiler<'h> {
    heap: &'h mut Heap,
    chunk: Chunk,
}

impl<'h> Compiler<'h> {
    pub fn new(heap: &'h mut Heap) -> Self {
        Self {
            heap,
            chunk: Chunk::new(),
        }
    }

    pub fn compile(mut self, ast: &Ast) -> Result<Chunk, CompileError> {
        self.compile_node(ast, ast.root)?;
        self.chunk.write(OpCode::Return, ast.root_node().line);

        tracing::debug!(
            bytes = self.chunk.len(),
            constants = self.chunk.constants.len(),
            "compiled chunk"
        );
        Ok(self.chunk)
    }

    fn compile_node(&mut self, ast: &Ast, id: NodeId) -> Result<(), CompileError> {
        let node = ast.node(id);
        let line = node.line;

        match &node.kind {
            NodeKind::Bool(true) => self.chunk.write(OpCode::True, line),
            NodeKind::Bool(false) => self.chunk.write(OpCode::False, line),
            NodeKind::Char(c) => self.emit_constant(Value::Char(*c), line)?,
            NodeKind::Real(r) => self.emit_constant(Value::Real(*r), line)?,
            NodeKind::Integer(n) => self.emit_constant(Value::Integer(*n), line)?,
            NodeKind::String { start, len } => {
                let value = self.string_literal(ast, *start, *len, line)?;
                self.emit_constant(value, line)?;
            }

            NodeKind::Group(inner) => self.compile_node(ast, *inner)?,

            NodeKind::Unary { op, expr } => {
                self.compile_node(ast, *expr)?;
                self.chunk.write(unary_opcode(*op), line);
            }

            NodeKind::Binary { op, lhs, rhs } => {
                self.compile_node(ast, *lhs)?;
                self.compile_node(ast, *rhs)?;
                self.chunk.write(binary_opcode(*op), line);
            }
        }

        Ok(())
    }

    fn emit_constant(&mut self, value: Value, line: u32) -> Result<(), CompileError> {
        self.chunk.write_constant(value, line)?;
        Ok(())
    }

    /// Interns the literal's text without its surrounding quotes.
    fn string_literal(
        &mut self,
        ast: &Ast,
        start: usize,
        len: usize,
        line: u32,
    ) -> Result<Value, CompileError> {
        let malformed = CompileError::MalformedLiteral {
            line,
            what: "string",
        };
        if len < 2 {
            return Err(malformed);
        }
        let (inner_start, inner_len) = (start + 1, len - 2);
        if ast.source.get(inner_start..inner_start + inner_len).is_none() {
            return Err(malformed);
        }
        let r = self.heap.ref_string(&ast.source, inner_start, inner_len);
        Ok(Value::Obj(r))
    }
}

fn unary_opcode(op: UnaryOp) -> OpCode {
    match op {
        UnaryOp::Not => OpCode::Not,
        UnaryOp::Negate => OpCode::Negate,
    }
}

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::IntDiv => OpCode::IntDiv,
        BinaryOp::Mod => OpCode::Mod,
        BinaryOp::And => OpCode::And,
        BinaryOp::Or => OpCode::Or,
        BinaryOp::Concat => OpCode::Concat,
        BinaryOp::Equal => OpCode::Equal,
        BinaryOp::NotEqual => OpCode::NotEqual,
        BinaryOp::Greater => OpCode::Greater,
        BinaryOp::GreaterEqual => OpCode::GreaterEqual,
        BinaryOp::Less => OpCode::Less,
        BinaryOp::LessEqual => OpCode::LessEqual,
    }
}

/// Parses and compiles `source` in one step.
pub fn compile_source(source: &Rc<str>, heap: &mut Heap) -> Result<Chunk, CompileError> {
    let ast = parser::parse(source)?;
    Compiler::new(heap).compile(&ast)
}
