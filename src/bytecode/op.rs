use serde::{Deserialize, Serialize};

// =============================================================================
// OPCODE - one byte per instruction, optionally followed by an operand
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    // literals
    /// Operand: one-byte constant index.
    Constant,
    /// Operand: three-byte little-endian constant index.
    ConstantLong,
    True,
    False,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Negate,

    // logic
    And,
    Or,
    Not,

    // strings
    Concat,

    // comparison
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    Return,
}

impl OpCode {
    const ALL: [OpCode; 22] = [
        OpCode::Constant,
        OpCode::ConstantLong,
        OpCode::True,
        OpCode::False,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::IntDiv,
        OpCode::Mod,
        OpCode::Negate,
        OpCode::And,
        OpCode::Or,
        OpCode::Not,
        OpCode::Concat,
        OpCode::Equal,
        OpCode::NotEqual,
        OpCode::Less,
        OpCode::LessEqual,
        OpCode::Greater,
        OpCode::GreaterEqual,
        OpCode::Return,
    ];

    /// Mnemonic used in listings.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::ConstantLong => "OP_CONSTANT_LONG",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Add => "OP_ADD",
            OpCode::Sub => "OP_SUB",
            OpCode::Mul => "OP_MUL",
            OpCode::Div => "OP_DIV",
            OpCode::IntDiv => "OP_INT_DIV",
            OpCode::Mod => "OP_MOD",
            OpCode::Negate => "OP_NEGATE",
            OpCode::And => "OP_AND",
            OpCode::Or => "OP_OR",
            OpCode::Not => "OP_NOT",
            OpCode::Concat => "OP_CONCAT",
            OpCode::Equal => "OP_EQUAL",
            OpCode::NotEqual => "OP_NOT_EQUAL",
            OpCode::Less => "OP_LESS",
            OpCode::LessEqual => "OP_LESS_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::GreaterEqual => "OP_GREATER_EQUAL",
            OpCode::Return => "OP_RETURN",
        }
    }

    /// Number of operand bytes that follow the opcode.
    pub fn operand_len(self) -> usize {
        match self {
            OpCode::Constant => 1,
            OpCode::ConstantLong => 3,
            _ => 0,
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL.get(byte as usize).copied().ok_or(byte)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
