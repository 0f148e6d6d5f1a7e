pub mod chunk;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod image;
pub mod op;

pub use chunk::Chunk;
pub use op::OpCode;
