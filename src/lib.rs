//! Scanner, Pratt parser, bytecode compiler and stack VM for a small
//! pseudocode expression language.

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;

pub use bytecode::compile::compile_source;
pub use frontend::parser::parse;
pub use runtime::vm::{InterpretError, InterpretResult, Vm, VmConfig};
