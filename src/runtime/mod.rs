pub mod runtime_error;
pub mod stack;
pub mod vm;

pub use vm::{InterpretError, InterpretResult, Vm, VmConfig};
