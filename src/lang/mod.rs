//! # Language model
//!
//! Data shared by every phase: the syntax tree and the arena that owns it,
//! runtime values, heap string objects and the table that interns them.

pub mod arena;
pub mod node;
pub mod object;
pub mod table;
pub mod value;
