//! Operation layer entry.
//!
//! Extension path (minimal touch points):
//! 1) add opcode in `spec.rs` and register meta in `catalog.rs` (`OP_METAS`),
//! 2) emit its stage expression in `codegen.rs`,
//! 3) add parse/compile tests.

pub mod catalog;
pub mod codegen;
pub mod spec;

pub use catalog::{OpMeta, OperatorRegistry};
pub use codegen::{const_json, const_text, emit, MS_PER_DAY};
pub use spec::{Arity, DialectSupport, OpCode, ResultType};
