//! The back-end of the compiler: IR, code generation, register allocation,
//! and assembly emission (spec.md §3.3–§3.5/§4.3–§4.6).

pub mod asm;
pub mod bitset;
pub mod codegen;
pub mod ir;
pub mod regalloc;

pub use asm::emit;
pub use codegen::generate;
pub use ir::Ir;
pub use regalloc::{color, liveness, ColorMap, InterferenceGraph, SpillError, DEFAULT_K};
