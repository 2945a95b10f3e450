//! RISC-V backend
//!
//! Emits RV32IM assembly for the ChocoPy runtime: objects carry a
//! three-word header (tag, size, dispatch table), `int` and `bool` travel
//! unboxed in registers and are boxed only when stored into slots of
//! reference type.

pub mod asm;
pub mod constants;
pub mod descriptors;
pub mod emit;
pub mod program;
pub mod regs;

pub use program::{CodeGenOptions, RiscVCodeGen};
