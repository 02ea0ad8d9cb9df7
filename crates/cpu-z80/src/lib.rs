//! Instruction-stepped Zilog Z80 CPU.
//!
//! The instruction set is loaded from a declarative table (see `opcodes`)
//! into a decode tree; each `step_instruction` call decodes and executes one
//! instruction and returns its documented cycle count, with the extra
//! penalty added when a conditional branch is taken.
//!
//! Standalone chip crate: the CPU talks to the machine only through the
//! `emu_core` bus traits passed into each step.

mod cpu;
mod disasm;
mod execute;
mod flags;
mod opcodes;
mod registers;

pub use cpu::{Z80, HISTORY_LEN};
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use opcodes::{Cond, DecodeNode, Instr, Mnemonic, Operand};
pub use registers::Registers;
