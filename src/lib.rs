//! # tiny8
//!
//! A cycle-level emulator of a minimal 8-bit processor.
//!
//! The core is a four-phase fetch/decode/execute state machine over a
//! sixteen-register file, talking to memory through a single registered bus
//! request. Eight one-byte instructions (SET, LDA, STA, AND, ADD, NOT, JP,
//! CHG) make up the whole instruction set. Around the core sit an
//! assembler, a disassembler and a small debugger.

pub mod cpu;
pub mod asm;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Engine, Machine, Memory, Phase, Reg, Registers, Instruction, BusRequest};
pub use asm::{assemble, disassemble, AssemblerError, Program, load_hex, save_hex};
pub use config::{MachineConfig, ConfigError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
