//! Assembler and disassembler.
//!
//! This module provides:
//! - A two-pass assembler (text → bytes, with a listing)
//! - A disassembler (bytes → readable text)
//! - The hex image file format

pub mod assembler;
pub mod disasm;
pub mod hex;

pub use assembler::{assemble, assemble_at, AssemblerError, ListingLine, Program};
pub use disasm::disassemble;
pub use hex::{load_hex, parse_hex, save_hex, to_hex_string, HexError};

/// Program that runs every opcode once. See the file header for the
/// memory it expects and the state it leaves behind.
pub const REFERENCE_PROGRAM: &str = include_str!("reference.asm");
