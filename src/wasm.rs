//! WebAssembly bindings for the emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::asm::{assemble, parse_hex};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::decode::encode;
use crate::cpu::{Machine, Reg};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
    program: Vec<u8>,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            machine: Machine::new(),
            program: Vec::new(),
        }
    }

    /// Load a program from assembly source code. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let program = assemble(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.load_bytes(program.bytes)
    }

    /// Load a program from hex image text. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_hex(&mut self, text: &str) -> Result<usize, JsError> {
        let bytes = parse_hex(text)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.load_bytes(bytes)
    }

    fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<usize, JsError> {
        let len = bytes.len();
        self.machine = Machine::new();
        self.machine.load_program(0, &bytes)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.program = bytes;
        Ok(len)
    }

    /// Advance one clock tick. Returns the new phase name.
    #[wasm_bindgen]
    pub fn tick(&mut self) -> String {
        format!("{:?}", self.machine.tick())
    }

    /// Step one instruction. Returns the disassembled instruction, or an
    /// empty string while reset is held.
    #[wasm_bindgen]
    pub fn step(&mut self) -> String {
        let pc = self.machine.engine.regs.pc();
        let from_boundary = self.machine.engine.at_instruction_boundary();
        match self.machine.step() {
            Some(instr) if from_boundary => {
                disassemble_instruction(encode(&instr), Some(self.machine.mem.read(pc.wrapping_add(1))))
            }
            Some(instr) => instr.mnemonic().to_string(),
            None => String::new(),
        }
    }

    /// Run until the program spins or `max_ticks` elapse. Returns ticks used.
    #[wasm_bindgen]
    pub fn run(&mut self, max_ticks: u32) -> u64 {
        self.machine.run_until_spin(max_ticks as u64).ticks
    }

    /// Reload the program and pulse reset.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.machine.load_program(0, &self.program)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.machine.reset();
        Ok(())
    }

    /// Drive the reset level.
    #[wasm_bindgen]
    pub fn set_reset(&mut self, asserted: bool) {
        self.machine.set_reset(asserted);
    }

    #[wasm_bindgen]
    pub fn is_spinning(&self) -> bool {
        self.machine.is_spinning()
    }

    /// Get tick count.
    #[wasm_bindgen]
    pub fn ticks(&self) -> u64 {
        self.machine.engine.ticks
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.machine.engine.regs.pc()
    }

    /// Get register by index (0-15).
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> u8 {
        self.machine.engine.regs.read(Reg::from_index(index))
    }

    /// Get phase as string.
    #[wasm_bindgen]
    pub fn phase(&self) -> String {
        format!("{:?}", self.machine.engine.phase())
    }

    /// Get memory byte at an address.
    #[wasm_bindgen]
    pub fn memory_at(&self, address: u16) -> u8 {
        self.machine.mem.read(address)
    }

    /// Copy a memory window into a JS byte array.
    #[wasm_bindgen]
    pub fn memory_range(&self, start: u16, count: usize) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.machine.mem.slice(start, count))
    }

    /// Get the full machine snapshot as a JSON string.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.machine.snapshot())
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the program size in bytes.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let program = assemble(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(program.bytes.len())
}

/// Disassemble a single instruction.
#[wasm_bindgen]
pub fn wasm_disassemble(opcode: u8, immediate: u8) -> String {
    disassemble_instruction(opcode, Some(immediate))
}
