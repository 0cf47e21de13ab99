//! Clocked machine: an engine wired to a flat memory.
//!
//! Each tick the memory first services the request the engine is driving,
//! then the engine clocks with the resulting `data_in` byte.

use crate::cpu::bus::BusRequest;
use crate::cpu::decode::Instruction;
use crate::cpu::execute::{Engine, Phase};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::{Reg, REGISTER_COUNT};
use serde::{Serialize, Deserialize};

/// How a bounded run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The tick budget ran out.
    TickLimit,
    /// An instruction jumped to its own address.
    Spinning,
}

/// Result of [`Machine::run_until_spin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub instructions: u64,
    pub reason: StopReason,
}

/// Point-in-time view of the core for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub pc: u16,
    pub pointer: u16,
    pub registers: [u8; REGISTER_COUNT],
    pub zero: bool,
    pub carry: bool,
    pub pending: Reg,
    pub bus: BusRequest,
    pub ticks: u64,
    pub retired: u64,
    pub last_instruction: Option<Instruction>,
}

/// Engine plus memory plus a reset line.
#[derive(Clone, Serialize, Deserialize)]
pub struct Machine {
    pub engine: Engine,
    pub mem: Memory,
    reset_line: bool,
    spinning: bool,
}

impl Machine {
    /// Create a machine with zeroed registers and memory.
    pub fn new() -> Self {
        Self {
            engine: Engine::new(),
            mem: Memory::new(),
            reset_line: false,
            spinning: false,
        }
    }

    /// Copy a program image into memory at `origin`.
    pub fn load_program(&mut self, origin: u16, image: &[u8]) -> Result<(), MemoryError> {
        self.mem.load(origin, image)
    }

    /// Drive the reset level. It stays asserted until cleared.
    pub fn set_reset(&mut self, asserted: bool) {
        self.reset_line = asserted;
    }

    pub fn reset_asserted(&self) -> bool {
        self.reset_line
    }

    /// Pulse reset for one tick.
    pub fn reset(&mut self) {
        let held = self.reset_line;
        self.reset_line = true;
        self.tick();
        self.reset_line = held;
        self.spinning = false;
    }

    /// Advance one clock tick.
    pub fn tick(&mut self) -> Phase {
        let request = self.engine.bus();
        let data_in = self.mem.service(&request);
        self.engine.tick(self.reset_line, data_in)
    }

    /// Advance `count` ticks.
    pub fn run(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Tick until the current instruction completes.
    ///
    /// Between instructions this runs the whole next instruction; in the
    /// middle of one it only finishes it. Returns the completed
    /// instruction, or `None` if reset is held (a single tick is taken in
    /// that case).
    pub fn step(&mut self) -> Option<Instruction> {
        self.step_until(u64::MAX)
    }

    /// Like [`step`](Self::step), but never advances `engine.ticks` past
    /// `limit`. Returns `None` if the limit is reached before the
    /// instruction completes; the rest of it stays in flight.
    pub fn step_until(&mut self, limit: u64) -> Option<Instruction> {
        if self.engine.ticks >= limit {
            return None;
        }
        if self.reset_line {
            self.tick();
            return None;
        }

        // PC only names the instruction's own address at a boundary
        let from_boundary = self.engine.at_instruction_boundary();
        let start_pc = self.engine.regs.pc();
        let retired = self.engine.retired;
        while self.engine.retired == retired {
            if self.engine.ticks >= limit {
                return None;
            }
            self.tick();
        }

        self.spinning = from_boundary && self.engine.regs.pc() == start_pc;
        self.engine.last_instruction()
    }

    /// Step instructions until one jumps to itself or `max_ticks` elapse.
    pub fn run_until_spin(&mut self, max_ticks: u64) -> RunSummary {
        let start_ticks = self.engine.ticks;
        let start_retired = self.engine.retired;
        let limit = start_ticks.saturating_add(max_ticks);

        let reason = loop {
            if self.engine.ticks >= limit {
                break StopReason::TickLimit;
            }
            if self.step_until(limit).is_some() && self.spinning {
                break StopReason::Spinning;
            }
        };

        let summary = RunSummary {
            ticks: self.engine.ticks - start_ticks,
            instructions: self.engine.retired - start_retired,
            reason,
        };
        log::info!(
            "stopped after {} ticks / {} instructions: {:?}",
            summary.ticks,
            summary.instructions,
            summary.reason
        );
        summary
    }

    /// Did the last completed instruction jump to its own address?
    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    pub fn snapshot(&self) -> Snapshot {
        let regs = &self.engine.regs;
        Snapshot {
            phase: self.engine.phase(),
            pc: regs.pc(),
            pointer: regs.pointer(),
            registers: regs.values(),
            zero: regs.zero(),
            carry: regs.carry(),
            pending: self.engine.pending(),
            bus: self.engine.bus(),
            ticks: self.engine.ticks,
            retired: self.engine.retired,
            last_instruction: self.engine.last_instruction(),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("engine", &self.engine)
            .field("reset", &self.reset_line)
            .field("mem", &self.mem)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::asm::REFERENCE_PROGRAM;

    fn machine_with(source: &str) -> Machine {
        let program = assemble(source).unwrap();
        let mut machine = Machine::new();
        machine.load_program(0, &program.bytes).unwrap();
        machine
    }

    #[test]
    fn test_reference_program() {
        let mut machine = machine_with(REFERENCE_PROGRAM);
        machine.mem.write(0x2000, 0xAA);

        let summary = machine.run_until_spin(1_000);
        assert_eq!(summary.reason, StopReason::Spinning);

        let regs = &machine.engine.regs;
        assert_eq!(regs.read(Reg::A), 0x55);
        assert_eq!(regs.read(Reg::B), 0xAA);
        assert_eq!(machine.mem.read(0x2001), 0xAA);
        assert!(!regs.zero());
        assert!(!regs.carry());
    }

    #[test]
    fn test_write_lands_during_memwrite() {
        let mut machine = machine_with(
            "SET POINTERH, 0x30\n\
             SET B, 0x5A\n\
             ST B\n",
        );
        machine.run(6);
        // Third instruction: Fetch1, Fetch2 (write issued), MemWrite (stored)
        machine.run(2);
        assert_eq!(machine.mem.read(0x3000), 0);
        machine.run(1);
        assert_eq!(machine.mem.read(0x3000), 0x5A);
        assert_eq!(machine.engine.phase(), Phase::Fetch1);
    }

    #[test]
    fn test_step_returns_instruction() {
        let mut machine = machine_with("SET A, 7\nNOT A\n");

        assert_eq!(machine.step(), Some(Instruction::Set(Reg::A)));
        assert_eq!(machine.engine.regs.read(Reg::A), 7);
        assert_eq!(machine.step(), Some(Instruction::Not(Reg::A)));
        assert_eq!(machine.engine.regs.read(Reg::A), 0xF8);
        assert_eq!(machine.engine.regs.pc(), 3);
    }

    #[test]
    fn test_reset_pulse_restarts_program() {
        let mut machine = machine_with("SET POINTERH, 0x12\nSET A, 1\n");
        machine.run(6);
        assert_eq!(machine.engine.regs.read(Reg::A), 1);

        machine.reset();
        let snap = machine.snapshot();
        assert_eq!(snap.phase, Phase::Fetch1);
        assert_eq!(snap.pc, 0);
        assert_eq!(snap.registers[Reg::A.index()], 0);
        assert_eq!(snap.registers[Reg::PointerH.index()], 0x12);
    }

    #[test]
    fn test_reset_level_holds() {
        let mut machine = machine_with("SET A, 1\n");
        machine.set_reset(true);
        machine.run(10);
        assert_eq!(machine.engine.regs.pc(), 0);
        assert_eq!(machine.step(), None);

        machine.set_reset(false);
        machine.step();
        assert_eq!(machine.engine.regs.read(Reg::A), 1);
    }

    #[test]
    fn test_run_until_spin_respects_limit() {
        let mut machine = machine_with("SET A, 1\nSET B, 2\n");
        let summary = machine.run_until_spin(4);
        assert_eq!(summary.reason, StopReason::TickLimit);
        assert_eq!(summary.ticks, 4);
    }

    #[test]
    fn test_run_until_spin_large_budget() {
        let mut machine = machine_with("SET A, 1\nSET JUMPL, here\nhere: JP 7, 0\n");
        machine.run(1);
        let summary = machine.run_until_spin(u64::MAX);
        assert_eq!(summary.reason, StopReason::Spinning);
        assert_eq!(machine.engine.regs.read(Reg::A), 1);
    }

    #[test]
    fn test_step_until_stops_mid_instruction() {
        let mut machine = machine_with("SET A, 1\nSET B, 2\n");
        assert_eq!(machine.step_until(2), None);
        assert_eq!(machine.engine.ticks, 2);
        assert_eq!(machine.engine.phase(), Phase::MemRead);

        // The unfinished SET completes on the next call
        assert_eq!(machine.step_until(3), Some(Instruction::Set(Reg::A)));
        assert_eq!(machine.engine.regs.read(Reg::A), 1);
        assert_eq!(machine.step_until(3), None);
        assert_eq!(machine.engine.ticks, 3);
    }

    #[test]
    fn test_snapshot_serializes() {
        let machine = Machine::new();
        let json = serde_json::to_string(&machine.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"Fetch1\""));
    }
}
