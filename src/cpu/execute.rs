//! Execution engine.
//!
//! A four-phase state machine advanced one clock tick at a time. Each tick
//! reads the committed registers and the incoming bus byte, schedules
//! register writes, and latches the next phase and bus request. Nothing
//! computed during a tick is observable until the tick has finished.

use crate::cpu::bus::BusRequest;
use crate::cpu::decode::{decode, Instruction};
use crate::cpu::registers::{Reg, Registers, FLAG_CARRY, FLAG_ZERO};
use serde::{Serialize, Deserialize};

/// Engine micro-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Present PC on the bus.
    #[default]
    Fetch1,
    /// Latch the opcode byte, decode and execute.
    Fetch2,
    /// Land the bus byte in the pending destination.
    MemRead,
    /// Hold a write request for one tick.
    MemWrite,
}

/// Registered outputs computed during a tick.
struct Latch {
    phase: Phase,
    bus: BusRequest,
    pending: Reg,
}

/// The processor core.
#[derive(Clone, Serialize, Deserialize)]
pub struct Engine {
    /// Register file.
    pub regs: Registers,
    phase: Phase,
    /// Destination of the read in flight during `MemRead`.
    pending: Reg,
    bus: BusRequest,
    /// Clock ticks seen, including reset ticks.
    pub ticks: u64,
    /// Instructions completed.
    pub retired: u64,
    /// Last decoded instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Engine {
    /// Create an engine in the reset state with every register zero.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            phase: Phase::Fetch1,
            pending: Reg::Pcl,
            bus: BusRequest::read(0),
            ticks: 0,
            retired: 0,
            last_instr: None,
        }
    }

    /// Apply the reset state immediately. POINTERH keeps its value.
    pub fn reset(&mut self) {
        log::debug!("reset (POINTERH={:02X} kept)", self.regs.read(Reg::PointerH));
        self.regs.reset();
        self.phase = Phase::Fetch1;
        self.pending = Reg::Pcl;
        self.bus = BusRequest::read(0);
    }

    /// Advance one clock tick.
    ///
    /// `data_in` is the byte the memory presents for the request that was
    /// on the bus during this tick. While `reset` is asserted the engine
    /// holds the reset state.
    pub fn tick(&mut self, reset: bool, data_in: u8) -> Phase {
        self.ticks += 1;

        if reset {
            self.reset();
            return self.phase;
        }

        let latch = match self.phase {
            Phase::Fetch1 => Latch {
                phase: Phase::Fetch2,
                bus: BusRequest::read(self.regs.pc()),
                pending: self.pending,
            },

            Phase::Fetch2 => {
                self.regs.write(Reg::Ir, data_in);
                let instr = decode(data_in);
                self.last_instr = Some(instr);
                self.execute(instr)
            }

            Phase::MemRead => {
                self.regs.write(self.pending, data_in);
                self.regs.advance_pc();
                self.complete()
            }

            Phase::MemWrite => {
                self.regs.advance_pc();
                self.complete()
            }
        };

        log::trace!(
            "tick {:>6} {:?} -> {:?} pc={:04X} ir={:02X} bus=[{}]",
            self.ticks,
            self.phase,
            latch.phase,
            self.regs.pc(),
            data_in,
            latch.bus
        );

        self.regs.commit();
        self.phase = latch.phase;
        self.bus = latch.bus;
        self.pending = latch.pending;
        self.phase
    }

    /// Execute a freshly decoded instruction during `Fetch2`.
    fn execute(&mut self, instr: Instruction) -> Latch {
        match instr {
            Instruction::Set(reg) => {
                let imm_addr = self.regs.advance_pc();
                Latch {
                    phase: Phase::MemRead,
                    bus: BusRequest::read(imm_addr),
                    pending: reg,
                }
            }

            Instruction::Lda(reg) => Latch {
                phase: Phase::MemRead,
                bus: BusRequest::read(self.regs.pointer()),
                pending: reg,
            },

            Instruction::Sta(reg) => Latch {
                phase: Phase::MemWrite,
                bus: BusRequest::write(self.regs.pointer(), self.regs.read(reg)),
                pending: self.pending,
            },

            Instruction::And(reg) => {
                let result = self.regs.read(Reg::A) & self.regs.read(reg);
                self.regs.write(Reg::A, result);
                self.regs.write_flag(FLAG_ZERO, result == 0);
                self.regs.advance_pc();
                self.complete()
            }

            Instruction::Add(reg) => {
                let sum = self.regs.read(Reg::A) as u16 + self.regs.read(reg) as u16;
                let result = sum as u8;
                self.regs.write(Reg::A, result);
                self.regs.write_flag(FLAG_CARRY, sum > 0xFF);
                self.regs.write_flag(FLAG_ZERO, result == 0);
                self.regs.advance_pc();
                self.complete()
            }

            Instruction::Not(reg) => {
                let result = !self.regs.read(reg);
                self.regs.write(reg, result);
                self.regs.write_flag(FLAG_ZERO, result == 0);
                self.regs.advance_pc();
                self.complete()
            }

            Instruction::Jp(cond) => {
                if cond.holds(self.regs.read(Reg::StatusL)) {
                    let target = self.regs.jump_vector();
                    self.regs.write_pc(target);
                } else {
                    self.regs.advance_pc();
                }
                self.complete()
            }

            Instruction::Chg(reg) => {
                let acc = self.regs.read(Reg::A);
                let other = self.regs.read(reg);
                self.regs.write(Reg::A, other);
                self.regs.write(reg, acc);
                self.regs.advance_pc();
                self.complete()
            }
        }
    }

    /// Finish the current instruction: back to `Fetch1`, bus unchanged.
    fn complete(&mut self) -> Latch {
        self.retired += 1;
        Latch {
            phase: Phase::Fetch1,
            bus: self.bus,
            pending: self.pending,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The request currently driven onto the bus.
    pub fn bus(&self) -> BusRequest {
        self.bus
    }

    /// Destination register of an outstanding read.
    pub fn pending(&self) -> Reg {
        self.pending
    }

    /// Get the last decoded instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Is the engine between instructions?
    pub fn at_instruction_boundary(&self) -> bool {
        self.phase == Phase::Fetch1
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("phase", &self.phase)
            .field("pending", &self.pending)
            .field("bus", &self.bus)
            .field("ticks", &self.ticks)
            .field("regs", &self.regs)
            .finish()
    }
}
