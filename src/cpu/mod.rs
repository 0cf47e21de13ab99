//! Processor core and its clocked harness.
//!
//! - 16 eight-bit registers with two-phase update
//! - 8 instructions, each one byte (SET carries an immediate)
//! - A four-phase fetch/decode/execute state machine driving a memory bus
//! - A 64K flat memory serviced once per tick

pub mod registers;
pub mod decode;
pub mod bus;
pub mod memory;
pub mod execute;
pub mod machine;

pub use registers::{Reg, Registers};
pub use decode::{Instruction, Condition};
pub use bus::{BusRequest, Direction};
pub use memory::{Memory, MemoryError};
pub use execute::{Engine, Phase};
pub use machine::{Machine, RunSummary, Snapshot, StopReason};
