//! The register file.
//!
//! Sixteen 8-bit cells with fixed roles:
//! - PCL/PCH: program counter (big-endian pair)
//! - A: accumulator, B/C/D/E/F: general registers
//! - POINTERL/POINTERH: implicit address for LDA/STA
//! - STATUSL: flags (bit 0 = Zero, bit 1 = Carry), STATUSH: reserved
//! - IR: last fetched instruction byte
//! - JUMPL/JUMPH: absolute target for JP
//!
//! Updates are two-phase: reads always see the values committed at the
//! previous tick boundary, writes land in a pending buffer that becomes
//! visible on [`Registers::commit`].

use serde::{Serialize, Deserialize};

/// Number of addressable registers.
pub const REGISTER_COUNT: usize = 16;

/// STATUSL bit for a zero result.
pub const FLAG_ZERO: u8 = 1 << 0;
/// STATUSL bit for carry out of ADD.
pub const FLAG_CARRY: u8 = 1 << 1;

/// Register name for each index 0-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Reg {
    Pcl = 0,
    Pch = 1,
    A = 2,
    B = 3,
    C = 4,
    D = 5,
    PointerL = 6,
    PointerH = 7,
    StatusL = 8,
    StatusH = 9,
    Ir = 10,
    /// Index 11 has no assigned role.
    Reserved = 11,
    JumpL = 12,
    JumpH = 13,
    E = 14,
    F = 15,
}

impl Reg {
    /// All registers in index order.
    pub const ALL: [Reg; REGISTER_COUNT] = [
        Reg::Pcl,
        Reg::Pch,
        Reg::A,
        Reg::B,
        Reg::C,
        Reg::D,
        Reg::PointerL,
        Reg::PointerH,
        Reg::StatusL,
        Reg::StatusH,
        Reg::Ir,
        Reg::Reserved,
        Reg::JumpL,
        Reg::JumpH,
        Reg::E,
        Reg::F,
    ];

    /// Register for a 4-bit index. Bits above the low nibble are ignored.
    pub const fn from_index(index: u8) -> Reg {
        Self::ALL[(index & 0x0F) as usize]
    }

    /// The register's index in the file.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Canonical assembler name.
    pub const fn name(self) -> &'static str {
        match self {
            Reg::Pcl => "PCL",
            Reg::Pch => "PCH",
            Reg::A => "A",
            Reg::B => "B",
            Reg::C => "C",
            Reg::D => "D",
            Reg::PointerL => "POINTERL",
            Reg::PointerH => "POINTERH",
            Reg::StatusL => "STATUSL",
            Reg::StatusH => "STATUSH",
            Reg::Ir => "IR",
            Reg::Reserved => "R11",
            Reg::JumpL => "JUMPL",
            Reg::JumpH => "JUMPH",
            Reg::E => "E",
            Reg::F => "F",
        }
    }

    /// Look up a register by name, accepting `R0`..`R15` aliases.
    /// Case-insensitive.
    pub fn parse(name: &str) -> Option<Reg> {
        let upper = name.trim().to_uppercase();
        if let Some(num) = upper.strip_prefix('R') {
            if let Ok(index) = num.parse::<u8>() {
                return (index < 16).then(|| Reg::from_index(index));
            }
        }
        Self::ALL.iter().copied().find(|r| r.name() == upper)
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The register file with a committed bank and a pending bank.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    current: [u8; REGISTER_COUNT],
    next: [u8; REGISTER_COUNT],
}

impl Registers {
    /// Create a register file with every cell zero.
    pub fn new() -> Self {
        Self {
            current: [0; REGISTER_COUNT],
            next: [0; REGISTER_COUNT],
        }
    }

    /// Committed value of a register.
    #[inline]
    pub fn read(&self, reg: Reg) -> u8 {
        self.current[reg.index()]
    }

    /// Schedule a write, visible after the next [`commit`](Self::commit).
    /// A later write to the same register in the same tick wins.
    #[inline]
    pub fn write(&mut self, reg: Reg, value: u8) {
        self.next[reg.index()] = value;
    }

    /// Publish all scheduled writes.
    pub fn commit(&mut self) {
        self.current = self.next;
    }

    /// Set a register immediately in both banks, bypassing the tick
    /// boundary. Used by harnesses to preload state.
    pub fn poke(&mut self, reg: Reg, value: u8) {
        self.current[reg.index()] = value;
        self.next[reg.index()] = value;
    }

    /// Clear every register except POINTERH, in both banks.
    pub fn reset(&mut self) {
        for reg in Reg::ALL {
            if reg != Reg::PointerH {
                self.poke(reg, 0);
            }
        }
    }

    /// Committed values in index order.
    pub fn values(&self) -> [u8; REGISTER_COUNT] {
        self.current
    }

    /// Program counter {PCH,PCL}.
    pub fn pc(&self) -> u16 {
        self.pair(Reg::Pch, Reg::Pcl)
    }

    /// Memory pointer {POINTERH,POINTERL}.
    pub fn pointer(&self) -> u16 {
        self.pair(Reg::PointerH, Reg::PointerL)
    }

    /// Jump vector {JUMPH,JUMPL}.
    pub fn jump_vector(&self) -> u16 {
        self.pair(Reg::JumpH, Reg::JumpL)
    }

    /// Schedule a new program counter.
    pub fn write_pc(&mut self, pc: u16) {
        let [high, low] = pc.to_be_bytes();
        self.write(Reg::Pch, high);
        self.write(Reg::Pcl, low);
    }

    /// Schedule PC + 1 (wrapping), computed from the committed PC.
    /// Returns the new value.
    pub fn advance_pc(&mut self) -> u16 {
        let next = self.pc().wrapping_add(1);
        self.write_pc(next);
        next
    }

    /// Committed Zero flag.
    pub fn zero(&self) -> bool {
        self.read(Reg::StatusL) & FLAG_ZERO != 0
    }

    /// Committed Carry flag.
    pub fn carry(&self) -> bool {
        self.read(Reg::StatusL) & FLAG_CARRY != 0
    }

    /// Schedule a single STATUSL flag, leaving the other bits of the
    /// pending value alone.
    pub fn write_flag(&mut self, flag: u8, set: bool) {
        let status = &mut self.next[Reg::StatusL.index()];
        if set {
            *status |= flag;
        } else {
            *status &= !flag;
        }
    }

    fn pair(&self, high: Reg, low: Reg) -> u16 {
        u16::from_be_bytes([self.read(high), self.read(low)])
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for reg in Reg::ALL {
            map.entry(&reg.name(), &format_args!("{:#04X}", self.read(reg)));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_write_visible_after_commit() {
        let mut regs = Registers::new();
        regs.write(Reg::B, 0x42);
        assert_eq!(regs.read(Reg::B), 0);

        regs.commit();
        assert_eq!(regs.read(Reg::B), 0x42);
    }

    #[test]
    fn test_pc_pairs_big_endian() {
        let mut regs = Registers::new();
        regs.poke(Reg::Pch, 0x12);
        regs.poke(Reg::Pcl, 0x34);
        assert_eq!(regs.pc(), 0x1234);

        regs.poke(Reg::PointerH, 0x20);
        regs.poke(Reg::PointerL, 0x01);
        assert_eq!(regs.pointer(), 0x2001);
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.poke(Reg::Pch, 0xFF);
        regs.poke(Reg::Pcl, 0xFF);

        assert_eq!(regs.advance_pc(), 0x0000);
        regs.commit();
        assert_eq!(regs.pc(), 0);
    }

    #[test]
    fn test_advance_pc_reads_committed_value() {
        let mut regs = Registers::new();
        regs.poke(Reg::Pcl, 0x10);

        regs.advance_pc();
        regs.advance_pc();
        regs.commit();
        assert_eq!(regs.pc(), 0x11);
    }

    #[test]
    fn test_flag_writes_compose() {
        let mut regs = Registers::new();
        regs.write_flag(FLAG_CARRY, true);
        regs.write_flag(FLAG_ZERO, true);
        regs.commit();
        assert!(regs.zero());
        assert!(regs.carry());

        regs.write_flag(FLAG_ZERO, false);
        regs.commit();
        assert!(!regs.zero());
        assert!(regs.carry());
        assert_eq!(regs.read(Reg::StatusL), FLAG_CARRY);
    }

    #[test]
    fn test_reset_keeps_pointer_high() {
        let mut regs = Registers::new();
        for reg in Reg::ALL {
            regs.poke(reg, 0xA5);
        }

        regs.reset();

        for reg in Reg::ALL {
            let expected = if reg == Reg::PointerH { 0xA5 } else { 0 };
            assert_eq!(regs.read(reg), expected, "{}", reg);
        }
    }

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!(Reg::parse("a"), Some(Reg::A));
        assert_eq!(Reg::parse("POINTERH"), Some(Reg::PointerH));
        assert_eq!(Reg::parse("r14"), Some(Reg::E));
        assert_eq!(Reg::parse("R11"), Some(Reg::Reserved));
        assert_eq!(Reg::parse("R16"), None);
        assert_eq!(Reg::parse("X"), None);
    }

    proptest! {
        #[test]
        fn prop_write_then_read_roundtrip(index in 0u8..16, value: u8) {
            let reg = Reg::from_index(index);
            let mut regs = Registers::new();
            regs.write(reg, value);
            regs.commit();
            prop_assert_eq!(regs.read(reg), value);
        }
    }
}
