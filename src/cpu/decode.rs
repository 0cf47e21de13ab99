//! Instruction decoder.
//!
//! Every instruction is one opcode byte:
//! - Bits 2-0: opcode
//! - Bits 7-4: register operand (bit 3 is ignored)
//!
//! For JP the upper nibble is a condition instead: bit 7 is the polarity,
//! bits 6-4 select a STATUSL bit. SET is followed by one immediate byte.

use crate::cpu::registers::Reg;
use serde::{Serialize, Deserialize};

/// A JP condition: jump when STATUSL bit `flag` equals `polarity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// STATUSL bit index (0-7).
    pub flag: u8,
    /// Value the bit must have for the jump to be taken.
    pub polarity: bool,
}

impl Condition {
    /// Jump if Zero is set.
    pub const ZERO: Condition = Condition { flag: 0, polarity: true };
    /// Jump if Zero is clear.
    pub const NOT_ZERO: Condition = Condition { flag: 0, polarity: false };
    /// Jump if Carry is set.
    pub const CARRY: Condition = Condition { flag: 1, polarity: true };
    /// Jump if Carry is clear.
    pub const NOT_CARRY: Condition = Condition { flag: 1, polarity: false };
    /// STATUSL bit 7 is never written, so this always jumps.
    pub const ALWAYS: Condition = Condition { flag: 7, polarity: false };

    /// Build a condition, masking `flag` to 3 bits.
    pub const fn new(flag: u8, polarity: bool) -> Self {
        Self { flag: flag & 0x07, polarity }
    }

    /// Does a STATUSL value satisfy this condition?
    pub const fn holds(self, status: u8) -> bool {
        ((status >> self.flag) & 1 == 1) == self.polarity
    }
}

/// Decoded instruction. Every byte decodes to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// reg := next byte
    Set(Reg),
    /// reg := [POINTER]
    Lda(Reg),
    /// [POINTER] := reg
    Sta(Reg),
    /// A := A & reg
    And(Reg),
    /// A := A + reg, with carry
    Add(Reg),
    /// reg := !reg
    Not(Reg),
    /// PC := JUMP if condition holds
    Jp(Condition),
    /// swap A and reg
    Chg(Reg),
}

/// Opcode numbers (low 3 bits of the instruction byte).
pub mod opcode {
    pub const SET: u8 = 0;
    pub const LDA: u8 = 1;
    pub const STA: u8 = 2;
    pub const AND: u8 = 3;
    pub const ADD: u8 = 4;
    pub const NOT: u8 = 5;
    pub const JP: u8 = 6;
    pub const CHG: u8 = 7;
}

/// Decode an opcode byte.
pub fn decode(byte: u8) -> Instruction {
    let reg = Reg::from_index(byte >> 4);
    match byte & 0x07 {
        opcode::SET => Instruction::Set(reg),
        opcode::LDA => Instruction::Lda(reg),
        opcode::STA => Instruction::Sta(reg),
        opcode::AND => Instruction::And(reg),
        opcode::ADD => Instruction::Add(reg),
        opcode::NOT => Instruction::Not(reg),
        opcode::JP => Instruction::Jp(Condition::new((byte >> 4) & 0x07, byte & 0x80 != 0)),
        // 3 bits leave only CHG
        _ => Instruction::Chg(reg),
    }
}

/// Encode an instruction back to its opcode byte.
pub fn encode(instr: &Instruction) -> u8 {
    let (op, operand) = match *instr {
        Instruction::Set(reg) => (opcode::SET, reg as u8),
        Instruction::Lda(reg) => (opcode::LDA, reg as u8),
        Instruction::Sta(reg) => (opcode::STA, reg as u8),
        Instruction::And(reg) => (opcode::AND, reg as u8),
        Instruction::Add(reg) => (opcode::ADD, reg as u8),
        Instruction::Not(reg) => (opcode::NOT, reg as u8),
        Instruction::Jp(cond) => (opcode::JP, ((cond.polarity as u8) << 3) | (cond.flag & 0x07)),
        Instruction::Chg(reg) => (opcode::CHG, reg as u8),
    };
    (operand << 4) | op
}

impl Instruction {
    /// Number of bytes the instruction occupies in memory.
    pub fn size(&self) -> u16 {
        match self {
            Instruction::Set(_) => 2,
            _ => 1,
        }
    }

    /// Assembler mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Set(_) => "SET",
            Instruction::Lda(_) => "LDA",
            Instruction::Sta(_) => "STA",
            Instruction::And(_) => "AND",
            Instruction::Add(_) => "ADD",
            Instruction::Not(_) => "NOT",
            Instruction::Jp(_) => "JP",
            Instruction::Chg(_) => "CHG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_register_operand() {
        // SET A: A is index 2
        assert_eq!(decode(0x20), Instruction::Set(Reg::A));
        assert_eq!(decode(0x31), Instruction::Lda(Reg::B));
        assert_eq!(decode(0x32), Instruction::Sta(Reg::B));
        assert_eq!(decode(0x33), Instruction::And(Reg::B));
        assert_eq!(decode(0x34), Instruction::Add(Reg::B));
        assert_eq!(decode(0x35), Instruction::Not(Reg::B));
        assert_eq!(decode(0x37), Instruction::Chg(Reg::B));
    }

    #[test]
    fn test_decode_ignores_bit_three() {
        assert_eq!(decode(0x3C), decode(0x34));
        assert_eq!(decode(0xFF), Instruction::Chg(Reg::F));
    }

    #[test]
    fn test_decode_jump_condition() {
        assert_eq!(decode(0x86), Instruction::Jp(Condition::ZERO));
        assert_eq!(decode(0x06), Instruction::Jp(Condition::NOT_ZERO));
        assert_eq!(decode(0x96), Instruction::Jp(Condition::CARRY));
        assert_eq!(decode(0x76), Instruction::Jp(Condition::ALWAYS));
    }

    #[test]
    fn test_condition_holds() {
        assert!(Condition::ZERO.holds(0b01));
        assert!(!Condition::ZERO.holds(0b10));
        assert!(Condition::NOT_CARRY.holds(0b01));
        assert!(Condition::ALWAYS.holds(0b11));
    }

    #[test]
    fn test_encode_inverts_decode() {
        // Bit 3 carries no information, so only bytes with it clear
        // survive unchanged.
        for byte in (0..=255u8).filter(|b| b & 0x08 == 0) {
            assert_eq!(encode(&decode(byte)), byte, "byte {:#04X}", byte);
        }
    }

    #[test]
    fn test_instruction_length() {
        assert_eq!(decode(0x20).size(), 2);
        assert_eq!(decode(0x21).size(), 1);
    }
}
