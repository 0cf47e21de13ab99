//! Disassembler.
//!
//! Converts byte images back to readable assembly.

use crate::cpu::decode::{decode, Condition, Instruction};

/// Disassemble a single instruction. `immediate` is the byte after the
/// opcode, used only by SET.
pub fn disassemble_instruction(opcode: u8, immediate: Option<u8>) -> String {
    format_instruction(&decode(opcode), immediate)
}

/// Disassemble a byte image loaded at `origin`.
pub fn disassemble(bytes: &[u8], origin: u16) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n\n");

    for (addr, encoded, text) in disassemble_lines(bytes, origin) {
        let hex: Vec<String> = encoded.iter().map(|b| format!("{:02X}", b)).collect();
        output.push_str(&format!("{:04X}: {:<6} {}\n", addr, hex.join(" "), text));
    }

    output
}

/// Walk an image, yielding (address, bytes, text) per instruction.
pub fn disassemble_lines(bytes: &[u8], origin: u16) -> Vec<(u16, Vec<u8>, String)> {
    let mut lines = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let instr = decode(bytes[offset]);
        let size = (instr.size() as usize).min(bytes.len() - offset);
        let encoded = bytes[offset..offset + size].to_vec();
        let immediate = encoded.get(1).copied();
        let addr = origin.wrapping_add(offset as u16);

        lines.push((addr, encoded, format_instruction(&instr, immediate)));
        offset += size;
    }

    lines
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction, immediate: Option<u8>) -> String {
    match instr {
        Instruction::Set(reg) => match immediate {
            Some(value) => format!("SET {}, 0x{:02X}", reg, value),
            None => format!("SET {}, ???", reg),
        },
        Instruction::Jp(cond) => format_jump(*cond),
        Instruction::Lda(reg)
        | Instruction::Sta(reg)
        | Instruction::And(reg)
        | Instruction::Add(reg)
        | Instruction::Not(reg)
        | Instruction::Chg(reg) => format!("{} {}", instr.mnemonic(), reg),
    }
}

fn format_jump(cond: Condition) -> String {
    match cond {
        Condition::ZERO => "JPZ".to_string(),
        Condition::NOT_ZERO => "JPNZ".to_string(),
        Condition::CARRY => "JPC".to_string(),
        Condition::NOT_CARRY => "JPNC".to_string(),
        _ => format!("JP {}, {}", cond.flag, cond.polarity as u8),
    }
}
