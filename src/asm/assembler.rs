//! Two-pass assembler.
//!
//! Syntax:
//! ```text
//! ; Comment
//! start:                  ; Define a label
//!     SET A, 0x55         ; Load an immediate byte
//!     SET JUMPL, loop, L  ; Low byte of a label address
//!     SET JUMPH, loop, H  ; High byte of a label address
//!     LD B                ; B <- [POINTER]
//!     ST B                ; [POINTER] <- B
//!     ADD A, B            ; Same as ADD B
//!     JP 0, 1             ; Jump if STATUSL bit 0 is 1 (also JPZ)
//! ```

use crate::cpu::decode::{encode, Condition, Instruction};
use crate::cpu::registers::Reg;
use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code with labels addressed from 0.
pub fn assemble(source: &str) -> Result<Program, AssemblerError> {
    assemble_at(source, 0)
}

/// Assemble source code for a program loaded at `origin`.
pub fn assemble_at(source: &str, origin: u16) -> Result<Program, AssemblerError> {
    let mut asm = Assembler::new(origin);
    asm.assemble(source)
}

/// Assembled output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Address of the first byte.
    pub origin: u16,
    pub bytes: Vec<u8>,
    /// One entry per source line.
    pub listing: Vec<ListingLine>,
}

/// A source line with the bytes it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingLine {
    pub line: usize,
    pub address: u16,
    pub bytes: Vec<u8>,
    pub source: String,
}

impl Program {
    /// Render the listing as `AAAA: BB BB     source` lines.
    pub fn listing_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.listing {
            out.push_str(&format!("{:04X}: ", entry.address));
            if !entry.bytes.is_empty() {
                let bytes: Vec<String> = entry.bytes.iter().map(|b| format!("{:02X}", b)).collect();
                out.push_str(&format!("{:<10}", bytes.join(" ")));
            }
            out.push_str(&entry.source);
            out.push('\n');
        }
        out
    }
}

/// A label reference patched in pass 2.
struct Fixup {
    index: usize,
    label: String,
    high: bool,
    line: usize,
}

/// Where a listing line's bytes live in the output.
struct Span {
    line: usize,
    address: u16,
    start: usize,
    end: usize,
    source: String,
}

/// The assembler state.
struct Assembler {
    origin: u16,
    /// Symbol table (label -> address).
    symbols: HashMap<String, u16>,
    fixups: Vec<Fixup>,
    spans: Vec<Span>,
    output: Vec<u8>,
}

impl Assembler {
    fn new(origin: u16) -> Self {
        Self {
            origin,
            symbols: HashMap::new(),
            fixups: Vec::new(),
            spans: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Program, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            let start = self.output.len();
            let address = self.current_addr(line_num + 1)?;
            self.process_line(line, line_num + 1)?;
            self.spans.push(Span {
                line: line_num + 1,
                address,
                start,
                end: self.output.len(),
                source: line.trim().to_string(),
            });
        }

        // Pass 2: Resolve label references
        self.resolve_references()?;

        let listing = self
            .spans
            .iter()
            .map(|span| ListingLine {
                line: span.line,
                address: span.address,
                bytes: self.output[span.start..span.end].to_vec(),
                source: span.source.clone(),
            })
            .collect();

        Ok(Program {
            origin: self.origin,
            bytes: self.output.clone(),
            listing,
        })
    }

    fn current_addr(&self, line_num: usize) -> Result<u16, AssemblerError> {
        let addr = self.origin as usize + self.output.len();
        u16::try_from(addr).map_err(|_| AssemblerError::ProgramTooLarge { line: line_num })
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        // Label definition, optionally followed by an instruction
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", label),
                });
            }
            let addr = self.current_addr(line_num)?;
            if self.symbols.insert(label.to_string(), addr).is_some() {
                return Err(AssemblerError::DuplicateLabel {
                    line: line_num,
                    label: label.to_string(),
                });
            }
            line = line[colon_idx + 1..].trim();
            if line.is_empty() {
                return Ok(());
            }
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        let Some((first, operands)) = parts.split_first() else {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: "missing mnemonic".into(),
            });
        };
        let mnemonic = first.to_uppercase();

        match mnemonic.as_str() {
            "SET" => self.process_set(operands, line_num)?,

            "JP" => {
                let [bit, value] = operands else {
                    return Err(AssemblerError::SyntaxError {
                        line: line_num,
                        message: "JP expects a status bit and a value".into(),
                    });
                };
                let bit = self.parse_number(bit, line_num)?;
                let value = self.parse_number(value, line_num)?;
                let cond = Condition::new((bit & 0x07) as u8, value & 1 == 1);
                self.emit_instruction(Instruction::Jp(cond));
            }

            "JPZ" | "JPNZ" | "JPC" | "JPNC" => {
                self.expect_no_operands(&mnemonic, operands, line_num)?;
                let cond = match mnemonic.as_str() {
                    "JPZ" => Condition::ZERO,
                    "JPNZ" => Condition::NOT_ZERO,
                    "JPC" => Condition::CARRY,
                    _ => Condition::NOT_CARRY,
                };
                self.emit_instruction(Instruction::Jp(cond));
            }

            "LD" | "LDA" | "ST" | "STA" | "AND" | "ADD" | "NOT" | "CHG" => {
                let reg = self.parse_register_operand(&mnemonic, operands, line_num)?;
                let instr = match mnemonic.as_str() {
                    "LD" | "LDA" => Instruction::Lda(reg),
                    "ST" | "STA" => Instruction::Sta(reg),
                    "AND" => Instruction::And(reg),
                    "ADD" => Instruction::Add(reg),
                    "NOT" => Instruction::Not(reg),
                    _ => Instruction::Chg(reg),
                };
                self.emit_instruction(instr);
            }

            _ => {
                return Err(AssemblerError::UnknownMnemonic {
                    line: line_num,
                    mnemonic: first.to_string(),
                })
            }
        }

        Ok(())
    }

    /// `SET reg, value [, H|L]`
    fn process_set(&mut self, operands: &[&str], line_num: usize) -> Result<(), AssemblerError> {
        let (reg, value, suffix) = match operands {
            [reg, value] => (reg, value, None),
            [reg, value, suffix] => (reg, value, Some(suffix)),
            _ => {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "SET expects a register, a value and an optional H/L".into(),
                })
            }
        };

        let reg = self.parse_register(reg, line_num)?;
        let high = match suffix.map(|s| s.to_uppercase()) {
            None => false,
            Some(s) if s == "L" => false,
            Some(s) if s == "H" => true,
            Some(s) => {
                return Err(AssemblerError::InvalidSuffix { line: line_num, suffix: s });
            }
        };

        self.emit_instruction(Instruction::Set(reg));

        if value.starts_with(|c: char| c.is_ascii_digit()) {
            let value = self.parse_number(value, line_num)?;
            let byte = if high { (value >> 8) & 0xFF } else { value & 0xFF };
            self.output.push(byte as u8);
        } else {
            self.fixups.push(Fixup {
                index: self.output.len(),
                label: value.to_string(),
                high,
                line: line_num,
            });
            self.output.push(0); // Placeholder, patched in pass 2
        }
        Ok(())
    }

    fn parse_register_operand(
        &self,
        mnemonic: &str,
        operands: &[&str],
        line_num: usize,
    ) -> Result<Reg, AssemblerError> {
        match operands {
            [reg] => self.parse_register(reg, line_num),
            // Accumulator spelled out: ADD A, B
            [acc, reg]
                if matches!(mnemonic, "AND" | "ADD" | "CHG")
                    && Reg::parse(acc) == Some(Reg::A) =>
            {
                self.parse_register(reg, line_num)
            }
            _ => Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("{} expects one register", mnemonic),
            }),
        }
    }

    fn parse_register(&self, name: &str, line_num: usize) -> Result<Reg, AssemblerError> {
        Reg::parse(name).ok_or_else(|| AssemblerError::UnknownRegister {
            line: line_num,
            name: name.to_string(),
        })
    }

    fn expect_no_operands(
        &self,
        mnemonic: &str,
        operands: &[&str],
        line_num: usize,
    ) -> Result<(), AssemblerError> {
        if operands.is_empty() {
            Ok(())
        } else {
            Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("{} takes no operands", mnemonic),
            })
        }
    }

    fn parse_number(&self, token: &str, line_num: usize) -> Result<u32, AssemblerError> {
        let parsed = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            u32::from_str_radix(hex, 16)
        } else {
            token.parse::<u32>()
        };

        let value = parsed.map_err(|_| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number '{}'", token),
        })?;

        if value > 0xFFFF {
            return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
        }
        Ok(value)
    }

    fn emit_instruction(&mut self, instr: Instruction) {
        self.output.push(encode(&instr));
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for fixup in &self.fixups {
            let addr = self.symbols.get(&fixup.label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: fixup.line,
                label: fixup.label.clone(),
            })?;

            let [high, low] = addr.to_be_bytes();
            self.output[fixup.index] = if fixup.high { high } else { low };
        }
        Ok(())
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("unknown register on line {line}: {name}")]
    UnknownRegister { line: usize, name: String },

    #[error("invalid SET suffix on line {line}: {suffix} (expected H or L)")]
    InvalidSuffix { line: usize, suffix: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: u32 },

    #[error("program runs past the end of memory at line {line}")]
    ProgramTooLarge { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            SET A, 0x55
            LD B
            ST B
            AND B
            ADD B
            NOT B
            CHG B
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(
            result.bytes,
            vec![0x20, 0x55, 0x31, 0x32, 0x33, 0x34, 0x35, 0x37]
        );
    }

    #[test]
    fn test_mnemonic_aliases() {
        let short = assemble("LD C\nST D\n").unwrap();
        let long = assemble("lda c\nsta d\n").unwrap();
        assert_eq!(short.bytes, long.bytes);
        assert_eq!(assemble("ADD A, E").unwrap().bytes, assemble("ADD R14").unwrap().bytes);
    }

    #[test]
    fn test_assemble_jump_conditions() {
        let result = assemble("JP 0, 1\nJP 1, 0\nJPZ\nJPNC\nJP 7, 0\n").unwrap();
        assert_eq!(result.bytes, vec![0x86, 0x16, 0x86, 0x16, 0x76]);
    }

    #[test]
    fn test_set_high_low() {
        let result = assemble("SET JUMPH, 0x1234, H\nSET JUMPL, 0x1234, L\nSET A, 300\n").unwrap();
        assert_eq!(result.bytes, vec![0xD0, 0x12, 0xC0, 0x34, 0x20, 0x2C]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
            SET JUMPL, target, L
            SET JUMPH, target, H
            JPNZ
        target:
            NOT A
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.bytes[1], 5);
        assert_eq!(result.bytes[3], 0);
    }

    #[test]
    fn test_labels_follow_origin() {
        let result = assemble_at("SET JUMPH, here, H\nhere: SET JUMPL, here\n", 0x1230).unwrap();
        assert_eq!(result.bytes, vec![0xD0, 0x12, 0xC0, 0x32]);
    }

    #[test]
    fn test_listing() {
        let result = assemble("start:\n  SET A, 1 ; one\n  NOT A\n").unwrap();
        let text = result.listing_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0000: start:");
        assert_eq!(lines[1], "0000: 20 01     SET A, 1 ; one");
        assert_eq!(lines[2], "0002: 25        NOT A");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            assemble("FOO A"),
            Err(AssemblerError::UnknownMnemonic { line: 1, .. })
        ));
        assert!(matches!(
            assemble("NOP\n"),
            Err(AssemblerError::UnknownMnemonic { .. })
        ));
        assert!(matches!(
            assemble("\nNOT X"),
            Err(AssemblerError::UnknownRegister { line: 2, .. })
        ));
        assert!(matches!(
            assemble("SET A, 1, Q"),
            Err(AssemblerError::InvalidSuffix { .. })
        ));
        assert!(matches!(
            assemble("SET A, nowhere"),
            Err(AssemblerError::UndefinedLabel { .. })
        ));
        assert!(matches!(
            assemble("x:\nx:\n"),
            Err(AssemblerError::DuplicateLabel { line: 2, .. })
        ));
        assert!(matches!(
            assemble("SET A, 0x10000"),
            Err(AssemblerError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            assemble("NOT A, B"),
            Err(AssemblerError::SyntaxError { .. })
        ));
        assert!(matches!(
            assemble("JPZ 3"),
            Err(AssemblerError::SyntaxError { .. })
        ));
    }

    #[test]
    fn test_assemble_reference_program() {
        let result = assemble(crate::asm::REFERENCE_PROGRAM).unwrap();
        assert_eq!(&result.bytes[..4], &[0x70, 0x20, 0x60, 0x00]);
    }
}
