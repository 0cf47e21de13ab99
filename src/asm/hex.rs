//! Hex image file format.
//!
//! A plain text byte dump:
//! - 16 bytes per line when written
//! - Each byte as two uppercase hex digits, separated by spaces
//! - Lines starting with `;` are comments (and `;` ends a line)
//! - Blank lines are ignored

use std::path::Path;
use thiserror::Error;

/// Bytes written per line.
pub const BYTES_PER_LINE: usize = 16;

/// Parse hex image text into bytes.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let mut bytes = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let data = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };

        for token in data.split_whitespace() {
            if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(HexError::ParseError {
                    line: line_num + 1,
                    message: format!("invalid byte '{}' (expected two hex digits)", token),
                });
            }
            let byte = u8::from_str_radix(token, 16).map_err(|_| HexError::ParseError {
                line: line_num + 1,
                message: format!("invalid byte '{}'", token),
            })?;
            bytes.push(byte);
        }
    }

    Ok(bytes)
}

/// Format bytes as hex image text.
pub fn to_hex_string(bytes: &[u8]) -> String {
    let mut out = String::new();
    for chunk in bytes.chunks(BYTES_PER_LINE) {
        let line: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

/// Load a hex image from disk.
pub fn load_hex<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, HexError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| HexError::IoError(e.to_string()))?;
    parse_hex(&text)
}

/// Save a hex image to disk.
pub fn save_hex<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), HexError> {
    std::fs::write(path.as_ref(), to_hex_string(bytes))
        .map_err(|e| HexError::IoError(e.to_string()))
}

/// Errors that can occur during hex image operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}
