//! Memory bus request driven by the engine.

use serde::{Serialize, Deserialize};

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Read,
    Write,
}

/// The single in-flight bus request.
///
/// The engine registers a new request on a tick; the memory services it on
/// the following tick, storing `data_out` for writes or presenting the byte
/// at `address` for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusRequest {
    pub address: u16,
    pub direction: Direction,
    /// Only meaningful for writes.
    pub data_out: u8,
}

impl BusRequest {
    /// A read request.
    pub const fn read(address: u16) -> Self {
        Self { address, direction: Direction::Read, data_out: 0 }
    }

    /// A write request.
    pub const fn write(address: u16, data_out: u8) -> Self {
        Self { address, direction: Direction::Write, data_out }
    }

    pub fn is_write(&self) -> bool {
        self.direction == Direction::Write
    }
}

impl std::fmt::Display for BusRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            Direction::Read => write!(f, "RD {:04X}", self.address),
            Direction::Write => write!(f, "WR {:04X}<-{:02X}", self.address, self.data_out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        assert!(!BusRequest::read(0x1234).is_write());
        assert!(BusRequest::write(0x1234, 0x56).is_write());
        assert_eq!(BusRequest::default(), BusRequest::read(0));
    }

    #[test]
    fn test_display() {
        assert_eq!(BusRequest::read(0x00FF).to_string(), "RD 00FF");
        assert_eq!(BusRequest::write(0x2001, 0xAA).to_string(), "WR 2001<-AA");
    }
}
