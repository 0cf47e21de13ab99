//! Flat 64K byte memory backing the bus.

use crate::cpu::bus::BusRequest;
use serde::{Serialize, Deserialize};

/// Number of addressable bytes.
pub const MEMORY_SIZE: usize = 1 << 16;

/// 64K bytes, zero until written.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.cells[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.cells[addr as usize] = value;
    }

    /// Service one bus request and return the byte driven onto `data_in`.
    ///
    /// Writes are stored first, so the returned byte is the value at
    /// `address` after the request completes.
    pub fn service(&mut self, request: &BusRequest) -> u8 {
        if request.is_write() {
            log::debug!("mem[{:04X}] <- {:02X}", request.address, request.data_out);
            self.write(request.address, request.data_out);
        }
        self.read(request.address)
    }

    /// Copy a byte image into memory starting at `origin`.
    pub fn load(&mut self, origin: u16, image: &[u8]) -> Result<(), MemoryError> {
        let start = origin as usize;
        if start + image.len() > MEMORY_SIZE {
            return Err(MemoryError::ImageTooLarge {
                origin,
                size: image.len(),
                available: MEMORY_SIZE - start,
            });
        }

        self.cells[start..start + image.len()].copy_from_slice(image);
        log::debug!("loaded {} bytes at {:04X}", image.len(), origin);
        Ok(())
    }

    /// A window of memory, clipped at the top of the address space.
    pub fn slice(&self, start: u16, count: usize) -> &[u8] {
        let start = start as usize;
        let end = (start + count).min(MEMORY_SIZE);
        &self.cells[start..end]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur when loading memory images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The image runs past the end of the address space.
    ImageTooLarge { origin: u16, size: usize, available: usize },
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::ImageTooLarge { origin, size, available } => {
                write!(
                    f,
                    "image of {} bytes at {:04X} exceeds available space {}",
                    size, origin, available
                )
            }
        }
    }
}

impl std::error::Error for MemoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritten_reads_zero() {
        let mem = Memory::new();
        assert_eq!(mem.read(0x0000), 0);
        assert_eq!(mem.read(0xFFFF), 0);
    }

    #[test]
    fn test_service_read_and_write() {
        let mut mem = Memory::new();
        mem.write(0x2000, 0xAA);

        assert_eq!(mem.service(&BusRequest::read(0x2000)), 0xAA);
        assert_eq!(mem.service(&BusRequest::write(0x2001, 0x55)), 0x55);
        assert_eq!(mem.read(0x2001), 0x55);
    }

    #[test]
    fn test_load_image() {
        let mut mem = Memory::new();
        mem.load(0x0100, &[1, 2, 3]).unwrap();

        assert_eq!(mem.slice(0x0100, 3), &[1, 2, 3]);
    }

    #[test]
    fn test_load_at_top_of_memory() {
        let mut mem = Memory::new();
        assert!(mem.load(0xFFFE, &[1, 2]).is_ok());
        assert_eq!(
            mem.load(0xFFFF, &[1, 2]),
            Err(MemoryError::ImageTooLarge { origin: 0xFFFF, size: 2, available: 1 })
        );
    }

    #[test]
    fn test_slice_clipped() {
        let mem = Memory::new();
        assert_eq!(mem.slice(0xFFF0, 64).len(), 16);
    }
}
