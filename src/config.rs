//! Run configuration.
//!
//! Loaded from JSON; every field is optional:
//! ```json
//! {
//!   "origin": 0,
//!   "max_ticks": 10000,
//!   "stop_on_spin": true,
//!   "trace": false,
//!   "preload": [ { "address": 8192, "bytes": [170] } ]
//! }
//! ```

use crate::cpu::{Machine, MemoryError, Reg};
use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// Bytes copied into memory before the program runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preload {
    pub address: u16,
    pub bytes: Vec<u8>,
}

/// Settings for a program run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Load address of the program image.
    pub origin: u16,
    /// Tick budget for the run.
    pub max_ticks: u64,
    /// Stop as soon as an instruction jumps to itself.
    pub stop_on_spin: bool,
    /// Print each completed instruction.
    pub trace: bool,
    pub preload: Vec<Preload>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            origin: 0,
            max_ticks: 10_000,
            stop_on_spin: true,
            trace: false,
            preload: Vec::new(),
        }
    }
}

impl MachineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Build a machine with `program` at the origin and the preloads
    /// applied. Preloads are written after the program and may overlay it.
    pub fn build_machine(&self, program: &[u8]) -> Result<Machine, ConfigError> {
        let mut machine = Machine::new();
        machine.load_program(self.origin, program)?;
        for preload in &self.preload {
            machine.mem.load(preload.address, &preload.bytes)?;
        }
        self.seek_origin(&mut machine);
        Ok(machine)
    }

    /// Point PC at the origin. A reset pulse on its own returns to 0, so
    /// front ends call this again after resetting.
    pub fn seek_origin(&self, machine: &mut Machine) {
        let [high, low] = self.origin.to_be_bytes();
        machine.engine.regs.poke(Reg::Pch, high);
        machine.engine.regs.poke(Reg::Pcl, low);
    }
}

/// Errors that can occur while loading or applying a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let config = MachineConfig::from_json("{}").unwrap();
        assert_eq!(config, MachineConfig::default());

        let config = MachineConfig::from_json(r#"{"max_ticks": 5}"#).unwrap();
        assert_eq!(config.max_ticks, 5);
        assert!(config.stop_on_spin);
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            MachineConfig::from_json(r#"{"origin": "zero"}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_build_machine_applies_preloads() {
        let config = MachineConfig::from_json(
            r#"{"origin": 256, "preload": [{"address": 8192, "bytes": [170, 187]}]}"#,
        )
        .unwrap();

        let machine = config.build_machine(&[0x20, 0x55]).unwrap();
        assert_eq!(machine.mem.read(0x0100), 0x20);
        assert_eq!(machine.mem.read(0x2000), 0xAA);
        assert_eq!(machine.mem.read(0x2001), 0xBB);
        assert_eq!(machine.engine.regs.pc(), 0x0100);
        assert_eq!(machine.engine.regs.read(Reg::Pch), 0x01);
    }

    #[test]
    fn test_preload_past_end_fails() {
        let config = MachineConfig {
            preload: vec![Preload { address: 0xFFFF, bytes: vec![1, 2] }],
            ..MachineConfig::default()
        };
        assert!(matches!(config.build_machine(&[]), Err(ConfigError::Memory(_))));
    }
}
