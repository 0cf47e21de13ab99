//! TUI debugger.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register, phase and bus visualization
//! - Memory hex view following PC and POINTER
//! - Step/tick/run/breakpoint controls
//! - Disassembly view

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
