//! Debugger application state and logic.

use crate::asm::disasm::disassemble_lines;
use crate::config::MachineConfig;
use crate::cpu::{Machine, Reg};
use std::collections::HashSet;

/// Bytes shown per memory row.
pub const MEMORY_ROW: usize = 8;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Original program for reference.
    pub program: Vec<u8>,
    /// Origin, preloads and tick settings.
    pub config: MachineConfig,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// First memory row shown.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program, stopped at the
    /// configured origin.
    pub fn new(program: Vec<u8>, config: MachineConfig) -> Self {
        let mut app = Self {
            machine: Machine::new(),
            program,
            config,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: String::new(),
            mem_scroll: 0,
        };
        app.reset();
        app.status = "Ready. Press 's' to step, 't' to tick, 'r' to run, 'q' to quit.".into();
        app
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.machine.engine.regs.pc();
        match self.machine.step() {
            Some(instr) => {
                self.status = format!("PC={:04X}: {:?}", pc, instr);
                if self.machine.is_spinning() {
                    self.status.push_str("  (spinning)");
                    self.running = false;
                }
            }
            None => {
                self.status = "Reset asserted".into();
                self.running = false;
            }
        }
    }

    /// Advance a single clock tick.
    pub fn tick_once(&mut self) {
        let phase = self.machine.tick();
        self.status = format!("Tick {} -> {:?}", self.machine.engine.ticks, phase);
    }

    /// Run until breakpoint or spin.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        self.step();

        // Check for breakpoint
        let pc = self.machine.engine.regs.pc();
        if self.running && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:04X}", pc);
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.engine.regs.pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:04X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:04X}", pc);
        }
    }

    /// Reload the program and preloads, pulse reset and resume at the
    /// origin. POINTERH survives the pulse as it does in the core.
    pub fn reset(&mut self) {
        self.running = false;
        let mut machine = match self.config.build_machine(&self.program) {
            Ok(machine) => machine,
            Err(e) => {
                self.status = format!("Error: {}", e);
                return;
            }
        };
        let pointer_high = self.machine.engine.regs.read(Reg::PointerH);
        machine.engine.regs.poke(Reg::PointerH, pointer_high);
        machine.reset();
        self.config.seek_origin(&mut machine);
        self.machine = machine;
        self.status = "Reset. Ready.".into();
    }

    /// Scroll the memory view by `rows`, clamped to the address space.
    pub fn scroll_memory(&mut self, rows: isize) {
        let max = crate::cpu::memory::MEMORY_SIZE / MEMORY_ROW - 1;
        self.mem_scroll = self.mem_scroll.saturating_add_signed(rows).min(max);
    }

    /// Jump the memory view to the row containing POINTER.
    pub fn follow_pointer(&mut self) {
        self.mem_scroll = self.machine.engine.regs.pointer() as usize / MEMORY_ROW;
    }

    /// Disassembly starting a few bytes before PC.
    ///
    /// Returns (address, text, is_current). Decoding starts at the program
    /// origin when PC is inside the program so SET immediates stay aligned.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u16, String, bool)> {
        let pc = self.machine.engine.regs.pc();
        let origin = self.config.origin;
        let in_program = pc >= origin && ((pc - origin) as usize) < self.program.len();
        let start = if in_program { origin } else { pc };

        let window = self.machine.mem.slice(start, (pc - start) as usize + lines * 2);
        let decoded = disassemble_lines(window, start);
        let current = decoded.iter().position(|(addr, _, _)| *addr == pc).unwrap_or(0);
        let first = current.saturating_sub(lines / 2);

        decoded
            .into_iter()
            .skip(first)
            .take(lines)
            .map(|(addr, _, text)| (addr, text, addr == pc))
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>, config: MachineConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program, config);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('t') => {
                            app.running = false;
                            app.tick_once();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Char('m') => app.follow_pointer(),
                        KeyCode::Up => app.scroll_memory(-1),
                        KeyCode::Down => app.scroll_memory(1),
                        KeyCode::PageUp => app.scroll_memory(-16),
                        KeyCode::PageDown => app.scroll_memory(16),
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{assemble, assemble_at, REFERENCE_PROGRAM};
    use crate::config::Preload;

    fn reference_app() -> DebuggerApp {
        let program = assemble(REFERENCE_PROGRAM).unwrap();
        let config = MachineConfig {
            preload: vec![Preload { address: 0x2000, bytes: vec![0xAA] }],
            ..MachineConfig::default()
        };
        DebuggerApp::new(program.bytes, config)
    }

    #[test]
    fn test_run_stops_on_spin() {
        let mut app = reference_app();
        app.run();
        for _ in 0..100 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.machine.engine.regs.read(Reg::A), 0x55);
    }

    #[test]
    fn test_breakpoint_pauses() {
        let mut app = reference_app();
        app.breakpoints.insert(0x0004);
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.machine.engine.regs.pc(), 0x0004);
    }

    #[test]
    fn test_disassembly_marks_pc() {
        let mut app = reference_app();
        app.step();
        let lines = app.get_disassembly(6);
        let current: Vec<_> = lines.iter().filter(|(_, _, cur)| *cur).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].0, 0x0002);
        assert_eq!(current[0].1, "SET POINTERL, 0x00");
    }

    #[test]
    fn test_starts_at_origin() {
        let program = assemble_at("SET A, 0x42\nNOT A\n", 0x100).unwrap();
        let config = MachineConfig { origin: 0x100, ..MachineConfig::default() };
        let mut app = DebuggerApp::new(program.bytes, config);
        assert_eq!(app.machine.engine.regs.pc(), 0x100);

        app.step();
        assert_eq!(app.machine.engine.regs.read(Reg::A), 0x42);
        assert_eq!(app.get_disassembly(4)[0].1, "SET A, 0x42");
    }

    #[test]
    fn test_reset_returns_to_origin_and_keeps_preloads() {
        let program = assemble_at("SET POINTERH, 0x20\nLD B\n", 0x100).unwrap();
        let config = MachineConfig {
            origin: 0x100,
            preload: vec![Preload { address: 0x2000, bytes: vec![0x99] }],
            ..MachineConfig::default()
        };
        let mut app = DebuggerApp::new(program.bytes, config);
        app.step();
        app.step();
        assert_eq!(app.machine.engine.regs.read(Reg::B), 0x99);

        app.machine.mem.write(0x2000, 0);
        app.reset();
        let regs = &app.machine.engine.regs;
        assert_eq!(regs.pc(), 0x100);
        assert_eq!(regs.read(Reg::B), 0);
        assert_eq!(regs.read(Reg::PointerH), 0x20);
        assert_eq!(app.machine.mem.read(0x2000), 0x99);
    }
}
