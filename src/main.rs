//! tiny8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `tiny8-emu run <program>` - Run an ASM or hex image file
//! - `tiny8-emu debug <program>` - Interactive debugger
//! - `tiny8-emu asm <source>` - Assemble to a hex image
//! - `tiny8-emu disasm <hex>` - Disassemble a hex image
//! - `tiny8-emu test` - Run the built-in self-test

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiny8::{AssemblerError, MachineConfig};

#[derive(Parser)]
#[command(name = "tiny8-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A cycle-level emulator of a minimal 8-instruction, 8-bit processor")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it spins on a self-jump
    Run {
        /// Path to the ASM or hex file to execute
        program: String,
        /// Maximum number of clock ticks (default: 10000)
        #[arg(short, long)]
        max_ticks: Option<u64>,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// JSON run configuration
        #[arg(short, long)]
        config: Option<String>,
        /// Load address (decimal or 0x hex)
        #[arg(long, value_parser = parse_address)]
        origin: Option<u16>,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the ASM or hex file to debug
        program: String,
        /// JSON run configuration
        #[arg(short, long)]
        config: Option<String>,
        /// Load address (decimal or 0x hex)
        #[arg(long, value_parser = parse_address)]
        origin: Option<u16>,
    },
    /// Assemble source to a hex image
    Asm {
        /// Path to the source file
        source: String,
        /// Output hex file
        #[arg(short, long)]
        output: Option<String>,
        /// Print the assembly listing
        #[arg(short, long)]
        listing: bool,
    },
    /// Disassemble a hex image to readable text
    Disasm {
        /// Path to the hex file
        hex: String,
        /// Load address (decimal or 0x hex)
        #[arg(long, value_parser = parse_address, default_value = "0")]
        origin: u16,
    },
    /// Run the built-in self-test
    Test,
}

/// Errors while reading a program from disk.
#[derive(Debug, Error)]
enum LoadError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblerError),

    #[error("failed to load hex image: {0}")]
    Hex(#[from] tiny8::asm::HexError),

    #[error("no instructions to execute")]
    Empty,

    #[error("refusing to overwrite the source file {0}")]
    WouldOverwrite(String),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { program, max_ticks, trace, config, origin, json }) => {
            run_program(&program, max_ticks, trace, config, origin, json);
        }
        Some(Commands::Debug { program, config, origin }) => {
            debug_program(&program, config, origin);
        }
        Some(Commands::Asm { source, output, listing }) => {
            assemble_file(&source, output, listing);
        }
        Some(Commands::Disasm { hex, origin }) => {
            disassemble_file(&hex, origin);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("tiny8 Emulator v0.1.0");
            println!("A minimal 8-bit processor emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("⚠️  Logger unavailable: {}", e);
    }
}

fn parse_address(text: &str) -> Result<u16, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|_| format!("'{}' is not a 16-bit address", text))
}

/// Load program bytes from an `.asm` source or a hex image.
fn load_program(path: &str, origin: u16) -> Result<Vec<u8>, LoadError> {
    let bytes = if path.ends_with(".asm") {
        let source = std::fs::read_to_string(path)?;
        let program = tiny8::asm::assemble_at(&source, origin)?;
        println!("📝 Assembled {} bytes", program.bytes.len());
        program.bytes
    } else {
        let bytes = tiny8::load_hex(path)?;
        println!("📂 Loaded {} bytes", bytes.len());
        bytes
    };

    if bytes.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(bytes)
}

/// Read the JSON config if given, then apply the `--origin` override.
fn load_config(config_path: Option<String>, origin: Option<u16>) -> MachineConfig {
    let mut config = match config_path {
        Some(config_path) => match MachineConfig::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => MachineConfig::default(),
    };
    if let Some(origin) = origin {
        config.origin = origin;
    }
    config
}

fn run_program(
    path: &str,
    max_ticks: Option<u64>,
    trace: bool,
    config_path: Option<String>,
    origin: Option<u16>,
    json: bool,
) {
    use tiny8::asm::disasm::disassemble_instruction;
    use tiny8::Reg;

    let mut config = load_config(config_path, origin);
    if let Some(max_ticks) = max_ticks {
        config.max_ticks = max_ticks;
    }
    config.trace |= trace;

    println!("🔧 Running: {}", path);

    let program = match load_program(path, config.origin) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let mut machine = match config.build_machine(&program) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!("━━━ Execution ━━━");

    if config.trace {
        while machine.engine.ticks < config.max_ticks {
            let pc = machine.engine.regs.pc();
            let opcode = machine.mem.read(pc);
            let immediate = machine.mem.read(pc.wrapping_add(1));

            if machine.step_until(config.max_ticks).is_none() {
                continue;
            }

            let regs = &machine.engine.regs;
            println!(
                "{:04X}: {:<18} A={:02X} B={:02X} C={:02X} D={:02X} Z={} C={}",
                pc,
                disassemble_instruction(opcode, Some(immediate)),
                regs.read(Reg::A),
                regs.read(Reg::B),
                regs.read(Reg::C),
                regs.read(Reg::D),
                regs.zero() as u8,
                regs.carry() as u8,
            );

            if config.stop_on_spin && machine.is_spinning() {
                break;
            }
        }
    } else if config.stop_on_spin {
        machine.run_until_spin(config.max_ticks);
    } else {
        machine.run(config.max_ticks);
    }

    let snapshot = machine.snapshot();

    println!();
    println!("━━━ Result ━━━");

    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Ticks: {}", snapshot.ticks);
    println!("Instructions: {}", snapshot.retired);
    println!("Phase: {:?}", snapshot.phase);
    println!("PC: {:04X}   POINTER: {:04X}", snapshot.pc, snapshot.pointer);
    println!("Zero: {}   Carry: {}", snapshot.zero as u8, snapshot.carry as u8);
    for row in Reg::ALL.chunks(4) {
        let cells: Vec<String> = row
            .iter()
            .map(|reg| format!("{:>8}={:02X}", reg.name(), snapshot.registers[reg.index()]))
            .collect();
        println!("{}", cells.join(" "));
    }

    if machine.is_spinning() {
        println!();
        println!("✓ Program finished (spinning at {:04X})", snapshot.pc);
    } else if snapshot.ticks >= config.max_ticks {
        println!();
        println!("⚠️  Reached max ticks limit ({}). Use --max-ticks to increase.", config.max_ticks);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, config_path: Option<String>, origin: Option<u16>) {
    use tiny8::tui::run_debugger;

    let config = load_config(config_path, origin);

    println!("🔍 Loading: {}", path);

    let program = match load_program(path, config.origin) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = run_debugger(program, config) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _config_path: Option<String>, _origin: Option<u16>) {
    eprintln!("❌ Built without the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>, listing: bool) {
    let out_path = match hex_output_path(source_path, output) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    println!("📝 Assembling: {} → {}", source_path, out_path.display());

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let program = match tiny8::assemble(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    if listing {
        println!("-------------------------------------");
        print!("{}", program.listing_text());
        println!("-------------------------------------");
    }

    println!("✓ Assembled {} bytes", program.bytes.len());

    if let Err(e) = tiny8::save_hex(&out_path, &program.bytes) {
        eprintln!("❌ Failed to save hex image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path.display());
}

/// Where `asm` writes its image: `output`, or the source path with a
/// `.hex` extension. Never the source itself.
fn hex_output_path(source_path: &str, output: Option<String>) -> Result<PathBuf, LoadError> {
    let source = Path::new(source_path);
    let out_path = match output {
        Some(output) => PathBuf::from(output),
        None => source.with_extension("hex"),
    };
    if out_path == source {
        return Err(LoadError::WouldOverwrite(source_path.to_string()));
    }
    Ok(out_path)
}

fn disassemble_file(hex_path: &str, origin: u16) {
    println!("📖 Disassembling: {}", hex_path);
    println!();

    let bytes = match tiny8::load_hex(hex_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Failed to load hex image: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", tiny8::disassemble(&bytes, origin));
}

fn run_self_test() {
    use tiny8::asm::REFERENCE_PROGRAM;
    use tiny8::cpu::StopReason;
    use tiny8::{assemble, Machine, Reg};

    println!("━━━ tiny8 Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool, detail: String| {
        print!("{}... ", name);
        if ok {
            println!("✓");
            passed += 1;
        } else {
            println!("✗ ({})", detail);
            failed += 1;
        }
    };

    let program = match assemble(REFERENCE_PROGRAM) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ Reference program failed to assemble: {}", e);
            std::process::exit(1);
        }
    };

    let mut machine = Machine::new();
    if let Err(e) = machine.load_program(0, &program.bytes) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }
    machine.mem.write(0x2000, 0xAA);
    let summary = machine.run_until_spin(1_000);

    let regs = &machine.engine.regs;
    let a = regs.read(Reg::A);
    let b = regs.read(Reg::B);
    let stored = machine.mem.read(0x2001);

    check(
        "Reference program terminates",
        summary.reason == StopReason::Spinning,
        format!("{:?} after {} ticks", summary.reason, summary.ticks),
    );
    check("Accumulator = 0x55", a == 0x55, format!("got {:02X}", a));
    check("B = 0xAA", b == 0xAA, format!("got {:02X}", b));
    check("mem[0x2001] = 0xAA", stored == 0xAA, format!("got {:02X}", stored));
    check("Zero clear", !regs.zero(), "Zero set".into());
    check("Carry clear", !regs.carry(), "Carry set".into());

    // Reset returns to the first fetch and keeps POINTERH
    machine.reset();
    let snap = machine.snapshot();
    check(
        "Reset returns to Fetch1 at PC 0",
        snap.pc == 0 && snap.phase == tiny8::Phase::Fetch1,
        format!("{:?} at {:04X}", snap.phase, snap.pc),
    );
    check(
        "Reset keeps POINTERH",
        snap.registers[Reg::PointerH.index()] == 0x20,
        format!("got {:02X}", snap.registers[Reg::PointerH.index()]),
    );

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_output_path_replaces_extension() {
        assert_eq!(hex_output_path("prog.asm", None).unwrap(), PathBuf::from("prog.hex"));
        assert_eq!(hex_output_path("dir/prog.s", None).unwrap(), PathBuf::from("dir/prog.hex"));
        assert_eq!(hex_output_path("prog", None).unwrap(), PathBuf::from("prog.hex"));
        assert_eq!(
            hex_output_path("prog.asm", Some("out.txt".into())).unwrap(),
            PathBuf::from("out.txt")
        );
    }

    #[test]
    fn test_hex_output_path_never_overwrites_source() {
        assert!(matches!(
            hex_output_path("prog.hex", None),
            Err(LoadError::WouldOverwrite(_))
        ));
        assert!(matches!(
            hex_output_path("prog.asm", Some("prog.asm".into())),
            Err(LoadError::WouldOverwrite(_))
        ));
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x100"), Ok(0x100));
        assert_eq!(parse_address("256"), Ok(256));
        assert!(parse_address("0x10000").is_err());
    }
}
