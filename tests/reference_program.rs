//! Runs the reference program through the public API.

use tiny8::asm::{assemble, to_hex_string, parse_hex, REFERENCE_PROGRAM};
use tiny8::cpu::{Phase, StopReason};
use tiny8::{Machine, MachineConfig, Reg};

fn reference_config() -> MachineConfig {
    MachineConfig::from_json(include_str!("../demos/reference.json")).unwrap()
}

#[test]
fn reference_program_final_state() {
    let program = assemble(REFERENCE_PROGRAM).unwrap();
    let config = reference_config();
    let mut machine = config.build_machine(&program.bytes).unwrap();

    let summary = machine.run_until_spin(config.max_ticks);
    assert_eq!(summary.reason, StopReason::Spinning);

    let snap = machine.snapshot();
    assert_eq!(snap.registers[Reg::A.index()], 0x55);
    assert_eq!(snap.registers[Reg::B.index()], 0xAA);
    assert_eq!(machine.mem.read(0x2001), 0xAA);
    assert!(!snap.zero);
    assert!(!snap.carry);
    assert_eq!(snap.phase, Phase::Fetch1);
}

#[test]
fn reference_program_tick_count() {
    // 8 SETs, LD and ST at 3 ticks; AND, ADD, NOT, JPZ, CHG at 2; then the
    // spinning JP
    let program = assemble(REFERENCE_PROGRAM).unwrap();
    let mut machine = reference_config().build_machine(&program.bytes).unwrap();

    let summary = machine.run_until_spin(1_000);
    assert_eq!(summary.instructions, 8 + 2 + 5 + 1);
    assert_eq!(summary.ticks, 8 * 3 + 2 * 3 + 5 * 2 + 2);
}

#[test]
fn hex_image_runs_like_source() {
    let program = assemble(REFERENCE_PROGRAM).unwrap();
    let image = parse_hex(&to_hex_string(&program.bytes)).unwrap();

    let mut machine = Machine::new();
    machine.load_program(0, &image).unwrap();
    machine.mem.write(0x2000, 0xAA);
    machine.run_until_spin(1_000);

    assert_eq!(machine.engine.regs.read(Reg::A), 0x55);
}

#[test]
fn reset_mid_run_restarts_from_zero() {
    let program = assemble(REFERENCE_PROGRAM).unwrap();
    let mut machine = reference_config().build_machine(&program.bytes).unwrap();

    machine.run(20);
    machine.set_reset(true);
    machine.run(3);
    assert_eq!(machine.engine.regs.pc(), 0);
    assert_eq!(machine.engine.phase(), Phase::Fetch1);
    assert_eq!(machine.engine.regs.read(Reg::PointerH), 0x20);

    machine.set_reset(false);
    let summary = machine.run_until_spin(1_000);
    assert_eq!(summary.reason, StopReason::Spinning);
    assert_eq!(machine.engine.regs.read(Reg::A), 0x55);
}
