//! Instruction-level tests for the Z80 core.
//!
//! Each test runs a short program against a flat 64 KiB RAM harness and
//! checks registers, memory, flags, and cycle counts.

use cpu_z80::{Z80, CF, HF, NF, PF, SF, ZF};
use emu_core::{Bus, Cpu, IoBus};

/// Flat RAM with recording I/O ports.
struct TestBus {
    mem: Vec<u8>,
    io: [u8; 256],
    io_writes: Vec<(u8, u8)>,
}

impl TestBus {
    fn new(program: &[u8]) -> Self {
        let mut mem = vec![0u8; 0x10000];
        mem[..program.len()].copy_from_slice(program);
        Self {
            mem,
            io: [0xFF; 256],
            io_writes: Vec::new(),
        }
    }
}

impl Bus for TestBus {
    fn read(&mut self, address: u16) -> u8 {
        self.mem[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.mem[address as usize] = value;
    }
}

impl IoBus for TestBus {
    fn read_io(&mut self, port: u8) -> u8 {
        self.io[port as usize]
    }

    fn write_io(&mut self, port: u8, value: u8) {
        self.io_writes.push((port, value));
    }
}

fn run(program: &[u8], steps: usize) -> (Z80, TestBus, u32) {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(program);
    let mut cycles = 0;
    for _ in 0..steps {
        cycles += cpu.step_instruction(&mut bus).expect("instruction decodes");
    }
    (cpu, bus, cycles)
}

#[test]
fn add_immediate_registers() {
    // LD A,5 ; LD B,3 ; ADD A,B
    let (cpu, _, cycles) = run(&[0x3E, 0x05, 0x06, 0x03, 0x80], 3);
    assert_eq!(cpu.regs.a, 8);
    assert_eq!(cpu.regs.f & (HF | CF | ZF | SF | PF), 0);
    assert_eq!(cycles, 7 + 7 + 4);
}

#[test]
fn add_carry_and_zero() {
    // LD A,0xFF ; ADD A,1
    let (cpu, _, _) = run(&[0x3E, 0xFF, 0xC6, 0x01], 2);
    assert_eq!(cpu.regs.a, 0);
    assert_ne!(cpu.regs.f & CF, 0);
    assert_ne!(cpu.regs.f & ZF, 0);
    assert_ne!(cpu.regs.f & HF, 0);
}

#[test]
fn sub_sets_subtract_flag() {
    // LD A,5 ; SUB 7
    let (cpu, _, _) = run(&[0x3E, 0x05, 0xD6, 0x07], 2);
    assert_eq!(cpu.regs.a, 0xFE);
    assert_ne!(cpu.regs.f & NF, 0);
    assert_ne!(cpu.regs.f & CF, 0);
    assert_ne!(cpu.regs.f & SF, 0);
}

#[test]
fn push_pop_round_trip() {
    // LD SP,0x8000 ; LD BC,0x1234 ; PUSH BC ; POP DE
    let program = [0x31, 0x00, 0x80, 0x01, 0x34, 0x12, 0xC5, 0xD1];
    let (cpu, mut bus, _) = run(&program, 4);
    assert_eq!(cpu.regs.de(), 0x1234);
    assert_eq!(cpu.regs.sp, 0x8000);
    // Little-endian on the stack.
    assert_eq!(bus.read(0x7FFE), 0x34);
    assert_eq!(bus.read(0x7FFF), 0x12);
}

#[test]
fn djnz_boundary() {
    // LD B,2 ; DJNZ -2 (branches once, then falls through)
    let program = [0x06, 0x02, 0x10, 0xFE];
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&program);

    cpu.step_instruction(&mut bus).unwrap();
    let taken = cpu.step_instruction(&mut bus).unwrap();
    assert_eq!(cpu.regs.pc, 0x0002, "B=2 branches");
    assert_eq!(taken, 13);

    let skipped = cpu.step_instruction(&mut bus).unwrap();
    assert_eq!(cpu.regs.pc, 0x0004, "B=1 falls through");
    assert_eq!(skipped, 8);
    assert_eq!(cpu.regs.b, 0);
}

#[test]
fn conditional_jump_cycle_penalty() {
    // XOR A ; JP Z,0x0010 (taken) has no penalty for JP, but JR does.
    // XOR A ; JR Z,+2
    let (_, _, cycles) = run(&[0xAF, 0x28, 0x02], 2);
    assert_eq!(cycles, 4 + 12, "taken JR costs 12");

    // LD A,1 ; OR A ; JR Z,+2 (not taken)
    let (_, _, cycles) = run(&[0x3E, 0x01, 0xB7, 0x28, 0x02], 3);
    assert_eq!(cycles, 7 + 4 + 7, "skipped JR costs 7");
}

#[test]
fn call_and_ret() {
    // LD SP,0x8000 ; CALL 0x0010 ; (filler) ... at 0x0010: RET
    let mut program = vec![0x31, 0x00, 0x80, 0xCD, 0x10, 0x00];
    program.resize(0x10, 0x00);
    program.push(0xC9); // RET at 0x0010
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&program);

    cpu.step_instruction(&mut bus).unwrap();
    cpu.step_instruction(&mut bus).unwrap();
    assert_eq!(cpu.regs.pc, 0x0010);
    assert_eq!(cpu.regs.sp, 0x7FFE);

    cpu.step_instruction(&mut bus).unwrap();
    assert_eq!(cpu.regs.pc, 0x0006, "RET returns past the CALL");
    assert_eq!(cpu.regs.sp, 0x8000);
}

#[test]
fn rst_pushes_and_vectors() {
    // LD SP,0x8000 ; RST 10
    let (cpu, mut bus, _) = run(&[0x31, 0x00, 0x80, 0xD7], 2);
    assert_eq!(cpu.regs.pc, 0x0010);
    assert_eq!(bus.read(0x7FFE), 0x04);
    assert_eq!(bus.read(0x7FFF), 0x00);
}

#[test]
fn ldir_copies_block() {
    // LD HL,0x1000 ; LD DE,0x2000 ; LD BC,3 ; LDIR
    let program = [
        0x21, 0x00, 0x10, 0x11, 0x00, 0x20, 0x01, 0x03, 0x00, 0xED, 0xB0,
    ];
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&program);
    bus.write(0x1000, 0xAA);
    bus.write(0x1001, 0xBB);
    bus.write(0x1002, 0xCC);

    for _ in 0..3 {
        cpu.step_instruction(&mut bus).unwrap();
    }
    // LDIR repeats by backing up PC; step until BC reaches zero.
    while cpu.regs.bc() != 0 {
        cpu.step_instruction(&mut bus).unwrap();
    }

    assert_eq!(bus.read(0x2000), 0xAA);
    assert_eq!(bus.read(0x2001), 0xBB);
    assert_eq!(bus.read(0x2002), 0xCC);
    assert_eq!(cpu.regs.hl(), 0x1003);
    assert_eq!(cpu.regs.de(), 0x2003);
    assert_eq!(cpu.regs.f & PF, 0, "P/V clear when BC reaches 0");
    assert_eq!(cpu.regs.pc, 0x000B);
}

#[test]
fn cpir_finds_byte() {
    // LD A,0xBB ; LD HL,0x1000 ; LD BC,0x0010 ; CPIR
    let program = [0x3E, 0xBB, 0x21, 0x00, 0x10, 0x01, 0x10, 0x00, 0xED, 0xB1];
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&program);
    bus.write(0x1002, 0xBB);

    for _ in 0..3 {
        cpu.step_instruction(&mut bus).unwrap();
    }
    loop {
        cpu.step_instruction(&mut bus).unwrap();
        if cpu.regs.pc == 0x000A {
            break;
        }
    }

    assert_eq!(cpu.regs.hl(), 0x1003, "HL stops just past the match");
    assert_ne!(cpu.regs.f & ZF, 0, "match sets Z");
}

#[test]
fn halt_reexecutes_until_interrupt() {
    // EI ; HALT
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0xFB, 0x76]);

    cpu.step_instruction(&mut bus).unwrap();
    for _ in 0..5 {
        cpu.step_instruction(&mut bus).unwrap();
        assert_eq!(cpu.regs.pc, 0x0001, "PC parked on the HALT");
        assert!(cpu.is_halted());
    }

    cpu.regs.sp = 0x8000;
    cpu.interrupt(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0038);
    assert!(!cpu.regs.iff1);
    // The pushed return address is past the HALT.
    assert_eq!(bus.read(0x7FFE), 0x02);
}

#[test]
fn ei_suppresses_irq_for_one_instruction() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0xFB, 0x00]);

    cpu.step_instruction(&mut bus).unwrap();
    assert!(cpu.regs.iff1);
    assert!(cpu.irq_suppressed(), "IRQ held off right after EI");

    cpu.step_instruction(&mut bus).unwrap();
    assert!(!cpu.irq_suppressed(), "suppression lasts one instruction");
}

#[test]
fn nmi_state_changes() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0x00]);
    cpu.regs.sp = 0x9000;
    cpu.regs.pc = 0x1234;
    cpu.regs.iff1 = true;

    cpu.nmi(&mut bus);

    assert_eq!(cpu.regs.pc, 0x0066);
    assert!(cpu.regs.iff2, "IFF2 saved IFF1");
    assert!(!cpu.regs.iff1);
    assert_eq!(cpu.regs.sp, 0x8FFE);
    assert_eq!(bus.read(0x8FFE), 0x34);
    assert_eq!(bus.read(0x8FFF), 0x12);
}

#[test]
fn retn_restores_iff1() {
    // At 0x66: RETN.
    let mut program = vec![0x00; 0x70];
    program[0x66] = 0xED;
    program[0x67] = 0x45;
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&program);
    cpu.regs.sp = 0x9000;
    cpu.regs.pc = 0x1234;
    cpu.regs.iff1 = true;

    cpu.nmi(&mut bus);
    cpu.step_instruction(&mut bus).unwrap();

    assert_eq!(cpu.regs.pc, 0x1234);
    assert!(cpu.regs.iff1, "RETN restored IFF1 from IFF2");
}

#[test]
fn irq_vectors_to_0038() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0x00]);
    cpu.regs.sp = 0x9000;
    cpu.regs.pc = 0x5678;
    cpu.regs.iff1 = true;

    cpu.interrupt(&mut bus);

    assert_eq!(cpu.regs.pc, 0x0038);
    assert!(!cpu.regs.iff1);
    assert_eq!(bus.read(0x8FFE), 0x78);
    assert_eq!(bus.read(0x8FFF), 0x56);
}

#[test]
fn ix_displacement_store_and_load() {
    // LD IX,0x2000 ; LD (IX+5),0x77 ; LD A,(IX+5)
    let program = [0xDD, 0x21, 0x00, 0x20, 0xDD, 0x36, 0x05, 0x77, 0xDD, 0x7E, 0x05];
    let (cpu, mut bus, _) = run(&program, 3);
    assert_eq!(bus.read(0x2005), 0x77);
    assert_eq!(cpu.regs.a, 0x77);
}

#[test]
fn negative_ix_displacement() {
    // LD IX,0x2000 ; LD (IX-1),A
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0xDD, 0x21, 0x00, 0x20, 0xDD, 0x77, 0xFF]);
    cpu.regs.a = 0x5A;
    cpu.step_instruction(&mut bus).unwrap();
    cpu.step_instruction(&mut bus).unwrap();
    assert_eq!(bus.read(0x1FFF), 0x5A);
}

#[test]
fn ex_sp_hl_swaps_through_memory() {
    // LD SP,0x8000 ; LD HL,0x1234 ; PUSH HL ; LD HL,0x5678 ; EX (SP),HL
    let program = [0x31, 0x00, 0x80, 0x21, 0x34, 0x12, 0xE5, 0x21, 0x78, 0x56, 0xE3];
    let (cpu, mut bus, _) = run(&program, 5);
    assert_eq!(cpu.regs.hl(), 0x1234);
    assert_eq!(bus.read(0x7FFE), 0x78);
    assert_eq!(bus.read(0x7FFF), 0x56);
}

#[test]
fn exchange_and_shadow_registers() {
    // LD BC,0x1111 ; EXX ; LD BC,0x2222 ; EXX
    let program = [0x01, 0x11, 0x11, 0xD9, 0x01, 0x22, 0x22, 0xD9];
    let (cpu, _, _) = run(&program, 4);
    assert_eq!(cpu.regs.bc(), 0x1111);
    assert_eq!(cpu.regs.b_prime, 0x22);
}

#[test]
fn in_out_ports() {
    // LD A,0x12 ; OUT (0xF1),A ; IN A,(0xF2)
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0x3E, 0x12, 0xD3, 0xF1, 0xDB, 0xF2]);
    bus.io[0xF2] = 0x99;
    for _ in 0..3 {
        cpu.step_instruction(&mut bus).unwrap();
    }
    assert_eq!(bus.io_writes, vec![(0xF1, 0x12)]);
    assert_eq!(cpu.regs.a, 0x99);
}

#[test]
fn in_r_c_sets_flags() {
    // LD BC,0x00F0 ; IN A,(C) with port F0 returning 0x80.
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0x01, 0xF0, 0x00, 0xED, 0x78]);
    bus.io[0xF0] = 0x80;
    cpu.step_instruction(&mut bus).unwrap();
    cpu.step_instruction(&mut bus).unwrap();
    assert_eq!(cpu.regs.a, 0x80);
    assert_ne!(cpu.regs.f & SF, 0);
    assert_eq!(cpu.regs.f & ZF, 0);
}

#[test]
fn bit_test_and_set() {
    // LD A,0x00 ; BIT 3,A ; SET 3,A ; BIT 3,A
    let program = [0x3E, 0x00, 0xCB, 0x5F, 0xCB, 0xDF, 0xCB, 0x5F];
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&program);
    cpu.step_instruction(&mut bus).unwrap();
    cpu.step_instruction(&mut bus).unwrap();
    assert_ne!(cpu.regs.f & ZF, 0, "bit clear reads as Z");
    cpu.step_instruction(&mut bus).unwrap();
    assert_eq!(cpu.regs.a, 0x08);
    cpu.step_instruction(&mut bus).unwrap();
    assert_eq!(cpu.regs.f & ZF, 0, "bit set clears Z");
}

#[test]
fn rotate_accumulator() {
    // LD A,0x81 ; RLCA
    let (cpu, _, _) = run(&[0x3E, 0x81, 0x07], 2);
    assert_eq!(cpu.regs.a, 0x03);
    assert_ne!(cpu.regs.f & CF, 0);
}

#[test]
fn daa_after_add() {
    // LD A,0x15 ; ADD A,0x27 ; DAA -> 0x42 in BCD.
    let (cpu, _, _) = run(&[0x3E, 0x15, 0xC6, 0x27, 0x27], 3);
    assert_eq!(cpu.regs.a, 0x42);
}

#[test]
fn sixteen_bit_arithmetic() {
    // LD HL,0x0FFF ; LD BC,0x0001 ; ADD HL,BC
    let (cpu, _, _) = run(&[0x21, 0xFF, 0x0F, 0x01, 0x01, 0x00, 0x09], 3);
    assert_eq!(cpu.regs.hl(), 0x1000);
    assert_ne!(cpu.regs.f & HF, 0, "half carry from bit 11");
    assert_eq!(cpu.regs.f & CF, 0);

    // SBC HL,BC with carry clear: 0x1000 - 1.
    let (cpu, _, _) = run(
        &[0x21, 0x00, 0x10, 0x01, 0x01, 0x00, 0xB7, 0xED, 0x42],
        4,
    );
    assert_eq!(cpu.regs.hl(), 0x0FFF);
    assert_ne!(cpu.regs.f & NF, 0);
}

#[test]
fn unknown_opcode_is_an_error() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0xED, 0x00]);
    let err = cpu.step_instruction(&mut bus).unwrap_err();
    assert!(err.contains("unknown opcode"));
}

#[test]
fn history_records_instruction_addresses() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new(&[0x00, 0x00, 0x00, 0x00]);
    for _ in 0..4 {
        cpu.step_instruction(&mut bus).unwrap();
    }
    let history = cpu.history();
    assert_eq!(&history[history.len() - 4..], &[0, 1, 2, 3]);
}

#[test]
fn jp_hl_uses_register_value() {
    // LD HL,0x4000 ; JP HL
    let (cpu, _, _) = run(&[0x21, 0x00, 0x40, 0xE9], 2);
    assert_eq!(cpu.regs.pc, 0x4000);
}

#[test]
fn neg_negates_accumulator() {
    // LD A,1 ; NEG
    let (cpu, _, _) = run(&[0x3E, 0x01, 0xED, 0x44], 2);
    assert_eq!(cpu.regs.a, 0xFF);
    assert_ne!(cpu.regs.f & CF, 0);
    assert_ne!(cpu.regs.f & NF, 0);
}
