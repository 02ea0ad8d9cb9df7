//! Z80 CPU with instruction-level stepping.
//!
//! `step_instruction` decodes one instruction through the table-driven
//! decode tree, executes it, and returns the cycle count (including the
//! taken-branch penalty). The CPU does not own the bus; memory and port
//! access go through the `IoBus` passed to each step.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{Bus, Cpu, IoBus};

use crate::opcodes::{Cond, DecodeNode, Operand};
use crate::registers::{sign_extend, Registers};

/// How many program counters the historical trace keeps for post-mortem
/// disassembly.
pub const HISTORY_LEN: usize = 20;

/// The Z80 CPU.
pub struct Z80 {
    /// Register file, public for the machine and for tests.
    pub regs: Registers,

    /// Root of the instruction decode tree.
    root: DecodeNode,

    /// Whether the last executed instruction was HALT. The PC is backed up
    /// so the HALT re-executes until an interrupt moves past it.
    halted: bool,

    /// Set by EI for exactly the instruction that executed it, so the
    /// following instruction runs before any IRQ is taken.
    suppress_irq: bool,

    /// Ring of the last `HISTORY_LEN` instruction addresses.
    history: [u16; HISTORY_LEN],
    history_ptr: usize,
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            root: DecodeNode::load(),
            halted: false,
            suppress_irq: false,
            history: [0; HISTORY_LEN],
            history_ptr: 0,
        }
    }

    /// Soft reset: PC to 0, interrupts disabled. Registers keep their
    /// values, as on the real chip.
    pub fn reset(&mut self) {
        self.regs.pc = 0;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.halted = false;
        self.suppress_irq = false;
    }

    /// Power-on reset: all registers cleared.
    pub fn power_on_reset(&mut self) {
        self.regs = Registers::default();
        self.halted = false;
        self.suppress_irq = false;
    }

    /// Whether the CPU is parked on a HALT instruction.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Whether an EI in the instruction just executed is holding off IRQ
    /// handling for one instruction.
    #[must_use]
    pub fn irq_suppressed(&self) -> bool {
        self.suppress_irq
    }

    /// The last executed instruction addresses, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<u16> {
        (0..HISTORY_LEN)
            .map(|i| self.history[(self.history_ptr + i + 1) % HISTORY_LEN])
            .collect()
    }

    /// Execute one instruction. Returns cycles consumed, or the fatal
    /// decode error for a byte sequence not in the instruction table.
    pub fn step_instruction<B: IoBus>(&mut self, bus: &mut B) -> Result<u32, String> {
        self.suppress_irq = false;

        // Log PC for retroactive disassembly.
        self.history_ptr = (self.history_ptr + 1) % HISTORY_LEN;
        self.history[self.history_ptr] = self.regs.pc;

        let inst_pc = self.regs.pc;
        let mut pc = self.regs.pc;

        let (mnemonic, ops_buf, ops_len, byte_data, word_data, cycles, jump_penalty) = {
            let Some((instr, byte_data, word_data)) = self.root.look_up(bus, &mut pc) else {
                return Err(format!("unknown opcode at {inst_pc:04X}"));
            };
            let mut ops = [Operand::A; 2];
            let len = instr.operands.len().min(2);
            ops[..len].copy_from_slice(&instr.operands[..len]);
            (
                instr.mnemonic,
                ops,
                len,
                byte_data,
                word_data,
                instr.cycles,
                instr.jump_penalty,
            )
        };

        self.regs.pc = pc;
        let next_inst_pc = pc;

        self.execute(bus, mnemonic, &ops_buf[..ops_len], byte_data, word_data)?;

        // The taken branch costs extra.
        let mut total = cycles;
        if self.regs.pc != next_inst_pc {
            total += jump_penalty;
        }

        Ok(total)
    }

    /// Disassemble the instruction at `pc`. Returns the rendered line and
    /// the address of the following instruction.
    pub fn disassemble<B: Bus>(&self, bus: &mut B, pc: u16) -> (String, u16) {
        crate::disasm::disassemble(&self.root, bus, pc)
    }

    // -----------------------------------------------------------------------
    // Operand access
    // -----------------------------------------------------------------------

    pub(crate) fn read_word<B: Bus>(&self, bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr);
        let hi = bus.read(addr.wrapping_add(1));
        u16::from(hi) << 8 | u16::from(lo)
    }

    pub(crate) fn write_word<B: Bus>(&self, bus: &mut B, addr: u16, value: u16) {
        bus.write(addr, value as u8);
        bus.write(addr.wrapping_add(1), (value >> 8) as u8);
    }

    pub(crate) fn push_byte<B: Bus>(&mut self, bus: &mut B, value: u8) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, value);
    }

    pub(crate) fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push_byte(bus, (value >> 8) as u8);
        self.push_byte(bus, value as u8);
    }

    pub(crate) fn pop_byte<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        value
    }

    pub(crate) fn pop_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pop_byte(bus);
        let hi = self.pop_byte(bus);
        u16::from(hi) << 8 | u16::from(lo)
    }

    /// Read a byte operand: register, memory cell, or immediate.
    pub(crate) fn get_byte_value<B: Bus>(
        &self,
        bus: &mut B,
        op: Operand,
        byte_data: u8,
        word_data: u16,
    ) -> u8 {
        let regs = &self.regs;
        match op {
            Operand::A => regs.a,
            Operand::B => regs.b,
            Operand::C => regs.c,
            Operand::D => regs.d,
            Operand::E => regs.e,
            Operand::H => regs.h,
            Operand::L => regs.l,
            Operand::Hx => (regs.ix >> 8) as u8,
            Operand::Lx => regs.ix as u8,
            Operand::Hy => (regs.iy >> 8) as u8,
            Operand::Ly => regs.iy as u8,
            Operand::I => regs.i,
            Operand::R => regs.r,
            Operand::IndBc => bus.read(regs.bc()),
            Operand::IndDe => bus.read(regs.de()),
            Operand::IndHl => bus.read(regs.hl()),
            Operand::IndIx => bus.read(regs.ix.wrapping_add(sign_extend(byte_data))),
            Operand::IndIy => bus.read(regs.iy.wrapping_add(sign_extend(byte_data))),
            Operand::IndNn => bus.read(word_data),
            Operand::N => byte_data,
            Operand::Lit(v) => v,
            other => panic!("not a byte source operand: {other:?}"),
        }
    }

    /// Write a byte operand.
    pub(crate) fn set_byte_value<B: Bus>(
        &mut self,
        bus: &mut B,
        op: Operand,
        value: u8,
        byte_data: u8,
        word_data: u16,
    ) {
        match op {
            Operand::A => self.regs.a = value,
            Operand::B => self.regs.b = value,
            Operand::C => self.regs.c = value,
            Operand::D => self.regs.d = value,
            Operand::E => self.regs.e = value,
            Operand::H => self.regs.h = value,
            Operand::L => self.regs.l = value,
            Operand::Hx => self.regs.ix = (self.regs.ix & 0x00FF) | u16::from(value) << 8,
            Operand::Lx => self.regs.ix = (self.regs.ix & 0xFF00) | u16::from(value),
            Operand::Hy => self.regs.iy = (self.regs.iy & 0x00FF) | u16::from(value) << 8,
            Operand::Ly => self.regs.iy = (self.regs.iy & 0xFF00) | u16::from(value),
            Operand::I => self.regs.i = value,
            Operand::R => self.regs.r = value,
            Operand::IndBc => bus.write(self.regs.bc(), value),
            Operand::IndDe => bus.write(self.regs.de(), value),
            Operand::IndHl => bus.write(self.regs.hl(), value),
            Operand::IndIx => {
                bus.write(self.regs.ix.wrapping_add(sign_extend(byte_data)), value);
            }
            Operand::IndIy => {
                bus.write(self.regs.iy.wrapping_add(sign_extend(byte_data)), value);
            }
            Operand::IndNn => bus.write(word_data, value),
            other => panic!("not a byte destination operand: {other:?}"),
        }
    }

    /// Read a word operand.
    pub(crate) fn get_word_value<B: Bus>(
        &self,
        bus: &mut B,
        op: Operand,
        word_data: u16,
    ) -> u16 {
        let regs = &self.regs;
        match op {
            Operand::Af => regs.af(),
            Operand::AfPrime => regs.af_prime(),
            Operand::Bc => regs.bc(),
            Operand::De => regs.de(),
            Operand::Hl => regs.hl(),
            Operand::Ix => regs.ix,
            Operand::Iy => regs.iy,
            Operand::Sp => regs.sp,
            Operand::Nn => word_data,
            Operand::IndNn => self.read_word(bus, word_data),
            Operand::IndHl => self.read_word(bus, regs.hl()),
            Operand::IndSp => self.read_word(bus, regs.sp),
            other => panic!("not a word source operand: {other:?}"),
        }
    }

    /// Write a word operand.
    pub(crate) fn set_word_value<B: Bus>(
        &mut self,
        bus: &mut B,
        op: Operand,
        value: u16,
        word_data: u16,
    ) {
        match op {
            Operand::Af => self.regs.set_af(value),
            Operand::AfPrime => self.regs.set_af_prime(value),
            Operand::Bc => self.regs.set_bc(value),
            Operand::De => self.regs.set_de(value),
            Operand::Hl => self.regs.set_hl(value),
            Operand::Ix => self.regs.ix = value,
            Operand::Iy => self.regs.iy = value,
            Operand::Sp => self.regs.sp = value,
            Operand::IndNn => self.write_word(bus, word_data, value),
            Operand::IndSp => self.write_word(bus, self.regs.sp, value),
            other => panic!("not a word destination operand: {other:?}"),
        }
    }

    pub(crate) fn condition_satisfied(&self, cond: Cond) -> bool {
        use crate::flags::{CF, PF, SF, ZF};
        let f = self.regs.f;
        match cond {
            Cond::C => f & CF != 0,
            Cond::Nc => f & CF == 0,
            Cond::Z => f & ZF != 0,
            Cond::Nz => f & ZF == 0,
            Cond::M => f & SF != 0,
            Cond::P => f & SF == 0,
            Cond::Pe => f & PF != 0,
            Cond::Po => f & PF == 0,
        }
    }

    // -----------------------------------------------------------------------
    // Interrupt entry
    // -----------------------------------------------------------------------

    /// If the CPU is parked on a HALT, move past it before vectoring.
    fn leave_halt(&mut self) {
        if self.halted {
            self.regs.pc = self.regs.pc.wrapping_add(1);
            self.halted = false;
        }
    }

    pub(crate) fn set_halted(&mut self) {
        self.halted = true;
    }

    pub(crate) fn set_suppress_irq(&mut self) {
        self.suppress_irq = true;
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: IoBus> Cpu<B> for Z80 {
    fn step(&mut self, bus: &mut B) -> u32 {
        match self.step_instruction(bus) {
            Ok(cycles) => cycles,
            Err(e) => panic!("{e}"),
        }
    }

    fn reset(&mut self) {
        Z80::reset(self);
    }

    /// Maskable interrupt, mode 1: push PC, clear IFF1, vector to 0x0038.
    fn interrupt(&mut self, bus: &mut B) {
        self.leave_halt();
        let pc = self.regs.pc;
        self.push_word(bus, pc);
        self.regs.iff1 = false;
        self.regs.pc = 0x0038;
    }

    /// Non-maskable interrupt: push PC, save IFF1 into IFF2 and clear it,
    /// vector to 0x0066. RETN restores IFF1 from IFF2.
    fn nmi(&mut self, bus: &mut B) {
        self.leave_halt();
        let pc = self.regs.pc;
        self.push_word(bus, pc);
        self.regs.iff2 = self.regs.iff1;
        self.regs.iff1 = false;
        self.regs.pc = 0x0066;
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }
}
