//! Per-mnemonic instruction execution.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]

use emu_core::IoBus;

use crate::cpu::Z80;
use crate::flags::{
    set, set_undoc, update_from_adc16, update_from_add16, update_from_add8, update_from_byte,
    update_from_dec8, update_from_in, update_from_inc8, update_from_logic, update_from_sbc16,
    update_from_sub8, CF, HF, NF, PF, SF, UNDOC, XF, YF, ZF,
};
use crate::opcodes::{Mnemonic, Operand};
use crate::registers::sign_extend;

impl Z80 {
    /// Execute one decoded instruction.
    pub(crate) fn execute<B: IoBus>(
        &mut self,
        bus: &mut B,
        mnemonic: Mnemonic,
        ops: &[Operand],
        byte_data: u8,
        word_data: u16,
    ) -> Result<(), String> {
        match mnemonic {
            Mnemonic::Adc => {
                let (dst, src) = two_operands(ops);
                let carry = u8::from(self.regs.f & CF != 0);
                if dst.is_word() || src.is_word() {
                    let v1 = self.get_word_value(bus, dst, word_data);
                    let v2 = self.get_word_value(bus, src, word_data);
                    let result = v1.wrapping_add(v2).wrapping_add(u16::from(carry));
                    self.set_word_value(bus, dst, result, word_data);
                    update_from_adc16(&mut self.regs.f, v1, v2, result);
                } else {
                    let v1 = self.get_byte_value(bus, dst, byte_data, word_data);
                    let v2 = self.get_byte_value(bus, src, byte_data, word_data);
                    let result = v1.wrapping_add(v2).wrapping_add(carry);
                    self.set_byte_value(bus, dst, result, byte_data, word_data);
                    update_from_add8(&mut self.regs.f, v1, v2, result);
                }
            }
            Mnemonic::Add => {
                let (dst, src) = two_operands(ops);
                if dst.is_word() || src.is_word() {
                    let v1 = self.get_word_value(bus, dst, word_data);
                    let v2 = self.get_word_value(bus, src, word_data);
                    let result = v1.wrapping_add(v2);
                    self.set_word_value(bus, dst, result, word_data);
                    update_from_add16(&mut self.regs.f, v1, v2, result);
                } else {
                    let v1 = self.get_byte_value(bus, dst, byte_data, word_data);
                    let v2 = self.get_byte_value(bus, src, byte_data, word_data);
                    let result = v1.wrapping_add(v2);
                    self.set_byte_value(bus, dst, result, byte_data, word_data);
                    update_from_add8(&mut self.regs.f, v1, v2, result);
                }
            }
            Mnemonic::And | Mnemonic::Xor | Mnemonic::Or => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                match mnemonic {
                    Mnemonic::And => self.regs.a &= value,
                    Mnemonic::Xor => self.regs.a ^= value,
                    _ => self.regs.a |= value,
                }
                update_from_logic(&mut self.regs.f, self.regs.a, mnemonic == Mnemonic::And);
            }
            Mnemonic::Bit => {
                let Operand::Bit(b) = ops[0] else {
                    unreachable!()
                };
                let value = self.get_byte_value(bus, ops[1], byte_data, word_data);
                let result = (1u8 << b) & value;
                self.regs.f = (self.regs.f & CF) | HF | (result & SF);
                if result == 0 {
                    self.regs.f |= PF | ZF;
                }
                if ops[1] != Operand::IndHl {
                    set_undoc(&mut self.regs.f, value);
                }
            }
            Mnemonic::Ccf => {
                let carry = self.regs.f & CF != 0;
                set(&mut self.regs.f, HF, carry);
                set(&mut self.regs.f, NF, false);
                set(&mut self.regs.f, CF, !carry);
                set_undoc(&mut self.regs.f, self.regs.a);
            }
            Mnemonic::Cp => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                let result = self.regs.a.wrapping_sub(value);
                update_from_sub8(&mut self.regs.f, self.regs.a, value, result);
            }
            Mnemonic::Cpi | Mnemonic::Cpir | Mnemonic::Cpd | Mnemonic::Cpdr => {
                let old_carry = self.regs.f & CF != 0;
                let hl = self.regs.hl();
                let value = bus.read(hl);
                let result = self.regs.a.wrapping_sub(value);
                match mnemonic {
                    Mnemonic::Cpi | Mnemonic::Cpir => self.regs.set_hl(hl.wrapping_add(1)),
                    _ => self.regs.set_hl(hl.wrapping_sub(1)),
                }
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);
                if matches!(mnemonic, Mnemonic::Cpir | Mnemonic::Cpdr) && bc != 0 && result != 0 {
                    self.regs.pc = self.regs.pc.wrapping_sub(2);
                }
                update_from_sub8(&mut self.regs.f, self.regs.a, value, result);
                // Undoc bit 5 is bit 1 of (result - H), shifted up.
                let h = (self.regs.f & HF) >> 4;
                self.regs.f = (self.regs.f & !YF) | ((result.wrapping_sub(h) & 2) << 4);
                set(&mut self.regs.f, CF, old_carry);
                set(&mut self.regs.f, PF, bc != 0);
                if result & 0x0F == 0x08 && self.regs.f & HF != 0 {
                    self.regs.f &= !XF;
                }
            }
            Mnemonic::Cpl => {
                self.regs.a = !self.regs.a;
                set(&mut self.regs.f, HF, true);
                set(&mut self.regs.f, NF, true);
                set_undoc(&mut self.regs.f, self.regs.a);
            }
            Mnemonic::Daa => {
                let mut a = i32::from(self.regs.a);
                let a_low = a & 0x0F;
                let mut carry = self.regs.f & CF != 0;
                let mut half_carry = self.regs.f & HF != 0;
                if self.regs.f & NF != 0 {
                    // After a subtraction.
                    let high_decimal = carry || a > 0x99;
                    if half_carry || a_low > 9 {
                        if a_low > 5 {
                            half_carry = false;
                        }
                        a = (a - 6) & 0xFF;
                    }
                    if high_decimal {
                        a -= 0x160;
                    }
                } else {
                    // After an addition.
                    if half_carry || a_low > 9 {
                        half_carry = a_low > 9;
                        a += 6;
                    }
                    if carry || (a & 0x1F0) > 0x90 {
                        a += 0x60;
                    }
                }
                if a & 0x100 != 0 {
                    carry = true;
                }
                self.regs.a = a as u8;
                update_from_byte(&mut self.regs.f, self.regs.a);
                set(&mut self.regs.f, HF, half_carry);
                set(&mut self.regs.f, CF, carry);
            }
            Mnemonic::Dec => {
                if ops[0].is_word() {
                    let value = self.get_word_value(bus, ops[0], word_data);
                    self.set_word_value(bus, ops[0], value.wrapping_sub(1), word_data);
                    // Flags are not affected.
                } else {
                    let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                    let result = value.wrapping_sub(1);
                    self.set_byte_value(bus, ops[0], result, byte_data, word_data);
                    update_from_dec8(&mut self.regs.f, result);
                }
            }
            Mnemonic::Di => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
            }
            Mnemonic::Djnz => {
                let rel = sign_extend(byte_data);
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.regs.pc = self.regs.pc.wrapping_add(rel);
                }
            }
            Mnemonic::Ei => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.set_suppress_irq();
            }
            Mnemonic::Ex => {
                let v1 = self.get_word_value(bus, ops[0], word_data);
                let v2 = self.get_word_value(bus, ops[1], word_data);
                self.set_word_value(bus, ops[0], v2, word_data);
                self.set_word_value(bus, ops[1], v1, word_data);
            }
            Mnemonic::Exx => self.regs.exx(),
            Mnemonic::Halt => {
                // Back up so the HALT re-executes until an interrupt moves
                // past it.
                self.regs.pc = self.regs.pc.wrapping_sub(1);
                self.set_halted();
            }
            Mnemonic::Im => {
                let Operand::Lit(mode) = ops[0] else {
                    unreachable!()
                };
                if mode != 1 {
                    return Err(format!("interrupt mode {mode} is not supported"));
                }
                self.regs.im = mode;
            }
            Mnemonic::In => {
                let source = ops[ops.len() - 1];
                let port = match source {
                    Operand::PortC => self.regs.c,
                    Operand::PortN => byte_data,
                    other => panic!("bad IN source {other:?}"),
                };
                let value = bus.read_io(port);
                if ops.len() == 2 {
                    self.set_byte_value(bus, ops[0], value, byte_data, word_data);
                }
                if source == Operand::PortC {
                    update_from_in(&mut self.regs.f, value);
                }
            }
            Mnemonic::Inc => {
                if ops[0].is_word() {
                    let value = self.get_word_value(bus, ops[0], word_data);
                    self.set_word_value(bus, ops[0], value.wrapping_add(1), word_data);
                    // Flags are not affected.
                } else {
                    let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                    let result = value.wrapping_add(1);
                    self.set_byte_value(bus, ops[0], result, byte_data, word_data);
                    update_from_inc8(&mut self.regs.f, result);
                }
            }
            Mnemonic::Ini | Mnemonic::Inir | Mnemonic::Ind | Mnemonic::Indr => {
                let value = bus.read_io(self.regs.c);
                let hl = self.regs.hl();
                bus.write(hl, value);
                match mnemonic {
                    Mnemonic::Ini | Mnemonic::Inir => self.regs.set_hl(hl.wrapping_add(1)),
                    _ => self.regs.set_hl(hl.wrapping_sub(1)),
                }
                self.regs.b = self.regs.b.wrapping_sub(1);
                if matches!(mnemonic, Mnemonic::Inir | Mnemonic::Indr) && self.regs.b != 0 {
                    self.regs.pc = self.regs.pc.wrapping_sub(2);
                }
                set(&mut self.regs.f, ZF, self.regs.b == 0);
                set(&mut self.regs.f, NF, true);
            }
            Mnemonic::Jp | Mnemonic::Call => {
                let addr = self.get_word_value(bus, ops[ops.len() - 1], word_data);
                let taken = match ops[0] {
                    Operand::Cond(cond) => self.condition_satisfied(cond),
                    _ => true,
                };
                if taken {
                    if mnemonic == Mnemonic::Call {
                        let pc = self.regs.pc;
                        self.push_word(bus, pc);
                    }
                    self.regs.pc = addr;
                }
            }
            Mnemonic::Jr => {
                let rel = sign_extend(byte_data);
                let taken = match ops[0] {
                    Operand::Cond(cond) => self.condition_satisfied(cond),
                    _ => true,
                };
                if taken {
                    self.regs.pc = self.regs.pc.wrapping_add(rel);
                }
            }
            Mnemonic::Ld => {
                let (dst, src) = (ops[0], ops[1]);
                if dst.is_word() || src.is_word() {
                    let value = self.get_word_value(bus, src, word_data);
                    self.set_word_value(bus, dst, value, word_data);
                } else {
                    // LD (IX+N),N and LD (IY+N),N carry two data bytes: the
                    // displacement in the byte data, the immediate in the
                    // high byte of the word data.
                    let value = if src == Operand::N
                        && matches!(dst, Operand::IndIx | Operand::IndIy)
                    {
                        (word_data >> 8) as u8
                    } else {
                        self.get_byte_value(bus, src, byte_data, word_data)
                    };
                    self.set_byte_value(bus, dst, value, byte_data, word_data);
                }
            }
            Mnemonic::Ldi | Mnemonic::Ldir | Mnemonic::Ldd | Mnemonic::Lddr => {
                let hl = self.regs.hl();
                let de = self.regs.de();
                let value = bus.read(hl);
                bus.write(de, value);
                match mnemonic {
                    Mnemonic::Ldi | Mnemonic::Ldir => {
                        self.regs.set_hl(hl.wrapping_add(1));
                        self.regs.set_de(de.wrapping_add(1));
                    }
                    _ => {
                        self.regs.set_hl(hl.wrapping_sub(1));
                        self.regs.set_de(de.wrapping_sub(1));
                    }
                }
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);
                if matches!(mnemonic, Mnemonic::Ldir | Mnemonic::Lddr) && bc != 0 {
                    self.regs.pc = self.regs.pc.wrapping_sub(2);
                }
                set(&mut self.regs.f, PF, bc != 0);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                // Undoc bits come from A + the copied value.
                let undoc = self.regs.a.wrapping_add(value);
                self.regs.f = (self.regs.f & !UNDOC) | (undoc & XF) | ((undoc & 0x02) << 3);
            }
            Mnemonic::Neg => {
                let value = self.regs.a;
                self.regs.a = 0u8.wrapping_sub(value);
                update_from_sub8(&mut self.regs.f, 0, value, self.regs.a);
            }
            Mnemonic::Nop => {}
            Mnemonic::Out => {
                let value = self.get_byte_value(bus, ops[1], byte_data, word_data);
                let port = match ops[0] {
                    Operand::PortC => self.regs.c,
                    Operand::PortN => byte_data,
                    other => panic!("bad OUT destination {other:?}"),
                };
                bus.write_io(port, value);
            }
            Mnemonic::Outi | Mnemonic::Outd | Mnemonic::Otir | Mnemonic::Otdr => {
                let hl = self.regs.hl();
                let value = bus.read(hl);
                bus.write_io(self.regs.c, value);
                match mnemonic {
                    Mnemonic::Outi | Mnemonic::Otir => self.regs.set_hl(hl.wrapping_add(1)),
                    _ => self.regs.set_hl(hl.wrapping_sub(1)),
                }
                self.regs.b = self.regs.b.wrapping_sub(1);
                if matches!(mnemonic, Mnemonic::Otir | Mnemonic::Otdr) && self.regs.b != 0 {
                    self.regs.pc = self.regs.pc.wrapping_sub(2);
                }
                set(&mut self.regs.f, ZF, self.regs.b == 0);
                set(&mut self.regs.f, NF, true);
            }
            Mnemonic::Pop => {
                let value = self.pop_word(bus);
                self.set_word_value(bus, ops[0], value, word_data);
            }
            Mnemonic::Push => {
                let value = self.get_word_value(bus, ops[0], word_data);
                self.push_word(bus, value);
            }
            Mnemonic::Res => {
                let Operand::Bit(b) = ops[0] else {
                    unreachable!()
                };
                let value = self.get_byte_value(bus, ops[1], byte_data, word_data);
                self.set_byte_value(bus, ops[1], value & !(1 << b), byte_data, word_data);
            }
            Mnemonic::Set => {
                let Operand::Bit(b) = ops[0] else {
                    unreachable!()
                };
                let value = self.get_byte_value(bus, ops[1], byte_data, word_data);
                self.set_byte_value(bus, ops[1], value | (1 << b), byte_data, word_data);
            }
            Mnemonic::Ret => {
                let taken = match ops.first() {
                    Some(Operand::Cond(cond)) => self.condition_satisfied(*cond),
                    _ => true,
                };
                if taken {
                    self.regs.pc = self.pop_word(bus);
                }
            }
            Mnemonic::Reti => {
                self.regs.pc = self.pop_word(bus);
            }
            Mnemonic::Retn => {
                self.regs.pc = self.pop_word(bus);
                self.regs.iff1 = self.regs.iff2;
            }
            Mnemonic::Rl => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                let mut result = value << 1;
                if self.regs.f & CF != 0 {
                    result |= 0x01;
                }
                update_from_byte(&mut self.regs.f, result);
                set(&mut self.regs.f, CF, value & 0x80 != 0);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                self.set_byte_value(bus, ops[0], result, byte_data, word_data);
            }
            Mnemonic::Rla => {
                let value = self.regs.a;
                let mut result = value << 1;
                if self.regs.f & CF != 0 {
                    result |= 1;
                }
                self.regs.a = result;
                set(&mut self.regs.f, CF, value & 0x80 != 0);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                set_undoc(&mut self.regs.f, result);
            }
            Mnemonic::Rlc => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                let left_bit = value >> 7;
                let result = (value << 1) | left_bit;
                self.set_byte_value(bus, ops[0], result, byte_data, word_data);
                update_from_byte(&mut self.regs.f, result);
                set(&mut self.regs.f, CF, left_bit == 1);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
            }
            Mnemonic::Rlca => {
                let value = self.regs.a;
                let left_bit = value >> 7;
                self.regs.a = (value << 1) | left_bit;
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                set(&mut self.regs.f, CF, left_bit == 1);
                set_undoc(&mut self.regs.f, self.regs.a);
            }
            Mnemonic::Rld => {
                let hl = self.regs.hl();
                let orig = bus.read(hl);
                let new_value = (orig << 4) | (self.regs.a & 0x0F);
                self.regs.a = (self.regs.a & 0xF0) | (orig >> 4);
                update_from_byte(&mut self.regs.f, self.regs.a);
                set(&mut self.regs.f, NF, false);
                set(&mut self.regs.f, HF, false);
                set_undoc(&mut self.regs.f, self.regs.a);
                bus.write(hl, new_value);
            }
            Mnemonic::Rr => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                let mut result = value >> 1;
                if self.regs.f & CF != 0 {
                    result |= 0x80;
                }
                update_from_byte(&mut self.regs.f, result);
                set(&mut self.regs.f, CF, value & 0x01 != 0);
                set(&mut self.regs.f, NF, false);
                set(&mut self.regs.f, HF, false);
                self.set_byte_value(bus, ops[0], result, byte_data, word_data);
            }
            Mnemonic::Rra => {
                let value = self.regs.a;
                let mut result = value >> 1;
                if self.regs.f & CF != 0 {
                    result |= 0x80;
                }
                self.regs.a = result;
                set(&mut self.regs.f, CF, value & 1 != 0);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                set_undoc(&mut self.regs.f, result);
            }
            Mnemonic::Rrc => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                let mut result = value >> 1;
                if value & 0x01 != 0 {
                    result |= 0x80;
                }
                update_from_byte(&mut self.regs.f, result);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                set(&mut self.regs.f, CF, value & 0x01 != 0);
                self.set_byte_value(bus, ops[0], result, byte_data, word_data);
            }
            Mnemonic::Rrca => {
                let value = self.regs.a;
                let right_bit = value & 1;
                self.regs.a = (value >> 1) | (right_bit << 7);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                set(&mut self.regs.f, CF, right_bit == 1);
                set_undoc(&mut self.regs.f, self.regs.a);
            }
            Mnemonic::Rrd => {
                let hl = self.regs.hl();
                let value = bus.read(hl);
                let result = (value >> 4) | ((self.regs.a & 0x0F) << 4);
                self.regs.a = (self.regs.a & 0xF0) | (value & 0x0F);
                update_from_byte(&mut self.regs.f, self.regs.a);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                bus.write(hl, result);
            }
            Mnemonic::Rst => {
                let Operand::Lit(target) = ops[0] else {
                    unreachable!()
                };
                let pc = self.regs.pc;
                self.push_word(bus, pc);
                self.regs.pc = u16::from(target);
            }
            Mnemonic::Scf => {
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                set(&mut self.regs.f, CF, true);
                set_undoc(&mut self.regs.f, self.regs.a);
            }
            Mnemonic::Sbc => {
                let (dst, src) = two_operands(ops);
                let carry = self.regs.f & CF != 0;
                if dst.is_word() {
                    let before = self.get_word_value(bus, dst, word_data);
                    let value = self.get_word_value(bus, src, word_data);
                    let result = before.wrapping_sub(value).wrapping_sub(u16::from(carry));
                    update_from_sbc16(&mut self.regs.f, before, value, result);
                    self.set_word_value(bus, dst, result, word_data);
                } else {
                    let before = self.get_byte_value(bus, dst, byte_data, word_data);
                    let value = self.get_byte_value(bus, src, byte_data, word_data);
                    let result = before.wrapping_sub(value).wrapping_sub(u8::from(carry));
                    update_from_sub8(&mut self.regs.f, before, value, result);
                    self.set_byte_value(bus, dst, result, byte_data, word_data);
                }
            }
            Mnemonic::Sla => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                let result = value << 1;
                update_from_byte(&mut self.regs.f, result);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                set(&mut self.regs.f, CF, value & 0x80 != 0);
                self.set_byte_value(bus, ops[0], result, byte_data, word_data);
            }
            Mnemonic::Sll => {
                // Undocumented: shift left, setting bit 0.
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                let result = (value << 1) | 1;
                update_from_byte(&mut self.regs.f, result);
                set(&mut self.regs.f, CF, value & 0x80 != 0);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                self.set_byte_value(bus, ops[0], result, byte_data, word_data);
            }
            Mnemonic::Sra => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
                let result = ((value as i8) >> 1) as u8;
                update_from_byte(&mut self.regs.f, result);
                set(&mut self.regs.f, CF, value & 0x01 != 0);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                self.set_byte_value(bus, ops[0], result, byte_data, word_data);
            }
            Mnemonic::Srl => {
                let value = self.get_byte_value(bus, ops[0], byte_data, word_data);
                let result = value >> 1;
                update_from_byte(&mut self.regs.f, result);
                set(&mut self.regs.f, CF, value & 0x01 != 0);
                set(&mut self.regs.f, HF, false);
                set(&mut self.regs.f, NF, false);
                self.set_byte_value(bus, ops[0], result, byte_data, word_data);
            }
            Mnemonic::Sub => {
                let (_, src) = two_operands(ops);
                let before = self.regs.a;
                let value = self.get_byte_value(bus, src, byte_data, word_data);
                self.regs.a = before.wrapping_sub(value);
                update_from_sub8(&mut self.regs.f, before, value, self.regs.a);
            }
        }

        Ok(())
    }
}

/// Split an operand list into destination and source, defaulting the
/// destination to A for the one-operand accumulator forms (SUB r, SBC HX).
fn two_operands(ops: &[Operand]) -> (Operand, Operand) {
    if ops.len() == 2 {
        (ops[0], ops[1])
    } else {
        (Operand::A, ops[0])
    }
}
