//! Retroactive disassembly for the historical PC trace.

use emu_core::Bus;

use crate::opcodes::DecodeNode;

/// Disassemble the instruction at `pc`.
///
/// Returns the rendered line (`ADDR  bytes  mnemonic`) and the address of
/// the next instruction. Unknown byte sequences render as such and advance
/// past the bytes consumed during the failed decode.
pub fn disassemble<B: Bus>(root: &DecodeNode, bus: &mut B, pc: u16) -> (String, u16) {
    let inst_pc = pc;
    let mut next_pc = pc;
    let decoded = root.look_up(bus, &mut next_pc);

    let mut line = format!("{inst_pc:04X} ");
    for offset in 0..4 {
        let addr = inst_pc.wrapping_add(offset);
        if addr < next_pc {
            line.push_str(&format!("{:02X} ", bus.read(addr)));
        } else {
            line.push_str("   ");
        }
    }

    match decoded {
        Some((instr, byte_data, word_data)) => {
            line.push_str(&substitute_data(&instr.asm, byte_data, word_data));
        }
        None => line.push_str("Unknown instruction"),
    }

    (line, next_pc)
}

/// Fill the N and NN placeholders of an assembly string with their values.
///
/// Placeholders are replaced only on word boundaries so that the N in NZ,
/// INC, or DJNZ is left alone. Instructions with two byte immediates render
/// the first one in both positions, which is close enough for a trace.
fn substitute_data(asm: &str, byte_data: u8, word_data: u16) -> String {
    let bytes = asm.as_bytes();
    let mut out = String::with_capacity(asm.len() + 4);
    let mut i = 0;

    while i < bytes.len() {
        let boundary_before = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if bytes[i] == b'N' && boundary_before {
            let double = bytes.get(i + 1) == Some(&b'N');
            let end = if double { i + 2 } else { i + 1 };
            let boundary_after = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
            if boundary_after {
                if double {
                    out.push_str(&format!("{word_data:04X}"));
                } else {
                    out.push_str(&format!("{byte_data:02X}"));
                }
                i = end;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatMem(Vec<u8>);

    impl Bus for FlatMem {
        fn read(&mut self, address: u16) -> u8 {
            self.0[address as usize]
        }

        fn write(&mut self, address: u16, value: u8) {
            self.0[address as usize] = value;
        }
    }

    fn mem(bytes: &[u8]) -> FlatMem {
        let mut v = vec![0u8; 0x10000];
        v[..bytes.len()].copy_from_slice(bytes);
        FlatMem(v)
    }

    #[test]
    fn substitutes_word_immediate() {
        assert_eq!(substitute_data("JP NN", 0, 0x1234), "JP 1234");
        assert_eq!(substitute_data("CALL NZ,NN", 0, 0x4000), "CALL NZ,4000");
    }

    #[test]
    fn substitutes_byte_immediate() {
        assert_eq!(substitute_data("LD A,N", 0x42, 0), "LD A,42");
        assert_eq!(substitute_data("JR N+2", 0x05, 0), "JR 05+2");
    }

    #[test]
    fn leaves_mnemonic_letters_alone() {
        assert_eq!(substitute_data("INC HL", 0x99, 0x9999), "INC HL");
        assert_eq!(substitute_data("DJNZ N+2", 0x10, 0), "DJNZ 10+2");
    }

    #[test]
    fn renders_instruction_bytes() {
        let root = DecodeNode::load();
        let mut m = mem(&[0x21, 0x34, 0x12]);
        let (line, next_pc) = disassemble(&root, &mut m, 0);
        assert_eq!(next_pc, 3);
        assert_eq!(line, "0000 21 34 12    LD HL,1234");
    }

    #[test]
    fn renders_unknown_sequence() {
        let root = DecodeNode::load();
        let mut m = mem(&[0xED, 0x00]);
        let (line, _) = disassemble(&root, &mut m, 0);
        assert!(line.contains("Unknown instruction"));
    }
}
