//! Declarative Z80 opcode table and decode tree.
//!
//! The instruction set is described by a text table (derived from the
//! classic z80.txt reference): mnemonic and operands, cycle count (with a
//! `taken/skipped` pair for conditional branches), byte count, flag hints,
//! and the opcode byte sequence. `XX` marks an instruction data byte, `+r`
//! expands over the eight register encodings, `+8*b` over the eight bit
//! numbers, and `r*` over the IX-half register set.
//!
//! The table is parsed once into a decode tree: interior nodes index by
//! opcode byte (or consume a data byte), leaves carry the decoded
//! instruction with pre-parsed operands and cycle counts.

use emu_core::Bus;

/// Register names selected by the low three opcode bits (`+r` expansion).
/// Index 6 is the `(HL)` slot and is listed separately in the table.
const REGISTER_NYBBLE: [&str; 8] = ["B", "C", "D", "E", "H", "L", "", "A"];

/// Same, for `r*` expansions where H and L mean the IX halves.
const REGISTER_STAR_NYBBLE: [&str; 8] = ["B", "C", "D", "E", "HX", "LX", "", "A"];

/// Instruction mnemonics. Dispatching on this enum is the hot path of the
/// interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc,
    Add,
    And,
    Bit,
    Call,
    Ccf,
    Cp,
    Cpd,
    Cpdr,
    Cpi,
    Cpir,
    Cpl,
    Daa,
    Dec,
    Di,
    Djnz,
    Ei,
    Ex,
    Exx,
    Halt,
    Im,
    In,
    Inc,
    Ind,
    Indr,
    Ini,
    Inir,
    Jp,
    Jr,
    Ld,
    Ldd,
    Lddr,
    Ldi,
    Ldir,
    Neg,
    Nop,
    Or,
    Otdr,
    Otir,
    Out,
    Outd,
    Outi,
    Pop,
    Push,
    Res,
    Ret,
    Reti,
    Retn,
    Rl,
    Rla,
    Rlc,
    Rlca,
    Rld,
    Rr,
    Rra,
    Rrc,
    Rrca,
    Rrd,
    Rst,
    Sbc,
    Scf,
    Set,
    Sla,
    Sll,
    Sra,
    Srl,
    Sub,
    Xor,
}

impl Mnemonic {
    fn from_str(s: &str) -> Self {
        match s {
            "ADC" => Self::Adc,
            "ADD" => Self::Add,
            "AND" => Self::And,
            "BIT" => Self::Bit,
            "CALL" => Self::Call,
            "CCF" => Self::Ccf,
            "CP" => Self::Cp,
            "CPD" => Self::Cpd,
            "CPDR" => Self::Cpdr,
            "CPI" => Self::Cpi,
            "CPIR" => Self::Cpir,
            "CPL" => Self::Cpl,
            "DAA" => Self::Daa,
            "DEC" => Self::Dec,
            "DI" => Self::Di,
            "DJNZ" => Self::Djnz,
            "EI" => Self::Ei,
            "EX" => Self::Ex,
            "EXX" => Self::Exx,
            "HALT" => Self::Halt,
            "IM" => Self::Im,
            "IN" => Self::In,
            "INC" => Self::Inc,
            "IND" => Self::Ind,
            "INDR" => Self::Indr,
            "INI" => Self::Ini,
            "INIR" => Self::Inir,
            "JP" => Self::Jp,
            "JR" => Self::Jr,
            "LD" => Self::Ld,
            "LDD" => Self::Ldd,
            "LDDR" => Self::Lddr,
            "LDI" => Self::Ldi,
            "LDIR" => Self::Ldir,
            "NEG" => Self::Neg,
            "NOP" => Self::Nop,
            "OR" => Self::Or,
            "OTDR" => Self::Otdr,
            "OTIR" => Self::Otir,
            "OUT" => Self::Out,
            "OUTD" => Self::Outd,
            "OUTI" => Self::Outi,
            "POP" => Self::Pop,
            "PUSH" => Self::Push,
            "RES" => Self::Res,
            "RET" => Self::Ret,
            "RETI" => Self::Reti,
            "RETN" => Self::Retn,
            "RL" => Self::Rl,
            "RLA" => Self::Rla,
            "RLC" => Self::Rlc,
            "RLCA" => Self::Rlca,
            "RLD" => Self::Rld,
            "RR" => Self::Rr,
            "RRA" => Self::Rra,
            "RRC" => Self::Rrc,
            "RRCA" => Self::Rrca,
            "RRD" => Self::Rrd,
            "RST" => Self::Rst,
            "SBC" => Self::Sbc,
            "SCF" => Self::Scf,
            "SET" => Self::Set,
            "SLA" => Self::Sla,
            "SLL" => Self::Sll,
            "SRA" => Self::Sra,
            "SRL" => Self::Srl,
            "SUB" => Self::Sub,
            "XOR" => Self::Xor,
            other => panic!("unknown mnemonic {other}"),
        }
    }
}

/// Branch conditions, encoded in the flag register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    /// Carry set.
    C,
    /// Carry clear.
    Nc,
    /// Zero set.
    Z,
    /// Zero clear.
    Nz,
    /// Sign set (minus).
    M,
    /// Sign clear (plus).
    P,
    /// Parity even (P/V set).
    Pe,
    /// Parity odd (P/V clear).
    Po,
}

impl Cond {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "C" => Some(Self::C),
            "NC" => Some(Self::Nc),
            "Z" => Some(Self::Z),
            "NZ" => Some(Self::Nz),
            "M" => Some(Self::M),
            "P" => Some(Self::P),
            "PE" => Some(Self::Pe),
            "PO" => Some(Self::Po),
            _ => None,
        }
    }
}

/// An instruction operand, pre-parsed from the table's assembly text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    // Byte registers.
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    /// High/low halves of IX and IY (undocumented).
    Hx,
    Lx,
    Hy,
    Ly,
    /// Interrupt vector register.
    I,
    /// Refresh register.
    R,

    // Word registers.
    Af,
    AfPrime,
    Bc,
    De,
    Hl,
    Ix,
    Iy,
    Sp,

    // Memory cells.
    IndBc,
    IndDe,
    IndHl,
    IndSp,
    /// `(IX+d)` with the displacement in the instruction's data byte.
    IndIx,
    /// `(IY+d)` with the displacement in the instruction's data byte.
    IndIy,
    /// `(NN)` with the address in the instruction's data word.
    IndNn,

    // Immediates.
    N,
    Nn,
    /// Relative branch target (`N+2` in the table).
    RelTarget,

    // I/O ports.
    PortC,
    PortN,

    // Structure.
    Cond(Cond),
    Bit(u8),
    Lit(u8),
}

impl Operand {
    /// Whether this operand selects the 16-bit form of a two-width
    /// instruction (ADD/ADC/SBC/INC/DEC/LD).
    #[must_use]
    pub const fn is_word(self) -> bool {
        matches!(
            self,
            Self::Bc | Self::De | Self::Hl | Self::Ix | Self::Iy | Self::Sp | Self::Nn
        )
    }
}

/// A fully-decoded instruction: the leaf of the decode tree.
#[derive(Debug)]
pub struct Instr {
    pub mnemonic: Mnemonic,
    /// Assembly text with `N`/`NN` placeholders, for disassembly.
    pub asm: String,
    pub operands: Vec<Operand>,
    /// Base cycle count (the not-taken count for conditional branches).
    pub cycles: u32,
    /// Extra cycles when a conditional branch is taken.
    pub jump_penalty: u32,
}

/// Node in the decode tree. A node is exactly one of: a leaf instruction,
/// a data-byte consumer, or a byte-indexed map of children.
#[derive(Default)]
pub struct DecodeNode {
    instr: Option<Instr>,
    data: Option<Box<DecodeNode>>,
    map: Option<Box<[Option<Box<DecodeNode>>; 256]>>,
}

impl DecodeNode {
    /// Build the decode tree from the instruction table.
    #[must_use]
    pub fn load() -> Self {
        let mut root = Self::default();
        for line in INSTRUCTION_TABLE.lines() {
            root.parse_line(line);
        }
        root
    }

    fn parse_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }

        // Fixed columns: assembly, cycles, byte count, flag hints, opcodes.
        let asm = line[..14].trim().replace('$', "");
        let cycles = line[14..20].trim().to_string();
        let opcodes: Vec<String> = line[32..]
            .trim()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        self.add(&asm, &cycles, &opcodes);
    }

    /// Recursively add one table line, expanding `+r`, `r*`, and `+8*b`.
    fn add(&mut self, asm: &str, cycles: &str, opcodes: &[String]) {
        if opcodes.is_empty() {
            assert!(
                self.instr.is_none() && self.data.is_none() && self.map.is_none(),
                "conflicting table entries at {asm}"
            );
            self.instr = Some(make_instr(asm, cycles));
            return;
        }

        let op_str = &opcodes[0];
        if op_str == "XX" {
            self.data
                .get_or_insert_with(Box::default)
                .add(asm, cycles, &opcodes[1..]);
            return;
        }

        // Expand the "8r" abbreviation to "80+r".
        let mut op_str = op_str.clone();
        if op_str.contains('r') && !op_str.contains("+r") {
            op_str = op_str.replacen('r', "0+r", 1);
        }

        let opcode = u8::from_str_radix(&op_str[..2], 16).expect("opcode byte");

        if op_str.ends_with("+8*b") {
            // Expand over each bit number 0 to 7.
            let rest = &op_str[2..op_str.len() - 4];
            for b in 0..8u8 {
                let mut ops = opcodes.to_vec();
                ops[0] = format!("{:02X}{rest}", opcode + 8 * b);
                self.add(&asm.replace('b', &b.to_string()), cycles, &ops);
            }
        } else if op_str.ends_with("+r") || op_str.ends_with("+r*") {
            // Expand over each register encoding (slot 6 is the memory form,
            // listed separately).
            let star = op_str.ends_with('*');
            for n in 0..8u8 {
                let r = if star {
                    REGISTER_STAR_NYBBLE[n as usize]
                } else {
                    REGISTER_NYBBLE[n as usize]
                };
                if !r.is_empty() {
                    let mut ops = opcodes.to_vec();
                    ops[0] = format!("{:02X}", opcode + n);
                    let expanded = if star {
                        asm.replace("r*", r)
                    } else {
                        asm.replace('r', r)
                    };
                    self.add(&expanded, cycles, &ops);
                }
            }
        } else {
            let map = self
                .map
                .get_or_insert_with(|| Box::new(std::array::from_fn(|_| None)));
            let child = map[opcode as usize].get_or_insert_with(Box::default);
            child.add(asm, cycles, &opcodes[1..]);
        }
    }

    /// Decode the instruction at `*pc`, advancing `*pc` past it.
    ///
    /// Returns the leaf plus the instruction's data byte and data word, if
    /// any. Instructions with two data bytes put the first in `byte_data`
    /// and both, little-endian, in `word_data`. Returns `None` for byte
    /// sequences not in the table.
    pub fn look_up<B: Bus>(&self, bus: &mut B, pc: &mut u16) -> Option<(&Instr, u8, u16)> {
        let mut node = self;
        let mut byte_data = 0u8;
        let mut word_data = 0u16;
        let mut have_byte = false;

        loop {
            if let Some(instr) = &node.instr {
                return Some((instr, byte_data, word_data));
            }

            let opcode = bus.read(*pc);
            *pc = pc.wrapping_add(1);

            if let Some(data) = &node.data {
                if have_byte {
                    word_data = u16::from(opcode) << 8 | u16::from(byte_data);
                } else {
                    byte_data = opcode;
                    have_byte = true;
                }
                node = data;
            } else if let Some(child) = node.map.as_ref().and_then(|m| m[opcode as usize].as_deref())
            {
                node = child;
            } else {
                return None;
            }
        }
    }
}

/// Build the leaf record for one expanded table line.
fn make_instr(asm: &str, cycles: &str) -> Instr {
    // "17/10" means 17 cycles taken, 10 skipped. A trailing "+" (HALT)
    // marks an instruction that repeats; the base count still applies.
    let cycle_fields: Vec<&str> = cycles.split('/').collect();
    let base: u32 = cycle_fields[cycle_fields.len() - 1]
        .trim_end_matches('+')
        .parse()
        .unwrap_or(0);
    let jump_penalty = if cycle_fields.len() == 2 {
        cycle_fields[0].parse::<u32>().unwrap_or(base) - base
    } else {
        0
    };

    let fields: Vec<&str> = asm.split(' ').collect();
    let mnemonic = Mnemonic::from_str(fields[0]);
    let subfields: Vec<&str> = match fields.len() {
        1 => Vec::new(),
        2 => fields[1].split(',').collect(),
        n => panic!("unexpected field count {n} in {asm}"),
    };

    Instr {
        mnemonic,
        asm: asm.to_string(),
        operands: parse_operands(mnemonic, &subfields),
        cycles: base,
        jump_penalty,
    }
}

/// Parse operand strings in the context of their mnemonic. The context
/// matters because "C" is both a register and a condition, and bit numbers
/// and RST targets are literals.
fn parse_operands(mnemonic: Mnemonic, subfields: &[&str]) -> Vec<Operand> {
    use Mnemonic as M;

    match mnemonic {
        M::Jp | M::Call | M::Jr if subfields.len() == 2 => {
            let cond = Cond::from_str(subfields[0])
                .unwrap_or_else(|| panic!("bad condition {}", subfields[0]));
            vec![Operand::Cond(cond), parse_operand(subfields[1])]
        }
        M::Ret if subfields.len() == 1 => {
            let cond = Cond::from_str(subfields[0])
                .unwrap_or_else(|| panic!("bad condition {}", subfields[0]));
            vec![Operand::Cond(cond)]
        }
        M::Bit | M::Set | M::Res => {
            let bit: u8 = subfields[0].parse().expect("bit number");
            vec![Operand::Bit(bit), parse_operand(subfields[1])]
        }
        M::Rst => {
            let target = u8::from_str_radix(subfields[0], 16).expect("RST target");
            vec![Operand::Lit(target)]
        }
        M::Im => {
            let mode: u8 = subfields[0].parse().expect("interrupt mode");
            vec![Operand::Lit(mode)]
        }
        M::Out if subfields.len() == 2 && subfields[1] == "0" => {
            vec![parse_operand(subfields[0]), Operand::Lit(0)]
        }
        _ => subfields.iter().map(|s| parse_operand(s)).collect(),
    }
}

fn parse_operand(s: &str) -> Operand {
    match s {
        "A" => Operand::A,
        "B" => Operand::B,
        "C" => Operand::C,
        "D" => Operand::D,
        "E" => Operand::E,
        "H" => Operand::H,
        "L" => Operand::L,
        "HX" => Operand::Hx,
        "LX" => Operand::Lx,
        "HY" => Operand::Hy,
        "LY" => Operand::Ly,
        "I" => Operand::I,
        "R" => Operand::R,
        "AF" => Operand::Af,
        "AF'" => Operand::AfPrime,
        "BC" => Operand::Bc,
        "DE" => Operand::De,
        "HL" => Operand::Hl,
        "IX" => Operand::Ix,
        "IY" => Operand::Iy,
        "SP" => Operand::Sp,
        "(BC)" => Operand::IndBc,
        "(DE)" => Operand::IndDe,
        "(HL)" => Operand::IndHl,
        "(SP)" => Operand::IndSp,
        "(IX+N)" => Operand::IndIx,
        "(IY+N)" => Operand::IndIy,
        "(NN)" => Operand::IndNn,
        "N" => Operand::N,
        "NN" => Operand::Nn,
        "N+2" => Operand::RelTarget,
        "(C)" => Operand::PortC,
        "(N)" => Operand::PortN,
        other => panic!("unknown operand {other}"),
    }
}

/// The instruction table, from the z80.txt reference. Columns are fixed:
/// assembly (14), cycles (6), byte count, flag hints, opcode bytes from
/// column 32.
const INSTRUCTION_TABLE: &str = "\
ADC A,(HL)    7     1   +0V+++  8E
ADC A,(IX+N)  19    3   +0V+++  DD 8E XX
ADC A,(IY+N)  19    3   +0V+++  FD 8E XX
ADC A,r       4     1   +0V+++  88+r
ADC A,HX            2   +0V+++  DD 8C
ADC A,HY            2   +0V+++  FD 8C
ADC A,LX            2   +0V+++  DD 8D
ADC A,LY            2   +0V+++  FD 8D
ADC A,N       7     2   +0V+++  CE XX
ADC HL,BC     15    2   +0V ++  ED 4A
ADC HL,DE     15    2   +0V ++  ED 5A
ADC HL,HL     15    2   +0V ++  ED 6A
ADC HL,SP     15    2   +0V ++  ED 7A
ADD A,(HL)    7     1   +0V+++  86
ADD A,(IX+N)  19    3   +0V+++  DD 86 XX
ADD A,(IY+N)  19    3   +0V+++  FD 86 XX
ADD A,r       4     1   +0V+++  8r
ADD A,HX            2   +0V+++  DD 84
ADD A,HY            2   +0V+++  FD 84
ADD A,LX            2   +0V+++  DD 85
ADD A,LY            2   +0V+++  FD 85
ADD A,N       7     2   +0V+++  C6 XX
ADD HL,BC     11    1   +0- --  09
ADD HL,DE     11    1   +0- --  19
ADD HL,HL     11    1   +0- --  29
ADD HL,SP     11    1   +0- --  39
ADD IX,BC     15    2   +0- --  DD 09
ADD IX,DE     15    2   +0- --  DD 19
ADD IX,IX     15    2   +0- --  DD 29
ADD IX,SP     15    2   +0- --  DD 39
ADD IY,BC     15    2   +0- --  FD 09
ADD IY,DE     15    2   +0- --  FD 19
ADD IY,IY     15    2   +0- --  FD 29
ADD IY,SP     15    2   +0- --  FD 39
AND (HL)      7     1   00P1++  A6
AND (IX+N)    19    3   00P1++  DD A6 XX
AND (IY+N)    19    3   00P1++  FD A6 XX
AND r         4     1   00P1++  Ar
AND HX              2   00P1++  DD A4
AND HY              2   00P1++  FD A4
AND LX              2   00P1++  DD A5
AND LY              2   00P1++  FD A5
AND N         7     2   00P1++  E6 XX
BIT b,(HL)    12    2   -0 1+   CB 46+8*b
BIT b,(IX+N)  20    4   -0 1+   DD CB XX 46+8*b
BIT b,(IY+N)  20    4   -0 1+   FD CB XX 46+8*b
BIT b,r       8     2   -0 1+   CB 4r+8*b
CALL C,NN     17/10 3   ------  DC XX XX
CALL M,NN     17/10 3   ------  FC XX XX
CALL NC,NN    17/10 3   ------  D4 XX XX
CALL NN       17    3   ------  CD XX XX
CALL NZ,NN    17/10 3   ------  C4 XX XX
CALL P,NN     17/10 3   ------  F4 XX XX
CALL PE,NN    17/10 3   ------  EC XX XX
CALL PO,NN    17/10 3   ------  E4 XX XX
CALL Z,NN     17/10 3   ------  CC XX XX
CCF           4     1   +0- --  3F
CP (HL)       7     1   +1V+++  BE
CP (IX+N)     19    3   +1V+++  DD BE XX
CP (IY+N)     19    3   +1V+++  FD BE XX
CP r          4     1   +1V+++  B8+r
CP HX               2   +1V+++  DD BC
CP HY               2   +1V+++  FD BC
CP LX               2   +1V+++  DD BD
CP LY               2   +1V+++  FD BD
CP N          7     2   +1V+++  FE XX
CPD           16    2   -1++++  ED A9
CPDR          21/16 2   -1++++  ED B9
CPI           16    2   -1++++  ED A1
CPIR          21/16 2   -1++++  ED B1
CPL           4     1   -1-1--  2F
DAA           4     1   +-P+++  27
DEC (HL)      11    1   -1V+++  35
DEC (IX+N)    23    3   -1V+++  DD 35 XX
DEC (IY+N)    23    3   -1V+++  FD 35 XX
DEC A         4     1   -1V+++  3D
DEC B         4     1   -1V+++  05
DEC BC        6     1   ------  0B
DEC C         4     1   -1V+++  0D
DEC D         4     1   -1V+++  15
DEC DE        6     1   ------  1B
DEC E         4     1   -1V+++  1D
DEC H         4     1   -1V+++  25
DEC HL        6     1   ------  2B
DEC IX        10    2   ------  DD 2B
DEC IY        10    2   ------  FD 2B
DEC L         4     2   -1V+++  2D
DEC SP        6     1   ------  3B
DI            4     1   ------  F3
DJNZ $N+2     13/8  2   ------  10 XX
EI            4     1   ------  FB
EX (SP),HL    19    1   ------  E3
EX (SP),IX    23    2   ------  DD E3
EX (SP),IY    23    2   ------  FD E3
EX AF,AF'     4     1   ------  08
EX DE,HL      4     1   ------  EB
EXX           4     1   ------  D9
HALT          4+    1   ------  76
IM 0          8     2   ------  ED 46
IM 1          8     2   ------  ED 56
IM 2          8     2   ------  ED 5E
IN A,(C)      12    2   -0P+++  ED 78
IN A,(N)      11    2   ------  DB XX
IN B,(C)      12    2   -0P+++  ED 40
IN C,(C)      12    2   -0P+++  ED 48
IN D,(C)      12    2   -0P+++  ED 50
IN E,(C)      12    2   -0P+++  ED 58
IN H,(C)      12    2   -0P+++  ED 60
IN L,(C)      12    2   -0P+++  ED 68
IN (C)        12    2   -0P+++  ED 70
INC (HL)      11    1   - V +   34
INC (IX+N)    23    3   - V +   DD 34 XX
INC (IY+N)    23    3   - V +   FD 34 XX
INC A         4     1   -0V+++  3C
INC B         4     1   -0V+++  04
INC BC        6     1   ------  03
INC C         4     1   -0V+++  0C
INC D         4     1   -0V+++  14
INC DE        6     1   ------  13
INC E         4     1   -0V+++  1C
INC H         4     1   -0V+++  24
INC HL        6     1   ------  23
INC HX              2   -0V+++  DD 24
INC HY              2   -0V+++  FD 24
INC IX        10    2   ------  DD 23
INC IY        10    2   ------  FD 23
INC L         4     1   -0V+++  2C
INC LX              2   -0V+++  DD 2C
INC LY              2   -0V+++  FD 2C
INC SP        6     1   ------  33
IND           16    2   -1  +   ED AA
INDR          21/16 2   -1  1   ED BA
INI           16    2   -1  +   ED A2
INIR          21/16 2   -1  1   ED B2
JP $NN        10    3   ------  C3 XX XX
# JP (HL) jumps to the value of HL itself, not through memory, so the
# register is written without parentheses here.
JP HL         4     1   ------  E9
JP IX         8     2   ------  DD E9
JP IY         8     2   ------  FD E9
JP C,$NN      10    3   ------  DA XX XX
JP M,$NN      10    3   ------  FA XX XX
JP NC,$NN     10    3   ------  D2 XX XX
JP NZ,$NN     10    3   ------  C2 XX XX
JP P,$NN      10    3   ------  F2 XX XX
JP PE,$NN     10    3   ------  EA XX XX
JP PO,$NN     10    3   ------  E2 XX XX
JP Z,$NN      10    3   ------  CA XX XX
JR $N+2       12    2   ------  18 XX
JR C,$N+2     12/7  2   ------  38 XX
JR NC,$N+2    12/7  2   ------  30 XX
JR NZ,$N+2    12/7  2   ------  20 XX
JR Z,$N+2     12/7  2   ------  28 XX
LD (BC),A     7     1   ------  02
LD (DE),A     7     1   ------  12
LD (HL),r     7     1   ------  7r
LD (HL),N     10    2   ------  36 XX
LD (IX+N),r   19    3   ------  DD 7r XX
LD (IX+N),N   19    4   ------  DD 36 XX XX
LD (IY+N),r   19    3   ------  FD 7r XX
LD (IY+N),N   19    4   ------  FD 36 XX XX
LD (NN),A     13    3   ------  32 XX XX
LD (NN),BC    20    4   ------  ED 43 XX XX
LD (NN),DE    20    4   ------  ED 53 XX XX
LD (NN),HL    16    3   ------  22 XX XX
LD (NN),IX    20    4   ------  DD 22 XX XX
LD (NN),IY    20    4   ------  FD 22 XX XX
LD (NN),SP    20    4   ------  ED 73 XX XX
LD A,(BC)     7     1   ------  0A
LD A,(DE)     7     1   ------  1A
LD A,(HL)     7     1   ------  7E
LD A,(IX+N)   19    3   ------  DD 7E XX
LD A,(IY+N)   19    3   ------  FD 7E XX
LD A,(NN)     13    3   ------  3A XX XX
LD A,r        4     1   ------  78+r
LD A,HX             2   ------  DD 7C
LD A,HY             2   ------  FD 7C
LD A,LX             2   ------  DD 7D
LD A,LY             2   ------  FD 7D
LD A,I        9     2   -0+0++  ED 57
LD A,N        7     2   ------  3E XX
LD A,R        9     2   -0+0++  ED 5F
LD B,(HL)     7     1   ------  46
LD B,(IX+N)   19    3   ------  DD 46 XX
LD B,(IY+N)   19    3   ------  FD 46 XX
LD B,HX             2   ------  DD 44
LD B,HY             2   ------  FD 44
LD B,LX             2   ------  DD 45
LD B,LY             2   ------  FD 45
LD B,r        4     1   ------  4r
LD B,N        7     2   ------  06 XX
LD BC,(NN)    20    4   ------  ED 4B XX XX
LD BC,NN      10    3   ------  01 XX XX
LD C,(HL)     7     1   ------  4E
LD C,(IX+N)   19    3   ------  DD 4E XX
LD C,(IY+N)   19    3   ------  FD 4E XX
LD C,HX             2   ------  DD 4C
LD C,HY             2   ------  FD 4C
LD C,LX             2   ------  DD 4D
LD C,LY             2   ------  FD 4D
LD C,r        4     1   ------  48+r
LD C,N        7     2   ------  0E XX
LD D,(HL)     7     1   ------  56
LD D,(IX+N)   19    3   ------  DD 56 XX
LD D,(IY+N)   19    3   ------  FD 56 XX
LD D,HX             2   ------  DD 54
LD D,HY             2   ------  FD 54
LD D,LX             2   ------  DD 55
LD D,LY             2   ------  FD 55
LD D,r        4     1   ------  5r
LD D,N        7     2   ------  16 XX
LD DE,(NN)    20    4   ------  ED 5B XX XX
LD DE,NN      10    3   ------  11 XX XX
LD E,(HL)     7     1   ------  5E
LD E,(IX+N)   19    3   ------  DD 5E XX
LD E,(IY+N)   19    3   ------  FD 5E XX
LD E,HX             2   ------  DD 5C
LD E,HY             2   ------  FD 5C
LD E,LX             2   ------  DD 5D
LD E,LY             2   ------  FD 5D
LD E,r        4     1   ------  58+r
LD E,N        7     2   ------  1E XX
LD H,(HL)     7     1   ------  66
LD H,(IX+N)   19    3   ------  DD 66 XX
LD H,(IY+N)   19    3   ------  FD 66 XX
LD H,r        4     1   ------  6r
LD H,N        7     2   ------  26 XX
LD HL,(NN)    20    3   ------  2A XX XX
LD HL,NN      10    3   ------  21 XX XX
LD HX,r*            2   ------  DD 6r*
LD HX,N             3   ------  DD 26 XX
LD HY,r*            2   ------  FD 6r*
LD HY,N             3   ------  FD 26 XX
LD I,A        9     2   ------  ED 47
LD IX,(NN)    20    4   ------  DD 2A XX XX
LD IX,NN      14    4   ------  DD 21 XX XX
LD IY,(NN)    20    4   ------  FD 2A XX XX
LD IY,NN      14    4   ------  FD 21 XX XX
LD L,(HL)     7     1   ------  6E
LD L,(IX+N)   19    3   ------  DD 6E XX
LD L,(IY+N)   19    3   ------  FD 6E XX
LD L,r        4     1   ------  68+r
LD L,N        7     2   ------  2E XX
LD LX,r*            2   ------  DD 68+r*
LD LX,N             3   ------  DD 2E XX
LD LY,r*            2   ------  FD 68+r*
LD LY,N             3   ------  FD 2E XX
LD R,A        9     2   ------  ED 4F
LD SP,(NN)    20    4   ------  ED 7B XX XX
LD SP,HL      6     1   ------  F9
LD SP,IX      10    2   ------  DD F9
LD SP,IY      10    2   ------  FD F9
LD SP,NN      10    3   ------  31 XX XX
LDD           16    2   -0+0--  ED A8
LDDR          21/16 2   -000--  ED B8
LDI           16    2   -0+0--  ED A0
LDIR          21/16 2   -000--  ED B0
NEG           8     2   +1V+++  ED 44
NOP           4     1   ------  00
OR (HL)       7     1   00P0++  B6
OR (IX+N)     19    3   00P0++  DD B6 XX
OR (IY+N)     19    3   00P0++  FD B6 XX
OR r          4     1   00P0++  Br
OR HX               2   00P0++  DD B4
OR HY               2   00P0++  FD B4
OR LX               2   00P0++  DD B5
OR LY               2   00P0++  FD B5
OR N          7     2   00P0++  F6 XX
OTDR          21/16 2   -1  1   ED BB
OTIR          21/16 2   -1  1   ED B3
OUT (C),A     12    2   ------  ED 79
OUT (C),B     12    2   ------  ED 41
OUT (C),C     12    2   ------  ED 49
OUT (C),D     12    2   ------  ED 51
OUT (C),E     12    2   ------  ED 59
OUT (C),H     12    2   ------  ED 61
OUT (C),L     12    2   ------  ED 69
OUT (C),0     12    2   ------  ED 71
OUT (N),A     11    2   ------  D3 XX
OUTD          16    2   -1  +   ED AB
OUTI          16    2   -1  +   ED A3
POP AF        10    1   ------  F1
POP BC        10    1   ------  C1
POP DE        10    1   ------  D1
POP HL        10    1   ------  E1
POP IX        14    2   ------  DD E1
POP IY        14    2   ------  FD E1
PUSH AF       11    1   ------  F5
PUSH BC       11    1   ------  C5
PUSH DE       11    1   ------  D5
PUSH HL       11    1   ------  E5
PUSH IX       15    2   ------  DD E5
PUSH IY       15    2   ------  FD E5
RES b,(HL)    15    2   ------  CB 86+8*b
RES b,(IX+N)  23    4   ------  DD CB XX 86+8*b
RES b,(IY+N)  23    4   ------  FD CB XX 86+8*b
RES b,r       8     2   ------  CB 8r+8*b
RET           10    1   ------  C9
RET C         11/5  1   ------  D8
RET M         11/5  1   ------  F8
RET NC        11/5  1   ------  D0
RET NZ        11/5  1   ------  C0
RET P         11/5  1   ------  F0
RET PE        11/5  1   ------  E8
RET PO        11/5  1   ------  E0
RET Z         11/5  1   ------  C8
RETI          14    2   ------  ED 4D
RETN          14    2   ------  ED 45
RL (HL)       15    2   +0P0++  CB 16
RL r          8     2   +0P0++  CB 1r
RL (IX+N)     23    4   +0P0++  DD CB XX 16
RL (IY+N)     23    4   +0P0++  FD CB XX 16
RLA           4     1   +0-0--  17
RLC (HL)      15    2   +0P0++  CB 06
RLC (IX+N)    23    4   +0P0++  DD CB XX 06
RLC (IY+N)    23    4   +0P0++  FD CB XX 06
RLC r         8     2   +0P0++  CB 0r
RLCA          4     1   +0-0--  07
RLD           18    2   -0P0++  ED 6F
RR (HL)       15    2   +0P0++  CB 1E
RR r          8     2   +0P0++  CB 18+r
RR (IX+N)     23    4   +0P0++  DD CB XX 1E
RR (IY+N)     23    4   +0P0++  FD CB XX 1E
RRA           4     1   +0-0--  1F
RRC (HL)      15    2   +0P0++  CB 0E
RRC (IX+N)    23    4   +0P0++  DD CB XX 0E
RRC (IY+N)    23    4   +0P0++  FD CB XX 0E
RRC r         8     2   +0P0++  CB 08+r
RRCA          4     1   +0-0--  0F
RRD           18    2   -0P0++  ED 67
RST 00        11    1   ------  C7
RST 08        11    1   ------  CF
RST 10        11    1   ------  D7
RST 18        11    1   ------  DF
RST 20        11    1   ------  E7
RST 28        11    1   ------  EF
RST 30        11    1   ------  F7
RST 38        11    1   ------  FF
SBC A,(HL)    7     1   +1V+++  9E
SBC A,(IX+N)  19    3   +1V+++  DD 9E XX
SBC A,(IY+N)  19    3   +1V+++  FD 9E XX
SBC A,r       4     1   +1V+++  98+r
SBC HX              2   +1V+++  DD 9C
SBC HY              2   +1V+++  FD 9C
SBC LX              2   +1V+++  DD 9D
SBC LY              2   +1V+++  FD 9D
SBC A,N       7     2   +1V+++  DE XX
SBC HL,BC     15    2   +1V ++  ED 42
SBC HL,DE     15    2   +1V ++  ED 52
SBC HL,HL     15    2   +1V ++  ED 62
SBC HL,SP     15    2   +1V ++  ED 72
SCF           4     1   10-0--  37
SET b,(HL)    15    2   ------  CB C6+8*b
SET b,(IX+N)  23    4   ------  DD CB XX C6+8*b
SET b,(IY+N)  23    4   ------  FD CB XX C6+8*b
SET b,r       8     2   ------  CB Cr+8*b
SLA (HL)      15    2   +0P0++  CB 26
SLA (IX+N)    23    4   +0P0++  DD CB XX 26
SLA (IY+N)    23    4   +0P0++  FD CB XX 26
SLA r         8     2   +0P0++  CB 2r
SLL (HL)      15    2   +0P0++  CB 36
SLL (IX+N)    23    4   +0P0++  DD CB XX 36
SLL (IY+N)    23    4   +0P0++  FD CB XX 36
SLL r         8     2   +0P0++  CB 3r
SRA (HL)      15    2   +0P0++  CB 2E
SRA (IX+N)    23    4   +0P0++  DD CB XX 2E
SRA (IY+N)    23    4   +0P0++  FD CB XX 2E
SRA r         8     2   +0P0++  CB 28+r
SRL (HL)      15    2   +0P0++  CB 3E
SRL (IX+N)    23    4   +0P0++  DD CB XX 3E
SRL (IY+N)    23    4   +0P0++  FD CB XX 3E
SRL r         8     2   +0P0++  CB 38+r
SUB (HL)      7     1   ++V+++  96
SUB (IX+N)    19    3   ++V+++  DD 96 XX
SUB (IY+N)    19    3   ++V+++  FD 96 XX
SUB r         4     1   ++V+++  9r
SUB HX              2   ++V+++  DD 94
SUB HY              2   ++V+++  FD 94
SUB LX              2   ++V+++  DD 95
SUB LY              2   ++V+++  FD 95
SUB N         7     2   ++V+++  D6 XX
XOR (HL)      7     1   00P0++  AE
XOR (IX+N)    19    3   00P0++  DD AE XX
XOR (IY+N)    19    3   00P0++  FD AE XX
XOR r         4     1   00P0++  A8+r
XOR HX              2   00P0++  DD AC
XOR HY              2   00P0++  FD AC
XOR LX              2   00P0++  DD AD
XOR LY              2   00P0++  FD AD
XOR N         7     2   00P0++  EE XX
";
