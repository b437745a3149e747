use std::fmt;

use crate::symbol::{Flag, Opcode, Register, TrapVect};

/// Decoded view of one instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op {
    /// Empty condition set never branches.
    Br { flag: Option<Flag>, offset: u16 },
    Add { dest: Register, src: Register, operand: Operand },
    And { dest: Register, src: Register, operand: Operand },
    Ld { dest: Register, offset: u16 },
    St { src: Register, offset: u16 },
    Jsr { offset: u16 },
    Jsrr { base: Register },
    Ldr { dest: Register, base: Register, offset: u16 },
    Str { src: Register, base: Register, offset: u16 },
    Rti,
    Not { dest: Register, src: Register },
    Ldi { dest: Register, offset: u16 },
    Sti { src: Register, offset: u16 },
    /// `RET` when `base` is R7.
    Jmp { base: Register },
    Reserved,
    Lea { dest: Register, offset: u16 },
    Trap { vect: u8 },
}

/// Second source of `ADD`/`AND`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    Reg(Register),
    /// Already sign extended.
    Imm(u16),
}

/// Sign extend the low `bits` bits of `val` to 16 bits.
#[inline]
pub fn s_ext(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16);
    let magnitude = val & ((1u16 << bits) - 1);
    if magnitude & (1u16 << (bits - 1)) != 0 {
        magnitude | (0xFFFF << bits)
    } else {
        magnitude
    }
}

impl Op {
    pub fn decode(instr: u16) -> Op {
        // Fields shared by most opcodes
        let r0 = Register::from_bits(instr >> 9);
        let r1 = Register::from_bits(instr >> 6);
        let pc9 = s_ext(instr, 9);
        let offs6 = s_ext(instr, 6);

        match Opcode::from_word(instr) {
            Opcode::Br => Op::Br {
                flag: Flag::from_bits(instr >> 9),
                offset: pc9,
            },
            Opcode::Add => Op::Add {
                dest: r0,
                src: r1,
                operand: Operand::decode(instr),
            },
            Opcode::And => Op::And {
                dest: r0,
                src: r1,
                operand: Operand::decode(instr),
            },
            Opcode::Ld => Op::Ld {
                dest: r0,
                offset: pc9,
            },
            Opcode::St => Op::St { src: r0, offset: pc9 },
            Opcode::Jsr if instr & 0x800 != 0 => Op::Jsr {
                offset: s_ext(instr, 11),
            },
            Opcode::Jsr => Op::Jsrr { base: r1 },
            Opcode::Ldr => Op::Ldr {
                dest: r0,
                base: r1,
                offset: offs6,
            },
            Opcode::Str => Op::Str {
                src: r0,
                base: r1,
                offset: offs6,
            },
            Opcode::Rti => Op::Rti,
            Opcode::Not => Op::Not { dest: r0, src: r1 },
            Opcode::Ldi => Op::Ldi {
                dest: r0,
                offset: pc9,
            },
            Opcode::Sti => Op::Sti { src: r0, offset: pc9 },
            Opcode::Jmp => Op::Jmp { base: r1 },
            Opcode::Res => Op::Reserved,
            Opcode::Lea => Op::Lea {
                dest: r0,
                offset: pc9,
            },
            Opcode::Trap => Op::Trap {
                vect: (instr & 0xFF) as u8,
            },
        }
    }
}

impl Operand {
    fn decode(instr: u16) -> Operand {
        if instr & 0x20 == 0 {
            Operand::Reg(Register::from_bits(instr))
        } else {
            Operand::Imm(s_ext(instr, 5))
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{reg}"),
            Operand::Imm(imm) => write!(f, "#{}", *imm as i16),
        }
    }
}

// Disassembly, used when tracing execution
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let offs = |offset: u16| offset as i16;
        match *self {
            Op::Br { flag: None, .. } => write!(f, "NOP"),
            Op::Br {
                flag: Some(flag),
                offset,
            } => write!(f, "BR{flag} #{}", offs(offset)),
            Op::Add { dest, src, operand } => write!(f, "ADD {dest}, {src}, {operand}"),
            Op::And { dest, src, operand } => write!(f, "AND {dest}, {src}, {operand}"),
            Op::Ld { dest, offset } => write!(f, "LD {dest}, #{}", offs(offset)),
            Op::St { src, offset } => write!(f, "ST {src}, #{}", offs(offset)),
            Op::Jsr { offset } => write!(f, "JSR #{}", offs(offset)),
            Op::Jsrr { base } => write!(f, "JSRR {base}"),
            Op::Ldr { dest, base, offset } => write!(f, "LDR {dest}, {base}, #{}", offs(offset)),
            Op::Str { src, base, offset } => write!(f, "STR {src}, {base}, #{}", offs(offset)),
            Op::Rti => write!(f, "RTI"),
            Op::Not { dest, src } => write!(f, "NOT {dest}, {src}"),
            Op::Ldi { dest, offset } => write!(f, "LDI {dest}, #{}", offs(offset)),
            Op::Sti { src, offset } => write!(f, "STI {src}, #{}", offs(offset)),
            Op::Jmp { base: Register::R7 } => write!(f, "RET"),
            Op::Jmp { base } => write!(f, "JMP {base}"),
            Op::Reserved => write!(f, "RES"),
            Op::Lea { dest, offset } => write!(f, "LEA {dest}, #{}", offs(offset)),
            Op::Trap { vect } => match TrapVect::from_vector(vect) {
                Some(known) => write!(f, "{}", known.name()),
                None => write!(f, "TRAP x{vect:02X}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extension() {
        #[rustfmt::skip]
        let cases = [
            // (input, bits, expected)
            (0x0000, 5, 0x0000),
            (0x000F, 5, 0x000F),
            (0x0010, 5, 0xFFF0),
            (0x001F, 5, 0xFFFF),
            (0x003F, 5, 0xFFFF),
            (0x0020, 6, 0xFFE0),
            (0x00FF, 9, 0x00FF),
            (0x0100, 9, 0xFF00),
            (0x01FF, 9, 0xFFFF),
            (0xFE01, 9, 0x0001),
            (0x0400, 11, 0xFC00),
            (0x07FF, 11, 0xFFFF),
            (0x03FF, 11, 0x03FF),
        ];
        for (input, bits, expected) in cases {
            let actual = s_ext(input, bits);
            assert_eq!(actual, expected, "s_ext(0x{input:04x}, {bits}) == 0x{actual:04x}");
        }
    }

    #[test]
    fn decodes_fields() {
        assert_eq!(
            Op::decode(0x1025),
            Op::Add {
                dest: Register::R0,
                src: Register::R0,
                operand: Operand::Imm(5)
            }
        );
        assert_eq!(
            Op::decode(0x5283),
            Op::And {
                dest: Register::R1,
                src: Register::R2,
                operand: Operand::Reg(Register::R3)
            }
        );
        assert_eq!(
            Op::decode(0x0FFF),
            Op::Br {
                flag: Some(Flag::Nzp),
                offset: 0xFFFF
            }
        );
        assert_eq!(
            Op::decode(0x01FF),
            Op::Br {
                flag: None,
                offset: 0xFFFF
            }
        );
        assert_eq!(Op::decode(0x4801), Op::Jsr { offset: 1 });
        assert_eq!(Op::decode(0x4100), Op::Jsrr { base: Register::R4 });
        assert_eq!(Op::decode(0xD000), Op::Reserved);
        assert_eq!(Op::decode(0xF025), Op::Trap { vect: 0x25 });
    }

    #[test]
    fn disassembles() {
        assert_eq!(Op::decode(0x103F).to_string(), "ADD R0, R0, #-1");
        assert_eq!(Op::decode(0x0FFF).to_string(), "BRnzp #-1");
        assert_eq!(Op::decode(0xC1C0).to_string(), "RET");
        assert_eq!(Op::decode(0x92BF).to_string(), "NOT R1, R2");
        assert_eq!(Op::decode(0xF025).to_string(), "HALT");
        assert_eq!(Op::decode(0xF030).to_string(), "TRAP x30");
        assert_eq!(Op::decode(0x0000).to_string(), "NOP");
    }

    #[test]
    fn decodes_assembled_program() {
        let air = crate::assemble_air(
            ".ORIG x3000\nL: ADD R1, R2, #-3\nBRnp L\nLDR R0, R6, #-32\nJSR L\nTRAP x22\n.END",
        )
        .unwrap();
        let text: Vec<String> = air
            .words()
            .into_iter()
            .map(|word| Op::decode(word).to_string())
            .collect();
        assert_eq!(
            text,
            ["ADD R1, R2, #-3", "BRnp #-2", "LDR R0, R6, #-32", "JSR #-4", "PUTS"]
        );
    }
}
