use std::{fmt, str::FromStr};

use fxhash::FxBuildHasher;
use indexmap::{map::Entry, IndexMap};

// Symbol table of symbol -> memory address
type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Label to absolute address mapping. Written once per label during the first pass and only
/// read afterwards.
#[derive(Default, Debug)]
pub struct SymbolTable {
    table: FxMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            table: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Register a label. Returns the previous address if the label already exists, in which
    /// case the table is left untouched.
    pub fn insert(&mut self, label: &str, addr: u16) -> Result<(), u16> {
        match self.table.entry(label.to_string()) {
            Entry::Occupied(prev) => Err(*prev.get()),
            Entry::Vacant(slot) => {
                slot.insert(addr);
                Ok(())
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<u16> {
        self.table.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Labels in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.table.iter().map(|(label, addr)| (label.as_str(), *addr))
    }
}

/// Represents the CPU registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    /// Stack pointer, used by `RTI`.
    R6,
    /// Return address for `JSR`, `JSRR` and `TRAP`.
    R7,
}

impl Register {
    pub fn from_bits(bits: u16) -> Register {
        match bits & 0b111 {
            0 => Register::R0,
            1 => Register::R1,
            2 => Register::R2,
            3 => Register::R3,
            4 => Register::R4,
            5 => Register::R5,
            6 => Register::R6,
            _ => Register::R7,
        }
    }

    pub fn bits(self) -> u16 {
        self as u16
    }
}

impl FromStr for Register {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('R'), Some(digit @ '0'..='7'), None) => {
                Ok(Register::from_bits(digit as u16 - '0' as u16))
            }
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.bits())
    }
}

/// Branch condition set, the three condition bits of a `BR` instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flag {
    /// -
    N,
    /// 0
    Z,
    /// +
    P,
    /// <= 0
    Nz,
    /// >= 0
    Zp,
    /// != 0
    Np,
    /// Unconditional
    Nzp,
}

impl Flag {
    /// Condition bits in the same layout as the status word (N=4, Z=2, P=1).
    pub fn bits(self) -> u16 {
        match self {
            Flag::N => 0b100,
            Flag::Z => 0b010,
            Flag::P => 0b001,
            Flag::Nz => 0b110,
            Flag::Zp => 0b011,
            Flag::Np => 0b101,
            Flag::Nzp => 0b111,
        }
    }

    /// `None` for an empty condition set, which never branches.
    pub fn from_bits(bits: u16) -> Option<Flag> {
        match bits & 0b111 {
            0b100 => Some(Flag::N),
            0b010 => Some(Flag::Z),
            0b001 => Some(Flag::P),
            0b110 => Some(Flag::Nz),
            0b011 => Some(Flag::Zp),
            0b101 => Some(Flag::Np),
            0b111 => Some(Flag::Nzp),
            _ => None,
        }
    }

    /// Parse the suffix of a `BR` mnemonic. Letters must appear in `nzp` order; an empty
    /// suffix is unconditional.
    fn from_suffix(suffix: &str) -> Option<Flag> {
        let suffix = suffix.to_ascii_lowercase();
        match suffix.as_str() {
            "" | "nzp" => Some(Flag::Nzp),
            "n" => Some(Flag::N),
            "z" => Some(Flag::Z),
            "p" => Some(Flag::P),
            "nz" => Some(Flag::Nz),
            "zp" => Some(Flag::Zp),
            "np" => Some(Flag::Np),
            _ => None,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = self.bits();
        for (mask, ch) in [(0b100, 'n'), (0b010, 'z'), (0b001, 'p')] {
            if bits & mask != 0 {
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}

/// The 16 values of the opcode field (bits 15-12).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    pub fn from_word(word: u16) -> Opcode {
        match word >> 12 {
            0x0 => Opcode::Br,
            0x1 => Opcode::Add,
            0x2 => Opcode::Ld,
            0x3 => Opcode::St,
            0x4 => Opcode::Jsr,
            0x5 => Opcode::And,
            0x6 => Opcode::Ldr,
            0x7 => Opcode::Str,
            0x8 => Opcode::Rti,
            0x9 => Opcode::Not,
            0xA => Opcode::Ldi,
            0xB => Opcode::Sti,
            0xC => Opcode::Jmp,
            0xD => Opcode::Res,
            0xE => Opcode::Lea,
            _ => Opcode::Trap,
        }
    }

    /// Opcode placed in bits 15-12.
    pub fn word(self) -> u16 {
        (self as u16) << 12
    }
}

/// Service routines reachable through `TRAP`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrapVect {
    Getc = 0x20,
    Out = 0x21,
    Puts = 0x22,
    In = 0x23,
    Putsp = 0x24,
    Halt = 0x25,
}

impl TrapVect {
    pub fn from_vector(vect: u8) -> Option<TrapVect> {
        match vect {
            0x20 => Some(TrapVect::Getc),
            0x21 => Some(TrapVect::Out),
            0x22 => Some(TrapVect::Puts),
            0x23 => Some(TrapVect::In),
            0x24 => Some(TrapVect::Putsp),
            0x25 => Some(TrapVect::Halt),
            _ => None,
        }
    }

    pub fn vector(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            TrapVect::Getc => "GETC",
            TrapVect::Out => "OUT",
            TrapVect::Puts => "PUTS",
            TrapVect::In => "IN",
            TrapVect::Putsp => "PUTSP",
            TrapVect::Halt => "HALT",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrapKind {
    /// `TRAP` with an explicit vector operand.
    Generic,
    Named(TrapVect),
}

/// Every mnemonic the assembler accepts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InstrKind {
    Add,
    And,
    Br(Flag),
    Jmp,
    Jsr,
    Jsrr,
    Ld,
    Ldi,
    Ldr,
    Lea,
    Not,
    Res,
    Ret,
    Rti,
    St,
    Sti,
    Str,
    Trap(TrapKind),
}

impl InstrKind {
    pub fn opcode(self) -> Opcode {
        match self {
            InstrKind::Add => Opcode::Add,
            InstrKind::And => Opcode::And,
            InstrKind::Br(_) => Opcode::Br,
            InstrKind::Jmp | InstrKind::Ret => Opcode::Jmp,
            InstrKind::Jsr | InstrKind::Jsrr => Opcode::Jsr,
            InstrKind::Ld => Opcode::Ld,
            InstrKind::Ldi => Opcode::Ldi,
            InstrKind::Ldr => Opcode::Ldr,
            InstrKind::Lea => Opcode::Lea,
            InstrKind::Not => Opcode::Not,
            InstrKind::Res => Opcode::Res,
            InstrKind::Rti => Opcode::Rti,
            InstrKind::St => Opcode::St,
            InstrKind::Sti => Opcode::Sti,
            InstrKind::Str => Opcode::Str,
            InstrKind::Trap(_) => Opcode::Trap,
        }
    }

    /// Number of operands following the mnemonic.
    pub fn operand_count(self) -> usize {
        match self {
            InstrKind::Add | InstrKind::And | InstrKind::Ldr | InstrKind::Str => 3,
            InstrKind::Ld
            | InstrKind::Ldi
            | InstrKind::Lea
            | InstrKind::St
            | InstrKind::Sti
            | InstrKind::Not => 2,
            InstrKind::Br(_)
            | InstrKind::Jmp
            | InstrKind::Jsr
            | InstrKind::Jsrr
            | InstrKind::Trap(TrapKind::Generic) => 1,
            InstrKind::Res
            | InstrKind::Ret
            | InstrKind::Rti
            | InstrKind::Trap(TrapKind::Named(_)) => 0,
        }
    }
}

impl FromStr for InstrKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let kind = match upper.as_str() {
            "ADD" => InstrKind::Add,
            "AND" => InstrKind::And,
            "JMP" => InstrKind::Jmp,
            "JSR" => InstrKind::Jsr,
            "JSRR" => InstrKind::Jsrr,
            "LD" => InstrKind::Ld,
            "LDI" => InstrKind::Ldi,
            "LDR" => InstrKind::Ldr,
            "LEA" => InstrKind::Lea,
            "NOT" => InstrKind::Not,
            "RES" => InstrKind::Res,
            "RET" => InstrKind::Ret,
            "RTI" => InstrKind::Rti,
            "ST" => InstrKind::St,
            "STI" => InstrKind::Sti,
            "STR" => InstrKind::Str,
            "TRAP" => InstrKind::Trap(TrapKind::Generic),
            "GETC" => InstrKind::Trap(TrapKind::Named(TrapVect::Getc)),
            "OUT" => InstrKind::Trap(TrapKind::Named(TrapVect::Out)),
            "PUTS" => InstrKind::Trap(TrapKind::Named(TrapVect::Puts)),
            "IN" => InstrKind::Trap(TrapKind::Named(TrapVect::In)),
            "PUTSP" => InstrKind::Trap(TrapKind::Named(TrapVect::Putsp)),
            "HALT" => InstrKind::Trap(TrapKind::Named(TrapVect::Halt)),
            br if br.starts_with("BR") => InstrKind::Br(Flag::from_suffix(&br[2..]).ok_or(())?),
            _ => return Err(()),
        };
        Ok(kind)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DirKind {
    Orig,
    End,
    Stringz,
    Blkw,
    Fill,
}

impl FromStr for DirKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            ".ORIG" => Ok(DirKind::Orig),
            ".END" => Ok(DirKind::End),
            ".STRINGZ" => Ok(DirKind::Stringz),
            ".BLKW" => Ok(DirKind::Blkw),
            ".FILL" => Ok(DirKind::Fill),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DirKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirKind::Orig => ".ORIG",
            DirKind::End => ".END",
            DirKind::Stringz => ".STRINGZ",
            DirKind::Blkw => ".BLKW",
            DirKind::Fill => ".FILL",
        };
        f.write_str(name)
    }
}
