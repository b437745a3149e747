use crate::{
    command::{Command, Head},
    error::{AsmError, AsmErrorKind},
    lexer::Lexeme,
    parse::{parse_literal, Bits},
    parser::Program,
    symbol::{DirKind, Flag, InstrKind, Opcode, Register, TrapKind},
};

/// Assembly intermediate representation, contains starting address and list of statements
#[derive(Debug)]
pub struct Air {
    /// Memory address to start program at
    orig: u16,
    /// One statement per emitted word
    ast: Vec<AirStmt>,
}

impl Air {
    /// Second pass: resolve operands of every line against the symbol table from the first
    /// pass and lay out one statement per memory word.
    pub fn encode(program: &Program) -> Result<Air, Vec<AsmError>> {
        let mut ast = Vec::new();
        let mut errors = Vec::new();
        let mut addr = program.orig as u32;

        for cmd in program.body {
            let line = Line {
                cmd,
                program,
                addr: addr as u16,
            };
            match line.encode() {
                Ok(stmts) => ast.extend(stmts),
                Err(e) => errors.push(e),
            }
            match cmd.words() {
                Ok(words) => addr = addr.saturating_add(words),
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(Air {
                orig: program.orig,
                ast,
            })
        } else {
            Err(errors)
        }
    }

    pub fn orig(&self) -> u16 {
        self.orig
    }

    pub fn get(&self, idx: usize) -> &AirStmt {
        &self.ast[idx]
    }

    pub fn len(&self) -> usize {
        self.ast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ast.is_empty()
    }

    /// Machine words in memory order.
    pub fn words(&self) -> Vec<u16> {
        self.ast.iter().map(AirStmt::emit).collect()
    }
}

impl<'a> IntoIterator for &'a Air {
    type Item = &'a AirStmt;
    type IntoIter = std::slice::Iter<'a, AirStmt>;

    fn into_iter(self) -> Self::IntoIter {
        self.ast.iter()
    }
}

/// Single LC3 statement with every operand resolved.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AirStmt {
    /// Add SR1 (source register 1) with SR2 or an immediate and store in DR
    Add {
        dest: Register,
        src_reg: Register,
        src_reg_imm: ImmediateOrReg,
    },
    /// Bitwise-and SR1 with SR2 or an immediate and store in DR
    And {
        dest: Register,
        src_reg: Register,
        src_reg_imm: ImmediateOrReg,
    },
    /// Branch based on flag by adding offset to PC (program counter)
    Branch { flag: Flag, offset: i16 },
    /// Set PC to BR to perform a jump on the next cycle
    Jump { src_reg: Register },
    /// Store next instruction address in R7 and jump to PC + offset
    JumpSub { offset: i16 },
    /// Jump to subroutine stored at BR
    JumpSubReg { src_reg: Register },
    Load { dest: Register, offset: i16 },
    LoadInd { dest: Register, offset: i16 },
    LoadOffs {
        dest: Register,
        src_reg: Register,
        offset: i16,
    },
    LoadEAddr { dest: Register, offset: i16 },
    Not { dest: Register, src_reg: Register },
    Return,
    Interrupt,
    /// Reserved opcode, faults when executed
    Reserved,
    Store { src_reg: Register, offset: i16 },
    StoreInd { src_reg: Register, offset: i16 },
    StoreOffs {
        src_reg: Register,
        base_reg: Register,
        offset: i16,
    },
    Trap { trap_vect: u8 },
    RawWord(u16),
}

// add and and commands support immediate value
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImmediateOrReg {
    Reg(Register),
    Imm5(i16),
}

impl AirStmt {
    /// Encode as a machine word.
    pub fn emit(&self) -> u16 {
        let pc9 = |offset: i16| Bits::Signed(9).mask(offset as i32);
        let dr = |reg: Register| reg.bits() << 9;
        let sr = |reg: Register| reg.bits() << 6;
        let alu = |op: Opcode, dest: Register, src_reg: Register, src_reg_imm: ImmediateOrReg| {
            let last = match src_reg_imm {
                ImmediateOrReg::Reg(reg) => Register::bits(reg),
                ImmediateOrReg::Imm5(imm) => 0x20 | Bits::Signed(5).mask(imm as i32),
            };
            op.word() | dr(dest) | sr(src_reg) | last
        };

        match *self {
            AirStmt::Add {
                dest,
                src_reg,
                src_reg_imm,
            } => alu(Opcode::Add, dest, src_reg, src_reg_imm),
            AirStmt::And {
                dest,
                src_reg,
                src_reg_imm,
            } => alu(Opcode::And, dest, src_reg, src_reg_imm),
            AirStmt::Branch { flag, offset } => {
                Opcode::Br.word() | flag.bits() << 9 | pc9(offset)
            }
            AirStmt::Jump { src_reg } => Opcode::Jmp.word() | sr(src_reg),
            AirStmt::Return => Opcode::Jmp.word() | sr(Register::R7),
            AirStmt::JumpSub { offset } => {
                Opcode::Jsr.word() | 0x800 | Bits::Signed(11).mask(offset as i32)
            }
            AirStmt::JumpSubReg { src_reg } => Opcode::Jsr.word() | sr(src_reg),
            AirStmt::Load { dest, offset } => Opcode::Ld.word() | dr(dest) | pc9(offset),
            AirStmt::LoadInd { dest, offset } => Opcode::Ldi.word() | dr(dest) | pc9(offset),
            AirStmt::LoadOffs {
                dest,
                src_reg,
                offset,
            } => {
                Opcode::Ldr.word()
                    | dr(dest)
                    | sr(src_reg)
                    | Bits::Signed(6).mask(offset as i32)
            }
            AirStmt::LoadEAddr { dest, offset } => Opcode::Lea.word() | dr(dest) | pc9(offset),
            AirStmt::Not { dest, src_reg } => Opcode::Not.word() | dr(dest) | sr(src_reg) | 0x3F,
            AirStmt::Interrupt => Opcode::Rti.word(),
            AirStmt::Reserved => Opcode::Res.word(),
            AirStmt::Store { src_reg, offset } => Opcode::St.word() | dr(src_reg) | pc9(offset),
            AirStmt::StoreInd { src_reg, offset } => {
                Opcode::Sti.word() | dr(src_reg) | pc9(offset)
            }
            AirStmt::StoreOffs {
                src_reg,
                base_reg,
                offset,
            } => {
                Opcode::Str.word()
                    | dr(src_reg)
                    | sr(base_reg)
                    | Bits::Signed(6).mask(offset as i32)
            }
            AirStmt::Trap { trap_vect } => Opcode::Trap.word() | trap_vect as u16,
            AirStmt::RawWord(word) => word,
        }
    }
}

/// A body line being encoded at a known address.
struct Line<'a> {
    cmd: &'a Command,
    program: &'a Program<'a>,
    /// Address of the first word of this line.
    addr: u16,
}

impl Line<'_> {
    fn encode(&self) -> Result<Vec<AirStmt>, AsmError> {
        match self.cmd.head() {
            // Framing lines never reach the second pass.
            Head::Empty | Head::Directive(DirKind::Orig | DirKind::End) => Ok(Vec::new()),
            Head::Directive(DirKind::Fill) => {
                let operands = self.cmd.expect_operands(".FILL", 1)?;
                let value = match self.program.symbols.get(operands[0].as_str()) {
                    Some(addr) => addr as i32,
                    None => self.literal(&operands[0])?,
                };
                if !(i16::MIN as i32..=u16::MAX as i32).contains(&value) {
                    return Err(self.cmd.error(AsmErrorKind::OutOfRange {
                        value,
                        bits: Bits::Unsigned(16),
                    }));
                }
                Ok(vec![AirStmt::RawWord(value as u16)])
            }
            Head::Directive(DirKind::Blkw) => {
                let count = self.cmd.block_len()?;
                Ok(vec![AirStmt::RawWord(0); count as usize])
            }
            Head::Directive(DirKind::Stringz) => {
                let bytes = self.cmd.string_bytes()?;
                Ok(bytes
                    .into_iter()
                    .map(|byte| AirStmt::RawWord(byte as u16))
                    // Terminating null word
                    .chain(std::iter::once(AirStmt::RawWord(0)))
                    .collect())
            }
            Head::UnknownDirective(name) => Err(self.cmd.error(AsmErrorKind::UnknownDirective {
                name: name.to_string(),
            })),
            Head::Mnemonic(name) => Ok(vec![self.instr(name)?]),
        }
    }

    /// Process operands to form a valid instruction
    fn instr(&self, name: &str) -> Result<AirStmt, AsmError> {
        let kind: InstrKind = name.parse().map_err(|()| {
            self.cmd.error(AsmErrorKind::UnknownMnemonic {
                name: name.to_string(),
            })
        })?;
        let ops = self.cmd.expect_operands(name, kind.operand_count())?;

        let stmt = match kind {
            InstrKind::Add => AirStmt::Add {
                dest: self.reg(&ops[0])?,
                src_reg: self.reg(&ops[1])?,
                src_reg_imm: self.reg_or_imm(&ops[2])?,
            },
            InstrKind::And => AirStmt::And {
                dest: self.reg(&ops[0])?,
                src_reg: self.reg(&ops[1])?,
                src_reg_imm: self.reg_or_imm(&ops[2])?,
            },
            InstrKind::Br(flag) => AirStmt::Branch {
                flag,
                offset: self.pc_offset(&ops[0], 9)?,
            },
            InstrKind::Jmp => AirStmt::Jump {
                src_reg: self.reg(&ops[0])?,
            },
            InstrKind::Jsr => AirStmt::JumpSub {
                offset: self.pc_offset(&ops[0], 11)?,
            },
            InstrKind::Jsrr => AirStmt::JumpSubReg {
                src_reg: self.reg(&ops[0])?,
            },
            InstrKind::Ld => AirStmt::Load {
                dest: self.reg(&ops[0])?,
                offset: self.pc_offset(&ops[1], 9)?,
            },
            InstrKind::Ldi => AirStmt::LoadInd {
                dest: self.reg(&ops[0])?,
                offset: self.pc_offset(&ops[1], 9)?,
            },
            InstrKind::Ldr => AirStmt::LoadOffs {
                dest: self.reg(&ops[0])?,
                src_reg: self.reg(&ops[1])?,
                offset: self.imm(&ops[2], Bits::Signed(6))? as i16,
            },
            InstrKind::Lea => AirStmt::LoadEAddr {
                dest: self.reg(&ops[0])?,
                offset: self.pc_offset(&ops[1], 9)?,
            },
            InstrKind::Not => AirStmt::Not {
                dest: self.reg(&ops[0])?,
                src_reg: self.reg(&ops[1])?,
            },
            InstrKind::Res => AirStmt::Reserved,
            InstrKind::Ret => AirStmt::Return,
            InstrKind::Rti => AirStmt::Interrupt,
            InstrKind::St => AirStmt::Store {
                src_reg: self.reg(&ops[0])?,
                offset: self.pc_offset(&ops[1], 9)?,
            },
            InstrKind::Sti => AirStmt::StoreInd {
                src_reg: self.reg(&ops[0])?,
                offset: self.pc_offset(&ops[1], 9)?,
            },
            InstrKind::Str => AirStmt::StoreOffs {
                src_reg: self.reg(&ops[0])?,
                base_reg: self.reg(&ops[1])?,
                offset: self.imm(&ops[2], Bits::Signed(6))? as i16,
            },
            InstrKind::Trap(TrapKind::Generic) => AirStmt::Trap {
                trap_vect: self.imm(&ops[0], Bits::Unsigned(8))? as u8,
            },
            InstrKind::Trap(TrapKind::Named(vect)) => AirStmt::Trap {
                trap_vect: vect.vector(),
            },
        };
        Ok(stmt)
    }

    fn reg(&self, lexeme: &Lexeme) -> Result<Register, AsmError> {
        lexeme.as_str().parse().map_err(|()| {
            self.cmd.error(AsmErrorKind::InvalidRegister {
                token: lexeme.text.clone(),
            })
        })
    }

    fn reg_or_imm(&self, lexeme: &Lexeme) -> Result<ImmediateOrReg, AsmError> {
        match lexeme.as_str().parse() {
            Ok(reg) => Ok(ImmediateOrReg::Reg(reg)),
            Err(()) => Ok(ImmediateOrReg::Imm5(
                self.imm(lexeme, Bits::Signed(5))? as i16,
            )),
        }
    }

    fn literal(&self, lexeme: &Lexeme) -> Result<i32, AsmError> {
        parse_literal(lexeme.as_str()).map_err(|_| {
            self.cmd.error(AsmErrorKind::InvalidLiteral {
                lit: lexeme.text.clone(),
            })
        })
    }

    /// Range-checked literal.
    fn imm(&self, lexeme: &Lexeme, bits: Bits) -> Result<i32, AsmError> {
        let value = self.literal(lexeme)?;
        self.check(value, bits)
    }

    fn check(&self, value: i32, bits: Bits) -> Result<i32, AsmError> {
        if bits.contains(value) {
            Ok(value)
        } else {
            Err(self.cmd.error(AsmErrorKind::OutOfRange { value, bits }))
        }
    }

    /// Offset from the incremented PC to a label, or a literal offset.
    fn pc_offset(&self, lexeme: &Lexeme, width: u8) -> Result<i16, AsmError> {
        let value = match self.program.symbols.get(lexeme.as_str()) {
            Some(target) => target as i32 - (self.addr as i32 + 1),
            None => self.literal(lexeme)?,
        };
        Ok(self.check(value, Bits::Signed(width))? as i16)
    }
}
