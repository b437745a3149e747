use std::fmt;

use crate::{
    air::Air,
    console::Console,
    error::LoadError,
    features::Features,
    object,
    ops::{Op, Operand},
    output,
    symbol::Register,
};

mod memory;
mod trap;

pub use memory::{Memory, KBDR, KBSR};

/// Address execution starts at unless the loader says otherwise.
pub const DEFAULT_PC: u16 = 0x3000;
/// Supervisor mode with the zero flag set.
pub const DEFAULT_PSR: u16 = 0x0002;

/// Bit 15 of the status word: set while in user mode.
const PRIVILEGE: u16 = 0x8000;
const FLAG_MASK: u16 = 0b111;

/// Complete machine state of one LC-3.
pub struct RunState {
    mem: Memory,
    /// Program counter
    pc: u16,
    /// 8x 16-bit registers
    reg: [u16; 8],
    /// Processor status register. Condition codes live in the low 3 bits.
    psr: u16,
    halted: Option<HaltReason>,
    features: Features,
}

/// Whether the machine can keep stepping.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepResult {
    Running,
    Halted,
}

/// Why execution stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HaltReason {
    /// The program called `HALT`.
    Halt,
    /// The reserved opcode was executed.
    IllegalOpcode,
    /// `RTI` was executed in user mode.
    PrivilegeViolation,
    /// A trap with no handler, only with `strict-traps` enabled.
    UnknownTrap(u8),
}

impl HaltReason {
    pub fn is_fault(self) -> bool {
        self != HaltReason::Halt
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Halt => write!(f, "halt"),
            HaltReason::IllegalOpcode => write!(f, "illegal opcode"),
            HaltReason::PrivilegeViolation => write!(f, "privilege mode violation"),
            HaltReason::UnknownTrap(vect) => write!(f, "unknown trap vector x{vect:02X}"),
        }
    }
}

impl RunState {
    pub fn new() -> Self {
        Self::with_features(Features::default())
    }

    pub fn with_features(features: Features) -> Self {
        RunState {
            mem: Memory::new(),
            pc: DEFAULT_PC,
            reg: [0; 8],
            psr: DEFAULT_PSR,
            halted: None,
            features,
        }
    }

    /// Copy an object image into memory, returning its origin.
    ///
    /// The image is validated before any word is written, so a rejected file leaves memory
    /// untouched. The program counter is not moved.
    pub fn load_object(&mut self, bytes: &[u8]) -> Result<u16, LoadError> {
        let (orig, words) = object::from_bytes(bytes)?;
        self.mem.write_block(orig, &words);
        Ok(orig)
    }

    /// Copy an assembled program into memory, returning its origin.
    pub fn load_air(&mut self, air: &Air) -> u16 {
        self.mem.write_block(air.orig(), &air.words());
        air.orig()
    }

    /// Step until the machine halts.
    pub fn run(&mut self, console: &mut dyn Console) -> HaltReason {
        loop {
            self.step(console);
            if let Some(reason) = self.halted {
                console.flush();
                return reason;
            }
        }
    }

    /// Fetch, decode and execute one instruction. Does nothing once halted.
    pub fn step(&mut self, console: &mut dyn Console) -> StepResult {
        if self.halted.is_some() {
            return StepResult::Halted;
        }
        let addr = self.pc;
        let instr = self.mem.load(addr, console);
        // PC incremented before instruction is performed
        self.pc = self.pc.wrapping_add(1);
        let op = Op::decode(instr);
        if self.features.trace {
            output::trace(addr, instr, &op);
        }
        self.execute(op, console);

        match self.halted {
            Some(_) => StepResult::Halted,
            None => StepResult::Running,
        }
    }

    fn execute(&mut self, op: Op, console: &mut dyn Console) {
        match op {
            Op::Br { flag, offset } => {
                let cond = flag.map_or(0, |flag| flag.bits());
                if cond & self.flags() != 0 {
                    self.pc = self.pc.wrapping_add(offset);
                }
            }
            Op::Add { dest, src, operand } => {
                let val = self.reg(src).wrapping_add(self.operand(operand));
                self.set_reg_flags(dest, val);
            }
            Op::And { dest, src, operand } => {
                let val = self.reg(src) & self.operand(operand);
                self.set_reg_flags(dest, val);
            }
            Op::Not { dest, src } => {
                let val = !self.reg(src);
                self.set_reg_flags(dest, val);
            }
            Op::Ld { dest, offset } => {
                let val = self.mem.load(self.pc.wrapping_add(offset), console);
                self.set_reg_flags(dest, val);
            }
            Op::Ldi { dest, offset } => {
                let ptr = self.mem.load(self.pc.wrapping_add(offset), console);
                let val = self.mem.load(ptr, console);
                self.set_reg_flags(dest, val);
            }
            Op::Ldr { dest, base, offset } => {
                let val = self.mem.load(self.reg(base).wrapping_add(offset), console);
                self.set_reg_flags(dest, val);
            }
            Op::Lea { dest, offset } => {
                let val = self.pc.wrapping_add(offset);
                self.set_reg_flags(dest, val);
            }
            Op::St { src, offset } => {
                self.mem.store(self.pc.wrapping_add(offset), self.reg(src));
            }
            Op::Sti { src, offset } => {
                let ptr = self.mem.load(self.pc.wrapping_add(offset), console);
                self.mem.store(ptr, self.reg(src));
            }
            Op::Str { src, base, offset } => {
                self.mem
                    .store(self.reg(base).wrapping_add(offset), self.reg(src));
            }
            Op::Jmp { base } => self.pc = self.reg(base),
            Op::Jsr { offset } => {
                self.set_reg(Register::R7, self.pc);
                self.pc = self.pc.wrapping_add(offset);
            }
            Op::Jsrr { base } => {
                // Base is read first so `JSRR R7` jumps to the old R7
                let target = self.reg(base);
                self.set_reg(Register::R7, self.pc);
                self.pc = target;
            }
            Op::Rti => self.rti(console),
            Op::Reserved => self.fault(HaltReason::IllegalOpcode, console),
            Op::Trap { vect } => self.trap(vect, console),
        }
    }

    fn rti(&mut self, console: &mut dyn Console) {
        if self.psr & PRIVILEGE != 0 {
            self.fault(HaltReason::PrivilegeViolation, console);
            return;
        }
        let sp = self.reg(Register::R6);
        self.pc = self.mem.load(sp, console);
        self.psr = self.mem.load(sp.wrapping_add(1), console);
        self.set_reg(Register::R6, sp.wrapping_add(2));
    }

    /// Report an execution fault on the console and stop.
    fn fault(&mut self, reason: HaltReason, console: &mut dyn Console) {
        console.write_str(&format!("\n{}\n", reason.to_string().to_uppercase()));
        console.flush();
        self.halted = Some(reason);
    }

    fn operand(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Reg(reg) => self.reg(reg),
            Operand::Imm(imm) => imm,
        }
    }

    fn set_reg_flags(&mut self, reg: Register, val: u16) {
        self.set_reg(reg, val);
        self.set_flags(val);
    }

    #[inline]
    pub fn reg(&self, reg: Register) -> u16 {
        self.reg[reg.bits() as usize]
    }

    #[inline]
    pub fn set_reg(&mut self, reg: Register, val: u16) {
        self.reg[reg.bits() as usize] = val;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// Processor status word.
    pub fn psr(&self) -> u16 {
        self.psr
    }

    pub fn set_psr(&mut self, psr: u16) {
        self.psr = psr;
    }

    /// Condition codes as `nzp` bits.
    pub fn flags(&self) -> u16 {
        self.psr & FLAG_MASK
    }

    /// Clear the condition codes and set exactly one from the sign of `val`.
    pub fn set_flags(&mut self, val: u16) {
        let flag = match val as i16 {
            v if v < 0 => 0b100,
            0 => 0b010,
            _ => 0b001,
        };
        self.psr = (self.psr & !FLAG_MASK) | flag;
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halted
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
