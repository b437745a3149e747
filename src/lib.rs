// Parsing
mod lexer;
mod parse;
mod command;
mod parser;
pub use parser::{AsmParser, Program};
mod air;
pub use air::{Air, AirStmt, ImmediateOrReg};
pub mod object;

// Running
mod ops;
pub use ops::{Op, Operand};
mod runtime;
pub use runtime::{HaltReason, Memory, RunState, StepResult, KBDR, KBSR};
mod console;
pub use console::{BufferConsole, Console};
pub mod term;
mod features;
pub use features::Features;
pub mod output;

mod symbol;
pub use symbol::{Flag, Register, SymbolTable, TrapVect};

mod error;
pub use error::{AsmError, AsmErrorKind, LoadError};

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;

/// Run both assembler passes over `src`.
pub fn assemble_air(src: &str) -> Result<Air, Vec<AsmError>> {
    let parser = AsmParser::new(src)?;
    let program = parser.parse()?;
    Air::encode(&program)
}

/// Assemble `src` into object file bytes.
///
/// Every error found is returned. Framing and label errors stop assembly before operands are
/// encoded.
pub fn assemble(src: &str) -> Result<Vec<u8>, Vec<AsmError>> {
    let air = assemble_air(src)?;
    Ok(object::to_bytes(air.orig(), &air.words()))
}
