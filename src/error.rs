use std::{error::Error, fmt};

use miette::{Diagnostic, LabeledSpan, Severity, SourceCode};

use crate::parse::Bits;

/// Error produced while assembling a source file. Always fatal to that file.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AsmError {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Raw text of the offending line.
    pub text: String,
    pub kind: AsmErrorKind,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AsmErrorKind {
    /// Source contains no statements at all.
    EmptyProgram,
    MissingOrig,
    OrigOperands { found: usize },
    OrigOutOfBounds { addr: i32 },
    /// `.ORIG` anywhere but the first line.
    DuplicateOrig,
    MissingEnd,
    EndOperands { found: usize },
    /// `.END` anywhere but the last line.
    MisplacedEnd,
    InvalidLiteral { lit: String },
    UnknownMnemonic { name: String },
    UnknownDirective { name: String },
    OperandCount {
        name: String,
        expected: usize,
        found: usize,
    },
    InvalidRegister { token: String },
    OutOfRange { value: i32, bits: Bits },
    DuplicateLabel { label: String, prev: u16 },
    UnterminatedString,
    NegativeBlock { count: i32 },
    /// Program runs past the end of memory.
    ProgramTooLarge { end: u32 },
}

impl AsmError {
    pub fn new(line: usize, text: impl Into<String>, kind: AsmErrorKind) -> Self {
        AsmError {
            line,
            text: text.into(),
            kind,
        }
    }

    /// Human readable description without the line prefix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl AsmErrorKind {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyProgram
            | Self::MissingOrig
            | Self::OrigOperands { .. }
            | Self::OrigOutOfBounds { .. }
            | Self::DuplicateOrig
            | Self::MissingEnd
            | Self::EndOperands { .. }
            | Self::MisplacedEnd => "asm::framing",
            Self::InvalidLiteral { .. } => "asm::literal",
            Self::UnknownMnemonic { .. } => "asm::unknown_mnemonic",
            Self::UnknownDirective { .. } => "asm::directive",
            Self::OperandCount { .. } => "asm::operand_count",
            Self::InvalidRegister { .. } => "asm::register",
            Self::OutOfRange { .. } => "asm::range",
            Self::DuplicateLabel { .. } => "asm::duplicate_label",
            Self::UnterminatedString => "asm::string",
            Self::NegativeBlock { .. } | Self::ProgramTooLarge { .. } => "asm::size",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            Self::EmptyProgram | Self::MissingOrig | Self::DuplicateOrig => {
                "programs start with exactly one `.ORIG` directive, like `.ORIG x3000`"
            }
            Self::OrigOperands { .. } => "`.ORIG` takes exactly one address operand",
            Self::OrigOutOfBounds { .. } => "the origin must lie between x3000 and xFDFF",
            Self::MissingEnd | Self::MisplacedEnd => "programs finish with a single `.END` line",
            Self::EndOperands { .. } => "`.END` takes no operands",
            Self::InvalidLiteral { .. } => {
                "literals look like #10, x1F or b1010, or name a label defined in this file"
            }
            Self::UnknownMnemonic { .. } => "check the spelling of the instruction",
            Self::UnknownDirective { .. } => {
                "available directives are .ORIG, .END, .FILL, .BLKW and .STRINGZ"
            }
            Self::OperandCount { .. } => "check the operands for this instruction",
            Self::InvalidRegister { .. } => "registers are named R0 to R7",
            Self::OutOfRange { .. } => "use a smaller value, or move the label closer",
            Self::DuplicateLabel { .. } => "labels may only be defined once per file",
            Self::UnterminatedString => "close string literals with a matching quote",
            Self::NegativeBlock { .. } => "`.BLKW` expects a non-negative word count",
            Self::ProgramTooLarge { .. } => "the program must fit below address xFFFF",
        }
    }
}

impl Error for AsmError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error on line {}: {}", self.line, self.kind)
    }
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyProgram => write!(f, "Program contains no statements"),
            Self::MissingOrig => write!(f, "First command must be an .ORIG directive"),
            Self::OrigOperands { found } => {
                write!(f, ".ORIG requires one argument, {found} provided")
            }
            Self::OrigOutOfBounds { addr } => write!(f, "Address out of bounds: {addr:#06x}"),
            Self::DuplicateOrig => write!(f, "More than one .ORIG in program"),
            Self::MissingEnd => write!(f, "Last command must be an .END directive"),
            Self::EndOperands { found } => {
                write!(f, ".END requires no arguments, {found} provided")
            }
            Self::MisplacedEnd => write!(f, ".END must be the last command"),
            Self::InvalidLiteral { lit } => write!(f, "Invalid literal: {lit}"),
            Self::UnknownMnemonic { name } => write!(f, "Unknown command: {name}"),
            Self::UnknownDirective { name } => write!(f, "Invalid directive: {name}"),
            Self::OperandCount {
                name,
                expected,
                found,
            } => write!(
                f,
                "{found} arguments provided to {name}, {expected} arguments required"
            ),
            Self::InvalidRegister { token } => write!(f, "Invalid register: {token}"),
            Self::OutOfRange { value, bits } => {
                write!(f, "Operand: {value} cannot be represented in {bits}")
            }
            Self::DuplicateLabel { label, prev } => {
                write!(f, "Label {label} already defined at {prev:#06x}")
            }
            Self::UnterminatedString => write!(f, "Unterminated string literal"),
            Self::NegativeBlock { count } => write!(f, "Cannot reserve {count} words"),
            Self::ProgramTooLarge { end } => {
                write!(f, "Program ends at {end:#x}, past the end of memory")
            }
        }
    }
}

impl Diagnostic for AsmError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Error)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.help()))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.text)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let start = self.text.len() - self.text.trim_start().len();
        let len = self.text.trim().len();
        let label = LabeledSpan::at(start..start + len, format!("line {}", self.line));
        Some(Box::new(std::iter::once(label)))
    }
}

/// Error loading an object file into memory. The memory image is left untouched.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoadError {
    /// File does not contain an origin word.
    Empty,
    /// File length is not a whole number of words.
    Misaligned { len: usize },
    /// Origin plus word count exceeds the address space.
    TooLarge { origin: u16, words: usize },
}

impl Error for LoadError {}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Object file is empty"),
            Self::Misaligned { len } => {
                write!(f, "Object file is not aligned to 16 bits ({len} bytes)")
            }
            Self::TooLarge { origin, words } => write!(
                f,
                "Object file is too large: {words} words starting at {origin:#06x} do not fit in memory"
            ),
        }
    }
}

impl Diagnostic for LoadError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self {
            Self::Empty | Self::Misaligned { .. } => "load::format",
            Self::TooLarge { .. } => "load::size",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(
            "object files hold a 16-bit origin followed by the program words",
        ))
    }
}
