use crate::{
    error::{AsmError, AsmErrorKind},
    lexer::{self, LexError, Lexeme},
    parse::{parse_literal, unescape},
    symbol::DirKind,
};

/// One non-blank line of assembly, split into lexemes.
#[derive(Clone, Debug)]
pub struct Command {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Raw line as written, used for diagnostics.
    pub text: String,
    pub lexemes: Vec<Lexeme>,
}

/// What the lexeme after an optional label names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Head<'a> {
    /// Line holds only a label.
    Empty,
    Directive(DirKind),
    /// Starts with `.` but is not a known directive.
    UnknownDirective(&'a str),
    Mnemonic(&'a str),
}

impl Command {
    /// Lex a raw line. Returns `Ok(None)` for lines that contain nothing but whitespace
    /// and comments.
    pub fn new(line: usize, text: &str) -> Result<Option<Command>, AsmError> {
        let lexemes = lexer::tokenize(text).map_err(|e| match e {
            LexError::UnclosedString { .. } => {
                AsmError::new(line, text, AsmErrorKind::UnterminatedString)
            }
        })?;
        if lexemes.is_empty() {
            return Ok(None);
        }
        Ok(Some(Command {
            line,
            text: text.to_string(),
            lexemes,
        }))
    }

    /// Build an error pointing at this line.
    pub fn error(&self, kind: AsmErrorKind) -> AsmError {
        AsmError::new(self.line, &self.text, kind)
    }

    /// First lexeme ends in `:`.
    pub fn is_label(&self) -> bool {
        self.lexemes[0].text.ends_with(':') && !self.lexemes[0].quoted
    }

    /// Label defined by this line, without the colon.
    pub fn label(&self) -> Option<&str> {
        if self.is_label() {
            let text = &self.lexemes[0].text;
            Some(&text[..text.len() - 1])
        } else {
            None
        }
    }

    /// Index of the command lexeme.
    fn head_idx(&self) -> usize {
        usize::from(self.is_label())
    }

    /// The command lexeme starts with `.`.
    pub fn is_directive(&self) -> bool {
        self.lexemes
            .get(self.head_idx())
            .is_some_and(|lexeme| lexeme.text.starts_with('.'))
    }

    pub fn head(&self) -> Head<'_> {
        match self.lexemes.get(self.head_idx()) {
            None => Head::Empty,
            Some(lexeme) if self.is_directive() => match lexeme.text.parse() {
                Ok(dir) => Head::Directive(dir),
                Err(()) => Head::UnknownDirective(&lexeme.text),
            },
            Some(lexeme) => Head::Mnemonic(&lexeme.text),
        }
    }

    /// Lexemes following the command lexeme.
    pub fn operands(&self) -> &[Lexeme] {
        self.lexemes.get(self.head_idx() + 1..).unwrap_or(&[])
    }

    /// Fail unless exactly `expected` operands follow the command lexeme.
    pub fn expect_operands(&self, name: &str, expected: usize) -> Result<&[Lexeme], AsmError> {
        let operands = self.operands();
        if operands.len() != expected {
            return Err(self.error(AsmErrorKind::OperandCount {
                name: name.to_string(),
                expected,
                found: operands.len(),
            }));
        }
        Ok(operands)
    }

    /// Number of memory words this line occupies.
    ///
    /// Both passes advance their address counter with this function, so label addresses
    /// computed in the first pass agree with where the second pass places each word.
    pub fn words(&self) -> Result<u32, AsmError> {
        match self.head() {
            Head::Empty => Ok(0),
            Head::Directive(DirKind::Orig | DirKind::End) => Ok(0),
            Head::Directive(DirKind::Fill) => {
                self.expect_operands(".FILL", 1)?;
                Ok(1)
            }
            Head::Directive(DirKind::Blkw) => self.block_len(),
            Head::Directive(DirKind::Stringz) => Ok(self.string_bytes()?.len() as u32 + 1),
            Head::UnknownDirective(name) => Err(self.error(AsmErrorKind::UnknownDirective {
                name: name.to_string(),
            })),
            Head::Mnemonic(_) => Ok(1),
        }
    }

    /// Word count of a `.BLKW` line.
    pub fn block_len(&self) -> Result<u32, AsmError> {
        let operands = self.expect_operands(".BLKW", 1)?;
        let lit = operands[0].as_str();
        let count = parse_literal(lit).map_err(|_| {
            self.error(AsmErrorKind::InvalidLiteral {
                lit: lit.to_string(),
            })
        })?;
        u32::try_from(count).map_err(|_| self.error(AsmErrorKind::NegativeBlock { count }))
    }

    /// Bytes of a `.STRINGZ` line after escape expansion, excluding the terminator.
    pub fn string_bytes(&self) -> Result<Vec<u8>, AsmError> {
        let operands = self.expect_operands(".STRINGZ", 1)?;
        Ok(unescape(operands[0].as_str()).as_bytes().to_vec())
    }
}
