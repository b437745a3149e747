use crate::{
    command::{Command, Head},
    error::{AsmError, AsmErrorKind},
    parse::parse_literal,
    symbol::{DirKind, SymbolTable},
};

/// Lowest address a program may be loaded at.
pub const ORIG_MIN: u16 = 0x3000;
/// Highest address a program may be loaded at; device registers start above it.
pub const ORIG_MAX: u16 = 0xFDFF;
/// One past the last addressable word.
const ADDR_END: u32 = 0x10000;

/// Splits source into commands and performs the first pass.
pub struct AsmParser {
    commands: Vec<Command>,
}

/// Result of the first pass: a framed program with every label resolved to an address.
#[derive(Debug)]
pub struct Program<'a> {
    /// Address of the first program word.
    pub orig: u16,
    /// Commands between `.ORIG` and `.END`.
    pub body: &'a [Command],
    pub symbols: SymbolTable,
}

impl AsmParser {
    /// Lex every line of `src`. Blank and comment-only lines are dropped.
    pub fn new(src: &str) -> Result<Self, Vec<AsmError>> {
        let mut commands = Vec::new();
        let mut errors = Vec::new();
        for (i, line) in src.lines().enumerate() {
            match Command::new(i + 1, line) {
                Ok(Some(cmd)) => commands.push(cmd),
                Ok(None) => (),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(AsmParser { commands })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Validate `.ORIG`/`.END` framing and build the symbol table.
    pub fn parse(&self) -> Result<Program<'_>, Vec<AsmError>> {
        let (first, last) = match (self.commands.first(), self.commands.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(vec![AsmError::new(1, "", AsmErrorKind::EmptyProgram)]),
        };

        let orig = check_orig(first);
        let end = if self.commands.len() < 2 {
            Err(last.error(AsmErrorKind::MissingEnd))
        } else {
            check_end(last)
        };
        let orig = match (orig, end) {
            (Ok(orig), Ok(())) => orig,
            (orig, end) => {
                return Err(orig.err().into_iter().chain(end.err()).collect());
            }
        };

        let body = &self.commands[1..self.commands.len() - 1];
        let symbols = build_table(orig, body)?;
        Ok(Program {
            orig,
            body,
            symbols,
        })
    }
}

fn check_orig(cmd: &Command) -> Result<u16, AsmError> {
    if cmd.is_label() || cmd.head() != Head::Directive(DirKind::Orig) {
        return Err(cmd.error(AsmErrorKind::MissingOrig));
    }
    let operands = cmd.operands();
    if operands.len() != 1 {
        return Err(cmd.error(AsmErrorKind::OrigOperands {
            found: operands.len(),
        }));
    }
    let lit = operands[0].as_str();
    let addr = parse_literal(lit).map_err(|_| {
        cmd.error(AsmErrorKind::InvalidLiteral {
            lit: lit.to_string(),
        })
    })?;
    if !(ORIG_MIN as i32..=ORIG_MAX as i32).contains(&addr) {
        return Err(cmd.error(AsmErrorKind::OrigOutOfBounds { addr }));
    }
    Ok(addr as u16)
}

fn check_end(cmd: &Command) -> Result<(), AsmError> {
    if cmd.is_label() || cmd.head() != Head::Directive(DirKind::End) {
        return Err(cmd.error(AsmErrorKind::MissingEnd));
    }
    if !cmd.operands().is_empty() {
        return Err(cmd.error(AsmErrorKind::EndOperands {
            found: cmd.operands().len(),
        }));
    }
    Ok(())
}

/// Walk the program body, assigning each label the address of the word its line starts at.
fn build_table(orig: u16, body: &[Command]) -> Result<SymbolTable, Vec<AsmError>> {
    let mut symbols = SymbolTable::new();
    let mut errors = Vec::new();
    let mut addr = orig as u32;
    let mut overflowed = false;

    for cmd in body {
        if let Some(label) = cmd.label() {
            if addr >= ADDR_END {
                // A label on the word after the last one has no address
                if !overflowed {
                    overflowed = true;
                    errors.push(cmd.error(AsmErrorKind::ProgramTooLarge {
                        end: addr.saturating_add(1),
                    }));
                }
            } else if let Err(prev) = symbols.insert(label, addr as u16) {
                errors.push(cmd.error(AsmErrorKind::DuplicateLabel {
                    label: label.to_string(),
                    prev,
                }));
            }
        }
        match cmd.head() {
            Head::Directive(DirKind::Orig) => {
                errors.push(cmd.error(AsmErrorKind::DuplicateOrig));
                continue;
            }
            Head::Directive(DirKind::End) => {
                errors.push(cmd.error(AsmErrorKind::MisplacedEnd));
                continue;
            }
            _ => (),
        }
        match cmd.words() {
            Ok(words) => addr = addr.saturating_add(words),
            Err(e) => errors.push(e),
        }
        if addr > ADDR_END && !overflowed {
            overflowed = true;
            errors.push(cmd.error(AsmErrorKind::ProgramTooLarge { end: addr }));
        }
    }

    if errors.is_empty() {
        Ok(symbols)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> (u16, Vec<(String, u16)>) {
        let parser = AsmParser::new(src).unwrap();
        let program = parser.parse().unwrap();
        let symbols = program
            .symbols
            .iter()
            .map(|(label, addr)| (label.to_string(), addr))
            .collect();
        (program.orig, symbols)
    }

    fn parse_err(src: &str) -> Vec<AsmError> {
        let parser = AsmParser::new(src).unwrap();
        parser.parse().unwrap_err()
    }

    #[test]
    fn labels_follow_directive_sizes() {
        let (orig, symbols) = parse_ok(
            r#"
            .ORIG x3000
            START: LEA R0, MSG
                   PUTS
            MSG:   .STRINGZ "ab"
            BUF:   .BLKW 3
            ONE:   .FILL #1
            NL:    .STRINGZ "x\n"
            LAST:  HALT
            .END
            "#,
        );
        assert_eq!(orig, 0x3000);
        let expected = [
            ("START", 0x3000),
            ("MSG", 0x3002),
            ("BUF", 0x3005),
            ("ONE", 0x3008),
            ("NL", 0x3009),
            ("LAST", 0x300C),
        ];
        assert_eq!(symbols.len(), expected.len());
        for ((label, addr), (exp_label, exp_addr)) in symbols.iter().zip(expected) {
            assert_eq!(label, exp_label);
            assert_eq!(*addr, exp_addr, "{label}");
        }
    }

    #[test]
    fn label_only_line_names_next_word() {
        let (_, symbols) = parse_ok(".ORIG x4000\nADD R0,R0,#1\nDONE:\nHALT\n.END");
        assert_eq!(symbols, [("DONE".to_string(), 0x4001)]);
    }

    #[test]
    fn comments_and_blank_lines_do_not_advance() {
        let (_, symbols) = parse_ok(".ORIG x3000\n\n; hello\nA: ADD R0,R0,#1\n   \nB: HALT\n.END");
        assert_eq!(symbols[1], ("B".to_string(), 0x3001));
    }

    #[test]
    fn missing_orig() {
        let errs = parse_err("ADD R0,R0,#1\n.END");
        assert_eq!(errs[0].kind, AsmErrorKind::MissingOrig);
        assert_eq!(errs[0].line, 1);
    }

    #[test]
    fn orig_bounds() {
        let errs = parse_err(".ORIG x2FFF\n.END");
        assert_eq!(errs[0].kind, AsmErrorKind::OrigOutOfBounds { addr: 0x2FFF });
        let errs = parse_err(".ORIG xFE00\n.END");
        assert_eq!(errs[0].kind, AsmErrorKind::OrigOutOfBounds { addr: 0xFE00 });
        assert!(AsmParser::new(".ORIG xFDFF\n.END").unwrap().parse().is_ok());
    }

    #[test]
    fn orig_operands() {
        let errs = parse_err(".ORIG\n.END");
        assert_eq!(errs[0].kind, AsmErrorKind::OrigOperands { found: 0 });
        let errs = parse_err(".ORIG x3000 x4000\n.END");
        assert_eq!(errs[0].kind, AsmErrorKind::OrigOperands { found: 2 });
        let errs = parse_err(".ORIG START\n.END");
        assert_eq!(
            errs[0].kind,
            AsmErrorKind::InvalidLiteral {
                lit: "START".into()
            }
        );
    }

    #[test]
    fn end_framing() {
        let errs = parse_err(".ORIG x3000\nHALT");
        assert_eq!(errs[0].kind, AsmErrorKind::MissingEnd);
        assert_eq!(errs[0].line, 2);
        let errs = parse_err(".ORIG x3000\nHALT\n.END x1");
        assert_eq!(errs[0].kind, AsmErrorKind::EndOperands { found: 1 });
        let errs = parse_err(".ORIG x3000");
        assert_eq!(errs[0].kind, AsmErrorKind::MissingEnd);
        let errs = parse_err(".ORIG x3000\n.END\nHALT\n.END");
        assert_eq!(errs[0].kind, AsmErrorKind::MisplacedEnd);
        let errs = parse_err(".ORIG x3000\n.ORIG x4000\n.END");
        assert_eq!(errs[0].kind, AsmErrorKind::DuplicateOrig);
    }

    #[test]
    fn both_framing_errors_reported() {
        let errs = parse_err("HALT\nHALT");
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].kind, AsmErrorKind::MissingOrig);
        assert_eq!(errs[1].kind, AsmErrorKind::MissingEnd);
    }

    #[test]
    fn empty_program() {
        let errs = AsmParser::new("; nothing\n\n").unwrap().parse().unwrap_err();
        assert_eq!(errs[0].kind, AsmErrorKind::EmptyProgram);
    }

    #[test]
    fn unknown_directive_names_line() {
        let errs = parse_err(".ORIG x3000\nHALT\nX: .WORD 1\n.END");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line, 3);
        assert_eq!(
            errs[0].kind,
            AsmErrorKind::UnknownDirective {
                name: ".WORD".into()
            }
        );
    }

    #[test]
    fn duplicate_label() {
        let errs = parse_err(".ORIG x3000\nA: HALT\nA: HALT\n.END");
        assert_eq!(
            errs[0].kind,
            AsmErrorKind::DuplicateLabel {
                label: "A".into(),
                prev: 0x3000
            }
        );
        assert_eq!(errs[0].line, 3);
    }

    #[test]
    fn program_past_end_of_memory() {
        let errs = parse_err(".ORIG xFD00\n.BLKW x400\n.END");
        assert_eq!(errs[0].kind, AsmErrorKind::ProgramTooLarge { end: 0x10100 });
        // Filling memory exactly is allowed
        assert!(AsmParser::new(".ORIG xFD00\n.BLKW x300\n.END").unwrap().parse().is_ok());
    }

    #[test]
    fn huge_blocks_do_not_wrap_address() {
        let errs = parse_err(".ORIG x3000\n.BLKW x7FFFFFFF\n.BLKW x7FFFFFFF\n.BLKW x7FFFFFFF\n.END");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line, 2);
        assert!(matches!(errs[0].kind, AsmErrorKind::ProgramTooLarge { .. }));
    }

    #[test]
    fn label_past_end_of_memory() {
        let errs = parse_err(".ORIG xFDFF\nPTR: .FILL TAIL\n.BLKW x200\nTAIL:\n.END");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line, 4);
        assert_eq!(errs[0].kind, AsmErrorKind::ProgramTooLarge { end: 0x10001 });
    }

    #[test]
    fn lex_errors_collected() {
        let errs = AsmParser::new(".ORIG x3000\nA: .STRINGZ \"x\nB: .STRINGZ 'y\n.END")
            .err()
            .unwrap();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[1].line, 3);
    }
}
