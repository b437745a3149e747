use std::fmt;

use crate::lexer::cursor::Cursor;

pub mod cursor;

/// A single whitespace/comma separated word of a source line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Lexeme {
    /// Text with any quote characters removed.
    pub text: String,
    /// Part of the lexeme was enclosed in quotes.
    pub quoted: bool,
}

impl Lexeme {
    pub fn new(text: impl Into<String>) -> Self {
        Lexeme {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LexError {
    /// Quote opened at the given byte offset was never closed.
    UnclosedString { offs: usize },
}

impl std::error::Error for LexError {}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnclosedString { offs } => {
                write!(f, "Unterminated string literal starting at column {}", offs + 1)
            }
        }
    }
}

/// Test if a character separates lexemes.
pub(crate) fn is_delimiter(c: char) -> bool {
    // Commas are essentially whitespace in LC3
    matches!(c, ' ' | '\t' | '\r' | ',')
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'')
}

/// Split a single source line into lexemes.
///
/// Everything after a `;` is a comment unless the `;` sits inside a quoted string. Quotes
/// switch to string mode, in which delimiters and semicolons are kept as literal content.
/// The closing quote must match the opening one. A line with no lexemes yields an empty vector.
pub fn tokenize(line: &str) -> Result<Vec<Lexeme>, LexError> {
    let mut lexer = LineLexer::new(line);
    lexer.run()?;
    Ok(lexer.lexemes)
}

struct LineLexer<'a> {
    src: &'a str,
    cur: Cursor<'a>,
    lexemes: Vec<Lexeme>,
    current: Lexeme,
}

impl<'a> LineLexer<'a> {
    fn new(src: &'a str) -> Self {
        LineLexer {
            src,
            cur: Cursor::new(src),
            lexemes: Vec::new(),
            current: Lexeme::new(""),
        }
    }

    fn run(&mut self) -> Result<(), LexError> {
        while let Some(c) = self.cur.bump() {
            match c {
                ';' => break,
                c if is_delimiter(c) => {
                    self.cur.take_while(is_delimiter);
                    self.flush();
                }
                c if is_quote(c) => self.string(c)?,
                _ => {
                    let start = self.cur.pos() - c.len_utf8();
                    self.cur
                        .take_while(|c| !is_delimiter(c) && !is_quote(c) && c != ';');
                    self.current.text.push_str(&self.src[start..self.cur.pos()]);
                }
            }
        }
        self.flush();
        Ok(())
    }

    /// Consume a quoted section; the opening quote has already been consumed.
    fn string(&mut self, quote: char) -> Result<(), LexError> {
        let offs = self.cur.pos() - quote.len_utf8();
        let start = self.cur.pos();
        self.cur.take_while(|c| c != quote);
        if self.cur.is_eof() {
            return Err(LexError::UnclosedString { offs });
        }
        self.current.text.push_str(&self.src[start..self.cur.pos()]);
        self.current.quoted = true;
        // Closing quote
        self.cur.bump();
        Ok(())
    }

    fn flush(&mut self) {
        if !self.current.text.is_empty() || self.current.quoted {
            self.lexemes.push(std::mem::replace(&mut self.current, Lexeme::new("")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        tokenize(line)
            .unwrap()
            .into_iter()
            .map(|lexeme| lexeme.text)
            .collect()
    }

    #[test]
    fn splits_on_delimiters() {
        assert_eq!(texts("ADD R0,R0,#5"), ["ADD", "R0", "R0", "#5"]);
        assert_eq!(texts("  ADD\tR0 , R1,\tR2  "), ["ADD", "R0", "R1", "R2"]);
    }

    #[test]
    fn strips_comments() {
        assert_eq!(texts("LOOP: BRnzp LOOP ; forever"), ["LOOP:", "BRnzp", "LOOP"]);
        assert!(texts("; only a comment").is_empty());
        assert!(texts("   \t ").is_empty());
        assert!(texts("").is_empty());
    }

    #[test]
    fn keeps_quoted_content() {
        let lexemes = tokenize(r#"MSG: .STRINGZ "Hi, there; you""#).unwrap();
        assert_eq!(lexemes.len(), 3);
        assert_eq!(lexemes[2].text, "Hi, there; you");
        assert!(lexemes[2].quoted);
        assert!(!lexemes[1].quoted);
    }

    #[test]
    fn quotes_must_match() {
        assert_eq!(texts(r#".STRINGZ "don't""#), [".STRINGZ", "don't"]);
        assert_eq!(texts(r#".STRINGZ 'say "hi"'"#), [".STRINGZ", "say \"hi\""]);
    }

    #[test]
    fn empty_string_is_a_lexeme() {
        let lexemes = tokenize(r#".STRINGZ """#).unwrap();
        assert_eq!(lexemes.len(), 2);
        assert_eq!(lexemes[1].text, "");
        assert!(lexemes[1].quoted);
    }

    #[test]
    fn escape_is_left_for_the_directive() {
        assert_eq!(texts(r#".STRINGZ "a\nb""#), [".STRINGZ", r"a\nb"]);
    }

    #[test]
    fn unclosed_string() {
        assert_eq!(
            tokenize(r#".STRINGZ "oops"#),
            Err(LexError::UnclosedString { offs: 9 })
        );
    }
}
