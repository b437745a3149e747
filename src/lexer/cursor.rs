// Heavily inspired by and adapted from `rustc_lexer`.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

/// Peekable iterator over a char sequence.
#[derive(Clone)]
pub struct Cursor<'a> {
    len_remaining: usize,
    /// Iterator over chars in a &str
    chars: Chars<'a>,
}

pub(crate) const EOF_CHAR: char = '\0';

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_remaining: input.len(),
            chars: input.chars(),
        }
    }

    /// Peek the next character without consuming it. Returns [`EOF_CHAR`] at the end of input.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// Line is finished lexing
    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Byte offset of the cursor from the start of the input.
    pub fn pos(&self) -> usize {
        self.len_remaining - self.chars.as_str().len()
    }

    /// Advance by one character
    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Consume characters while the predicate holds or until the end of input.
    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while !self.is_eof() && predicate(self.first()) {
            self.bump();
        }
    }
}
