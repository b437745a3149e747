use std::{borrow::Cow, fmt, num::ParseIntError};

/// Parse a numeric literal.
///
/// `#` prefix is decimal, `x` is hexadecimal, `b` is binary and no prefix is decimal
/// (`0x` is also read as hexadecimal). A `-` may follow the prefix. When the digits do not
/// parse in their radix, they are tried once more as binary before giving up.
pub fn parse_literal(s: &str) -> Result<i32, ParseIntError> {
    let (radix, digits) = match s.as_bytes() {
        [b'#', ..] => (10, &s[1..]),
        [b'0', b'x' | b'X', ..] => (16, &s[2..]),
        [b'x' | b'X', ..] => (16, &s[1..]),
        [b'b' | b'B', ..] => (2, &s[1..]),
        _ => (10, s),
    };
    i32::from_str_radix(digits, radix).or_else(|e| {
        if radix == 2 {
            Err(e)
        } else {
            i32::from_str_radix(digits, 2)
        }
    })
}

// Convenient way to pass around bit limits
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bits {
    Signed(u8),
    Unsigned(u8),
}

impl Bits {
    /// Whether `val` can be represented in this field.
    pub fn contains(self, val: i32) -> bool {
        match self {
            Bits::Signed(num_bits) => {
                let range = 1i32 << (num_bits - 1);
                (-range..range).contains(&val)
            }
            Bits::Unsigned(num_bits) => (0..1i32 << num_bits).contains(&val),
        }
    }

    pub fn width(self) -> u8 {
        match self {
            Bits::Signed(val) | Bits::Unsigned(val) => val,
        }
    }

    /// Truncate an in-range value to the low bits of the field.
    pub fn mask(self, val: i32) -> u16 {
        (val as u16) & ((1u32 << self.width()) - 1) as u16
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bits::Signed(val) => write!(f, "{val} bits (signed)"),
            Bits::Unsigned(val) => write!(f, "{val} bits (unsigned)"),
        }
    }
}

/// Expand `\n` escapes in `.STRINGZ` text. Any other backslash is kept as written.
pub fn unescape(s: &str) -> Cow<str> {
    if !s.contains("\\n") {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace("\\n", "\n"))
}
