//! Object file format: a 16-bit origin followed by the program words, every word stored
//! little-endian. There is no header or footer.

use crate::error::LoadError;

/// Number of addressable words.
pub const MEMORY_MAX: usize = 0x10000;

/// Serialise an origin and its program words.
pub fn to_bytes(orig: u16, words: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + words.len() * 2);
    bytes.extend_from_slice(&orig.to_le_bytes());
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

/// Split object bytes into origin and program words, checking that they fit in memory.
pub fn from_bytes(bytes: &[u8]) -> Result<(u16, Vec<u16>), LoadError> {
    if bytes.len() % 2 != 0 {
        return Err(LoadError::Misaligned { len: bytes.len() });
    }
    let mut words = bytes
        .chunks_exact(2)
        .map(|word| u16::from_le_bytes([word[0], word[1]]));
    let orig = words.next().ok_or(LoadError::Empty)?;
    let words: Vec<u16> = words.collect();
    if orig as usize + words.len() > MEMORY_MAX {
        return Err(LoadError::TooLarge {
            origin: orig,
            words: words.len(),
        });
    }
    Ok((orig, words))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_layout() {
        assert_eq!(to_bytes(0x3000, &[0x1025]), [0x00, 0x30, 0x25, 0x10]);
        assert_eq!(from_bytes(&[0x00, 0x30, 0x25, 0x10]), Ok((0x3000, vec![0x1025])));
    }

    #[test]
    fn origin_only() {
        assert_eq!(from_bytes(&[0x00, 0x40]), Ok((0x4000, vec![])));
    }

    #[test]
    fn rejects_bad_files() {
        assert_eq!(from_bytes(&[]), Err(LoadError::Empty));
        assert_eq!(from_bytes(&[0x00, 0x30, 0x25]), Err(LoadError::Misaligned { len: 3 }));
        assert_eq!(
            from_bytes(&[0xFF, 0xFF, 0x01, 0x00, 0x02, 0x00]),
            Err(LoadError::TooLarge {
                origin: 0xFFFF,
                words: 2
            })
        );
    }

    #[test]
    fn fills_to_end_of_memory() {
        assert!(from_bytes(&[0xFF, 0xFF, 0x01, 0x00]).is_ok());
    }
}
