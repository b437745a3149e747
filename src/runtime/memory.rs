use crate::{console::Console, object::MEMORY_MAX};

/// Keyboard status register. Bit 15 is set while a key is waiting in [`KBDR`].
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register.
pub const KBDR: u16 = 0xFE02;

const KEY_READY: u16 = 0x8000;

/// Flat 16-bit address space.
pub struct Memory {
    data: Box<[u16]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            data: vec![0; MEMORY_MAX].into_boxed_slice(),
        }
    }

    /// Read a word as the CPU does.
    ///
    /// Reading [`KBSR`] polls the console. A pending byte is latched into [`KBDR`] and the
    /// ready bit is set; otherwise the status reads zero. Nothing is cached between polls.
    pub fn load(&mut self, addr: u16, console: &mut dyn Console) -> u16 {
        if addr == KBSR {
            match console.try_read_byte() {
                Some(byte) => {
                    self.data[KBSR as usize] = KEY_READY;
                    self.data[KBDR as usize] = byte as u16;
                }
                None => self.data[KBSR as usize] = 0,
            }
        }
        self.data[addr as usize]
    }

    /// Read a word without device side effects.
    pub fn peek(&self, addr: u16) -> u16 {
        self.data[addr as usize]
    }

    pub fn store(&mut self, addr: u16, val: u16) {
        self.data[addr as usize] = val;
    }

    /// Copy `words` into memory starting at `orig`. Caller checks that they fit.
    pub fn write_block(&mut self, orig: u16, words: &[u16]) {
        let start = orig as usize;
        self.data[start..start + words.len()].copy_from_slice(words);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
