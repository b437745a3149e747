use std::collections::VecDeque;

/// Byte-level I/O seen by a running program.
///
/// The engine borrows a console for each step rather than owning one, so the same
/// [`RunState`](crate::RunState) can be driven by a terminal or by an in-memory buffer.
pub trait Console {
    /// Return a pending input byte without waiting.
    fn try_read_byte(&mut self) -> Option<u8>;

    /// Wait for an input byte. `None` once input is exhausted.
    fn read_byte(&mut self) -> Option<u8>;

    fn write_byte(&mut self, byte: u8);

    fn write_str(&mut self, string: &str) {
        for byte in string.bytes() {
            self.write_byte(byte);
        }
    }

    fn flush(&mut self) {}
}

/// In-memory console with scripted input, used for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        BufferConsole {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Queue more input, as if typed while the program runs.
    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    pub fn pending(&self) -> usize {
        self.input.len()
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily as UTF-8.
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl Console for BufferConsole {
    fn try_read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }
}
