use std::collections::VecDeque;
use std::io::{self, stdin, stdout, IsTerminal, Read, Stdout, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEvent},
    terminal,
};

use crate::console::Console;

/// Exit status after `Ctrl+C`, as a shell reports `SIGINT`.
const INTERRUPT_EXIT: i32 = 130;

/// Keeps the terminal in raw mode while alive.
pub struct RawMode(());

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode(()))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

enum Input {
    /// Interactive terminal read through key events.
    Keys { _guard: RawMode },
    /// Piped stdin, fed by a reader thread so polls never block.
    Piped(Receiver<u8>),
}

/// Console attached to the process's stdin and stdout.
pub struct TerminalConsole {
    input: Input,
    /// Bytes of a multi-byte character not yet handed out.
    pending: VecDeque<u8>,
    out: Stdout,
}

impl TerminalConsole {
    /// Attach to the terminal, entering raw mode if stdin is interactive.
    pub fn new() -> io::Result<Self> {
        let input = if stdin().is_terminal() {
            Input::Keys {
                _guard: RawMode::enable()?,
            }
        } else {
            Input::Piped(spawn_reader())
        };
        Ok(TerminalConsole {
            input,
            pending: VecDeque::new(),
            out: stdout(),
        })
    }

    fn is_raw(&self) -> bool {
        matches!(self.input, Input::Keys { .. })
    }

    /// Queue the bytes of a key press and return the first.
    fn push_char(&mut self, ch: char) -> Option<u8> {
        let mut bytes = [0u8; 4];
        self.pending.extend(ch.encode_utf8(&mut bytes).as_bytes());
        self.pending.pop_front()
    }
}

impl Console for TerminalConsole {
    fn try_read_byte(&mut self) -> Option<u8> {
        if let Some(byte) = self.pending.pop_front() {
            return Some(byte);
        }
        if let Input::Piped(rx) = &self.input {
            return rx.try_recv().ok();
        }
        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(event) = event::read() else {
                return None;
            };
            if let Some(ch) = key_char(event) {
                return self.push_char(ch);
            }
        }
        None
    }

    fn read_byte(&mut self) -> Option<u8> {
        if let Some(byte) = self.pending.pop_front() {
            return Some(byte);
        }
        if let Input::Piped(rx) = &self.input {
            return rx.recv().ok();
        }
        loop {
            let event = event::read().ok()?;
            if let Some(ch) = key_char(event) {
                return self.push_char(ch);
            }
        }
    }

    fn write_byte(&mut self, byte: u8) {
        // Raw mode does not translate newlines
        let _ = if byte == b'\n' && self.is_raw() {
            self.out.write_all(b"\r\n")
        } else {
            self.out.write_all(&[byte])
        };
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

fn spawn_reader() -> Receiver<u8> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for byte in stdin().lock().bytes() {
            let Ok(byte) = byte else { break };
            if tx.send(byte).is_err() {
                break;
            }
        }
    });
    rx
}

/// Character typed by a key press, if any.
///
/// `Ctrl+C` will always return the terminal to normal state and exit.
fn key_char(event: Event) -> Option<char> {
    use event::{KeyCode, KeyEventKind, KeyModifiers as Mod};

    let Event::Key(KeyEvent {
        code,
        modifiers,
        kind,
        ..
    }) = event
    else {
        return None;
    };
    if matches!(kind, KeyEventKind::Release) {
        return None;
    }

    match (modifiers, code) {
        (Mod::CONTROL, KeyCode::Char('c')) => {
            let _ = terminal::disable_raw_mode();
            println!();
            std::process::exit(INTERRUPT_EXIT);
        }
        (_, KeyCode::Enter) => Some('\n'),
        (_, KeyCode::Backspace) => Some('\x08'),
        (_, KeyCode::Tab) => Some('\t'),
        (_, KeyCode::Esc) => Some('\x1b'),
        (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => Some(ch),
        _ => None,
    }
}
