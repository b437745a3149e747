use std::cell::RefCell;
use std::fmt::Display;
use std::path::Path;

use colored::Colorize;

use crate::ops::Op;

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
}

/// Suppress status lines and colour, for blackbox tests. Returns the previous value.
pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

/// Print a right-aligned status line, eg. `  Assembling target hello.asm`.
pub fn message(color: MsgColor, left: &str, right: impl Display) {
    if is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

pub fn file_message(color: MsgColor, left: &str, path: &Path) {
    message(color, left, format_args!("target {}", path.display()));
}

/// Log one executed instruction to stderr.
pub fn trace(addr: u16, instr: u16, op: &Op) {
    let line = format!("x{addr:04X}  x{instr:04X}  {op}");
    if is_minimal() {
        eprintln!("{line}");
    } else {
        eprintln!("{}", line.blue());
    }
}
