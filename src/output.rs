use std::cell::RefCell;
use std::fmt::Display;
use std::io::{self, Write};

use colored::Colorize;

use crate::symbol::CmpFlag;

/// Write one integer as a decimal line. This is all the program itself can print.
pub fn print_int<W: Write + ?Sized>(out: &mut W, value: i32) -> io::Result<()> {
    writeln!(out, "{value}")
}

#[allow(unused)]
#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
}

/// Suppress status lines, leaving only program output and errors. Returns the old value.
pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

/// Print a right-aligned colored status line to stderr, eg. `  Assembling target prog.txt`.
pub fn message(color: MsgColor, left: &str, right: impl Display) {
    if is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}

/// Print one executed instruction to stderr.
pub fn trace(pc: usize, words: &[&str], flag: CmpFlag) {
    let line = format!("{pc:>5}  {:<24} cmp={flag}", words.join(" "));
    eprintln!("{}", line.dimmed());
}
