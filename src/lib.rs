//! A tiny register machine.
//!
//! Source is a stream of whitespace separated words. Hex numerals `10` to `16` are opcodes,
//! `R`-prefixed words are registers, `C`-prefixed words are immediates and `A`-prefixed words are
//! labels. A [`Program`] is built once and can then be run any number of times with a fresh
//! [`RunState`].

// Building
mod lexer;
mod span;
pub use span::Span;
pub mod classify;
pub mod symbol;
mod program;
pub use program::{Program, Token};

// Running
mod runtime;
pub use runtime::{RegisterFile, RunState, Status};
pub mod output;

mod error;
pub use error::Error;

/// Amount of lines to show as context, each side of the line containing a diagnostic span.
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 3;
