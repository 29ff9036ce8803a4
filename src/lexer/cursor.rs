// Heavily inspired and referenced from `rustc_lexer` and adapted to suit the project.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

/// Peekable iterator over a char sequence.
pub struct Cursor<'a> {
    /// Byte length of the input that has not been consumed yet
    len_remaining: usize,
    /// Byte offset of the start of the current token
    tok_start: usize,
    /// Iterator over chars in a &str
    chars: Chars<'a>,
    src: &'a str,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_remaining: input.len(),
            tok_start: 0,
            chars: input.chars(),
            src: input,
        }
    }

    /// Peek at the next char without consuming it. Returns `'\0'` at end of input.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or('\0')
    }

    /// File is finished parsing
    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Move to the next character
    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Consume characters while `pred` holds or until end of input
    pub fn take_while(&mut self, mut pred: impl FnMut(char) -> bool) {
        while pred(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    /// Byte length consumed since the last [`Cursor::reset_pos`]
    pub fn pos_in_token(&self) -> u32 {
        (self.len_remaining - self.chars.as_str().len()) as u32
    }

    /// Byte offset of the current token inside the source
    pub fn tok_start(&self) -> usize {
        self.tok_start
    }

    /// Slice of the source covered by the current token
    pub fn tok_str(&self) -> &'a str {
        let end = self.tok_start + self.pos_in_token() as usize;
        &self.src[self.tok_start..end]
    }

    /// Begin a new token at the current position
    pub fn reset_pos(&mut self) {
        self.tok_start += self.pos_in_token() as usize;
        self.len_remaining = self.chars.as_str().len();
    }
}
