use crate::lexer::cursor::Cursor;
use crate::span::{Idx, Span};

pub mod cursor;

/// A raw whitespace-delimited word, not yet classified.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Word<'a> {
    pub text: &'a str,
    pub span: Span,
}

/// Test if a character separates words. Line breaks and runs of blanks all collapse to a single
/// separator.
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\t' | '\r')
}

/// Split source text into words, in source order.
pub fn tokenize(input: &str) -> impl Iterator<Item = Word<'_>> + '_ {
    let mut cursor = Cursor::new(input);
    std::iter::from_fn(move || cursor.advance_word())
}

impl<'a> Cursor<'a> {
    /// Skip leading whitespace and return the next word, if any.
    pub fn advance_word(&mut self) -> Option<Word<'a>> {
        self.take_while(is_whitespace);
        self.reset_pos();
        if self.is_eof() {
            return None;
        }
        self.take_while(|c| !is_whitespace(c));
        let word = Word {
            text: self.tok_str(),
            span: Span::new(Idx(self.tok_start() as u32), self.pos_in_token()),
        };
        self.reset_pos();
        Some(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<&str> {
        tokenize(src).map(|w| w.text).collect()
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(texts("10 R0 C5"), ["10", "R0", "C5"]);
        assert_eq!(texts("10   R0\n\nC5\r\n16\tR0"), ["10", "R0", "C5", "16", "R0"]);
        assert_eq!(texts("  \n leading and trailing \n  "), ["leading", "and", "trailing"]);
        assert!(texts("").is_empty());
        assert!(texts(" \n\t ").is_empty());
    }

    #[test]
    fn spans_point_into_source() {
        let src = "10  R0\nC5";
        let words: Vec<_> = tokenize(src).collect();
        assert_eq!(words.len(), 3);
        for word in words {
            assert_eq!(&src[word.span.as_range()], word.text);
        }
    }

    #[test]
    fn handles_multibyte_chars() {
        let src = "Aé 10 Rü";
        let words: Vec<_> = tokenize(src).collect();
        assert_eq!(words[0].text, "Aé");
        assert_eq!(words[2].text, "Rü");
        assert_eq!(&src[words[2].span.as_range()], "Rü");
    }
}
