//! Character reader with position tracking.
//!
//! The reader buffers the decoded input, exposes bounded lookahead via
//! [`Reader::peek`], and advances with [`Reader::forward`], keeping line and
//! column counters in step. The end of input is represented by a `'\0'`
//! sentinel so the scanner can match on it like any other character.
//!
//! Validation happens up front: construction rejects input that is not
//! valid UTF-8 or that contains characters outside YAML's printable set
//! (control characters other than tab, line breaks, and NEL).

use crate::error::{Error, Result};
use crate::mark::Mark;
use std::rc::Rc;

/// Sequential character access over an in-memory buffer.
#[derive(Debug)]
pub struct Reader {
    name: Rc<str>,
    buffer: Rc<str>,
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
}

/// Whether a character may appear in a YAML stream at all.
fn is_printable(ch: char) -> bool {
    matches!(ch,
        '\t' | '\n' | '\r' | '\u{85}'
        | '\x20'..='\x7E'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

impl Reader {
    /// Wrap a string source. Fails if the source contains characters
    /// outside YAML's printable set.
    pub fn new(name: &str, source: &str) -> Result<Self> {
        let name: Rc<str> = Rc::from(name);
        let buffer: Rc<str> = Rc::from(source);

        let mut line = 0;
        let mut column = 0;
        let mut index = 0;
        for ch in source.chars() {
            if !is_printable(ch) {
                let mark = Mark::new(name.clone(), index, line, column, buffer.clone());
                return Err(Error::reader(
                    format!(
                        "found special character {:#06x} that is not allowed",
                        ch as u32
                    ),
                    Some(mark),
                ));
            }
            if ch == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
            index += 1;
        }

        Ok(Self {
            name,
            chars: source.chars().collect(),
            buffer,
            index: 0,
            line: 0,
            column: 0,
        })
    }

    /// Decode a byte source as UTF-8 and wrap it.
    pub fn from_bytes(name: &str, source: &[u8]) -> Result<Self> {
        match std::str::from_utf8(source) {
            Ok(text) => Reader::new(name, text),
            Err(e) => Err(Error::reader(
                format!("invalid UTF-8 sequence at byte {}", e.valid_up_to()),
                None,
            )),
        }
    }

    /// The character `offset` positions ahead, or `'\0'` past the end.
    pub fn peek(&self, offset: usize) -> char {
        self.chars.get(self.index + offset).copied().unwrap_or('\0')
    }

    /// The next `length` characters as a string, truncated at the end of
    /// input.
    pub fn prefix(&self, length: usize) -> String {
        let end = (self.index + length).min(self.chars.len());
        self.chars[self.index..end].iter().collect()
    }

    /// Advance the cursor by `count` characters, updating line and column.
    pub fn forward(&mut self, count: usize) {
        for _ in 0..count {
            let Some(&ch) = self.chars.get(self.index) else {
                break;
            };
            self.index += 1;
            if ch == '\n'
                || ch == '\u{85}'
                || ch == '\u{2028}'
                || ch == '\u{2029}'
                || (ch == '\r' && self.peek(0) != '\n')
            {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    /// A snapshot of the current position.
    pub fn mark(&self) -> Mark {
        Mark::new(
            self.name.clone(),
            self.index,
            self.line,
            self.column,
            self.buffer.clone(),
        )
    }

    /// Absolute character index of the cursor.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Zero-based line of the cursor.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Zero-based column of the cursor.
    pub fn column(&self) -> usize {
        self.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_and_forward() {
        let mut reader = Reader::new("<test>", "ab\ncd").unwrap();
        assert_eq!(reader.peek(0), 'a');
        assert_eq!(reader.peek(1), 'b');
        reader.forward(3);
        assert_eq!(reader.peek(0), 'c');
        assert_eq!(reader.line(), 1);
        assert_eq!(reader.column(), 0);
    }

    #[test]
    fn test_end_sentinel() {
        let reader = Reader::new("<test>", "x").unwrap();
        assert_eq!(reader.peek(1), '\0');
        assert_eq!(reader.peek(100), '\0');
    }

    #[test]
    fn test_column_counts_characters() {
        let mut reader = Reader::new("<test>", "ab: c").unwrap();
        reader.forward(4);
        assert_eq!(reader.column(), 4);
        assert_eq!(reader.mark().index, 4);
    }

    #[test]
    fn test_rejects_control_characters() {
        let err = Reader::new("<test>", "a\x07b").unwrap_err();
        assert!(err.to_string().contains("special character"));
    }

    #[test]
    fn test_tab_is_printable() {
        assert!(Reader::new("<test>", "a\tb").is_ok());
    }

    #[test]
    fn test_invalid_utf8() {
        let err = Reader::from_bytes("<test>", &[0x61, 0xFF, 0x62]).unwrap_err();
        assert!(err.to_string().contains("invalid UTF-8"));
    }
}
