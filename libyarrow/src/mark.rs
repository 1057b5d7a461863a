//! Source positions for diagnostics.
//!
//! A [`Mark`] is an immutable snapshot of a position in the input: source
//! name, absolute character index, line, and column, together with a shared
//! handle on the surrounding buffer so error messages can show a bounded
//! excerpt of the offending line. A [`Span`] is a start/end pair of marks;
//! tokens and events carry a `Span` (or no span at all), so the two marks
//! are always both present or both absent.

use std::fmt;
use std::rc::Rc;

/// An immutable position snapshot in a character stream.
#[derive(Clone)]
pub struct Mark {
    /// Name of the source, e.g. a filename or `"<input>"`.
    pub name: Rc<str>,
    /// Absolute character index from the start of the stream.
    pub index: usize,
    /// Zero-based line number.
    pub line: usize,
    /// Zero-based column number.
    pub column: usize,
    buffer: Rc<str>,
}

impl Mark {
    pub(crate) fn new(
        name: Rc<str>,
        index: usize,
        line: usize,
        column: usize,
        buffer: Rc<str>,
    ) -> Self {
        Self {
            name,
            index,
            line,
            column,
            buffer,
        }
    }

    /// Render a bounded excerpt of the line around this mark, with a caret
    /// pointing at the column. Returns `None` when the buffer is empty.
    pub fn snippet(&self, indent: usize, max_length: usize) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let chars: Vec<char> = self.buffer.chars().collect();
        // At least the width of the " ... " truncation markers, so the
        // adjustments below cannot cross the caret position.
        let half = (max_length / 2).saturating_sub(1).max(5);
        let mut start = self.index.min(chars.len());
        let mut head = "";
        while start > 0 && !matches!(chars[start - 1], '\0' | '\r' | '\n' | '\u{85}') {
            start -= 1;
            if self.index - start > half {
                head = " ... ";
                start += 5;
                break;
            }
        }
        let mut end = self.index.min(chars.len());
        let mut tail = "";
        while end < chars.len() && !matches!(chars[end], '\0' | '\r' | '\n' | '\u{85}') {
            end += 1;
            if end - self.index > half {
                tail = " ... ";
                end -= 5;
                break;
            }
        }
        let excerpt: String = chars[start..end].iter().collect();
        let pad = " ".repeat(indent);
        let caret_offset = self.index.saturating_sub(start) + indent + head.len();
        Some(format!(
            "{}{}{}{}\n{}^",
            pad,
            head,
            excerpt,
            tail,
            " ".repeat(caret_offset)
        ))
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in \"{}\", line {}, column {}",
            self.name,
            self.line + 1,
            self.column + 1
        )
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mark")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.index == other.index
            && self.line == other.line
            && self.column == other.column
    }
}

impl Eq for Mark {}

/// A start/end pair of marks delimiting a token, event, or node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: Mark,
    pub end: Mark,
}

impl Span {
    pub fn new(start: Mark, end: Mark) -> Self {
        Self { start, end }
    }

    /// A zero-width span at a single mark.
    pub fn at(mark: Mark) -> Self {
        Self {
            start: mark.clone(),
            end: mark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark_at(buffer: &str, index: usize, line: usize, column: usize) -> Mark {
        Mark::new(Rc::from("<test>"), index, line, column, Rc::from(buffer))
    }

    #[test]
    fn test_display_is_one_based() {
        let mark = mark_at("a: 1", 3, 0, 3);
        assert_eq!(mark.to_string(), "in \"<test>\", line 1, column 4");
    }

    #[test]
    fn test_snippet_points_at_column() {
        let mark = mark_at("key: @bad", 5, 0, 5);
        let snippet = mark.snippet(4, 75).unwrap();
        let mut lines = snippet.lines();
        assert_eq!(lines.next().unwrap(), "    key: @bad");
        assert_eq!(lines.next().unwrap(), "         ^");
    }

    #[test]
    fn test_snippet_empty_buffer() {
        let mark = mark_at("", 0, 0, 0);
        assert!(mark.snippet(4, 75).is_none());
    }

    #[test]
    fn test_snippet_tiny_max_length() {
        let mark = mark_at("a long enough line to truncate", 15, 0, 15);
        for max_length in 0..16 {
            let snippet = mark.snippet(0, max_length).unwrap();
            assert!(snippet.contains('^'));
        }
    }
}
