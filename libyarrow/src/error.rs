//! Error types for the YAML engine.
//!
//! Every pipeline stage has its own error variant carrying the originating
//! position(s): reader (encoding, disallowed characters), scanner (lexical),
//! parser (grammar), composer (semantic), constructor (typing). Errors
//! render in the two-part "while ..." / problem format, with a bounded
//! snippet of the offending source line when available.

use crate::mark::Mark;
use thiserror::Error;

/// Result type for all engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The enclosing construct an error occurred inside, e.g.
/// "while parsing a block mapping".
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    pub what: String,
    pub mark: Mark,
}

/// Error type for scanning, parsing, composing, and constructing.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Invalid encoding or a character outside YAML's printable set.
    #[error("{}", marked(&None, .problem, .mark))]
    Reader {
        problem: String,
        mark: Option<Mark>,
    },

    /// Lexical error: bad indentation, unterminated construct, bad escape.
    #[error("{}", marked(.context, .problem, .mark))]
    Scanner {
        context: Option<ErrorContext>,
        problem: String,
        mark: Option<Mark>,
    },

    /// Grammar error: unexpected token, malformed directive.
    #[error("{}", marked(.context, .problem, .mark))]
    Parser {
        context: Option<ErrorContext>,
        problem: String,
        mark: Option<Mark>,
    },

    /// Semantic error: undefined alias, extra document, nesting too deep.
    #[error("{}", marked(.context, .problem, .mark))]
    Composer {
        context: Option<ErrorContext>,
        problem: String,
        mark: Option<Mark>,
    },

    /// Typing error while turning a node graph into native values.
    #[error("{}", marked(.context, .problem, .mark))]
    Constructor {
        context: Option<ErrorContext>,
        problem: String,
        mark: Option<Mark>,
    },

    /// The stream was pulled again after its terminal item was consumed.
    #[error("no more {0} in the stream")]
    EndOfStream(&'static str),
}

impl Error {
    pub(crate) fn reader(problem: impl Into<String>, mark: Option<Mark>) -> Self {
        Error::Reader {
            problem: problem.into(),
            mark,
        }
    }

    pub(crate) fn scanner(problem: impl Into<String>, mark: Mark) -> Self {
        Error::Scanner {
            context: None,
            problem: problem.into(),
            mark: Some(mark),
        }
    }

    pub(crate) fn scanner_in(
        what: impl Into<String>,
        context_mark: Mark,
        problem: impl Into<String>,
        mark: Mark,
    ) -> Self {
        Error::Scanner {
            context: Some(ErrorContext {
                what: what.into(),
                mark: context_mark,
            }),
            problem: problem.into(),
            mark: Some(mark),
        }
    }

    pub(crate) fn parser(problem: impl Into<String>, mark: Mark) -> Self {
        Error::Parser {
            context: None,
            problem: problem.into(),
            mark: Some(mark),
        }
    }

    pub(crate) fn parser_in(
        what: impl Into<String>,
        context_mark: Mark,
        problem: impl Into<String>,
        mark: Mark,
    ) -> Self {
        Error::Parser {
            context: Some(ErrorContext {
                what: what.into(),
                mark: context_mark,
            }),
            problem: problem.into(),
            mark: Some(mark),
        }
    }

    pub(crate) fn composer(problem: impl Into<String>, mark: Option<Mark>) -> Self {
        Error::Composer {
            context: None,
            problem: problem.into(),
            mark,
        }
    }

    pub(crate) fn composer_in(
        what: impl Into<String>,
        context_mark: Mark,
        problem: impl Into<String>,
        mark: Mark,
    ) -> Self {
        Error::Composer {
            context: Some(ErrorContext {
                what: what.into(),
                mark: context_mark,
            }),
            problem: problem.into(),
            mark: Some(mark),
        }
    }

    pub(crate) fn constructor(problem: impl Into<String>, mark: Option<Mark>) -> Self {
        Error::Constructor {
            context: None,
            problem: problem.into(),
            mark,
        }
    }

    /// The position the error points at, when one is attached.
    pub fn mark(&self) -> Option<&Mark> {
        match self {
            Error::Reader { mark, .. }
            | Error::Scanner { mark, .. }
            | Error::Parser { mark, .. }
            | Error::Composer { mark, .. }
            | Error::Constructor { mark, .. } => mark.as_ref(),
            Error::EndOfStream(_) => None,
        }
    }

    /// The short problem description, without positions or snippets.
    pub fn problem(&self) -> &str {
        match self {
            Error::Reader { problem, .. }
            | Error::Scanner { problem, .. }
            | Error::Parser { problem, .. }
            | Error::Composer { problem, .. }
            | Error::Constructor { problem, .. } => problem,
            Error::EndOfStream(what) => what,
        }
    }
}

/// Render the "while ... / problem ..." two-part error format with marks
/// and snippets.
fn marked(context: &Option<ErrorContext>, problem: &String, mark: &Option<Mark>) -> String {
    let mut out = String::new();
    if let Some(ErrorContext { what, mark: cmark }) = context {
        out.push_str(what);
        out.push('\n');
        out.push_str("  ");
        out.push_str(&cmark.to_string());
        if let Some(snippet) = cmark.snippet(4, 75) {
            out.push_str(":\n");
            out.push_str(&snippet);
        }
        out.push('\n');
    }
    out.push_str(problem);
    if let Some(mark) = mark {
        out.push('\n');
        out.push_str("  ");
        out.push_str(&mark.to_string());
        if let Some(snippet) = mark.snippet(4, 75) {
            out.push_str(":\n");
            out.push_str(&snippet);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn mark() -> Mark {
        Mark::new(Rc::from("<test>"), 0, 0, 0, Rc::from("foo: bar"))
    }

    #[test]
    fn test_plain_problem() {
        let err = Error::scanner("found character that cannot start any token", mark());
        let text = err.to_string();
        assert!(text.starts_with("found character that cannot start any token"));
        assert!(text.contains("in \"<test>\", line 1, column 1"));
    }

    #[test]
    fn test_context_renders_first() {
        let err = Error::parser_in(
            "while parsing a block mapping",
            mark(),
            "expected <block end>, but found '-'",
            mark(),
        );
        let text = err.to_string();
        let while_pos = text.find("while parsing").unwrap();
        let expected_pos = text.find("expected <block end>").unwrap();
        assert!(while_pos < expected_pos);
    }

    #[test]
    fn test_end_of_stream() {
        assert_eq!(
            Error::EndOfStream("tokens").to_string(),
            "no more tokens in the stream"
        );
    }
}
