//! Phase 2: Scanner
//!
//! The scanner pulls characters from the [`Reader`] and produces a lazy
//! stream of [`Token`]s. It owns three pieces of state that make YAML's
//! context-dependent lexing tractable:
//!
//! - the indentation stack, which drives `BlockSequenceStart`,
//!   `BlockMappingStart`, and `BlockEnd` emission;
//! - the flow-nesting counter (`[...]` / `{...}` depth);
//! - the pending simple-key table, which lets a later `:` retroactively
//!   promote an already-emitted token into a mapping key.
//!
//! Tokens are buffered in a queue only as far as simple-key resolution
//! requires; the consumer pulls one token at a time.

use crate::error::{Error, Result};
use crate::mark::{Mark, Span};
use crate::options::Options;
use crate::reader::Reader;
use crate::tokens::{DirectiveValue, ScalarStyle, Token, TokenData};
use std::collections::{HashMap, VecDeque};

/// A simple key may not span more than 1024 characters.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

/// A candidate mapping key awaiting confirmation by a `:`.
struct SimpleKey {
    /// Position of the key's token in the overall token stream.
    token_number: usize,
    /// In block context at the current indentation, a `:` must follow.
    required: bool,
    index: usize,
    line: usize,
    mark: Mark,
}

/// Character stream to token stream.
pub struct Scanner {
    reader: Reader,
    options: Options,
    /// The stream-end token has been queued; no more input remains.
    done: bool,
    /// The stream-end token has been handed to the consumer.
    exhausted: bool,
    flow_level: usize,
    tokens: VecDeque<Token>,
    tokens_taken: usize,
    indent: i64,
    indents: Vec<i64>,
    allow_simple_key: bool,
    possible_simple_keys: HashMap<usize, SimpleKey>,
}

fn is_break(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn is_breakz(ch: char) -> bool {
    ch == '\0' || is_break(ch)
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

fn is_blankz(ch: char) -> bool {
    is_blank(ch) || is_breakz(ch)
}

fn is_anchor_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

/// Characters valid inside a tag URI, besides alphanumerics.
fn is_uri_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "-;/?:@&=+$,_.!~*'()[]%".contains(ch)
}

fn escape_replacement(ch: char) -> Option<char> {
    Some(match ch {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0B',
        'f' => '\x0C',
        'r' => '\r',
        'e' => '\x1B',
        ' ' => ' ',
        '"' => '"',
        '\\' => '\\',
        '/' => '/',
        'N' => '\u{85}',
        '_' => '\u{A0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

fn escape_code_length(ch: char) -> Option<usize> {
    match ch {
        'x' => Some(2),
        'u' => Some(4),
        'U' => Some(8),
        _ => None,
    }
}

impl Scanner {
    /// Create a scanner over a reader with default options.
    pub fn new(reader: Reader) -> Self {
        Self::with_options(reader, Options::default())
    }

    pub fn with_options(reader: Reader, options: Options) -> Self {
        let mut scanner = Self {
            reader,
            options,
            done: false,
            exhausted: false,
            flow_level: 0,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: Vec::new(),
            allow_simple_key: true,
            possible_simple_keys: HashMap::new(),
        };
        scanner.fetch_stream_start();
        scanner
    }

    /// Whether another token remains (the terminal `StreamEnd` included).
    pub fn has_more_tokens(&self) -> bool {
        !self.exhausted
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<&Token> {
        if self.exhausted {
            return Err(Error::EndOfStream("tokens"));
        }
        self.ensure_token()?;
        // ensure_token queues at least one token unless the stream is done,
        // and the stream-end token is only dequeued by next_token.
        Ok(self.tokens.front().expect("token queue cannot be empty"))
    }

    /// Consume and return the next token. Pulling again after `StreamEnd`
    /// is an error.
    pub fn next_token(&mut self) -> Result<Token> {
        if self.exhausted {
            return Err(Error::EndOfStream("tokens"));
        }
        self.ensure_token()?;
        let token = self.tokens.pop_front().expect("token queue cannot be empty");
        self.tokens_taken += 1;
        if token.data == TokenData::StreamEnd {
            self.exhausted = true;
        }
        Ok(token)
    }

    fn ensure_token(&mut self) -> Result<()> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        Ok(())
    }

    fn need_more_tokens(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if self.tokens.is_empty() {
            return Ok(true);
        }
        // The current token may still become a key: keep fetching until the
        // earliest pending simple key is resolved or goes stale.
        self.stale_possible_simple_keys()?;
        Ok(self.next_possible_simple_key() == Some(self.tokens_taken))
    }

    // ========================================================================
    // Token dispatch
    // ========================================================================

    fn fetch_more_tokens(&mut self) -> Result<()> {
        self.scan_to_next_token();
        self.stale_possible_simple_keys()?;
        self.unwind_indent(self.reader.column() as i64);

        let ch = self.reader.peek(0);
        match ch {
            '\0' => self.fetch_stream_end(),
            '%' if self.check_directive() => self.fetch_directive(),
            '-' if self.check_document_start() => {
                self.fetch_document_indicator(TokenData::DocumentStart)
            }
            '.' if self.check_document_end() => {
                self.fetch_document_indicator(TokenData::DocumentEnd)
            }
            '[' => self.fetch_flow_collection_start(TokenData::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenData::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenData::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenData::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if self.check_block_entry() => self.fetch_block_entry(),
            '?' if self.check_key() => self.fetch_key(),
            ':' if self.check_value() => self.fetch_value(),
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => self.fetch_flow_scalar(ScalarStyle::SingleQuoted),
            '"' => self.fetch_flow_scalar(ScalarStyle::DoubleQuoted),
            _ if self.check_plain() => self.fetch_plain(),
            _ => Err(Error::scanner(
                format!("found character {:?} that cannot start any token", ch),
                self.reader.mark(),
            )),
        }
    }

    fn check_directive(&self) -> bool {
        self.reader.column() == 0
    }

    fn check_document_start(&self) -> bool {
        self.reader.column() == 0
            && self.reader.prefix(3) == "---"
            && is_blankz(self.reader.peek(3))
    }

    fn check_document_end(&self) -> bool {
        self.reader.column() == 0
            && self.reader.prefix(3) == "..."
            && is_blankz(self.reader.peek(3))
    }

    fn check_block_entry(&self) -> bool {
        is_blankz(self.reader.peek(1))
    }

    fn check_key(&self) -> bool {
        self.flow_level > 0 || is_blankz(self.reader.peek(1))
    }

    fn check_value(&self) -> bool {
        self.flow_level > 0 || is_blankz(self.reader.peek(1))
    }

    /// A plain scalar may start with most characters; indicators only when
    /// followed by a non-space (and `-?:` only outside flow context).
    fn check_plain(&self) -> bool {
        let ch = self.reader.peek(0);
        let indicator = "\0 \t\r\n\u{85}\u{2028}\u{2029}-?:,[]{}#&*!|>'\"%@`".contains(ch);
        if !indicator {
            return true;
        }
        !is_blankz(self.reader.peek(1))
            && (ch == '-' || (self.flow_level == 0 && (ch == '?' || ch == ':')))
    }

    // ========================================================================
    // Simple keys
    // ========================================================================

    fn next_possible_simple_key(&self) -> Option<usize> {
        self.possible_simple_keys
            .values()
            .map(|key| key.token_number)
            .min()
    }

    /// Drop pending keys that can no longer be confirmed: a `:` must
    /// arrive on the same line, within a bounded distance.
    fn stale_possible_simple_keys(&mut self) -> Result<()> {
        let line = self.reader.line();
        let index = self.reader.index();
        let mut stale_required: Option<Mark> = None;
        self.possible_simple_keys.retain(|_, key| {
            let fresh = key.line == line && index - key.index <= MAX_SIMPLE_KEY_LENGTH;
            if !fresh && key.required {
                stale_required = Some(key.mark.clone());
            }
            fresh
        });
        if let Some(mark) = stale_required {
            return Err(Error::scanner_in(
                "while scanning a simple key",
                mark,
                "could not find expected ':'",
                self.reader.mark(),
            ));
        }
        Ok(())
    }

    /// Record the next token as a possible mapping key.
    fn save_possible_simple_key(&mut self) -> Result<()> {
        let required = self.flow_level == 0 && self.indent == self.reader.column() as i64;
        if self.allow_simple_key {
            self.remove_possible_simple_key()?;
            let token_number = self.tokens_taken + self.tokens.len();
            self.possible_simple_keys.insert(
                self.flow_level,
                SimpleKey {
                    token_number,
                    required,
                    index: self.reader.index(),
                    line: self.reader.line(),
                    mark: self.reader.mark(),
                },
            );
        }
        Ok(())
    }

    fn remove_possible_simple_key(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            if key.required {
                return Err(Error::scanner_in(
                    "while scanning a simple key",
                    key.mark,
                    "could not find expected ':'",
                    self.reader.mark(),
                ));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Indentation
    // ========================================================================

    /// Pop indentation levels above `column`, emitting a BlockEnd for each.
    /// No-op in flow context.
    fn unwind_indent(&mut self, column: i64) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.push_token(TokenData::BlockEnd, Span::at(mark));
        }
    }

    /// Push a new indentation level if `column` is deeper than the current
    /// one. Returns whether a level was pushed.
    fn add_indent(&mut self, column: i64) -> bool {
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            return true;
        }
        false
    }

    // ========================================================================
    // Fetchers
    // ========================================================================

    fn push_token(&mut self, data: TokenData, span: Span) {
        self.tokens.push_back(Token { data, span });
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.reader.mark();
        self.push_token(TokenData::StreamStart, Span::at(mark));
    }

    fn fetch_stream_end(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.possible_simple_keys.clear();
        let mark = self.reader.mark();
        self.push_token(TokenData::StreamEnd, Span::at(mark));
        self.done = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let start_mark = self.reader.mark();
        self.reader.forward(3);
        let end_mark = self.reader.mark();
        self.push_token(data, Span::new(start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<()> {
        self.save_possible_simple_key()?;
        self.flow_level += 1;
        self.allow_simple_key = true;
        let start_mark = self.reader.mark();
        self.reader.forward(1);
        let end_mark = self.reader.mark();
        self.push_token(data, Span::new(start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<()> {
        self.remove_possible_simple_key()?;
        self.flow_level = self.flow_level.saturating_sub(1);
        self.allow_simple_key = false;
        let start_mark = self.reader.mark();
        self.reader.forward(1);
        let end_mark = self.reader.mark();
        self.push_token(data, Span::new(start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start_mark = self.reader.mark();
        self.reader.forward(1);
        let end_mark = self.reader.mark();
        self.push_token(TokenData::FlowEntry, Span::new(start_mark, end_mark));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(Error::scanner(
                    "sequence entries are not allowed here",
                    self.reader.mark(),
                ));
            }
            if self.add_indent(self.reader.column() as i64) {
                let mark = self.reader.mark();
                self.push_token(TokenData::BlockSequenceStart, Span::at(mark));
            }
        }
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start_mark = self.reader.mark();
        self.reader.forward(1);
        let end_mark = self.reader.mark();
        self.push_token(TokenData::BlockEntry, Span::new(start_mark, end_mark));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(Error::scanner(
                    "mapping keys are not allowed here",
                    self.reader.mark(),
                ));
            }
            if self.add_indent(self.reader.column() as i64) {
                let mark = self.reader.mark();
                self.push_token(TokenData::BlockMappingStart, Span::at(mark));
            }
        }
        self.allow_simple_key = self.flow_level == 0;
        self.remove_possible_simple_key()?;
        let start_mark = self.reader.mark();
        self.reader.forward(1);
        let end_mark = self.reader.mark();
        self.push_token(TokenData::Key, Span::new(start_mark, end_mark));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            // Retroactively promote the saved token to a mapping key.
            let insert_at = key.token_number - self.tokens_taken;
            self.tokens.insert(
                insert_at,
                Token {
                    data: TokenData::Key,
                    span: Span::at(key.mark.clone()),
                },
            );
            if self.flow_level == 0 && self.add_indent(key.mark.column as i64) {
                self.tokens.insert(
                    insert_at,
                    Token {
                        data: TokenData::BlockMappingStart,
                        span: Span::at(key.mark.clone()),
                    },
                );
            }
            self.allow_simple_key = false;
        } else {
            if self.flow_level == 0 {
                if !self.allow_simple_key {
                    return Err(Error::scanner(
                        "mapping values are not allowed here",
                        self.reader.mark(),
                    ));
                }
                if self.add_indent(self.reader.column() as i64) {
                    let mark = self.reader.mark();
                    self.push_token(TokenData::BlockMappingStart, Span::at(mark));
                }
            }
            self.allow_simple_key = self.flow_level == 0;
            self.remove_possible_simple_key()?;
        }
        let start_mark = self.reader.mark();
        self.reader.forward(1);
        let end_mark = self.reader.mark();
        self.push_token(TokenData::Value, Span::new(start_mark, end_mark));
        Ok(())
    }

    fn fetch_anchor(&mut self, is_alias: bool) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(is_alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let token = self.scan_block_scalar(style)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(style)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_plain()?;
        self.tokens.push_back(token);
        Ok(())
    }

    // ========================================================================
    // Whitespace and comments
    // ========================================================================

    /// Skip spaces, comments, and line breaks up to the next token. Tabs
    /// are skipped in flow context and between tokens, but never where
    /// they would establish block indentation (unless the option allows).
    fn scan_to_next_token(&mut self) {
        loop {
            loop {
                let ch = self.reader.peek(0);
                let skip_tab = ch == '\t'
                    && (self.flow_level > 0
                        || !self.allow_simple_key
                        || self.options.allow_tab_indent);
                if ch == ' ' || skip_tab {
                    self.reader.forward(1);
                } else {
                    break;
                }
            }
            if self.reader.peek(0) == '#' {
                while !is_breakz(self.reader.peek(0)) {
                    self.reader.forward(1);
                }
            }
            if self.scan_line_break().is_empty() {
                break;
            }
            if self.flow_level == 0 {
                self.allow_simple_key = true;
            }
        }
    }

    /// Consume one line break, normalizing `\r\n` and `\r` to `\n`.
    /// Returns the empty string when no break is present.
    fn scan_line_break(&mut self) -> String {
        let ch = self.reader.peek(0);
        if ch == '\r' || ch == '\n' {
            if self.reader.prefix(2) == "\r\n" {
                self.reader.forward(2);
            } else {
                self.reader.forward(1);
            }
            "\n".to_string()
        } else if is_break(ch) {
            self.reader.forward(1);
            ch.to_string()
        } else {
            String::new()
        }
    }

    // ========================================================================
    // Directives
    // ========================================================================

    fn scan_directive(&mut self) -> Result<Token> {
        let start_mark = self.reader.mark();
        self.reader.forward(1);
        let name = self.scan_directive_name(&start_mark)?;
        let (value, end_mark) = match name.as_str() {
            "YAML" => {
                let (major, minor) = self.scan_yaml_directive_value(&start_mark)?;
                (DirectiveValue::Version { major, minor }, self.reader.mark())
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(&start_mark)?;
                (DirectiveValue::TagHandle { handle, prefix }, self.reader.mark())
            }
            _ => {
                let end_mark = self.reader.mark();
                while !is_breakz(self.reader.peek(0)) {
                    self.reader.forward(1);
                }
                (DirectiveValue::Unknown, end_mark)
            }
        };
        self.scan_directive_ignored_line(&start_mark)?;
        Ok(Token {
            data: TokenData::Directive { name, value },
            span: Span::new(start_mark, end_mark),
        })
    }

    fn scan_directive_name(&mut self, start_mark: &Mark) -> Result<String> {
        let mut length = 0;
        while is_anchor_char(self.reader.peek(length)) {
            length += 1;
        }
        if length == 0 {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                format!(
                    "expected alphabetic or numeric character, but found {:?}",
                    self.reader.peek(0)
                ),
                self.reader.mark(),
            ));
        }
        let name = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_breakz(ch) {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                format!("expected alphabetic or numeric character, but found {:?}", ch),
                self.reader.mark(),
            ));
        }
        Ok(name)
    }

    fn scan_yaml_directive_value(&mut self, start_mark: &Mark) -> Result<(u32, u32)> {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        let major = self.scan_yaml_directive_number(start_mark)?;
        if self.reader.peek(0) != '.' {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                format!("expected a digit or '.', but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        self.reader.forward(1);
        let minor = self.scan_yaml_directive_number(start_mark)?;
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_breakz(ch) {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                format!("expected a digit or ' ', but found {:?}", ch),
                self.reader.mark(),
            ));
        }
        Ok((major, minor))
    }

    fn scan_yaml_directive_number(&mut self, start_mark: &Mark) -> Result<u32> {
        if !self.reader.peek(0).is_ascii_digit() {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                format!("expected a digit, but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        let mut length = 0;
        while self.reader.peek(length).is_ascii_digit() {
            length += 1;
        }
        let digits = self.reader.prefix(length);
        self.reader.forward(length);
        digits.parse().map_err(|_| {
            Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                "found a version number out of range",
                self.reader.mark(),
            )
        })
    }

    fn scan_tag_directive_value(&mut self, start_mark: &Mark) -> Result<(String, String)> {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        let handle = self.scan_tag_handle("directive", start_mark)?;
        if self.reader.peek(0) != ' ' {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                format!("expected ' ', but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        let prefix = self.scan_tag_uri("directive", start_mark)?;
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_breakz(ch) {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                format!("expected ' ', but found {:?}", ch),
                self.reader.mark(),
            ));
        }
        Ok((handle, prefix))
    }

    fn scan_directive_ignored_line(&mut self, start_mark: &Mark) -> Result<()> {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        if self.reader.peek(0) == '#' {
            while !is_breakz(self.reader.peek(0)) {
                self.reader.forward(1);
            }
        }
        if !is_breakz(self.reader.peek(0)) {
            return Err(Error::scanner_in(
                "while scanning a directive",
                start_mark.clone(),
                format!(
                    "expected a comment or a line break, but found {:?}",
                    self.reader.peek(0)
                ),
                self.reader.mark(),
            ));
        }
        self.scan_line_break();
        Ok(())
    }

    // ========================================================================
    // Anchors, aliases, tags
    // ========================================================================

    fn scan_anchor(&mut self, is_alias: bool) -> Result<Token> {
        let what = if is_alias { "an alias" } else { "an anchor" };
        let start_mark = self.reader.mark();
        self.reader.forward(1);
        let mut length = 0;
        while is_anchor_char(self.reader.peek(length)) {
            length += 1;
        }
        if length == 0 {
            return Err(Error::scanner_in(
                format!("while scanning {}", what),
                start_mark,
                format!(
                    "expected alphabetic or numeric character, but found {:?}",
                    self.reader.peek(0)
                ),
                self.reader.mark(),
            ));
        }
        let name = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if !is_blankz(ch) && !"?:,]}%@`".contains(ch) {
            return Err(Error::scanner_in(
                format!("while scanning {}", what),
                start_mark,
                format!(
                    "expected alphabetic or numeric character, but found {:?}",
                    ch
                ),
                self.reader.mark(),
            ));
        }
        let end_mark = self.reader.mark();
        let data = if is_alias {
            TokenData::Alias(name)
        } else {
            TokenData::Anchor(name)
        };
        Ok(Token {
            data,
            span: Span::new(start_mark, end_mark),
        })
    }

    fn scan_tag(&mut self) -> Result<Token> {
        let start_mark = self.reader.mark();
        let ch = self.reader.peek(1);
        let (handle, suffix) = if ch == '<' {
            // Verbatim tag: !<tag:yaml.org,2002:str>
            self.reader.forward(2);
            let suffix = self.scan_tag_uri("tag", &start_mark)?;
            if self.reader.peek(0) != '>' {
                return Err(Error::scanner_in(
                    "while scanning a tag",
                    start_mark,
                    format!("expected '>', but found {:?}", self.reader.peek(0)),
                    self.reader.mark(),
                ));
            }
            self.reader.forward(1);
            (None, suffix)
        } else if is_blankz(ch) {
            // Bare "!": the non-specific tag.
            self.reader.forward(1);
            (None, "!".to_string())
        } else {
            // Either "!suffix" or "!handle!suffix"; look for a second '!'.
            let mut length = 1;
            let mut use_handle = false;
            let mut ch = ch;
            while !is_blankz(ch) {
                if ch == '!' {
                    use_handle = true;
                    break;
                }
                length += 1;
                ch = self.reader.peek(length);
            }
            let handle = if use_handle {
                self.scan_tag_handle("tag", &start_mark)?
            } else {
                self.reader.forward(1);
                "!".to_string()
            };
            let suffix = self.scan_tag_uri("tag", &start_mark)?;
            (Some(handle), suffix)
        };
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_breakz(ch) {
            return Err(Error::scanner_in(
                "while scanning a tag",
                start_mark,
                format!("expected ' ', but found {:?}", ch),
                self.reader.mark(),
            ));
        }
        let end_mark = self.reader.mark();
        Ok(Token {
            data: TokenData::Tag { handle, suffix },
            span: Span::new(start_mark, end_mark),
        })
    }

    fn scan_tag_handle(&mut self, what: &str, start_mark: &Mark) -> Result<String> {
        if self.reader.peek(0) != '!' {
            return Err(Error::scanner_in(
                format!("while scanning a {}", what),
                start_mark.clone(),
                format!("expected '!', but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        let mut length = 1;
        let mut ch = self.reader.peek(length);
        if !is_blank(ch) && !is_breakz(ch) {
            while is_anchor_char(ch) {
                length += 1;
                ch = self.reader.peek(length);
            }
            if ch != '!' {
                self.reader.forward(length);
                return Err(Error::scanner_in(
                    format!("while scanning a {}", what),
                    start_mark.clone(),
                    format!("expected '!', but found {:?}", ch),
                    self.reader.mark(),
                ));
            }
            length += 1;
        }
        let handle = self.reader.prefix(length);
        self.reader.forward(length);
        Ok(handle)
    }

    fn scan_tag_uri(&mut self, what: &str, start_mark: &Mark) -> Result<String> {
        let mut chunks = String::new();
        let mut length = 0;
        loop {
            let ch = self.reader.peek(length);
            if !is_uri_char(ch) {
                break;
            }
            if ch == '%' {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
                length = 0;
                chunks.push_str(&self.scan_uri_escapes(what, start_mark)?);
            } else {
                length += 1;
            }
        }
        if length > 0 {
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
        }
        if chunks.is_empty() {
            return Err(Error::scanner_in(
                format!("while parsing a {}", what),
                start_mark.clone(),
                format!("expected URI, but found {:?}", self.reader.peek(0)),
                self.reader.mark(),
            ));
        }
        Ok(chunks)
    }

    fn scan_uri_escapes(&mut self, what: &str, start_mark: &Mark) -> Result<String> {
        let mut bytes = Vec::new();
        while self.reader.peek(0) == '%' {
            self.reader.forward(1);
            let hex = self.reader.prefix(2);
            if hex.len() != 2 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::scanner_in(
                    format!("while scanning a {}", what),
                    start_mark.clone(),
                    format!(
                        "expected URI escape sequence of 2 hexadecimal numbers, but found {:?}",
                        self.reader.peek(0)
                    ),
                    self.reader.mark(),
                ));
            }
            bytes.push(u8::from_str_radix(&hex, 16).expect("validated hex digits"));
            self.reader.forward(2);
        }
        String::from_utf8(bytes).map_err(|_| {
            Error::scanner_in(
                format!("while scanning a {}", what),
                start_mark.clone(),
                "found invalid UTF-8 data in URI escapes",
                self.reader.mark(),
            )
        })
    }

    // ========================================================================
    // Block scalars
    // ========================================================================

    fn scan_block_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let folded = style == ScalarStyle::Folded;
        let start_mark = self.reader.mark();
        self.reader.forward(1);

        let (chomping, increment) = self.scan_block_scalar_indicators(&start_mark)?;
        self.scan_block_scalar_ignored_line(&start_mark)?;

        let min_indent = (self.indent + 1).max(1);
        let mut chunks = String::new();
        let (mut breaks, indent, mut end_mark) = match increment {
            None => {
                let (breaks, max_indent, end_mark) = self.scan_block_scalar_indentation();
                (breaks, min_indent.max(max_indent), end_mark)
            }
            Some(increment) => {
                let indent = min_indent + increment as i64 - 1;
                let (breaks, end_mark) = self.scan_block_scalar_breaks(indent);
                (breaks, indent, end_mark)
            }
        };

        let mut line_break = String::new();
        while self.reader.column() as i64 == indent && self.reader.peek(0) != '\0' {
            chunks.push_str(&breaks);
            let leading_non_space = !is_blank(self.reader.peek(0));
            let mut length = 0;
            while !is_breakz(self.reader.peek(length)) {
                length += 1;
            }
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            line_break = self.scan_line_break();
            let (next_breaks, next_end) = self.scan_block_scalar_breaks(indent);
            breaks = next_breaks;
            end_mark = next_end;
            if self.reader.column() as i64 == indent && self.reader.peek(0) != '\0' {
                // Folding: a single break between two non-space lines folds
                // to a space, unless blank lines intervene.
                if folded
                    && line_break == "\n"
                    && leading_non_space
                    && !is_blank(self.reader.peek(0))
                {
                    if breaks.is_empty() {
                        chunks.push(' ');
                    }
                } else {
                    chunks.push_str(&line_break);
                }
            } else {
                break;
            }
        }

        match chomping {
            Chomping::Strip => {}
            Chomping::Clip => chunks.push_str(&line_break),
            Chomping::Keep => {
                chunks.push_str(&line_break);
                chunks.push_str(&breaks);
            }
        }

        Ok(Token {
            data: TokenData::Scalar {
                value: chunks,
                style,
            },
            span: Span::new(start_mark, end_mark),
        })
    }

    fn scan_block_scalar_indicators(&mut self, start_mark: &Mark) -> Result<(Chomping, Option<u32>)> {
        let mut chomping = Chomping::Clip;
        let mut increment = None;
        let mut ch = self.reader.peek(0);
        if ch == '+' || ch == '-' {
            chomping = if ch == '+' {
                Chomping::Keep
            } else {
                Chomping::Strip
            };
            self.reader.forward(1);
            ch = self.reader.peek(0);
            if ch.is_ascii_digit() {
                increment = Some(self.scan_block_scalar_increment(start_mark, ch)?);
            }
        } else if ch.is_ascii_digit() {
            increment = Some(self.scan_block_scalar_increment(start_mark, ch)?);
            ch = self.reader.peek(0);
            if ch == '+' || ch == '-' {
                chomping = if ch == '+' {
                    Chomping::Keep
                } else {
                    Chomping::Strip
                };
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek(0);
        if ch != ' ' && !is_breakz(ch) {
            return Err(Error::scanner_in(
                "while scanning a block scalar",
                start_mark.clone(),
                format!("expected chomping or indentation indicators, but found {:?}", ch),
                self.reader.mark(),
            ));
        }
        Ok((chomping, increment))
    }

    fn scan_block_scalar_increment(&mut self, start_mark: &Mark, ch: char) -> Result<u32> {
        if ch == '0' {
            return Err(Error::scanner_in(
                "while scanning a block scalar",
                start_mark.clone(),
                "expected indentation indicator in the range 1-9, but found 0",
                self.reader.mark(),
            ));
        }
        self.reader.forward(1);
        Ok(ch as u32 - '0' as u32)
    }

    fn scan_block_scalar_ignored_line(&mut self, start_mark: &Mark) -> Result<()> {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        if self.reader.peek(0) == '#' {
            while !is_breakz(self.reader.peek(0)) {
                self.reader.forward(1);
            }
        }
        if !is_breakz(self.reader.peek(0)) {
            return Err(Error::scanner_in(
                "while scanning a block scalar",
                start_mark.clone(),
                format!(
                    "expected a comment or a line break, but found {:?}",
                    self.reader.peek(0)
                ),
                self.reader.mark(),
            ));
        }
        self.scan_line_break();
        Ok(())
    }

    /// Skip leading blank lines and record the deepest indentation seen.
    fn scan_block_scalar_indentation(&mut self) -> (String, i64, Mark) {
        let mut chunks = String::new();
        let mut max_indent = 0;
        let mut end_mark = self.reader.mark();
        loop {
            let ch = self.reader.peek(0);
            if ch == ' ' {
                self.reader.forward(1);
                if self.reader.column() as i64 > max_indent {
                    max_indent = self.reader.column() as i64;
                }
            } else if is_break(ch) {
                chunks.push_str(&self.scan_line_break());
                end_mark = self.reader.mark();
            } else {
                break;
            }
        }
        (chunks, max_indent, end_mark)
    }

    fn scan_block_scalar_breaks(&mut self, indent: i64) -> (String, Mark) {
        let mut chunks = String::new();
        let mut end_mark = self.reader.mark();
        while (self.reader.column() as i64) < indent && self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        while is_break(self.reader.peek(0)) {
            chunks.push_str(&self.scan_line_break());
            end_mark = self.reader.mark();
            while (self.reader.column() as i64) < indent && self.reader.peek(0) == ' ' {
                self.reader.forward(1);
            }
        }
        (chunks, end_mark)
    }

    // ========================================================================
    // Flow scalars
    // ========================================================================

    fn scan_flow_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let double = style == ScalarStyle::DoubleQuoted;
        let start_mark = self.reader.mark();
        let quote = self.reader.peek(0);
        self.reader.forward(1);
        let mut chunks = String::new();
        chunks.push_str(&self.scan_flow_scalar_non_spaces(double, &start_mark)?);
        while self.reader.peek(0) != quote {
            chunks.push_str(&self.scan_flow_scalar_spaces(double, &start_mark)?);
            chunks.push_str(&self.scan_flow_scalar_non_spaces(double, &start_mark)?);
        }
        self.reader.forward(1);
        let end_mark = self.reader.mark();
        Ok(Token {
            data: TokenData::Scalar {
                value: chunks,
                style,
            },
            span: Span::new(start_mark, end_mark),
        })
    }

    fn scan_flow_scalar_non_spaces(&mut self, double: bool, start_mark: &Mark) -> Result<String> {
        let what = if double {
            "while scanning a double-quoted scalar"
        } else {
            "while scanning a single-quoted scalar"
        };
        let mut chunks = String::new();
        loop {
            let mut length = 0;
            loop {
                let ch = self.reader.peek(length);
                if is_blankz(ch) || ch == '\'' || ch == '"' || ch == '\\' {
                    break;
                }
                length += 1;
            }
            if length > 0 {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
            }
            let ch = self.reader.peek(0);
            if !double && ch == '\'' && self.reader.peek(1) == '\'' {
                chunks.push('\'');
                self.reader.forward(2);
            } else if (double && ch == '\'') || (!double && (ch == '"' || ch == '\\')) {
                chunks.push(ch);
                self.reader.forward(1);
            } else if double && ch == '\\' {
                self.reader.forward(1);
                let ch = self.reader.peek(0);
                if let Some(replacement) = escape_replacement(ch) {
                    chunks.push(replacement);
                    self.reader.forward(1);
                } else if let Some(code_length) = escape_code_length(ch) {
                    self.reader.forward(1);
                    let hex = self.reader.prefix(code_length);
                    if hex.len() != code_length || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                        return Err(Error::scanner_in(
                            what,
                            start_mark.clone(),
                            format!(
                                "expected escape sequence of {} hexadecimal numbers, but found {:?}",
                                code_length,
                                self.reader.peek(0)
                            ),
                            self.reader.mark(),
                        ));
                    }
                    let code = u32::from_str_radix(&hex, 16).expect("validated hex digits");
                    let Some(decoded) = char::from_u32(code) else {
                        return Err(Error::scanner_in(
                            what,
                            start_mark.clone(),
                            format!("found invalid character code {:#x}", code),
                            self.reader.mark(),
                        ));
                    };
                    chunks.push(decoded);
                    self.reader.forward(code_length);
                } else if is_break(ch) {
                    self.scan_line_break();
                    chunks.push_str(&self.scan_flow_scalar_breaks(start_mark)?);
                } else {
                    return Err(Error::scanner_in(
                        what,
                        start_mark.clone(),
                        format!("found unknown escape character {:?}", ch),
                        self.reader.mark(),
                    ));
                }
            } else {
                return Ok(chunks);
            }
        }
    }

    fn scan_flow_scalar_spaces(&mut self, double: bool, start_mark: &Mark) -> Result<String> {
        let what = if double {
            "while scanning a double-quoted scalar"
        } else {
            "while scanning a single-quoted scalar"
        };
        let mut chunks = String::new();
        let mut length = 0;
        while is_blank(self.reader.peek(length)) {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if ch == '\0' {
            return Err(Error::scanner_in(
                what,
                start_mark.clone(),
                "found unexpected end of stream",
                self.reader.mark(),
            ));
        }
        if is_break(ch) {
            let line_break = self.scan_line_break();
            let breaks = self.scan_flow_scalar_breaks(start_mark)?;
            if line_break != "\n" {
                chunks.push_str(&line_break);
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else {
            chunks.push_str(&whitespaces);
        }
        Ok(chunks)
    }

    fn scan_flow_scalar_breaks(&mut self, start_mark: &Mark) -> Result<String> {
        let mut chunks = String::new();
        loop {
            let prefix = self.reader.prefix(3);
            if (prefix == "---" || prefix == "...") && is_blankz(self.reader.peek(3)) {
                return Err(Error::scanner_in(
                    "while scanning a quoted scalar",
                    start_mark.clone(),
                    "found unexpected document separator",
                    self.reader.mark(),
                ));
            }
            while is_blank(self.reader.peek(0)) {
                self.reader.forward(1);
            }
            if is_break(self.reader.peek(0)) {
                chunks.push_str(&self.scan_line_break());
            } else {
                return Ok(chunks);
            }
        }
    }

    // ========================================================================
    // Plain scalars
    // ========================================================================

    fn scan_plain(&mut self) -> Result<Token> {
        let mut chunks = String::new();
        let start_mark = self.reader.mark();
        let mut end_mark = start_mark.clone();
        let indent = self.indent + 1;
        let mut spaces = String::new();
        loop {
            if self.reader.peek(0) == '#' {
                break;
            }
            let mut length = 0;
            loop {
                let ch = self.reader.peek(length);
                if is_blankz(ch) {
                    break;
                }
                if ch == ':' {
                    let next = self.reader.peek(length + 1);
                    if is_blankz(next) || (self.flow_level > 0 && ",[]{}".contains(next)) {
                        break;
                    }
                }
                if self.flow_level > 0 && ",?[]{}".contains(ch) {
                    break;
                }
                length += 1;
            }
            if length == 0 {
                break;
            }
            self.allow_simple_key = false;
            chunks.push_str(&spaces);
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            end_mark = self.reader.mark();
            spaces = self.scan_plain_spaces();
            if spaces.is_empty()
                || self.reader.peek(0) == '#'
                || (self.flow_level == 0 && (self.reader.column() as i64) < indent)
            {
                break;
            }
        }
        Ok(Token {
            data: TokenData::Scalar {
                value: chunks,
                style: ScalarStyle::Plain,
            },
            span: Span::new(start_mark, end_mark),
        })
    }

    /// Consume whitespace between plain-scalar chunks. Returns the folded
    /// whitespace to insert, or the empty string when the scalar ends.
    fn scan_plain_spaces(&mut self) -> String {
        let mut chunks = String::new();
        let mut length = 0;
        // Tabs are ordinary whitespace inside scalar content.
        while is_blank(self.reader.peek(length)) {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if is_break(ch) {
            let line_break = self.scan_line_break();
            self.allow_simple_key = true;
            if self.check_plain_document_indicator() {
                return String::new();
            }
            let mut breaks = String::new();
            loop {
                let ch = self.reader.peek(0);
                if ch == ' ' {
                    self.reader.forward(1);
                } else if is_break(ch) {
                    breaks.push_str(&self.scan_line_break());
                    if self.check_plain_document_indicator() {
                        return String::new();
                    }
                } else {
                    break;
                }
            }
            if line_break != "\n" {
                chunks.push_str(&line_break);
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else if !whitespaces.is_empty() {
            chunks.push_str(&whitespaces);
        }
        chunks
    }

    fn check_plain_document_indicator(&self) -> bool {
        let prefix = self.reader.prefix(3);
        (prefix == "---" || prefix == "...") && is_blankz(self.reader.peek(3))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Chomping {
    /// `-`: drop all trailing line breaks.
    Strip,
    /// default: keep exactly one trailing line break.
    Clip,
    /// `+`: keep all trailing line breaks.
    Keep,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> Vec<TokenData> {
        let reader = Reader::new("<test>", input).unwrap();
        let mut scanner = Scanner::new(reader);
        let mut tokens = Vec::new();
        while scanner.has_more_tokens() {
            tokens.push(scanner.next_token().unwrap().data);
        }
        tokens
    }

    fn scalar(value: &str, style: ScalarStyle) -> TokenData {
        TokenData::Scalar {
            value: value.to_string(),
            style,
        }
    }

    #[test]
    fn test_single_scalar_stream() {
        assert_eq!(
            scan_all("hello"),
            vec![
                TokenData::StreamStart,
                scalar("hello", ScalarStyle::Plain),
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_block_mapping_tokens() {
        assert_eq!(
            scan_all("a: 1"),
            vec![
                TokenData::StreamStart,
                TokenData::BlockMappingStart,
                TokenData::Key,
                scalar("a", ScalarStyle::Plain),
                TokenData::Value,
                scalar("1", ScalarStyle::Plain),
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_block_sequence_tokens() {
        assert_eq!(
            scan_all("- a\n- b\n"),
            vec![
                TokenData::StreamStart,
                TokenData::BlockSequenceStart,
                TokenData::BlockEntry,
                scalar("a", ScalarStyle::Plain),
                TokenData::BlockEntry,
                scalar("b", ScalarStyle::Plain),
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_flow_sequence_tokens() {
        assert_eq!(
            scan_all("[1, 2]"),
            vec![
                TokenData::StreamStart,
                TokenData::FlowSequenceStart,
                scalar("1", ScalarStyle::Plain),
                TokenData::FlowEntry,
                scalar("2", ScalarStyle::Plain),
                TokenData::FlowSequenceEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_tab_in_flow_context() {
        assert_eq!(
            scan_all("{\n\t\"x\": \"y\"\n}"),
            vec![
                TokenData::StreamStart,
                TokenData::FlowMappingStart,
                TokenData::Key,
                scalar("x", ScalarStyle::DoubleQuoted),
                TokenData::Value,
                scalar("y", ScalarStyle::DoubleQuoted),
                TokenData::FlowMappingEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_tab_as_block_indentation_fails() {
        let reader = Reader::new("<test>", "a:\n\tb: c").unwrap();
        let mut scanner = Scanner::new(reader);
        let mut result = Ok(());
        while scanner.has_more_tokens() {
            match scanner.next_token() {
                Ok(_) => {}
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot start any token"));
    }

    #[test]
    fn test_pull_past_end_is_an_error() {
        let reader = Reader::new("<test>", "x").unwrap();
        let mut scanner = Scanner::new(reader);
        while scanner.has_more_tokens() {
            scanner.next_token().unwrap();
        }
        assert!(!scanner.has_more_tokens());
        assert!(matches!(
            scanner.next_token(),
            Err(Error::EndOfStream("tokens"))
        ));
    }

    #[test]
    fn test_anchor_and_alias() {
        assert_eq!(
            scan_all("- &a x\n- *a\n"),
            vec![
                TokenData::StreamStart,
                TokenData::BlockSequenceStart,
                TokenData::BlockEntry,
                TokenData::Anchor("a".to_string()),
                scalar("x", ScalarStyle::Plain),
                TokenData::BlockEntry,
                TokenData::Alias("a".to_string()),
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_block_scalar_clip() {
        let tokens = scan_all("|\n  text\n  more\n\n");
        assert_eq!(tokens[1], scalar("text\nmore\n", ScalarStyle::Literal));
    }

    #[test]
    fn test_block_scalar_strip_and_keep() {
        let tokens = scan_all("|-\n  text\n\n");
        assert_eq!(tokens[1], scalar("text", ScalarStyle::Literal));
        let tokens = scan_all("|+\n  text\n\n");
        assert_eq!(tokens[1], scalar("text\n\n", ScalarStyle::Literal));
    }

    #[test]
    fn test_folded_scalar_joins_lines() {
        let tokens = scan_all(">\n  one\n  two\n");
        assert_eq!(tokens[1], scalar("one two\n", ScalarStyle::Folded));
    }

    #[test]
    fn test_double_quote_escapes() {
        let tokens = scan_all(r#""a\tb\u0041""#);
        assert_eq!(tokens[1], scalar("a\tbA", ScalarStyle::DoubleQuoted));
    }

    #[test]
    fn test_single_quote_doubling() {
        let tokens = scan_all("'it''s'");
        assert_eq!(tokens[1], scalar("it's", ScalarStyle::SingleQuoted));
    }

    #[test]
    fn test_unterminated_quoted_scalar() {
        let reader = Reader::new("<test>", "\"abc").unwrap();
        let mut scanner = Scanner::new(reader);
        scanner.next_token().unwrap();
        let err = scanner.next_token().unwrap_err();
        assert!(err.to_string().contains("found unexpected end of stream"));
    }

    #[test]
    fn test_directive_tokens() {
        let tokens = scan_all("%YAML 1.1\n---\nx\n");
        assert_eq!(
            tokens[1],
            TokenData::Directive {
                name: "YAML".to_string(),
                value: DirectiveValue::Version { major: 1, minor: 1 },
            }
        );
        assert_eq!(tokens[2], TokenData::DocumentStart);
    }

    #[test]
    fn test_plain_scalar_multiline_folds() {
        let tokens = scan_all("a\nb\n");
        // Two lines at column zero fold into one plain scalar.
        assert_eq!(tokens[1], scalar("a b", ScalarStyle::Plain));
    }

    #[test]
    fn test_value_without_key_in_block_is_rejected() {
        let reader = Reader::new("<test>", "a: b: c").unwrap();
        let mut scanner = Scanner::new(reader);
        let mut err = None;
        while scanner.has_more_tokens() {
            match scanner.next_token() {
                Ok(_) => {}
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        assert!(err
            .unwrap()
            .to_string()
            .contains("mapping values are not allowed here"));
    }
}
