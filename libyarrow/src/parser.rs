//! Phase 3: Parser
//!
//! The parser pulls tokens from the [`Scanner`] and produces a lazy stream
//! of [`Event`]s following the YAML event grammar. Instead of recursive
//! descent it runs an explicit state machine: `state` names the production
//! being parsed, and `states` is the continuation stack a finished node
//! returns to. This keeps the parser a pull source like the stages around
//! it, with no recursion bound other than the token stream itself.
//!
//! The parser also interprets `%YAML` and `%TAG` directives and expands
//! tag handles into full tags.

use crate::error::{Error, Result};
use crate::events::{Event, EventData};
use crate::mark::{Mark, Span};
use crate::options::Options;
use crate::scanner::Scanner;
use crate::tags::Tag;
use crate::tokens::{DirectiveValue, ScalarStyle, Token, TokenData};
use std::collections::HashMap;

/// A parser production. Each value names the grammar position the next
/// token will be interpreted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
}

/// Token stream to event stream.
pub struct Parser {
    scanner: Scanner,
    options: Options,
    /// The production to run on the next pull; `None` once the stream has
    /// ended.
    state: Option<State>,
    /// Continuation stack: the production to resume after the current
    /// node is finished.
    states: Vec<State>,
    /// Start marks of the enclosing collections, for error context.
    marks: Vec<Mark>,
    /// One-slot lookahead buffer for peek_event.
    buffered: Option<Event>,
    yaml_version: Option<(u32, u32)>,
    tag_handles: HashMap<String, String>,
}

fn default_tag_handles() -> [(&'static str, &'static str); 2] {
    [("!", "!"), ("!!", "tag:yaml.org,2002:")]
}

impl Parser {
    pub fn new(scanner: Scanner) -> Self {
        Self::with_options(scanner, Options::default())
    }

    pub fn with_options(scanner: Scanner, options: Options) -> Self {
        Self {
            scanner,
            options,
            state: Some(State::StreamStart),
            states: Vec::new(),
            marks: Vec::new(),
            buffered: None,
            yaml_version: None,
            tag_handles: HashMap::new(),
        }
    }

    /// Whether another event remains (the terminal `StreamEnd` included).
    pub fn has_more_events(&self) -> bool {
        self.buffered.is_some() || self.state.is_some()
    }

    /// Look at the next event without consuming it.
    pub fn peek_event(&mut self) -> Result<&Event> {
        if self.buffered.is_none() {
            self.buffered = Some(self.produce()?);
        }
        Ok(self.buffered.as_ref().expect("event was just buffered"))
    }

    /// Consume and return the next event. Pulling again after `StreamEnd`
    /// is an error.
    pub fn next_event(&mut self) -> Result<Event> {
        if let Some(event) = self.buffered.take() {
            return Ok(event);
        }
        self.produce()
    }

    fn produce(&mut self) -> Result<Event> {
        let Some(state) = self.state.take() else {
            return Err(Error::EndOfStream("events"));
        };
        self.dispatch(state)
    }

    fn dispatch(&mut self, state: State) -> Result<Event> {
        match state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_implicit_document_start(),
            State::DocumentStart => self.parse_document_start(),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            State::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            State::BlockMappingKey => self.parse_block_mapping_key(false),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
        }
    }

    // ========================================================================
    // Token access
    // ========================================================================

    fn peek_is(&mut self, pred: fn(&TokenData) -> bool) -> Result<bool> {
        Ok(pred(&self.scanner.peek_token()?.data))
    }

    fn peek_span(&mut self) -> Result<Span> {
        Ok(self.scanner.peek_token()?.span.clone())
    }

    fn next_token(&mut self) -> Result<Token> {
        self.scanner.next_token()
    }

    /// Error payload for an unexpected token: its description and start
    /// mark.
    fn unexpected(&mut self) -> Result<(String, Mark)> {
        let token = self.scanner.peek_token()?;
        Ok((token.data.describe(), token.span.start.clone()))
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().expect("continuation stack cannot be empty")
    }

    fn empty_scalar(mark: Mark) -> Event {
        Event {
            data: EventData::Scalar {
                anchor: None,
                tag: None,
                implicit: (true, false),
                value: String::new(),
                style: ScalarStyle::Plain,
            },
            span: Span::at(mark),
        }
    }

    // ========================================================================
    // Stream and documents
    // ========================================================================

    fn parse_stream_start(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        self.state = Some(State::ImplicitDocumentStart);
        Ok(Event {
            data: EventData::StreamStart,
            span: token.span,
        })
    }

    fn parse_implicit_document_start(&mut self) -> Result<Event> {
        let explicit = self.peek_is(|t| {
            matches!(
                t,
                TokenData::Directive { .. } | TokenData::DocumentStart | TokenData::StreamEnd
            )
        })?;
        if explicit {
            return self.parse_document_start();
        }
        if self.options.require_document_markers {
            let (found, mark) = self.unexpected()?;
            return Err(Error::parser(
                format!("expected '---' document start marker, but found {}", found),
                mark,
            ));
        }
        self.tag_handles = default_tag_handles()
            .iter()
            .map(|&(h, p)| (h.to_string(), p.to_string()))
            .collect();
        let span = self.peek_span()?;
        self.states.push(State::DocumentEnd);
        self.state = Some(State::BlockNode);
        Ok(Event {
            data: EventData::DocumentStart { implicit: true },
            span: Span::at(span.start),
        })
    }

    fn parse_document_start(&mut self) -> Result<Event> {
        while self.peek_is(|t| *t == TokenData::DocumentEnd)? {
            self.next_token()?;
        }
        if self.peek_is(|t| *t == TokenData::StreamEnd)? {
            let token = self.next_token()?;
            debug_assert!(self.states.is_empty());
            debug_assert!(self.marks.is_empty());
            self.state = None;
            return Ok(Event {
                data: EventData::StreamEnd,
                span: token.span,
            });
        }
        let start_mark = self.peek_span()?.start;
        self.process_directives()?;
        if !self.peek_is(|t| *t == TokenData::DocumentStart)? {
            let (found, mark) = self.unexpected()?;
            return Err(Error::parser(
                format!("expected '<document start>', but found {}", found),
                mark,
            ));
        }
        let token = self.next_token()?;
        self.states.push(State::DocumentEnd);
        self.state = Some(State::DocumentContent);
        Ok(Event {
            data: EventData::DocumentStart { implicit: false },
            span: Span::new(start_mark, token.span.end),
        })
    }

    fn parse_document_end(&mut self) -> Result<Event> {
        let span = self.peek_span()?;
        let (span, explicit) = if self.peek_is(|t| *t == TokenData::DocumentEnd)? {
            (self.next_token()?.span, true)
        } else {
            (Span::at(span.start), false)
        };
        self.state = Some(State::DocumentStart);
        Ok(Event {
            data: EventData::DocumentEnd {
                implicit: !explicit,
            },
            span,
        })
    }

    fn parse_document_content(&mut self) -> Result<Event> {
        let at_boundary = self.peek_is(|t| {
            matches!(
                t,
                TokenData::Directive { .. }
                    | TokenData::DocumentStart
                    | TokenData::DocumentEnd
                    | TokenData::StreamEnd
            )
        })?;
        if at_boundary {
            let mark = self.peek_span()?.start;
            self.state = Some(self.pop_state());
            Ok(Self::empty_scalar(mark))
        } else {
            self.parse_node(true, false)
        }
    }

    /// Consume leading `%YAML` / `%TAG` directives and reset the
    /// per-document handle table.
    fn process_directives(&mut self) -> Result<()> {
        self.yaml_version = None;
        self.tag_handles.clear();
        while self.peek_is(|t| matches!(t, TokenData::Directive { .. }))? {
            let token = self.next_token()?;
            let TokenData::Directive { name, value } = token.data else {
                unreachable!("peeked token was a directive");
            };
            match (name.as_str(), value) {
                ("YAML", DirectiveValue::Version { major, minor }) => {
                    if self.yaml_version.is_some() {
                        return Err(Error::parser(
                            "found duplicate YAML directive",
                            token.span.start,
                        ));
                    }
                    if major != 1 {
                        return Err(Error::parser(
                            "found incompatible YAML document (version 1.* is required)",
                            token.span.start,
                        ));
                    }
                    self.yaml_version = Some((major, minor));
                }
                ("TAG", DirectiveValue::TagHandle { handle, prefix }) => {
                    if self.tag_handles.contains_key(&handle) {
                        return Err(Error::parser(
                            format!("duplicate tag handle {:?}", handle),
                            token.span.start,
                        ));
                    }
                    self.tag_handles.insert(handle, prefix);
                }
                _ => {}
            }
        }
        for (handle, prefix) in default_tag_handles() {
            self.tag_handles
                .entry(handle.to_string())
                .or_insert_with(|| prefix.to_string());
        }
        Ok(())
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event> {
        if self.peek_is(|t| matches!(t, TokenData::Alias(_)))? {
            let token = self.next_token()?;
            let TokenData::Alias(anchor) = token.data else {
                unreachable!("peeked token was an alias");
            };
            self.state = Some(self.pop_state());
            return Ok(Event {
                data: EventData::Alias { anchor },
                span: token.span,
            });
        }

        // Collect node properties: an anchor and a tag, in either order.
        let mut anchor = None;
        let mut raw_tag: Option<(Option<String>, String)> = None;
        let mut start_mark: Option<Mark> = None;
        let mut tag_mark: Option<Mark> = None;
        if self.peek_is(|t| matches!(t, TokenData::Anchor(_)))? {
            let token = self.next_token()?;
            let TokenData::Anchor(name) = token.data else {
                unreachable!("peeked token was an anchor");
            };
            start_mark = Some(token.span.start);
            anchor = Some(name);
            if self.peek_is(|t| matches!(t, TokenData::Tag { .. }))? {
                let token = self.next_token()?;
                let TokenData::Tag { handle, suffix } = token.data else {
                    unreachable!("peeked token was a tag");
                };
                tag_mark = Some(token.span.start);
                raw_tag = Some((handle, suffix));
            }
        } else if self.peek_is(|t| matches!(t, TokenData::Tag { .. }))? {
            let token = self.next_token()?;
            let TokenData::Tag { handle, suffix } = token.data else {
                unreachable!("peeked token was a tag");
            };
            start_mark = Some(token.span.start.clone());
            tag_mark = Some(token.span.start);
            raw_tag = Some((handle, suffix));
            if self.peek_is(|t| matches!(t, TokenData::Anchor(_)))? {
                let token = self.next_token()?;
                let TokenData::Anchor(name) = token.data else {
                    unreachable!("peeked token was an anchor");
                };
                anchor = Some(name);
            }
        }

        // Expand a shorthand tag through the handle table.
        let tag: Option<Tag> = match raw_tag {
            None => None,
            Some((None, suffix)) => Some(Tag::new(suffix)),
            Some((Some(handle), suffix)) => {
                let Some(prefix) = self.tag_handles.get(&handle) else {
                    return Err(Error::parser_in(
                        "while parsing a node",
                        start_mark.clone().expect("tagged node has a start mark"),
                        format!("found undefined tag handle {:?}", handle),
                        tag_mark.expect("tagged node has a tag mark"),
                    ));
                };
                Some(Tag::new(format!("{}{}", prefix, suffix)))
            }
        };

        let implicit = tag.is_none();
        let non_specific = tag.as_ref() == Some(&Tag::NON_SPECIFIC);

        if indentless_sequence && self.peek_is(|t| *t == TokenData::BlockEntry)? {
            let end_mark = self.peek_span()?.end;
            let start = start_mark.unwrap_or_else(|| end_mark.clone());
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    flow: false,
                },
                span: Span::new(start, end_mark),
            });
        }

        if self.peek_is(|t| matches!(t, TokenData::Scalar { .. }))? {
            let token = self.next_token()?;
            let TokenData::Scalar { value, style } = token.data else {
                unreachable!("peeked token was a scalar");
            };
            let implicit_pair = if (style == ScalarStyle::Plain && implicit) || non_specific {
                (true, false)
            } else if implicit {
                (false, true)
            } else {
                (false, false)
            };
            let start = start_mark.unwrap_or_else(|| token.span.start.clone());
            self.state = Some(self.pop_state());
            return Ok(Event {
                data: EventData::Scalar {
                    anchor,
                    tag,
                    implicit: implicit_pair,
                    value,
                    style,
                },
                span: Span::new(start, token.span.end),
            });
        }

        if self.peek_is(|t| *t == TokenData::FlowSequenceStart)? {
            let span = self.peek_span()?;
            let start = start_mark.unwrap_or_else(|| span.start.clone());
            self.state = Some(State::FlowSequenceFirstEntry);
            return Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    flow: true,
                },
                span: Span::new(start, span.end),
            });
        }

        if self.peek_is(|t| *t == TokenData::FlowMappingStart)? {
            let span = self.peek_span()?;
            let start = start_mark.unwrap_or_else(|| span.start.clone());
            self.state = Some(State::FlowMappingFirstKey);
            return Ok(Event {
                data: EventData::MappingStart {
                    anchor,
                    tag,
                    flow: true,
                },
                span: Span::new(start, span.end),
            });
        }

        if block && self.peek_is(|t| *t == TokenData::BlockSequenceStart)? {
            let span = self.peek_span()?;
            let start = start_mark.unwrap_or_else(|| span.start.clone());
            self.state = Some(State::BlockSequenceFirstEntry);
            return Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    flow: false,
                },
                span: Span::new(start, span.end),
            });
        }

        if block && self.peek_is(|t| *t == TokenData::BlockMappingStart)? {
            let span = self.peek_span()?;
            let start = start_mark.unwrap_or_else(|| span.start.clone());
            self.state = Some(State::BlockMappingFirstKey);
            return Ok(Event {
                data: EventData::MappingStart {
                    anchor,
                    tag,
                    flow: false,
                },
                span: Span::new(start, span.end),
            });
        }

        if anchor.is_some() || tag.is_some() {
            // A node with properties but no content is an empty scalar.
            let start = start_mark.expect("node with properties has a start mark");
            self.state = Some(self.pop_state());
            return Ok(Event {
                data: EventData::Scalar {
                    anchor,
                    tag,
                    implicit: (implicit || non_specific, false),
                    value: String::new(),
                    style: ScalarStyle::Plain,
                },
                span: Span::at(start),
            });
        }

        let what = if block { "a block node" } else { "a flow node" };
        let (found, mark) = self.unexpected()?;
        Err(Error::parser_in(
            format!("while parsing {}", what),
            start_mark.unwrap_or_else(|| mark.clone()),
            format!("expected the node content, but found {}", found),
            mark,
        ))
    }

    // ========================================================================
    // Block collections
    // ========================================================================

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event> {
        if first {
            let span = self.peek_span()?;
            self.marks.push(span.start);
            self.next_token()?;
        }
        if self.peek_is(|t| *t == TokenData::BlockEntry)? {
            let token = self.next_token()?;
            if self.peek_is(|t| matches!(t, TokenData::BlockEntry | TokenData::BlockEnd))? {
                self.state = Some(State::BlockSequenceEntry);
                return Ok(Self::empty_scalar(token.span.end));
            }
            self.states.push(State::BlockSequenceEntry);
            return self.parse_node(true, false);
        }
        if !self.peek_is(|t| *t == TokenData::BlockEnd)? {
            let (found, mark) = self.unexpected()?;
            return Err(Error::parser_in(
                "while parsing a block collection",
                self.marks.last().expect("collection has a start mark").clone(),
                format!("expected <block end>, but found {}", found),
                mark,
            ));
        }
        let token = self.next_token()?;
        self.marks.pop();
        self.state = Some(self.pop_state());
        Ok(Event {
            data: EventData::SequenceEnd,
            span: token.span,
        })
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event> {
        if self.peek_is(|t| *t == TokenData::BlockEntry)? {
            let token = self.next_token()?;
            let at_boundary = self.peek_is(|t| {
                matches!(
                    t,
                    TokenData::BlockEntry
                        | TokenData::Key
                        | TokenData::Value
                        | TokenData::BlockEnd
                )
            })?;
            if at_boundary {
                self.state = Some(State::IndentlessSequenceEntry);
                return Ok(Self::empty_scalar(token.span.end));
            }
            self.states.push(State::IndentlessSequenceEntry);
            return self.parse_node(true, false);
        }
        // An indentless sequence has no closing token.
        let mark = self.peek_span()?.start;
        self.state = Some(self.pop_state());
        Ok(Event {
            data: EventData::SequenceEnd,
            span: Span::at(mark),
        })
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event> {
        if first {
            let span = self.peek_span()?;
            self.marks.push(span.start);
            self.next_token()?;
        }
        if self.peek_is(|t| *t == TokenData::Key)? {
            let token = self.next_token()?;
            let at_boundary = self.peek_is(|t| {
                matches!(t, TokenData::Key | TokenData::Value | TokenData::BlockEnd)
            })?;
            if at_boundary {
                self.state = Some(State::BlockMappingValue);
                return Ok(Self::empty_scalar(token.span.end));
            }
            self.states.push(State::BlockMappingValue);
            return self.parse_node(true, true);
        }
        if !self.peek_is(|t| *t == TokenData::BlockEnd)? {
            let (found, mark) = self.unexpected()?;
            return Err(Error::parser_in(
                "while parsing a block mapping",
                self.marks.last().expect("collection has a start mark").clone(),
                format!("expected <block end>, but found {}", found),
                mark,
            ));
        }
        let token = self.next_token()?;
        self.marks.pop();
        self.state = Some(self.pop_state());
        Ok(Event {
            data: EventData::MappingEnd,
            span: token.span,
        })
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event> {
        if self.peek_is(|t| *t == TokenData::Value)? {
            let token = self.next_token()?;
            let at_boundary = self.peek_is(|t| {
                matches!(t, TokenData::Key | TokenData::Value | TokenData::BlockEnd)
            })?;
            if at_boundary {
                self.state = Some(State::BlockMappingKey);
                return Ok(Self::empty_scalar(token.span.end));
            }
            self.states.push(State::BlockMappingKey);
            return self.parse_node(true, true);
        }
        let mark = self.peek_span()?.start;
        self.state = Some(State::BlockMappingKey);
        Ok(Self::empty_scalar(mark))
    }

    // ========================================================================
    // Flow collections
    // ========================================================================

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event> {
        if first {
            let span = self.peek_span()?;
            self.marks.push(span.start);
            self.next_token()?;
        }
        if !self.peek_is(|t| *t == TokenData::FlowSequenceEnd)? {
            if !first {
                if self.peek_is(|t| *t == TokenData::FlowEntry)? {
                    self.next_token()?;
                } else {
                    let (found, mark) = self.unexpected()?;
                    return Err(Error::parser_in(
                        "while parsing a flow sequence",
                        self.marks.last().expect("collection has a start mark").clone(),
                        format!("expected ',' or ']', but got {}", found),
                        mark,
                    ));
                }
            }
            if self.peek_is(|t| *t == TokenData::Key)? {
                // `[? key: value]` opens a single-pair mapping entry.
                let token = self.next_token()?;
                self.state = Some(State::FlowSequenceEntryMappingKey);
                return Ok(Event {
                    data: EventData::MappingStart {
                        anchor: None,
                        tag: None,
                        flow: true,
                    },
                    span: token.span,
                });
            }
            if !self.peek_is(|t| *t == TokenData::FlowSequenceEnd)? {
                self.states.push(State::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let token = self.next_token()?;
        self.marks.pop();
        self.state = Some(self.pop_state());
        Ok(Event {
            data: EventData::SequenceEnd,
            span: token.span,
        })
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event> {
        let at_boundary = self.peek_is(|t| {
            matches!(
                t,
                TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd
            )
        })?;
        if at_boundary {
            let mark = self.peek_span()?.end;
            self.state = Some(State::FlowSequenceEntryMappingValue);
            return Ok(Self::empty_scalar(mark));
        }
        self.states.push(State::FlowSequenceEntryMappingValue);
        self.parse_node(false, false)
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event> {
        if self.peek_is(|t| *t == TokenData::Value)? {
            let token = self.next_token()?;
            let at_boundary =
                self.peek_is(|t| matches!(t, TokenData::FlowEntry | TokenData::FlowSequenceEnd))?;
            if at_boundary {
                self.state = Some(State::FlowSequenceEntryMappingEnd);
                return Ok(Self::empty_scalar(token.span.end));
            }
            self.states.push(State::FlowSequenceEntryMappingEnd);
            return self.parse_node(false, false);
        }
        let mark = self.peek_span()?.start;
        self.state = Some(State::FlowSequenceEntryMappingEnd);
        Ok(Self::empty_scalar(mark))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event> {
        let mark = self.peek_span()?.start;
        self.state = Some(State::FlowSequenceEntry);
        Ok(Event {
            data: EventData::MappingEnd,
            span: Span::at(mark),
        })
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event> {
        if first {
            let span = self.peek_span()?;
            self.marks.push(span.start);
            self.next_token()?;
        }
        if !self.peek_is(|t| *t == TokenData::FlowMappingEnd)? {
            if !first {
                if self.peek_is(|t| *t == TokenData::FlowEntry)? {
                    self.next_token()?;
                } else {
                    let (found, mark) = self.unexpected()?;
                    return Err(Error::parser_in(
                        "while parsing a flow mapping",
                        self.marks.last().expect("collection has a start mark").clone(),
                        format!("expected ',' or '}}', but got {}", found),
                        mark,
                    ));
                }
            }
            if self.peek_is(|t| *t == TokenData::Key)? {
                let token = self.next_token()?;
                let at_boundary = self.peek_is(|t| {
                    matches!(
                        t,
                        TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd
                    )
                })?;
                if at_boundary {
                    self.state = Some(State::FlowMappingValue);
                    return Ok(Self::empty_scalar(token.span.end));
                }
                self.states.push(State::FlowMappingValue);
                return self.parse_node(false, false);
            }
            if !self.peek_is(|t| *t == TokenData::FlowMappingEnd)? {
                // A lone node in a flow mapping is a key with an empty
                // value.
                self.states.push(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let token = self.next_token()?;
        self.marks.pop();
        self.state = Some(self.pop_state());
        Ok(Event {
            data: EventData::MappingEnd,
            span: token.span,
        })
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event> {
        if empty {
            let mark = self.peek_span()?.start;
            self.state = Some(State::FlowMappingKey);
            return Ok(Self::empty_scalar(mark));
        }
        if self.peek_is(|t| *t == TokenData::Value)? {
            let token = self.next_token()?;
            let at_boundary =
                self.peek_is(|t| matches!(t, TokenData::FlowEntry | TokenData::FlowMappingEnd))?;
            if at_boundary {
                self.state = Some(State::FlowMappingKey);
                return Ok(Self::empty_scalar(token.span.end));
            }
            self.states.push(State::FlowMappingKey);
            return self.parse_node(false, false);
        }
        let mark = self.peek_span()?.start;
        self.state = Some(State::FlowMappingKey);
        Ok(Self::empty_scalar(mark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    fn parse_all(input: &str) -> Vec<EventData> {
        let reader = Reader::new("<test>", input).unwrap();
        let mut parser = Parser::new(Scanner::new(reader));
        let mut events = Vec::new();
        while parser.has_more_events() {
            events.push(parser.next_event().unwrap().data);
        }
        events
    }

    fn plain(value: &str) -> EventData {
        EventData::Scalar {
            anchor: None,
            tag: None,
            implicit: (true, false),
            value: value.to_string(),
            style: ScalarStyle::Plain,
        }
    }

    #[test]
    fn test_single_scalar_document() {
        assert_eq!(
            parse_all("hello"),
            vec![
                EventData::StreamStart,
                EventData::DocumentStart { implicit: true },
                plain("hello"),
                EventData::DocumentEnd { implicit: true },
                EventData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_block_mapping_events() {
        assert_eq!(
            parse_all("a: 1\nb: 2\n"),
            vec![
                EventData::StreamStart,
                EventData::DocumentStart { implicit: true },
                EventData::MappingStart {
                    anchor: None,
                    tag: None,
                    flow: false,
                },
                plain("a"),
                plain("1"),
                plain("b"),
                plain("2"),
                EventData::MappingEnd,
                EventData::DocumentEnd { implicit: true },
                EventData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_flow_sequence_events() {
        assert_eq!(
            parse_all("[a, b]"),
            vec![
                EventData::StreamStart,
                EventData::DocumentStart { implicit: true },
                EventData::SequenceStart {
                    anchor: None,
                    tag: None,
                    flow: true,
                },
                plain("a"),
                plain("b"),
                EventData::SequenceEnd,
                EventData::DocumentEnd { implicit: true },
                EventData::StreamEnd,
            ]
        );
    }

    #[test]
    fn test_multiple_documents() {
        let events = parse_all("---\none\n---\ntwo\n");
        let doc_starts = events
            .iter()
            .filter(|e| matches!(e, EventData::DocumentStart { .. }))
            .count();
        assert_eq!(doc_starts, 2);
        assert!(events.contains(&plain("one")));
        assert!(events.contains(&plain("two")));
    }

    #[test]
    fn test_anchor_rides_on_start_event() {
        let events = parse_all("- &a x\n- *a\n");
        assert!(events.contains(&EventData::Scalar {
            anchor: Some("a".to_string()),
            tag: None,
            implicit: (true, false),
            value: "x".to_string(),
            style: ScalarStyle::Plain,
        }));
        assert!(events.contains(&EventData::Alias {
            anchor: "a".to_string(),
        }));
    }

    #[test]
    fn test_shorthand_tag_expansion() {
        let events = parse_all("!!str 1");
        assert!(events.contains(&EventData::Scalar {
            anchor: None,
            tag: Some(Tag::STR),
            implicit: (false, false),
            value: "1".to_string(),
            style: ScalarStyle::Plain,
        }));
    }

    #[test]
    fn test_tag_directive_expansion() {
        let events = parse_all("%TAG !e! tag:example.com,2000:app/\n---\n!e!foo bar\n");
        assert!(events.contains(&EventData::Scalar {
            anchor: None,
            tag: Some(Tag::new("tag:example.com,2000:app/foo")),
            implicit: (false, false),
            value: "bar".to_string(),
            style: ScalarStyle::Plain,
        }));
    }

    #[test]
    fn test_undefined_tag_handle() {
        let reader = Reader::new("<test>", "!e!foo bar").unwrap();
        let mut parser = Parser::new(Scanner::new(reader));
        let mut err = None;
        while parser.has_more_events() {
            match parser.next_event() {
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
            .contains("found undefined tag handle"));
    }

    #[test]
    fn test_incompatible_version() {
        let reader = Reader::new("<test>", "%YAML 2.0\n---\nx\n").unwrap();
        let mut parser = Parser::new(Scanner::new(reader));
        let mut err = None;
        while parser.has_more_events() {
            match parser.next_event() {
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
            .contains("version 1.* is required"));
    }

    #[test]
    fn test_empty_value_in_block_mapping() {
        let events = parse_all("a:\nb: 2\n");
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, EventData::Scalar { .. }))
                .count(),
            4
        );
        assert!(events.contains(&plain("")));
    }

    #[test]
    fn test_pull_past_end_is_an_error() {
        let reader = Reader::new("<test>", "x").unwrap();
        let mut parser = Parser::new(Scanner::new(reader));
        while parser.has_more_events() {
            parser.next_event().unwrap();
        }
        assert!(matches!(
            parser.next_event(),
            Err(Error::EndOfStream("events"))
        ));
    }

    #[test]
    fn test_require_document_markers() {
        let options = Options {
            require_document_markers: true,
            ..Options::default()
        };
        let reader = Reader::new("<test>", "a: 1\n").unwrap();
        let scanner = Scanner::with_options(reader, options);
        let mut parser = Parser::with_options(scanner, options);
        let mut err = None;
        while parser.has_more_events() {
            match parser.next_event() {
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
            .contains("expected '---' document start marker"));

        let reader = Reader::new("<test>", "---\na: 1\n").unwrap();
        let scanner = Scanner::with_options(reader, options);
        let mut parser = Parser::with_options(scanner, options);
        while parser.has_more_events() {
            parser.next_event().unwrap();
        }
    }
}
