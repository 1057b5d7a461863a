//! Yarrow, a YAML document engine.
//!
//! Yarrow reads YAML streams into token streams, event streams, node
//! graphs, or native values, with precise source positions throughout.
//!
//! # Pipeline
//!
//! The engine is a chain of pull-based stages; each stage draws from the
//! previous one on demand, so a document is processed in a single pass:
//!
//! 1. **Reader**: Decodes and validates the source, exposing characters
//!    with line/column tracking.
//!
//! 2. **Scanner**: Converts characters into tokens, handling indentation,
//!    flow nesting, and simple-key lookahead.
//!
//! 3. **Parser**: Runs the YAML grammar as an explicit state machine,
//!    producing events.
//!
//! 4. **Resolver**: Assigns tags to untagged nodes by pattern-matching
//!    plain scalar values.
//!
//! 5. **Composer**: Builds one node graph per document, wiring anchors
//!    and aliases (cycles included).
//!
//! 6. **Constructor**: Turns node graphs into native [`Value`]s through a
//!    per-tag registry, with merge-key and `${NAME}` environment
//!    substitution support.
//!
//! The convenience functions below run the pipeline up to a chosen stage.

mod composer;
mod constructor;
mod error;
mod events;
mod mark;
mod options;
mod parser;
mod reader;
mod resolver;
mod scanner;
mod tags;
mod tokens;

pub use composer::{Composer, Node, NodeContent};
pub use constructor::{ConstructFn, Constructor, EnvLookup, Value};
pub use error::{Error, ErrorContext, Result};
pub use events::{Event, EventData};
pub use mark::{Mark, Span};
pub use options::Options;
pub use parser::Parser;
pub use reader::Reader;
pub use resolver::{NodeKind, Resolver, ENV_PATTERN};
pub use scanner::Scanner;
pub use tags::Tag;
pub use tokens::{DirectiveValue, ScalarStyle, Token, TokenData};

use std::rc::Rc;

fn source_name(filename: Option<&str>) -> &str {
    filename.unwrap_or("<input>")
}

fn composer_for(input: &str, filename: Option<&str>, options: Options) -> Result<Composer> {
    let reader = Reader::new(source_name(filename), input)?;
    let scanner = Scanner::with_options(reader, options);
    let parser = Parser::with_options(scanner, options);
    Ok(Composer::with_options(parser, options))
}

/// Tokenize a YAML stream.
pub fn scan(input: &str) -> Result<Vec<Token>> {
    scan_with(input, None, Options::default())
}

/// Tokenize a YAML stream with a source name and options.
pub fn scan_with(input: &str, filename: Option<&str>, options: Options) -> Result<Vec<Token>> {
    let reader = Reader::new(source_name(filename), input)?;
    let mut scanner = Scanner::with_options(reader, options);
    let mut tokens = Vec::new();
    while scanner.has_more_tokens() {
        tokens.push(scanner.next_token()?);
    }
    Ok(tokens)
}

/// Parse a YAML stream into events.
pub fn parse_events(input: &str) -> Result<Vec<Event>> {
    parse_events_with(input, None, Options::default())
}

/// Parse a YAML stream into events with a source name and options.
pub fn parse_events_with(
    input: &str,
    filename: Option<&str>,
    options: Options,
) -> Result<Vec<Event>> {
    let reader = Reader::new(source_name(filename), input)?;
    let scanner = Scanner::with_options(reader, options);
    let mut parser = Parser::with_options(scanner, options);
    let mut events = Vec::new();
    while parser.has_more_events() {
        events.push(parser.next_event()?);
    }
    Ok(events)
}

/// Compose a stream expected to hold at most one document into a node
/// graph. An empty stream yields `None`; a second document is an error.
pub fn compose(input: &str) -> Result<Option<Rc<Node>>> {
    compose_with(input, None, Options::default())
}

/// Compose a single document with a source name and options.
pub fn compose_with(
    input: &str,
    filename: Option<&str>,
    options: Options,
) -> Result<Option<Rc<Node>>> {
    composer_for(input, filename, options)?.compose_single()
}

/// Compose every document in a stream into node graphs.
pub fn compose_all(input: &str) -> Result<Vec<Rc<Node>>> {
    compose_all_with(input, None, Options::default())
}

/// Compose every document with a source name and options.
pub fn compose_all_with(
    input: &str,
    filename: Option<&str>,
    options: Options,
) -> Result<Vec<Rc<Node>>> {
    let mut composer = composer_for(input, filename, options)?;
    let mut documents = Vec::new();
    while composer.has_more_documents()? {
        documents.push(composer.next_document()?);
    }
    Ok(documents)
}

/// Load a stream expected to hold at most one document into a native
/// value.
///
/// # Example
///
/// ```
/// use libyarrow::load;
///
/// let value = load("answer: 42").unwrap().unwrap();
/// assert!(value.get("answer").is_some());
/// ```
pub fn load(input: &str) -> Result<Option<Value>> {
    load_with(input, None, Options::default())
}

/// Load a single document with a source name and options. Environment
/// substitution draws from the process environment; use a
/// [`Constructor`] directly for anything else.
pub fn load_with(input: &str, filename: Option<&str>, options: Options) -> Result<Option<Value>> {
    let constructor = Constructor::new();
    match compose_with(input, filename, options)? {
        Some(node) => Ok(Some(constructor.construct(&node)?)),
        None => Ok(None),
    }
}

/// Load every document in a stream into native values.
pub fn load_all(input: &str) -> Result<Vec<Value>> {
    load_all_with(input, None, Options::default())
}

/// Load every document with a source name and options.
pub fn load_all_with(input: &str, filename: Option<&str>, options: Options) -> Result<Vec<Value>> {
    let constructor = Constructor::new();
    let mut composer = composer_for(input, filename, options)?;
    let mut values = Vec::new();
    while composer.has_more_documents()? {
        let node = composer.next_document()?;
        values.push(constructor.construct(&node)?);
    }
    Ok(values)
}
