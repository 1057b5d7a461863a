//! Tokens produced by the scanner.

use crate::mark::Span;
use std::fmt;

/// Presentation style of a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

/// A lexical token. Produced once by the scanner, consumed once by the
/// parser, immutable in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub data: TokenData,
    pub span: Span,
}

/// The token variants of the YAML grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenData {
    StreamStart,
    StreamEnd,
    /// A `%NAME value...` directive line. The payload is interpreted by the
    /// parser (`YAML` and `TAG` are recognized, others are ignored).
    Directive {
        name: String,
        value: DirectiveValue,
    },
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    BlockEntry,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    FlowEntry,
    Key,
    Value,
    Alias(String),
    Anchor(String),
    /// An explicit tag property, as (handle, suffix). A verbatim
    /// `!<tag:...>` tag has no handle.
    Tag {
        handle: Option<String>,
        suffix: String,
    },
    Scalar {
        value: String,
        style: ScalarStyle,
    },
}

impl TokenData {
    /// Whether this is a plain (unquoted, non-block) scalar.
    pub fn is_plain_scalar(&self) -> bool {
        matches!(
            self,
            TokenData::Scalar {
                style: ScalarStyle::Plain,
                ..
            }
        )
    }

    /// Short grammar-facing description used in parser error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenData::StreamStart => "<stream start>".into(),
            TokenData::StreamEnd => "<stream end>".into(),
            TokenData::Directive { name, .. } => format!("<directive %{}>", name),
            TokenData::DocumentStart => "<document start>".into(),
            TokenData::DocumentEnd => "<document end>".into(),
            TokenData::BlockSequenceStart => "<block sequence start>".into(),
            TokenData::BlockMappingStart => "<block mapping start>".into(),
            TokenData::BlockEnd => "<block end>".into(),
            TokenData::BlockEntry => "'-'".into(),
            TokenData::FlowSequenceStart => "'['".into(),
            TokenData::FlowSequenceEnd => "']'".into(),
            TokenData::FlowMappingStart => "'{'".into(),
            TokenData::FlowMappingEnd => "'}'".into(),
            TokenData::FlowEntry => "','".into(),
            TokenData::Key => "'?'".into(),
            TokenData::Value => "':'".into(),
            TokenData::Alias(name) => format!("alias '*{}'", name),
            TokenData::Anchor(name) => format!("anchor '&{}'", name),
            TokenData::Tag { .. } => "<tag>".into(),
            TokenData::Scalar { value, .. } => format!("scalar {:?}", value),
        }
    }
}

/// Parsed payload of a directive token.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveValue {
    /// `%YAML <major>.<minor>`
    Version { major: u32, minor: u32 },
    /// `%TAG <handle> <prefix>`
    TagHandle { handle: String, prefix: String },
    /// Any unrecognized directive; the rest of the line is skipped.
    Unknown,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data.describe())
    }
}
