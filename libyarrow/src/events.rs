//! Events produced by the parser.
//!
//! An event stream is the flattened form of the document graph: nested
//! collections become balanced start/end pairs, and aliases stand in for
//! already-seen nodes. Node properties (anchor, tag) ride on the start
//! event of the node they decorate.

use crate::mark::Span;
use crate::tags::Tag;
use crate::tokens::ScalarStyle;

/// A parse event. Produced once by the parser, consumed once by the
/// composer.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub data: EventData,
    pub span: Span,
}

/// The event variants of the YAML event grammar:
///
/// ```text
/// stream   ::= StreamStart document* StreamEnd
/// document ::= DocumentStart node DocumentEnd
/// node     ::= Alias | Scalar | sequence | mapping
/// sequence ::= SequenceStart node* SequenceEnd
/// mapping  ::= MappingStart (node node)* MappingEnd
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    StreamStart,
    StreamEnd,
    DocumentStart {
        /// Whether the document began without an explicit `---`.
        implicit: bool,
    },
    DocumentEnd {
        /// Whether the document ended without an explicit `...`.
        implicit: bool,
    },
    Alias {
        anchor: String,
    },
    Scalar {
        anchor: Option<String>,
        /// Explicit tag, if the scalar carried one.
        tag: Option<Tag>,
        /// `(plain, quoted)` implicitness: whether the tag may be resolved
        /// from the value when the scalar is plain, or when it is quoted.
        implicit: (bool, bool),
        value: String,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<Tag>,
        flow: bool,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<Tag>,
        flow: bool,
    },
    MappingEnd,
}

impl EventData {
    /// Whether this event opens a node (scalar, alias, or collection
    /// start).
    pub fn is_node_start(&self) -> bool {
        matches!(
            self,
            EventData::Alias { .. }
                | EventData::Scalar { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. }
        )
    }
}
