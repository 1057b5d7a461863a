//! Phase 5: Composer
//!
//! The composer pulls events from the [`Parser`] and builds one [`Node`]
//! graph per document. Anchors are registered in a per-document table the
//! moment the node is created, before its children compose, so an alias
//! may refer to any ancestor and the result is a genuinely cyclic graph.
//! Aliases share the anchored node itself (`Rc` identity), not a copy.
//!
//! Nodes that carry no explicit tag are assigned one here through the
//! [`Resolver`].

use crate::error::{Error, Result};
use crate::events::EventData;
use crate::mark::Span;
use crate::options::Options;
use crate::parser::Parser;
use crate::resolver::{NodeKind, Resolver};
use crate::tags::Tag;
use crate::tokens::ScalarStyle;
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// A node of the document graph: a resolved tag, the anchor it was
/// defined under (if any), its source extent, and its content.
#[derive(Debug)]
pub struct Node {
    pub tag: Tag,
    pub anchor: Option<String>,
    span: RefCell<Span>,
    pub content: NodeContent,
}

/// Node content. Collection children sit behind `RefCell` so the node
/// can enter the anchor table before they are composed.
#[derive(Debug)]
pub enum NodeContent {
    Scalar {
        value: String,
        style: ScalarStyle,
    },
    Sequence(RefCell<Vec<Rc<Node>>>),
    Mapping(RefCell<Vec<(Rc<Node>, Rc<Node>)>>),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match &self.content {
            NodeContent::Scalar { .. } => NodeKind::Scalar,
            NodeContent::Sequence(_) => NodeKind::Sequence,
            NodeContent::Mapping(_) => NodeKind::Mapping,
        }
    }

    /// The source extent of this node.
    pub fn span(&self) -> Span {
        self.span.borrow().clone()
    }

    /// The scalar text, for scalar nodes.
    pub fn scalar_value(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The children, for sequence nodes.
    pub fn sequence(&self) -> Option<Ref<'_, Vec<Rc<Node>>>> {
        match &self.content {
            NodeContent::Sequence(children) => Some(children.borrow()),
            _ => None,
        }
    }

    /// The key/value pairs in document order, for mapping nodes.
    pub fn mapping(&self) -> Option<Ref<'_, Vec<(Rc<Node>, Rc<Node>)>>> {
        match &self.content {
            NodeContent::Mapping(pairs) => Some(pairs.borrow()),
            _ => None,
        }
    }
}

/// Event stream to node graphs.
pub struct Composer {
    parser: Parser,
    resolver: Resolver,
    options: Options,
    anchors: HashMap<String, Rc<Node>>,
    started: bool,
    finished: bool,
}

impl Composer {
    pub fn new(parser: Parser) -> Self {
        Self::with_options(parser, Options::default())
    }

    pub fn with_options(parser: Parser, options: Options) -> Self {
        Self::with_resolver(parser, Resolver::default(), options)
    }

    /// Use a custom implicit-resolution table.
    pub fn with_resolver(parser: Parser, resolver: Resolver, options: Options) -> Self {
        Self {
            parser,
            resolver,
            options,
            anchors: HashMap::new(),
            started: false,
            finished: false,
        }
    }

    fn start(&mut self) -> Result<()> {
        if !self.started {
            let event = self.parser.next_event()?;
            debug_assert!(matches!(event.data, EventData::StreamStart));
            self.started = true;
        }
        Ok(())
    }

    /// Whether another document remains in the stream.
    pub fn has_more_documents(&mut self) -> Result<bool> {
        self.start()?;
        if self.finished {
            return Ok(false);
        }
        if matches!(self.parser.peek_event()?.data, EventData::StreamEnd) {
            self.parser.next_event()?;
            self.finished = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// Compose the next document. Pulling past the end of the stream is
    /// an error.
    pub fn next_document(&mut self) -> Result<Rc<Node>> {
        if !self.has_more_documents()? {
            return Err(Error::EndOfStream("documents"));
        }
        self.compose_document()
    }

    /// Compose a stream expected to hold at most one document. A second
    /// document is an error; an empty stream yields `None`.
    pub fn compose_single(&mut self) -> Result<Option<Rc<Node>>> {
        let document = if self.has_more_documents()? {
            Some(self.compose_document()?)
        } else {
            None
        };
        if self.has_more_documents()? {
            let mark = self.parser.peek_event()?.span.start.clone();
            let first = document.as_ref().expect("a first document was composed");
            return Err(Error::composer_in(
                "expected a single document in the stream",
                first.span().start,
                "but found another document",
                mark,
            ));
        }
        Ok(document)
    }

    fn compose_document(&mut self) -> Result<Rc<Node>> {
        // DocumentStart
        self.parser.next_event()?;
        let node = self.compose_node(0)?;
        // DocumentEnd
        self.parser.next_event()?;
        // Anchors do not cross document boundaries.
        self.anchors.clear();
        Ok(node)
    }

    fn compose_node(&mut self, depth: usize) -> Result<Rc<Node>> {
        if depth > self.options.max_nesting_depth {
            let mark = self.parser.peek_event()?.span.start.clone();
            return Err(Error::composer(
                format!(
                    "exceeded maximum nesting depth of {}",
                    self.options.max_nesting_depth
                ),
                Some(mark),
            ));
        }
        match &self.parser.peek_event()?.data {
            EventData::Alias { .. } => {
                let event = self.parser.next_event()?;
                let EventData::Alias { anchor } = event.data else {
                    unreachable!("peeked event was an alias");
                };
                match self.anchors.get(&anchor) {
                    Some(node) => Ok(node.clone()),
                    None => Err(Error::composer(
                        format!("found undefined alias {:?}", anchor),
                        Some(event.span.start),
                    )),
                }
            }
            EventData::Scalar { .. } => self.compose_scalar(),
            EventData::SequenceStart { .. } => self.compose_sequence(depth),
            EventData::MappingStart { .. } => self.compose_mapping(depth),
            _ => unreachable!("parser produces balanced node events"),
        }
    }

    fn resolve(&self, kind: NodeKind, value: &str, implicit: (bool, bool), tag: Option<Tag>) -> Tag {
        match tag {
            Some(tag) if tag != Tag::NON_SPECIFIC => tag,
            _ => self.resolver.resolve(kind, value, implicit),
        }
    }

    /// Register a node under its anchor. A repeated anchor silently
    /// shadows the earlier one from here on.
    fn register_anchor(&mut self, node: &Rc<Node>) {
        if let Some(name) = &node.anchor {
            self.anchors.insert(name.clone(), node.clone());
        }
    }

    fn compose_scalar(&mut self) -> Result<Rc<Node>> {
        let event = self.parser.next_event()?;
        let EventData::Scalar {
            anchor,
            tag,
            implicit,
            value,
            style,
        } = event.data
        else {
            unreachable!("peeked event was a scalar");
        };
        let tag = self.resolve(NodeKind::Scalar, &value, implicit, tag);
        let node = Rc::new(Node {
            tag,
            anchor,
            span: RefCell::new(event.span),
            content: NodeContent::Scalar { value, style },
        });
        self.register_anchor(&node);
        Ok(node)
    }

    fn compose_sequence(&mut self, depth: usize) -> Result<Rc<Node>> {
        let event = self.parser.next_event()?;
        let EventData::SequenceStart { anchor, tag, .. } = event.data else {
            unreachable!("peeked event was a sequence start");
        };
        let tag = self.resolve(NodeKind::Sequence, "", (false, false), tag);
        let node = Rc::new(Node {
            tag,
            anchor,
            span: RefCell::new(event.span),
            content: NodeContent::Sequence(RefCell::new(Vec::new())),
        });
        self.register_anchor(&node);
        while !matches!(self.parser.peek_event()?.data, EventData::SequenceEnd) {
            let child = self.compose_node(depth + 1)?;
            let NodeContent::Sequence(children) = &node.content else {
                unreachable!("node was created as a sequence");
            };
            children.borrow_mut().push(child);
        }
        let end = self.parser.next_event()?;
        node.span.borrow_mut().end = end.span.end;
        Ok(node)
    }

    fn compose_mapping(&mut self, depth: usize) -> Result<Rc<Node>> {
        let event = self.parser.next_event()?;
        let EventData::MappingStart { anchor, tag, .. } = event.data else {
            unreachable!("peeked event was a mapping start");
        };
        let tag = self.resolve(NodeKind::Mapping, "", (false, false), tag);
        let node = Rc::new(Node {
            tag,
            anchor,
            span: RefCell::new(event.span),
            content: NodeContent::Mapping(RefCell::new(Vec::new())),
        });
        self.register_anchor(&node);
        while !matches!(self.parser.peek_event()?.data, EventData::MappingEnd) {
            let key = self.compose_node(depth + 1)?;
            let value = self.compose_node(depth + 1)?;
            let NodeContent::Mapping(pairs) = &node.content else {
                unreachable!("node was created as a mapping");
            };
            pairs.borrow_mut().push((key, value));
        }
        let end = self.parser.next_event()?;
        node.span.borrow_mut().end = end.span.end;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;
    use crate::scanner::Scanner;

    fn composer(input: &str) -> Composer {
        let reader = Reader::new("<test>", input).unwrap();
        Composer::new(Parser::new(Scanner::new(reader)))
    }

    fn composer_with(input: &str, options: Options) -> Composer {
        let reader = Reader::new("<test>", input).unwrap();
        Composer::with_options(
            Parser::with_options(Scanner::with_options(reader, options), options),
            options,
        )
    }

    #[test]
    fn test_scalar_document() {
        let node = composer("hello").next_document().unwrap();
        assert_eq!(node.tag, Tag::STR);
        assert_eq!(node.scalar_value(), Some("hello"));
    }

    #[test]
    fn test_implicit_typing() {
        let node = composer("[1, 1.5, true, null, x]").next_document().unwrap();
        let children = node.sequence().unwrap();
        let tags: Vec<Tag> = children.iter().map(|c| c.tag.clone()).collect();
        assert_eq!(
            tags,
            vec![Tag::INT, Tag::FLOAT, Tag::BOOL, Tag::NULL, Tag::STR]
        );
    }

    #[test]
    fn test_quoted_scalar_stays_string() {
        let node = composer("'1'").next_document().unwrap();
        assert_eq!(node.tag, Tag::STR);
    }

    #[test]
    fn test_alias_shares_identity() {
        let node = composer("- &a x\n- *a\n").next_document().unwrap();
        let children = node.sequence().unwrap();
        assert!(Rc::ptr_eq(&children[0], &children[1]));
    }

    #[test]
    fn test_numeric_anchor_name() {
        let node = composer("- &113 x\n- *113\n").next_document().unwrap();
        let children = node.sequence().unwrap();
        assert_eq!(children[0].anchor.as_deref(), Some("113"));
        assert!(Rc::ptr_eq(&children[0], &children[1]));
    }

    #[test]
    fn test_undefined_alias() {
        let err = composer("*nowhere").next_document().unwrap_err();
        assert!(err.to_string().contains("found undefined alias"));
    }

    #[test]
    fn test_anchor_redefinition_shadows() {
        let node = composer("- &a one\n- &a two\n- *a\n")
            .next_document()
            .unwrap();
        let children = node.sequence().unwrap();
        assert_eq!(children[2].scalar_value(), Some("two"));
        assert!(Rc::ptr_eq(&children[1], &children[2]));
    }

    #[test]
    fn test_anchors_do_not_cross_documents() {
        let mut composer = composer("--- &a x\n--- *a\n");
        composer.next_document().unwrap();
        let err = composer.next_document().unwrap_err();
        assert!(err.to_string().contains("found undefined alias"));
    }

    #[test]
    fn test_cyclic_graph() {
        let node = composer("&root\n- *root\n").next_document().unwrap();
        let children = node.sequence().unwrap();
        assert!(Rc::ptr_eq(&children[0], &node));
    }

    #[test]
    fn test_single_document_mode() {
        let mut composer = composer("one\n---\ntwo\n");
        let err = composer.compose_single().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("expected a single document in the stream"));
        assert!(text.contains("but found another document"));
    }

    #[test]
    fn test_single_document_mode_accepts_empty_stream() {
        assert!(composer("").compose_single().unwrap().is_none());
    }

    #[test]
    fn test_multiple_documents() {
        let mut composer = composer("---\none\n---\ntwo\n");
        let mut values = Vec::new();
        while composer.has_more_documents().unwrap() {
            let node = composer.next_document().unwrap();
            values.push(node.scalar_value().unwrap().to_string());
        }
        assert_eq!(values, vec!["one", "two"]);
        assert!(matches!(
            composer.next_document(),
            Err(Error::EndOfStream("documents"))
        ));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let options = Options {
            max_nesting_depth: 3,
            ..Options::default()
        };
        let err = composer_with("[[[[x]]]]", options)
            .next_document()
            .unwrap_err();
        assert!(err.to_string().contains("exceeded maximum nesting depth"));
    }

    #[test]
    fn test_mapping_preserves_order_and_duplicates() {
        let node = composer("a: 1\nb: 2\na: 3\n").next_document().unwrap();
        let pairs = node.mapping().unwrap();
        let keys: Vec<String> = pairs
            .iter()
            .map(|(k, _)| k.scalar_value().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b", "a"]);
    }
}
