//! Phase 6: Constructor
//!
//! The constructor turns a composed [`Node`] graph into native [`Value`]s.
//! Construction dispatches on the node's resolved tag through a registry,
//! so applications can add constructors for their own tags. The core
//! schema is registered by default, together with merge-key (`<<`)
//! expansion and `${NAME}` environment substitution.
//!
//! Owned values cannot alias, so an anchored subtree is constructed once
//! and shared by clone, and a cyclic graph is reported as an error.

use crate::composer::{Node, NodeContent};
use crate::error::{Error, Result};
use crate::resolver::{NodeKind, ENV_PATTERN};
use crate::tags::Tag;
use num_bigint::BigInt;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A native value constructed from a document.
///
/// Mappings keep their pairs in document order, duplicates included;
/// lookup by key is last-wins.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Value::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Mapping(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a string key in a mapping. The last occurrence wins.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(pairs) => pairs
                .iter()
                .rev()
                .find(|(k, _)| matches!(k, Value::String(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Int(_) => "an integer",
            Value::Float(_) => "a float",
            Value::String(_) => "a string",
            Value::Sequence(_) => "a sequence",
            Value::Mapping(_) => "a mapping",
        }
    }
}

/// A registered construction function for one tag.
pub type ConstructFn = Box<dyn Fn(&Constructor, &Rc<Node>) -> Result<Value>>;

/// Lookup used for `${NAME}` substitution; returns `None` for unset
/// variables.
pub type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// Tag-dispatched construction of native values.
pub struct Constructor {
    constructors: HashMap<Tag, ConstructFn>,
    env: EnvLookup,
    env_pattern: Regex,
    /// Per-node construction state: `None` while in progress (cycle
    /// detection), `Some` once finished (sharing by clone). Each entry
    /// retains its node so the address key cannot be reused for a
    /// different node later.
    memo: RefCell<HashMap<*const Node, (Rc<Node>, Option<Value>)>>,
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("tags", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Constructor {
    fn default() -> Self {
        Self::with_env(Box::new(|name| std::env::var(name).ok()))
    }
}

impl Constructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom environment lookup instead of the process
    /// environment.
    pub fn with_env(env: EnvLookup) -> Self {
        let mut constructor = Self {
            constructors: HashMap::new(),
            env,
            env_pattern: Regex::new(ENV_PATTERN).expect("hard-coded pattern compiles"),
            memo: RefCell::new(HashMap::new()),
        };
        constructor.add_constructor(Tag::NULL, |_, _| Ok(Value::Null));
        constructor.add_constructor(Tag::BOOL, construct_bool);
        constructor.add_constructor(Tag::INT, construct_int);
        constructor.add_constructor(Tag::FLOAT, construct_float);
        constructor.add_constructor(Tag::STR, |_, node| {
            Ok(Value::String(scalar(node)?.to_string()))
        });
        constructor.add_constructor(Tag::SEQ, construct_seq);
        constructor.add_constructor(Tag::MAP, construct_map);
        constructor.add_constructor(Tag::SET, construct_set);
        constructor.add_constructor(Tag::ENV, construct_env);
        constructor
    }

    /// Register a construction function for a tag, replacing any earlier
    /// one.
    pub fn add_constructor(
        &mut self,
        tag: Tag,
        construct: impl Fn(&Constructor, &Rc<Node>) -> Result<Value> + 'static,
    ) {
        self.constructors.insert(tag, Box::new(construct));
    }

    /// Construct the value for a node graph.
    pub fn construct(&self, node: &Rc<Node>) -> Result<Value> {
        let key = Rc::as_ptr(node);
        if let Some((_, state)) = self.memo.borrow().get(&key) {
            return match state {
                Some(value) => Ok(value.clone()),
                None => Err(Error::constructor(
                    "found recursive node",
                    Some(node.span().start),
                )),
            };
        }
        self.memo.borrow_mut().insert(key, (node.clone(), None));
        let Some(construct) = self.constructors.get(&node.tag) else {
            self.memo.borrow_mut().remove(&key);
            return Err(Error::constructor(
                format!(
                    "could not determine a constructor for the tag {:?}",
                    node.tag.as_str()
                ),
                Some(node.span().start),
            ));
        };
        match construct(self, node) {
            Ok(value) => {
                self.memo
                    .borrow_mut()
                    .insert(key, (node.clone(), Some(value.clone())));
                Ok(value)
            }
            // Do not leave the in-progress marker behind: the address
            // stops being retained once the caller drops the node.
            Err(e) => {
                self.memo.borrow_mut().remove(&key);
                Err(e)
            }
        }
    }

    /// Expand every `${NAME}` substitution in a template.
    fn substitute_env(&self, node: &Rc<Node>, template: &str) -> Result<String> {
        let mut out = String::new();
        let mut last = 0;
        for captures in self.env_pattern.captures_iter(template) {
            let whole = captures.get(0).expect("capture 0 is the whole match");
            out.push_str(&template[last..whole.start()]);
            last = whole.end();

            let name = &captures["name"];
            let op = captures.name("op").map(|m| m.as_str());
            let arg = captures.name("arg").map(|m| m.as_str());
            let current = (self.env)(name);
            // The ':' variants also treat a set-but-empty variable as
            // missing.
            let missing = match op {
                Some(":-") | Some(":?") => current.as_deref().map_or(true, str::is_empty),
                _ => current.is_none(),
            };
            match (op, missing) {
                (_, false) => {
                    out.push_str(&current.expect("a present variable has a value"));
                }
                (Some(":-") | Some("-"), true) => {
                    out.push_str(arg.unwrap_or(""));
                }
                (Some(":?") | Some("?"), true) => {
                    let message = arg.filter(|m| !m.is_empty());
                    return Err(Error::constructor(
                        match message {
                            Some(message) => {
                                format!("environment variable {:?} is not set: {}", name, message)
                            }
                            None => format!("environment variable {:?} is not set", name),
                        },
                        Some(node.span().start),
                    ));
                }
                (None, true) => {
                    return Err(Error::constructor(
                        format!("environment variable {:?} is not set", name),
                        Some(node.span().start),
                    ));
                }
                (Some(op), true) => {
                    return Err(Error::constructor(
                        format!("unknown substitution operator {:?}", op),
                        Some(node.span().start),
                    ));
                }
            }
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    /// Construct a mapping's pairs, expanding merge keys. Merged defaults
    /// come first so the mapping's own keys win on last-wins lookup.
    fn construct_pairs(&self, node: &Rc<Node>) -> Result<Vec<(Value, Value)>> {
        let Some(pairs) = node.mapping() else {
            return Err(Error::constructor(
                format!("expected a mapping node, but found {}", kind_name(node)),
                Some(node.span().start),
            ));
        };
        let mut own = Vec::new();
        // Merge layers in decreasing precedence.
        let mut layers: Vec<Vec<(Value, Value)>> = Vec::new();
        for (key_node, value_node) in pairs.iter() {
            if key_node.tag == Tag::MERGE {
                match self.construct(value_node)? {
                    Value::Mapping(merged) => layers.push(merged),
                    Value::Sequence(items) => {
                        for item in items {
                            let Value::Mapping(merged) = item else {
                                return Err(Error::constructor(
                                    format!(
                                        "expected a mapping for merging, but found {}",
                                        item.kind_name()
                                    ),
                                    Some(value_node.span().start),
                                ));
                            };
                            layers.push(merged);
                        }
                    }
                    other => {
                        return Err(Error::constructor(
                            format!(
                                "expected a mapping or list of mappings for merging, but found {}",
                                other.kind_name()
                            ),
                            Some(value_node.span().start),
                        ));
                    }
                }
            } else {
                own.push((self.construct(key_node)?, self.construct(value_node)?));
            }
        }
        let mut result = Vec::new();
        for layer in layers.into_iter().rev() {
            result.extend(layer);
        }
        result.extend(own);
        Ok(result)
    }
}

fn kind_name(node: &Node) -> &'static str {
    match node.kind() {
        NodeKind::Scalar => "a scalar",
        NodeKind::Sequence => "a sequence",
        NodeKind::Mapping => "a mapping",
    }
}

fn scalar(node: &Rc<Node>) -> Result<&str> {
    match &node.content {
        NodeContent::Scalar { value, .. } => Ok(value),
        _ => Err(Error::constructor(
            format!("expected a scalar node, but found {}", kind_name(node)),
            Some(node.span().start),
        )),
    }
}

fn construct_bool(_: &Constructor, node: &Rc<Node>) -> Result<Value> {
    match scalar(node)? {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        other => Err(Error::constructor(
            format!("found invalid boolean {:?}", other),
            Some(node.span().start),
        )),
    }
}

fn construct_int(_: &Constructor, node: &Rc<Node>) -> Result<Value> {
    let text = scalar(node)?;
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let (negative, rest) = match cleaned.strip_prefix(['-', '+']) {
        Some(rest) => (cleaned.starts_with('-'), rest),
        None => (false, cleaned.as_str()),
    };
    let (radix, digits) = if let Some(digits) = rest.strip_prefix("0b") {
        (2, digits)
    } else if let Some(digits) = rest.strip_prefix("0o") {
        (8, digits)
    } else if let Some(digits) = rest.strip_prefix("0x") {
        (16, digits)
    } else {
        (10, rest)
    };
    match BigInt::parse_bytes(digits.as_bytes(), radix) {
        Some(value) => Ok(Value::Int(if negative { -value } else { value })),
        None => Err(Error::constructor(
            format!("found invalid integer {:?}", text),
            Some(node.span().start),
        )),
    }
}

fn construct_float(_: &Constructor, node: &Rc<Node>) -> Result<Value> {
    let text = scalar(node)?;
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let value = match cleaned.to_ascii_lowercase().as_str() {
        ".inf" | "+.inf" => f64::INFINITY,
        "-.inf" => f64::NEG_INFINITY,
        ".nan" => f64::NAN,
        _ => cleaned.parse().map_err(|_| {
            Error::constructor(
                format!("found invalid float {:?}", text),
                Some(node.span().start),
            )
        })?,
    };
    Ok(Value::Float(value))
}

fn construct_seq(constructor: &Constructor, node: &Rc<Node>) -> Result<Value> {
    let Some(children) = node.sequence() else {
        return Err(Error::constructor(
            format!("expected a sequence node, but found {}", kind_name(node)),
            Some(node.span().start),
        ));
    };
    let mut items = Vec::with_capacity(children.len());
    for child in children.iter() {
        items.push(constructor.construct(child)?);
    }
    Ok(Value::Sequence(items))
}

fn construct_map(constructor: &Constructor, node: &Rc<Node>) -> Result<Value> {
    Ok(Value::Mapping(constructor.construct_pairs(node)?))
}

/// A set is written as a mapping with null values; it constructs into a
/// sequence of the keys.
fn construct_set(constructor: &Constructor, node: &Rc<Node>) -> Result<Value> {
    let Some(pairs) = node.mapping() else {
        return Err(Error::constructor(
            format!("expected a mapping node, but found {}", kind_name(node)),
            Some(node.span().start),
        ));
    };
    let mut items = Vec::with_capacity(pairs.len());
    for (key, _) in pairs.iter() {
        items.push(constructor.construct(key)?);
    }
    Ok(Value::Sequence(items))
}

fn construct_env(constructor: &Constructor, node: &Rc<Node>) -> Result<Value> {
    let template = scalar(node)?;
    Ok(Value::String(
        constructor.substitute_env(node, template)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::Composer;
    use crate::parser::Parser;
    use crate::reader::Reader;
    use crate::scanner::Scanner;
    use num_traits::ToPrimitive;

    fn node(input: &str) -> Rc<Node> {
        let reader = Reader::new("<test>", input).unwrap();
        Composer::new(Parser::new(Scanner::new(reader)))
            .next_document()
            .unwrap()
    }

    fn construct(input: &str) -> Result<Value> {
        Constructor::new().construct(&node(input))
    }

    fn fake_env(pairs: &[(&str, &str)]) -> Constructor {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Constructor::with_env(Box::new(move |name| env.get(name).cloned()))
    }

    #[test]
    fn test_core_schema_values() {
        assert_eq!(construct("null").unwrap(), Value::Null);
        assert_eq!(construct("true").unwrap(), Value::Bool(true));
        assert_eq!(construct("42").unwrap(), Value::Int(BigInt::from(42)));
        assert_eq!(construct("-0x1F").unwrap(), Value::Int(BigInt::from(-31)));
        assert_eq!(construct("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(
            construct("hello").unwrap(),
            Value::String("hello".to_string())
        );
    }

    #[test]
    fn test_big_integers_do_not_overflow() {
        let value = construct("123456789012345678901234567890").unwrap();
        let int = value.as_int().unwrap();
        assert!(int.to_i64().is_none());
        assert_eq!(int.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn test_infinities() {
        assert_eq!(construct(".inf").unwrap(), Value::Float(f64::INFINITY));
        assert_eq!(construct("-.inf").unwrap(), Value::Float(f64::NEG_INFINITY));
        assert!(construct(".nan").unwrap().as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_collections() {
        let value = construct("a: [1, 2]\nb: x\n").unwrap();
        assert_eq!(
            value.get("a").unwrap().as_sequence().unwrap(),
            &[
                Value::Int(BigInt::from(1)),
                Value::Int(BigInt::from(2)),
            ]
        );
        assert_eq!(value.get("b").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let value = construct("a: 1\na: 2\n").unwrap();
        assert_eq!(value.get("a").unwrap(), &Value::Int(BigInt::from(2)));
        // Both pairs are preserved in order.
        assert_eq!(value.as_mapping().unwrap().len(), 2);
    }

    #[test]
    fn test_merge_key_defaults() {
        let value = construct(
            "defaults: &d\n  host: localhost\n  port: 80\nserver:\n  <<: *d\n  port: 8080\n",
        )
        .unwrap();
        let server = value.get("server").unwrap();
        assert_eq!(server.get("host").unwrap().as_str(), Some("localhost"));
        assert_eq!(
            server.get("port").unwrap(),
            &Value::Int(BigInt::from(8080))
        );
    }

    #[test]
    fn test_merge_list_earlier_wins() {
        let value = construct(
            "a: &a\n  x: 1\nb: &b\n  x: 2\n  y: 2\nc:\n  <<: [*a, *b]\n",
        )
        .unwrap();
        let c = value.get("c").unwrap();
        assert_eq!(c.get("x").unwrap(), &Value::Int(BigInt::from(1)));
        assert_eq!(c.get("y").unwrap(), &Value::Int(BigInt::from(2)));
    }

    #[test]
    fn test_merge_of_non_mapping_fails() {
        let err = construct("a:\n  <<: [1, 2]\n").unwrap_err();
        assert!(err.to_string().contains("for merging"));
    }

    #[test]
    fn test_documents_construct_independently() {
        // Nodes from an earlier document may be freed and their addresses
        // reused; a later document must not see the earlier value.
        let values = crate::load_all("--- 1\n--- 2\n--- 3\n").unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(BigInt::from(1)),
                Value::Int(BigInt::from(2)),
                Value::Int(BigInt::from(3)),
            ]
        );
    }

    #[test]
    fn test_failed_construct_does_not_poison_later_ones() {
        let constructor = fake_env(&[]);
        constructor
            .construct(&node("a: ${MISSING}"))
            .unwrap_err();
        let value = constructor.construct(&node("b: 2")).unwrap();
        assert_eq!(value.get("b").unwrap(), &Value::Int(BigInt::from(2)));
    }

    #[test]
    fn test_anchored_subtree_is_shared() {
        let value = construct("x: &a [1, 2]\ny: *a\n").unwrap();
        assert_eq!(value.get("x"), value.get("y"));
    }

    #[test]
    fn test_recursive_graph_is_an_error() {
        let err = construct("&root\n- *root\n").unwrap_err();
        assert!(err.to_string().contains("found recursive node"));
    }

    #[test]
    fn test_unregistered_tag() {
        let err = construct("!widget {}").unwrap_err();
        assert!(err
            .to_string()
            .contains("could not determine a constructor for the tag"));
    }

    #[test]
    fn test_custom_constructor() {
        let mut constructor = Constructor::new();
        constructor.add_constructor(Tag::new("!upper"), |_, node| {
            Ok(Value::String(scalar(node)?.to_uppercase()))
        });
        let value = constructor.construct(&node("!upper hello")).unwrap();
        assert_eq!(value.as_str(), Some("HELLO"));
    }

    #[test]
    fn test_set() {
        let value = construct("!!set\n? a\n? b\n").unwrap();
        assert_eq!(
            value.as_sequence().unwrap(),
            &[
                Value::String("a".to_string()),
                Value::String("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_env_substitution() {
        let constructor = fake_env(&[("HOME", "/home/u"), ("EMPTY", "")]);
        let value = constructor.construct(&node("dir: ${HOME}/data")).unwrap();
        assert_eq!(value.get("dir").unwrap().as_str(), Some("/home/u/data"));
    }

    #[test]
    fn test_env_defaults() {
        let constructor = fake_env(&[("EMPTY", "")]);
        // ":-" treats empty as unset, "-" does not.
        let value = constructor
            .construct(&node("a: ${EMPTY:-fallback}\nb: ${EMPTY-fallback}\nc: ${UNSET-d}\n"))
            .unwrap();
        assert_eq!(value.get("a").unwrap().as_str(), Some("fallback"));
        assert_eq!(value.get("b").unwrap().as_str(), Some(""));
        assert_eq!(value.get("c").unwrap().as_str(), Some("d"));
    }

    #[test]
    fn test_env_required() {
        let constructor = fake_env(&[]);
        let err = constructor
            .construct(&node("a: ${MISSING:?set it}"))
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("MISSING"));
        assert!(text.contains("set it"));
    }

    #[test]
    fn test_env_plain_unset_is_an_error() {
        let constructor = fake_env(&[]);
        let err = constructor.construct(&node("a: ${MISSING}")).unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }
}
