//! Phase 4: Resolver
//!
//! The resolver assigns a specific tag to nodes that did not carry an
//! explicit one. Collections resolve trivially (sequence, mapping);
//! plain scalars are matched against an ordered table of (tag, pattern)
//! rules, dispatched on the scalar's first character so only a handful
//! of patterns run per value. Rules are consulted in registration order;
//! the first match wins, and an unmatched scalar falls back to `str`.
//!
//! Resolution is pure: the same value and implicitness always produce
//! the same tag.

use crate::tags::Tag;
use regex::Regex;
use std::collections::HashMap;

/// The three node kinds resolution distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
}

/// Implicit tag resolution table.
pub struct Resolver {
    /// Rules dispatched on the first character of the value; the `None`
    /// key holds rules for the empty string.
    by_first: HashMap<Option<char>, Vec<(Tag, Regex)>>,
    /// Rules consulted for every value, after the dispatched ones.
    catch_all: Vec<(Tag, Regex)>,
}

/// Substitution syntax recognized inside an `env` scalar:
/// `${NAME}`, `${NAME-default}`, `${NAME:-default}`, `${NAME?error}`,
/// `${NAME:?error}`.
pub const ENV_PATTERN: &str =
    r"\$\{(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?:(?P<op>:?[-?])(?P<arg>[^}]*))?\}";

impl Resolver {
    /// A resolver with no implicit rules: every plain scalar resolves to
    /// `str`.
    pub fn bare() -> Self {
        Self {
            by_first: HashMap::new(),
            catch_all: Vec::new(),
        }
    }

    /// Register an implicit rule. `first` lists the possible first
    /// characters of matching values, as one-character strings, with `""`
    /// standing for the empty value; `None` registers the rule for every
    /// value. Later registrations are consulted after earlier ones.
    pub fn add_implicit_resolver(&mut self, tag: Tag, regexp: Regex, first: Option<&[&str]>) {
        match first {
            None => self.catch_all.push((tag, regexp)),
            Some(prefixes) => {
                for prefix in prefixes {
                    self.by_first
                        .entry(prefix.chars().next())
                        .or_default()
                        .push((tag.clone(), regexp.clone()));
                }
            }
        }
    }

    /// The tag for a node of the given kind and scalar value. `implicit`
    /// is the (plain, quoted) pair from the parser: the table is only
    /// consulted for plain-implicit scalars.
    pub fn resolve(&self, kind: NodeKind, value: &str, implicit: (bool, bool)) -> Tag {
        match kind {
            NodeKind::Sequence => Tag::SEQ,
            NodeKind::Mapping => Tag::MAP,
            NodeKind::Scalar => {
                if implicit.0 {
                    let key = value.chars().next();
                    let dispatched = self.by_first.get(&key).map(Vec::as_slice).unwrap_or(&[]);
                    for (tag, regexp) in dispatched.iter().chain(&self.catch_all) {
                        if regexp.is_match(value) {
                            return tag.clone();
                        }
                    }
                }
                Tag::STR
            }
        }
    }
}

/// The core schema plus the merge and environment-substitution rules.
impl Default for Resolver {
    fn default() -> Self {
        let compiled = |pattern: &str| Regex::new(pattern).expect("hard-coded pattern compiles");
        let mut resolver = Resolver::bare();
        resolver.add_implicit_resolver(Tag::NULL, compiled(r"^(?:null)?$"), Some(&["n", ""]));
        resolver.add_implicit_resolver(Tag::BOOL, compiled(r"^(?:true|false)$"), Some(&["t", "f"]));
        // Integers before floats, so "1" is an int and "1.0" a float.
        resolver.add_implicit_resolver(
            Tag::INT,
            compiled(
                r"^(?:[-+]?0b[0-1_]+|[-+]?0x[0-9a-fA-F_]+|[-+]?0o[0-7_]+|[-+]?(?:0|[1-9][0-9_]*))$",
            ),
            Some(&["-", "+", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]),
        );
        resolver.add_implicit_resolver(
            Tag::FLOAT,
            compiled(
                r"^(?:[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?|[-+]?\.[0-9_]+(?:[eE][-+]?[0-9]+)?|[-+]?[0-9][0-9_]*[eE][-+]?[0-9]+|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
            ),
            Some(&[
                "-", "+", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", ".",
            ]),
        );
        resolver.add_implicit_resolver(Tag::MERGE, compiled(r"^(?:<<)$"), Some(&["<"]));
        // A substitution may appear anywhere in the value.
        resolver.add_implicit_resolver(Tag::ENV, compiled(ENV_PATTERN), None);
        resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(value: &str) -> Tag {
        Resolver::default().resolve(NodeKind::Scalar, value, (true, false))
    }

    #[test]
    fn test_core_schema() {
        assert_eq!(resolve(""), Tag::NULL);
        assert_eq!(resolve("null"), Tag::NULL);
        assert_eq!(resolve("true"), Tag::BOOL);
        assert_eq!(resolve("false"), Tag::BOOL);
        assert_eq!(resolve("1"), Tag::INT);
        assert_eq!(resolve("-42"), Tag::INT);
        assert_eq!(resolve("0x1F"), Tag::INT);
        assert_eq!(resolve("1.5"), Tag::FLOAT);
        assert_eq!(resolve("1e3"), Tag::FLOAT);
        assert_eq!(resolve(".inf"), Tag::FLOAT);
        assert_eq!(resolve("hello"), Tag::STR);
    }

    #[test]
    fn test_lookalikes_stay_strings() {
        // Prefix shares a rule bucket but the pattern must not match.
        assert_eq!(resolve("tf123"), Tag::STR);
        assert_eq!(resolve("truest"), Tag::STR);
        assert_eq!(resolve("nullify"), Tag::STR);
        assert_eq!(resolve("1.2.3"), Tag::STR);
        assert_eq!(resolve("nan"), Tag::STR);
    }

    #[test]
    fn test_int_wins_over_float() {
        assert_eq!(resolve("113"), Tag::INT);
        assert_eq!(resolve("113."), Tag::FLOAT);
    }

    #[test]
    fn test_merge_key() {
        assert_eq!(resolve("<<"), Tag::MERGE);
        assert_eq!(resolve("<<<"), Tag::STR);
    }

    #[test]
    fn test_env_substitution() {
        assert_eq!(resolve("${HOME}"), Tag::ENV);
        assert_eq!(resolve("prefix ${NAME:-x} suffix"), Tag::ENV);
        assert_eq!(resolve("${NOT A NAME}"), Tag::STR);
    }

    #[test]
    fn test_quoted_scalars_do_not_resolve() {
        let resolver = Resolver::default();
        assert_eq!(
            resolver.resolve(NodeKind::Scalar, "1", (false, true)),
            Tag::STR
        );
    }

    #[test]
    fn test_collections() {
        let resolver = Resolver::default();
        assert_eq!(resolver.resolve(NodeKind::Sequence, "", (true, false)), Tag::SEQ);
        assert_eq!(resolver.resolve(NodeKind::Mapping, "", (true, false)), Tag::MAP);
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let resolver = Resolver::default();
        let first = resolver.resolve(NodeKind::Scalar, "113", (true, false));
        let second = resolver.resolve(NodeKind::Scalar, "113", (true, false));
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_rule() {
        let mut resolver = Resolver::default();
        resolver.add_implicit_resolver(
            Tag::new("!semver"),
            Regex::new(r"^v[0-9]+\.[0-9]+\.[0-9]+$").unwrap(),
            Some(&["v"]),
        );
        assert_eq!(
            resolver.resolve(NodeKind::Scalar, "v1.2.3", (true, false)),
            Tag::new("!semver")
        );
    }
}
