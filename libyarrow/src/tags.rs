//! Tag identifiers for nodes.
//!
//! A [`Tag`] is an interned string with value equality. The core schema
//! tags are provided as constants; anything else (local `!foo` tags,
//! application tags expanded from `%TAG` handles) is an ordinary owned
//! string wrapped in the same type.

use std::borrow::Cow;
use std::fmt;

/// A resolved YAML tag.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    /// `tag:yaml.org,2002:null`
    pub const NULL: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:null"));
    /// `tag:yaml.org,2002:bool`
    pub const BOOL: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:bool"));
    /// `tag:yaml.org,2002:int`
    pub const INT: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:int"));
    /// `tag:yaml.org,2002:float`
    pub const FLOAT: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:float"));
    /// `tag:yaml.org,2002:str`
    pub const STR: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:str"));
    /// `tag:yaml.org,2002:map`
    pub const MAP: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:map"));
    /// `tag:yaml.org,2002:seq`
    pub const SEQ: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:seq"));
    /// `tag:yaml.org,2002:set`
    pub const SET: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:set"));
    /// `tag:yaml.org,2002:merge` — the `<<` merge key.
    pub const MERGE: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:merge"));
    /// `tag:yaml.org,2002:env` — environment-substitution templates.
    pub const ENV: Tag = Tag(Cow::Borrowed("tag:yaml.org,2002:env"));

    /// The non-specific tag `!`. Nodes carrying it resolve through the
    /// implicit table like untagged nodes.
    pub const NON_SPECIFIC: Tag = Tag(Cow::Borrowed("!"));

    /// Create a tag from an arbitrary string.
    pub fn new(value: impl Into<String>) -> Self {
        Tag(Cow::Owned(value.into()))
    }

    /// The tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::new(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag(Cow::Owned(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Tag::new("tag:yaml.org,2002:str"), Tag::STR);
        assert_ne!(Tag::new("!local"), Tag::STR);
    }

    #[test]
    fn test_display() {
        assert_eq!(Tag::SEQ.to_string(), "tag:yaml.org,2002:seq");
        assert_eq!(Tag::new("!local").to_string(), "!local");
    }
}
