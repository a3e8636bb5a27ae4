//! Tagged attribute streams.
//!
//! Snapshots are written as a flat stream of elements carrying named
//! attributes, in the spirit of a typed XML pull parser and serializer:
//!
//! - [`TagWriter`]: `start_tag`, `attribute`, `attribute_long`, `end_tag`
//! - [`TagReader`]: a cursor over start / end / end-of-document events
//!
//! [`TagDocument`] is an in-memory implementation of both sides.

mod document;

pub use document::{TagCursor, TagDocument, TagEvent};

use crate::error::{Result, StatsError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Kind of event the reader is positioned on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagEventKind {
    StartTag,
    EndTag,
    EndDocument,
}

/// Attribute value, either as written or as read back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    Str(String),
    Long(i64),
}

impl AttributeValue {
    /// Value as text.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            AttributeValue::Str(s) => Cow::Borrowed(s),
            AttributeValue::Long(v) => Cow::Owned(v.to_string()),
        }
    }

    /// Value as an integer. Text values are parsed.
    pub fn as_long(&self) -> Result<i64> {
        match self {
            AttributeValue::Long(v) => Ok(*v),
            AttributeValue::Str(s) => s
                .parse()
                .map_err(|_| StatsError::MalformedData(format!("Not a long value: '{}'", s))),
        }
    }
}

/// A named attribute on a start tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Sink for tagged attribute streams.
pub trait TagWriter {
    fn start_tag(&mut self, name: &str) -> Result<()>;

    /// Attach a text attribute to the tag just started.
    fn attribute(&mut self, name: &str, value: &str) -> Result<()>;

    /// Attach an integer attribute to the tag just started.
    fn attribute_long(&mut self, name: &str, value: i64) -> Result<()>;

    fn end_tag(&mut self, name: &str) -> Result<()>;
}

/// Pull-style cursor over a tagged attribute stream.
pub trait TagReader {
    /// Event the cursor is positioned on.
    fn event(&self) -> TagEventKind;

    /// Element name for start and end events.
    fn name(&self) -> Option<&str>;

    /// Attributes of the current start tag; empty for other events.
    fn attributes(&self) -> &[Attribute];

    /// Advance to the next event.
    fn next(&mut self) -> Result<TagEventKind>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_conversions() {
        assert_eq!(AttributeValue::Long(-3).as_str(), "-3");
        assert_eq!(AttributeValue::Str("42".into()).as_long().unwrap(), 42);
        assert!(matches!(
            AttributeValue::Str("4x".into()).as_long(),
            Err(StatsError::MalformedData(_))
        ));
    }
}
