//! In-memory tag document.

use crate::error::{Result, StatsError};
use crate::tags::{Attribute, AttributeValue, TagEventKind, TagReader, TagWriter};
use serde::{Deserialize, Serialize};

/// One element boundary in a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagEvent {
    Start {
        name: String,
        attributes: Vec<Attribute>,
    },
    End {
        name: String,
    },
}

/// A tagged attribute stream held in memory.
///
/// Writing follows serializer rules: attributes may only follow a
/// `start_tag` directly, and every `end_tag` must close the innermost open
/// element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDocument {
    events: Vec<TagEvent>,

    #[serde(skip)]
    open: Vec<String>,

    #[serde(skip)]
    accepts_attributes: bool,
}

impl TagDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TagEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether every started element has been closed.
    pub fn is_complete(&self) -> bool {
        self.open.is_empty()
    }

    /// Cursor positioned on the first event.
    pub fn reader(&self) -> TagCursor<'_> {
        TagCursor {
            events: &self.events,
            pos: 0,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| StatsError::Deserialization(e.to_string()))
    }

    fn push_attribute(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        match self.events.last_mut() {
            Some(TagEvent::Start { attributes, .. }) if self.accepts_attributes => {
                attributes.push(Attribute::new(name, value));
                Ok(())
            }
            _ => Err(StatsError::InvalidOperation(format!(
                "Attribute '{}' written outside of a start tag",
                name
            ))),
        }
    }
}

impl TagWriter for TagDocument {
    fn start_tag(&mut self, name: &str) -> Result<()> {
        self.events.push(TagEvent::Start {
            name: name.to_string(),
            attributes: Vec::new(),
        });
        self.open.push(name.to_string());
        self.accepts_attributes = true;
        Ok(())
    }

    fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.push_attribute(name, AttributeValue::Str(value.to_string()))
    }

    fn attribute_long(&mut self, name: &str, value: i64) -> Result<()> {
        self.push_attribute(name, AttributeValue::Long(value))
    }

    fn end_tag(&mut self, name: &str) -> Result<()> {
        match self.open.last().cloned() {
            Some(open) if open == name => {
                self.open.pop();
                self.events.push(TagEvent::End {
                    name: name.to_string(),
                });
                self.accepts_attributes = false;
                Ok(())
            }
            Some(open) => Err(StatsError::InvalidOperation(format!(
                "End tag '{}' does not match open tag '{}'",
                name, open
            ))),
            None => Err(StatsError::InvalidOperation(format!(
                "End tag '{}' without a start tag",
                name
            ))),
        }
    }
}

/// Reader over a [`TagDocument`].
#[derive(Clone, Debug)]
pub struct TagCursor<'a> {
    events: &'a [TagEvent],
    pos: usize,
}

impl TagReader for TagCursor<'_> {
    fn event(&self) -> TagEventKind {
        match self.events.get(self.pos) {
            Some(TagEvent::Start { .. }) => TagEventKind::StartTag,
            Some(TagEvent::End { .. }) => TagEventKind::EndTag,
            None => TagEventKind::EndDocument,
        }
    }

    fn name(&self) -> Option<&str> {
        match self.events.get(self.pos)? {
            TagEvent::Start { name, .. } | TagEvent::End { name } => Some(name.as_str()),
        }
    }

    fn attributes(&self) -> &[Attribute] {
        match self.events.get(self.pos) {
            Some(TagEvent::Start { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    fn next(&mut self) -> Result<TagEventKind> {
        if self.pos < self.events.len() {
            self.pos += 1;
        }
        Ok(self.event())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let mut doc = TagDocument::new();
        doc.start_tag("outer").unwrap();
        doc.start_tag("stats").unwrap();
        doc.attribute("battery", "on").unwrap();
        doc.attribute_long("_0", 12).unwrap();
        doc.end_tag("stats").unwrap();
        doc.end_tag("outer").unwrap();
        assert!(doc.is_complete());

        let mut reader = doc.reader();
        assert_eq!(reader.event(), TagEventKind::StartTag);
        assert_eq!(reader.name(), Some("outer"));
        assert!(reader.attributes().is_empty());

        assert_eq!(reader.next().unwrap(), TagEventKind::StartTag);
        assert_eq!(reader.attributes().len(), 2);
        assert_eq!(reader.attributes()[1].value.as_long().unwrap(), 12);

        assert_eq!(reader.next().unwrap(), TagEventKind::EndTag);
        assert_eq!(reader.name(), Some("stats"));
        assert_eq!(reader.next().unwrap(), TagEventKind::EndTag);
        assert_eq!(reader.next().unwrap(), TagEventKind::EndDocument);
        assert_eq!(reader.next().unwrap(), TagEventKind::EndDocument);
        assert_eq!(reader.name(), None);
    }

    #[test]
    fn test_attribute_needs_open_start_tag() {
        let mut doc = TagDocument::new();
        assert!(matches!(
            doc.attribute("a", "b"),
            Err(StatsError::InvalidOperation(_))
        ));

        doc.start_tag("a").unwrap();
        doc.end_tag("a").unwrap();
        assert!(matches!(
            doc.attribute_long("_0", 1),
            Err(StatsError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_end_tag_must_match() {
        let mut doc = TagDocument::new();
        doc.start_tag("a").unwrap();
        assert!(matches!(doc.end_tag("b"), Err(StatsError::InvalidOperation(_))));
        assert!(!doc.is_complete());
        doc.end_tag("a").unwrap();
        assert!(matches!(doc.end_tag("a"), Err(StatsError::InvalidOperation(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut doc = TagDocument::new();
        doc.start_tag("stats").unwrap();
        doc.attribute_long("_1", -5).unwrap();
        doc.end_tag("stats").unwrap();

        let parsed = TagDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(parsed.events(), doc.events());
    }
}
