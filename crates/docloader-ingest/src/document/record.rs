//! Output documents sent to the index

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::field::FieldValue;

/// Partial-update action applied to every non-key field
pub const UPDATE_ACTION: &str = "set";

/// A field value as written to the index.
///
/// The unique key is written directly; every other field is wrapped in an
/// update action so the sink applies it as a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Bare(FieldValue),
    Set(FieldValue),
}

impl RecordValue {
    /// The value without its update action
    pub fn value(&self) -> &FieldValue {
        match self {
            RecordValue::Bare(value) | RecordValue::Set(value) => value,
        }
    }

    pub fn is_update(&self) -> bool {
        matches!(self, RecordValue::Set(_))
    }
}

impl Serialize for RecordValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordValue::Bare(value) => value.serialize(serializer),
            RecordValue::Set(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(UPDATE_ACTION, value)?;
                map.end()
            },
        }
    }
}

/// One document, fields kept in the order they were first written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRecord {
    fields: Vec<(String, RecordValue)>,
}

impl OutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a field, replacing any earlier value in place
    pub fn set(&mut self, name: &str, value: RecordValue) {
        match self.fields.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn set_bare(&mut self, name: &str, value: FieldValue) {
        self.set(name, RecordValue::Bare(value));
    }

    pub fn set_update(&mut self, name: &str, value: FieldValue) {
        self.set(name, RecordValue::Set(value));
    }

    pub fn get(&self, name: &str) -> Option<&RecordValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Current value of a field with any update action removed
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.get(name).map(RecordValue::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for OutputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_in_place() {
        let mut record = OutputRecord::new();
        record.set_bare("id", FieldValue::Integer(42));
        record.set_update("name", "Acme".into());
        record.set_bare("id", "site-42".into());

        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(record.value("id"), Some(&FieldValue::String("site-42".into())));
        assert!(record.get("name").unwrap().is_update());
    }

    #[test]
    fn test_serializes_update_actions() {
        let mut record = OutputRecord::new();
        record.set_bare("id", FieldValue::Integer(42));
        record.set_update("name", "Acme".into());
        record.set_update("tags", FieldValue::Array(vec!["a".into(), "b".into()]));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"id":42,"name":{"set":"Acme"},"tags":{"set":["a","b"]}}"#
        );
    }
}
