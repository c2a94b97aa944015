//! Composite unique keys
//!
//! A key is either taken straight from the unique-key field or, when a key
//! field order is configured, built by joining the values of several fields.
//! A key with a missing part is never produced.

use docloader_common::{DocloaderError, Result};
use std::collections::HashMap;

use super::split_names;
use crate::field::FieldValue;

/// Which fields make up the key, and how they are joined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueKeyLayout {
    field_order: Vec<String>,
    delimiter: String,
}

impl UniqueKeyLayout {
    /// `order` is a `;` separated list of field names
    pub fn new(order: &str, delimiter: impl Into<String>) -> Self {
        Self {
            field_order: split_names(order),
            delimiter: delimiter.into(),
        }
    }

    pub fn field_order(&self) -> &[String] {
        &self.field_order
    }

    pub fn is_composite(&self) -> bool {
        !self.field_order.is_empty()
    }

    /// Start collecting values for one row
    pub fn builder(&self) -> UniqueKeyBuilder<'_> {
        UniqueKeyBuilder {
            layout: self,
            values: HashMap::new(),
        }
    }
}

/// Per-row key state
#[derive(Debug)]
pub struct UniqueKeyBuilder<'a> {
    layout: &'a UniqueKeyLayout,
    values: HashMap<String, FieldValue>,
}

impl UniqueKeyBuilder<'_> {
    pub fn add_field(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Join the configured fields. Returns an empty string when no key order
    /// is configured.
    pub fn render(&self) -> Result<String> {
        let mut key = String::new();

        for (i, field) in self.layout.field_order.iter().enumerate() {
            let value = self
                .values
                .get(field)
                .ok_or_else(|| DocloaderError::MissingKeyField {
                    field: field.clone(),
                })?;

            let text = value.to_string();
            if text.trim().is_empty() {
                return Err(DocloaderError::EmptyKeyField {
                    field: field.clone(),
                });
            }

            if i > 0 {
                key.push_str(&self.layout.delimiter);
            }
            key.push_str(&text);
        }

        Ok(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_no_order_renders_empty() {
        let layout = UniqueKeyLayout::default();
        let mut builder = layout.builder();
        builder.add_field("id", FieldValue::Integer(1));
        assert_eq!(builder.render().unwrap(), "");
        assert!(!layout.is_composite());
    }

    #[test]
    fn test_render_joins_in_configured_order() {
        let layout = UniqueKeyLayout::new("type; id", "-");
        let mut builder = layout.builder();
        builder.add_field("id", FieldValue::Integer(42));
        builder.add_field("type", "site".into());

        assert_eq!(builder.render().unwrap(), "site-42");
        // rendering again gives the same key
        assert_eq!(builder.render().unwrap(), "site-42");
    }

    #[test]
    fn test_whole_double_keeps_fraction_in_key() {
        let layout = UniqueKeyLayout::new("sku;price", "|");
        let mut builder = layout.builder();
        builder.add_field("sku", "A7".into());
        builder.add_field("price", FieldValue::Double(42.0));
        assert_eq!(builder.render().unwrap(), "A7|42.0");
    }

    #[test]
    fn test_empty_delimiter() {
        let layout = UniqueKeyLayout::new("a;b", "");
        let mut builder = layout.builder();
        builder.add_field("a", "x".into());
        builder.add_field("b", "y".into());
        assert_eq!(builder.render().unwrap(), "xy");
    }

    #[test]
    fn test_add_field_overwrites() {
        let layout = UniqueKeyLayout::new("a", "");
        let mut builder = layout.builder();
        builder.add_field("a", "first".into());
        builder.add_field("a", "second".into());
        assert_eq!(builder.render().unwrap(), "second");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let layout = UniqueKeyLayout::new("type;id", "-");
        let mut builder = layout.builder();
        builder.add_field("type", "site".into());

        match builder.render() {
            Err(DocloaderError::MissingKeyField { field }) => assert_eq!(field, "id"),
            other => panic!("expected missing key field, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_field_is_an_error() {
        let layout = UniqueKeyLayout::new("id", "-");
        let mut builder = layout.builder();
        builder.add_field("id", "  ".into());
        assert!(matches!(
            builder.render(),
            Err(DocloaderError::EmptyKeyField { .. })
        ));
    }
}
