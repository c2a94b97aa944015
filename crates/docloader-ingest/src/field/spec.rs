//! Field definitions and the field-list parser
//!
//! A field list is a `;` separated sequence of `name[:type[:extra]]`
//! entries. For ordinary fields `extra` is a date pattern (only meaningful
//! for `datetime`); for literal fields it is the fixed value. Because both
//! date patterns and literal values may contain `:`, everything after the
//! type is joined back together.

use docloader_common::{DocloaderError, Result};
use std::fmt;
use tracing::{debug, warn};

use super::date_format::DateFormat;
use super::value::{coerce, FieldValue};

const ENTRY_DELIMITER: char = ';';
const SEGMENT_DELIMITER: char = ':';

/// Value type of a configured field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Long,
    Double,
    DateTime,
    Array,
}

impl FieldType {
    /// Match a configuration token, ignoring case
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "string" => Some(FieldType::String),
            "int" => Some(FieldType::Integer),
            "long" => Some(FieldType::Long),
            "double" => Some(FieldType::Double),
            "datetime" => Some(FieldType::DateTime),
            "multivalued" => Some(FieldType::Array),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "int",
            FieldType::Long => "long",
            FieldType::Double => "double",
            FieldType::DateTime => "datetime",
            FieldType::Array => "multivalued",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One configured output field. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    field_type: FieldType,
    date_format: DateFormat,
    is_literal: bool,
    list_delimiter: String,
    literal_text: Option<String>,
    literal: Option<FieldValue>,
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn date_format(&self) -> &DateFormat {
        &self.date_format
    }

    pub fn is_literal(&self) -> bool {
        self.is_literal
    }

    pub fn list_delimiter(&self) -> &str {
        &self.list_delimiter
    }

    /// Coerced value of a literal field, if it has one
    pub fn literal_value(&self) -> Option<&FieldValue> {
        self.literal.as_ref()
    }

    fn parse_entry(entry: &str, is_literal: bool, list_delimiter: &str) -> Result<Self> {
        let mut segments = entry.split(SEGMENT_DELIMITER);
        let name = segments.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(DocloaderError::field_definition(entry, "missing field name"));
        }
        let rest: Vec<&str> = segments.collect();

        let (field_type, tail) = match rest.first().and_then(|token| FieldType::from_token(token)) {
            Some(field_type) => (field_type, &rest[1..]),
            None => (FieldType::String, &rest[..]),
        };
        let extra = tail.join(":");

        let mut spec = FieldSpec {
            name: name.to_string(),
            field_type,
            date_format: DateFormat::default(),
            is_literal,
            list_delimiter: list_delimiter.to_string(),
            literal_text: None,
            literal: None,
        };

        if is_literal {
            if extra.is_empty() {
                warn!(field = %name, "Literal field has no value and will not be written");
                return Ok(spec);
            }
            spec.literal = spec.coerce_literal(&extra)?;
            spec.literal_text = Some(extra);
        } else if field_type == FieldType::DateTime {
            let pattern = extra.trim();
            if !pattern.is_empty() {
                spec.date_format = DateFormat::new(pattern)?;
            }
        } else if !extra.is_empty() {
            debug!(field = %name, extra = %extra, "Ignoring unrecognized field type, using string");
        }

        Ok(spec)
    }

    /// Literal dates always use the default pattern and must parse
    fn coerce_literal(&self, raw: &str) -> Result<Option<FieldValue>> {
        if self.field_type == FieldType::DateTime {
            return self
                .date_format
                .parse(raw)
                .map(|dt| Some(FieldValue::DateTime(dt)))
                .ok_or_else(|| {
                    DocloaderError::field_definition(
                        format!("{}:{}:{}", self.name, self.field_type, raw),
                        format!(
                            "literal date does not match pattern '{}'",
                            self.date_format.pattern()
                        ),
                    )
                });
        }
        Ok(coerce(self, Some(raw)))
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.field_type)?;
        if self.is_literal {
            if let Some(ref text) = self.literal_text {
                write!(f, ":{}", text)?;
            }
        } else if self.field_type == FieldType::DateTime && !self.date_format.is_default() {
            write!(f, ":{}", self.date_format.pattern())?;
        }
        Ok(())
    }
}

/// Ordered set of field definitions, in configuration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSpecTable {
    specs: Vec<FieldSpec>,
}

impl FieldSpecTable {
    /// Parse a field list.
    ///
    /// Blank input yields an empty table. A single trailing `;` is
    /// accepted; other empty entries and repeated names are rejected
    /// because they would shift every following column.
    pub fn parse(config: &str, is_literal: bool, list_delimiter: &str) -> Result<Self> {
        let config = config.trim();
        if config.is_empty() {
            return Ok(Self::default());
        }

        let entries: Vec<&str> = config.split(ENTRY_DELIMITER).collect();
        let last = entries.len() - 1;
        let mut specs: Vec<FieldSpec> = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let entry = entry.trim();
            if entry.is_empty() {
                if index == last {
                    continue;
                }
                return Err(DocloaderError::field_definition(
                    config,
                    format!("entry {} is empty", index + 1),
                ));
            }

            let spec = FieldSpec::parse_entry(entry, is_literal, list_delimiter)?;
            if specs.iter().any(|existing| existing.name == spec.name) {
                return Err(DocloaderError::field_definition(
                    entry,
                    format!("field '{}' is defined more than once", spec.name),
                ));
            }
            specs.push(spec);
        }

        Ok(Self { specs })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.specs.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// Column index of a field
    pub fn position(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl fmt::Display for FieldSpecTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, spec) in self.specs.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}", spec)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FieldSpecTable {
    type Item = &'a FieldSpec;
    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
