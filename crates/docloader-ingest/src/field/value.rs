//! Typed field values and coercion of raw strings into them

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::warn;

use super::spec::{FieldSpec, FieldType};

/// Timestamp layout used on the wire and in composite keys
pub const DATETIME_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A value produced for one field of one row
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i32),
    Long(i64),
    Double(f64),
    DateTime(DateTime<Utc>),
    Array(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write_double(f, *v),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_OUTPUT_FORMAT)),
            FieldValue::Array(items) => f.write_str(&items.join(",")),
        }
    }
}

/// Whole doubles keep one fractional digit, so `42.0` renders as `42.0`
fn write_double(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_finite() && v.fract() == 0.0 {
        write!(f, "{:.1}", v)
    } else {
        write!(f, "{}", v)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Integer(v) => serializer.serialize_i32(*v),
            FieldValue::Long(v) => serializer.serialize_i64(*v),
            FieldValue::Double(v) => serializer.serialize_f64(*v),
            FieldValue::DateTime(dt) => {
                serializer.collect_str(&dt.format(DATETIME_OUTPUT_FORMAT))
            },
            FieldValue::Array(items) => serializer.collect_seq(items),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

/// Convert a raw cell into the field's type.
///
/// `None` input stays unset. Values that do not parse are logged and left
/// unset; the row itself is not rejected.
pub fn coerce(spec: &FieldSpec, raw: Option<&str>) -> Option<FieldValue> {
    let raw = raw?;

    match spec.field_type() {
        FieldType::String => Some(FieldValue::String(raw.to_string())),
        FieldType::Array => Some(FieldValue::Array(split_list(raw, spec.list_delimiter()))),
        FieldType::DateTime => {
            let parsed = spec.date_format().parse(raw).map(FieldValue::DateTime);
            if parsed.is_none() {
                warn!(
                    field = %spec.name(),
                    value = %raw,
                    format = %spec.date_format().pattern(),
                    "Could not parse date value"
                );
            }
            parsed
        },
        FieldType::Integer => parse_number(spec, raw, FieldValue::Integer),
        FieldType::Long => parse_number(spec, raw, FieldValue::Long),
        FieldType::Double => parse_number(spec, raw, FieldValue::Double),
    }
}

fn parse_number<T: std::str::FromStr>(
    spec: &FieldSpec,
    raw: &str,
    wrap: fn(T) -> FieldValue,
) -> Option<FieldValue> {
    match raw.trim().parse::<T>() {
        Ok(v) => Some(wrap(v)),
        Err(_) => {
            warn!(
                field = %spec.name(),
                expected = %spec.field_type(),
                value = %raw,
                "Could not convert value"
            );
            None
        },
    }
}

/// Split on a literal delimiter, dropping trailing empty pieces
pub fn split_list(raw: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return vec![raw.to_string()];
    }

    let mut items: Vec<String> = raw.split(delimiter).map(str::to_string).collect();
    while items.last().is_some_and(|s| s.is_empty()) {
        items.pop();
    }
    items
}
