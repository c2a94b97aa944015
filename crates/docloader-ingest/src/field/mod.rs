//! Field definitions, typed values and value coercion

pub mod date_format;
pub mod spec;
pub mod value;

pub use date_format::{DateFormat, DEFAULT_DATE_PATTERN};
pub use spec::{FieldSpec, FieldSpecTable, FieldType};
pub use value::{coerce, split_list, FieldValue};
