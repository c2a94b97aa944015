//! Turning input rows into index documents

pub mod assembler;
pub mod record;
pub mod unique_key;

pub use assembler::{DocumentAssembler, Row};
pub use record::{OutputRecord, RecordValue, UPDATE_ACTION};
pub use unique_key::{UniqueKeyBuilder, UniqueKeyLayout};

/// Split a `;` separated list of field names, dropping blanks
pub fn split_names(list: &str) -> Vec<String> {
    list.split(';')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
