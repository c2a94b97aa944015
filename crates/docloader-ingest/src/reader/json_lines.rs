//! Reader for files holding one JSON object per line

use docloader_common::{DocloaderError, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::debug;

use super::{check_data_file, DataReader, Row};
use crate::field::FieldSpecTable;

/// Which JSON key feeds each configured field, in field order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFieldMapping {
    keys: Vec<(String, String)>,
}

impl JsonFieldMapping {
    /// Parse `field:jsonKey;field:jsonKey` and line it up with `fields`.
    ///
    /// Fields without an entry read the JSON key of the same name.
    pub fn parse(config: &str, fields: &FieldSpecTable) -> Result<Self> {
        let mut explicit: Vec<(String, String)> = Vec::new();

        for entry in config.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let [field, key] = parts.as_slice() else {
                return Err(DocloaderError::config(format!(
                    "Invalid fields-to-json entry '{}': expected field:jsonKey",
                    entry
                )));
            };
            if field.is_empty() || key.is_empty() {
                return Err(DocloaderError::config(format!(
                    "Invalid fields-to-json entry '{}': field and key must not be empty",
                    entry
                )));
            }
            if explicit.iter().any(|(existing, _)| existing == field) {
                return Err(DocloaderError::config(format!(
                    "Field '{}' is mapped to JSON more than once",
                    field
                )));
            }
            explicit.push((field.to_string(), key.to_string()));
        }

        let keys = fields
            .names()
            .map(|name| {
                let key = explicit
                    .iter()
                    .find(|(field, _)| field == name)
                    .map_or(name, |(_, key)| key.as_str());
                (name.to_string(), key.to_string())
            })
            .collect();

        Ok(Self { keys })
    }

    /// Positional cells for one JSON object
    fn row(&self, object: &Map<String, Value>, line: u64) -> Row {
        self.keys
            .iter()
            .map(|(field, key)| match object.get(key) {
                None => {
                    debug!(line, field = %field, key = %key, "Key not present in JSON object");
                    None
                },
                Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            })
            .collect()
    }
}

/// Reads JSON objects line by line. Blank lines are skipped.
pub struct JsonDataReader {
    lines: Option<Lines<BufReader<File>>>,
    mapping: JsonFieldMapping,
    line_number: u64,
}

impl JsonDataReader {
    pub fn open(path: impl AsRef<Path>, mapping: JsonFieldMapping) -> Result<Self> {
        let path = path.as_ref();
        check_data_file(path)?;
        let file = File::open(path).map_err(|e| DocloaderError::DataFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            lines: Some(BufReader::new(file).lines()),
            mapping,
            line_number: 0,
        })
    }
}

impl DataReader for JsonDataReader {
    fn header(&mut self, _first_row_is_header: bool) -> Result<Option<Row>> {
        self.read_row()
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        for line in lines.by_ref() {
            let line = line?;
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }

            let object: Map<String, Value> = serde_json::from_str(&line)
                .map_err(|e| DocloaderError::data_format(self.line_number, e.to_string()))?;
            return Ok(Some(self.mapping.row(&object, self.line_number)));
        }

        Ok(None)
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    fn close(&mut self) -> Result<()> {
        self.lines = None;
        Ok(())
    }
}
