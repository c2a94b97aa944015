//! Delimited text reader

use csv::{Reader, ReaderBuilder, StringRecord};
use docloader_common::{DocloaderError, Result};
use std::fs::File;
use std::path::Path;
use tracing::debug;

use super::{check_data_file, DataReader, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
        }
    }
}

/// Reads rows from a CSV file. Empty cells come back as `None`.
pub struct CsvDataReader {
    reader: Option<Reader<File>>,
    record: StringRecord,
    line_number: u64,
}

impl CsvDataReader {
    pub fn open(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        check_data_file(path)?;

        let reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| DocloaderError::DataFile {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        debug!(path = %path.display(), "Opened CSV data file");

        Ok(Self {
            reader: Some(reader),
            record: StringRecord::new(),
            line_number: 0,
        })
    }
}

impl DataReader for CsvDataReader {
    fn header(&mut self, first_row_is_header: bool) -> Result<Option<Row>> {
        let row = self.read_row()?;
        if first_row_is_header {
            debug!(columns = row.as_ref().map_or(0, Vec::len), "Read header row");
        }
        Ok(row)
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let more = reader.read_record(&mut self.record).map_err(|e| {
            let line = e.position().map_or(self.line_number + 1, |p| p.line());
            DocloaderError::data_format(line, e.to_string())
        })?;
        if !more {
            return Ok(None);
        }

        if let Some(position) = self.record.position() {
            self.line_number = position.line();
        } else {
            self.line_number += 1;
        }

        Ok(Some(
            self.record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        ))
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    fn close(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }
}
