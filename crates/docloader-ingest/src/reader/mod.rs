//! Input readers
//!
//! Readers hand the pipeline one row at a time as positional cells, in the
//! order of the configured field list.

mod delimited;
mod json_lines;

pub use delimited::{CsvDataReader, CsvOptions};
pub use json_lines::{JsonDataReader, JsonFieldMapping};

use docloader_common::{DocloaderError, Result};
use std::path::Path;

pub use crate::document::Row;

pub trait DataReader: Send {
    /// Read the first row.
    ///
    /// The row is returned either way; when `first_row_is_header` is false
    /// the caller treats it as data.
    fn header(&mut self, first_row_is_header: bool) -> Result<Option<Row>>;

    /// Next row, or `None` at end of input
    fn read_row(&mut self) -> Result<Option<Row>>;

    /// Line of the most recently returned row, starting at 1
    fn line_number(&self) -> u64;

    fn close(&mut self) -> Result<()>;
}

/// Fail early with a readable message when the data file is not usable
pub(crate) fn check_data_file(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| DocloaderError::DataFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if !metadata.is_file() {
        return Err(DocloaderError::DataFile {
            path: path.display().to_string(),
            message: "not a regular file".to_string(),
        });
    }

    Ok(())
}
