//! Error types for docloader
//!
//! Messages are written for the operator running a load: they name the
//! offending field, line or setting so the configuration can be fixed.

use thiserror::Error;

/// Result type alias for docloader operations
pub type Result<T> = std::result::Result<T, DocloaderError>;

/// Main error type for docloader
#[derive(Error, Debug)]
pub enum DocloaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or inconsistent run settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// A field definition string could not be parsed
    #[error("Invalid field definition '{entry}': {message}")]
    FieldDefinition { entry: String, message: String },

    /// A computed field definition could not be parsed or resolved
    #[error("Invalid computed field '{entry}': {message}")]
    ComputedField { entry: String, message: String },

    #[error(
        "Unique key field '{field}' has no value. Check that it is listed in the fields or \
         literals and that it is not blank in the data."
    )]
    MissingKeyField { field: String },

    #[error("Unique key field '{field}' is empty")]
    EmptyKeyField { field: String },

    /// The data file does not exist or cannot be opened
    #[error("Data file '{path}' cannot be read: {message}")]
    DataFile { path: String, message: String },

    /// The data file content cannot be decoded
    #[error("Malformed data at line {line}: {message}")]
    DataFormat { line: u64, message: String },

    /// The index sink rejected a request
    #[error("Index sink error: {0}")]
    Sink(String),

    #[error("Batch of {batch_size} documents failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32, batch_size: usize },

    /// A submission task panicked or was cancelled
    #[error("Submission worker failed: {0}")]
    Worker(String),

    /// The run stopped early; totals cover the batches that did complete
    #[error(
        "Load aborted after {documents_indexed} documents in {batches_completed} batches: {source}"
    )]
    Aborted {
        documents_indexed: u64,
        batches_completed: u64,
        #[source]
        source: Box<DocloaderError>,
    },
}

impl DocloaderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn field_definition(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FieldDefinition {
            entry: entry.into(),
            message: message.into(),
        }
    }

    pub fn computed_field(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ComputedField {
            entry: entry.into(),
            message: message.into(),
        }
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    pub fn data_format(line: u64, message: impl Into<String>) -> Self {
        Self::DataFormat {
            line,
            message: message.into(),
        }
    }

    /// True for errors that are raised before any row is read
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::FieldDefinition { .. } | Self::ComputedField { .. }
        )
    }

    /// Totals carried by an aborted run, if any
    pub fn partial_totals(&self) -> Option<(u64, u64)> {
        match self {
            Self::Aborted {
                documents_indexed,
                batches_completed,
                ..
            } => Some((*documents_indexed, *batches_completed)),
            _ => None,
        }
    }
}
