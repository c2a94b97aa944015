//! Run configuration
//!
//! Settings come from a TOML properties file and can be overridden on the
//! command line or through `DOCLOADER_*` environment variables. Every
//! definition string is parsed by [`IndexerConfig::validate`] so a bad
//! setting stops the run before the data file is opened.

use docloader_common::{DocloaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::computed::ComputedFieldSpec;
use crate::document::{split_names, UniqueKeyLayout};
use crate::field::FieldSpecTable;
use crate::reader::{CsvOptions, JsonFieldMapping};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_THREAD_COUNT: usize = 4;
pub const DEFAULT_RETRY_COUNT: u32 = 4;
pub const DEFAULT_SLEEP_MILLIS_BETWEEN_RETRIES: u64 = 5000;
pub const DEFAULT_SOFT_COMMIT_FREQUENCY: i64 = 0;
pub const DEFAULT_UNIQUE_KEY_FIELD_NAME: &str = "id";
pub const DEFAULT_MULTIVALUE_DELIMITER: &str = ",";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Format of the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Csv,
    Json,
}

impl std::str::FromStr for DataType {
    type Err = DocloaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(DataType::Csv),
            "json" => Ok(DataType::Json),
            other => Err(DocloaderError::config(format!(
                "Unknown data type '{}', expected csv or json",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Csv => f.write_str("csv"),
            DataType::Json => f.write_str("json"),
        }
    }
}

/// Where documents are sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    /// JSON update requests against a search collection
    Http {
        base_url: String,
        collection: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// One JSON document per line in a local file
    Jsonl { path: PathBuf },
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl std::fmt::Display for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkConfig::Http {
                base_url,
                collection,
                ..
            } => write!(f, "http {}/{}", base_url.trim_end_matches('/'), collection),
            SinkConfig::Jsonl { path } => write!(f, "jsonl {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerConfig {
    pub data_type: Option<DataType>,
    pub path_to_data_file: Option<PathBuf>,

    /// Row fields, `name[:type[:format]]` separated by `;`
    pub fields: String,
    /// `field:jsonKey` pairs for JSON input
    pub fields_to_json: String,
    /// Fixed fields, `name:type:value` separated by `;`
    pub literals: String,
    /// Fields used for the unique key but not written
    pub skip_fields: String,
    /// Computed fields, `target=plugin(source,...)` separated by `;`
    pub dynamic_fields: String,

    pub first_row_is_header: bool,
    pub csv_delimiter: char,
    pub csv_quote_character: char,
    pub multivalue_field_delimiter: String,

    pub unique_key_field_name: String,
    /// Fields joined into the unique key, separated by `;`
    pub unique_key_field_value: String,
    pub unique_key_field_value_delimiter: String,

    pub batch_size: usize,
    pub thread_count: usize,
    pub retry_count: u32,
    pub sleep_millis_between_retries: u64,
    /// Soft commit after every N batches; zero or less disables
    pub soft_commit_frequency: i64,
    pub optimize_index: bool,

    pub sink: Option<SinkConfig>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            data_type: None,
            path_to_data_file: None,
            fields: String::new(),
            fields_to_json: String::new(),
            literals: String::new(),
            skip_fields: String::new(),
            dynamic_fields: String::new(),
            first_row_is_header: false,
            csv_delimiter: ',',
            csv_quote_character: '"',
            multivalue_field_delimiter: DEFAULT_MULTIVALUE_DELIMITER.to_string(),
            unique_key_field_name: DEFAULT_UNIQUE_KEY_FIELD_NAME.to_string(),
            unique_key_field_value: String::new(),
            unique_key_field_value_delimiter: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            thread_count: DEFAULT_THREAD_COUNT,
            retry_count: DEFAULT_RETRY_COUNT,
            sleep_millis_between_retries: DEFAULT_SLEEP_MILLIS_BETWEEN_RETRIES,
            soft_commit_frequency: DEFAULT_SOFT_COMMIT_FREQUENCY,
            optimize_index: false,
            sink: None,
        }
    }
}

impl IndexerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| DocloaderError::config(format!("Invalid properties file: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DocloaderError::config(format!(
                "Cannot read properties file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check required settings and parse every definition string
    pub fn validate(&self) -> Result<()> {
        self.validate_source()?;
        self.validate_sink()
    }

    /// Everything except the `[sink]` section
    pub fn validate_source(&self) -> Result<()> {
        let data_type = self.data_type()?;
        let data_file = self.data_file()?;
        if data_file.as_os_str().is_empty() {
            return Err(DocloaderError::config("path_to_data_file is required"));
        }

        if self.fields.trim().is_empty() {
            return Err(DocloaderError::config(format!(
                "fields cannot be empty for {} data",
                data_type
            )));
        }
        if data_type == DataType::Json && self.fields_to_json.trim().is_empty() {
            return Err(DocloaderError::config(
                "fields_to_json cannot be empty for json data",
            ));
        }

        if self.unique_key_field_name.trim().is_empty() {
            return Err(DocloaderError::config("unique_key_field_name cannot be empty"));
        }
        if self.multivalue_field_delimiter.is_empty() {
            return Err(DocloaderError::config("multivalue_field_delimiter cannot be empty"));
        }
        if self.batch_size == 0 {
            return Err(DocloaderError::config("batch_size must be greater than 0"));
        }
        if data_type == DataType::Csv {
            self.csv_options()?;
        }

        let fields = self.field_table()?;
        self.literal_table()?;
        self.computed_specs()?;
        if data_type == DataType::Json {
            self.json_mapping(&fields)?;
        }

        Ok(())
    }

    fn validate_sink(&self) -> Result<()> {
        match self.sink_config()? {
            SinkConfig::Http {
                base_url,
                collection,
                ..
            } => {
                if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                    return Err(DocloaderError::config(format!(
                        "sink base_url '{}' must start with http:// or https://",
                        base_url
                    )));
                }
                if collection.trim().is_empty() {
                    return Err(DocloaderError::config("sink collection cannot be empty"));
                }
            },
            SinkConfig::Jsonl { path } => {
                if path.as_os_str().is_empty() {
                    return Err(DocloaderError::config("sink path cannot be empty"));
                }
            },
        }

        Ok(())
    }

    pub fn data_type(&self) -> Result<DataType> {
        self.data_type
            .ok_or_else(|| DocloaderError::config("data_type is required (csv or json)"))
    }

    pub fn data_file(&self) -> Result<&Path> {
        self.path_to_data_file
            .as_deref()
            .ok_or_else(|| DocloaderError::config("path_to_data_file is required"))
    }

    pub fn sink_config(&self) -> Result<&SinkConfig> {
        self.sink
            .as_ref()
            .ok_or_else(|| DocloaderError::config("a [sink] section is required"))
    }

    pub fn field_table(&self) -> Result<FieldSpecTable> {
        FieldSpecTable::parse(&self.fields, false, &self.multivalue_field_delimiter)
    }

    pub fn literal_table(&self) -> Result<FieldSpecTable> {
        FieldSpecTable::parse(&self.literals, true, &self.multivalue_field_delimiter)
    }

    pub fn skip_field_names(&self) -> Vec<String> {
        split_names(&self.skip_fields)
    }

    pub fn key_layout(&self) -> UniqueKeyLayout {
        UniqueKeyLayout::new(
            &self.unique_key_field_value,
            self.unique_key_field_value_delimiter.as_str(),
        )
    }

    pub fn computed_specs(&self) -> Result<Vec<ComputedFieldSpec>> {
        ComputedFieldSpec::parse_all(&self.dynamic_fields)
    }

    pub fn json_mapping(&self, fields: &FieldSpecTable) -> Result<JsonFieldMapping> {
        JsonFieldMapping::parse(&self.fields_to_json, fields)
    }

    pub fn csv_options(&self) -> Result<CsvOptions> {
        Ok(CsvOptions {
            delimiter: single_byte("csv_delimiter", self.csv_delimiter)?,
            quote: single_byte("csv_quote_character", self.csv_quote_character)?,
        })
    }

    /// Worker count, never below one
    pub fn effective_thread_count(&self) -> usize {
        self.thread_count.max(1)
    }
}

fn single_byte(setting: &str, c: char) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| DocloaderError::config(format!("{} must be a single ASCII character", setting)))
}
