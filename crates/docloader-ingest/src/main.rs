//! Docloader - bulk load CSV and JSON lines files into a document index

use anyhow::{Context, Result};
use clap::Parser;
use docloader_common::logging::{init_logging, LogConfig, LogLevel};
use docloader_ingest::config::{DataType, IndexerConfig, SinkConfig};
use docloader_ingest::indexer::Indexer;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "docloader")]
#[command(author, version, about = "Bulk document loader")]
struct Cli {
    /// Properties file (TOML)
    #[arg(short, long, env = "DOCLOADER_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Input format: csv or json
    #[arg(long, env = "DOCLOADER_DATA_TYPE")]
    data_type: Option<DataType>,

    /// Data file to load
    #[arg(long, env = "DOCLOADER_PATH_TO_DATA_FILE")]
    path_to_data_file: Option<PathBuf>,

    /// Row fields, `name[:type[:format]]` separated by `;`
    #[arg(long, env = "DOCLOADER_FIELDS")]
    fields: Option<String>,

    /// JSON key for each field, `field:key` separated by `;`
    #[arg(long, env = "DOCLOADER_FIELDS_TO_JSON")]
    fields_to_json: Option<String>,

    /// Constant fields, `name:type:value` separated by `;`
    #[arg(long, env = "DOCLOADER_LITERALS")]
    literals: Option<String>,

    /// Fields read but never written, separated by `;`
    #[arg(long, env = "DOCLOADER_SKIP_FIELDS")]
    skip_fields: Option<String>,

    /// Computed fields, `target=plugin(source,...)` separated by `;`
    #[arg(long, env = "DOCLOADER_DYNAMIC_FIELDS")]
    dynamic_fields: Option<String>,

    /// Treat the first row as a header
    #[arg(long, env = "DOCLOADER_FIRST_ROW_IS_HEADER")]
    first_row_is_header: Option<bool>,

    #[arg(long, env = "DOCLOADER_CSV_DELIMITER")]
    csv_delimiter: Option<char>,

    #[arg(long, env = "DOCLOADER_CSV_QUOTE_CHARACTER")]
    csv_quote_character: Option<char>,

    #[arg(long, env = "DOCLOADER_MULTIVALUE_FIELD_DELIMITER")]
    multivalue_field_delimiter: Option<String>,

    #[arg(long, env = "DOCLOADER_UNIQUE_KEY_FIELD_NAME")]
    unique_key_field_name: Option<String>,

    /// Fields making up a composite key, separated by `;`
    #[arg(long, env = "DOCLOADER_UNIQUE_KEY_FIELD_VALUE")]
    unique_key_field_value: Option<String>,

    #[arg(long, env = "DOCLOADER_UNIQUE_KEY_FIELD_VALUE_DELIMITER")]
    unique_key_field_value_delimiter: Option<String>,

    #[arg(long, env = "DOCLOADER_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Concurrent batch submissions
    #[arg(long, env = "DOCLOADER_THREAD_COUNT")]
    thread_count: Option<usize>,

    /// Attempts per batch
    #[arg(long, env = "DOCLOADER_RETRY_COUNT")]
    retry_count: Option<u32>,

    #[arg(long, env = "DOCLOADER_SLEEP_MILLIS_BETWEEN_RETRIES")]
    sleep_millis_between_retries: Option<u64>,

    /// Soft commit every N completed batches, 0 or less disables
    #[arg(long, env = "DOCLOADER_SOFT_COMMIT_FREQUENCY", allow_hyphen_values = true)]
    soft_commit_frequency: Option<i64>,

    /// Optimize the index after the final commit
    #[arg(long, env = "DOCLOADER_OPTIMIZE_INDEX")]
    optimize_index: Option<bool>,

    /// Search server base URL, selects the HTTP sink
    #[arg(long, env = "DOCLOADER_SOLR_URL", requires = "collection")]
    solr_url: Option<String>,

    #[arg(long, env = "DOCLOADER_COLLECTION", requires = "solr_url")]
    collection: Option<String>,

    /// Write documents to a JSON lines file instead of a server
    #[arg(long, env = "DOCLOADER_OUTPUT", conflicts_with = "solr_url")]
    output: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<IndexerConfig> {
        let mut config = match &self.config {
            Some(path) => IndexerConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => IndexerConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut IndexerConfig) {
        if let Some(v) = self.data_type {
            config.data_type = Some(v);
        }
        if let Some(v) = &self.path_to_data_file {
            config.path_to_data_file = Some(v.clone());
        }
        override_with(&mut config.fields, &self.fields);
        override_with(&mut config.fields_to_json, &self.fields_to_json);
        override_with(&mut config.literals, &self.literals);
        override_with(&mut config.skip_fields, &self.skip_fields);
        override_with(&mut config.dynamic_fields, &self.dynamic_fields);
        override_with(&mut config.first_row_is_header, &self.first_row_is_header);
        override_with(&mut config.csv_delimiter, &self.csv_delimiter);
        override_with(&mut config.csv_quote_character, &self.csv_quote_character);
        override_with(&mut config.multivalue_field_delimiter, &self.multivalue_field_delimiter);
        override_with(&mut config.unique_key_field_name, &self.unique_key_field_name);
        override_with(&mut config.unique_key_field_value, &self.unique_key_field_value);
        override_with(
            &mut config.unique_key_field_value_delimiter,
            &self.unique_key_field_value_delimiter,
        );
        override_with(&mut config.batch_size, &self.batch_size);
        override_with(&mut config.thread_count, &self.thread_count);
        override_with(&mut config.retry_count, &self.retry_count);
        override_with(
            &mut config.sleep_millis_between_retries,
            &self.sleep_millis_between_retries,
        );
        override_with(&mut config.soft_commit_frequency, &self.soft_commit_frequency);
        override_with(&mut config.optimize_index, &self.optimize_index);

        if let (Some(base_url), Some(collection)) = (&self.solr_url, &self.collection) {
            let timeout_secs = match &config.sink {
                Some(SinkConfig::Http { timeout_secs, .. }) => *timeout_secs,
                _ => docloader_ingest::config::DEFAULT_HTTP_TIMEOUT_SECS,
            };
            config.sink = Some(SinkConfig::Http {
                base_url: base_url.clone(),
                collection: collection.clone(),
                timeout_secs,
            });
        }
        if let Some(path) = &self.output {
            config.sink = Some(SinkConfig::Jsonl { path: path.clone() });
        }
    }
}

fn override_with<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    Indexer::new(config).run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("docloader")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    if let Err(err) = run(cli).await {
        error!(error = %format!("{:#}", err), "docloader failed");
        std::process::exit(1);
    }

    Ok(())
}
