//! One complete load: configuration to final commit

use docloader_common::timing::format_elapsed;
use docloader_common::{DocloaderError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::computed::ComputedFieldRegistry;
use crate::config::{DataType, IndexerConfig};
use crate::document::DocumentAssembler;
use crate::field::FieldSpecTable;
use crate::pipeline::{Pipeline, PipelineOptions, PipelineTotals};
use crate::reader::{CsvDataReader, DataReader, JsonDataReader};
use crate::sink::{build_sink, IndexSink};
use crate::submit::BatchSubmitter;

pub struct Indexer {
    config: IndexerConfig,
    registry: ComputedFieldRegistry,
}

impl Indexer {
    /// Indexer with the built-in computed field plugins
    pub fn new(config: IndexerConfig) -> Self {
        Self {
            config,
            registry: ComputedFieldRegistry::with_builtins(),
        }
    }

    /// Replace the plugin registry, e.g. to add custom computed fields
    pub fn with_registry(mut self, registry: ComputedFieldRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Run against the sink described in the configuration
    pub async fn run(&self) -> Result<PipelineTotals> {
        self.config.validate()?;
        let sink = build_sink(self.config.sink_config()?)?;
        self.run_with_sink(sink).await
    }

    /// Run against a caller-supplied sink.
    ///
    /// On success the sink is committed, optimized if configured, then
    /// closed. On failure it is only closed.
    pub async fn run_with_sink(&self, sink: Arc<dyn IndexSink>) -> Result<PipelineTotals> {
        let started = Instant::now();
        let outcome = match self.config.validate_source() {
            Ok(()) => {
                self.log_configuration();
                self.load(sink.clone()).await
            },
            Err(err) => Err(err),
        };

        let outcome = match outcome {
            Ok(totals) => self.finish(sink.as_ref(), totals).await,
            Err(err) => {
                if let Err(close_err) = sink.close().await {
                    warn!(error = %close_err, "Failed to close sink");
                }
                Err(err)
            },
        };

        let elapsed = format_elapsed(started.elapsed());
        match &outcome {
            Ok(totals) => info!(
                documents_indexed = totals.documents_indexed,
                batches_completed = totals.batches_completed,
                rows_skipped = totals.rows_skipped,
                soft_commits = totals.soft_commits,
                elapsed = %elapsed,
                "Load complete"
            ),
            Err(err) => {
                let (documents, batches) = err.partial_totals().unwrap_or((0, 0));
                error!(
                    documents_indexed = documents,
                    batches_completed = batches,
                    elapsed = %elapsed,
                    error = %err,
                    "Load failed"
                );
            },
        }

        outcome
    }

    async fn load(&self, sink: Arc<dyn IndexSink>) -> Result<PipelineTotals> {
        let config = &self.config;
        let fields = config.field_table()?;
        let computed = self.registry.resolve(config.computed_specs()?)?;

        let assembler = DocumentAssembler::new(fields.clone(), config.unique_key_field_name.trim())
            .with_literals(config.literal_table()?)
            .with_skip_fields(config.skip_field_names())
            .with_key_layout(config.key_layout())
            .with_computed(computed);

        let mut reader = self.open_reader(&fields)?;

        let submitter = BatchSubmitter::new(
            sink,
            config.retry_count,
            Duration::from_millis(config.sleep_millis_between_retries),
        );
        let options = PipelineOptions {
            batch_size: config.batch_size,
            thread_count: config.effective_thread_count(),
            // JSON lines have no header row
            first_row_is_header: config.first_row_is_header && config.data_type()? == DataType::Csv,
            soft_commit_frequency: config.soft_commit_frequency,
        };

        Pipeline::new(assembler, submitter, options)
            .run(reader.as_mut())
            .await
    }

    fn open_reader(&self, fields: &FieldSpecTable) -> Result<Box<dyn DataReader>> {
        let path = self.config.data_file()?;
        match self.config.data_type()? {
            DataType::Csv => Ok(Box::new(CsvDataReader::open(path, self.config.csv_options()?)?)),
            DataType::Json => {
                let mapping = self.config.json_mapping(fields)?;
                Ok(Box::new(JsonDataReader::open(path, mapping)?))
            },
        }
    }

    async fn finish(&self, sink: &dyn IndexSink, totals: PipelineTotals) -> Result<PipelineTotals> {
        let finalize = async {
            sink.commit().await?;
            if self.config.optimize_index {
                sink.optimize().await?;
            }
            sink.close().await
        };

        match finalize.await {
            Ok(()) => Ok(totals),
            Err(err) => {
                if let Err(close_err) = sink.close().await {
                    warn!(error = %close_err, "Failed to close sink");
                }
                Err(DocloaderError::Aborted {
                    documents_indexed: totals.documents_indexed,
                    batches_completed: totals.batches_completed,
                    source: Box::new(err),
                })
            },
        }
    }

    fn log_configuration(&self) {
        let c = &self.config;
        info!(
            data_type = ?c.data_type,
            data_file = ?c.path_to_data_file,
            sink = ?c.sink,
            "Starting load"
        );
        info!(
            fields = %c.fields,
            literals = %c.literals,
            skip_fields = %c.skip_fields,
            dynamic_fields = %c.dynamic_fields,
            fields_to_json = %c.fields_to_json,
            "Field configuration"
        );
        info!(
            unique_key_field_name = %c.unique_key_field_name,
            unique_key_field_value = %c.unique_key_field_value,
            unique_key_field_value_delimiter = %c.unique_key_field_value_delimiter,
            "Unique key configuration"
        );
        info!(
            batch_size = c.batch_size,
            thread_count = c.effective_thread_count(),
            retry_count = c.retry_count,
            sleep_millis_between_retries = c.sleep_millis_between_retries,
            soft_commit_frequency = c.soft_commit_frequency,
            optimize_index = c.optimize_index,
            first_row_is_header = c.first_row_is_header,
            "Submission configuration"
        );
    }
}
