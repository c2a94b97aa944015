//! Pipeline driver
//!
//! Reads rows, assembles documents, groups them into batches and hands full
//! batches to submission tasks. At most `thread_count` batches are in flight;
//! when every slot is taken the driver waits on the [`JoinSet`] for the next
//! batch to finish, in completion order. The partial last batch is submitted
//! from the driver itself, then every outstanding batch is awaited.
//!
//! After the first fatal error nothing new is submitted, but batches already
//! in flight are still awaited so the totals reported with the error are
//! exact.

use docloader_common::{DocloaderError, Result};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::document::{DocumentAssembler, OutputRecord, Row};
use crate::reader::DataReader;
use crate::submit::{BatchSubmitter, CommitScheduler, SubmissionResult};

/// Documents between progress log lines
pub const PROGRESS_INTERVAL: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub thread_count: usize,
    pub first_row_is_header: bool,
    pub soft_commit_frequency: i64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            thread_count: crate::config::DEFAULT_THREAD_COUNT,
            first_row_is_header: false,
            soft_commit_frequency: crate::config::DEFAULT_SOFT_COMMIT_FREQUENCY,
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineTotals {
    pub documents_indexed: u64,
    pub batches_completed: u64,
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub soft_commits: u64,
}

pub struct Pipeline {
    assembler: DocumentAssembler,
    submitter: BatchSubmitter,
    options: PipelineOptions,
    scheduler: CommitScheduler,
    totals: PipelineTotals,
}

impl Pipeline {
    pub fn new(assembler: DocumentAssembler, submitter: BatchSubmitter, options: PipelineOptions) -> Self {
        let options = PipelineOptions {
            batch_size: options.batch_size.max(1),
            thread_count: options.thread_count.max(1),
            ..options
        };

        Self {
            assembler,
            submitter,
            scheduler: CommitScheduler::new(options.soft_commit_frequency),
            options,
            totals: PipelineTotals::default(),
        }
    }

    /// Load every row from `reader`. The reader is closed before returning.
    ///
    /// A fatal error is returned as [`DocloaderError::Aborted`] carrying the
    /// totals of the batches that did complete.
    pub async fn run(mut self, reader: &mut dyn DataReader) -> Result<PipelineTotals> {
        let failure = self.drive(reader).await;

        if let Err(err) = reader.close() {
            warn!(error = %err, "Failed to close data reader");
        }

        self.totals.soft_commits = self.scheduler.commits_triggered();
        let totals = self.totals;

        match failure {
            None => Ok(totals),
            Some(source) => Err(DocloaderError::Aborted {
                documents_indexed: totals.documents_indexed,
                batches_completed: totals.batches_completed,
                source: Box::new(source),
            }),
        }
    }

    async fn drive(&mut self, reader: &mut dyn DataReader) -> Option<DocloaderError> {
        let batch_size = self.options.batch_size;
        let mut in_flight: JoinSet<SubmissionResult> = JoinSet::new();
        let mut batch: Vec<OutputRecord> = Vec::with_capacity(batch_size);
        let mut failure: Option<DocloaderError> = None;

        match reader.header(self.options.first_row_is_header) {
            Ok(Some(row)) if !self.options.first_row_is_header => {
                self.accept(&row, reader.line_number(), &mut batch);
            },
            Ok(_) => {},
            Err(err) => failure = Some(err),
        }

        while failure.is_none() {
            if batch.len() >= batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                let submitter = self.submitter.clone();
                in_flight.spawn(async move { submitter.submit(full).await });

                if let Err(err) = self.wait_for_slot(&mut in_flight).await {
                    failure = Some(err);
                    break;
                }
            }

            match reader.read_row() {
                Ok(Some(row)) => self.accept(&row, reader.line_number(), &mut batch),
                Ok(None) => break,
                Err(err) => failure = Some(err),
            }
        }

        if failure.is_none() && !batch.is_empty() {
            debug!(batch_size = batch.len(), "Submitting final partial batch");
            let result = self.submitter.submit(std::mem::take(&mut batch)).await;
            if let Err(err) = self.complete(Ok(result)).await {
                failure = Some(err);
            }
        }

        if failure.is_some() && !in_flight.is_empty() {
            info!(in_flight = in_flight.len(), "Waiting for in-flight batches before stopping");
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(err) = self.complete(joined).await {
                failure.get_or_insert(err);
            }
        }

        failure
    }

    fn accept(&mut self, row: &Row, line_number: u64, batch: &mut Vec<OutputRecord>) {
        self.totals.rows_read += 1;
        match self.assembler.assemble(row, line_number) {
            Some(record) => batch.push(record),
            None => self.totals.rows_skipped += 1,
        }
    }

    /// Account for finished batches, then block until a slot is free
    async fn wait_for_slot(&mut self, in_flight: &mut JoinSet<SubmissionResult>) -> Result<()> {
        while let Some(joined) = in_flight.try_join_next() {
            self.complete(joined).await?;
        }

        while in_flight.len() >= self.options.thread_count {
            match in_flight.join_next().await {
                Some(joined) => self.complete(joined).await?,
                None => break,
            }
        }

        Ok(())
    }

    /// Count one finished batch and give the scheduler a chance to soft
    /// commit. Every successful completion goes through here, including the
    /// tail batch and the final drain.
    async fn complete(&mut self, joined: std::result::Result<SubmissionResult, JoinError>) -> Result<()> {
        let result = joined
            .map_err(|e| DocloaderError::Worker(e.to_string()))?
            .into_result()?;

        let before = self.totals.documents_indexed;
        self.totals.documents_indexed += result.batch_size as u64;
        self.totals.batches_completed += 1;

        if before / PROGRESS_INTERVAL != self.totals.documents_indexed / PROGRESS_INTERVAL {
            info!(
                documents_indexed = self.totals.documents_indexed,
                batches_completed = self.totals.batches_completed,
                "Progress"
            );
        }

        self.scheduler
            .on_batch_completed(self.totals.batches_completed, self.submitter.sink().as_ref())
            .await;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::field::FieldSpecTable;
    use crate::sink::IndexSink;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    struct VecReader {
        rows: VecDeque<Row>,
        line: u64,
        closed: bool,
    }

    impl VecReader {
        fn numbered(n: usize) -> Self {
            Self {
                rows: (1..=n).map(|i| vec![Some(i.to_string())]).collect(),
                line: 0,
                closed: false,
            }
        }
    }

    impl DataReader for VecReader {
        fn header(&mut self, _first_row_is_header: bool) -> Result<Option<Row>> {
            self.read_row()
        }

        fn read_row(&mut self) -> Result<Option<Row>> {
            let row = self.rows.pop_front();
            if row.is_some() {
                self.line += 1;
            }
            Ok(row)
        }

        fn line_number(&self) -> u64 {
            self.line
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl IndexSink for RecordingSink {
        async fn write(&self, records: &[OutputRecord]) -> Result<()> {
            self.batches.lock().unwrap().push(records.len());
            Ok(())
        }

        async fn soft_commit(&self) -> Result<()> {
            Ok(())
        }

        async fn commit(&self) -> Result<()> {
            Ok(())
        }

        async fn optimize(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn pipeline(sink: Arc<RecordingSink>, options: PipelineOptions) -> Pipeline {
        let assembler =
            DocumentAssembler::new(FieldSpecTable::parse("id:int", false, ",").unwrap(), "id");
        let submitter = BatchSubmitter::new(sink, 1, Duration::ZERO);
        Pipeline::new(assembler, submitter, options)
    }

    fn options(batch_size: usize) -> PipelineOptions {
        PipelineOptions {
            batch_size,
            thread_count: 2,
            ..PipelineOptions::default()
        }
    }

    #[tokio::test]
    async fn test_header_row_is_data_unless_flagged() {
        let sink = Arc::new(RecordingSink::default());
        let totals = pipeline(sink.clone(), options(10))
            .run(&mut VecReader::numbered(3))
            .await
            .unwrap();
        assert_eq!(totals.documents_indexed, 3);

        let sink = Arc::new(RecordingSink::default());
        let flagged = PipelineOptions {
            first_row_is_header: true,
            ..options(10)
        };
        let totals = pipeline(sink, flagged)
            .run(&mut VecReader::numbered(3))
            .await
            .unwrap();
        assert_eq!(totals.documents_indexed, 2);
        assert_eq!(totals.rows_read, 2);
    }

    #[tokio::test]
    async fn test_rows_that_fail_assembly_are_counted() {
        let sink = Arc::new(RecordingSink::default());
        let assembler = DocumentAssembler::new(FieldSpecTable::parse("id", false, ",").unwrap(), "id")
            .with_key_layout(crate::document::UniqueKeyLayout::new("id", ""));
        let submitter = BatchSubmitter::new(sink, 1, Duration::ZERO);
        let mut reader = VecReader {
            rows: vec![vec![Some("a".into())], vec![None], vec![Some("b".into())]].into(),
            line: 0,
            closed: false,
        };

        let totals = Pipeline::new(assembler, submitter, options(10))
            .run(&mut reader)
            .await
            .unwrap();

        assert_eq!(totals.rows_read, 3);
        assert_eq!(totals.rows_skipped, 1);
        assert_eq!(totals.documents_indexed, 2);
        assert!(reader.closed);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let sink = Arc::new(RecordingSink::default());
        let totals = pipeline(sink.clone(), options(10))
            .run(&mut VecReader::numbered(0))
            .await
            .unwrap();
        assert_eq!(totals, PipelineTotals::default());
        assert!(sink.batches.lock().unwrap().is_empty());
    }
}
