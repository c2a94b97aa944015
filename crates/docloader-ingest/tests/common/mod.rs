//! Shared test sinks and readers

#![allow(dead_code)]

use async_trait::async_trait;
use docloader_common::{DocloaderError, Result};
use docloader_ingest::document::{OutputRecord, Row};
use docloader_ingest::field::FieldValue;
use docloader_ingest::reader::DataReader;
use docloader_ingest::sink::IndexSink;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory sink that records everything it receives
#[derive(Default)]
pub struct MockSink {
    /// Writes numbered below this succeed, when set
    pub succeed_first: Option<u32>,
    /// Number of initial writes that fail before any succeed
    pub fail_first: u32,
    pub write_delay: Duration,
    /// Batches holding a document with this integer id always fail, at once
    pub reject_id: Option<i32>,

    pub writes: AtomicU32,
    pub soft_commits: AtomicU32,
    pub commits: AtomicU32,
    pub optimizes: AtomicU32,
    pub closes: AtomicU32,
    pub batches: Mutex<Vec<usize>>,

    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockSink {
    pub fn failing_after(successes: u32) -> Self {
        Self {
            succeed_first: Some(successes),
            ..Self::default()
        }
    }

    pub fn flaky(failures: u32) -> Self {
        Self {
            fail_first: failures,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            write_delay: delay,
            ..Self::default()
        }
    }

    pub fn rejecting(id: i32, delay: Duration) -> Self {
        Self {
            reject_id: Some(id),
            write_delay: delay,
            ..Self::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexSink for MockSink {
    async fn write(&self, records: &[OutputRecord]) -> Result<()> {
        if let Some(id) = self.reject_id {
            if records.iter().any(|r| r.value("id") == Some(&FieldValue::Integer(id))) {
                self.writes.fetch_add(1, Ordering::SeqCst);
                return Err(DocloaderError::sink("400 Bad Request: document rejected"));
            }
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }

        let call = self.writes.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failed = call < self.fail_first || self.succeed_first.is_some_and(|n| call >= n);
        if failed {
            return Err(DocloaderError::sink("503 Service Unavailable"));
        }

        self.batches.lock().unwrap().push(records.len());
        Ok(())
    }

    async fn soft_commit(&self) -> Result<()> {
        self.soft_commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn optimize(&self) -> Result<()> {
        self.optimizes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reader over rows held in memory
pub struct MemoryReader {
    rows: VecDeque<Row>,
    line: u64,
    pub closed: bool,
}

impl MemoryReader {
    /// Single column rows "1".."n"
    pub fn numbered(n: usize) -> Self {
        Self::new((1..=n).map(|i| vec![Some(i.to_string())]).collect())
    }

    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into(),
            line: 0,
            closed: false,
        }
    }
}

impl DataReader for MemoryReader {
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
