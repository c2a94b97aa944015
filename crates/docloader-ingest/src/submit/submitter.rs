//! Batch submission with fixed-delay retries

use docloader_common::{DocloaderError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::document::OutputRecord;
use crate::sink::IndexSink;

/// Outcome of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionResult {
    pub batch_size: usize,
    pub succeeded: bool,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

impl SubmissionResult {
    /// Turn a failed submission into the error that ends the run
    pub fn into_result(self) -> Result<Self> {
        if self.succeeded {
            Ok(self)
        } else {
            Err(DocloaderError::RetriesExhausted {
                attempts: self.attempts,
                batch_size: self.batch_size,
            })
        }
    }
}

/// Writes batches to the sink, retrying failed writes
#[derive(Clone)]
pub struct BatchSubmitter {
    sink: Arc<dyn IndexSink>,
    retry_count: u32,
    sleep_between_retries: Duration,
}

impl BatchSubmitter {
    /// `retry_count` is the total number of attempts per batch; zero is
    /// treated as one.
    pub fn new(sink: Arc<dyn IndexSink>, retry_count: u32, sleep_between_retries: Duration) -> Self {
        Self {
            sink,
            retry_count: retry_count.max(1),
            sleep_between_retries,
        }
    }

    pub fn sink(&self) -> &Arc<dyn IndexSink> {
        &self.sink
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Write one batch. Any error from the sink counts as a failed attempt.
    pub async fn submit(&self, batch: Vec<OutputRecord>) -> SubmissionResult {
        let started = Instant::now();
        let batch_size = batch.len();
        let mut attempts = 0;

        while attempts < self.retry_count {
            attempts += 1;

            match self.sink.write(&batch).await {
                Ok(()) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    debug!(batch_size, attempts, elapsed_ms, "Batch submitted");
                    return SubmissionResult {
                        batch_size,
                        succeeded: true,
                        attempts,
                        elapsed_ms,
                    };
                },
                Err(err) if attempts < self.retry_count => {
                    warn!(
                        attempt = attempts,
                        retry_count = self.retry_count,
                        batch_size,
                        sleep_ms = self.sleep_between_retries.as_millis() as u64,
                        error = %err,
                        "Batch submission failed, retrying"
                    );
                    tokio::time::sleep(self.sleep_between_retries).await;
                },
                Err(err) => {
                    error!(
                        attempts,
                        batch_size,
                        error = %err,
                        "Batch submission failed, retries exhausted"
                    );
                },
            }
        }

        SubmissionResult {
            batch_size,
            succeeded: false,
            attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` writes
    struct FlakySink {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl IndexSink for FlakySink {
        async fn write(&self, _records: &[OutputRecord]) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(DocloaderError::sink("503 Service Unavailable"))
            } else {
                Ok(())
            }
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

    fn submitter(failures: u32, retry_count: u32) -> (BatchSubmitter, Arc<FlakySink>) {
        let sink = Arc::new(FlakySink {
            failures,
            calls: AtomicU32::new(0),
        });
        let submitter = BatchSubmitter::new(sink.clone(), retry_count, Duration::from_millis(5000));
        (submitter, sink)
    }

    fn batch(n: usize) -> Vec<OutputRecord> {
        (0..n).map(|_| OutputRecord::new()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_succeeds() {
        let (submitter, sink) = submitter(0, 4);
        let result = submitter.submit(batch(3)).await;

        assert!(result.succeeded);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.batch_size, 3);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_k_failures() {
        let (submitter, _sink) = submitter(2, 4);
        let started = tokio::time::Instant::now();
        let result = submitter.submit(batch(1)).await;

        assert!(result.succeeded);
        assert_eq!(result.attempts, 3);
        // two sleeps, one before each retry
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(10_000) && waited < Duration::from_millis(15_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion() {
        let (submitter, sink) = submitter(10, 4);
        let result = submitter.submit(batch(2)).await;

        assert!(!result.succeeded);
        assert_eq!(result.attempts, 4);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 4);
        match result.into_result() {
            Err(DocloaderError::RetriesExhausted { attempts, batch_size }) => {
                assert_eq!((attempts, batch_size), (4, 2));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retry_count_still_tries_once() {
        let (submitter, sink) = submitter(0, 0);
        assert_eq!(submitter.retry_count(), 1);
        assert!(submitter.submit(batch(1)).await.succeeded);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }
}
