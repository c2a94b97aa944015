//! Periodic soft commits

use tracing::{info, warn};

use crate::sink::IndexSink;

/// Issues a soft commit every `frequency` completed batches
#[derive(Debug, Clone, Default)]
pub struct CommitScheduler {
    frequency: i64,
    commits_triggered: u64,
}

impl CommitScheduler {
    /// A frequency of zero or less disables soft commits
    pub fn new(frequency: i64) -> Self {
        Self {
            frequency,
            commits_triggered: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.frequency > 0
    }

    pub fn should_commit(&self, total_batches: u64) -> bool {
        self.is_enabled() && total_batches > 0 && total_batches % self.frequency as u64 == 0
    }

    pub fn commits_triggered(&self) -> u64 {
        self.commits_triggered
    }

    /// Soft commit if `total_batches` is due. Sink errors are logged only.
    pub async fn on_batch_completed(&mut self, total_batches: u64, sink: &dyn IndexSink) -> bool {
        if !self.should_commit(total_batches) {
            return false;
        }

        self.commits_triggered += 1;
        match sink.soft_commit().await {
            Ok(()) => info!(total_batches, "Soft commit"),
            Err(err) => warn!(total_batches, error = %err, "Soft commit failed"),
        }
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::document::OutputRecord;
    use async_trait::async_trait;
    use docloader_common::{DocloaderError, Result};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingSink {
        soft_commits: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl IndexSink for CountingSink {
        async fn write(&self, _records: &[OutputRecord]) -> Result<()> {
            Ok(())
        }

        async fn soft_commit(&self) -> Result<()> {
            self.soft_commits.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DocloaderError::sink("commit rejected"));
            }
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

    #[test]
    fn test_cadence() {
        let scheduler = CommitScheduler::new(5);
        let due: Vec<u64> = (0..20).filter(|n| scheduler.should_commit(*n)).collect();
        assert_eq!(due, vec![5, 10, 15]);
    }

    #[test]
    fn test_disabled() {
        for frequency in [0, -3] {
            let scheduler = CommitScheduler::new(frequency);
            assert!(!scheduler.is_enabled());
            assert!((0..50).all(|n| !scheduler.should_commit(n)));
        }
    }

    #[tokio::test]
    async fn test_twelve_batches_two_commits() {
        let sink = CountingSink::default();
        let mut scheduler = CommitScheduler::new(5);
        for total in 1..=12 {
            scheduler.on_batch_completed(total, &sink).await;
        }
        assert_eq!(scheduler.commits_triggered(), 2);
        assert_eq!(sink.soft_commits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_is_not_propagated() {
        let sink = CountingSink {
            fail: true,
            ..CountingSink::default()
        };
        let mut scheduler = CommitScheduler::new(1);
        assert!(scheduler.on_batch_completed(1, &sink).await);
        assert_eq!(scheduler.commits_triggered(), 1);
    }
}
