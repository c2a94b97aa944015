//! File sink writing one JSON document per line

use async_trait::async_trait;
use docloader_common::{DocloaderError, Result};
use serde_jsonlines::JsonLinesWriter;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::IndexSink;
use crate::document::OutputRecord;

type FileWriter = JsonLinesWriter<BufWriter<File>>;

/// Writes documents to a JSON lines file. Commits flush the file.
///
/// File I/O runs on the blocking pool; the writer is moved there and back
/// for each call while the lock is held.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<Option<FileWriter>>,
}

impl JsonLinesSink {
    /// Create (or truncate) the output file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(Some(JsonLinesWriter::new(BufWriter::new(file)))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<()> {
        self.blocking(|writer| writer.flush()).await
    }

    /// Run `op` against the writer on the blocking pool
    async fn blocking<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut FileWriter) -> std::io::Result<()> + Send + 'static,
    {
        let mut guard = self.writer.lock().await;
        let mut writer = guard.take().ok_or_else(|| self.closed())?;

        let (writer, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = op(&mut writer);
            (writer, outcome)
        })
        .await
        .map_err(|e| DocloaderError::Worker(format!("{} writer task failed: {}", self.path.display(), e)))?;

        *guard = Some(writer);
        outcome?;
        Ok(())
    }

    fn closed(&self) -> DocloaderError {
        DocloaderError::sink(format!("{} is already closed", self.path.display()))
    }
}

#[async_trait]
impl IndexSink for JsonLinesSink {
    async fn write(&self, records: &[OutputRecord]) -> Result<()> {
        let records = records.to_vec();
        self.blocking(move |writer| writer.write_all(&records)).await
    }

    async fn soft_commit(&self) -> Result<()> {
        self.flush().await
    }

    async fn commit(&self) -> Result<()> {
        info!(path = %self.path.display(), "Flushing output file");
        self.flush().await
    }

    async fn optimize(&self) -> Result<()> {
        debug!("Optimize has no effect on a JSON lines file");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut writer) = self.writer.lock().await.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || writer.flush())
            .await
            .map_err(|e| DocloaderError::Worker(e.to_string()))??;
        Ok(())
    }
}
