//! Index sinks
//!
//! A sink receives batches of documents and the commit calls that make them
//! visible. Every method may fail; the submitter decides what a failure
//! means for the run.

mod http;
mod jsonl;

pub use http::HttpSink;
pub use jsonl::JsonLinesSink;

use async_trait::async_trait;
use docloader_common::Result;
use std::sync::Arc;

use crate::config::SinkConfig;
use crate::document::OutputRecord;

#[async_trait]
pub trait IndexSink: Send + Sync {
    /// Add or update a batch of documents
    async fn write(&self, records: &[OutputRecord]) -> Result<()>;

    /// Make recent writes visible without a full durable commit
    async fn soft_commit(&self) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn optimize(&self) -> Result<()>;

    /// Release connections and file handles
    async fn close(&self) -> Result<()>;
}

/// Build the sink named by the configuration
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn IndexSink>> {
    match config {
        SinkConfig::Http {
            base_url,
            collection,
            timeout_secs,
        } => Ok(Arc::new(HttpSink::new(base_url, collection, *timeout_secs)?)),
        SinkConfig::Jsonl { path } => Ok(Arc::new(JsonLinesSink::create(path)?)),
    }
}
