//! HTTP sink posting JSON update requests to a search collection

use async_trait::async_trait;
use docloader_common::{DocloaderError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::IndexSink;
use crate::document::OutputRecord;

/// Sends documents to `{base_url}/{collection}/update`
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    update_url: String,
}

impl HttpSink {
    pub fn new(base_url: &str, collection: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DocloaderError::config(format!("Failed to build HTTP client: {}", e)))?;

        let update_url = format!(
            "{}/{}/update",
            base_url.trim_end_matches('/'),
            collection.trim_matches('/')
        );

        Ok(Self { client, update_url })
    }

    pub fn update_url(&self) -> &str {
        &self.update_url
    }

    async fn post<T: serde::Serialize + ?Sized>(&self, body: &T, query: &[(&str, &str)]) -> Result<()> {
        let response = self
            .client
            .post(&self.update_url)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|e| DocloaderError::sink(format!("Request to {} failed: {}", self.update_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DocloaderError::sink(format!(
                "{} returned {}: {}",
                self.update_url,
                status,
                detail.trim()
            )));
        }

        Ok(())
    }

    async fn command(&self, param: &str) -> Result<()> {
        let empty: [OutputRecord; 0] = [];
        self.post(&empty, &[(param, "true")]).await
    }
}

#[async_trait]
impl IndexSink for HttpSink {
    async fn write(&self, records: &[OutputRecord]) -> Result<()> {
        debug!(documents = records.len(), url = %self.update_url, "Posting batch");
        self.post(records, &[]).await
    }

    async fn soft_commit(&self) -> Result<()> {
        self.command("softCommit").await
    }

    async fn commit(&self) -> Result<()> {
        info!(url = %self.update_url, "Committing");
        self.command("commit").await
    }

    async fn optimize(&self) -> Result<()> {
        info!(url = %self.update_url, "Optimizing");
        self.command("optimize").await
    }

    async fn close(&self) -> Result<()> {
        debug!(url = %self.update_url, "Closing HTTP sink");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_url() {
        let sink = HttpSink::new("http://localhost:8983/solr/", "/products", 30).unwrap();
        assert_eq!(sink.update_url(), "http://localhost:8983/solr/products/update");
    }
}
