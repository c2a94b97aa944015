//! Docloader Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Bulk loading of flat files into a document index.
//!
//! Each input row (CSV, or one JSON object per line) is mapped through a
//! declarative field configuration into a document. Documents are grouped
//! into batches and written concurrently to an [`sink::IndexSink`], with
//! per-batch retries, periodic soft commits and a final commit.
//!
//! # Overview
//!
//! - [`field`]: field definitions and value coercion
//! - [`document`]: document assembly and composite unique keys
//! - [`computed`]: computed fields backed by named plugins
//! - [`reader`] and [`sink`]: input and output
//! - [`submit`] and [`pipeline`]: batching, retries and commit scheduling
//! - [`indexer`]: a complete run driven by [`config::IndexerConfig`]
//!
//! # Example
//!
//! ```no_run
//! use docloader_ingest::config::IndexerConfig;
//! use docloader_ingest::indexer::Indexer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IndexerConfig::from_file("products.toml")?;
//!     let totals = Indexer::new(config).run().await?;
//!     println!("{} documents", totals.documents_indexed);
//!     Ok(())
//! }
//! ```

pub mod computed;
pub mod config;
pub mod document;
pub mod field;
pub mod indexer;
pub mod pipeline;
pub mod reader;
pub mod sink;
pub mod submit;

pub use docloader_common::{DocloaderError, Result};
