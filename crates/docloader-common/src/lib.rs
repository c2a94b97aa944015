//! Docloader Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging setup and timing helpers for the docloader
//! workspace.
//!
//! # Example
//!
//! ```no_run
//! use docloader_common::logging::{init_logging, LogConfig};
//! use docloader_common::timing::format_elapsed;
//! use std::time::Instant;
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let started = Instant::now();
//!     tracing::info!(elapsed = %format_elapsed(started.elapsed()), "done");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod timing;

// Re-export commonly used types
pub use error::{DocloaderError, Result};
