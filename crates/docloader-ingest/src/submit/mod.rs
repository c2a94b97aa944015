//! Batch submission and periodic soft commits

pub mod commit;
pub mod submitter;

pub use commit::CommitScheduler;
pub use submitter::{BatchSubmitter, SubmissionResult};
