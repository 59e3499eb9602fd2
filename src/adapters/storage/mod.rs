use crate::domain::submission::Submission;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub mod daily_log;

pub use daily_log::DailyLogStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed partition {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode partition: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Appends a submission to its day's partition.
    ///
    /// Returns once the partition containing the submission has been flushed to disk.
    ///
    /// # Errors
    /// Returns `StorageError` if the partition cannot be written. An unreadable existing
    /// partition is not an error: it is replaced by a fresh one.
    async fn append(&self, submission: &Submission) -> Result<()>;
}
