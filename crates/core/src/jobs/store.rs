//! Job record storage trait and error type.

use thiserror::Error;

use super::types::{JobKind, JobRecord, NewJobRecord};

/// Number of records returned by [`JobStore::last_jobs`].
pub const LAST_JOBS_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for JobError {
    fn from(e: rusqlite::Error) -> Self {
        JobError::Database(e.to_string())
    }
}

/// Append-only log of fetch and export runs.
pub trait JobStore: Send + Sync {
    fn record(&self, job: NewJobRecord) -> Result<JobRecord, JobError>;

    /// The most recent jobs of a kind for a task, newest first.
    fn last_jobs(&self, task_id: i64, kind: JobKind) -> Result<Vec<JobRecord>, JobError>;
}
