//! Error types for the ingest module.

use thiserror::Error;

use crate::media::MediaSourceError;
use crate::task::TaskStatus;

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The media source failed to search, list or read.
    #[error("Discovery failed: {0}")]
    Discovery(#[from] MediaSourceError),

    /// A pre-existing annotation document is malformed.
    #[error("Failed to parse annotation document {document}: {reason}")]
    Parse { document: String, reason: String },

    /// A task item or annotation could not be stored.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Task template not found: {0}")]
    TemplateNotFound(i64),

    #[error("Media source not found: {0}")]
    MediaSourceNotFound(i64),

    #[error("No codec registered for kind: {0}")]
    UnknownCodec(String),

    #[error("Task {0} is deleted")]
    TaskDeleted(i64),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    /// A first run was requested for a task that has already been created.
    #[error("Task {task_id} is {status}; only a refresh can add media to it")]
    AlreadyCreated { task_id: i64, status: TaskStatus },
}

impl From<crate::item::TaskItemError> for IngestionError {
    fn from(e: crate::item::TaskItemError) -> Self {
        IngestionError::Persistence(e.to_string())
    }
}

impl From<crate::task::TaskError> for IngestionError {
    fn from(e: crate::task::TaskError) -> Self {
        IngestionError::Persistence(e.to_string())
    }
}
