//! Error types for the export module.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::codec::CodecError;
use crate::media::MediaSourceError;

/// Errors surfaced by an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The media source failed while resolving selected items.
    #[error("Media source error: {0}")]
    Source(#[from] MediaSourceError),

    /// The codec failed hard on an item.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] CodecError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Task template not found: {0}")]
    TemplateNotFound(i64),

    #[error("Media source not found: {0}")]
    MediaSourceNotFound(i64),

    #[error("No codec registered for kind: {0}")]
    UnknownCodec(String),

    #[error("Task {0} is deleted")]
    TaskDeleted(i64),
}

impl From<crate::item::TaskItemError> for ExportError {
    fn from(e: crate::item::TaskItemError) -> Self {
        ExportError::Persistence(e.to_string())
    }
}

impl From<crate::task::TaskError> for ExportError {
    fn from(e: crate::task::TaskError) -> Self {
        ExportError::Persistence(e.to_string())
    }
}
