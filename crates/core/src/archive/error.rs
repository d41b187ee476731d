//! Error types for the archive module.

use thiserror::Error;

use crate::media::MediaSourceError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No entries were supplied.
    #[error("Archive {name} has no entries")]
    Empty { name: String },

    /// Failed to build the compressed archive.
    #[error("Failed to build archive: {0}")]
    Build(#[from] std::io::Error),

    /// Failed to persist the archive on the target source.
    #[error("Failed to store archive: {0}")]
    Storage(#[from] MediaSourceError),
}
