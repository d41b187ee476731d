//! Trait definitions for the archive module.

use async_trait::async_trait;

use crate::codec::SerializedFile;
use crate::media::{FileDescriptor, MediaSource};

use super::error::ArchiveError;

/// Packs named buffers into one archive and persists it on a media source.
#[async_trait]
pub trait ArchiveWriter: Send + Sync {
    async fn write(
        &self,
        name: &str,
        entries: &[SerializedFile],
        target: &dyn MediaSource,
    ) -> Result<FileDescriptor, ArchiveError>;
}
