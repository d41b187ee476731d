//! Mock archive writer for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::archive::{ArchiveError, ArchiveWriter};
use crate::codec::SerializedFile;
use crate::media::{FileDescriptor, MediaSource, MediaSourceError};

/// A recorded archive write for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedArchive {
    pub name: String,
    pub entries: Vec<SerializedFile>,
    /// Name of the target media source.
    pub source: String,
}

/// Mock implementation of the ArchiveWriter trait.
///
/// Records archives instead of building them and returns a descriptor
/// under `exports/`.
pub struct MockArchiveWriter {
    writes: Arc<RwLock<Vec<RecordedArchive>>>,
    /// If set, the next write fails with this message.
    next_error: Arc<RwLock<Option<String>>>,
}

impl Default for MockArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArchiveWriter {
    pub fn new() -> Self {
        Self {
            writes: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn recorded_writes(&self) -> Vec<RecordedArchive> {
        self.writes.read().await.clone()
    }

    pub async fn set_next_error(&self, error: Option<String>) {
        *self.next_error.write().await = error;
    }
}

#[async_trait]
impl ArchiveWriter for MockArchiveWriter {
    async fn write(
        &self,
        name: &str,
        entries: &[SerializedFile],
        target: &dyn MediaSource,
    ) -> Result<FileDescriptor, ArchiveError> {
        if let Some(message) = self.next_error.write().await.take() {
            return Err(ArchiveError::Storage(MediaSourceError::Backend(message)));
        }

        self.writes.write().await.push(RecordedArchive {
            name: name.to_string(),
            entries: entries.to_vec(),
            source: target.name().to_string(),
        });

        Ok(FileDescriptor {
            name: name.to_string(),
            path: format!("exports/{}", name),
            size_bytes: entries.iter().map(|e| e.bytes.len() as u64).sum(),
            sha256: String::new(),
        })
    }
}
