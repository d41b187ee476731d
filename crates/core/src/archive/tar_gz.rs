//! Gzip-compressed tar archives.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::codec::SerializedFile;
use crate::media::{FileDescriptor, ItemRef, MediaSource};

use super::error::ArchiveError;
use super::traits::ArchiveWriter;

/// Writes `.tar.gz` archives under a fixed resource of the target source.
#[derive(Debug, Clone)]
pub struct TarGzArchiveWriter {
    directory: String,
}

impl TarGzArchiveWriter {
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }
}

/// Builds the archive in memory, entries in the given order.
fn build(entries: &[SerializedFile]) -> Result<Vec<u8>, std::io::Error> {
    let mtime = Utc::now().timestamp().max(0) as u64;
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.bytes.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        builder.append_data(&mut header, &entry.name, entry.bytes.as_slice())?;
    }

    builder.into_inner()?.finish()
}

#[async_trait]
impl ArchiveWriter for TarGzArchiveWriter {
    async fn write(
        &self,
        name: &str,
        entries: &[SerializedFile],
        target: &dyn MediaSource,
    ) -> Result<FileDescriptor, ArchiveError> {
        if entries.is_empty() {
            return Err(ArchiveError::Empty {
                name: name.to_string(),
            });
        }

        let archive = build(entries)?;
        debug!(
            name = %name,
            entries = entries.len(),
            size_bytes = archive.len(),
            "Built archive"
        );

        let descriptor = target
            .write_item(&ItemRef::new(self.directory.clone(), name), Bytes::from(archive))
            .await?;
        Ok(descriptor)
    }
}
