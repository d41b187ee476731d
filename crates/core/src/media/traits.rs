//! Trait definitions for the media module.

use async_trait::async_trait;
use bytes::Bytes;

use super::types::{
    ByteStream, Condition, FileDescriptor, ItemRef, MediaItem, MediaItemId, MediaSourceError,
    SearchFilter,
};

/// A store of media items that tasks draw from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Returns the name of this media source implementation.
    fn name(&self) -> &str;

    /// Returns the ids of the items matching the filter, in a stable order.
    async fn search_item_ids(
        &self,
        filter: &SearchFilter,
        conditions: &[Condition],
    ) -> Result<Vec<MediaItemId>, MediaSourceError>;

    /// Fetches the items for the given ids. Unknown ids are skipped.
    async fn get_items(&self, ids: &[MediaItemId]) -> Result<Vec<MediaItem>, MediaSourceError>;

    /// Checks whether a file exists.
    async fn stat_item(&self, item: &ItemRef) -> Result<bool, MediaSourceError>;

    /// Opens a file for streaming.
    async fn read_item(&self, item: &ItemRef) -> Result<ByteStream, MediaSourceError>;

    /// Writes a file, replacing any existing one.
    async fn write_item(
        &self,
        item: &ItemRef,
        contents: Bytes,
    ) -> Result<FileDescriptor, MediaSourceError>;
}
