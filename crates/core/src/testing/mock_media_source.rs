//! Mock media source for testing.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::media::{
    ByteStream, Condition, FileDescriptor, ItemRef, MediaItem, MediaItemId, MediaSource,
    MediaSourceError, SearchFilter,
};

/// Size of the chunks `read_item` splits files into.
const CHUNK_SIZE: usize = 8;

/// A recorded search for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub filter: SearchFilter,
    pub conditions: Vec<Condition>,
}

/// A recorded write for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub item: ItemRef,
    pub contents: Bytes,
}

/// Mock implementation of the MediaSource trait.
///
/// Provides controllable behavior for testing:
/// - Serve a configurable, ordered list of media items
/// - Serve files (annotation documents) by relative path
/// - Track searches, reads and writes for assertions
/// - Simulate search and write failures
///
/// # Example
///
/// ```rust,ignore
/// use nota_core::testing::{MockMediaSource, fixtures};
///
/// let source = MockMediaSource::new();
/// source.set_items(fixtures::media_items(&["images/a.jpg"])).await;
/// source.add_file("images/a.jpg.json", br#"{"annotations":[]}"#.to_vec()).await;
///
/// // Run ingestion...
///
/// assert_eq!(source.recorded_reads().await, vec!["images/a.jpg.json"]);
/// ```
pub struct MockMediaSource {
    /// Media items in search order.
    items: Arc<RwLock<Vec<MediaItem>>>,
    /// File contents by relative path.
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    reads: Arc<RwLock<Vec<String>>>,
    writes: Arc<RwLock<Vec<RecordedWrite>>>,
    /// If set, searches fail with this message until cleared.
    search_error: Arc<RwLock<Option<String>>>,
    /// If set, writes fail with this message until cleared.
    write_error: Arc<RwLock<Option<String>>>,
}

impl Default for MockMediaSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaSource {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            files: Arc::new(RwLock::new(HashMap::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            reads: Arc::new(RwLock::new(Vec::new())),
            writes: Arc::new(RwLock::new(Vec::new())),
            search_error: Arc::new(RwLock::new(None)),
            write_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the served media items.
    pub async fn set_items(&self, items: Vec<MediaItem>) {
        *self.items.write().await = items;
    }

    /// Append a media item.
    pub async fn add_item(&self, item: MediaItem) {
        self.items.write().await.push(item);
    }

    /// Serve a file at a relative path (e.g., "images/a.jpg.json").
    pub async fn add_file(&self, path: &str, contents: Vec<u8>) {
        self.files.write().await.insert(path.to_string(), contents);
    }

    pub async fn set_search_error(&self, error: Option<String>) {
        *self.search_error.write().await = error;
    }

    pub async fn set_write_error(&self, error: Option<String>) {
        *self.write_error.write().await = error;
    }

    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    /// Relative paths of the files read, in call order.
    pub async fn recorded_reads(&self) -> Vec<String> {
        self.reads.read().await.clone()
    }

    pub async fn written(&self) -> Vec<RecordedWrite> {
        self.writes.read().await.clone()
    }
}

fn matches_filter(item: &MediaItem, filter: &SearchFilter) -> bool {
    let path = filter.path.trim_matches('/');
    if !path.is_empty() && !item.id.as_str().starts_with(&format!("{}/", path)) {
        return false;
    }
    if filter.extensions.is_empty() {
        return true;
    }
    let extension = item
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    filter
        .extensions
        .iter()
        .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&extension))
}

#[async_trait]
impl MediaSource for MockMediaSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search_item_ids(
        &self,
        filter: &SearchFilter,
        conditions: &[Condition],
    ) -> Result<Vec<MediaItemId>, MediaSourceError> {
        self.searches.write().await.push(RecordedSearch {
            filter: filter.clone(),
            conditions: conditions.to_vec(),
        });

        if let Some(message) = self.search_error.read().await.clone() {
            return Err(MediaSourceError::Backend(message));
        }

        let mut ids: Vec<MediaItemId> = self
            .items
            .read()
            .await
            .iter()
            .filter(|item| matches_filter(item, filter))
            .map(|item| item.id.clone())
            .collect();
        if let Some(limit) = filter.limit {
            ids.truncate(limit as usize);
        }
        Ok(ids)
    }

    async fn get_items(&self, ids: &[MediaItemId]) -> Result<Vec<MediaItem>, MediaSourceError> {
        let items = self.items.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| items.iter().find(|item| &item.id == id).cloned())
            .collect())
    }

    async fn stat_item(&self, item: &ItemRef) -> Result<bool, MediaSourceError> {
        Ok(self.files.read().await.contains_key(&item.relative_path()))
    }

    async fn read_item(&self, item: &ItemRef) -> Result<ByteStream, MediaSourceError> {
        let path = item.relative_path();
        self.reads.write().await.push(path.clone());

        let contents = match self.files.read().await.get(&path) {
            Some(contents) => contents.clone(),
            None => return Err(MediaSourceError::NotFound { path }),
        };

        let chunks: Vec<Result<Bytes, MediaSourceError>> = contents
            .chunks(CHUNK_SIZE)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn write_item(
        &self,
        item: &ItemRef,
        contents: Bytes,
    ) -> Result<FileDescriptor, MediaSourceError> {
        if let Some(message) = self.write_error.read().await.clone() {
            return Err(MediaSourceError::Backend(message));
        }

        let path = item.relative_path();
        self.files
            .write()
            .await
            .insert(path.clone(), contents.to_vec());
        self.writes.write().await.push(RecordedWrite {
            item: item.clone(),
            contents: contents.clone(),
        });

        Ok(FileDescriptor {
            name: item.file_name.clone(),
            path,
            size_bytes: contents.len() as u64,
            sha256: format!("{:x}", Sha256::digest(&contents)),
        })
    }
}
