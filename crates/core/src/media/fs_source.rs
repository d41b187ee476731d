//! Filesystem-backed media source.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::item::TaskItemStore;

use super::traits::MediaSource;
use super::types::{
    ByteStream, Condition, FileDescriptor, ItemRef, MediaItem, MediaItemId, MediaSourceError,
    SearchFilter,
};

/// Media source rooted at a local directory.
///
/// Item ids are root-relative paths with `/` separators, so they stay stable
/// across runs. Files ending in the annotation suffix are sidecar documents
/// and are never returned as media items.
pub struct FsMediaSource {
    root: PathBuf,
    annotation_suffix: String,
    usage_index: Option<Arc<dyn TaskItemStore>>,
}

impl FsMediaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            annotation_suffix: ".json".to_string(),
            usage_index: None,
        }
    }

    /// Sets the suffix identifying annotation sidecar documents.
    pub fn with_annotation_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.annotation_suffix = suffix.into();
        self
    }

    /// Enables `exclude_already_used` filtering against the given store.
    pub fn with_usage_index(mut self, store: Arc<dyn TaskItemStore>) -> Self {
        self.usage_index = Some(store);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a root-relative path, rejecting anything that could escape the root.
    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaSourceError> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(MediaSourceError::InvalidPath {
                path: relative.to_string(),
            });
        }
        Ok(self.root.join(rel))
    }

    fn used_ids(&self, template_id: i64) -> Result<HashSet<MediaItemId>, MediaSourceError> {
        match &self.usage_index {
            Some(index) => index
                .used_media_item_ids(template_id)
                .map_err(|e| MediaSourceError::Backend(e.to_string())),
            None => {
                warn!("exclude_already_used requested but no usage index is configured");
                Ok(HashSet::new())
            }
        }
    }
}

fn scan(
    root: &Path,
    base: &Path,
    extensions: &[String],
    annotation_suffix: &str,
) -> Result<Vec<MediaItemId>, MediaSourceError> {
    if !base.is_dir() {
        return Err(MediaSourceError::not_found(base));
    }

    let mut ids = Vec::new();
    for entry in WalkDir::new(base).sort_by_file_name() {
        let entry = entry.map_err(|e| MediaSourceError::Backend(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !annotation_suffix.is_empty() && file_name.ends_with(annotation_suffix) {
            continue;
        }

        if !extensions.is_empty() {
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            if !extensions.contains(&ext) {
                continue;
            }
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| MediaSourceError::Backend(e.to_string()))?;
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        ids.push(MediaItemId(id));
    }

    Ok(ids)
}

/// Splits `images/cat.jpg` into (`images`, `cat.jpg`).
fn split_id(id: &MediaItemId) -> (String, String) {
    match id.as_str().rsplit_once('/') {
        Some((resource, name)) => (resource.to_string(), name.to_string()),
        None => (String::new(), id.as_str().to_string()),
    }
}

#[async_trait]
impl MediaSource for FsMediaSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn search_item_ids(
        &self,
        filter: &SearchFilter,
        conditions: &[Condition],
    ) -> Result<Vec<MediaItemId>, MediaSourceError> {
        if !conditions.is_empty() {
            warn!(
                conditions = conditions.len(),
                "Filesystem media source does not support search conditions, ignoring them"
            );
        }

        let base = self.resolve(&filter.path)?;
        let root = self.root.clone();
        let suffix = self.annotation_suffix.clone();
        let extensions: Vec<String> = filter
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        let mut ids = tokio::task::spawn_blocking(move || scan(&root, &base, &extensions, &suffix))
            .await
            .map_err(|e| MediaSourceError::Backend(e.to_string()))??;

        if filter.exclude_already_used {
            let used = self.used_ids(filter.task_template_id)?;
            ids.retain(|id| !used.contains(id));
        }

        if let Some(limit) = filter.limit {
            ids.truncate(limit as usize);
        }

        debug!(path = %filter.path, found = ids.len(), "Filesystem search complete");
        Ok(ids)
    }

    async fn get_items(&self, ids: &[MediaItemId]) -> Result<Vec<MediaItem>, MediaSourceError> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let path = self.resolve(id.as_str())?;
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let (resource, name) = split_id(id);
            items.push(MediaItem {
                id: id.clone(),
                name,
                path: resource,
                metadata: json!({ "sizeBytes": metadata.len() }),
            });
        }
        Ok(items)
    }

    async fn stat_item(&self, item: &ItemRef) -> Result<bool, MediaSourceError> {
        let path = self.resolve(&item.relative_path())?;
        match tokio::fs::metadata(&path).await {
            Ok(m) => Ok(m.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_item(&self, item: &ItemRef) -> Result<ByteStream, MediaSourceError> {
        let path = self.resolve(&item.relative_path())?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MediaSourceError::not_found(&path));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ReaderStream::new(file)
            .map(|chunk| chunk.map_err(MediaSourceError::from))
            .boxed())
    }

    async fn write_item(
        &self,
        item: &ItemRef,
        contents: Bytes,
    ) -> Result<FileDescriptor, MediaSourceError> {
        let relative = item.relative_path();
        let path = self.resolve(&relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &contents).await?;

        Ok(FileDescriptor {
            name: item.file_name.clone(),
            path: relative,
            size_bytes: contents.len() as u64,
            sha256: format!("{:x}", Sha256::digest(&contents)),
        })
    }
}
