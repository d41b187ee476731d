//! Media source types.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a media item, opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaItemId(pub String);

impl MediaItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MediaItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A media item owned by a media source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaItemId,
    /// File name (e.g., "cat.jpg").
    pub name: String,
    /// Resource (directory) the item lives in, relative to the source.
    pub path: String,
    /// Backend-specific metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A source-specific search condition.
///
/// The pipeline forwards conditions to the media source without
/// interpreting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Condition(pub serde_json::Value);

/// Search filter built from a task's media source options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Resource prefix to search under ("" = whole source).
    pub path: String,
    /// Template the task belongs to (scope for `exclude_already_used`).
    pub task_template_id: i64,
    /// Allowed file extensions without the dot (empty = any).
    pub extensions: Vec<String>,
    /// Maximum number of ids to return.
    pub limit: Option<u64>,
    /// Skip items already attached to a task of the same template.
    pub exclude_already_used: bool,
}

/// Location of a file on a media source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemRef {
    /// Resource (directory) relative to the source root.
    pub resource: String,
    /// File name within the resource.
    pub file_name: String,
}

impl ItemRef {
    pub fn new(resource: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            file_name: file_name.into(),
        }
    }

    /// The sibling annotation document of a media item (`cat.jpg` -> `cat.jpg.json`).
    pub fn sidecar(item: &MediaItem, suffix: &str) -> Self {
        Self::new(item.path.clone(), format!("{}{}", item.name, suffix))
    }

    /// Joined `resource/file_name` form.
    pub fn relative_path(&self) -> String {
        if self.resource.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.resource.trim_end_matches('/'), self.file_name)
        }
    }
}

/// A file persisted on a media source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    /// Location relative to the source root.
    pub path: String,
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the contents.
    pub sha256: String,
}

/// Finite, single-pass stream of file contents.
pub type ByteStream = BoxStream<'static, Result<Bytes, MediaSourceError>>;

/// Errors raised by media source backends.
#[derive(Debug, Error)]
pub enum MediaSourceError {
    /// The referenced file does not exist.
    #[error("Media file not found: {path}")]
    NotFound { path: String },

    /// The reference escapes the source root or is otherwise malformed.
    #[error("Invalid media path: {path}")]
    InvalidPath { path: String },

    /// No media source registered under this id.
    #[error("Unknown media source: {0}")]
    UnknownSource(i64),

    /// Backend failure.
    #[error("Media source backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaSourceError {
    pub(crate) fn not_found(path: &Path) -> Self {
        Self::NotFound {
            path: path.display().to_string(),
        }
    }
}
