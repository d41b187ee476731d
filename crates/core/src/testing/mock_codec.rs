//! Mock annotation codec for testing.

use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::codec::{AnnotationCodec, CodecError, ExportItem, ParsedAnnotations, SerializedFile};

/// Mock implementation of the AnnotationCodec trait.
///
/// Parses the native `{"annotations": [...]}` layout and serializes every
/// item to `<media id>.mock`. Codec calls are synchronous, so the state is
/// kept behind std locks.
pub struct MockCodec {
    kind: String,
    parsed: Arc<RwLock<Vec<serde_json::Value>>>,
    /// Task item ids passed to `serialize`, in call order.
    serialized: Arc<RwLock<Vec<i64>>>,
    reference_urls: Arc<RwLock<Vec<String>>>,
    /// Media items for which `serialize` returns no output.
    skipped_media: Arc<RwLock<HashSet<String>>>,
    parse_error: Arc<RwLock<Option<String>>>,
    serialize_error: Arc<RwLock<Option<String>>>,
}

impl Default for MockCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCodec {
    /// A codec of kind `mock`.
    pub fn new() -> Self {
        Self::with_kind("mock")
    }

    pub fn with_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            parsed: Arc::new(RwLock::new(Vec::new())),
            serialized: Arc::new(RwLock::new(Vec::new())),
            reference_urls: Arc::new(RwLock::new(Vec::new())),
            skipped_media: Arc::new(RwLock::new(HashSet::new())),
            parse_error: Arc::new(RwLock::new(None)),
            serialize_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Documents passed to `parse`.
    pub fn parse_calls(&self) -> Vec<serde_json::Value> {
        self.parsed.read().unwrap().clone()
    }

    pub fn serialized(&self) -> Vec<i64> {
        self.serialized.read().unwrap().clone()
    }

    pub fn reference_urls(&self) -> Vec<String> {
        self.reference_urls.read().unwrap().clone()
    }

    /// Make `serialize` return no output for a media item.
    pub fn skip_media(&self, media_item_id: &str) {
        self.skipped_media
            .write()
            .unwrap()
            .insert(media_item_id.to_string());
    }

    pub fn set_parse_error(&self, error: Option<String>) {
        *self.parse_error.write().unwrap() = error;
    }

    pub fn set_serialize_error(&self, error: Option<String>) {
        *self.serialize_error.write().unwrap() = error;
    }
}

impl AnnotationCodec for MockCodec {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn parse(&self, document: &serde_json::Value) -> Result<ParsedAnnotations, CodecError> {
        self.parsed.write().unwrap().push(document.clone());

        if let Some(reason) = self.parse_error.read().unwrap().clone() {
            return Err(CodecError::Schema { reason });
        }
        ParsedAnnotations::deserialize(document).map_err(|e| CodecError::Schema {
            reason: e.to_string(),
        })
    }

    fn serialize(&self, item: &ExportItem) -> Result<Option<SerializedFile>, CodecError> {
        self.serialized.write().unwrap().push(item.item.id);
        self.reference_urls
            .write()
            .unwrap()
            .push(item.reference_url.clone());

        if let Some(reason) = self.serialize_error.read().unwrap().clone() {
            return Err(CodecError::Serialize {
                task_item_id: item.item.id,
                reason,
            });
        }
        if self
            .skipped_media
            .read()
            .unwrap()
            .contains(item.media.id.as_str())
        {
            return Ok(None);
        }

        let labels: Vec<&str> = item
            .annotations
            .iter()
            .map(|a| a.labels_name.as_str())
            .collect();
        Ok(Some(SerializedFile {
            name: format!("{}.mock", item.media.id),
            bytes: labels.join("\n").into_bytes(),
        }))
    }
}
