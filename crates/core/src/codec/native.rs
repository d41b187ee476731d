//! Built-in codec for the native JSON annotation format.

use serde::{Deserialize, Serialize};

use crate::item::Annotation;

use super::error::CodecError;
use super::traits::AnnotationCodec;
use super::types::{ExportItem, ParsedAnnotations, SerializedFile};

/// Reads and writes `{"annotations": [...]}` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeJsonCodec;

impl NativeJsonCodec {
    pub const KIND: &'static str = "native";
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NativeDocument<'a> {
    task_item_id: i64,
    media_item_id: &'a str,
    name: &'a str,
    path: &'a str,
    url: &'a str,
    annotations: &'a [Annotation],
}

impl AnnotationCodec for NativeJsonCodec {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn parse(&self, document: &serde_json::Value) -> Result<ParsedAnnotations, CodecError> {
        if !document.is_object() {
            return Err(CodecError::Schema {
                reason: "expected a JSON object".to_string(),
            });
        }
        ParsedAnnotations::deserialize(document).map_err(|e| CodecError::Schema {
            reason: e.to_string(),
        })
    }

    fn serialize(&self, item: &ExportItem) -> Result<Option<SerializedFile>, CodecError> {
        if item.annotations.is_empty() {
            return Ok(None);
        }

        let document = NativeDocument {
            task_item_id: item.item.id,
            media_item_id: item.media.id.as_str(),
            name: &item.media.name,
            path: &item.media.path,
            url: &item.reference_url,
            annotations: &item.annotations,
        };
        let bytes = serde_json::to_vec_pretty(&document).map_err(|e| CodecError::Serialize {
            task_item_id: item.item.id,
            reason: e.to_string(),
        })?;

        let file_name = format!("{}.json", item.media.name);
        let name = if item.media.path.is_empty() {
            file_name
        } else {
            format!("{}/{}", item.media.path.trim_end_matches('/'), file_name)
        };

        Ok(Some(SerializedFile { name, bytes }))
    }
}
