//! Types exchanged between the pipeline and annotation codecs.

use serde::{Deserialize, Serialize};

use crate::item::{Annotation, NewAnnotation, TaskItem};
use crate::media::MediaItem;

/// One annotation record as read from an external document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnnotation {
    pub labels_name: String,
    #[serde(default)]
    pub labels: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<serde_json::Value>,
    #[serde(default)]
    pub status: i64,
}

impl RawAnnotation {
    /// Stamps the record with its author, ready to be stored.
    pub fn into_new(self, created_by: i64) -> NewAnnotation {
        NewAnnotation {
            labels_name: self.labels_name,
            labels: self.labels,
            boundaries: self.boundaries,
            status: self.status,
            created_by,
        }
    }
}

/// Result of parsing an annotation document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedAnnotations {
    #[serde(default)]
    pub annotations: Vec<RawAnnotation>,
}

/// A done task item joined with its media item, handed to a codec for export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportItem {
    pub item: TaskItem,
    pub media: MediaItem,
    pub annotations: Vec<Annotation>,
    /// Back-link to the item in the annotation UI.
    pub reference_url: String,
}

/// A named file produced by a codec, to be placed in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_annotation_defaults() {
        let raw: RawAnnotation = serde_json::from_str(r#"{"labelsName":"tags"}"#).unwrap();
        assert_eq!(raw.labels, serde_json::Value::Null);
        assert_eq!(raw.boundaries, None);
        assert_eq!(raw.status, 0);

        let new = raw.into_new(9);
        assert_eq!(new.labels_name, "tags");
        assert_eq!(new.created_by, 9);
    }

    #[test]
    fn test_parsed_annotations_missing_list() {
        let parsed: ParsedAnnotations = serde_json::from_str("{}").unwrap();
        assert!(parsed.annotations.is_empty());
    }
}
