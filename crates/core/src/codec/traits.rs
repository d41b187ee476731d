//! Trait definitions for the codec module.

use super::error::CodecError;
use super::types::{ExportItem, ParsedAnnotations, SerializedFile};

/// Translates between an external annotation format and the internal model.
///
/// Codecs are selected by the `parser` kind of a task template.
pub trait AnnotationCodec: Send + Sync {
    /// The template kind this codec handles.
    fn kind(&self) -> &str;

    /// Parse a pre-existing annotation document.
    fn parse(&self, document: &serde_json::Value) -> Result<ParsedAnnotations, CodecError>;

    /// Serialize one task item.
    ///
    /// `Ok(None)` means there is nothing to export for this item; it is left
    /// out of the archive without failing the export.
    fn serialize(&self, item: &ExportItem) -> Result<Option<SerializedFile>, CodecError>;
}
