//! Error types for the codec module.

use thiserror::Error;

/// Errors raised while translating annotation documents.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The document is valid JSON but does not match the codec's schema.
    #[error("Annotation document does not match schema: {reason}")]
    Schema { reason: String },

    /// An item could not be serialized.
    #[error("Failed to serialize task item {task_item_id}: {reason}")]
    Serialize { task_item_id: i64, reason: String },
}
