//! Task ingestion: discovery, annotation import and auto-created labels.

mod engine;
mod error;
mod types;

pub use engine::IngestionEngine;
pub use error::IngestionError;
pub use types::{IngestionResult, RunOutcome};
