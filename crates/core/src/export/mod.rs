//! Export of done task items as compressed archives.

mod engine;
mod error;
mod naming;
mod types;

pub use engine::ExportEngine;
pub use error::ExportError;
pub use naming::{archive_name, reference_url};
pub use types::{ExportOptions, ExportResult};
