//! Pluggable annotation codecs.
//!
//! A codec parses pre-existing annotation documents during ingestion and
//! serializes done task items during export.

mod error;
mod native;
mod registry;
mod traits;
mod types;

pub use error::CodecError;
pub use native::NativeJsonCodec;
pub use registry::CodecRegistry;
pub use traits::AnnotationCodec;
pub use types::{ExportItem, ParsedAnnotations, RawAnnotation, SerializedFile};
