//! Media sources: where task media items and their annotation documents live.
//!
//! The pipeline depends only on the [`MediaSource`] contract. Sources are
//! looked up by id through a [`MediaSourceRegistry`].

mod fs_source;
mod registry;
mod traits;
mod types;

pub use fs_source::FsMediaSource;
pub use registry::MediaSourceRegistry;
pub use traits::MediaSource;
pub use types::{
    ByteStream, Condition, FileDescriptor, ItemRef, MediaItem, MediaItemId, MediaSourceError,
    SearchFilter,
};
