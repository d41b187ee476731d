//! Archive assembly for exports.

mod error;
mod tar_gz;
mod traits;

pub use error::ArchiveError;
pub use tar_gz::TarGzArchiveWriter;
pub use traits::ArchiveWriter;
