//! Records of fetch and export runs.

mod sqlite_store;
mod store;
mod types;

pub(crate) use sqlite_store::SCHEMA;
pub use store::{JobError, JobStore, LAST_JOBS_LIMIT};
pub use types::{JobKind, JobRecord, JobStatus, NewJobRecord};
