//! Types for the ingest module.

use serde::{Deserialize, Serialize};

use super::error::IngestionError;

/// Counts of a successful ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
    /// Task items created by this run.
    pub added: u64,
    /// Default annotations synthesized by the auto-create pass.
    pub auto_created: u64,
}

/// Outcome of [`IngestionEngine::run`](super::IngestionEngine::run).
///
/// Failures are already logged and reflected in the task status (first
/// runs only); `Failed` lets callers alert on refresh failures, which leave
/// the status untouched.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(IngestionResult),
    Failed(IngestionError),
}

impl RunOutcome {
    /// Items added by the run; a failed run reports zero.
    pub fn added_count(&self) -> u64 {
        match self {
            RunOutcome::Completed(result) => result.added,
            RunOutcome::Failed(_) => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&IngestionError> {
        match self {
            RunOutcome::Completed(_) => None,
            RunOutcome::Failed(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<IngestionResult, IngestionError> {
        match self {
            RunOutcome::Completed(result) => Ok(result),
            RunOutcome::Failed(e) => Err(e),
        }
    }
}
