//! Types for the export module.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::item::ExportSelection;
use crate::media::FileDescriptor;
use crate::sqlite::TIMESTAMP_SUBSEC_DIGITS;

/// Options of one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Exclusive lower bound on item `updated_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on item `updated_at`.
    pub to: Option<DateTime<Utc>>,
    /// When false, only items whose assignment is done are exported.
    pub include_ongoing: bool,
    /// Archive name without the `.tar.gz` suffix.
    pub name: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            include_ongoing: true,
            name: None,
        }
    }
}

impl ExportOptions {
    /// Store-level selection. Bounds are truncated to whole microseconds.
    /// Stored `updated_at` values are whole microseconds too, so for them
    /// `updated_at > from` and `updated_at <= to` hold exactly when they hold
    /// against the truncated bounds.
    pub fn selection(&self) -> ExportSelection {
        ExportSelection {
            from: self.from.map(|at| at.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS)),
            to: self.to.map(|at| at.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS)),
            include_ongoing: self.include_ongoing,
        }
    }
}

/// Result of an export run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
    /// The stored archive, or `None` when nothing was exported.
    pub file: Option<FileDescriptor>,
    /// Items actually serialized into the archive.
    pub count: u64,
}

impl ExportResult {
    pub fn empty() -> Self {
        Self {
            file: None,
            count: 0,
        }
    }
}
