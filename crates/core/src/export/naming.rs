//! Archive names and per-item reference URLs.

use chrono::{DateTime, Utc};

use crate::item::TaskItem;
use crate::task::Task;

const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// `<name>.tar.gz`, or `<task name>_<YYYYMMDD>_<unix millis>.tar.gz`.
pub fn archive_name(task_name: &str, explicit: Option<&str>, now: DateTime<Utc>) -> String {
    let stem = match explicit.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.trim_end_matches(ARCHIVE_SUFFIX).to_string(),
        None => format!(
            "{}_{}_{}",
            task_name,
            now.format("%Y%m%d"),
            now.timestamp_millis()
        ),
    };
    // Archive names are single path components
    let stem: String = stem
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}{}", stem, ARCHIVE_SUFFIX)
}

/// Back-link to an item in the annotation UI.
///
/// Items not yet bound to an assignment use `??` in place of its id.
pub fn reference_url(base_url: &str, task: &Task, item: &TaskItem) -> String {
    let assignment = item
        .task_assignment_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "??".to_string());

    [
        base_url.trim_end_matches('/').to_string(),
        "annotation".to_string(),
        task.project_id.to_string(),
        task.id.to_string(),
        assignment,
        item.id.to_string(),
    ]
    .join("/")
}
