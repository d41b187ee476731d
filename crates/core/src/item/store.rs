//! Task item storage trait and error type.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::media::MediaItemId;

use super::types::{
    Annotation, AssignmentStatus, ExportSelection, NewAnnotation, NewTaskItem, SelectedItem,
    TaskAssignment, TaskItem, TaskItemStatus,
};

/// Error type for task item operations.
#[derive(Debug, Error)]
pub enum TaskItemError {
    #[error("Task item not found: {0}")]
    NotFound(i64),

    #[error("Task assignment not found: {0}")]
    AssignmentNotFound(i64),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for TaskItemError {
    fn from(e: rusqlite::Error) -> Self {
        TaskItemError::Database(e.to_string())
    }
}

/// Persistence boundary for task items, annotations and assignments.
pub trait TaskItemStore: Send + Sync {
    /// Media item ids already attached to a task.
    fn media_item_ids(&self, task_id: i64) -> Result<HashSet<MediaItemId>, TaskItemError>;

    /// Media item ids attached to any live task using the template.
    fn used_media_item_ids(&self, template_id: i64)
        -> Result<HashSet<MediaItemId>, TaskItemError>;

    /// Create a NOT_DONE task item together with its annotations.
    ///
    /// Either the item and all of its annotations are stored, or nothing is.
    fn create_item(&self, item: NewTaskItem) -> Result<TaskItem, TaskItemError>;

    /// NOT_DONE items of a task that have no annotation named `labels_name`.
    fn items_missing_annotation(
        &self,
        task_id: i64,
        labels_name: &str,
    ) -> Result<Vec<TaskItem>, TaskItemError>;

    fn create_annotation(
        &self,
        task_item_id: i64,
        annotation: NewAnnotation,
    ) -> Result<Annotation, TaskItemError>;

    /// Done items of a task matching the selection, ordered by item id, each
    /// with its annotations ordered by annotation id.
    fn select_for_export(
        &self,
        task_id: i64,
        selection: &ExportSelection,
    ) -> Result<Vec<SelectedItem>, TaskItemError>;

    fn set_item_status(
        &self,
        item_id: i64,
        status: TaskItemStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TaskItemError>;

    fn create_assignment(
        &self,
        task_id: i64,
        assigned_to: i64,
    ) -> Result<TaskAssignment, TaskItemError>;

    /// Bind items to an assignment.
    fn assign_items(&self, assignment_id: i64, item_ids: &[i64]) -> Result<(), TaskItemError>;

    fn set_assignment_status(
        &self,
        assignment_id: i64,
        status: AssignmentStatus,
    ) -> Result<(), TaskItemError>;

    /// Number of items attached to a task.
    fn count_items(&self, task_id: i64) -> Result<u64, TaskItemError>;
}
