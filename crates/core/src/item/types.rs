//! Task item, annotation and assignment types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::MediaItemId;

/// Annotation progress of a task item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskItemStatus {
    NotDone,
    Done,
}

impl TaskItemStatus {
    pub fn code(self) -> i64 {
        match self {
            TaskItemStatus::NotDone => 0,
            TaskItemStatus::Done => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TaskItemStatus::NotDone),
            1 => Some(TaskItemStatus::Done),
            _ => None,
        }
    }
}

/// Status of a task assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Error,
    Ongoing,
    Done,
}

impl AssignmentStatus {
    pub fn code(self) -> i64 {
        match self {
            AssignmentStatus::Error => -1,
            AssignmentStatus::Ongoing => 0,
            AssignmentStatus::Done => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(AssignmentStatus::Error),
            0 => Some(AssignmentStatus::Ongoing),
            1 => Some(AssignmentStatus::Done),
            _ => None,
        }
    }
}

/// One media item's annotation record within a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: i64,
    pub task_id: i64,
    /// Referenced, never copied, from the media source.
    pub media_item_id: MediaItemId,
    pub status: TaskItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_assignment_id: Option<i64>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A labeled region or attribute attached to a task item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: i64,
    pub task_item_id: i64,
    pub labels_name: String,
    pub labels: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<serde_json::Value>,
    pub status: i64,
    pub created_by: i64,
}

/// An annotation to be attached to a task item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    pub labels_name: String,
    pub labels: serde_json::Value,
    pub boundaries: Option<serde_json::Value>,
    pub status: i64,
    pub created_by: i64,
}

/// A task item to create, together with its imported annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTaskItem {
    pub task_id: i64,
    pub media_item_id: MediaItemId,
    pub created_by: i64,
    pub annotations: Vec<NewAnnotation>,
}

/// A group of task items handed to one annotator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub id: i64,
    pub task_id: i64,
    pub assigned_to: i64,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Filters applied when selecting done items for export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSelection {
    /// Exclusive lower bound on `updated_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `updated_at`.
    pub to: Option<DateTime<Utc>>,
    /// When false, only items whose assignment is done are selected.
    pub include_ongoing: bool,
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            include_ongoing: true,
        }
    }
}

/// A done task item with its annotations, in export order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    pub item: TaskItem,
    pub annotations: Vec<Annotation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TaskItemStatus::from_code(0), Some(TaskItemStatus::NotDone));
        assert_eq!(TaskItemStatus::from_code(1), Some(TaskItemStatus::Done));
        assert_eq!(TaskItemStatus::from_code(2), None);
        assert_eq!(AssignmentStatus::Error.code(), -1);
        assert_eq!(AssignmentStatus::from_code(1), Some(AssignmentStatus::Done));
    }

    #[test]
    fn test_annotation_serializes_camel_case() {
        let annotation = Annotation {
            id: 1,
            task_item_id: 2,
            labels_name: "bbox".to_string(),
            labels: serde_json::json!({"class": "car"}),
            boundaries: None,
            status: 0,
            created_by: 3,
        };
        let json = serde_json::to_value(&annotation).unwrap();
        assert_eq!(json["labelsName"], "bbox");
        assert_eq!(json["taskItemId"], 2);
        assert!(json.get("boundaries").is_none());
    }

    #[test]
    fn test_default_selection_includes_ongoing() {
        let selection = ExportSelection::default();
        assert!(selection.include_ongoing);
        assert!(selection.from.is_none());
    }
}
