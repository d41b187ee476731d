//! Core task and template data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::Condition;

// ============================================================================
// Task status
// ============================================================================

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Deleted,
    UpdatingError,
    CreatingError,
    Creating,
    Updating,
    Hidden,
    Ready,
    Done,
}

impl TaskStatus {
    /// Persisted integer code.
    pub fn code(self) -> i64 {
        match self {
            TaskStatus::Deleted => -100,
            TaskStatus::UpdatingError => -2,
            TaskStatus::CreatingError => -1,
            TaskStatus::Creating => 0,
            TaskStatus::Updating => 1,
            TaskStatus::Hidden => 50,
            TaskStatus::Ready => 100,
            TaskStatus::Done => 500,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -100 => Some(TaskStatus::Deleted),
            -2 => Some(TaskStatus::UpdatingError),
            -1 => Some(TaskStatus::CreatingError),
            0 => Some(TaskStatus::Creating),
            1 => Some(TaskStatus::Updating),
            50 => Some(TaskStatus::Hidden),
            100 => Some(TaskStatus::Ready),
            500 => Some(TaskStatus::Done),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Deleted => "deleted",
            TaskStatus::UpdatingError => "updating_error",
            TaskStatus::CreatingError => "creating_error",
            TaskStatus::Creating => "creating",
            TaskStatus::Updating => "updating",
            TaskStatus::Hidden => "hidden",
            TaskStatus::Ready => "ready",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Media source configuration
// ============================================================================

/// How a task selects items from its media source.
///
/// Persisted as a JSON text column; the field names match that encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaSourceConfig {
    #[serde(default)]
    pub options: SourceOptions,
    /// Source-specific conditions, forwarded untouched.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOptions {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default)]
    pub exclude_already_used: bool,
}

// ============================================================================
// Templates
// ============================================================================

/// Template shared by tasks: codec, accepted media and annotation schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub template: TemplateBody,
}

/// The template document, persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateBody {
    /// Codec kind used to parse and serialize annotations.
    pub parser: String,
    #[serde(default)]
    pub media_extensions: Vec<String>,
    #[serde(default)]
    pub annotations: Vec<AnnotationDefinition>,
}

impl TemplateBody {
    /// Annotation kinds that must be synthesized for every open task item.
    pub fn auto_create_definitions(&self) -> impl Iterator<Item = &AnnotationDefinition> {
        self.annotations.iter().filter(|d| d.options.auto_create)
    }
}

/// Declares one kind of annotation a task item carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDefinition {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<LabelDefinition>,
    #[serde(default)]
    pub options: AnnotationOptions,
    /// Fields meaningful only to the annotation UI.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AnnotationDefinition {
    /// Default label set for a synthesized annotation: each label name mapped
    /// to its declared default, or null.
    pub fn default_labels(&self) -> serde_json::Value {
        let labels = self
            .labels
            .iter()
            .map(|label| {
                (
                    label.name.clone(),
                    label.default_value.clone().unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();
        serde_json::Value::Object(labels)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationOptions {
    #[serde(default)]
    pub auto_create: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDefinition {
    pub name: String,
    #[serde(rename = "default", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Request to create a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub project_id: i64,
    pub name: String,
    pub template: TemplateBody,
}

// ============================================================================
// Tasks
// ============================================================================

/// A unit of annotation work bound to a media source and a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub task_template_id: i64,
    pub media_source_id: i64,
    pub media_source_config: MediaSourceConfig,
    pub is_fetch_scheduled: bool,
    pub is_export_scheduled: bool,
    /// Opaque to the pipeline; interpreted by the scheduler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_schedule: Option<serde_json::Value>,
    /// Opaque to the pipeline; interpreted by the scheduler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_schedule: Option<serde_json::Value>,
    pub created_by: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new task. Tasks start in `Creating`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub project_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub task_template_id: i64,
    pub media_source_id: i64,
    #[serde(default)]
    pub media_source_config: MediaSourceConfig,
    #[serde(default)]
    pub is_fetch_scheduled: bool,
    #[serde(default)]
    pub is_export_scheduled: bool,
    #[serde(default)]
    pub fetch_schedule: Option<serde_json::Value>,
    #[serde(default)]
    pub export_schedule: Option<serde_json::Value>,
    pub created_by: i64,
}

/// Reference view of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: i64,
    pub name: String,
    pub status: TaskStatus,
}

/// A task with aggregate item counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskWithCounts {
    #[serde(flatten)]
    pub summary: TaskSummary,
    /// All task items.
    pub total: u64,
    /// Items with status done.
    pub done: u64,
    /// Items not yet bound to an assignment.
    pub assignable: u64,
}
