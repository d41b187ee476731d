//! Task storage trait and error type.

use thiserror::Error;

use super::types::{
    CreateTaskRequest, CreateTemplateRequest, Task, TaskStatus, TaskSummary, TaskTemplate,
    TaskWithCounts,
};

/// Error type for task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task not found.
    #[error("Task not found: {0}")]
    NotFound(i64),

    /// Template not found.
    #[error("Task template not found: {0}")]
    TemplateNotFound(i64),

    /// The requested status change is not allowed from the current status.
    #[error("Cannot move task {task_id} from {from} to {to}")]
    InvalidTransition {
        task_id: i64,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for TaskError {
    fn from(e: rusqlite::Error) -> Self {
        TaskError::Database(e.to_string())
    }
}

/// Trait for task and template storage backends.
///
/// Listing methods exclude deleted tasks; `get` does not, so callers can
/// still inspect a deleted task by id.
pub trait TaskStore: Send + Sync {
    /// Create a template.
    fn create_template(&self, request: CreateTemplateRequest) -> Result<TaskTemplate, TaskError>;

    /// Get a template by ID.
    fn get_template(&self, id: i64) -> Result<Option<TaskTemplate>, TaskError>;

    /// Create a task in `Creating` status.
    fn create_task(&self, request: CreateTaskRequest) -> Result<Task, TaskError>;

    /// Get a task by ID, including deleted tasks.
    fn get(&self, id: i64) -> Result<Option<Task>, TaskError>;

    /// Reference views of a project's tasks.
    fn summaries(&self, project_id: i64) -> Result<Vec<TaskSummary>, TaskError>;

    /// A project's tasks with aggregate item counts.
    fn with_counts(&self, project_id: i64) -> Result<Vec<TaskWithCounts>, TaskError>;

    /// Update a task's status, rejecting illegal transitions.
    fn update_status(&self, id: i64, status: TaskStatus) -> Result<Task, TaskError>;

    /// Mark a task deleted on behalf of a user.
    fn soft_delete(&self, id: i64, user_id: i64) -> Result<Task, TaskError>;

    /// Tasks flagged for scheduled fetching that accept scheduled runs.
    fn scheduled_for_fetch(&self) -> Result<Vec<Task>, TaskError>;

    /// Tasks flagged for scheduled export that accept scheduled runs.
    fn scheduled_for_export(&self) -> Result<Vec<Task>, TaskError>;
}
