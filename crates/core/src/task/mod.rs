//! Tasks, their templates and lifecycle.

mod sqlite_store;
mod state;
mod store;
mod types;

pub(crate) use sqlite_store::SCHEMA;
pub use state::TaskStateMachine;
pub use store::{TaskError, TaskStore};
pub use types::{
    AnnotationDefinition, AnnotationOptions, CreateTaskRequest, CreateTemplateRequest,
    LabelDefinition, MediaSourceConfig, SourceOptions, Task, TaskStatus, TaskSummary,
    TaskTemplate, TaskWithCounts, TemplateBody,
};
