//! Task items, their annotations and assignments.

mod sqlite_store;
mod store;
mod types;

pub(crate) use sqlite_store::SCHEMA;
pub use store::{TaskItemError, TaskItemStore};
pub use types::{
    Annotation, AssignmentStatus, ExportSelection, NewAnnotation, NewTaskItem, SelectedItem,
    TaskAssignment, TaskItem, TaskItemStatus,
};
