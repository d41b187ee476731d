//! Task lifecycle rules.
//!
//! Ingestion drives `Creating -> {Ready, CreatingError}`. The refresh cycle
//! (`Ready <-> Updating -> {Ready, UpdatingError}`) and the moves between
//! `Ready`, `Hidden` and `Done` are made by callers outside the pipeline.
//! `Deleted` is reachable from every other state and is terminal.

use super::types::TaskStatus;

/// Transition rules for [`TaskStatus`].
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Status a task moves to once an ingestion run has finished.
    ///
    /// Only first runs change status. A refresh leaves it alone whatever the
    /// outcome, so a failing refresh never regresses a task annotators are
    /// working on.
    pub fn after_ingestion(prior: TaskStatus, refresh: bool, succeeded: bool) -> Option<TaskStatus> {
        if refresh || prior == TaskStatus::Deleted {
            return None;
        }
        if succeeded {
            Some(TaskStatus::Ready)
        } else {
            Some(TaskStatus::CreatingError)
        }
    }

    /// Whether `from -> to` is a legal transition.
    pub fn is_legal(from: TaskStatus, to: TaskStatus) -> bool {
        use TaskStatus::*;

        if from == Deleted {
            return false;
        }
        if to == Deleted {
            return true;
        }

        matches!(
            (from, to),
            (Creating, Ready)
                | (Creating, CreatingError)
                | (CreatingError, Creating)
                | (Ready, Updating)
                | (Updating, Ready)
                | (Updating, UpdatingError)
                | (UpdatingError, Updating)
                | (UpdatingError, Ready)
                | (Ready, Hidden)
                | (Ready, Done)
                | (Hidden, Ready)
                | (Hidden, Done)
                | (Done, Ready)
                | (Done, Hidden)
        )
    }

    /// Whether annotators may still work on the task.
    pub fn can_be_annotated(status: TaskStatus) -> bool {
        !matches!(
            status,
            TaskStatus::Deleted | TaskStatus::CreatingError | TaskStatus::Done
        )
    }

    /// Whether scheduled refreshes and exports may pick the task up.
    pub fn accepts_scheduled_runs(status: TaskStatus) -> bool {
        !matches!(
            status,
            TaskStatus::Deleted | TaskStatus::Creating | TaskStatus::CreatingError
        )
    }
}
