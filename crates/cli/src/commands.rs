use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use nota_core::{
    CreateTaskRequest, CreateTemplateRequest, ExportError, ExportOptions, ExportResult, JobKind,
    JobStatus, NewJobRecord, RunOutcome, Task, TaskStateMachine, TaskStatus,
};

use crate::args::Command;
use crate::state::AppState;

pub async fn execute(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::CreateTemplate { file } => create_template(state, &file),
        Command::CreateTask { file } => create_task(state, &file),
        Command::Ingest { task, refresh } => ingest(state, task, refresh).await,
        Command::Export {
            task,
            from,
            to,
            completed_assignments_only,
            name,
        } => {
            let options = ExportOptions {
                from,
                to,
                include_ongoing: !completed_assignments_only,
                name,
            };
            export(state, task, options).await
        }
        Command::Tasks { project } => {
            let tasks = state
                .tasks()
                .with_counts(project)
                .context("Failed to list tasks")?;
            print_json(&tasks)
        }
        Command::Jobs { task, kind } => {
            let jobs = state
                .jobs()
                .last_jobs(task, kind.into())
                .context("Failed to list jobs")?;
            print_json(&jobs)
        }
        Command::RunScheduled => {
            let run = run_scheduled(state).await?;
            print_json(&run)?;
            if run.failed > 0 {
                bail!("{} scheduled run(s) failed", run.failed);
            }
            Ok(())
        }
        Command::Delete { task, user } => {
            let task = state
                .tasks()
                .soft_delete(task, user)
                .with_context(|| format!("Failed to delete task {}", task))?;
            info!("Task {} deleted by user {}", task.id, user);
            print_json(&task)
        }
    }
}

fn read_request<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {:?}", file))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {:?}", file))
}

fn create_template(state: &AppState, file: &Path) -> Result<()> {
    let request: CreateTemplateRequest = read_request(file)?;
    let template = state
        .tasks()
        .create_template(request)
        .context("Failed to create template")?;
    info!("Created template {} ({})", template.id, template.name);
    print_json(&template)
}

fn create_task(state: &AppState, file: &Path) -> Result<()> {
    let request: CreateTaskRequest = read_request(file)?;
    if state
        .tasks()
        .get_template(request.task_template_id)
        .context("Failed to look up template")?
        .is_none()
    {
        bail!("Task template {} does not exist", request.task_template_id);
    }

    let task = state
        .tasks()
        .create_task(request)
        .context("Failed to create task")?;
    info!("Created task {} ({})", task.id, task.name);
    print_json(&task)
}

fn load_task(state: &AppState, task_id: i64) -> Result<Task> {
    state
        .tasks()
        .get(task_id)
        .context("Failed to load task")?
        .ok_or_else(|| anyhow!("Task {} not found", task_id))
}

async fn ingest(state: &AppState, task_id: i64, refresh: bool) -> Result<()> {
    let task = load_task(state, task_id)?;
    let outcome = run_ingestion(state, task, refresh).await?;

    match outcome {
        RunOutcome::Completed(result) => print_json(&json!({
            "added": result.added,
            "autoCreated": result.auto_created,
        })),
        RunOutcome::Failed(e) => Err(e).with_context(|| format!("Ingestion of task {} failed", task_id)),
    }
}

/// Runs one ingestion and records it as a fetch job.
///
/// A refresh of a `Ready` (or `UpdatingError`) task is bracketed by
/// `Updating`, then `Ready` or `UpdatingError` depending on the outcome.
async fn run_ingestion(state: &AppState, task: Task, refresh: bool) -> Result<RunOutcome> {
    let cycle = refresh && TaskStateMachine::is_legal(task.status, TaskStatus::Updating);
    let task = if cycle {
        state
            .tasks()
            .update_status(task.id, TaskStatus::Updating)
            .with_context(|| format!("Failed to mark task {} as updating", task.id))?
    } else {
        task
    };

    let outcome = state.ingestion_engine().run(&task, refresh).await;

    if cycle {
        let next = if outcome.is_failed() {
            TaskStatus::UpdatingError
        } else {
            TaskStatus::Ready
        };
        if let Err(e) = state.tasks().update_status(task.id, next) {
            warn!("Failed to move task {} to {}: {}", task.id, next, e);
        }
    }

    let (status, result) = match &outcome {
        RunOutcome::Completed(result) => (
            JobStatus::Done,
            json!({ "added": result.added, "autoCreated": result.auto_created }),
        ),
        RunOutcome::Failed(e) => (JobStatus::Error, json!({ "error": e.to_string() })),
    };
    record_job(state, &task, JobKind::Fetch, status, result);

    Ok(outcome)
}

async fn export(state: &AppState, task_id: i64, options: ExportOptions) -> Result<()> {
    let task = load_task(state, task_id)?;
    let result = run_export(state, &task, options)
        .await
        .with_context(|| format!("Export of task {} failed", task.id))?;
    print_json(&result)
}

/// Runs one export and records it as an export job.
async fn run_export(
    state: &AppState,
    task: &Task,
    options: ExportOptions,
) -> Result<ExportResult, ExportError> {
    let run = state.export_engine().run(task, options).await;

    let (status, result) = match &run {
        Ok(result) => (
            JobStatus::Done,
            json!({ "count": result.count, "file": result.file }),
        ),
        Err(e) => (JobStatus::Error, json!({ "error": e.to_string() })),
    };
    record_job(state, task, JobKind::Export, status, result);

    run
}

/// Tallies of one `run-scheduled` pass.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRun {
    pub fetched: u64,
    pub exported: u64,
    pub failed: u64,
}

/// Refreshes every fetch-scheduled task, then exports every
/// export-scheduled task. Deleted and not yet created tasks are never
/// picked up. A failing task does not stop the pass.
async fn run_scheduled(state: &AppState) -> Result<ScheduledRun> {
    let mut run = ScheduledRun::default();

    let fetch = state
        .tasks()
        .scheduled_for_fetch()
        .context("Failed to list fetch-scheduled tasks")?;
    info!("{} task(s) scheduled for fetch", fetch.len());
    for task in fetch {
        let task_id = task.id;
        match run_ingestion(state, task, true).await {
            Ok(outcome) if !outcome.is_failed() => run.fetched += 1,
            Ok(_) => run.failed += 1,
            Err(e) => {
                warn!("Scheduled fetch of task {} failed: {:#}", task_id, e);
                run.failed += 1;
            }
        }
    }

    let export = state
        .tasks()
        .scheduled_for_export()
        .context("Failed to list export-scheduled tasks")?;
    info!("{} task(s) scheduled for export", export.len());
    for task in export {
        match run_export(state, &task, ExportOptions::default()).await {
            Ok(_) => run.exported += 1,
            Err(e) => {
                warn!("Scheduled export of task {} failed: {}", task.id, e);
                run.failed += 1;
            }
        }
    }

    Ok(run)
}

/// Job records are bookkeeping; failing to write one does not fail the run.
fn record_job(
    state: &AppState,
    task: &Task,
    kind: JobKind,
    status: JobStatus,
    result: serde_json::Value,
) {
    let job = NewJobRecord {
        project_id: task.project_id,
        task_id: task.id,
        kind,
        status,
        result,
    };
    if let Err(e) = state.jobs().record(job) {
        warn!("Failed to record {} job for task {}: {}", kind, task.id, e);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", output);
    Ok(())
}
