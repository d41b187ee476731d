//! SQLite implementation of [`TaskStore`].

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::sqlite::{
    encode_timestamp, json_column, optional_json_column, store_now, timestamp_column, SqliteStore,
};

use super::state::TaskStateMachine;
use super::store::{TaskError, TaskStore};
use super::types::{
    CreateTaskRequest, CreateTemplateRequest, Task, TaskStatus, TaskSummary, TaskTemplate,
    TaskWithCounts,
};

pub(crate) const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS task_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        template TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        status INTEGER NOT NULL,
        task_template_id INTEGER NOT NULL REFERENCES task_templates(id),
        media_source_id INTEGER NOT NULL,
        media_source_config TEXT NOT NULL,
        is_fetch_scheduled INTEGER NOT NULL DEFAULT 0,
        is_export_scheduled INTEGER NOT NULL DEFAULT 0,
        fetch_schedule TEXT,
        export_schedule TEXT,
        created_by INTEGER NOT NULL,
        updated_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id);
    CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
"#;

const TASK_COLUMNS: &str = "id, project_id, name, description, status, task_template_id, media_source_id, media_source_config, is_fetch_scheduled, is_export_scheduled, fetch_schedule, export_schedule, created_by, updated_by, created_at, updated_at";

fn decode_status(row: &Row, idx: usize) -> rusqlite::Result<TaskStatus> {
    let code: i64 = row.get(idx)?;
    TaskStatus::from_code(code).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, code))
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {

    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: decode_status(row, 4)?,
        task_template_id: row.get(5)?,
        media_source_id: row.get(6)?,
        media_source_config: json_column(row, 7)?,
        is_fetch_scheduled: row.get(8)?,
        is_export_scheduled: row.get(9)?,
        fetch_schedule: optional_json_column(row, 10)?,
        export_schedule: optional_json_column(row, 11)?,
        created_by: row.get(12)?,
        updated_by: row.get(13)?,
        created_at: timestamp_column(row, 14)?,
        updated_at: timestamp_column(row, 15)?,
    })
}

fn row_to_template(row: &Row) -> rusqlite::Result<TaskTemplate> {
    Ok(TaskTemplate {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        template: json_column(row, 3)?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, TaskError> {
    serde_json::to_string(value).map_err(|e| TaskError::Serialization(e.to_string()))
}

fn fetch_task(conn: &Connection, id: i64) -> Result<Option<Task>, TaskError> {
    let task = conn
        .query_row(
            &format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS),
            params![id],
            row_to_task,
        )
        .optional()?;
    Ok(task)
}

fn scheduled(conn: &Connection, flag_column: &str) -> Result<Vec<Task>, TaskError> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE {} = 1 AND status != ? ORDER BY id ASC",
        TASK_COLUMNS, flag_column
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![TaskStatus::Deleted.code()], row_to_task)?;

    let mut tasks = Vec::new();
    for row_result in rows {
        let task = row_result?;
        if TaskStateMachine::accepts_scheduled_runs(task.status) {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

impl TaskStore for SqliteStore {
    fn create_template(&self, request: CreateTemplateRequest) -> Result<TaskTemplate, TaskError> {
        let conn = self.conn();
        let template_json = to_json(&request.template)?;

        conn.execute(
            "INSERT INTO task_templates (project_id, name, template) VALUES (?, ?, ?)",
            params![request.project_id, request.name, template_json],
        )?;

        Ok(TaskTemplate {
            id: conn.last_insert_rowid(),
            project_id: request.project_id,
            name: request.name,
            template: request.template,
        })
    }

    fn get_template(&self, id: i64) -> Result<Option<TaskTemplate>, TaskError> {
        let conn = self.conn();
        let template = conn
            .query_row(
                "SELECT id, project_id, name, template FROM task_templates WHERE id = ?",
                params![id],
                row_to_template,
            )
            .optional()?;
        Ok(template)
    }

    fn create_task(&self, request: CreateTaskRequest) -> Result<Task, TaskError> {
        let conn = self.conn();
        let now = store_now();
        let status = TaskStatus::Creating;

        let config_json = to_json(&request.media_source_config)?;
        let fetch_schedule_json = request.fetch_schedule.as_ref().map(to_json).transpose()?;
        let export_schedule_json = request.export_schedule.as_ref().map(to_json).transpose()?;

        conn.execute(
            "INSERT INTO tasks (project_id, name, description, status, task_template_id, media_source_id, media_source_config, is_fetch_scheduled, is_export_scheduled, fetch_schedule, export_schedule, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                request.project_id,
                request.name,
                request.description,
                status.code(),
                request.task_template_id,
                request.media_source_id,
                config_json,
                request.is_fetch_scheduled,
                request.is_export_scheduled,
                fetch_schedule_json,
                export_schedule_json,
                request.created_by,
                encode_timestamp(&now),
                encode_timestamp(&now),
            ],
        )?;

        Ok(Task {
            id: conn.last_insert_rowid(),
            project_id: request.project_id,
            name: request.name,
            description: request.description,
            status,
            task_template_id: request.task_template_id,
            media_source_id: request.media_source_id,
            media_source_config: request.media_source_config,
            is_fetch_scheduled: request.is_fetch_scheduled,
            is_export_scheduled: request.is_export_scheduled,
            fetch_schedule: request.fetch_schedule,
            export_schedule: request.export_schedule,
            created_by: request.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: i64) -> Result<Option<Task>, TaskError> {
        let conn = self.conn();
        fetch_task(&conn, id)
    }

    fn summaries(&self, project_id: i64) -> Result<Vec<TaskSummary>, TaskError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, status FROM tasks WHERE project_id = ? AND status != ? ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![project_id, TaskStatus::Deleted.code()], |row| {
            Ok(TaskSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                status: decode_status(row, 2)?,
            })
        })?;

        let mut summaries = Vec::new();
        for row_result in rows {
            summaries.push(row_result?);
        }
        Ok(summaries)
    }

    fn with_counts(&self, project_id: i64) -> Result<Vec<TaskWithCounts>, TaskError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, t.status,
                   COUNT(ti.id),
                   COALESCE(SUM(CASE WHEN ti.status = 1 THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN ti.id IS NOT NULL AND ti.task_assignment_id IS NULL THEN 1 ELSE 0 END), 0)
            FROM tasks t
            LEFT JOIN task_items ti ON ti.task_id = t.id
            WHERE t.project_id = ? AND t.status != ?
            GROUP BY t.id
            ORDER BY t.id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![project_id, TaskStatus::Deleted.code()], |row| {
            Ok(TaskWithCounts {
                summary: TaskSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    status: decode_status(row, 2)?,
                },
                total: row.get(3)?,
                done: row.get(4)?,
                assignable: row.get(5)?,
            })
        })?;

        let mut tasks = Vec::new();
        for row_result in rows {
            tasks.push(row_result?);
        }
        Ok(tasks)
    }

    fn update_status(&self, id: i64, status: TaskStatus) -> Result<Task, TaskError> {
        let conn = self.conn();
        let current = fetch_task(&conn, id)?.ok_or(TaskError::NotFound(id))?;

        if !TaskStateMachine::is_legal(current.status, status) {
            return Err(TaskError::InvalidTransition {
                task_id: id,
                from: current.status,
                to: status,
            });
        }

        let now = store_now();
        conn.execute(
            "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?",
            params![status.code(), encode_timestamp(&now), id],
        )?;

        Ok(Task {
            status,
            updated_at: now,
            ..current
        })
    }

    fn soft_delete(&self, id: i64, user_id: i64) -> Result<Task, TaskError> {
        let conn = self.conn();
        let current = fetch_task(&conn, id)?.ok_or(TaskError::NotFound(id))?;

        if !TaskStateMachine::is_legal(current.status, TaskStatus::Deleted) {
            return Err(TaskError::InvalidTransition {
                task_id: id,
                from: current.status,
                to: TaskStatus::Deleted,
            });
        }

        let now = store_now();
        conn.execute(
            "UPDATE tasks SET status = ?, updated_by = ?, updated_at = ? WHERE id = ?",
            params![TaskStatus::Deleted.code(), user_id, encode_timestamp(&now), id],
        )?;

        Ok(Task {
            status: TaskStatus::Deleted,
            updated_by: Some(user_id),
            updated_at: now,
            ..current
        })
    }

    fn scheduled_for_fetch(&self) -> Result<Vec<Task>, TaskError> {
        let conn = self.conn();
        scheduled(&conn, "is_fetch_scheduled")
    }

    fn scheduled_for_export(&self) -> Result<Vec<Task>, TaskError> {
        let conn = self.conn();
        scheduled(&conn, "is_export_scheduled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::item::{NewTaskItem, TaskItemStatus, TaskItemStore};
    use crate::media::MediaItemId;
    use crate::task::{MediaSourceConfig, SourceOptions, TemplateBody};

    fn create_test_store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    fn create_template(store: &SqliteStore) -> TaskTemplate {
        store
            .create_template(CreateTemplateRequest {
                project_id: 1,
                name: "boxes".to_string(),
                template: TemplateBody {
                    parser: "native".to_string(),
                    media_extensions: vec!["jpg".to_string()],
                    annotations: vec![],
                },
            })
            .unwrap()
    }

    fn create_test_request(template_id: i64) -> CreateTaskRequest {
        CreateTaskRequest {
            project_id: 1,
            name: "street scenes".to_string(),
            description: Some("label the cars".to_string()),
            task_template_id: template_id,
            media_source_id: 1,
            media_source_config: MediaSourceConfig {
                options: SourceOptions {
                    path: "images/".to_string(),
                    limit: Some(10),
                    exclude_already_used: false,
                },
                conditions: vec![],
            },
            is_fetch_scheduled: false,
            is_export_scheduled: false,
            fetch_schedule: None,
            export_schedule: None,
            created_by: 42,
        }
    }

    #[test]
    fn test_create_and_get_template() {
        let store = create_test_store();
        let template = create_template(&store);

        let fetched = store.get_template(template.id).unwrap().unwrap();
        assert_eq!(fetched, template);
        assert!(store.get_template(999).unwrap().is_none());
    }

    #[test]
    fn test_create_task_starts_creating() {
        let store = create_test_store();
        let template = create_template(&store);

        let task = store.create_task(create_test_request(template.id)).unwrap();
        assert_eq!(task.status, TaskStatus::Creating);

        let fetched = store.get(task.id).unwrap().unwrap();
        assert_eq!(fetched.name, "street scenes");
        assert_eq!(fetched.media_source_config, task.media_source_config);
        assert_eq!(fetched.created_by, 42);
    }

    #[test]
    fn test_schedule_blobs_persist() {
        let store = create_test_store();
        let template = create_template(&store);

        let mut request = create_test_request(template.id);
        request.is_fetch_scheduled = true;
        request.fetch_schedule = Some(serde_json::json!({"cron": "0 3 * * *"}));
        let task = store.create_task(request).unwrap();

        let fetched = store.get(task.id).unwrap().unwrap();
        assert!(fetched.is_fetch_scheduled);
        assert_eq!(fetched.fetch_schedule.unwrap()["cron"], "0 3 * * *");
        assert!(fetched.export_schedule.is_none());
    }

    #[test]
    fn test_update_status_legal_transition() {
        let store = create_test_store();
        let template = create_template(&store);
        let task = store.create_task(create_test_request(template.id)).unwrap();

        let updated = store.update_status(task.id, TaskStatus::Ready).unwrap();
        assert_eq!(updated.status, TaskStatus::Ready);
        assert_eq!(
            store.get(task.id).unwrap().unwrap().status,
            TaskStatus::Ready
        );
    }

    #[test]
    fn test_update_status_rejects_illegal_transition() {
        let store = create_test_store();
        let template = create_template(&store);
        let task = store.create_task(create_test_request(template.id)).unwrap();
        store.update_status(task.id, TaskStatus::Ready).unwrap();

        let result = store.update_status(task.id, TaskStatus::CreatingError);
        assert!(matches!(result, Err(TaskError::InvalidTransition { .. })));
    }

    #[test]
    fn test_update_status_nonexistent_task() {
        let store = create_test_store();
        let result = store.update_status(7, TaskStatus::Ready);
        assert!(matches!(result, Err(TaskError::NotFound(7))));
    }

    #[test]
    fn test_soft_delete_hides_task_from_listings() {
        let store = create_test_store();
        let template = create_template(&store);
        let kept = store.create_task(create_test_request(template.id)).unwrap();
        let deleted = store.create_task(create_test_request(template.id)).unwrap();

        let result = store.soft_delete(deleted.id, 7).unwrap();
        assert_eq!(result.status, TaskStatus::Deleted);
        assert_eq!(result.updated_by, Some(7));

        let summaries = store.summaries(1).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, kept.id);

        // Still reachable by id
        assert_eq!(
            store.get(deleted.id).unwrap().unwrap().status,
            TaskStatus::Deleted
        );
    }

    #[test]
    fn test_cannot_delete_twice() {
        let store = create_test_store();
        let template = create_template(&store);
        let task = store.create_task(create_test_request(template.id)).unwrap();

        store.soft_delete(task.id, 1).unwrap();
        let result = store.soft_delete(task.id, 1);
        assert!(matches!(result, Err(TaskError::InvalidTransition { .. })));
    }

    #[test]
    fn test_with_counts() {
        let store = create_test_store();
        let template = create_template(&store);
        let task = store.create_task(create_test_request(template.id)).unwrap();
        let empty = store.create_task(create_test_request(template.id)).unwrap();

        let mut item_ids = Vec::new();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            let item = store
                .create_item(NewTaskItem {
                    task_id: task.id,
                    media_item_id: MediaItemId::from(name),
                    created_by: 42,
                    annotations: vec![],
                })
                .unwrap();
            item_ids.push(item.id);
        }
        store
            .set_item_status(item_ids[0], TaskItemStatus::Done, Utc::now())
            .unwrap();
        let assignment = store.create_assignment(task.id, 9).unwrap();
        store.assign_items(assignment.id, &item_ids[..2]).unwrap();

        let counts = store.with_counts(1).unwrap();
        assert_eq!(counts.len(), 2);

        assert_eq!(counts[0].summary.id, task.id);
        assert_eq!(counts[0].total, 3);
        assert_eq!(counts[0].done, 1);
        assert_eq!(counts[0].assignable, 1);

        assert_eq!(counts[1].summary.id, empty.id);
        assert_eq!(counts[1].total, 0);
        assert_eq!(counts[1].done, 0);
        assert_eq!(counts[1].assignable, 0);
    }

    #[test]
    fn test_scheduled_for_fetch_skips_deleted_and_uncreated() {
        let store = create_test_store();
        let template = create_template(&store);

        let mut request = create_test_request(template.id);
        request.is_fetch_scheduled = true;
        let ready = store.create_task(request.clone()).unwrap();
        store.update_status(ready.id, TaskStatus::Ready).unwrap();

        let creating = store.create_task(request.clone()).unwrap();
        let deleted = store.create_task(request).unwrap();
        store.update_status(deleted.id, TaskStatus::Ready).unwrap();
        store.soft_delete(deleted.id, 1).unwrap();

        let unscheduled = store.create_task(create_test_request(template.id)).unwrap();
        store.update_status(unscheduled.id, TaskStatus::Ready).unwrap();

        let scheduled: Vec<i64> = store
            .scheduled_for_fetch()
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(scheduled, vec![ready.id]);
        assert!(!scheduled.contains(&creating.id));
        assert!(store.scheduled_for_export().unwrap().is_empty());
    }
}
