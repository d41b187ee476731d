//! SQLite implementation of [`TaskItemStore`].

use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Row};

use crate::media::MediaItemId;
use crate::sqlite::{
    encode_timestamp, json_column, optional_json_column, store_now, timestamp_column, SqliteStore,
    TIMESTAMP_SUBSEC_DIGITS,
};
use crate::task::TaskStatus;

use super::store::{TaskItemError, TaskItemStore};
use super::types::{
    Annotation, AssignmentStatus, ExportSelection, NewAnnotation, NewTaskItem, SelectedItem,
    TaskAssignment, TaskItem, TaskItemStatus,
};

pub(crate) const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS task_assignments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id INTEGER NOT NULL REFERENCES tasks(id),
        assigned_to INTEGER NOT NULL,
        status INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS task_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id INTEGER NOT NULL REFERENCES tasks(id),
        media_item_id TEXT NOT NULL,
        status INTEGER NOT NULL,
        task_assignment_id INTEGER REFERENCES task_assignments(id),
        created_by INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_task_items_task_media ON task_items(task_id, media_item_id);
    CREATE INDEX IF NOT EXISTS idx_task_items_updated_at ON task_items(updated_at);

    CREATE TABLE IF NOT EXISTS annotations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        task_item_id INTEGER NOT NULL REFERENCES task_items(id),
        labels_name TEXT NOT NULL,
        labels TEXT NOT NULL,
        boundaries TEXT,
        status INTEGER NOT NULL DEFAULT 0,
        created_by INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_annotations_item ON annotations(task_item_id, labels_name);
"#;

const ITEM_COLUMNS: &str = "ti.id, ti.task_id, ti.media_item_id, ti.status, ti.task_assignment_id, ti.created_by, ti.created_at, ti.updated_at";

const ANNOTATION_COLUMNS: &str =
    "id, task_item_id, labels_name, labels, boundaries, status, created_by";

fn row_to_item(row: &Row) -> rusqlite::Result<TaskItem> {
    let media_item_id: String = row.get(2)?;
    let status_code: i64 = row.get(3)?;

    Ok(TaskItem {
        id: row.get(0)?,
        task_id: row.get(1)?,
        media_item_id: MediaItemId(media_item_id),
        status: TaskItemStatus::from_code(status_code)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, status_code))?,
        task_assignment_id: row.get(4)?,
        created_by: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        updated_at: timestamp_column(row, 7)?,
    })
}

fn row_to_annotation(row: &Row) -> rusqlite::Result<Annotation> {
    Ok(Annotation {
        id: row.get(0)?,
        task_item_id: row.get(1)?,
        labels_name: row.get(2)?,
        labels: json_column(row, 3)?,
        boundaries: optional_json_column(row, 4)?,
        status: row.get(5)?,
        created_by: row.get(6)?,
    })
}

fn to_json(value: &serde_json::Value) -> Result<String, TaskItemError> {
    serde_json::to_string(value).map_err(|e| TaskItemError::Serialization(e.to_string()))
}

fn insert_annotation(
    conn: &rusqlite::Connection,
    task_item_id: i64,
    annotation: &NewAnnotation,
    now: &DateTime<Utc>,
) -> Result<i64, TaskItemError> {
    let labels_json = to_json(&annotation.labels)?;
    let boundaries_json = annotation.boundaries.as_ref().map(to_json).transpose()?;

    conn.execute(
        "INSERT INTO annotations (task_item_id, labels_name, labels, boundaries, status, created_by, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            task_item_id,
            annotation.labels_name,
            labels_json,
            boundaries_json,
            annotation.status,
            annotation.created_by,
            encode_timestamp(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl TaskItemStore for SqliteStore {
    fn media_item_ids(&self, task_id: i64) -> Result<HashSet<MediaItemId>, TaskItemError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT media_item_id FROM task_items WHERE task_id = ?")?;
        let rows = stmt.query_map(params![task_id], |row| row.get::<_, String>(0))?;

        let mut ids = HashSet::new();
        for row_result in rows {
            ids.insert(MediaItemId(row_result?));
        }
        Ok(ids)
    }

    fn used_media_item_ids(
        &self,
        template_id: i64,
    ) -> Result<HashSet<MediaItemId>, TaskItemError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT ti.media_item_id
            FROM task_items ti
            JOIN tasks t ON t.id = ti.task_id
            WHERE t.task_template_id = ? AND t.status != ?
            "#,
        )?;
        let rows = stmt.query_map(params![template_id, TaskStatus::Deleted.code()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut ids = HashSet::new();
        for row_result in rows {
            ids.insert(MediaItemId(row_result?));
        }
        Ok(ids)
    }

    fn create_item(&self, item: NewTaskItem) -> Result<TaskItem, TaskItemError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = store_now();
        let status = TaskItemStatus::NotDone;

        tx.execute(
            "INSERT INTO task_items (task_id, media_item_id, status, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                item.task_id,
                item.media_item_id.as_str(),
                status.code(),
                item.created_by,
                encode_timestamp(&now),
                encode_timestamp(&now),
            ],
        )?;
        let item_id = tx.last_insert_rowid();

        for annotation in &item.annotations {
            insert_annotation(&tx, item_id, annotation, &now)?;
        }
        tx.commit()?;

        Ok(TaskItem {
            id: item_id,
            task_id: item.task_id,
            media_item_id: item.media_item_id,
            status,
            task_assignment_id: None,
            created_by: item.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    fn items_missing_annotation(
        &self,
        task_id: i64,
        labels_name: &str,
    ) -> Result<Vec<TaskItem>, TaskItemError> {
        let conn = self.conn();
        let sql = format!(
            r#"
            SELECT {}
            FROM task_items ti
            WHERE ti.task_id = ? AND ti.status = ?
              AND NOT EXISTS (
                  SELECT 1 FROM annotations a
                  WHERE a.task_item_id = ti.id AND a.labels_name = ?
              )
            ORDER BY ti.id ASC
            "#,
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![task_id, TaskItemStatus::NotDone.code(), labels_name],
            row_to_item,
        )?;

        let mut items = Vec::new();
        for row_result in rows {
            items.push(row_result?);
        }
        Ok(items)
    }

    fn create_annotation(
        &self,
        task_item_id: i64,
        annotation: NewAnnotation,
    ) -> Result<Annotation, TaskItemError> {
        let conn = self.conn();
        let id = insert_annotation(&conn, task_item_id, &annotation, &store_now())?;

        Ok(Annotation {
            id,
            task_item_id,
            labels_name: annotation.labels_name,
            labels: annotation.labels,
            boundaries: annotation.boundaries,
            status: annotation.status,
            created_by: annotation.created_by,
        })
    }

    fn select_for_export(
        &self,
        task_id: i64,
        selection: &ExportSelection,
    ) -> Result<Vec<SelectedItem>, TaskItemError> {
        let conn = self.conn();

        let mut sql = format!("SELECT {} FROM task_items ti", ITEM_COLUMNS);
        if !selection.include_ongoing {
            sql.push_str(" JOIN task_assignments ta ON ta.id = ti.task_assignment_id");
        }
        sql.push_str(" WHERE ti.task_id = ? AND ti.status = ?");

        let mut values: Vec<Box<dyn ToSql>> =
            vec![Box::new(task_id), Box::new(TaskItemStatus::Done.code())];
        if let Some(from) = &selection.from {
            sql.push_str(" AND ti.updated_at > ?");
            values.push(Box::new(encode_timestamp(from)));
        }
        if let Some(to) = &selection.to {
            sql.push_str(" AND ti.updated_at <= ?");
            values.push(Box::new(encode_timestamp(to)));
        }
        if !selection.include_ongoing {
            sql.push_str(" AND ta.status = ?");
            values.push(Box::new(AssignmentStatus::Done.code()));
        }
        sql.push_str(" ORDER BY ti.id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_item)?;
        let mut items = Vec::new();
        for row_result in rows {
            items.push(row_result?);
        }

        let mut annotation_stmt = conn.prepare(&format!(
            "SELECT {} FROM annotations WHERE task_item_id = ? ORDER BY id ASC",
            ANNOTATION_COLUMNS
        ))?;

        let mut selected = Vec::with_capacity(items.len());
        for item in items {
            let rows = annotation_stmt.query_map(params![item.id], row_to_annotation)?;
            let mut annotations = Vec::new();
            for row_result in rows {
                annotations.push(row_result?);
            }
            selected.push(SelectedItem { item, annotations });
        }
        Ok(selected)
    }

    fn set_item_status(
        &self,
        item_id: i64,
        status: TaskItemStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TaskItemError> {
        let conn = self.conn();
        let rows_affected = conn.execute(
            "UPDATE task_items SET status = ?, updated_at = ? WHERE id = ?",
            params![
                status.code(),
                encode_timestamp(&at.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS)),
                item_id
            ],
        )?;
        if rows_affected == 0 {
            return Err(TaskItemError::NotFound(item_id));
        }
        Ok(())
    }

    fn create_assignment(
        &self,
        task_id: i64,
        assigned_to: i64,
    ) -> Result<TaskAssignment, TaskItemError> {
        let conn = self.conn();
        let now = store_now();
        let status = AssignmentStatus::Ongoing;

        conn.execute(
            "INSERT INTO task_assignments (task_id, assigned_to, status, created_at) VALUES (?, ?, ?, ?)",
            params![task_id, assigned_to, status.code(), encode_timestamp(&now)],
        )?;

        Ok(TaskAssignment {
            id: conn.last_insert_rowid(),
            task_id,
            assigned_to,
            status,
            created_at: now,
        })
    }

    fn assign_items(&self, assignment_id: i64, item_ids: &[i64]) -> Result<(), TaskItemError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM task_assignments WHERE id = ?)",
            params![assignment_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(TaskItemError::AssignmentNotFound(assignment_id));
        }

        for item_id in item_ids {
            let rows_affected = tx.execute(
                "UPDATE task_items SET task_assignment_id = ? WHERE id = ?",
                params![assignment_id, item_id],
            )?;
            if rows_affected == 0 {
                return Err(TaskItemError::NotFound(*item_id));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn set_assignment_status(
        &self,
        assignment_id: i64,
        status: AssignmentStatus,
    ) -> Result<(), TaskItemError> {
        let conn = self.conn();
        let rows_affected = conn.execute(
            "UPDATE task_assignments SET status = ? WHERE id = ?",
            params![status.code(), assignment_id],
        )?;
        if rows_affected == 0 {
            return Err(TaskItemError::AssignmentNotFound(assignment_id));
        }
        Ok(())
    }

    fn count_items(&self, task_id: i64) -> Result<u64, TaskItemError> {
        let conn = self.conn();
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM task_items WHERE task_id = ?",
            params![task_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
