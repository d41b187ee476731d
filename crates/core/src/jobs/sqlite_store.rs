//! SQLite implementation of [`JobStore`].

use rusqlite::{params, Row};

use crate::sqlite::{encode_timestamp, json_column, store_now, timestamp_column, SqliteStore};

use super::store::{JobError, JobStore, LAST_JOBS_LIMIT};
use super::types::{JobKind, JobRecord, JobStatus, NewJobRecord};

pub(crate) const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        seq INTEGER NOT NULL,
        project_id INTEGER NOT NULL,
        task_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        status TEXT NOT NULL,
        result TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_jobs_task_kind ON jobs(task_id, kind, seq);
"#;

fn row_to_job(row: &Row) -> rusqlite::Result<JobRecord> {
    let kind: String = row.get(3)?;
    let status: String = row.get(4)?;

    Ok(JobRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        task_id: row.get(2)?,
        kind: kind.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
        })?,
        status: JobStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown job status: {}", status).into(),
            )
        })?,
        result: json_column(row, 5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

impl JobStore for SqliteStore {
    fn record(&self, job: NewJobRecord) -> Result<JobRecord, JobError> {
        let conn = self.conn();
        let id = uuid::Uuid::new_v4().to_string();
        let now = store_now();
        let result_json =
            serde_json::to_string(&job.result).map_err(|e| JobError::Serialization(e.to_string()))?;

        // Insertion sequence gives a stable newest-first order for equal timestamps
        conn.execute(
            "INSERT INTO jobs (id, seq, project_id, task_id, kind, status, result, created_at) VALUES (?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM jobs), ?, ?, ?, ?, ?, ?)",
            params![
                id,
                job.project_id,
                job.task_id,
                job.kind.as_str(),
                job.status.as_str(),
                result_json,
                encode_timestamp(&now),
            ],
        )?;

        Ok(JobRecord {
            id,
            project_id: job.project_id,
            task_id: job.task_id,
            kind: job.kind,
            status: job.status,
            result: job.result,
            created_at: now,
        })
    }

    fn last_jobs(&self, task_id: i64, kind: JobKind) -> Result<Vec<JobRecord>, JobError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, project_id, task_id, kind, status, result, created_at FROM jobs WHERE task_id = ? AND kind = ? ORDER BY seq DESC LIMIT ?",
        )?;
        let rows = stmt.query_map(
            params![task_id, kind.as_str(), LAST_JOBS_LIMIT as i64],
            row_to_job,
        )?;

        let mut jobs = Vec::new();
        for row_result in rows {
            jobs.push(row_result?);
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fetch_job(task_id: i64, added: u64) -> NewJobRecord {
        NewJobRecord {
            project_id: 1,
            task_id,
            kind: JobKind::Fetch,
            status: JobStatus::Done,
            result: json!({ "added": added }),
        }
    }

    #[test]
    fn test_record_and_list() {
        let store = SqliteStore::in_memory().unwrap();

        let recorded = store.record(fetch_job(3, 5)).unwrap();
        assert_eq!(recorded.id.len(), 36);

        let jobs = store.last_jobs(3, JobKind::Fetch).unwrap();
        assert_eq!(jobs, vec![recorded]);
        assert!(store.last_jobs(3, JobKind::Export).unwrap().is_empty());
        assert!(store.last_jobs(4, JobKind::Fetch).unwrap().is_empty());
    }

    #[test]
    fn test_last_jobs_newest_first_and_capped() {
        let store = SqliteStore::in_memory().unwrap();
        for added in 0..12 {
            store.record(fetch_job(3, added)).unwrap();
        }

        let jobs = store.last_jobs(3, JobKind::Fetch).unwrap();
        assert_eq!(jobs.len(), LAST_JOBS_LIMIT);
        assert_eq!(jobs[0].result["added"], 11);
        assert_eq!(jobs[9].result["added"], 2);
    }

    #[test]
    fn test_error_jobs_keep_message() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .record(NewJobRecord {
                project_id: 1,
                task_id: 3,
                kind: JobKind::Export,
                status: JobStatus::Error,
                result: json!({ "error": "codec exploded" }),
            })
            .unwrap();

        let jobs = store.last_jobs(3, JobKind::Export).unwrap();
        assert_eq!(jobs[0].status, JobStatus::Error);
        assert_eq!(jobs[0].result["error"], "codec exploded");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("fetch".parse::<JobKind>(), Ok(JobKind::Fetch));
        assert!("import".parse::<JobKind>().is_err());
    }
}
