//! Shared SQLite handle backing the task, task item and job stores.
//!
//! Each domain module implements its store trait for [`SqliteStore`] in its
//! own `sqlite_store.rs` and contributes its tables to the schema here, so
//! that joins across tasks, items and annotations run on one connection.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;

/// SQLite-backed implementation of every persistence trait in the crate.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SQLite store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(crate::task::SCHEMA)?;
        conn.execute_batch(crate::item::SCHEMA)?;
        conn.execute_batch(crate::jobs::SCHEMA)?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

/// Sub-second digits kept by [`encode_timestamp`].
pub(crate) const TIMESTAMP_SUBSEC_DIGITS: u16 = 6;

/// Current time at the precision timestamps are stored with.
pub(crate) fn store_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS)
}

/// Fixed-width UTC encoding so that text comparison in SQL orders correctly.
pub(crate) fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decodes a timestamp column written by [`encode_timestamp`].
pub(crate) fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decodes a JSON text column, surfacing malformed JSON as a conversion error.
pub(crate) fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Nullable variant of [`json_column`].
pub(crate) fn optional_json_column<T: DeserializeOwned>(
    row: &Row,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_encoding_orders_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert!(encode_timestamp(&earlier) < encode_timestamp(&later));
    }

    #[test]
    fn test_timestamp_column_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap();
        let decoded = conn
            .query_row("SELECT ?1", [encode_timestamp(&at)], |row| {
                timestamp_column(row, 0)
            })
            .unwrap();
        assert_eq!(decoded, at);
    }

    #[test]
    fn test_timestamp_column_rejects_corrupt_text() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 'yesterday-ish'", [], |row| timestamp_column(row, 0));
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(0, Type::Text, _))
        ));
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nota.db");

        SqliteStore::new(&db_path).unwrap();
        assert!(db_path.exists());

        // Reopening must not fail on existing tables
        SqliteStore::new(&db_path).unwrap();
    }
}
