use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
///
/// A single connection is shared behind a mutex; every statement runs
/// while holding it.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path).map_err(|e| SQLError::Connection(e.to_string()))?;

        // WAL lets readers proceed while a write is in flight.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory().map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SQLError> {
        self.conn
            .lock()
            .map_err(|e| SQLError::Connection(format!("connection lock poisoned: {e}")))
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

/// Constraint failures get their own variant so callers can turn them into
/// conflicts; everything else is wrapped by `other`.
fn classify(e: rusqlite::Error, other: fn(String) -> SQLError) -> SQLError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation => {
            SQLError::Constraint(e.to_string())
        }
        _ => other(e.to_string()),
    }
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self.lock()?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let mut columns = Vec::with_capacity(column_names.len());
                for (i, name) in column_names.iter().enumerate() {
                    columns.push((name.clone(), row_value_at(row, i)?));
                }
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
        }
        Ok(result)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self.lock()?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let affected = conn
            .execute(sql, param_refs.as_slice())
            .map_err(|e| classify(e, SQLError::Execution))?;

        Ok(affected as u64)
    }

    fn exec_batch(&self, sql: &str) -> Result<(), SQLError> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| classify(e, SQLError::Execution))
    }
}

/// Extract a Value from a rusqlite row at a given column index, keeping the
/// storage class SQLite reports for that cell.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Value> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "
        CREATE TABLE notes (id TEXT PRIMARY KEY, body TEXT NOT NULL, pinned INTEGER NOT NULL, score REAL);
        CREATE INDEX idx_notes_pinned ON notes(pinned);
    ";

    fn store() -> SqliteStore {
        let s = SqliteStore::open_in_memory().unwrap();
        s.exec_batch(SCHEMA).unwrap();
        s
    }

    #[test]
    fn insert_and_query_types() {
        let s = store();
        let n = s
            .exec(
                "INSERT INTO notes (id, body, pinned, score) VALUES (?1, ?2, ?3, ?4)",
                &[Value::text("n1"), Value::text("hello"), Value::bool(true), Value::Null],
            )
            .unwrap();
        assert_eq!(n, 1);

        let rows = s
            .query("SELECT id, body, pinned, score FROM notes WHERE id = ?1", &[Value::text("n1")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("body"), Some("hello"));
        assert_eq!(rows[0].get_bool("pinned"), Some(true));
        assert_eq!(rows[0].get("score"), Some(&Value::Null));
        assert_eq!(rows[0].get_string("score"), None);
    }

    #[test]
    fn duplicate_key_is_constraint() {
        let s = store();
        let insert = "INSERT INTO notes (id, body, pinned) VALUES (?1, ?2, 0)";
        s.exec(insert, &[Value::text("n1"), Value::text("a")]).unwrap();
        let err = s.exec(insert, &[Value::text("n1"), Value::text("b")]).unwrap_err();
        assert!(err.is_constraint(), "got {err:?}");
    }

    #[test]
    fn delete_missing_affects_nothing() {
        let s = store();
        let n = s.exec("DELETE FROM notes WHERE id = ?1", &[Value::text("nope")]).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn bad_sql_is_query_error() {
        let s = store();
        let err = s.query("SELECT nope FROM notes", &[]).unwrap_err();
        assert!(matches!(err, SQLError::Query(_)));
    }

    #[test]
    fn file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let s = SqliteStore::open(&path).unwrap();
            s.exec_batch(SCHEMA).unwrap();
            s.exec(
                "INSERT INTO notes (id, body, pinned) VALUES ('n1', 'kept', 0)",
                &[],
            )
            .unwrap();
        }
        let s = SqliteStore::open(&path).unwrap();
        let rows = s.query("SELECT body FROM notes", &[]).unwrap();
        assert_eq!(rows[0].get_str("body"), Some("kept"));
    }
}
