//! Per-project key-value metadata.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{Store, StoreError, StoreResult};

/// A metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Entry id.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Key, unique within the project.
    pub key: String,
    /// Value.
    pub value: String,
}

const COLUMNS: &str = "id, project_id, key, value";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Metadata> {
    Ok(Metadata {
        id: row.get(0)?,
        project_id: row.get(1)?,
        key: row.get(2)?,
        value: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}

fn lookup(conn: &Connection, project_id: i64, key: &str) -> StoreResult<Option<Metadata>> {
    let entry = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM metadata WHERE project_id = ?1 AND key = ?2"
            ),
            params![project_id, key],
            from_row,
        )
        .optional()?;
    Ok(entry)
}

impl Store {
    /// Sets `key` to `value` in `project_id`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn set_metadata(&self, project_id: i64, key: &str, value: &str) -> StoreResult<Metadata> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO metadata (project_id, key, value) VALUES (?1, ?2, ?3) \
             ON CONFLICT(project_id, key) DO UPDATE SET value = excluded.value",
            params![project_id, key, value],
        )?;
        lookup(&conn, project_id, key)?
            .ok_or_else(|| StoreError::not_found_key("metadata key", key))
    }

    /// Gets the entry for `key`, if set.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn metadata(&self, project_id: i64, key: &str) -> StoreResult<Option<Metadata>> {
        let conn = self.conn.lock();
        lookup(&conn, project_id, key)
    }

    /// Lists all entries of `project_id`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_metadata(&self, project_id: i64) -> StoreResult<Vec<Metadata>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM metadata WHERE project_id = ?1 ORDER BY key"
        ))?;
        let entries = stmt
            .query_map(params![project_id], from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Removes `key` from `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the key is not set.
    pub fn delete_metadata(&self, project_id: i64, key: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM metadata WHERE project_id = ?1 AND key = ?2",
            params![project_id, key],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found_key("metadata key", key));
        }
        Ok(())
    }
}
