//! Free-text memories with keyword tags.

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{
    contains_pattern, decode_tags, encode_tags, tag_pattern, Store, StoreError, StoreResult,
};

/// A stored memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Memory {
    /// Memory id.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Remembered text.
    pub content: String,
    /// Keyword tags.
    pub keywords: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, project_id, content, keywords, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    Ok(Memory {
        id: row.get(0)?,
        project_id: row.get(1)?,
        content: row.get(2)?,
        keywords: decode_tags(row.get::<_, Option<String>>(3)?.as_deref()),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn fetch(conn: &Connection, id: i64) -> StoreResult<Memory> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM memories WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("memory", id))
}

impl Store {
    /// Stores a new memory in `project_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_memory(
        &self,
        project_id: i64,
        content: &str,
        keywords: &[String],
    ) -> StoreResult<Memory> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO memories (project_id, content, keywords, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![project_id, content, encode_tags(keywords), now],
        )?;
        fetch(&conn, conn.last_insert_rowid())
    }

    /// Fetches a memory by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such memory exists.
    #[cfg(test)]
    pub(crate) fn memory(&self, id: i64) -> StoreResult<Memory> {
        let conn = self.conn.lock();
        fetch(&conn, id)
    }

    /// Searches memories in `project_id`, newest first.
    ///
    /// A memory matches when its content contains `query` (if given) and it
    /// carries every one of `keywords`. A `limit` of zero means no limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_memories(
        &self,
        project_id: i64,
        query: Option<&str>,
        keywords: &[String],
        limit: u32,
    ) -> StoreResult<Vec<Memory>> {
        let mut conditions = vec!["project_id = ?"];
        let mut args = vec![SqlValue::Integer(project_id)];

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            conditions.push("content LIKE ?");
            args.push(SqlValue::Text(contains_pattern(query)));
        }
        for keyword in keywords {
            conditions.push("keywords LIKE ?");
            args.push(SqlValue::Text(tag_pattern(keyword)));
        }

        let mut sql = format!(
            "SELECT {COLUMNS} FROM memories WHERE {} ORDER BY updated_at DESC, id DESC",
            conditions.join(" AND ")
        );
        if limit > 0 {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let memories = stmt
            .query_map(params_from_iter(args.iter()), from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }

    /// Deletes a memory by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such memory exists.
    pub fn delete_memory(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::not_found("memory", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GLOBAL_PROJECT_ID;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn create_memory_returns_stored_record() {
        let store = Store::in_memory().unwrap();
        let memory = store
            .create_memory(GLOBAL_PROJECT_ID, "hello", &tags(&["greeting"]))
            .unwrap();

        assert_eq!(memory.content, "hello");
        assert_eq!(memory.keywords, tags(&["greeting"]));
        assert_eq!(memory.project_id, GLOBAL_PROJECT_ID);
        assert_eq!(memory.created_at, memory.updated_at);
        assert_eq!(store.memory(memory.id).unwrap(), memory);
    }

    #[test]
    fn search_by_query_and_keywords() {
        let store = Store::in_memory().unwrap();
        store
            .create_memory(
                GLOBAL_PROJECT_ID,
                "Go channels",
                &tags(&["go", "concurrency"]),
            )
            .unwrap();
        store
            .create_memory(GLOBAL_PROJECT_ID, "Rust ownership", &tags(&["rust"]))
            .unwrap();
        store
            .create_memory(
                GLOBAL_PROJECT_ID,
                "Rust async",
                &tags(&["rust", "concurrency"]),
            )
            .unwrap();

        let rust = store
            .search_memories(GLOBAL_PROJECT_ID, Some("Rust"), &[], 0)
            .unwrap();
        assert_eq!(rust.len(), 2);

        let both = store
            .search_memories(GLOBAL_PROJECT_ID, None, &tags(&["rust", "concurrency"]), 0)
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].content, "Rust async");
    }

    #[test]
    fn search_is_newest_first_and_limited() {
        let store = Store::in_memory().unwrap();
        for n in 0..5 {
            store
                .create_memory(GLOBAL_PROJECT_ID, &format!("note {n}"), &[])
                .unwrap();
        }

        let found = store
            .search_memories(GLOBAL_PROJECT_ID, None, &[], 2)
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].content, "note 4");
        assert_eq!(found[1].content, "note 3");
    }

    #[test]
    fn search_is_scoped_to_project() {
        let store = Store::in_memory().unwrap();
        let other = store.resolve_project("other").unwrap();
        store.create_memory(other.id, "elsewhere", &[]).unwrap();

        let global = store
            .search_memories(GLOBAL_PROJECT_ID, None, &[], 0)
            .unwrap();
        assert!(global.is_empty());
    }

    #[test]
    fn delete_memory_reports_missing_id() {
        let store = Store::in_memory().unwrap();
        let memory = store.create_memory(GLOBAL_PROJECT_ID, "gone", &[]).unwrap();

        store.delete_memory(memory.id).unwrap();
        assert!(matches!(
            store.delete_memory(memory.id),
            Err(StoreError::NotFound { kind: "memory", .. })
        ));
    }
}
