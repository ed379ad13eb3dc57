//! Guidelines: categorised how-tos handed from one session to the next.

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::tasks::now_text;
use super::{contains_pattern, decode_tags, encode_tags, Store, StoreError, StoreResult};

/// A guideline document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guideline {
    /// Guideline id.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Category, e.g. `coding_style` or `workflow`.
    pub category: String,
    /// Title, unique within (project, category).
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Search tags.
    pub tags: Vec<String>,
    /// Priority (higher is more important).
    pub priority: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Fields of a guideline to create.
#[derive(Debug, Clone, Default)]
pub struct NewGuideline {
    /// Category.
    pub category: String,
    /// Title.
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Search tags.
    pub tags: Vec<String>,
    /// Priority.
    pub priority: i64,
}

/// Fields to change on an existing guideline; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct GuidelineUpdate {
    /// New body.
    pub content: Option<String>,
    /// New tags.
    pub tags: Option<Vec<String>>,
    /// New priority.
    pub priority: Option<i64>,
}

const COLUMNS: &str =
    "id, project_id, category, title, content, tags, priority, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Guideline> {
    Ok(Guideline {
        id: row.get(0)?,
        project_id: row.get(1)?,
        category: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        tags: decode_tags(row.get::<_, Option<String>>(5)?.as_deref()),
        priority: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn fetch(conn: &Connection, id: i64) -> StoreResult<Guideline> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM guidelines WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("guideline", id))
}

fn query(conn: &Connection, sql: &str, args: &[SqlValue]) -> StoreResult<Vec<Guideline>> {
    let mut stmt = conn.prepare(sql)?;
    let guidelines = stmt
        .query_map(params_from_iter(args.iter()), from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(guidelines)
}

impl Store {
    /// Creates a guideline in `project_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a guideline with the same category and title
    /// already exists in the project, or the insert fails.
    pub fn create_guideline(&self, project_id: i64, new: &NewGuideline) -> StoreResult<Guideline> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO guidelines \
             (project_id, category, title, content, tags, priority, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                project_id,
                new.category,
                new.title,
                new.content,
                encode_tags(&new.tags),
                new.priority,
                now
            ],
        )?;
        fetch(&conn, conn.last_insert_rowid())
    }

    /// Fetches a guideline by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such guideline exists.
    pub fn guideline(&self, id: i64) -> StoreResult<Guideline> {
        let conn = self.conn.lock();
        fetch(&conn, id)
    }

    /// Applies `update` to a guideline and returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such guideline exists.
    pub fn update_guideline(&self, id: i64, update: &GuidelineUpdate) -> StoreResult<Guideline> {
        let conn = self.conn.lock();

        let mut sets = Vec::new();
        let mut args = Vec::new();
        if let Some(content) = &update.content {
            sets.push("content = ?");
            args.push(SqlValue::Text(content.clone()));
        }
        if let Some(tags) = &update.tags {
            sets.push("tags = ?");
            args.push(SqlValue::Text(encode_tags(tags)));
        }
        if let Some(priority) = update.priority {
            sets.push("priority = ?");
            args.push(SqlValue::Integer(priority));
        }
        if sets.is_empty() {
            return fetch(&conn, id);
        }
        sets.push("updated_at = ?");
        args.push(SqlValue::Text(now_text()));
        args.push(SqlValue::Integer(id));

        let changed = conn.execute(
            &format!("UPDATE guidelines SET {} WHERE id = ?", sets.join(", ")),
            params_from_iter(args.iter()),
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("guideline", id));
        }
        fetch(&conn, id)
    }

    /// Lists guidelines of `project_id`, optionally restricted to `category`.
    ///
    /// Ordered by priority (highest first), then category and title.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_guidelines(
        &self,
        project_id: i64,
        category: Option<&str>,
    ) -> StoreResult<Vec<Guideline>> {
        let mut conditions = vec!["project_id = ?"];
        let mut args = vec![SqlValue::Integer(project_id)];
        if let Some(category) = category {
            conditions.push("category = ?");
            args.push(SqlValue::Text(category.to_string()));
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM guidelines WHERE {} ORDER BY priority DESC, category, title",
            conditions.join(" AND ")
        );
        let conn = self.conn.lock();
        query(&conn, &sql, &args)
    }

    /// Searches guideline titles, bodies and tags for `text`.
    ///
    /// Ordered by priority (highest first), then most recently updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_guidelines(
        &self,
        project_id: i64,
        text: &str,
        category: Option<&str>,
    ) -> StoreResult<Vec<Guideline>> {
        let mut conditions = vec!["project_id = ?"];
        let mut args = vec![SqlValue::Integer(project_id)];

        if !text.is_empty() {
            conditions.push("(content LIKE ? OR title LIKE ? OR tags LIKE ?)");
            let pattern = contains_pattern(text);
            args.extend(std::iter::repeat(SqlValue::Text(pattern)).take(3));
        }
        if let Some(category) = category {
            conditions.push("category = ?");
            args.push(SqlValue::Text(category.to_string()));
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM guidelines WHERE {} \
             ORDER BY priority DESC, updated_at DESC, id DESC",
            conditions.join(" AND ")
        );
        let conn = self.conn.lock();
        query(&conn, &sql, &args)
    }

    /// Deletes a guideline by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such guideline exists.
    pub fn delete_guideline(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM guidelines WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::not_found("guideline", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GLOBAL_PROJECT_ID;

    fn guideline(category: &str, title: &str, content: &str, priority: i64) -> NewGuideline {
        NewGuideline {
            category: category.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: vec!["team".to_string()],
            priority,
        }
    }

    #[test]
    fn create_and_get() {
        let store = Store::in_memory().unwrap();
        let created = store
            .create_guideline(
                GLOBAL_PROJECT_ID,
                &guideline("workflow", "Commits", "Small commits", 1),
            )
            .unwrap();

        let fetched = store.guideline(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.tags, ["team"]);
    }

    #[test]
    fn category_and_title_are_unique_per_project() {
        let store = Store::in_memory().unwrap();
        let new = guideline("workflow", "Commits", "a", 0);
        store.create_guideline(GLOBAL_PROJECT_ID, &new).unwrap();
        assert!(matches!(
            store.create_guideline(GLOBAL_PROJECT_ID, &new),
            Err(StoreError::Sqlite(_))
        ));

        let other = store.resolve_project("other").unwrap();
        assert!(store.create_guideline(other.id, &new).is_ok());
    }

    #[test]
    fn update_replaces_given_fields() {
        let store = Store::in_memory().unwrap();
        let created = store
            .create_guideline(
                GLOBAL_PROJECT_ID,
                &guideline("style", "Naming", "snake_case", 0),
            )
            .unwrap();

        let updated = store
            .update_guideline(
                created.id,
                &GuidelineUpdate {
                    tags: Some(vec!["naming".to_string(), "rust".to_string()]),
                    priority: Some(3),
                    ..GuidelineUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.content, "snake_case");
        assert_eq!(updated.tags, ["naming", "rust"]);
        assert_eq!(updated.priority, 3);
    }

    #[test]
    fn update_missing_guideline_is_not_found() {
        let store = Store::in_memory().unwrap();
        let update = GuidelineUpdate {
            content: Some("x".to_string()),
            ..GuidelineUpdate::default()
        };
        assert!(matches!(
            store.update_guideline(12, &update),
            Err(StoreError::NotFound { kind: "guideline", .. })
        ));
    }

    #[test]
    fn list_orders_by_priority_then_category() {
        let store = Store::in_memory().unwrap();
        store
            .create_guideline(GLOBAL_PROJECT_ID, &guideline("b", "low", "x", 0))
            .unwrap();
        store
            .create_guideline(GLOBAL_PROJECT_ID, &guideline("a", "low", "x", 0))
            .unwrap();
        store
            .create_guideline(GLOBAL_PROJECT_ID, &guideline("z", "high", "x", 9))
            .unwrap();

        let order: Vec<_> = store
            .list_guidelines(GLOBAL_PROJECT_ID, None)
            .unwrap()
            .into_iter()
            .map(|g| g.category)
            .collect();
        assert_eq!(order, ["z", "a", "b"]);

        let only_a = store.list_guidelines(GLOBAL_PROJECT_ID, Some("a")).unwrap();
        assert_eq!(only_a.len(), 1);
    }

    #[test]
    fn search_matches_title_content_and_tags() {
        let store = Store::in_memory().unwrap();
        store
            .create_guideline(
                GLOBAL_PROJECT_ID,
                &guideline("debug", "Tracing", "use spans", 0),
            )
            .unwrap();
        store
            .create_guideline(
                GLOBAL_PROJECT_ID,
                &guideline("style", "Errors", "prefer thiserror", 0),
            )
            .unwrap();

        let hits = |query: &str| {
            store
                .search_guidelines(GLOBAL_PROJECT_ID, query, None)
                .unwrap()
                .len()
        };
        assert_eq!(hits("Tracing"), 1);
        assert_eq!(hits("thiserror"), 1);
        assert_eq!(hits("team"), 2);
        assert_eq!(
            store
                .search_guidelines(GLOBAL_PROJECT_ID, "team", Some("style"))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn delete_guideline_reports_missing_id() {
        let store = Store::in_memory().unwrap();
        let created = store
            .create_guideline(GLOBAL_PROJECT_ID, &guideline("c", "t", "x", 0))
            .unwrap();
        store.delete_guideline(created.id).unwrap();
        assert!(store.delete_guideline(created.id).is_err());
        assert!(store.guideline(created.id).is_err());
    }
}
