//! Project namespaces.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{Store, StoreError, StoreResult};

/// A project namespace that owns records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Project id.
    pub id: i64,
    /// Unique slug.
    pub slug: String,
    /// Human-readable name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Project root directory.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub root_path: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, slug, name, root_path, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        root_path: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        created_at: row.get(4)?,
    })
}

impl Store {
    /// Creates a new project.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug is already taken or the insert fails.
    pub fn create_project(&self, slug: &str, name: &str, root_path: &str) -> StoreResult<Project> {
        let conn = self.conn.lock();
        insert(&conn, slug, name, root_path)
    }

    /// Fetches a project by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such project exists.
    #[cfg(test)]
    pub(crate) fn project(&self, id: i64) -> StoreResult<Project> {
        let conn = self.conn.lock();
        fetch(&conn, id)
    }

    /// Fetches a project by slug, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn project_by_slug(&self, slug: &str) -> StoreResult<Option<Project>> {
        let conn = self.conn.lock();
        by_slug(&conn, slug)
    }

    /// Lists all projects in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM projects ORDER BY id"))?;
        let projects = stmt
            .query_map([], from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Looks up a project by slug, creating it if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the insert fails.
    pub fn resolve_project(&self, slug: &str) -> StoreResult<Project> {
        let conn = self.conn.lock();
        if let Some(project) = by_slug(&conn, slug)? {
            return Ok(project);
        }
        tracing::debug!(slug, "Creating project on first use");
        insert(&conn, slug, "", "")
    }
}

fn insert(conn: &Connection, slug: &str, name: &str, root_path: &str) -> StoreResult<Project> {
    conn.execute(
        "INSERT INTO projects (slug, name, root_path, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![slug, name, root_path, Utc::now()],
    )?;
    fetch(conn, conn.last_insert_rowid())
}

fn fetch(conn: &Connection, id: i64) -> StoreResult<Project> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM projects WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("project", id))
}

fn by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Project>> {
    let project = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM projects WHERE slug = ?1"),
            params![slug],
            from_row,
        )
        .optional()?;
    Ok(project)
}
