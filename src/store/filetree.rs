//! Notes attached to file and directory paths.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{Store, StoreError, StoreResult};

/// An annotation on a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAnnotation {
    /// Annotation id.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Annotated path, unique within the project.
    pub path: String,
    /// The note.
    pub note: String,
    /// Whether the path is a directory.
    pub is_dir: bool,
}

const COLUMNS: &str = "id, project_id, path, note, is_dir";

fn from_row(row: &Row<'_>) -> rusqlite::Result<FileAnnotation> {
    Ok(FileAnnotation {
        id: row.get(0)?,
        project_id: row.get(1)?,
        path: row.get(2)?,
        note: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        is_dir: row.get::<_, Option<bool>>(4)?.unwrap_or(false),
    })
}

fn lookup(conn: &Connection, project_id: i64, path: &str) -> StoreResult<Option<FileAnnotation>> {
    let annotation = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM filetree WHERE project_id = ?1 AND path = ?2"
            ),
            params![project_id, path],
            from_row,
        )
        .optional()?;
    Ok(annotation)
}

impl Store {
    /// Adds or replaces the note on `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn annotate_file(
        &self,
        project_id: i64,
        path: &str,
        note: &str,
        is_dir: bool,
    ) -> StoreResult<FileAnnotation> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO filetree (project_id, path, note, is_dir) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(project_id, path) \
             DO UPDATE SET note = excluded.note, is_dir = excluded.is_dir",
            params![project_id, path, note, is_dir],
        )?;
        lookup(&conn, project_id, path)?
            .ok_or_else(|| StoreError::not_found_key("annotation", path))
    }

    /// Gets the annotation on `path`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn file_annotation(
        &self,
        project_id: i64,
        path: &str,
    ) -> StoreResult<Option<FileAnnotation>> {
        let conn = self.conn.lock();
        lookup(&conn, project_id, path)
    }

    /// Lists all annotations of `project_id`, ordered by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_file_annotations(&self, project_id: i64) -> StoreResult<Vec<FileAnnotation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM filetree WHERE project_id = ?1 ORDER BY path"
        ))?;
        let annotations = stmt
            .query_map(params![project_id], from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(annotations)
    }

    /// Removes the annotation on `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the path has no annotation.
    pub fn delete_file_annotation(&self, project_id: i64, path: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM filetree WHERE project_id = ?1 AND path = ?2",
            params![project_id, path],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found_key("annotation", path));
        }
        Ok(())
    }
}
