//! Hierarchical tasks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{Store, StoreError, StoreResult};

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Todo,
    /// Being worked on.
    InProgress,
    /// Finished.
    Done,
    /// Waiting on something else.
    Blocked,
}

impl TaskStatus {
    /// Returns the stored/wire name of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

/// A task, optionally nested under a parent task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// Task id.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Parent task, if this is a subtask.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    /// Short title.
    pub title: String,
    /// Longer description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Current status.
    pub status: TaskStatus,
    /// Priority (higher is more important).
    pub priority: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Fields to change on an existing task; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<TaskStatus>,
    /// New priority.
    pub priority: Option<i64>,
}

impl TaskUpdate {
    const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }
}

/// Parent filter for [`Store::list_tasks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    /// Tasks at any depth.
    Any,
    /// Only top-level tasks.
    Root,
    /// Only direct children of the given task.
    Children(i64),
}

const COLUMNS: &str =
    "id, project_id, parent_id, title, description, status, priority, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(5)?;
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        parent_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        status: status.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
        priority: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn fetch(conn: &Connection, id: i64) -> StoreResult<Task> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("task", id))
}

impl Store {
    /// Creates a task in `project_id` with status `todo`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidParent`] if `parent_id` does not name a
    /// task in the same project, or an error if the insert fails.
    pub fn create_task(
        &self,
        project_id: i64,
        parent_id: Option<i64>,
        title: &str,
        description: &str,
        priority: i64,
    ) -> StoreResult<Task> {
        let conn = self.conn.lock();

        if let Some(parent) = parent_id {
            let same_project: Option<i64> = conn
                .query_row(
                    "SELECT id FROM tasks WHERE id = ?1 AND project_id = ?2",
                    params![parent, project_id],
                    |row| row.get(0),
                )
                .optional()?;
            if same_project.is_none() {
                return Err(StoreError::InvalidParent { id: parent });
            }
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO tasks \
             (project_id, parent_id, title, description, status, priority, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                project_id,
                parent_id,
                title,
                description,
                TaskStatus::Todo.as_str(),
                priority,
                now
            ],
        )?;
        fetch(&conn, conn.last_insert_rowid())
    }

    /// Fetches a task by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such task exists.
    #[cfg(test)]
    pub(crate) fn task(&self, id: i64) -> StoreResult<Task> {
        let conn = self.conn.lock();
        fetch(&conn, id)
    }

    /// Applies `update` to a task and returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such task exists.
    pub fn update_task(&self, id: i64, update: &TaskUpdate) -> StoreResult<Task> {
        let conn = self.conn.lock();
        if update.is_empty() {
            return fetch(&conn, id);
        }

        let mut sets = Vec::new();
        let mut args = Vec::new();
        if let Some(title) = &update.title {
            sets.push("title = ?");
            args.push(SqlValue::Text(title.clone()));
        }
        if let Some(description) = &update.description {
            sets.push("description = ?");
            args.push(SqlValue::Text(description.clone()));
        }
        if let Some(status) = update.status {
            sets.push("status = ?");
            args.push(SqlValue::Text(status.as_str().to_string()));
        }
        if let Some(priority) = update.priority {
            sets.push("priority = ?");
            args.push(SqlValue::Integer(priority));
        }
        sets.push("updated_at = ?");
        args.push(SqlValue::Text(now_text()));
        args.push(SqlValue::Integer(id));

        let changed = conn.execute(
            &format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", ")),
            params_from_iter(args.iter()),
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("task", id));
        }
        fetch(&conn, id)
    }

    /// Lists tasks in `project_id`, highest priority first, then oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_tasks(
        &self,
        project_id: i64,
        status: Option<TaskStatus>,
        parent: ParentFilter,
    ) -> StoreResult<Vec<Task>> {
        let mut conditions = vec!["project_id = ?"];
        let mut args = vec![SqlValue::Integer(project_id)];

        if let Some(status) = status {
            conditions.push("status = ?");
            args.push(SqlValue::Text(status.as_str().to_string()));
        }
        match parent {
            ParentFilter::Any => {}
            ParentFilter::Root => conditions.push("parent_id IS NULL"),
            ParentFilter::Children(parent_id) => {
                conditions.push("parent_id = ?");
                args.push(SqlValue::Integer(parent_id));
            }
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM tasks WHERE {} ORDER BY priority DESC, created_at, id",
            conditions.join(" AND ")
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params_from_iter(args.iter()), from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Deletes a task together with all of its descendants.
    ///
    /// Returns the number of tasks removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such task exists.
    pub fn delete_task(&self, id: i64) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            "WITH RECURSIVE subtree(id) AS ( \
                 SELECT id FROM tasks WHERE id = ?1 \
                 UNION ALL \
                 SELECT tasks.id FROM tasks JOIN subtree ON tasks.parent_id = subtree.id \
             ) \
             DELETE FROM tasks WHERE id IN (SELECT id FROM subtree)",
            params![id],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found("task", id));
        }
        tx.commit()?;
        Ok(deleted)
    }
}

/// Current time in the text form rusqlite writes for `DateTime<Utc>`.
pub(super) fn now_text() -> String {
    Utc::now().format("%F %T%.f%:z").to_string()
}
