//! Project-scoped knowledge store backed by SQLite.
//!
//! The store keeps six record kinds, each owned by a project:
//!
//! - **Memories**: free-text notes with keyword tags
//! - **Tasks**: hierarchical work items with a status and priority
//! - **Metadata**: key-value pairs
//! - **File annotations**: notes attached to file or directory paths
//! - **Guidelines**: categorised how-tos with tags and priority
//! - **Bookmarks**: references to external documents
//!
//! Projects are identified by a unique slug. Project `1` (`global`) always
//! exists. The store never tracks a "current" project itself; callers pass the
//! project id explicitly on every scoped operation.
//!
//! All access goes through one connection behind a [`parking_lot::Mutex`],
//! which serialises writes and cannot be poisoned by a panicking caller.

mod bookmarks;
pub mod error;
mod filetree;
mod guidelines;
mod memories;
mod metadata;
mod projects;
mod schema;
mod tasks;

pub use bookmarks::{Bookmark, BookmarkQuery, NewBookmark};
pub use error::{StoreError, StoreResult};
pub use filetree::FileAnnotation;
pub use guidelines::{Guideline, GuidelineUpdate, NewGuideline};
pub use memories::Memory;
pub use metadata::Metadata;
pub use projects::Project;
pub use schema::{GLOBAL_PROJECT_ID, GLOBAL_PROJECT_SLUG};
pub use tasks::{ParentFilter, Task, TaskStatus, TaskUpdate};

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;

/// Handle to the knowledge store database.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) the store at `path` and applies the schema.
    ///
    /// The parent directory is created if needed. WAL journaling and foreign
    /// keys are enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the database
    /// cannot be opened, or the schema cannot be applied.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        // journal_mode returns a row, so it cannot go through execute().
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        Self::initialise(conn)
    }

    /// Creates a throwaway in-memory store (for tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn in_memory() -> StoreResult<Self> {
        Self::initialise(Connection::open_in_memory()?)
    }

    fn initialise(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Encodes a tag list as the JSON text stored in tag columns.
fn encode_tags(tags: &[String]) -> String {
    serde_json::Value::from(tags.to_vec()).to_string()
}

/// Decodes a stored tag column; NULL or malformed text yields no tags.
fn decode_tags(json: Option<&str>) -> Vec<String> {
    json.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

/// Builds a `LIKE` pattern matching `needle` anywhere in the column.
fn contains_pattern(needle: &str) -> String {
    format!("%{needle}%")
}

/// Builds a `LIKE` pattern matching one element of a JSON tag array.
fn tag_pattern(tag: &str) -> String {
    format!("%\"{tag}\"%")
}
