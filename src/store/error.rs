//! Error types for knowledge store operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing the knowledge store.
///
/// The `Display` text of these errors is surfaced verbatim to the MCP client
/// inside tool results, so it must stay short and free of internal paths.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database directory could not be created.
    #[error("failed to create database directory: {path}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An SQLite operation failed.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A record with the given id does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind ("memory", "task", ...).
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A task was given a parent that does not exist in the same project.
    #[error("parent task {id} not found in this project")]
    InvalidParent {
        /// The rejected parent id.
        id: i64,
    },
}

impl StoreError {
    /// Creates a not-found error for a numeric record id.
    #[must_use]
    pub fn not_found(kind: &'static str, id: i64) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Creates a not-found error for a keyed record (metadata key, file path).
    #[must_use]
    pub fn not_found_key(kind: &'static str, key: &str) -> Self {
        Self::NotFound {
            kind,
            id: format!("'{key}'"),
        }
    }
}
