//! Bookmarks to external documents, images and URLs.

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{
    contains_pattern, decode_tags, encode_tags, tag_pattern, Store, StoreError, StoreResult,
};

/// A reference to an external document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    /// Bookmark id.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// File path or URL.
    pub url: String,
    /// Descriptive title.
    pub title: String,
    /// Relevant quote or key information.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub excerpt: String,
    /// Why the document matters.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    /// Document type (pdf, image, url, markdown, ...).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc_type: String,
    /// Page number, section name or anchor.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub page_or_section: String,
    /// Search tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Fields of a bookmark to create.
#[derive(Debug, Clone, Default)]
pub struct NewBookmark {
    /// File path or URL.
    pub url: String,
    /// Descriptive title.
    pub title: String,
    /// Relevant quote.
    pub excerpt: String,
    /// Note.
    pub note: String,
    /// Document type.
    pub doc_type: String,
    /// Page or section.
    pub page_or_section: String,
    /// Search tags.
    pub tags: Vec<String>,
}

/// Filters for [`Store::search_bookmarks`]; the default matches everything.
#[derive(Debug, Clone, Default)]
pub struct BookmarkQuery {
    /// Substring of title, excerpt, note or url.
    pub text: Option<String>,
    /// Tags that must all be present.
    pub tags: Vec<String>,
    /// Exact document type.
    pub doc_type: Option<String>,
}

const COLUMNS: &str =
    "id, project_id, url, title, excerpt, note, doc_type, page_or_section, tags, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };
    Ok(Bookmark {
        id: row.get(0)?,
        project_id: row.get(1)?,
        url: row.get(2)?,
        title: row.get(3)?,
        excerpt: text(4)?,
        note: text(5)?,
        doc_type: text(6)?,
        page_or_section: text(7)?,
        tags: decode_tags(row.get::<_, Option<String>>(8)?.as_deref()),
        created_at: row.get(9)?,
    })
}

fn fetch(conn: &Connection, id: i64) -> StoreResult<Bookmark> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM bookmarks WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("bookmark", id))
}

impl Store {
    /// Creates a bookmark in `project_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_bookmark(&self, project_id: i64, new: &NewBookmark) -> StoreResult<Bookmark> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO bookmarks \
             (project_id, url, title, excerpt, note, doc_type, page_or_section, tags, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                project_id,
                new.url,
                new.title,
                new.excerpt,
                new.note,
                new.doc_type,
                new.page_or_section,
                encode_tags(&new.tags),
                Utc::now()
            ],
        )?;
        fetch(&conn, conn.last_insert_rowid())
    }

    /// Fetches a bookmark by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such bookmark exists.
    #[cfg(test)]
    pub(crate) fn bookmark(&self, id: i64) -> StoreResult<Bookmark> {
        let conn = self.conn.lock();
        fetch(&conn, id)
    }

    /// Searches bookmarks of `project_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_bookmarks(
        &self,
        project_id: i64,
        filter: &BookmarkQuery,
    ) -> StoreResult<Vec<Bookmark>> {
        let mut conditions = vec!["project_id = ?"];
        let mut args = vec![SqlValue::Integer(project_id)];

        if let Some(text) = filter.text.as_deref().filter(|t| !t.is_empty()) {
            conditions.push(
                "(title LIKE ? OR excerpt LIKE ? OR note LIKE ? OR url LIKE ?)",
            );
            let pattern = contains_pattern(text);
            args.extend(std::iter::repeat(SqlValue::Text(pattern)).take(4));
        }
        for tag in &filter.tags {
            conditions.push("tags LIKE ?");
            args.push(SqlValue::Text(tag_pattern(tag)));
        }
        if let Some(doc_type) = filter.doc_type.as_deref().filter(|d| !d.is_empty()) {
            conditions.push("doc_type = ?");
            args.push(SqlValue::Text(doc_type.to_string()));
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM bookmarks WHERE {} ORDER BY created_at DESC, id DESC",
            conditions.join(" AND ")
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let bookmarks = stmt
            .query_map(params_from_iter(args.iter()), from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bookmarks)
    }

    /// Lists all bookmarks of `project_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_bookmarks(&self, project_id: i64) -> StoreResult<Vec<Bookmark>> {
        self.search_bookmarks(project_id, &BookmarkQuery::default())
    }

    /// Deletes a bookmark by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such bookmark exists.
    pub fn delete_bookmark(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::not_found("bookmark", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GLOBAL_PROJECT_ID;

    fn sample(url: &str, title: &str, doc_type: &str, tags: &[&str]) -> NewBookmark {
        NewBookmark {
            url: url.to_string(),
            title: title.to_string(),
            doc_type: doc_type.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            ..NewBookmark::default()
        }
    }

    #[test]
    fn create_and_fetch() {
        let store = Store::in_memory().unwrap();
        let created = store
            .create_bookmark(
                GLOBAL_PROJECT_ID,
                &NewBookmark {
                    excerpt: "WAL mode".to_string(),
                    page_or_section: "§2".to_string(),
                    ..sample("https://sqlite.org/wal.html", "WAL", "url", &["sqlite"])
                },
            )
            .unwrap();

        let fetched = store.bookmark(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.excerpt, "WAL mode");
    }

    #[test]
    fn search_filters_combine() {
        let store = Store::in_memory().unwrap();
        store
            .create_bookmark(
                GLOBAL_PROJECT_ID,
                &sample("a.pdf", "Reference", "pdf", &["protocol"]),
            )
            .unwrap();
        store
            .create_bookmark(
                GLOBAL_PROJECT_ID,
                &sample("b.png", "Diagram", "image", &["protocol", "arch"]),
            )
            .unwrap();
        store
            .create_bookmark(GLOBAL_PROJECT_ID, &sample("https://x", "Blog", "url", &[]))
            .unwrap();

        let by_tag = store
            .search_bookmarks(
                GLOBAL_PROJECT_ID,
                &BookmarkQuery {
                    tags: vec!["protocol".to_string()],
                    ..BookmarkQuery::default()
                },
            )
            .unwrap();
        assert_eq!(by_tag.len(), 2);

        let by_type = store
            .search_bookmarks(
                GLOBAL_PROJECT_ID,
                &BookmarkQuery {
                    tags: vec!["protocol".to_string()],
                    doc_type: Some("image".to_string()),
                    ..BookmarkQuery::default()
                },
            )
            .unwrap();
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type[0].title, "Diagram");

        let by_text = store
            .search_bookmarks(
                GLOBAL_PROJECT_ID,
                &BookmarkQuery {
                    text: Some("https".to_string()),
                    ..BookmarkQuery::default()
                },
            )
            .unwrap();
        assert_eq!(by_text.len(), 1);
    }

    #[test]
    fn list_is_newest_first() {
        let store = Store::in_memory().unwrap();
        store
            .create_bookmark(GLOBAL_PROJECT_ID, &sample("1", "first", "", &[]))
            .unwrap();
        store
            .create_bookmark(GLOBAL_PROJECT_ID, &sample("2", "second", "", &[]))
            .unwrap();

        let titles: Vec<_> = store
            .list_bookmarks(GLOBAL_PROJECT_ID)
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, ["second", "first"]);
    }

    #[test]
    fn empty_fields_are_omitted_from_json() {
        let store = Store::in_memory().unwrap();
        let created = store
            .create_bookmark(GLOBAL_PROJECT_ID, &sample("u", "t", "", &[]))
            .unwrap();
        let json = serde_json::to_value(&created).unwrap();
        assert!(json.get("excerpt").is_none());
        assert!(json.get("tags").is_none());
        assert_eq!(json["url"], "u");
    }

    #[test]
    fn delete_bookmark_reports_missing_id() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(
            store.delete_bookmark(3),
            Err(StoreError::NotFound { kind: "bookmark", .. })
        ));
    }
}
