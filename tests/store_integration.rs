//! Integration tests for the on-disk knowledge store.
//!
//! Each test works in its own temporary directory and reopens the database to
//! check that records survive across connections.

use mcp_memories::store::{
    BookmarkQuery, NewBookmark, NewGuideline, ParentFilter, Store, StoreError, TaskStatus,
    TaskUpdate, GLOBAL_PROJECT_ID, GLOBAL_PROJECT_SLUG,
};
use tempfile::TempDir;

fn temp_store() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("memories.db");
    (dir, path)
}

#[test]
fn open_creates_parent_directory() {
    let (_dir, path) = temp_store();
    let _store = Store::open(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn global_project_is_seeded_once() {
    let (_dir, path) = temp_store();
    drop(Store::open(&path).unwrap());

    let store = Store::open(&path).unwrap();
    let projects = store.list_projects().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, GLOBAL_PROJECT_ID);
    assert_eq!(projects[0].slug, GLOBAL_PROJECT_SLUG);
}

#[test]
fn records_survive_reopen() {
    let (_dir, path) = temp_store();
    let (project_id, memory_id, task_id) = {
        let store = Store::open(&path).unwrap();
        let project = store.resolve_project("docs").unwrap();
        let memory = store
            .create_memory(project.id, "persisted note", &["disk".to_string()])
            .unwrap();
        let task = store
            .create_task(project.id, None, "write docs", "", 2)
            .unwrap();
        store.set_metadata(project.id, "lang", "rust").unwrap();
        (project.id, memory.id, task.id)
    };

    let store = Store::open(&path).unwrap();
    assert_eq!(store.resolve_project("docs").unwrap().id, project_id);

    let memories = store.search_memories(project_id, None, &[], 0).unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].id, memory_id);
    assert_eq!(memories[0].content, "persisted note");

    let tasks = store
        .list_tasks(project_id, None, ParentFilter::Any)
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task_id);
    assert_eq!(tasks[0].priority, 2);

    assert_eq!(
        store.metadata(project_id, "lang").unwrap().unwrap().value,
        "rust"
    );
}

#[test]
fn projects_isolate_records() {
    let (_dir, path) = temp_store();
    let store = Store::open(&path).unwrap();
    let alpha = store.resolve_project("alpha").unwrap();
    let beta = store.resolve_project("beta").unwrap();

    store.create_memory(alpha.id, "alpha only", &[]).unwrap();
    store
        .annotate_file(alpha.id, "src/lib.rs", "entry", false)
        .unwrap();

    assert!(store
        .search_memories(beta.id, None, &[], 0)
        .unwrap()
        .is_empty());
    assert!(store
        .file_annotation(beta.id, "src/lib.rs")
        .unwrap()
        .is_none());
    assert_eq!(
        store.search_memories(alpha.id, None, &[], 0).unwrap().len(),
        1
    );
}

#[test]
fn task_tree_lifecycle() {
    let (_dir, path) = temp_store();
    let store = Store::open(&path).unwrap();

    let root = store
        .create_task(GLOBAL_PROJECT_ID, None, "release", "", 5)
        .unwrap();
    let child = store
        .create_task(GLOBAL_PROJECT_ID, Some(root.id), "changelog", "", 1)
        .unwrap();
    store
        .create_task(GLOBAL_PROJECT_ID, Some(child.id), "collect entries", "", 0)
        .unwrap();

    let update = TaskUpdate {
        status: Some(TaskStatus::InProgress),
        ..TaskUpdate::default()
    };
    let updated = store.update_task(child.id, &update).unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(updated.title, "changelog");

    let children = store
        .list_tasks(GLOBAL_PROJECT_ID, None, ParentFilter::Children(root.id))
        .unwrap();
    assert_eq!(children.len(), 1);

    assert_eq!(store.delete_task(root.id).unwrap(), 3);
    assert!(store
        .list_tasks(GLOBAL_PROJECT_ID, None, ParentFilter::Any)
        .unwrap()
        .is_empty());
}

#[test]
fn cross_project_parent_is_rejected() {
    let (_dir, path) = temp_store();
    let store = Store::open(&path).unwrap();
    let other = store.resolve_project("other").unwrap();
    let parent = store.create_task(other.id, None, "theirs", "", 0).unwrap();

    let err = store
        .create_task(GLOBAL_PROJECT_ID, Some(parent.id), "mine", "", 0)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidParent { .. }));
}

#[test]
fn duplicate_guideline_is_rejected() {
    let (_dir, path) = temp_store();
    let store = Store::open(&path).unwrap();
    let new = NewGuideline {
        category: "style".to_string(),
        title: "naming".to_string(),
        content: "snake_case".to_string(),
        ..NewGuideline::default()
    };

    store.create_guideline(GLOBAL_PROJECT_ID, &new).unwrap();
    let err = store.create_guideline(GLOBAL_PROJECT_ID, &new).unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)));
}

#[test]
fn bookmark_search_by_tag_and_type() {
    let (_dir, path) = temp_store();
    let store = Store::open(&path).unwrap();

    store
        .create_bookmark(
            GLOBAL_PROJECT_ID,
            &NewBookmark {
                url: "https://example.com/protocol.pdf".to_string(),
                title: "Protocol reference".to_string(),
                doc_type: "pdf".to_string(),
                tags: vec!["protocol".to_string()],
                ..NewBookmark::default()
            },
        )
        .unwrap();
    store
        .create_bookmark(
            GLOBAL_PROJECT_ID,
            &NewBookmark {
                url: "https://example.com/blog".to_string(),
                title: "Blog post".to_string(),
                doc_type: "web".to_string(),
                ..NewBookmark::default()
            },
        )
        .unwrap();

    let query = BookmarkQuery {
        tags: vec!["protocol".to_string()],
        doc_type: Some("pdf".to_string()),
        ..BookmarkQuery::default()
    };
    let found = store.search_bookmarks(GLOBAL_PROJECT_ID, &query).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Protocol reference");

    assert_eq!(store.list_bookmarks(GLOBAL_PROJECT_ID).unwrap().len(), 2);
}

#[test]
fn deleting_missing_records_reports_not_found() {
    let (_dir, path) = temp_store();
    let store = Store::open(&path).unwrap();

    assert!(matches!(
        store.delete_memory(404),
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete_guideline(404),
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete_metadata(GLOBAL_PROJECT_ID, "nope"),
        Err(StoreError::NotFound { .. })
    ));
}
