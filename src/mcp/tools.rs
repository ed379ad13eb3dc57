//! The tool catalog: names, definitions and result envelopes.
//!
//! Tools fall into seven domains:
//!
//! | Domain | Tools |
//! |--------|-------|
//! | Memories | `memory_store`, `memory_search`, `memory_delete` |
//! | Tasks | `task_create`, `task_update`, `task_list`, `task_delete` |
//! | Metadata | `metadata_set`, `metadata_get`, `metadata_list`, `metadata_delete` |
//! | File tree | `filetree_annotate`, `filetree_get`, `filetree_delete` |
//! | Guidelines | `guideline_create`, `guideline_update`, `guideline_list`, `guideline_search`, |
//! | | `guideline_get`, `guideline_delete` |
//! | Projects | `project_create`, `project_list`, `project_set_default` |
//! | Bookmarks | `bookmark_create`, `bookmark_search`, `bookmark_list`, `bookmark_delete` |
//!
//! The definitions are built once per process and shared.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::{json, Value};

/// Every tool the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ToolName {
    MemoryStore,
    MemorySearch,
    MemoryDelete,
    TaskCreate,
    TaskUpdate,
    TaskList,
    TaskDelete,
    MetadataSet,
    MetadataGet,
    MetadataList,
    MetadataDelete,
    FiletreeAnnotate,
    FiletreeGet,
    FiletreeDelete,
    GuidelineCreate,
    GuidelineUpdate,
    GuidelineList,
    GuidelineSearch,
    GuidelineGet,
    GuidelineDelete,
    ProjectCreate,
    ProjectList,
    ProjectSetDefault,
    BookmarkCreate,
    BookmarkSearch,
    BookmarkList,
    BookmarkDelete,
}

impl ToolName {
    /// All tools, in catalog order.
    pub const ALL: [Self; 27] = [
        Self::MemoryStore,
        Self::MemorySearch,
        Self::MemoryDelete,
        Self::TaskCreate,
        Self::TaskUpdate,
        Self::TaskList,
        Self::TaskDelete,
        Self::MetadataSet,
        Self::MetadataGet,
        Self::MetadataList,
        Self::MetadataDelete,
        Self::FiletreeAnnotate,
        Self::FiletreeGet,
        Self::FiletreeDelete,
        Self::GuidelineCreate,
        Self::GuidelineUpdate,
        Self::GuidelineList,
        Self::GuidelineSearch,
        Self::GuidelineGet,
        Self::GuidelineDelete,
        Self::ProjectCreate,
        Self::ProjectList,
        Self::ProjectSetDefault,
        Self::BookmarkCreate,
        Self::BookmarkSearch,
        Self::BookmarkList,
        Self::BookmarkDelete,
    ];

    /// Returns the wire name of this tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MemoryStore => "memory_store",
            Self::MemorySearch => "memory_search",
            Self::MemoryDelete => "memory_delete",
            Self::TaskCreate => "task_create",
            Self::TaskUpdate => "task_update",
            Self::TaskList => "task_list",
            Self::TaskDelete => "task_delete",
            Self::MetadataSet => "metadata_set",
            Self::MetadataGet => "metadata_get",
            Self::MetadataList => "metadata_list",
            Self::MetadataDelete => "metadata_delete",
            Self::FiletreeAnnotate => "filetree_annotate",
            Self::FiletreeGet => "filetree_get",
            Self::FiletreeDelete => "filetree_delete",
            Self::GuidelineCreate => "guideline_create",
            Self::GuidelineUpdate => "guideline_update",
            Self::GuidelineList => "guideline_list",
            Self::GuidelineSearch => "guideline_search",
            Self::GuidelineGet => "guideline_get",
            Self::GuidelineDelete => "guideline_delete",
            Self::ProjectCreate => "project_create",
            Self::ProjectList => "project_list",
            Self::ProjectSetDefault => "project_set_default",
            Self::BookmarkCreate => "bookmark_create",
            Self::BookmarkSearch => "bookmark_search",
            Self::BookmarkList => "bookmark_list",
            Self::BookmarkDelete => "bookmark_delete",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The name does not belong to any tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTool;

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or(UnknownTool)
    }
}

/// A tool definition for the tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// Returns the definitions of every tool, in catalog order.
pub fn definitions() -> &'static [ToolDefinition] {
    static DEFINITIONS: OnceLock<Vec<ToolDefinition>> = OnceLock::new();
    DEFINITIONS.get_or_init(|| ToolName::ALL.into_iter().map(definition).collect())
}

const PROJECT_HELP: &str = "Project slug (optional, defaults to the session's default project)";

fn string(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn integer(description: &str) -> Value {
    json!({"type": "integer", "description": description})
}

fn string_array(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "string"}, "description": description})
}

fn status(description: &str) -> Value {
    json!({
        "type": "string",
        "enum": ["todo", "in_progress", "done", "blocked"],
        "description": description,
    })
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({"type": "object", "properties": properties, "required": required})
}

#[allow(clippy::too_many_lines)]
fn definition(tool: ToolName) -> ToolDefinition {
    let (description, input_schema) = match tool {
        // === Memories ===
        ToolName::MemoryStore => (
            "Store a new memory with optional keywords for later retrieval",
            schema(
                json!({
                    "content": string("The content to remember"),
                    "keywords": string_array("Keywords for categorization and search"),
                    "project": string(PROJECT_HELP),
                }),
                &["content"],
            ),
        ),
        ToolName::MemorySearch => (
            "Search memories by content and/or keywords, newest first",
            schema(
                json!({
                    "query": string("Text to search for in content"),
                    "keywords": string_array("Keywords that must all be present"),
                    "limit": integer("Maximum results to return (default 20)"),
                    "project": string(PROJECT_HELP),
                }),
                &[],
            ),
        ),
        ToolName::MemoryDelete => (
            "Delete a memory by ID",
            schema(json!({"id": integer("Memory ID to delete")}), &["id"]),
        ),

        // === Tasks ===
        ToolName::TaskCreate => (
            "Create a new task with optional parent for subtasks",
            schema(
                json!({
                    "title": string("Task title"),
                    "description": string("Detailed description"),
                    "parent_id": integer("Parent task ID for subtasks"),
                    "priority": integer("Priority (higher = more important)"),
                    "project": string(PROJECT_HELP),
                }),
                &["title"],
            ),
        ),
        ToolName::TaskUpdate => (
            "Update a task's status, title, description, or priority",
            schema(
                json!({
                    "id": integer("Task ID"),
                    "status": status("Task status"),
                    "title": string("New title"),
                    "description": string("New description"),
                    "priority": integer("New priority"),
                }),
                &["id"],
            ),
        ),
        ToolName::TaskList => (
            "List tasks with optional filters, highest priority first",
            schema(
                json!({
                    "status": status("Filter by status"),
                    "parent_id": integer("Filter by parent (0 for root tasks)"),
                    "project": string(PROJECT_HELP),
                }),
                &[],
            ),
        ),
        ToolName::TaskDelete => (
            "Delete a task and its subtasks",
            schema(json!({"id": integer("Task ID to delete")}), &["id"]),
        ),

        // === Metadata ===
        ToolName::MetadataSet => (
            "Set a key-value metadata pair for a project",
            schema(
                json!({
                    "key": string("Metadata key"),
                    "value": string("Metadata value"),
                    "project": string(PROJECT_HELP),
                }),
                &["key"],
            ),
        ),
        ToolName::MetadataGet => (
            "Get a metadata value by key",
            schema(
                json!({"key": string("Metadata key"), "project": string(PROJECT_HELP)}),
                &["key"],
            ),
        ),
        ToolName::MetadataList => (
            "List all metadata for a project",
            schema(json!({"project": string(PROJECT_HELP)}), &[]),
        ),
        ToolName::MetadataDelete => (
            "Delete a metadata key",
            schema(
                json!({"key": string("Metadata key to delete"), "project": string(PROJECT_HELP)}),
                &["key"],
            ),
        ),

        // === File tree ===
        ToolName::FiletreeAnnotate => (
            "Add or update a note on a file or directory path",
            schema(
                json!({
                    "path": string("File or directory path"),
                    "note": string("Annotation note"),
                    "is_dir": {"type": "boolean", "description": "Whether path is a directory"},
                    "project": string(PROJECT_HELP),
                }),
                &["path", "note"],
            ),
        ),
        ToolName::FiletreeGet => (
            "Get file annotations for a project or a specific path",
            schema(
                json!({
                    "path": string("Specific path (optional, returns all if omitted)"),
                    "project": string(PROJECT_HELP),
                }),
                &[],
            ),
        ),
        ToolName::FiletreeDelete => (
            "Delete a file annotation",
            schema(
                json!({
                    "path": string("Path to delete annotation for"),
                    "project": string(PROJECT_HELP),
                }),
                &["path"],
            ),
        ),

        // === Guidelines ===
        ToolName::GuidelineCreate => (
            "Create a new guideline or how-to document for knowledge transfer",
            schema(
                json!({
                    "category": string(
                        "Category (e.g., coding_style, architecture, workflow, debugging)"
                    ),
                    "title": string("Guideline title"),
                    "content": string("Markdown content with instructions"),
                    "tags": string_array("Tags for searchability"),
                    "priority": integer("Priority (higher = more important)"),
                    "project": string(PROJECT_HELP),
                }),
                &["category", "title", "content"],
            ),
        ),
        ToolName::GuidelineUpdate => (
            "Update a guideline's content, tags, or priority",
            schema(
                json!({
                    "id": integer("Guideline ID"),
                    "content": string("New content"),
                    "tags": string_array("New tags"),
                    "priority": integer("New priority"),
                }),
                &["id"],
            ),
        ),
        ToolName::GuidelineList => (
            "List guidelines, optionally filtered by category",
            schema(
                json!({"category": string("Filter by category"), "project": string(PROJECT_HELP)}),
                &[],
            ),
        ),
        ToolName::GuidelineSearch => (
            "Search guidelines by content, title, or tags",
            schema(
                json!({
                    "query": string("Search query"),
                    "category": string("Filter by category"),
                    "project": string(PROJECT_HELP),
                }),
                &["query"],
            ),
        ),
        ToolName::GuidelineGet => (
            "Get a specific guideline with full content",
            schema(json!({"id": integer("Guideline ID")}), &["id"]),
        ),
        ToolName::GuidelineDelete => (
            "Delete a guideline",
            schema(json!({"id": integer("Guideline ID to delete")}), &["id"]),
        ),

        // === Projects ===
        ToolName::ProjectCreate => (
            "Create a new project namespace",
            schema(
                json!({
                    "slug": string("Unique project identifier"),
                    "name": string("Human-readable name"),
                    "root_path": string("Project root directory path"),
                }),
                &["slug"],
            ),
        ),
        ToolName::ProjectList => ("List all projects", schema(json!({}), &[])),
        ToolName::ProjectSetDefault => (
            "Set the default project for this session, creating it if needed",
            schema(
                json!({"slug": string("Project slug to set as default")}),
                &["slug"],
            ),
        ),

        // === Bookmarks ===
        ToolName::BookmarkCreate => (
            "Create a bookmark for an external document, PDF, image, or URL with notes",
            schema(
                json!({
                    "url": string("File path or URL to bookmark"),
                    "title": string("Descriptive title"),
                    "excerpt": string("Relevant quote or key information from the document"),
                    "note": string("Why this is useful, what to remember"),
                    "doc_type": string("Document type (pdf, image, url, markdown, etc.)"),
                    "page_or_section": string("Page number, section name, or anchor"),
                    "tags": string_array("Tags for searchability"),
                    "project": string(PROJECT_HELP),
                }),
                &["url", "title"],
            ),
        ),
        ToolName::BookmarkSearch => (
            "Search bookmarks by query and/or tags",
            schema(
                json!({
                    "query": string("Search in title, excerpt, note, or URL"),
                    "tags": string_array("Filter by tags"),
                    "doc_type": string("Filter by document type"),
                    "project": string(PROJECT_HELP),
                }),
                &[],
            ),
        ),
        ToolName::BookmarkList => (
            "List all bookmarks for a project",
            schema(json!({"project": string(PROJECT_HELP)}), &[]),
        ),
        ToolName::BookmarkDelete => (
            "Delete a bookmark by ID",
            schema(json!({"id": integer("Bookmark ID to delete")}), &["id"]),
        ),
    };

    ToolDefinition {
        name: tool.as_str(),
        description,
        input_schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>(), Ok(tool));
        }
        assert_eq!("does_not_exist".parse::<ToolName>(), Err(UnknownTool));
        assert_eq!("".parse::<ToolName>(), Err(UnknownTool));
    }

    #[test]
    fn tool_definitions_valid() {
        let tools = definitions();
        assert_eq!(tools.len(), ToolName::ALL.len());

        let names: HashSet<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), tools.len(), "tool names must be unique");

        for tool in tools {
            assert!(!tool.description.is_empty());
            assert_eq!(tool.input_schema["type"], "object");
            let properties = tool.input_schema["properties"].as_object().unwrap();
            for required in tool.input_schema["required"].as_array().unwrap() {
                let field = required.as_str().unwrap();
                assert!(properties.contains_key(field), "{}: {field}", tool.name);
            }
        }
    }

    #[test]
    fn definitions_are_built_once() {
        assert!(std::ptr::eq(definitions(), definitions()));
    }

    #[test]
    fn definition_serialises_with_camel_case_schema() {
        let json = serde_json::to_value(&definitions()[0]).unwrap();
        assert_eq!(json["name"], "memory_store");
        assert!(json.get("inputSchema").is_some());
        assert_eq!(json["inputSchema"]["required"], json!(["content"]));
    }

    #[test]
    fn metadata_set_requires_only_key() {
        let tool = definition(ToolName::MetadataSet);
        assert_eq!(tool.input_schema["required"], json!(["key"]));
        assert!(tool.input_schema["properties"].get("value").is_some());
    }

    #[test]
    fn tool_call_result_text() {
        let result = ToolCallResult::text("Hello, world!");
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);

        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "Hello, world!"),
        }
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], false);
        assert_eq!(json["content"][0]["type"], "text");
    }

    #[test]
    fn tool_call_result_error() {
        let result = ToolCallResult::error("Something went wrong");
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);

        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "Something went wrong"),
        }
    }
}
