//! Tool routing: typed arguments in, store calls, JSON results out.
//!
//! Every tool call goes through [`call_tool`], which
//!
//! 1. deserialises the `arguments` object into the tool's argument struct
//!    and checks its required fields,
//! 2. resolves the acting project (the `project` argument, created on first
//!    use, or else the session default),
//! 3. calls the [`Store`],
//! 4. encodes the result as JSON.
//!
//! Failures at any step are [`ToolError`]s. They are tool-level failures
//! reported to the client inside a successful response, not protocol errors.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::mcp::tools::ToolName;
use crate::store::{
    BookmarkQuery, GuidelineUpdate, NewBookmark, NewGuideline, ParentFilter, Store, StoreError,
    StoreResult, TaskStatus, TaskUpdate, GLOBAL_PROJECT_ID,
};

/// Default `limit` for `memory_search`.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Per-connection state shared across tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    default_project: i64,
}

impl Session {
    /// Creates a session whose default project is `default_project`.
    #[must_use]
    pub const fn new(default_project: i64) -> Self {
        Self { default_project }
    }

    /// Id of the project used when a call names none.
    #[must_use]
    pub const fn default_project(&self) -> i64 {
        self.default_project
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(GLOBAL_PROJECT_ID)
    }
}

/// The arguments of a tool call were unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A required field was absent, empty or zero.
    #[error("{0} is required")]
    Missing(&'static str),

    /// A field had the wrong type or an unacceptable value.
    #[error("{0}")]
    Invalid(String),
}

/// A tool call failed.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Bad arguments.
    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The result could not be encoded.
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

type ToolResult = Result<Value, ToolError>;

/// Argument structs for each tool.
trait ToolArguments: DeserializeOwned {
    /// Checks required fields after deserialisation.
    fn validate(&self) -> Result<(), ArgumentError> {
        Ok(())
    }
}

fn parse<T: ToolArguments>(arguments: Value) -> Result<T, ArgumentError> {
    let args: T = serde_json::from_value(arguments)
        .map_err(|e| ArgumentError::Invalid(format!("invalid arguments: {e}")))?;
    args.validate()?;
    Ok(args)
}

fn require(field: &'static str, value: &str) -> Result<(), ArgumentError> {
    if value.is_empty() {
        return Err(ArgumentError::Missing(field));
    }
    Ok(())
}

fn require_id(field: &'static str, id: i64) -> Result<(), ArgumentError> {
    if id <= 0 {
        return Err(ArgumentError::Missing(field));
    }
    Ok(())
}

fn encode<T: Serialize>(value: &T) -> ToolResult {
    Ok(serde_json::to_value(value)?)
}

/// Resolves the project a call acts on.
fn scope(store: &Store, session: &Session, project: Option<&str>) -> StoreResult<i64> {
    match project.filter(|slug| !slug.is_empty()) {
        Some(slug) => Ok(store.resolve_project(slug)?.id),
        None => Ok(session.default_project()),
    }
}

/// Runs `tool` with `arguments` against `store`.
///
/// `arguments` must already be a JSON object. `project_set_default` updates
/// `session`.
///
/// # Errors
///
/// Returns a [`ToolError`] if the arguments are invalid, the store operation
/// fails, or the result cannot be encoded.
pub fn call_tool(
    store: &Store,
    session: &mut Session,
    tool: ToolName,
    arguments: Value,
) -> ToolResult {
    match tool {
        ToolName::MemoryStore => memory_store(store, session, parse(arguments)?),
        ToolName::MemorySearch => memory_search(store, session, parse(arguments)?),
        ToolName::MemoryDelete => memory_delete(store, parse(arguments)?),
        ToolName::TaskCreate => task_create(store, session, parse(arguments)?),
        ToolName::TaskUpdate => task_update(store, parse(arguments)?),
        ToolName::TaskList => task_list(store, session, parse(arguments)?),
        ToolName::TaskDelete => task_delete(store, parse(arguments)?),
        ToolName::MetadataSet => metadata_set(store, session, parse(arguments)?),
        ToolName::MetadataGet => metadata_get(store, session, parse(arguments)?),
        ToolName::MetadataList => metadata_list(store, session, parse(arguments)?),
        ToolName::MetadataDelete => metadata_delete(store, session, parse(arguments)?),
        ToolName::FiletreeAnnotate => filetree_annotate(store, session, parse(arguments)?),
        ToolName::FiletreeGet => filetree_get(store, session, parse(arguments)?),
        ToolName::FiletreeDelete => filetree_delete(store, session, parse(arguments)?),
        ToolName::GuidelineCreate => guideline_create(store, session, parse(arguments)?),
        ToolName::GuidelineUpdate => guideline_update(store, parse(arguments)?),
        ToolName::GuidelineList => guideline_list(store, session, parse(arguments)?),
        ToolName::GuidelineSearch => guideline_search(store, session, parse(arguments)?),
        ToolName::GuidelineGet => guideline_get(store, parse(arguments)?),
        ToolName::GuidelineDelete => guideline_delete(store, parse(arguments)?),
        ToolName::ProjectCreate => project_create(store, parse(arguments)?),
        ToolName::ProjectList => encode(&store.list_projects()?),
        ToolName::ProjectSetDefault => project_set_default(store, session, parse(arguments)?),
        ToolName::BookmarkCreate => bookmark_create(store, session, parse(arguments)?),
        ToolName::BookmarkSearch => bookmark_search(store, session, parse(arguments)?),
        ToolName::BookmarkList => bookmark_list(store, session, parse(arguments)?),
        ToolName::BookmarkDelete => bookmark_delete(store, parse(arguments)?),
    }
}

/// Deserialisers that accept what loosely typed clients send: integral
/// floats where integers are expected, and string arrays with stray
/// non-string items.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::{Number, Value};

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn to_integer<E: Error>(number: &Number) -> Result<i64, E> {
        if let Some(n) = number.as_i64() {
            return Ok(n);
        }
        match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(f as i64)
            }
            _ => Err(E::custom(format!("expected an integer, found {number}"))),
        }
    }

    pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        to_integer(&Number::deserialize(deserializer)?)
    }

    pub fn optional_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Number>::deserialize(deserializer)?
            .map(|n| to_integer(&n))
            .transpose()
    }

    /// Zero and negative limits fall back to the default; huge ones saturate.
    pub fn limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = integer(deserializer)?;
        Ok(u32::try_from(n.max(0)).unwrap_or(u32::MAX))
    }

    fn keep_strings(items: Vec<Value>) -> Vec<String> {
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(optional_strings(deserializer)?.unwrap_or_default())
    }

    pub fn optional_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = Option::<Vec<Value>>::deserialize(deserializer)?;
        Ok(items.map(keep_strings))
    }
}

// === Shared argument shapes ===

/// Arguments of tools that only take the optional project.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectArgs {
    project: Option<String>,
}

impl ToolArguments for ProjectArgs {}

/// Arguments of tools addressing one record by id.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IdArgs {
    #[serde(deserialize_with = "lenient::integer")]
    id: i64,
}

impl ToolArguments for IdArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require_id("id", self.id)
    }
}

fn deleted_id(id: i64) -> ToolResult {
    Ok(json!({"deleted": true, "id": id}))
}

// === Memories ===

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemoryStoreArgs {
    content: String,
    #[serde(deserialize_with = "lenient::strings")]
    keywords: Vec<String>,
    project: Option<String>,
}

impl ToolArguments for MemoryStoreArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("content", &self.content)
    }
}

fn memory_store(store: &Store, session: &Session, args: MemoryStoreArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    encode(&store.create_memory(project, &args.content, &args.keywords)?)
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MemorySearchArgs {
    query: Option<String>,
    #[serde(deserialize_with = "lenient::strings")]
    keywords: Vec<String>,
    #[serde(deserialize_with = "lenient::limit")]
    limit: u32,
    project: Option<String>,
}

impl Default for MemorySearchArgs {
    fn default() -> Self {
        Self {
            query: None,
            keywords: Vec::new(),
            limit: DEFAULT_SEARCH_LIMIT,
            project: None,
        }
    }
}

impl ToolArguments for MemorySearchArgs {}

fn memory_search(store: &Store, session: &Session, args: MemorySearchArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    let limit = if args.limit == 0 {
        DEFAULT_SEARCH_LIMIT
    } else {
        args.limit
    };
    encode(&store.search_memories(project, args.query.as_deref(), &args.keywords, limit)?)
}

fn memory_delete(store: &Store, args: IdArgs) -> ToolResult {
    store.delete_memory(args.id)?;
    deleted_id(args.id)
}

// === Tasks ===

fn parse_status(status: Option<&str>) -> Result<Option<TaskStatus>, ArgumentError> {
    status
        .filter(|s| !s.is_empty())
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(ArgumentError::Invalid)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaskCreateArgs {
    title: String,
    description: String,
    #[serde(deserialize_with = "lenient::optional_integer")]
    parent_id: Option<i64>,
    #[serde(deserialize_with = "lenient::integer")]
    priority: i64,
    project: Option<String>,
}

impl ToolArguments for TaskCreateArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("title", &self.title)
    }
}

fn task_create(store: &Store, session: &Session, args: TaskCreateArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    let parent = args.parent_id.filter(|&id| id > 0);
    encode(&store.create_task(
        project,
        parent,
        &args.title,
        &args.description,
        args.priority,
    )?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaskUpdateArgs {
    #[serde(deserialize_with = "lenient::integer")]
    id: i64,
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    #[serde(deserialize_with = "lenient::optional_integer")]
    priority: Option<i64>,
}

impl ToolArguments for TaskUpdateArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require_id("id", self.id)
    }
}

fn task_update(store: &Store, args: TaskUpdateArgs) -> ToolResult {
    let update = TaskUpdate {
        title: args.title,
        description: args.description,
        status: parse_status(args.status.as_deref())?,
        priority: args.priority,
    };
    encode(&store.update_task(args.id, &update)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaskListArgs {
    status: Option<String>,
    #[serde(deserialize_with = "lenient::optional_integer")]
    parent_id: Option<i64>,
    project: Option<String>,
}

impl ToolArguments for TaskListArgs {}

fn task_list(store: &Store, session: &Session, args: TaskListArgs) -> ToolResult {
    let status = parse_status(args.status.as_deref())?;
    let parent = match args.parent_id {
        None => ParentFilter::Any,
        Some(0) => ParentFilter::Root,
        Some(id) => ParentFilter::Children(id),
    };
    let project = scope(store, session, args.project.as_deref())?;
    encode(&store.list_tasks(project, status, parent)?)
}

fn task_delete(store: &Store, args: IdArgs) -> ToolResult {
    store.delete_task(args.id)?;
    deleted_id(args.id)
}

// === Metadata ===

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataSetArgs {
    key: String,
    value: String,
    project: Option<String>,
}

impl ToolArguments for MetadataSetArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("key", &self.key)
    }
}

fn metadata_set(store: &Store, session: &Session, args: MetadataSetArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    encode(&store.set_metadata(project, &args.key, &args.value)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeyArgs {
    key: String,
    project: Option<String>,
}

impl ToolArguments for KeyArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("key", &self.key)
    }
}

fn metadata_get(store: &Store, session: &Session, args: KeyArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    match store.metadata(project, &args.key)? {
        Some(entry) => encode(&entry),
        None => Ok(json!({"key": args.key, "value": null})),
    }
}

fn metadata_list(store: &Store, session: &Session, args: ProjectArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    encode(&store.list_metadata(project)?)
}

fn metadata_delete(store: &Store, session: &Session, args: KeyArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    store.delete_metadata(project, &args.key)?;
    Ok(json!({"deleted": true, "key": args.key}))
}

// === File tree ===

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FiletreeAnnotateArgs {
    path: String,
    note: String,
    is_dir: bool,
    project: Option<String>,
}

impl ToolArguments for FiletreeAnnotateArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("path", &self.path)?;
        require("note", &self.note)
    }
}

fn filetree_annotate(store: &Store, session: &Session, args: FiletreeAnnotateArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    encode(&store.annotate_file(project, &args.path, &args.note, args.is_dir)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PathArgs {
    path: String,
    project: Option<String>,
}

impl ToolArguments for PathArgs {}

fn filetree_get(store: &Store, session: &Session, args: PathArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    if args.path.is_empty() {
        encode(&store.list_file_annotations(project)?)
    } else {
        encode(&store.file_annotation(project, &args.path)?)
    }
}

fn filetree_delete(store: &Store, session: &Session, args: PathArgs) -> ToolResult {
    require("path", &args.path)?;
    let project = scope(store, session, args.project.as_deref())?;
    store.delete_file_annotation(project, &args.path)?;
    Ok(json!({"deleted": true, "path": args.path}))
}

// === Guidelines ===

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuidelineCreateArgs {
    category: String,
    title: String,
    content: String,
    #[serde(deserialize_with = "lenient::strings")]
    tags: Vec<String>,
    #[serde(deserialize_with = "lenient::integer")]
    priority: i64,
    project: Option<String>,
}

impl ToolArguments for GuidelineCreateArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("category", &self.category)?;
        require("title", &self.title)?;
        require("content", &self.content)
    }
}

fn guideline_create(store: &Store, session: &Session, args: GuidelineCreateArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    let new = NewGuideline {
        category: args.category,
        title: args.title,
        content: args.content,
        tags: args.tags,
        priority: args.priority,
    };
    encode(&store.create_guideline(project, &new)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuidelineUpdateArgs {
    #[serde(deserialize_with = "lenient::integer")]
    id: i64,
    content: Option<String>,
    #[serde(deserialize_with = "lenient::optional_strings")]
    tags: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::optional_integer")]
    priority: Option<i64>,
}

impl ToolArguments for GuidelineUpdateArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require_id("id", self.id)
    }
}

fn guideline_update(store: &Store, args: GuidelineUpdateArgs) -> ToolResult {
    let update = GuidelineUpdate {
        content: args.content,
        tags: args.tags,
        priority: args.priority,
    };
    encode(&store.update_guideline(args.id, &update)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuidelineListArgs {
    category: Option<String>,
    project: Option<String>,
}

impl ToolArguments for GuidelineListArgs {}

fn guideline_list(store: &Store, session: &Session, args: GuidelineListArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    let category = args.category.as_deref().filter(|c| !c.is_empty());
    encode(&store.list_guidelines(project, category)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuidelineSearchArgs {
    query: String,
    category: Option<String>,
    project: Option<String>,
}

impl ToolArguments for GuidelineSearchArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("query", &self.query)
    }
}

fn guideline_search(store: &Store, session: &Session, args: GuidelineSearchArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    let category = args.category.as_deref().filter(|c| !c.is_empty());
    encode(&store.search_guidelines(project, &args.query, category)?)
}

fn guideline_get(store: &Store, args: IdArgs) -> ToolResult {
    encode(&store.guideline(args.id)?)
}

fn guideline_delete(store: &Store, args: IdArgs) -> ToolResult {
    store.delete_guideline(args.id)?;
    deleted_id(args.id)
}

// === Projects ===

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectCreateArgs {
    slug: String,
    name: String,
    root_path: String,
}

impl ToolArguments for ProjectCreateArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("slug", &self.slug)
    }
}

fn project_create(store: &Store, args: ProjectCreateArgs) -> ToolResult {
    encode(&store.create_project(&args.slug, &args.name, &args.root_path)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SlugArgs {
    slug: String,
}

impl ToolArguments for SlugArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("slug", &self.slug)
    }
}

fn project_set_default(store: &Store, session: &mut Session, args: SlugArgs) -> ToolResult {
    let project = store.resolve_project(&args.slug)?;
    session.default_project = project.id;
    tracing::info!(project = %project.slug, id = project.id, "Session default project changed");
    Ok(json!({"default_project": project}))
}

// === Bookmarks ===

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BookmarkCreateArgs {
    url: String,
    title: String,
    excerpt: String,
    note: String,
    doc_type: String,
    page_or_section: String,
    #[serde(deserialize_with = "lenient::strings")]
    tags: Vec<String>,
    project: Option<String>,
}

impl ToolArguments for BookmarkCreateArgs {
    fn validate(&self) -> Result<(), ArgumentError> {
        require("url", &self.url)?;
        require("title", &self.title)
    }
}

fn bookmark_create(store: &Store, session: &Session, args: BookmarkCreateArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    let new = NewBookmark {
        url: args.url,
        title: args.title,
        excerpt: args.excerpt,
        note: args.note,
        doc_type: args.doc_type,
        page_or_section: args.page_or_section,
        tags: args.tags,
    };
    encode(&store.create_bookmark(project, &new)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BookmarkSearchArgs {
    query: Option<String>,
    #[serde(deserialize_with = "lenient::strings")]
    tags: Vec<String>,
    doc_type: Option<String>,
    project: Option<String>,
}

impl ToolArguments for BookmarkSearchArgs {}

fn bookmark_search(store: &Store, session: &Session, args: BookmarkSearchArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    let filter = BookmarkQuery {
        text: args.query,
        tags: args.tags,
        doc_type: args.doc_type,
    };
    encode(&store.search_bookmarks(project, &filter)?)
}

fn bookmark_list(store: &Store, session: &Session, args: ProjectArgs) -> ToolResult {
    let project = scope(store, session, args.project.as_deref())?;
    encode(&store.list_bookmarks(project)?)
}

fn bookmark_delete(store: &Store, args: IdArgs) -> ToolResult {
    store.delete_bookmark(args.id)?;
    deleted_id(args.id)
}
