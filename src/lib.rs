//! mcp-memories: MCP server giving AI assistants a persistent, project-scoped memory
//!
//! The server speaks newline-delimited JSON-RPC 2.0 over stdio and exposes a
//! fixed catalog of tools backed by a local SQLite database.
//!
//! # Architecture
//!
//! The server is deliberately small and sequential:
//!
//! - **Transport**: bounded frame reader and single-write response writer
//! - **Dispatch**: closed set of methods, one request at a time, each inside
//!   a panic boundary
//! - **Tools**: typed argument structs routed to the knowledge store
//!
//! The knowledge store keeps memories, tasks, metadata, file annotations,
//! guidelines and bookmarks, all scoped to a project.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`store`]: SQLite-backed knowledge store

pub mod config;
pub mod error;
pub mod mcp;
pub mod store;
