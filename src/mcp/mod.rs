//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes the knowledge store as MCP tools. The server
//! communicates over stdio using newline-delimited JSON-RPC 2.0 messages and
//! handles one request at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│   Router    │    │
//! │   │  (framing)  │    │ (dispatch)  │    │  (tools)    │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Protocol   │    │   Fault     │    │   Store     │    │
//! │   │ (JSON-RPC)  │    │ (contain)   │    │  (SQLite)   │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod fault;
pub mod protocol;
pub mod router;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{Response, MCP_PROTOCOL_VERSION, SERVER_NAME};
pub use router::Session;
pub use server::McpServer;
pub use tools::ToolName;
pub use transport::{StdioTransport, Transport, DEFAULT_MAX_MESSAGE_BYTES};
