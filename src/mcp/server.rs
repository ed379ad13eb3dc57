//! MCP server implementation for the knowledge store.
//!
//! This module implements the request loop:
//!
//! 1. **Reading**: take the next bounded frame from the transport
//! 2. **Dispatching**: decode it, route it by [`Method`], and produce at most
//!    one response
//! 3. **Stopped**: end of input, a read failure, or a shutdown signal
//!
//! # Fault Isolation
//!
//! Requests are handled strictly one at a time. Each dispatch runs inside
//! [`fault::contain`], so a panicking handler costs one Internal error
//! response rather than the session. The loop itself runs as a Tokio task;
//! [`McpServer::run`] supervises it and reports a task that died instead of
//! letting the process vanish.

use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinError;

use crate::mcp::fault;
use crate::mcp::protocol::{
    self, Method, Request, RequestId, Response, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::router::{self, Session};
use crate::mcp::tools::{self, ToolCallResult, ToolName};
use crate::mcp::transport::{Frame, Transport};
use crate::store::Store;

/// Where the request loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for the next frame.
    Reading,
    /// Handling a frame.
    Dispatching,
    /// The loop has ended.
    Stopped,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session. It never does.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
///
/// Only used for logging; the server answers with its own protocol version
/// whatever the client asks for.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// The MCP server over a transport and a knowledge store.
pub struct McpServer<R, W> {
    /// Current loop state.
    state: ServerState,
    /// The transport layer.
    transport: Transport<R, W>,
    /// Backing store.
    store: Arc<Store>,
    /// Per-session state (default project).
    session: Session,
}

impl<R, W> McpServer<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a new MCP server.
    #[must_use]
    pub const fn new(transport: Transport<R, W>, store: Arc<Store>, session: Session) -> Self {
        Self {
            state: ServerState::Reading,
            transport,
            store,
            session,
        }
    }

    /// Returns the current loop state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the current session.
    #[must_use]
    pub const fn session(&self) -> Session {
        self.session
    }

    /// Runs the server until end of input or a shutdown signal.
    ///
    /// The request loop runs in its own task. If that task panics, the panic
    /// is logged and returned as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the transport fails, signal
    /// handlers cannot be installed, or the request loop panics.
    #[cfg(unix)]
    pub async fn run(self) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let mut serve = tokio::spawn(self.serve());

        tokio::select! {
            joined = &mut serve => supervise(joined),

            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
                serve.abort();
                Ok(())
            }

            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
                serve.abort();
                Ok(())
            }
        }
    }

    /// Runs the server until end of input or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the transport fails, the Ctrl+C
    /// handler cannot be installed, or the request loop panics.
    #[cfg(windows)]
    pub async fn run(self) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut serve = tokio::spawn(self.serve());

        tokio::select! {
            joined = &mut serve => supervise(joined),

            signal = &mut ctrl_c => {
                signal?;
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                serve.abort();
                Ok(())
            }
        }
    }

    /// The request loop: read, dispatch, write, repeat.
    async fn serve(mut self) -> io::Result<()> {
        tracing::info!("Server ready, waiting for requests");

        let result = self.serve_frames().await;
        self.state = ServerState::Stopped;
        match &result {
            Ok(()) => tracing::info!("Input closed, stopping"),
            Err(e) => tracing::error!(error = %e, "Transport failed, stopping"),
        }
        result
    }

    async fn serve_frames(&mut self) -> io::Result<()> {
        loop {
            self.state = ServerState::Reading;
            let Some(frame) = self.transport.reader.next_frame().await? else {
                return Ok(());
            };

            self.state = ServerState::Dispatching;
            let response = match frame {
                Frame::Message(bytes) => self.handle_frame(&bytes),
                Frame::Oversized { limit } => {
                    tracing::warn!(limit, "Discarded oversized frame");
                    Some(Response::invalid_request(format!(
                        "message too large: exceeds {limit} bytes"
                    )))
                }
            };

            if let Some(response) = response {
                self.transport.writer.write(&response).await?;
            }
        }
    }

    /// Decodes and handles one frame, returning the response to send (if any).
    fn handle_frame(&mut self, bytes: &[u8]) -> Option<Response> {
        match protocol::parse_frame(bytes) {
            Ok(request) => self.contained(request, Self::dispatch),
            Err(response) => {
                tracing::warn!(
                    error = ?response.error_data().and_then(|e| e.data.as_ref()),
                    "Rejected malformed frame"
                );
                Some(response)
            }
        }
    }

    /// Runs `handler` for `request`, converting a panic into an Internal error.
    fn contained<F>(&mut self, request: Request, handler: F) -> Option<Response>
    where
        F: FnOnce(&mut Self, Request) -> Option<Response>,
    {
        let id = request.id.clone();
        let method = request.method.clone();

        match fault::contain(|| handler(self, request)) {
            Ok(response) => response,
            Err(fault) => {
                tracing::error!(%method, id = ?id, %fault, "Handler panicked");
                Some(Response::internal_error(id, fault.to_string()))
            }
        }
    }

    /// Routes a validated request by method.
    fn dispatch(&mut self, request: Request) -> Option<Response> {
        let Request { id, method, params } = request;
        tracing::debug!(%method, id = ?id, "Handling request");

        match method {
            Method::Initialize => Some(Self::handle_initialize(id, params.as_ref())),
            Method::ToolsList => Some(Self::handle_tools_list(id)),
            Method::ToolsCall => Some(self.handle_tools_call(id, params)),
            Method::Initialized => {
                tracing::info!("Client initialised");
                None
            }
            Method::Unknown(name) => {
                tracing::warn!(method = %name, "Method not found");
                Some(Response::method_not_found(id, &name))
            }
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(id: Option<RequestId>, params: Option<&Value>) -> Response {
        let params = params
            .and_then(|p| serde_json::from_value::<InitializeParams>(p.clone()).ok())
            .unwrap_or_default();

        let client = params.client_info.as_ref();
        tracing::info!(
            client = client.map_or("unknown", |c| c.name.as_str()),
            client_version = client.and_then(|c| c.version.as_deref()),
            requested_version = params.protocol_version.as_deref(),
            "Initialising session"
        );

        let result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Response::success(id, result)
    }

    /// Handles the tools/list request.
    fn handle_tools_list(id: Option<RequestId>) -> Response {
        Response::success(id, json!({ "tools": tools::definitions() }))
    }

    /// Handles the tools/call request.
    fn handle_tools_call(&mut self, id: Option<RequestId>, params: Option<Value>) -> Response {
        let Some(Value::Object(mut params)) = params else {
            return Response::invalid_params(id, "params must be an object");
        };

        let Some(name) = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            return Response::invalid_params(id, "missing tool name");
        };

        let arguments = match params.remove("arguments") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(arguments @ Value::Object(_)) => arguments,
            Some(_) => return Response::invalid_params(id, "arguments must be an object"),
        };

        let Ok(tool) = name.parse::<ToolName>() else {
            tracing::warn!(tool = %name, "Unknown tool");
            return Response::unknown_tool(id, &name);
        };

        let result = match router::call_tool(&self.store, &mut self.session, tool, arguments) {
            Ok(value) => {
                tracing::debug!(%tool, "Tool call succeeded");
                ToolCallResult::text(value.to_string())
            }
            Err(e) => {
                tracing::info!(%tool, error = %e, "Tool call failed");
                ToolCallResult::error(format!("Error: {e}"))
            }
        };

        match serde_json::to_value(&result) {
            Ok(value) => Response::success(id, value),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise tool call result");
                Response::internal_error(id, "failed to serialise result")
            }
        }
    }
}

/// Classifies the outcome of the request-loop task.
fn supervise(joined: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let message = fault::panic_message(e.into_panic().as_ref());
            tracing::error!(panic = %message, "Request loop panicked");
            Err(io::Error::other(format!("request loop panicked: {message}")))
        }
        Err(e) => {
            tracing::error!(error = %e, "Request loop was cancelled");
            Err(io::Error::other("request loop was cancelled"))
        }
    }
}
