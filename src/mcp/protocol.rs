//! JSON-RPC 2.0 message types for the MCP protocol.
//!
//! This module defines the request and response shapes exchanged with the
//! client, and [`parse_frame`], which turns one raw frame into a validated
//! [`Request`] or the error [`Response`] that must be sent instead.
//!
//! # Validation Order
//!
//! 1. The frame must be valid UTF-8 JSON (otherwise **Parse error**).
//! 2. The value must be an object.
//! 3. `jsonrpc`, when present, must be `"2.0"`.
//! 4. Unless the method is `notifications/initialized`, `id` must be a
//!    non-empty string or a number.
//! 5. `method` must be a non-empty string.
//!
//! Failures in steps 2-5 are **Invalid Request** errors. Every codec
//! failure is answered with a `null` id, because the request could not be
//! identified.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "mcp-memories";

/// Method name of the client's post-handshake notification.
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";

/// A JSON-RPC 2.0 request ID.
///
/// Numbers are kept as [`serde_json::Number`] so the echoed id is exactly the
/// one the client sent, floats included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(Number),
    /// String request ID.
    String(String),
}

impl RequestId {
    /// Validates the raw `id` member of a request.
    fn from_member(member: Option<&Value>) -> Result<Self, &'static str> {
        match member {
            None | Some(Value::Null) => Err("missing id"),
            Some(Value::String(s)) if s.is_empty() => Err("id must not be empty"),
            Some(Value::String(s)) => Ok(Self::String(s.clone())),
            Some(Value::Number(n)) => Ok(Self::Number(n.clone())),
            Some(_) => Err("id must be string or number"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// The methods the server understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `notifications/initialized` (never answered)
    Initialized,
    /// Anything else; answered with Method not found.
    Unknown(String),
}

impl Method {
    /// Classifies a wire method name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "initialize" => Self::Initialize,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            INITIALIZED_NOTIFICATION => Self::Initialized,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the wire name of this method.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::Initialized => INITIALIZED_NOTIFICATION,
            Self::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated incoming message.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request identifier. Always present unless `method` is
    /// [`Method::Initialized`].
    pub id: Option<RequestId>,
    /// The method to invoke.
    pub method: Method,
    /// Optional parameters for the method.
    pub params: Option<Value>,
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// A JSON-RPC 2.0 response: exactly one of `result` or `error`.
///
/// The `id` is serialised as `null` when the request could not be identified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorData>,
}

impl Response {
    /// Creates a success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn error(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Parse error for an unreadable frame.
    #[must_use]
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::error(
            None,
            JsonRpcErrorData::from_code(ErrorCode::ParseError)
                .with_data(Value::String(detail.into())),
        )
    }

    /// Invalid Request error for a frame that could not be identified.
    #[must_use]
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::error(
            None,
            JsonRpcErrorData::from_code(ErrorCode::InvalidRequest)
                .with_data(Value::String(detail.into())),
        )
    }

    /// Method not found, echoing the method name.
    #[must_use]
    pub fn method_not_found(id: Option<RequestId>, method: &str) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::from_code(ErrorCode::MethodNotFound).with_data(method),
        )
    }

    /// Invalid params.
    #[must_use]
    pub fn invalid_params(id: Option<RequestId>, detail: impl Into<String>) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::from_code(ErrorCode::InvalidParams)
                .with_data(Value::String(detail.into())),
        )
    }

    /// Invalid params for a `tools/call` naming a tool that does not exist.
    #[must_use]
    pub fn unknown_tool(id: Option<RequestId>, name: &str) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, "Unknown tool")
                .with_data(format!("unknown tool: {name}")),
        )
    }

    /// Internal error.
    #[must_use]
    pub fn internal_error(id: Option<RequestId>, detail: impl Into<String>) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::from_code(ErrorCode::InternalError)
                .with_data(Value::String(detail.into())),
        )
    }

    /// Returns the echoed request id.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// Returns the result, if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error, if this is an error response.
    #[must_use]
    pub const fn error_data(&self) -> Option<&JsonRpcErrorData> {
        self.error.as_ref()
    }
}

/// Decodes and validates one frame.
///
/// # Errors
///
/// Returns the error response to send when the frame is not valid JSON or is
/// not a well-formed request.
pub fn parse_frame(frame: &[u8]) -> Result<Request, Response> {
    let value: Value = serde_json::from_slice(frame)
        .map_err(|e| Response::parse_error(e.to_string()))?;

    let Value::Object(mut obj) = value else {
        return Err(Response::invalid_request("request must be a JSON object"));
    };

    if let Some(version) = obj.get("jsonrpc") {
        if version.as_str() != Some("2.0") {
            return Err(Response::invalid_request("jsonrpc must be \"2.0\""));
        }
    }

    let method_name = obj.get("method").and_then(Value::as_str);
    let id = if method_name == Some(INITIALIZED_NOTIFICATION) {
        None
    } else {
        let id = RequestId::from_member(obj.get("id"))
            .map_err(Response::invalid_request)?;
        Some(id)
    };

    let method = match method_name {
        Some(name) if !name.is_empty() => Method::parse(name),
        _ => return Err(Response::invalid_request("method must be a non-empty string")),
    };

    Ok(Request {
        id,
        method,
        params: obj.remove("params"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected(frame: &str) -> Value {
        let response = parse_frame(frame.as_bytes()).unwrap_err();
        serde_json::to_value(&response).unwrap()
    }

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let req = parse_frame(json.as_bytes()).unwrap();

        assert_eq!(req.id, Some(RequestId::from(1)));
        assert_eq!(req.method, Method::Initialize);
        assert_eq!(req.params, Some(json!({})));
    }

    #[test]
    fn parse_initialized_notification_without_id() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let req = parse_frame(json.as_bytes()).unwrap();

        assert_eq!(req.method, Method::Initialized);
        assert!(req.id.is_none());
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "tools/list"}"#;
        let req = parse_frame(json.as_bytes()).unwrap();
        assert_eq!(req.id, Some(RequestId::String("abc-123".to_string())));
    }

    #[test]
    fn float_id_is_echoed_verbatim() {
        let req = parse_frame(br#"{"jsonrpc":"2.0","id":2.5,"method":"tools/list"}"#).unwrap();
        let response = Response::success(req.id, json!({}));
        let text = serde_json::to_string(&response).unwrap();
        assert!(text.contains(r#""id":2.5"#));
    }

    #[test]
    fn unknown_method_still_parses() {
        let req = parse_frame(br#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
        assert_eq!(req.method, Method::Unknown("ping".to_string()));
    }

    #[test]
    fn parse_invalid_json() {
        let err = rejected("not valid json");
        assert_eq!(err["error"]["code"], ErrorCode::ParseError.code());
        assert_eq!(err["id"], Value::Null);
        assert!(err["error"]["data"].is_string());
    }

    #[test]
    fn parse_invalid_utf8() {
        let response = parse_frame(b"{\"id\":1,\"method\":\"\xff\"}").unwrap_err();
        assert_eq!(
            response.error_data().map(|e| e.code),
            Some(ErrorCode::ParseError.code())
        );
    }

    #[test]
    fn non_object_is_invalid_request() {
        for frame in ["[1,2]", "42", "\"hi\""] {
            let err = rejected(frame);
            assert_eq!(
                err["error"]["code"],
                ErrorCode::InvalidRequest.code(),
                "{frame}"
            );
            assert_eq!(err["id"], Value::Null);
        }
    }

    #[test]
    fn wrong_jsonrpc_version() {
        let err = rejected(r#"{"jsonrpc": "1.0", "id": 1, "method": "tools/list"}"#);
        assert_eq!(err["error"]["code"], ErrorCode::InvalidRequest.code());
        assert_eq!(err["id"], Value::Null);
    }

    #[test]
    fn missing_jsonrpc_is_tolerated() {
        assert!(parse_frame(br#"{"id": 1, "method": "tools/list"}"#).is_ok());
    }

    #[test]
    fn bad_ids_are_rejected() {
        let cases = [
            (r#"{"jsonrpc":"2.0","method":"tools/list"}"#, "missing id"),
            (r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#, "missing id"),
            (r#"{"jsonrpc":"2.0","id":"","method":"tools/list"}"#, "id must not be empty"),
            (r#"{"jsonrpc":"2.0","id":true,"method":"tools/list"}"#, "id must be string or number"),
            (r#"{"jsonrpc":"2.0","id":{},"method":"tools/list"}"#, "id must be string or number"),
            (r#"{"jsonrpc":"2.0","id":[1],"method":"tools/list"}"#, "id must be string or number"),
        ];
        for (frame, detail) in cases {
            let err = rejected(frame);
            assert_eq!(
                err["error"]["code"],
                ErrorCode::InvalidRequest.code(),
                "{frame}"
            );
            assert_eq!(err["error"]["data"], detail, "{frame}");
            assert_eq!(err["id"], Value::Null);
        }
    }

    #[test]
    fn missing_or_empty_method() {
        for frame in [
            r#"{"jsonrpc":"2.0","id":1}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":""}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":5}"#,
        ] {
            let err = rejected(frame);
            assert_eq!(
                err["error"]["code"],
                ErrorCode::InvalidRequest.code(),
                "{frame}"
            );
        }
    }

    #[test]
    fn serialise_success_response() {
        let response = Response::success(Some(RequestId::from(1)), json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#);
    }

    #[test]
    fn serialise_error_response_with_null_id() {
        let response = Response::parse_error("expected value");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {"code": -32700, "message": "Parse error", "data": "expected value"}
            })
        );
    }

    #[test]
    fn method_not_found_echoes_method() {
        let response = Response::method_not_found(Some(RequestId::from(3)), "unknown/method");
        let error = response.error_data().unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.data, Some(json!("unknown/method")));
        assert!(response.result().is_none());
    }

    #[test]
    fn unknown_tool_error_shape() {
        let response = Response::unknown_tool(Some(RequestId::from(2)), "does_not_exist");
        let error = response.error_data().unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "Unknown tool");
        assert_eq!(error.data, Some(json!("unknown tool: does_not_exist")));
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::from(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
