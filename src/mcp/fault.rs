//! Panic containment for request handling.
//!
//! [`contain`] is the inner fault boundary: it runs one request's dispatch and
//! turns a panic into a [`Fault`] the server answers with an Internal error.
//! The outer boundary (the supervised serve task) lives in
//! [`McpServer::run`](crate::mcp::McpServer::run) and reuses
//! [`panic_message`] to describe a task that died.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

/// A panic caught while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("panic: {message}")]
pub struct Fault {
    /// The panic payload, rendered as text.
    pub message: String,
}

/// Runs `f`, catching any panic it raises.
///
/// # Errors
///
/// Returns a [`Fault`] carrying the panic message if `f` panics.
pub fn contain<T>(f: impl FnOnce() -> T) -> Result<T, Fault> {
    // The store lock does not poison and handlers hold no other shared state
    // across the call, so unwinding out of `f` leaves nothing half-updated.
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| Fault {
        message: panic_message(payload.as_ref()),
    })
}

/// Extracts the message from a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
