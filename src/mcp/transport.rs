//! stdio transport for the MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! Reading is bounded: a frame longer than the configured limit is drained up
//! to its terminating newline and reported as [`Frame::Oversized`], so the
//! stream stays in sync with the client. The limit applies to the trimmed
//! frame; surrounding whitespace, including the `\r` of a CRLF terminator,
//! does not count toward it.
//!
//! The reader and writer are generic over Tokio's I/O traits so the server can
//! be driven from in-memory buffers in tests.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::mcp::protocol::Response;

/// Default upper bound on a single frame, in bytes (8 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;

/// One unit of input from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete frame, trimmed of surrounding whitespace. Never empty.
    Message(Vec<u8>),
    /// A frame that exceeded the size bound and was discarded.
    Oversized {
        /// The bound that was exceeded.
        limit: usize,
    },
}

/// Reads newline-delimited frames with a size bound.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Creates a reader that rejects frames longer than `max_bytes`.
    pub fn new(reader: R, max_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_bytes,
        }
    }

    /// Reads the next non-blank frame.
    ///
    /// Returns `None` at end of stream. A final frame without a trailing
    /// newline is still returned.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the underlying stream fails.
    pub async fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let Some(overflowed) = self.read_line(&mut line).await? else {
                return Ok(None);
            };

            if overflowed {
                return Ok(Some(Frame::Oversized {
                    limit: self.max_bytes,
                }));
            }

            let trimmed = line.trim_ascii();
            if !trimmed.is_empty() {
                return Ok(Some(Frame::Message(trimmed.to_vec())));
            }
        }
    }

    /// Reads one line (without its `\n`) into `line`.
    ///
    /// Returns `None` if the stream was already at its end, otherwise whether
    /// the line exceeded the bound. Leading whitespace is skipped and
    /// whitespace past the bound is dropped, so only a non-whitespace byte
    /// beyond `max_bytes` overflows. Once the bound is exceeded the rest of
    /// the line is consumed without being buffered.
    async fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<Option<bool>> {
        let mut read_any = false;
        let mut overflowed = false;

        loop {
            let (used, complete) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    break;
                }
                read_any = true;

                let (end, complete) = match available.iter().position(|&b| b == b'\n') {
                    Some(pos) => (pos, true),
                    None => (available.len(), false),
                };

                if !overflowed {
                    let mut chunk = &available[..end];
                    if line.is_empty() {
                        chunk = chunk.trim_ascii_start();
                    }
                    let room = self.max_bytes - line.len();
                    if chunk.len() <= room {
                        line.extend_from_slice(chunk);
                    } else {
                        let (fits, rest) = chunk.split_at(room);
                        if rest.iter().all(u8::is_ascii_whitespace) {
                            line.extend_from_slice(fits);
                        } else {
                            overflowed = true;
                            line.clear();
                        }
                    }
                }

                (end + usize::from(complete), complete)
            };

            self.reader.consume(used);
            if complete {
                break;
            }
        }

        Ok(read_any.then_some(overflowed))
    }
}

/// Writes newline-terminated responses to a shared output stream.
///
/// Each response is serialised into one buffer and written with a single
/// `write_all` while holding the stream's lock, so clones of the writer can
/// never interleave partial lines.
pub struct ResponseWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for ResponseWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    /// Wraps an output stream.
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Writes a response followed by a newline, then flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write(&self, response: &Response) -> io::Result<()> {
        let mut buf = serde_json::to_vec(response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // stdio framing: messages must not contain embedded newlines
        debug_assert!(
            !buf.contains(&b'\n'),
            "JSON message must not contain embedded newlines"
        );
        buf.push(b'\n');

        let mut writer = self.inner.lock().await;
        writer.write_all(&buf).await?;
        writer.flush().await
    }
}

/// A bounded frame reader paired with a response writer.
pub struct Transport<R, W> {
    /// Incoming frames.
    pub reader: FrameReader<R>,
    /// Outgoing responses.
    pub writer: ResponseWriter<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Transport<R, W> {
    /// Creates a transport over arbitrary streams.
    pub fn new(reader: R, writer: W, max_message_bytes: usize) -> Self {
        Self {
            reader: FrameReader::new(reader, max_message_bytes),
            writer: ResponseWriter::new(writer),
        }
    }
}

/// The transport over the process's stdin and stdout.
pub type StdioTransport = Transport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport over stdin and stdout.
    #[must_use]
    pub fn stdio(max_message_bytes: usize) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), max_message_bytes)
    }
}
