//! Transport contract.
//!
//! A [`Transport`] performs the actual network I/O. Opening a resource
//! yields a boxed [`Connection`], which the caller owns exclusively;
//! dropping the box closes the session.
//!
//! Protocol work (TLS, redirects, chunked decoding, pooling) belongs to the
//! transport implementation. The stream layer above only sees bytes, a
//! best-effort seek, and an optional content length.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use urlstream_core::PairList;

/// Progress hook invoked by transports while sending a request body.
///
/// Receives `(bytes_sent, total_bytes)`. Returning `false` asks the
/// transport to abort; the abort surfaces as [`TransportError::Cancelled`].
pub type ProgressCallback = Arc<dyn Fn(u64, u64) -> bool + Send + Sync>;

/// Request method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    /// Parameters travel in the query string.
    #[default]
    Get,
    /// Parameters travel in the request body.
    Post,
}

impl RequestMethod {
    /// The method name as sent on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }

    /// Returns true for POST.
    #[must_use]
    pub fn is_post(self) -> bool {
        self == Self::Post
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a transport needs to open a resource.
#[derive(Clone, Copy)]
pub struct OpenRequest<'a> {
    /// Address to fetch. Includes the query string for GET.
    pub target: &'a str,
    /// Header block, one `Name: value` per line, line-terminated.
    pub headers: &'a str,
    /// Body bytes, sent for POST.
    pub body: &'a [u8],
    /// Request method.
    pub method: RequestMethod,
    /// Optional progress and cancellation hook.
    pub progress: Option<&'a ProgressCallback>,
    /// Time limit for establishing the connection; `None` means the
    /// transport's default.
    pub timeout: Option<Duration>,
}

impl OpenRequest<'_> {
    /// Report progress through the hook, if any.
    ///
    /// Returns `false` when the hook asks for the transfer to stop.
    #[must_use]
    pub fn report_progress(&self, sent: u64, total: u64) -> bool {
        self.progress.is_none_or(|callback| callback(sent, total))
    }
}

impl fmt::Debug for OpenRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRequest")
            .field("target", &self.target)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("method", &self.method)
            .field("has_progress", &self.progress.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Errors raised when a transport cannot open a resource.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be expressed by this transport.
    #[error("invalid request for {target}: {message}")]
    InvalidRequest { target: String, message: String },

    /// Connecting or sending the request failed.
    #[error("connection to {target} failed: {message}")]
    ConnectionFailed { target: String, message: String },

    /// The connection did not complete in time.
    #[error("timed out opening {target}")]
    Timeout { target: String },

    /// The server answered with a non-success status.
    #[error("{target} answered with status {status}")]
    Status { target: String, status: u16 },

    /// The progress hook asked for the transfer to stop.
    #[error("transfer to {target} cancelled by progress callback")]
    Cancelled { target: String },

    /// Any other I/O failure.
    #[error("I/O error opening {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Short error code for logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "TRANSPORT_INVALID_REQUEST",
            Self::ConnectionFailed { .. } => "TRANSPORT_CONNECTION",
            Self::Timeout { .. } => "TRANSPORT_TIMEOUT",
            Self::Status { .. } => "TRANSPORT_STATUS",
            Self::Cancelled { .. } => "TRANSPORT_CANCELLED",
            Self::Io { .. } => "TRANSPORT_IO",
        }
    }
}

/// Opens resources.
pub trait Transport: Send + Sync {
    /// Open the resource described by `request`.
    fn open(&self, request: &OpenRequest<'_>) -> Result<Box<dyn Connection>, TransportError>;
}

/// An open transport session.
///
/// Dropping the connection closes it.
pub trait Connection: Send {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end of resource.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Move the read offset to `offset` and return the offset actually reached.
    ///
    /// A connection that cannot reach `offset` must leave its read offset
    /// where it was and return that.
    fn seek(&mut self, offset: u64) -> u64;

    /// Total length of the resource, if known.
    fn content_length(&self) -> Option<u64>;

    /// Response headers reported by the server.
    fn response_headers(&self) -> PairList;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn open(&self, request: &OpenRequest<'_>) -> Result<Box<dyn Connection>, TransportError> {
        (**self).open(request)
    }
}
