//! Seekable resource streams.
//!
//! A [`ResourceStream`] reads one remote resource through a [`Transport`].
//! It owns exactly one [`Connection`] at a time and closes it when dropped.
//!
//! # States
//!
//! ```text
//! open() ──► Open ──read()==0──► Exhausted ──set_position()──► Open
//!   │          │
//!   │          └──backward seek the transport refuses──► reopen ──► Open
//!   └──transport or body failure──► Error (reads return 0)
//! ```
//!
//! # Seeking
//!
//! The transport is asked to seek first. When it cannot, a backward target
//! closes the session and opens a fresh one against the same request, and
//! the stream then reads and discards bytes up to the target. Forward
//! targets are reached by discarding bytes on the current session. Callers
//! doing heavy random access should buffer above this stream.
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Seek, SeekFrom};
//! use std::sync::Arc;
//! use urlstream_core::Url;
//! use urlstream_http::{MemoryTransport, OpenOptions, ResourceStream};
//!
//! let transport = Arc::new(MemoryTransport::new("hello, world"));
//! let url = Url::parse("http://example.com/greeting");
//! let mut stream = ResourceStream::open(&url, OpenOptions::new(), transport);
//! assert!(!stream.is_error());
//!
//! stream.seek(SeekFrom::Start(7))?;
//! let mut rest = String::new();
//! stream.read_to_string(&mut rest)?;
//! assert_eq!(rest, "world");
//! assert!(stream.is_exhausted());
//! # Ok::<(), std::io::Error>(())
//! ```

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use urlstream_core::{FormError, PairList, RequestBodyBuilder, Url};

use crate::headers::terminate_header_block;
use crate::transport::{Connection, OpenRequest, ProgressCallback, RequestMethod, Transport, TransportError};

/// Default scratch buffer size for forward skips (16KB).
pub const DEFAULT_SKIP_CHUNK_SIZE: usize = 16 * 1024;

// ============================================================================
// Options
// ============================================================================

/// Options for opening a [`ResourceStream`].
#[derive(Clone)]
pub struct OpenOptions {
    method: RequestMethod,
    extra_headers: String,
    timeout: Option<Duration>,
    progress: Option<ProgressCallback>,
    body_builder: RequestBodyBuilder,
    skip_chunk_size: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            method: RequestMethod::Get,
            extra_headers: String::new(),
            timeout: None,
            progress: None,
            body_builder: RequestBodyBuilder::default(),
            skip_chunk_size: DEFAULT_SKIP_CHUNK_SIZE,
        }
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("method", &self.method)
            .field("extra_headers", &self.extra_headers)
            .field("timeout", &self.timeout)
            .field("has_progress", &self.progress.is_some())
            .field("skip_chunk_size", &self.skip_chunk_size)
            .finish_non_exhaustive()
    }
}

impl OpenOptions {
    /// Create options for a GET request with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for options with [`RequestMethod::Post`].
    #[must_use]
    pub fn post() -> Self {
        Self::default().with_method(RequestMethod::Post)
    }

    /// Set the request method.
    #[must_use]
    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    /// Append a raw block of header lines.
    #[must_use]
    pub fn with_extra_headers(mut self, headers: impl AsRef<str>) -> Self {
        self.extra_headers.push_str(headers.as_ref());
        self
    }

    /// Append a single `name: value` header line.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if !self.extra_headers.is_empty() {
            terminate_header_block(&mut self.extra_headers);
        }
        self.extra_headers.push_str(name);
        self.extra_headers.push_str(": ");
        self.extra_headers.push_str(value);
        self.extra_headers.push_str("\r\n");
        self
    }

    /// Set the time limit handed to the transport when opening.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Install a progress hook. Returning `false` from it cancels the transfer.
    #[must_use]
    pub fn with_progress(mut self, callback: impl Fn(u64, u64) -> bool + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Use `builder` to produce POST bodies.
    #[must_use]
    pub fn with_body_builder(mut self, builder: RequestBodyBuilder) -> Self {
        self.body_builder = builder;
        self
    }

    /// Set the scratch buffer size used when skipping forward. Clamped to at least 1.
    #[must_use]
    pub fn with_skip_chunk_size(mut self, size: usize) -> Self {
        self.skip_chunk_size = size.max(1);
        self
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// Returns the extra header block.
    #[must_use]
    pub fn extra_headers(&self) -> &str {
        &self.extra_headers
    }

    /// Returns the open timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the forward-skip buffer size.
    #[must_use]
    pub fn skip_chunk_size(&self) -> usize {
        self.skip_chunk_size
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a stream ended up in the error state.
#[derive(Error, Debug)]
pub enum OpenError {
    /// The POST body could not be built.
    #[error("cannot build request body: {0}")]
    Body(#[from] FormError),

    /// The transport refused to open the resource.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ============================================================================
// Stream
// ============================================================================

/// A seekable, read-only stream over one remote resource.
pub struct ResourceStream {
    transport: Arc<dyn Transport>,
    target: String,
    headers: String,
    body: Vec<u8>,
    method: RequestMethod,
    progress: Option<ProgressCallback>,
    timeout: Option<Duration>,
    skip_chunk_size: usize,
    connection: Option<Box<dyn Connection>>,
    open_error: Option<OpenError>,
    response_headers: PairList,
    position: u64,
    finished: bool,
}

impl ResourceStream {
    /// Open `url` through `transport`.
    ///
    /// GET requests carry the parameters in the query string. POST requests
    /// go to the base address, with parameters, POST data and uploads in the
    /// body built by the options' [`RequestBodyBuilder`].
    ///
    /// This never fails outright: check [`is_error`](Self::is_error) before
    /// relying on the stream.
    #[must_use]
    pub fn open(url: &Url, options: OpenOptions, transport: Arc<dyn Transport>) -> Self {
        let OpenOptions {
            method,
            extra_headers,
            timeout,
            progress,
            body_builder,
            skip_chunk_size,
        } = options;

        let target = url.to_url_string(!method.is_post());
        let mut headers = String::new();
        let mut body = Vec::new();
        let mut open_error = None;

        if method.is_post() {
            match body_builder.build(url) {
                Ok(request) => (headers, body) = request.into_parts(),
                Err(err) => {
                    tracing::warn!(url = %target, error = %err, "cannot build POST body");
                    open_error = Some(OpenError::from(err));
                }
            }
        }

        headers.push_str(&extra_headers);
        terminate_header_block(&mut headers);

        let mut stream = Self {
            transport,
            target,
            headers,
            body,
            method,
            progress,
            timeout,
            skip_chunk_size,
            connection: None,
            open_error,
            response_headers: PairList::new(),
            position: 0,
            finished: false,
        };

        if stream.open_error.is_none() {
            stream.connect();
        }
        stream
    }

    /// Returns true if no transport session is open.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.connection.is_none()
    }

    /// The reason the stream is in the error state, if known.
    #[must_use]
    pub fn open_error(&self) -> Option<&OpenError> {
        self.open_error.as_ref()
    }

    pub(crate) fn take_open_error(&mut self) -> Option<OpenError> {
        self.open_error.take()
    }

    /// Returns true once a read has returned no data.
    ///
    /// Stays true until a seek.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.finished
    }

    /// Current read offset.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total length of the resource, if the transport knows it.
    #[must_use]
    pub fn total_length(&self) -> Option<u64> {
        self.connection.as_ref().and_then(|c| c.content_length())
    }

    /// The address the request was sent to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// The header block sent with each (re)open.
    #[must_use]
    pub fn request_headers(&self) -> &str {
        &self.headers
    }

    /// The body sent with each (re)open.
    #[must_use]
    pub fn request_body(&self) -> &[u8] {
        &self.body
    }

    /// Headers reported by the transport when the session was opened.
    #[must_use]
    pub fn response_headers(&self) -> &PairList {
        &self.response_headers
    }

    /// Move the read offset to `wanted`.
    ///
    /// Returns true if the stream ended up exactly at `wanted`. It may fall
    /// short when the resource is shorter or the reopen fails; in that case
    /// [`position`](Self::position) tells where it stopped.
    pub fn set_position(&mut self, wanted: u64) -> bool {
        if wanted == self.position {
            return true;
        }

        self.finished = false;

        let Some(connection) = self.connection.as_mut() else {
            return false;
        };

        if connection.seek(wanted) == wanted {
            self.position = wanted;
            return true;
        }

        if wanted < self.position {
            tracing::debug!(
                url = %self.target,
                from = self.position,
                to = wanted,
                "transport cannot seek backwards, reopening"
            );
            self.reopen();
        }

        let remaining = wanted - self.position;
        self.skip_next_bytes(remaining);
        self.position == wanted
    }

    /// Read and discard up to `count` bytes.
    ///
    /// Returns the number of bytes actually skipped.
    pub fn skip_next_bytes(&mut self, count: u64) -> u64 {
        if count == 0 {
            return 0;
        }

        let scratch_len = usize::try_from(count).map_or(self.skip_chunk_size, |c| c.min(self.skip_chunk_size));
        let mut scratch = vec![0u8; scratch_len];
        let mut skipped = 0u64;

        while skipped < count {
            let want = usize::try_from(count - skipped).map_or(scratch_len, |r| r.min(scratch_len));
            let n = self.read_chunk(&mut scratch[..want]);
            if n == 0 {
                break;
            }
            skipped += u64::try_from(n).unwrap_or(u64::MAX);
        }

        tracing::trace!(url = %self.target, requested = count, skipped, "skipped forward");
        skipped
    }

    /// Read into `buf`, folding transport errors into end of stream.
    fn read_chunk(&mut self, buf: &mut [u8]) -> usize {
        if self.finished || buf.is_empty() {
            return 0;
        }

        let Some(connection) = self.connection.as_mut() else {
            return 0;
        };

        let n = match connection.read(buf) {
            Ok(n) => n,
            Err(err) => {
                tracing::debug!(
                    url = %self.target,
                    position = self.position,
                    error = %err,
                    "transport read failed, treating as end of stream"
                );
                0
            }
        };

        self.position += u64::try_from(n).unwrap_or(u64::MAX);
        if n == 0 {
            self.finished = true;
        }
        n
    }

    fn connect(&mut self) {
        let request = OpenRequest {
            target: &self.target,
            headers: &self.headers,
            body: &self.body,
            method: self.method,
            progress: self.progress.as_ref(),
            timeout: self.timeout,
        };

        match self.transport.open(&request) {
            Ok(connection) => {
                self.response_headers = connection.response_headers();
                tracing::debug!(
                    url = %self.target,
                    method = %self.method,
                    length = ?connection.content_length(),
                    "opened resource"
                );
                self.connection = Some(connection);
                self.open_error = None;
            }
            Err(err) => {
                tracing::warn!(
                    url = %self.target,
                    method = %self.method,
                    code = err.error_code(),
                    error = %err,
                    "failed to open resource"
                );
                self.connection = None;
                self.open_error = Some(OpenError::from(err));
            }
        }
    }

    fn reopen(&mut self) {
        // Close before opening so at most one session exists.
        self.connection = None;
        self.position = 0;
        self.finished = false;
        self.connect();
    }
}

impl Read for ResourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_chunk(buf))
    }
}

impl Seek for ResourceStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let wanted = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let Some(length) = self.total_length() else {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "resource length is unknown",
                    ));
                };
                length.checked_add_signed(delta)
            }
        };

        let Some(wanted) = wanted else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            ));
        };

        if self.set_position(wanted) {
            Ok(self.position)
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stopped at offset {} seeking to {wanted}", self.position),
            ))
        }
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

impl Drop for ResourceStream {
    fn drop(&mut self) {
        if self.connection.take().is_some() {
            tracing::trace!(url = %self.target, "closed resource");
        }
    }
}

impl fmt::Debug for ResourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStream")
            .field("target", &self.target)
            .field("method", &self.method)
            .field("position", &self.position)
            .field("finished", &self.finished)
            .field("is_error", &self.is_error())
            .finish_non_exhaustive()
    }
}
