//! In-memory transport.
//!
//! Serves a fixed byte buffer for every request and records what was asked
//! for. Useful in tests and for resources already held in memory.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use urlstream_core::PairList;

use crate::transport::{Connection, OpenRequest, RequestMethod, Transport, TransportError};

/// A request as seen by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub target: String,
    pub headers: String,
    pub body: Vec<u8>,
    pub method: RequestMethod,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Default)]
struct SessionCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Transport serving one in-memory resource.
#[derive(Debug)]
pub struct MemoryTransport {
    data: Arc<[u8]>,
    seekable: bool,
    report_length: bool,
    max_chunk: usize,
    fail_after: Option<u64>,
    refuse_open: bool,
    response_headers: PairList,
    requests: Mutex<Vec<RecordedRequest>>,
    counters: Arc<SessionCounters>,
}

impl MemoryTransport {
    /// Serve `data`. Connections seek and report their length by default.
    #[must_use]
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Self {
            data: Arc::from(data.as_ref()),
            seekable: true,
            report_length: true,
            max_chunk: usize::MAX,
            fail_after: None,
            refuse_open: false,
            response_headers: PairList::new(),
            requests: Mutex::new(Vec::new()),
            counters: Arc::new(SessionCounters::default()),
        }
    }

    /// Whether connections honor seek requests.
    #[must_use]
    pub fn with_seeking(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    /// Connections report no content length.
    #[must_use]
    pub fn with_unknown_length(mut self) -> Self {
        self.report_length = false;
        self
    }

    /// Cap the bytes returned by a single read. Clamped to at least 1.
    #[must_use]
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    /// Reads fail with an I/O error once `offset` bytes have been served.
    #[must_use]
    pub fn with_failure_after(mut self, offset: u64) -> Self {
        self.fail_after = Some(offset);
        self
    }

    /// Every open fails with [`TransportError::ConnectionFailed`].
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.refuse_open = true;
        self
    }

    /// Add a response header reported by every connection.
    #[must_use]
    pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
        self.response_headers.set(name, value);
        self
    }

    /// All requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Number of connections handed out.
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Number of connections dropped.
    #[must_use]
    pub fn sessions_closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Connections currently alive.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.sessions_opened().saturating_sub(self.sessions_closed())
    }
}

impl Transport for MemoryTransport {
    fn open(&self, request: &OpenRequest<'_>) -> Result<Box<dyn Connection>, TransportError> {
        self.requests.lock().push(RecordedRequest {
            target: request.target.to_string(),
            headers: request.headers.to_string(),
            body: request.body.to_vec(),
            method: request.method,
            timeout: request.timeout,
        });

        if self.refuse_open {
            return Err(TransportError::ConnectionFailed {
                target: request.target.to_string(),
                message: "memory transport configured to fail".to_string(),
            });
        }

        if request.method.is_post() {
            let total = u64::try_from(request.body.len()).unwrap_or(u64::MAX);
            if !request.report_progress(0, total) || !request.report_progress(total, total) {
                return Err(TransportError::Cancelled {
                    target: request.target.to_string(),
                });
            }
        }

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            data: Arc::clone(&self.data),
            offset: 0,
            seekable: self.seekable,
            report_length: self.report_length,
            max_chunk: self.max_chunk,
            fail_after: self.fail_after,
            response_headers: self.response_headers.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MemoryConnection {
    data: Arc<[u8]>,
    offset: usize,
    seekable: bool,
    report_length: bool,
    max_chunk: usize,
    fail_after: Option<u64>,
    response_headers: PairList,
    counters: Arc<SessionCounters>,
}

impl Connection for MemoryConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut end = self.data.len();
        if let Some(limit) = self.fail_after {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            if self.offset >= limit && self.offset < self.data.len() {
                return Err(io::Error::other("injected read failure"));
            }
            end = end.min(limit);
        }

        let n = buf
            .len()
            .min(self.max_chunk)
            .min(end.saturating_sub(self.offset));
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }

    fn seek(&mut self, offset: u64) -> u64 {
        if self.seekable {
            if let Ok(target) = usize::try_from(offset) {
                if target <= self.data.len() {
                    self.offset = target;
                }
            }
        }
        u64::try_from(self.offset).unwrap_or(u64::MAX)
    }

    fn content_length(&self) -> Option<u64> {
        self.report_length
            .then(|| u64::try_from(self.data.len()).unwrap_or(u64::MAX))
    }

    fn response_headers(&self) -> PairList {
        self.response_headers.clone()
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
