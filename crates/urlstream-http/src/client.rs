//! Blocking HTTP transport over `reqwest`.
//!
//! Header blocks are passed through line by line. POST bodies are streamed
//! through the progress hook, which can cancel the upload. A non-success
//! status fails the open. Connections cannot seek, so a [`ResourceStream`]
//! falls back to reopening or skipping.
//!
//! [`ResourceStream`]: crate::ResourceStream

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use urlstream_core::PairList;

use crate::headers::header_lines;
use crate::transport::{
    Connection, OpenRequest, ProgressCallback, RequestMethod, Transport, TransportError,
};

/// Default time limit for a request (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("urlstream/", env!("CARGO_PKG_VERSION"));

/// Builder for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    user_agent: String,
    max_redirects: usize,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 10,
        }
    }
}

impl ReqwestTransportBuilder {
    /// Time limit used when a request does not carry its own.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `User-Agent` sent with every request.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Maximum redirects followed per request. Zero disables redirects.
    #[must_use]
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn build(self) -> Result<ReqwestTransport, reqwest::Error> {
        let redirects = if self.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(self.max_redirects)
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .redirect(redirects)
            .build()?;

        Ok(ReqwestTransport { client })
    }
}

/// Transport performing blocking HTTP requests.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Start building a transport.
    #[must_use]
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn open(&self, request: &OpenRequest<'_>) -> Result<Box<dyn Connection>, TransportError> {
        let target = request.target;
        let mut builder = match request.method {
            RequestMethod::Get => self.client.get(target),
            RequestMethod::Post => self.client.post(target),
        };

        for (name, value) in header_lines(request.headers) {
            builder = builder.header(name, value);
        }

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        if request.method.is_post() {
            let total = u64::try_from(request.body.len()).unwrap_or(u64::MAX);
            let body = ProgressBody {
                data: request.body.to_vec(),
                sent: 0,
                progress: request.progress.cloned(),
                cancelled: Arc::clone(&cancelled),
            };
            builder = builder.body(reqwest::blocking::Body::sized(body, total));
        }

        tracing::debug!(url = target, method = %request.method, "sending request");

        let response = builder.send().map_err(|err| {
            if cancelled.load(Ordering::SeqCst) {
                TransportError::Cancelled {
                    target: target.to_string(),
                }
            } else {
                classify(target, &err)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                target: target.to_string(),
                status: status.as_u16(),
            });
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();

        Ok(Box::new(ReqwestConnection {
            length: response.content_length(),
            response,
            offset: 0,
            headers,
        }))
    }
}

fn classify(target: &str, err: &reqwest::Error) -> TransportError {
    let target = target.to_string();
    if err.is_timeout() {
        TransportError::Timeout { target }
    } else if err.is_builder() {
        TransportError::InvalidRequest {
            target,
            message: err.to_string(),
        }
    } else {
        TransportError::ConnectionFailed {
            target,
            message: err.to_string(),
        }
    }
}

/// Request body reader reporting progress as it is consumed.
struct ProgressBody {
    data: Vec<u8>,
    sent: usize,
    progress: Option<ProgressCallback>,
    cancelled: Arc<AtomicBool>,
}

impl Read for ProgressBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.data.len() - self.sent);
        buf[..n].copy_from_slice(&self.data[self.sent..self.sent + n]);
        self.sent += n;

        if let Some(progress) = &self.progress {
            let sent = u64::try_from(self.sent).unwrap_or(u64::MAX);
            let total = u64::try_from(self.data.len()).unwrap_or(u64::MAX);
            if !progress(sent, total) {
                self.cancelled.store(true, Ordering::SeqCst);
                return Err(io::Error::other("upload cancelled by progress callback"));
            }
        }

        Ok(n)
    }
}

struct ReqwestConnection {
    response: reqwest::blocking::Response,
    offset: u64,
    length: Option<u64>,
    headers: PairList,
}

impl Connection for ReqwestConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.response.read(buf)?;
        self.offset += u64::try_from(n).unwrap_or(u64::MAX);
        Ok(n)
    }

    fn seek(&mut self, _offset: u64) -> u64 {
        self.offset
    }

    fn content_length(&self) -> Option<u64> {
        self.length
    }

    fn response_headers(&self) -> PairList {
        self.headers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let builder = ReqwestTransport::builder();
        assert_eq!(builder.timeout, DEFAULT_TIMEOUT);
        assert!(builder.user_agent.starts_with("urlstream/"));
        assert_eq!(builder.max_redirects, 10);
    }

    #[test]
    fn progress_body_reports_and_finishes() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let hook: ProgressCallback = {
            let seen = Arc::clone(&seen);
            Arc::new(move |sent: u64, total: u64| {
                seen.lock().push((sent, total));
                true
            })
        };
        let mut body = ProgressBody {
            data: b"abcdef".to_vec(),
            sent: 0,
            progress: Some(hook),
            cancelled: Arc::new(AtomicBool::new(false)),
        };

        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = body.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        assert_eq!(out, b"abcdef");
        assert_eq!(seen.lock()[..2], [(4, 6), (6, 6)]);
    }

    #[test]
    fn progress_body_cancels() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut body = ProgressBody {
            data: b"abcdef".to_vec(),
            sent: 0,
            progress: Some(Arc::new(|_: u64, _: u64| false)),
            cancelled: Arc::clone(&cancelled),
        };
        assert!(body.read(&mut [0u8; 4]).is_err());
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn unparseable_target_is_invalid_request() {
        let transport = ReqwestTransport::builder().build().unwrap();
        let request = OpenRequest {
            target: "not a url",
            headers: "\r\n",
            body: &[],
            method: RequestMethod::Get,
            progress: None,
            timeout: None,
        };
        let err = transport.open(&request).err().unwrap();
        assert_eq!(err.error_code(), "TRANSPORT_INVALID_REQUEST");
    }
}
