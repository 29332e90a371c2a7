//! Seekable resource streams over pluggable transports.
//!
//! This crate opens the resource named by a [`urlstream_core::Url`] and
//! exposes it as a blocking, seekable byte stream.
//!
//! # Features
//!
//! - [`Transport`] / [`Connection`] contract for the network layer
//! - [`ResourceStream`] with reopen-on-backward-seek and forward skipping
//! - [`MemoryTransport`] serving in-memory data, with request recording
//! - [`ReqwestTransport`] over `reqwest`'s blocking client (feature `reqwest`)
//! - [`UrlFetchExt`] whole-resource readers
//!
//! # Example
//!
//! ```
//! use std::io::Read;
//! use std::sync::Arc;
//! use urlstream_core::Url;
//! use urlstream_http::{MemoryTransport, OpenOptions, ResourceStream};
//!
//! let transport = Arc::new(MemoryTransport::new("payload"));
//! let url = Url::parse("http://example.com/data?v=1");
//! let mut stream = ResourceStream::open(&url, OpenOptions::new(), transport.clone());
//!
//! let mut body = Vec::new();
//! stream.read_to_end(&mut body)?;
//! assert_eq!(body, b"payload");
//! assert_eq!(transport.last_request().unwrap().target, "http://example.com/data?v=1");
//! # Ok::<(), std::io::Error>(())
//! ```

#![forbid(unsafe_code)]

#[cfg(feature = "reqwest")]
mod client;
mod fetch;
mod headers;
pub mod memory;
pub mod stream;
pub mod transport;

#[cfg(feature = "reqwest")]
pub use client::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, ReqwestTransport, ReqwestTransportBuilder};
pub use fetch::{FetchError, UrlFetchExt};
pub use headers::{header_lines, terminate_header_block};
pub use memory::{MemoryTransport, RecordedRequest};
pub use stream::{DEFAULT_SKIP_CHUNK_SIZE, OpenError, OpenOptions, ResourceStream};
pub use transport::{
    Connection, OpenRequest, ProgressCallback, RequestMethod, Transport, TransportError,
};
