//! URL values and seekable network resource streams.
//!
//! urlstream provides:
//!
//! - **URL values** with separately held query parameters, POST data and
//!   file uploads, built immutably with `with_*` methods
//! - **Percent escaping** that round-trips arbitrary UTF-8
//! - **Form bodies** in `application/x-www-form-urlencoded` or
//!   `multipart/form-data` layout
//! - **Seekable streams** over a pluggable transport, reopening when a
//!   backward seek cannot be served
//!
//! # Quick Start
//!
//! ```
//! use std::io::Read;
//! use std::sync::Arc;
//! use urlstream::prelude::*;
//!
//! let transport = Arc::new(MemoryTransport::new("hello"));
//! let url = Url::parse("http://example.com/greeting").with_parameter("lang", "en");
//!
//! let mut stream = url
//!     .create_input_stream(transport, OpenOptions::new())
//!     .expect("memory transport always opens");
//! let mut text = String::new();
//! stream.read_to_string(&mut text)?;
//! assert_eq!(text, "hello");
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! # Crate Structure
//!
//! - [`urlstream_core`]: URL value, percent codec, form bodies, heuristics
//! - [`urlstream_http`]: transports and resource streams

#![forbid(unsafe_code)]

mod launch;

// Re-export crates
pub use urlstream_core as core;
pub use urlstream_http as http;

// Re-export commonly used types
pub use urlstream_core::{
    BoundarySource, EscapeMode, FixedBoundary, FormError, FsUploadSource, PairList,
    RandomBoundary, RequestBody, RequestBodyBuilder, SeededBoundary, UploadFile, UploadSource,
    Url, UrlError, percent,
};
pub use urlstream_http::{
    Connection, FetchError, MemoryTransport, OpenError, OpenOptions, OpenRequest,
    ProgressCallback, RequestMethod, ResourceStream, Transport, TransportError, UrlFetchExt,
};
#[cfg(feature = "reqwest")]
pub use urlstream_http::{ReqwestTransport, ReqwestTransportBuilder};

pub use launch::{launch_in_default_browser, launch_target};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        MemoryTransport, OpenOptions, RequestBodyBuilder, RequestMethod, ResourceStream,
        Transport, Url, UrlFetchExt,
    };
    #[cfg(feature = "reqwest")]
    pub use crate::ReqwestTransport;
}
