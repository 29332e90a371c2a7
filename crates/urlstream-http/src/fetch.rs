//! Whole-resource convenience readers on [`Url`].

use std::io::Read;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use urlstream_core::Url;

use crate::stream::{OpenError, OpenOptions, ResourceStream};
use crate::transport::Transport;

/// Errors from the whole-resource readers.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The stream could not be opened.
    #[error("cannot open {target}")]
    Open {
        target: String,
        #[source]
        source: Option<OpenError>,
    },

    /// Reading the body failed.
    #[error("I/O error reading {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The body was not valid JSON for the requested type.
    #[error("invalid JSON from {target}: {source}")]
    Json {
        target: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fetch helpers for [`Url`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use urlstream_core::Url;
/// use urlstream_http::{MemoryTransport, OpenOptions, UrlFetchExt};
///
/// let transport = Arc::new(MemoryTransport::new("plain text"));
/// let url = Url::parse("http://example.com/readme.txt");
/// let text = url.read_entire_text_stream(transport, OpenOptions::new())?;
/// assert_eq!(text, "plain text");
/// # Ok::<(), urlstream_http::FetchError>(())
/// ```
pub trait UrlFetchExt {
    /// Open a stream, or `None` if it ends up in the error state.
    fn create_input_stream(
        &self,
        transport: Arc<dyn Transport>,
        options: OpenOptions,
    ) -> Option<ResourceStream>;

    /// Read the whole resource as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Open`] if the stream cannot be opened.
    fn read_entire_binary_stream(
        &self,
        transport: Arc<dyn Transport>,
        options: OpenOptions,
    ) -> Result<Vec<u8>, FetchError>;

    /// Read the whole resource as text. Invalid UTF-8 is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Open`] if the stream cannot be opened.
    fn read_entire_text_stream(
        &self,
        transport: Arc<dyn Transport>,
        options: OpenOptions,
    ) -> Result<String, FetchError> {
        let bytes = self.read_entire_binary_stream(transport, options)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the whole resource and deserialize it as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Open`] if the stream cannot be opened and
    /// [`FetchError::Json`] if the body does not deserialize into `T`.
    fn read_entire_json<T: DeserializeOwned>(
        &self,
        transport: Arc<dyn Transport>,
        options: OpenOptions,
    ) -> Result<T, FetchError>;
}

impl UrlFetchExt for Url {
    fn create_input_stream(
        &self,
        transport: Arc<dyn Transport>,
        options: OpenOptions,
    ) -> Option<ResourceStream> {
        let stream = ResourceStream::open(self, options, transport);
        (!stream.is_error()).then_some(stream)
    }

    fn read_entire_binary_stream(
        &self,
        transport: Arc<dyn Transport>,
        options: OpenOptions,
    ) -> Result<Vec<u8>, FetchError> {
        let mut stream = ResourceStream::open(self, options, transport);
        if stream.is_error() {
            return Err(FetchError::Open {
                target: stream.target().to_string(),
                source: stream.take_open_error(),
            });
        }

        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|source| FetchError::Io {
                target: stream.target().to_string(),
                source,
            })?;
        Ok(bytes)
    }

    fn read_entire_json<T: DeserializeOwned>(
        &self,
        transport: Arc<dyn Transport>,
        options: OpenOptions,
    ) -> Result<T, FetchError> {
        let bytes = self.read_entire_binary_stream(transport, options)?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Json {
            target: self.to_string(),
            source,
        })
    }
}
