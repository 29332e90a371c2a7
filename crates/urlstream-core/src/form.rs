//! POST request body construction.
//!
//! A [`RequestBodyBuilder`] turns a [`Url`] into the header block and body
//! bytes of a POST request:
//!
//! - With files to upload, the body is `multipart/form-data`: one part per
//!   parameter, then one part per file with its contents inlined.
//! - Otherwise the body is the escaped parameters followed by the URL's
//!   literal POST data, sent as `application/x-www-form-urlencoded`.
//!
//! Boundary randomness and file access are injected through
//! [`BoundarySource`] and [`UploadSource`], so tests can pin both.
//!
//! # Example
//!
//! ```
//! use urlstream_core::{RequestBodyBuilder, Url};
//!
//! let url = Url::parse("http://example.com/login")
//!     .with_parameter("user", "ann")
//!     .with_parameter("pass", "p&ss");
//!
//! let request = RequestBodyBuilder::new().build(&url)?;
//! assert_eq!(request.body(), b"user=ann&pass=p%26ss");
//! assert_eq!(
//!     request.headers(),
//!     "Content-Type: application/x-www-form-urlencoded\r\nContent-length: 20\r\n"
//! );
//! # Ok::<(), urlstream_core::FormError>(())
//! ```

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::FormError;
use crate::url::Url;

/// Content type used when no files are attached.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Content type prefix used when files are attached.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

// ============================================================================
// Collaborators
// ============================================================================

/// Source of multipart boundary tokens.
pub trait BoundarySource: Send + Sync {
    /// Produce the next 64-bit token.
    fn next_token(&self) -> u64;
}

/// Boundary tokens from the thread-local random generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomBoundary;

impl BoundarySource for RandomBoundary {
    fn next_token(&self) -> u64 {
        rand::thread_rng().next_u64()
    }
}

/// Boundary tokens from a seeded generator, reproducible across runs.
#[derive(Debug)]
pub struct SeededBoundary {
    rng: Mutex<StdRng>,
}

impl SeededBoundary {
    /// Create a source seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl BoundarySource for SeededBoundary {
    fn next_token(&self) -> u64 {
        self.rng.lock().next_u64()
    }
}

/// The same boundary token every time.
#[derive(Debug, Clone, Copy)]
pub struct FixedBoundary(pub u64);

impl BoundarySource for FixedBoundary {
    fn next_token(&self) -> u64 {
        self.0
    }
}

/// A file resolved for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Base file name, placed in the `filename` disposition parameter.
    pub file_name: String,
    /// Raw file contents.
    pub contents: Vec<u8>,
}

/// Resolves an upload path to its name and contents.
pub trait UploadSource: Send + Sync {
    /// Load the file at `path`.
    fn load(&self, path: &str) -> io::Result<UploadFile>;
}

/// Loads uploads from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsUploadSource;

impl UploadSource for FsUploadSource {
    fn load(&self, path: &str) -> io::Result<UploadFile> {
        let contents = std::fs::read(path)?;
        let file_name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(UploadFile {
            file_name,
            contents,
        })
    }
}

// ============================================================================
// Request body
// ============================================================================

/// Header block and body bytes for a POST request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    headers: String,
    body: Vec<u8>,
    boundary: Option<String>,
}

impl RequestBody {
    /// Header lines, each terminated by CRLF.
    #[must_use]
    pub fn headers(&self) -> &str {
        &self.headers
    }

    /// Body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The multipart boundary, if the body is multipart.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    /// Returns true if the body is `multipart/form-data`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.boundary.is_some()
    }

    /// The full Content-Type value.
    #[must_use]
    pub fn content_type(&self) -> String {
        match &self.boundary {
            Some(boundary) => format!("{MULTIPART_FORM_DATA}; boundary={boundary}"),
            None => FORM_URLENCODED.to_string(),
        }
    }

    /// Split into header block and body bytes.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.headers, self.body)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds POST bodies from URLs.
#[derive(Clone)]
pub struct RequestBodyBuilder {
    boundaries: Arc<dyn BoundarySource>,
    uploads: Arc<dyn UploadSource>,
}

impl Default for RequestBodyBuilder {
    fn default() -> Self {
        Self {
            boundaries: Arc::new(RandomBoundary),
            uploads: Arc::new(FsUploadSource),
        }
    }
}

impl fmt::Debug for RequestBodyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBodyBuilder").finish_non_exhaustive()
    }
}

impl RequestBodyBuilder {
    /// Create a builder with random boundaries and file-system uploads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `source` for multipart boundary tokens.
    #[must_use]
    pub fn with_boundary_source(mut self, source: impl BoundarySource + 'static) -> Self {
        self.boundaries = Arc::new(source);
        self
    }

    /// Use `source` to load upload files.
    #[must_use]
    pub fn with_upload_source(mut self, source: impl UploadSource + 'static) -> Self {
        self.uploads = Arc::new(source);
        self
    }

    /// Build the header block and body for POSTing `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UploadUnreadable`] if an upload file cannot be
    /// loaded.
    pub fn build(&self, url: &Url) -> Result<RequestBody, FormError> {
        if url.files_to_upload().is_empty() {
            Ok(Self::build_urlencoded(url))
        } else {
            self.build_multipart(url)
        }
    }

    fn build_urlencoded(url: &Url) -> RequestBody {
        let mut body = url.encoded_parameters().into_bytes();
        body.extend_from_slice(url.post_data().as_bytes());

        let headers = format!(
            "Content-Type: {FORM_URLENCODED}\r\nContent-length: {}\r\n",
            body.len()
        );

        RequestBody {
            headers,
            body,
            boundary: None,
        }
    }

    fn build_multipart(&self, url: &Url) -> Result<RequestBody, FormError> {
        let boundary = format!("{:x}", self.boundaries.next_token());
        let headers = format!("Content-Type: {MULTIPART_FORM_DATA}; boundary={boundary}\r\n");

        let mut body = Vec::new();
        body.extend_from_slice(b"--");
        body.extend_from_slice(boundary.as_bytes());

        for (name, value) in url.parameters().iter() {
            body.extend_from_slice(b"\r\nContent-Disposition: form-data; name=\"");
            body.extend_from_slice(name.as_bytes());
            body.extend_from_slice(b"\"\r\n\r\n");
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n--");
            body.extend_from_slice(boundary.as_bytes());
        }

        for (field, path) in url.files_to_upload().iter() {
            let file = self
                .uploads
                .load(path)
                .map_err(|source| FormError::UploadUnreadable {
                    field: field.to_string(),
                    path: path.to_string(),
                    source,
                })?;

            body.extend_from_slice(b"\r\nContent-Disposition: form-data; name=\"");
            body.extend_from_slice(field.as_bytes());
            body.extend_from_slice(b"\"; filename=\"");
            body.extend_from_slice(file.file_name.as_bytes());
            body.extend_from_slice(b"\"\r\n");

            if let Some(mime_type) = url.mime_types().get(field).filter(|m| !m.is_empty()) {
                body.extend_from_slice(b"Content-Type: ");
                body.extend_from_slice(mime_type.as_bytes());
                body.extend_from_slice(b"\r\n");
            }

            body.extend_from_slice(b"Content-Transfer-Encoding: binary\r\n\r\n");
            body.extend_from_slice(&file.contents);
            body.extend_from_slice(b"\r\n--");
            body.extend_from_slice(boundary.as_bytes());
        }

        body.extend_from_slice(b"--\r\n");

        tracing::trace!(
            boundary = %boundary,
            parts = url.parameters().len() + url.files_to_upload().len(),
            bytes = body.len(),
            "built multipart body"
        );

        Ok(RequestBody {
            headers,
            body,
            boundary: Some(boundary),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Upload source backed by a map of path to contents.
    struct MapUploads(HashMap<String, Vec<u8>>);

    impl UploadSource for MapUploads {
        fn load(&self, path: &str) -> io::Result<UploadFile> {
            let contents = self
                .0
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))?;
            let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
            Ok(UploadFile {
                file_name,
                contents,
            })
        }
    }

    fn map_uploads<const N: usize>(entries: [(&str, Vec<u8>); N]) -> MapUploads {
        MapUploads(
            entries
                .into_iter()
                .map(|(path, data)| (path.to_string(), data))
                .collect(),
        )
    }

    #[test]
    fn urlencoded_parameters_then_post_data() {
        let url = Url::parse("http://h/form")
            .with_parameter("a", "1 1")
            .with_post_data("&raw=yes");
        let request = RequestBodyBuilder::new().build(&url).unwrap();

        assert!(!request.is_multipart());
        assert_eq!(request.body(), b"a=1+1&raw=yes");
        assert_eq!(
            request.headers(),
            "Content-Type: application/x-www-form-urlencoded\r\nContent-length: 13\r\n"
        );
        assert_eq!(request.content_type(), FORM_URLENCODED);
    }

    #[test]
    fn urlencoded_length_counts_bytes() {
        let url = Url::new().with_post_data("caf\u{e9}");
        let request = RequestBodyBuilder::new().build(&url).unwrap();
        assert_eq!(request.body().len(), 5);
        assert!(request.headers().ends_with("Content-length: 5\r\n"));
    }

    #[test]
    fn empty_urlencoded_body() {
        let request = RequestBodyBuilder::new().build(&Url::parse("http://h/")).unwrap();
        assert!(request.body().is_empty());
        assert!(request.headers().contains("Content-length: 0\r\n"));
    }

    #[test]
    fn multipart_layout() {
        let url = Url::parse("http://h/upload")
            .with_parameter("title", "Cat")
            .with_file_to_upload("photo", "/pics/cat.png", "image/png");

        let builder = RequestBodyBuilder::new()
            .with_boundary_source(FixedBoundary(0xabc))
            .with_upload_source(map_uploads([("/pics/cat.png", b"PNGDATA".to_vec())]));
        let request = builder.build(&url).unwrap();

        assert_eq!(request.boundary(), Some("abc"));
        assert_eq!(
            request.headers(),
            "Content-Type: multipart/form-data; boundary=abc\r\n"
        );
        let expected = concat!(
            "--abc",
            "\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nCat\r\n--abc",
            "\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"cat.png\"\r\n",
            "Content-Type: image/png\r\n",
            "Content-Transfer-Encoding: binary\r\n\r\nPNGDATA\r\n--abc",
            "--\r\n",
        );
        assert_eq!(String::from_utf8_lossy(request.body()), expected);
        assert_eq!(request.content_type(), "multipart/form-data; boundary=abc");
    }

    #[test]
    fn multipart_ignores_post_data() {
        let url = Url::parse("http://h/")
            .with_post_data("ignored")
            .with_file_to_upload("f", "/x.bin", "application/octet-stream");
        let request = RequestBodyBuilder::new()
            .with_boundary_source(FixedBoundary(1))
            .with_upload_source(map_uploads([("/x.bin", vec![0, 255])]))
            .build(&url)
            .unwrap();

        assert!(!request.body().windows(7).any(|w| w == b"ignored"));
        assert!(request.body().windows(2).any(|w| w == [0, 255]));
    }

    #[test]
    fn seeded_boundaries_are_reproducible() {
        let a = SeededBoundary::new(42);
        let b = SeededBoundary::new(42);
        assert_eq!(a.next_token(), b.next_token());
        assert_eq!(a.next_token(), b.next_token());
    }

    #[test]
    fn boundary_is_lowercase_hex() {
        let url = Url::parse("http://h/").with_file_to_upload("f", "/x", "text/plain");
        let request = RequestBodyBuilder::new()
            .with_boundary_source(FixedBoundary(u64::MAX))
            .with_upload_source(map_uploads([("/x", Vec::new())]))
            .build(&url)
            .unwrap();
        assert_eq!(request.boundary(), Some("ffffffffffffffff"));
    }

    #[test]
    fn unreadable_upload_is_reported() {
        let url = Url::parse("http://h/").with_file_to_upload("doc", "/missing.txt", "text/plain");
        let err = RequestBodyBuilder::new()
            .with_upload_source(map_uploads([]))
            .build(&url)
            .unwrap_err();
        assert_eq!(err.field(), "doc");
    }

    #[test]
    fn fs_upload_source_reads_file() {
        let dir = std::env::temp_dir().join(format!("urlstream-form-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let file = FsUploadSource.load(&path.to_string_lossy()).unwrap();
        assert_eq!(file.file_name, "notes.txt");
        assert_eq!(file.contents, b"hello");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn into_parts_splits() {
        let url = Url::new().with_post_data("x");
        let (headers, body) = RequestBodyBuilder::new().build(&url).unwrap().into_parts();
        assert!(headers.starts_with("Content-Type:"));
        assert_eq!(body, b"x");
    }
}
