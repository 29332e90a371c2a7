//! Error types for URL manipulation and request body construction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while deriving a [`Url`](crate::Url).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// A file upload was requested without a MIME type.
    #[error("missing MIME type for upload field `{field}`")]
    MissingMimeType {
        /// The form field the upload was attached to.
        field: String,
    },

    /// An upload path cannot be represented as UTF-8 text.
    #[error("upload path {} for field `{field}` is not valid UTF-8", path.display())]
    NonUtf8Path {
        /// The form field the upload was attached to.
        field: String,
        /// The rejected path.
        path: PathBuf,
    },
}

/// Errors raised while building a POST request body.
#[derive(Error, Debug)]
pub enum FormError {
    /// An upload file could not be read.
    #[error("cannot read upload `{path}` for field `{field}`: {source}")]
    UploadUnreadable {
        /// The form field the upload was attached to.
        field: String,
        /// The path that failed to load.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl FormError {
    /// The form field whose upload failed.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::UploadUnreadable { field, .. } => field,
        }
    }
}
