//! Core types for urlstream.
//!
//! This crate provides the pieces that do not touch the network:
//! - [`Url`], a URL value with separately stored query parameters,
//!   POST data and file uploads
//! - [`percent`] escaping and unescaping of UTF-8 text
//! - [`RequestBodyBuilder`], producing form-urlencoded or multipart POST bodies
//! - [`heuristics`] for spotting web and email addresses in free text
//!
//! # Design Principles
//!
//! - Values are never mutated in place; `with_*` builders return copies
//! - Lenient parsing: malformed query segments are skipped, not rejected
//! - Randomness and file access are injected, so output is reproducible in tests

#![forbid(unsafe_code)]

pub mod error;
pub mod form;
pub mod heuristics;
mod pairs;
pub mod percent;
mod url;

pub use error::{FormError, UrlError};
pub use form::{
    BoundarySource, FixedBoundary, FsUploadSource, RandomBoundary, RequestBody,
    RequestBodyBuilder, SeededBoundary, UploadFile, UploadSource,
};
pub use pairs::PairList;
pub use percent::EscapeMode;
pub use url::Url;
