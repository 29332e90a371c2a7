//! URL values.
//!
//! A [`Url`] keeps the base address (scheme, authority and path) apart from
//! its query parameters, so parameters can be re-encoded into a query string
//! for GET requests or into a form body for POST requests. It also carries
//! literal POST data and a manifest of files to upload.
//!
//! Every `with_*` method returns a modified copy; a `Url` is never changed
//! in place once built.
//!
//! # Example
//!
//! ```
//! use urlstream_core::Url;
//!
//! let url = Url::parse("http://example.com/search?q=rust+lang");
//! assert_eq!(url.base(), "http://example.com/search");
//! assert_eq!(url.parameters().get("q"), Some("rust lang"));
//!
//! let paged = url.with_parameter("page", "2");
//! assert_eq!(paged.to_string(), "http://example.com/search?q=rust+lang&page=2");
//! ```

use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::UrlError;
use crate::heuristics;
use crate::pairs::PairList;
use crate::percent::{self, EscapeMode};

/// A URL with separately stored query parameters, POST data and uploads.
#[derive(Debug, Clone, Default)]
pub struct Url {
    base: String,
    parameters: PairList,
    post_data: String,
    files_to_upload: PairList,
    mime_types: PairList,
    skipped_query_pairs: usize,
}

impl Url {
    /// Create an empty URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a URL literal.
    ///
    /// Anything after the first `?` is split into `&`-separated `key=value`
    /// pairs, percent-decoded and stored as parameters; the base keeps only
    /// the text before the `?`. Segments without an `=`, or with an empty
    /// key, are skipped and counted in [`skipped_query_pairs`](Self::skipped_query_pairs).
    ///
    /// # Example
    ///
    /// ```
    /// use urlstream_core::Url;
    ///
    /// let url = Url::parse("http://x/y?a=1&flag&b=2");
    /// let pairs: Vec<_> = url.parameters().iter().collect();
    /// assert_eq!(pairs, vec![("a", "1"), ("b", "2")]);
    /// assert_eq!(url.skipped_query_pairs(), 1);
    /// ```
    #[must_use]
    pub fn parse(literal: &str) -> Self {
        let Some(query_start) = memchr::memchr(b'?', literal.as_bytes()) else {
            return Self {
                base: literal.to_string(),
                ..Self::default()
            };
        };

        let (parameters, skipped) = parse_query(literal, query_start);
        if skipped > 0 {
            tracing::debug!(skipped, url = literal, "skipped malformed query segments");
        }

        Self {
            base: literal[..query_start].to_string(),
            parameters,
            skipped_query_pairs: skipped,
            ..Self::default()
        }
    }

    /// The address without any query string.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Query parameters, in insertion order.
    #[must_use]
    pub fn parameters(&self) -> &PairList {
        &self.parameters
    }

    /// Literal data appended to the body of a POST request.
    #[must_use]
    pub fn post_data(&self) -> &str {
        &self.post_data
    }

    /// Form field name to local file path for each pending upload.
    #[must_use]
    pub fn files_to_upload(&self) -> &PairList {
        &self.files_to_upload
    }

    /// Form field name to MIME type for each pending upload.
    #[must_use]
    pub fn mime_types(&self) -> &PairList {
        &self.mime_types
    }

    /// Number of non-empty query segments dropped while parsing.
    #[must_use]
    pub fn skipped_query_pairs(&self) -> usize {
        self.skipped_query_pairs
    }

    /// Render the URL, optionally with its parameters as a query string.
    #[must_use]
    pub fn to_url_string(&self, include_parameters: bool) -> String {
        if include_parameters && !self.parameters.is_empty() {
            format!("{}?{}", self.base, self.encoded_parameters())
        } else {
            self.base.clone()
        }
    }

    /// The parameters as an escaped `key=value&key=value` string.
    #[must_use]
    pub fn encoded_parameters(&self) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            out.push_str(&percent::encode(key, EscapeMode::Parameter));
            out.push('=');
            out.push_str(&percent::encode(value, EscapeMode::Parameter));
        }
        out
    }

    /// Returns true if the base address is non-empty.
    ///
    /// This is a weak check: it does not validate the scheme, host or path.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.base.is_empty()
    }

    /// The host part, e.g. `"sub.example.com"` for `"http://sub.example.com/path"`.
    ///
    /// Stops at the first `/` or `:` after the scheme separator, so ports
    /// are not included.
    #[must_use]
    pub fn domain(&self) -> &str {
        let start = self.domain_start();
        let end = memchr::memchr2(b'/', b':', &self.base.as_bytes()[start..])
            .map_or(self.base.len(), |p| start + p);
        &self.base[start..end]
    }

    /// The path after the host, without its leading `/`.
    #[must_use]
    pub fn sub_path(&self) -> &str {
        match self.path_start() {
            Some(p) => &self.base[p..],
            None => "",
        }
    }

    /// The scheme, e.g. `"http"`; empty when there is none.
    #[must_use]
    pub fn scheme(&self) -> &str {
        match self.scheme_end() {
            Some(end) => &self.base[..end],
            None => "",
        }
    }

    /// Replace the path after the host.
    ///
    /// Exactly one `/` separates the host from the new path, whether or not
    /// `new_path` starts with one.
    ///
    /// # Example
    ///
    /// ```
    /// use urlstream_core::Url;
    ///
    /// let url = Url::parse("http://h/old/path");
    /// assert_eq!(url.with_new_sub_path("/new").base(), "http://h/new");
    /// assert_eq!(url.with_new_sub_path("new").base(), "http://h/new");
    /// ```
    #[must_use]
    pub fn with_new_sub_path(&self, new_path: &str) -> Self {
        let mut url = self.clone();
        if let Some(p) = self.path_start() {
            url.base.truncate(p);
        }
        if !url.base.ends_with('/') {
            url.base.push('/');
        }
        url.base
            .push_str(new_path.strip_prefix('/').unwrap_or(new_path));
        url
    }

    /// Return a copy with `name` set to `value`.
    #[must_use]
    pub fn with_parameter(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut url = self.clone();
        url.parameters.set(name, value);
        url
    }

    /// Return a copy that uploads `file` as form field `field`.
    ///
    /// Attaching a file switches POST requests to `multipart/form-data`.
    ///
    /// # Panics
    ///
    /// Panics if `mime_type` is empty or the path is not valid UTF-8. Use
    /// [`try_with_file_to_upload`](Self::try_with_file_to_upload) to handle
    /// those cases without panicking.
    #[must_use]
    pub fn with_file_to_upload(
        &self,
        field: impl Into<String>,
        file: impl AsRef<Path>,
        mime_type: &str,
    ) -> Self {
        match self.try_with_file_to_upload(field, file, mime_type) {
            Ok(url) => url,
            Err(err) => panic!("{err}"),
        }
    }

    /// Return a copy that uploads `file` as form field `field`.
    ///
    /// # Errors
    ///
    /// Returns [`UrlError::MissingMimeType`] if `mime_type` is empty and
    /// [`UrlError::NonUtf8Path`] if the absolute path is not valid UTF-8.
    pub fn try_with_file_to_upload(
        &self,
        field: impl Into<String>,
        file: impl AsRef<Path>,
        mime_type: &str,
    ) -> Result<Self, UrlError> {
        let field = field.into();
        if mime_type.is_empty() {
            return Err(UrlError::MissingMimeType { field });
        }

        let file = file.as_ref();
        let full_path = std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf());
        let stored = full_path
            .into_os_string()
            .into_string()
            .map_err(|path| UrlError::NonUtf8Path {
                field: field.clone(),
                path: path.into(),
            })?;

        let mut url = self.clone();
        url.files_to_upload.set(field.clone(), stored);
        url.mime_types.set(field, mime_type);
        Ok(url)
    }

    /// Return a copy carrying `post_data` as literal POST payload.
    #[must_use]
    pub fn with_post_data(&self, post_data: impl Into<String>) -> Self {
        let mut url = self.clone();
        url.post_data = post_data.into();
        url
    }

    /// Heuristic check for text that looks like a web address.
    ///
    /// See [`heuristics::is_probably_a_website_url`].
    #[must_use]
    pub fn is_probably_a_website_url(text: &str) -> bool {
        heuristics::is_probably_a_website_url(text)
    }

    /// Heuristic check for text that looks like an email address.
    ///
    /// See [`heuristics::is_probably_an_email_address`].
    #[must_use]
    pub fn is_probably_an_email_address(text: &str) -> bool {
        heuristics::is_probably_an_email_address(text)
    }

    /// End of the scheme run, if it is followed by `:`.
    fn scheme_end(&self) -> Option<usize> {
        let bytes = self.base.as_bytes();
        let end = bytes
            .iter()
            .position(|&b| !(b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.')))
            .unwrap_or(bytes.len());
        (bytes.get(end) == Some(&b':')).then_some(end)
    }

    /// Index of the host: past the scheme separator and any slashes.
    fn domain_start(&self) -> usize {
        let bytes = self.base.as_bytes();
        let mut start = self.scheme_end().map_or(0, |end| end + 1);
        while bytes.get(start) == Some(&b'/') {
            start += 1;
        }
        start
    }

    /// Index just past the first `/` after the host.
    fn path_start(&self) -> Option<usize> {
        let start = self.domain_start();
        memchr::memchr(b'/', &self.base.as_bytes()[start..]).map(|p| start + p + 1)
    }
}

/// Split the query string starting at `query_start` (the `?`) into pairs.
///
/// Returns the accepted pairs and the number of non-empty segments skipped.
fn parse_query(url: &str, query_start: usize) -> (PairList, usize) {
    let bytes = url.as_bytes();
    let mut parameters = PairList::new();
    let mut skipped = 0;
    let mut delimiter = query_start;

    loop {
        let key_start = delimiter + 1;
        let rest = &bytes[key_start..];
        let next_amp = memchr::memchr(b'&', rest).map(|p| key_start + p);
        let equals = memchr::memchr(b'=', rest).map(|p| key_start + p);
        let segment_end = next_amp.unwrap_or(bytes.len());

        match equals {
            Some(eq) if eq > key_start && eq < segment_end => {
                parameters.set(
                    percent::decode(&url[key_start..eq]),
                    percent::decode(&url[eq + 1..segment_end]),
                );
            }
            _ if segment_end > key_start => skipped += 1,
            _ => {}
        }

        match next_amp {
            Some(amp) => delimiter = amp,
            None => break,
        }
    }

    (parameters, skipped)
}

impl PartialEq for Url {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.parameters == other.parameters
            && self.post_data == other.post_data
            && self.files_to_upload == other.files_to_upload
            && self.mime_types == other.mime_types
    }
}

impl Eq for Url {}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url_string(true))
    }
}

impl FromStr for Url {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Url {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Url {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl Serialize for Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        Ok(Self::parse(&literal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(url: &Url) -> Vec<(&str, &str)> {
        url.parameters().iter().collect()
    }

    #[test]
    fn parse_without_query() {
        let url = Url::parse("http://x/y");
        assert_eq!(url.base(), "http://x/y");
        assert!(url.parameters().is_empty());
        assert_eq!(url.skipped_query_pairs(), 0);
    }

    #[test]
    fn parse_query_in_order() {
        let url = Url::parse("http://x/y?a=1&b=2");
        assert_eq!(url.base(), "http://x/y");
        assert_eq!(params(&url), vec![("a", "1"), ("b", "2")]);
    }

    #[test]
    fn parse_empty_value_is_kept() {
        let url = Url::parse("http://x/y?a=&b=2");
        assert_eq!(params(&url), vec![("a", ""), ("b", "2")]);
    }

    #[test]
    fn parse_empty_key_is_skipped() {
        let url = Url::parse("http://x/y?=1&b=2");
        assert_eq!(params(&url), vec![("b", "2")]);
        assert_eq!(url.skipped_query_pairs(), 1);
    }

    #[test]
    fn parse_segment_without_equals_is_skipped() {
        let url = Url::parse("http://x/y?flag&b=2&tail");
        assert_eq!(params(&url), vec![("b", "2")]);
        assert_eq!(url.skipped_query_pairs(), 2);
    }

    #[test]
    fn parse_empty_segments_not_counted() {
        let url = Url::parse("http://x/y?&a=1&&");
        assert_eq!(params(&url), vec![("a", "1")]);
        assert_eq!(url.skipped_query_pairs(), 0);
    }

    #[test]
    fn parse_trailing_question_mark() {
        let url = Url::parse("http://x/y?");
        assert_eq!(url.base(), "http://x/y");
        assert!(url.parameters().is_empty());
    }

    #[test]
    fn parse_decodes_pairs() {
        let url = Url::parse("http://x/?na%20me=caf%C3%A9&q=a+b");
        assert_eq!(params(&url), vec![("na me", "caf\u{e9}"), ("q", "a b")]);
    }

    #[test]
    fn parse_value_may_contain_equals() {
        let url = Url::parse("http://x/?expr=a=b");
        assert_eq!(params(&url), vec![("expr", "a=b")]);
    }

    #[test]
    fn parse_duplicate_key_last_write_wins() {
        let url = Url::parse("http://x/?a=1&b=2&a=3");
        assert_eq!(params(&url), vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn to_string_escapes_parameters() {
        let url = Url::parse("http://x/y")
            .with_parameter("a", "1 1")
            .with_parameter("b", "x&y");
        assert_eq!(url.to_url_string(true), "http://x/y?a=1+1&b=x%26y");
        assert_eq!(url.to_url_string(false), "http://x/y");
        assert_eq!(url.to_string(), "http://x/y?a=1+1&b=x%26y");
    }

    #[test]
    fn to_string_without_parameters_is_base() {
        let url = Url::parse("http://x/y");
        assert_eq!(url.to_url_string(true), "http://x/y");
    }

    #[test]
    fn domain_variants() {
        assert_eq!(Url::parse("http://sub.example.com/path").domain(), "sub.example.com");
        assert_eq!(Url::parse("ftp://host:21/p").domain(), "host");
        assert_eq!(Url::parse("https://example.com").domain(), "example.com");
        assert_eq!(Url::parse("www.example.com/a").domain(), "www.example.com");
    }

    #[test]
    fn scheme_variants() {
        assert_eq!(Url::parse("http://a/b").scheme(), "http");
        assert_eq!(Url::parse("svn+ssh://a/b").scheme(), "svn+ssh");
        assert_eq!(Url::parse("www.example.com/a").scheme(), "");
        assert_eq!(Url::parse("").scheme(), "");
    }

    #[test]
    fn sub_path_variants() {
        assert_eq!(Url::parse("http://h/old/path").sub_path(), "old/path");
        assert_eq!(Url::parse("http://h").sub_path(), "");
        assert_eq!(Url::parse("http://h/").sub_path(), "");
        assert_eq!(Url::parse("ftp://host:21/p").sub_path(), "p");
    }

    #[test]
    fn with_new_sub_path_normalises_slash() {
        let url = Url::parse("http://h/old/path");
        assert_eq!(url.with_new_sub_path("/new").base(), "http://h/new");
        assert_eq!(url.with_new_sub_path("new").base(), "http://h/new");
    }

    #[test]
    fn with_new_sub_path_without_existing_path() {
        let url = Url::parse("http://h");
        assert_eq!(url.with_new_sub_path("a/b").base(), "http://h/a/b");
    }

    #[test]
    fn with_new_sub_path_keeps_parameters() {
        let url = Url::parse("http://h/old?a=1").with_new_sub_path("new");
        assert_eq!(url.to_string(), "http://h/new?a=1");
    }

    #[test]
    fn builders_do_not_mutate_receiver() {
        let original = Url::parse("http://h/p");
        let derived = original
            .with_parameter("a", "1")
            .with_post_data("raw")
            .with_file_to_upload("f", "/tmp/upload.bin", "application/octet-stream");

        assert!(original.parameters().is_empty());
        assert_eq!(original.post_data(), "");
        assert!(original.files_to_upload().is_empty());

        assert_eq!(derived.parameters().get("a"), Some("1"));
        assert_eq!(derived.post_data(), "raw");
        assert_eq!(derived.files_to_upload().get("f"), Some("/tmp/upload.bin"));
    }

    #[test]
    fn upload_and_mime_keys_match() {
        let url = Url::parse("http://h/")
            .with_file_to_upload("a", "/tmp/a.txt", "text/plain")
            .with_file_to_upload("b", "/tmp/b.png", "image/png")
            .with_file_to_upload("a", "/tmp/c.txt", "text/csv");
        let files: Vec<_> = url.files_to_upload().keys().collect();
        let mimes: Vec<_> = url.mime_types().keys().collect();
        assert_eq!(files, mimes);
        assert_eq!(url.mime_types().get("a"), Some("text/csv"));
    }

    #[test]
    fn relative_upload_path_is_made_absolute() {
        let url = Url::parse("http://h/").with_file_to_upload("f", "data.bin", "application/octet-stream");
        let stored = url.files_to_upload().get("f").unwrap();
        assert!(Path::new(stored).is_absolute());
        assert!(stored.ends_with("data.bin"));
    }

    #[test]
    fn try_with_file_to_upload_rejects_empty_mime() {
        let err = Url::parse("http://h/")
            .try_with_file_to_upload("f", "/tmp/x", "")
            .unwrap_err();
        assert_eq!(
            err,
            UrlError::MissingMimeType {
                field: "f".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn try_with_file_to_upload_rejects_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/upload-\xff.bin"));
        let err = Url::parse("http://h/")
            .try_with_file_to_upload("f", path, "application/octet-stream")
            .unwrap_err();
        assert!(matches!(err, UrlError::NonUtf8Path { ref field, .. } if field == "f"));
    }

    #[test]
    #[should_panic(expected = "missing MIME type")]
    fn with_file_to_upload_panics_on_empty_mime() {
        let _ = Url::parse("http://h/").with_file_to_upload("f", "/tmp/x", "");
    }

    #[test]
    fn well_formed_is_non_empty() {
        assert!(Url::parse("x").is_well_formed());
        assert!(!Url::new().is_well_formed());
        assert!(!Url::parse("?a=1").is_well_formed());
    }

    #[test]
    fn equality_ignores_skip_count() {
        assert_eq!(Url::parse("http://x/?a=1&junk"), Url::parse("http://x/?a=1"));
    }

    #[test]
    fn from_str_and_display() {
        let url: Url = "http://x/y?k=v".parse().unwrap();
        assert_eq!(url.to_string(), "http://x/y?k=v");
    }

    #[test]
    fn serde_uses_string_form() {
        let url = Url::parse("http://x/y").with_parameter("q", "a b");
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, "\"http://x/y?q=a+b\"");
        let back: Url = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);
    }
}
