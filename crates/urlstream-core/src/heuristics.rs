//! Guesses about what a piece of free text refers to.
//!
//! These are meant for UI decisions such as making text clickable. They are
//! never used to dispatch requests.

/// Top-level domains recognised without a scheme or `www.` prefix.
const COMMON_TLDS: &[&str] = &["com", "net", "org", "uk", "de", "fr", "jp"];

/// Returns true if `text` looks like a website address.
///
/// # Example
///
/// ```
/// use urlstream_core::heuristics::is_probably_a_website_url;
///
/// assert!(is_probably_a_website_url("www.example.com"));
/// assert!(is_probably_a_website_url("example.org/about"));
/// assert!(!is_probably_a_website_url("bob@example.com"));
/// assert!(!is_probably_a_website_url("plaintext"));
/// ```
#[must_use]
pub fn is_probably_a_website_url(text: &str) -> bool {
    if starts_with_ignore_case(text, "http:") || starts_with_ignore_case(text, "ftp:") {
        return true;
    }

    if starts_with_ignore_case(text, "file:")
        || text.contains('@')
        || text.ends_with('.')
        || !text.contains('.')
    {
        return false;
    }

    // The dot must come after the first character following "www.".
    if starts_with_ignore_case(text, "www.")
        && memchr::memchr(b'.', &text.as_bytes()[5..]).is_some()
    {
        return true;
    }

    let haystack = format!("{}/", text.to_ascii_lowercase());
    COMMON_TLDS
        .iter()
        .any(|tld| haystack.contains(&format!(".{tld}/")))
}

/// Returns true if `text` looks like an email address.
///
/// Requires an `@` that is not the first character, a `.` somewhere after
/// the character following the `@`, and no trailing `.`.
///
/// # Example
///
/// ```
/// use urlstream_core::heuristics::is_probably_an_email_address;
///
/// assert!(is_probably_an_email_address("bob@example.com"));
/// assert!(!is_probably_an_email_address("@example.com"));
/// assert!(!is_probably_an_email_address("bob@example."));
/// ```
#[must_use]
pub fn is_probably_an_email_address(text: &str) -> bool {
    let Some(at) = text.find('@') else {
        return false;
    };

    at > 0 && text.rfind('.').is_some_and(|dot| dot > at + 1) && !text.ends_with('.')
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
