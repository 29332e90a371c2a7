//! Percent escaping for URLs and query parameters.
//!
//! Escaping works on the raw UTF-8 bytes of a string so multi-byte
//! characters survive a round trip intact:
//!
//! - Alphanumerics and a small set of punctuation pass through
//! - Space becomes `+`
//! - Everything else becomes `%xx` with lowercase hex digits
//!
//! # Example
//!
//! ```
//! use urlstream_core::percent::{EscapeMode, decode, encode};
//!
//! let escaped = encode("a b&c", EscapeMode::Parameter);
//! assert_eq!(escaped, "a+b%26c");
//! assert_eq!(decode(&escaped), "a b&c");
//! ```

use std::borrow::Cow;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Selects which punctuation is left unescaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeMode {
    /// Query parameter names and values. `,` and `$` are escaped.
    Parameter,
    /// Base URL text. `,` and `$` pass through.
    Url,
}

impl EscapeMode {
    /// Punctuation that passes through unchanged in this mode.
    #[must_use]
    pub fn safe_punctuation(self) -> &'static [u8] {
        match self {
            Self::Parameter => b"_-.*!'()",
            Self::Url => b",$_-.*!'()",
        }
    }

    fn is_safe(self, byte: u8) -> bool {
        byte.is_ascii_alphanumeric() || self.safe_punctuation().contains(&byte)
    }
}

/// Percent-escape a string.
///
/// Returns `Cow::Borrowed` when every byte is already safe.
///
/// # Example
///
/// ```
/// use urlstream_core::percent::{EscapeMode, encode};
///
/// assert_eq!(encode("$5,00", EscapeMode::Url), "$5,00");
/// assert_eq!(encode("$5,00", EscapeMode::Parameter), "%245%2c00");
/// ```
#[must_use]
pub fn encode(s: &str, mode: EscapeMode) -> Cow<'_, str> {
    let bytes = s.as_bytes();

    // Fast path: nothing to escape
    if bytes.iter().all(|&b| mode.is_safe(b)) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(bytes.len() + bytes.len() / 2);
    for &b in bytes {
        if mode.is_safe(b) {
            result.push(char::from(b));
        } else if b == b' ' {
            result.push('+');
        } else {
            result.push('%');
            result.push(char::from(HEX_DIGITS[usize::from(b >> 4)]));
            result.push(char::from(HEX_DIGITS[usize::from(b & 0x0f)]));
        }
    }

    Cow::Owned(result)
}

/// Percent-decode a string.
///
/// Returns a `Cow::Borrowed` if no decoding was needed (most common case),
/// or `Cow::Owned` if escapes were decoded.
///
/// Handles:
/// - Standard percent escapes (`%XX`, either hex case)
/// - UTF-8 multi-byte sequences
/// - Plus sign as space
///
/// Invalid or truncated escapes are left as-is.
///
/// # Example
///
/// ```
/// use urlstream_core::percent::decode;
///
/// assert_eq!(decode("hello%20world"), "hello world");
/// assert_eq!(decode("hello+world"), "hello world");
/// assert_eq!(decode("100%"), "100%");
/// ```
#[must_use]
pub fn decode(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();

    // Fast path: no encoding
    if memchr::memchr2(b'%', b'+', bytes).is_none() {
        return Cow::Borrowed(s);
    }

    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                    result.push(hi << 4 | lo);
                    i += 3;
                } else {
                    result.push(b'%');
                    i += 1;
                }
            }
            b'+' => {
                result.push(b' ');
                i += 1;
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }

    match String::from_utf8(result) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(err) => Cow::Owned(String::from_utf8_lossy(err.as_bytes()).into_owned()),
    }
}

/// Convert a hex digit to its numeric value.
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
