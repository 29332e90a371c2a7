//! Request header blocks.
//!
//! Requests carry their headers as one text block: `Name: value` lines
//! separated by CRLF (bare LF is tolerated when reading).

/// Make sure the block ends with a line terminator.
///
/// Appends CRLF unless the block already ends with `\n`, so an empty block
/// becomes a single CRLF.
pub fn terminate_header_block(block: &mut String) {
    if !block.ends_with('\n') {
        block.push_str("\r\n");
    }
}

/// Iterate over the `(name, value)` pairs of a header block.
///
/// Names and values are trimmed; blank lines and lines without a `:` are
/// skipped.
///
/// # Example
///
/// ```
/// use urlstream_http::header_lines;
///
/// let block = "Accept: text/html\r\nX-Token:  abc \r\n\r\n";
/// let pairs: Vec<_> = header_lines(block).collect();
/// assert_eq!(pairs, vec![("Accept", "text/html"), ("X-Token", "abc")]);
/// ```
pub fn header_lines(block: &str) -> impl Iterator<Item = (&str, &str)> {
    block.split('\n').filter_map(|line| {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let (name, value) = line.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name, value.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_gets_crlf() {
        let mut block = String::new();
        terminate_header_block(&mut block);
        assert_eq!(block, "\r\n");
    }

    #[test]
    fn unterminated_line_gets_crlf() {
        let mut block = "X-A: 1".to_string();
        terminate_header_block(&mut block);
        assert_eq!(block, "X-A: 1\r\n");
    }

    #[test]
    fn terminated_block_unchanged() {
        let mut block = "X-A: 1\r\n".to_string();
        terminate_header_block(&mut block);
        assert_eq!(block, "X-A: 1\r\n");

        let mut bare = "X-A: 1\n".to_string();
        terminate_header_block(&mut bare);
        assert_eq!(bare, "X-A: 1\n");
    }

    #[test]
    fn lines_tolerate_bare_lf_and_junk() {
        let block = "A: 1\nnot a header\r\n: empty\r\nB:2\r\n";
        let pairs: Vec<_> = header_lines(block).collect();
        assert_eq!(pairs, vec![("A", "1"), ("B", "2")]);
    }

    #[test]
    fn value_may_contain_colons() {
        let pairs: Vec<_> = header_lines("Host: example.com:8080\r\n").collect();
        assert_eq!(pairs, vec![("Host", "example.com:8080")]);
    }
}
