use thiserror::Error;

/// Why a single href could not be unescaped. Always recoverable: the link is skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HrefError {
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),
}

/// Query-style unescape: `+` is a space, `%XY` is a byte, anything else is literal.
///
/// Only a malformed escape is an error. Decoded bytes that are not UTF-8
/// (Shift_JIS query strings, say) are kept, with invalid sequences replaced.
pub fn unescape_href(href: &str) -> Result<String, HrefError> {
    let bytes = href.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let ok = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !ok {
                let end = (i + 3).min(bytes.len());
                let bad = String::from_utf8_lossy(&bytes[i..end]).into_owned();
                return Err(HrefError::InvalidEscape(bad));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = href.replace('+', " ");
    let decoded = urlencoding::decode_binary(spaced.as_bytes());
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}
