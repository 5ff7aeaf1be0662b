//! Byte-level tokens produced while scanning raw wire data, plus the small text
//! helpers the start-line and header parsers share.

use std::fmt;
use std::ops::Index;

use crate::error::{Error, Result};

pub const CRLF: &str = "\r\n";

/// An owned copy of a range of wire bytes with string-like helpers.
///
/// Every token owns its bytes; `substring` and `split` never share storage
/// with the token they were taken from.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteToken {
    bytes: Vec<u8>,
}

impl ByteToken {
    pub fn new(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }

    /// Copies `len` bytes of `bytes` starting at `start`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn from_range(bytes: &[u8], start: usize, len: usize) -> Self {
        Self::new(&bytes[start..start + len])
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the byte at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Position of the first `ch` at or after `from`.
    pub fn index_of(&self, ch: u8, from: usize) -> Option<usize> {
        self.bytes
            .get(from..)?
            .iter()
            .position(|&b| b == ch)
            .map(|i| i + from)
    }

    /// Everything from `start` to the end.
    ///
    /// # Panics
    ///
    /// Panics if `start > self.len()`.
    pub fn substring(&self, start: usize) -> ByteToken {
        self.substring_len(start, self.bytes.len() - start)
    }

    /// # Panics
    ///
    /// Panics if `start + len > self.len()`.
    pub fn substring_len(&self, start: usize, len: usize) -> ByteToken {
        Self::from_range(&self.bytes, start, len)
    }

    /// Splits on `separator`.
    ///
    /// The segment before each separator is kept even when it is empty, but the run of
    /// separators that directly follows a match is skipped, so `",a,,b,"` yields
    /// `["", "a", "b"]`.
    pub fn split(&self, separator: u8) -> Vec<ByteToken> {
        let mut parts = Vec::new();
        let len = self.bytes.len();
        let mut pos = 0;

        while pos < len {
            let Some(i) = self.index_of(separator, pos) else {
                break;
            };

            parts.push(self.substring_len(pos, i - pos));
            pos = i + 1;

            while pos < len && self.bytes[pos] == separator {
                pos += 1;
            }
        }

        if pos < len {
            parts.push(self.substring(pos));
        }

        parts
    }

    /// Decodes the bytes as UTF-8.
    pub fn decode(&self) -> Result<String> {
        String::from_utf8(self.bytes.clone())
            .map_err(|_| Error::format("token is not valid UTF-8"))
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl Index<usize> for ByteToken {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.bytes[index]
    }
}

impl From<&[u8]> for ByteToken {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for ByteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteToken({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for ByteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// Strips every trailing CR and LF.
pub fn strip_crlf(value: &str) -> &str {
    value.trim_end_matches(['\r', '\n'])
}

/// Rejects control characters (tab excepted), which covers bare CR and LF.
pub fn validate_token(field: &'static str, value: &str) -> Result<()> {
    if value.chars().any(|c| c.is_control() && c != '\t') {
        return Err(Error::InvalidToken {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Like [`validate_token`], and additionally rejects embedded whitespace and empty values.
pub fn validate_word(field: &'static str, value: &str) -> Result<()> {
    validate_token(field, value)?;
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(Error::InvalidToken {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_collapses_runs_after_a_match() {
        let token = ByteToken::new(b"a,,b");
        let parts: Vec<String> = token.split(b',').iter().map(|t| t.to_string()).collect();
        assert_eq!(parts, vec!["a", "b"]);
    }

    #[test]
    fn split_keeps_leading_empty_segment() {
        let token = ByteToken::new(b",,a");
        let parts: Vec<String> = token.split(b',').iter().map(|t| t.to_string()).collect();
        assert_eq!(parts, vec!["", "a"]);
    }

    #[test]
    fn validate_token_rejects_bare_line_feed() {
        assert!(validate_token("Value", "abc\ndef").is_err());
        assert!(validate_token("Value", "text/html; charset=utf-8").is_ok());
    }
}
