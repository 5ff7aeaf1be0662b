//! Header lines and the ordered header collection carried by every message.

use std::fmt;
use std::ops::Index;

use crate::error::{Error, Result};
use crate::http::names;
use crate::http::token::{strip_crlf, validate_token, CRLF};

/// A single `Name: Value` header.
///
/// Name and value are validated and trimmed whenever they are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: String,
}

impl Header {
    pub fn new(name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let mut header = Self {
            name: String::new(),
            value: String::new(),
        };
        header.set_name(name.as_ref())?;
        header.set_value(value.as_ref())?;
        Ok(header)
    }

    /// Skips validation; only for names and values known at compile time.
    pub(crate) fn from_static(name: &str, value: &str) -> Self {
        debug_assert!(validate_token("Value", value).is_ok());
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Parses a `Name: Value` line. A trailing CRLF is ignored.
    pub fn parse(line: &str) -> Result<Self> {
        let line = strip_crlf(line);
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::format(format!("header line without ':' ({line:?})")))?;
        Self::new(name.trim(), value.trim())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        validate_token("Name", name)?;
        let name = name.trim();
        if name.is_empty() || name.contains(':') || name.contains(char::is_whitespace) {
            return Err(Error::InvalidToken {
                field: "Name",
                value: name.to_string(),
            });
        }
        self.name = name.to_string();
        Ok(())
    }

    pub fn set_value(&mut self, value: &str) -> Result<()> {
        validate_token("Value", value)?;
        self.value = value.trim().to_string();
        Ok(())
    }

    /// `true` when the name is one of the RFC 2616 well-known headers.
    pub fn is_known(&self) -> bool {
        names::is_known(&self.name)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn to_pair(&self) -> (String, String) {
        (self.name.clone(), self.value.clone())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}{CRLF}", self.name, self.value)
    }
}

/// Ordered headers with case-insensitive lookup.
///
/// Duplicate names are allowed; name lookups see the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCollection {
    headers: Vec<Header>,
}

impl HeaderCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn add(&mut self, header: Header) {
        self.headers.push(header);
    }

    pub fn add_range(&mut self, headers: impl IntoIterator<Item = Header>) {
        self.headers.extend(headers);
    }

    /// Removes the first header whose name matches `header`'s name.
    pub fn remove(&mut self, header: &Header) -> Option<Header> {
        self.remove_by_name(header.name())
    }

    pub fn remove_by_name(&mut self, name: &str) -> Option<Header> {
        let index = self.headers.iter().position(|h| h.is_named(name))?;
        Some(self.headers.remove(index))
    }

    /// Removes every header named `name`, returning how many were dropped.
    pub fn remove_all_by_name(&mut self, name: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|h| !h.is_named(name));
        before - self.headers.len()
    }

    pub fn remove_at(&mut self, index: usize) -> Header {
        self.headers.remove(index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.is_named(name))
    }

    pub fn get(&self, index: usize) -> Option<&Header> {
        self.headers.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.is_named(name))
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Header> {
        self.headers.iter_mut().find(|h| h.is_named(name))
    }

    /// Value of the first header named `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get_by_name(name).map(Header::value)
    }

    /// Sets `name` to `value`. With `replace`, the first existing header of that
    /// name is overwritten in place; otherwise a new header is appended.
    pub fn set(&mut self, name: &str, value: &str, replace: bool) -> Result<()> {
        if replace {
            if let Some(existing) = self.get_by_name_mut(name) {
                return existing.set_value(value);
            }
        }
        self.add(Header::new(name, value)?);
        Ok(())
    }

    /// Rewrites an existing `Content-Length` to `length`; absent stays absent.
    pub(crate) fn sync_content_length(&mut self, length: usize) {
        if let Some(header) = self.get_by_name_mut(names::entity::CONTENT_LENGTH) {
            header.value = length.to_string();
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.headers.iter()
    }

    /// Headers whose names are not in the well-known tables, as `(name, value)` pairs.
    pub fn unknown_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter(|h| !h.is_known())
            .map(Header::to_pair)
            .collect()
    }

    pub fn to_array(&self) -> Vec<(String, String)> {
        self.headers.iter().map(Header::to_pair).collect()
    }

    /// Parses the header lines of a head block. Blank lines are ignored.
    pub fn parse_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut headers = Self::new();
        for line in lines {
            if strip_crlf(line).is_empty() {
                continue;
            }
            headers.add(Header::parse(line)?);
        }
        Ok(headers)
    }
}

impl Index<usize> for HeaderCollection {
    type Output = Header;

    fn index(&self, index: usize) -> &Header {
        &self.headers[index]
    }
}

impl<'a> IntoIterator for &'a HeaderCollection {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

impl FromIterator<Header> for HeaderCollection {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self {
            headers: iter.into_iter().collect(),
        }
    }
}

/// Serializes the header block: one line per header, then a bare CRLF.
///
/// Headers whose value is empty are left out.
impl fmt::Display for HeaderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for header in self.headers.iter().filter(|h| !h.value().is_empty()) {
            write!(f, "{header}")?;
        }
        f.write_str(CRLF)
    }
}
