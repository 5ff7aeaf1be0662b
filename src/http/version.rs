use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::http::token::{strip_crlf, validate_word};

/// A `Protocol/Version` token such as `HTTP/1.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    protocol: String,
    version: String,
}

impl ProtocolVersion {
    pub const HTTP_1_0: &'static str = "HTTP/1.0";
    pub const HTTP_1_1: &'static str = "HTTP/1.1";

    pub fn new(protocol: &str, version: &str) -> Result<Self> {
        let protocol = protocol.trim();
        let version = version.trim();
        validate_word("Protocol", protocol)?;
        validate_word("Version", version)?;
        Ok(Self {
            protocol: protocol.to_string(),
            version: version.to_string(),
        })
    }

    pub fn http_1_0() -> Self {
        Self {
            protocol: "HTTP".to_string(),
            version: "1.0".to_string(),
        }
    }

    pub fn http_1_1() -> Self {
        Self {
            protocol: "HTTP".to_string(),
            version: "1.1".to_string(),
        }
    }

    /// Parses `HTTP/1.1`, tolerating a trailing CRLF and surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self> {
        let value = strip_crlf(value).trim();
        let parts: Vec<&str> = value.split('/').collect();

        if parts.len() < 2 {
            return Err(Error::format(format!("invalid protocol version '{value}'")));
        }

        Self::new(parts[0], parts[1])
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `true` for `HTTP/1.0` and older, where connections close by default.
    pub fn closes_by_default(&self) -> bool {
        matches!(self.version.as_str(), "1.0" | "0.9")
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::http_1_1()
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.version)
    }
}
