use std::fmt;

use crate::error::{Error, Result};
use crate::http::token::{strip_crlf, validate_word, CRLF};
use crate::http::version::ProtocolVersion;

/// `METHOD SP REQUEST-URI SP HTTP/VERSION CRLF`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: String,
    request_uri: String,
    pub protocol_version: ProtocolVersion,
}

impl RequestLine {
    pub fn new(
        method: &str,
        request_uri: &str,
        protocol_version: ProtocolVersion,
    ) -> Result<Self> {
        let mut line = Self::default();
        line.set_method(method)?;
        line.set_request_uri(request_uri)?;
        line.protocol_version = protocol_version;
        Ok(line)
    }

    pub fn parse(value: &str) -> Result<Self> {
        let value = strip_crlf(value);
        let parts: Vec<&str> = value.split(' ').collect();

        if parts.len() < 3 {
            return Err(Error::format(format!("invalid request line '{value}'")));
        }

        let protocol_version = ProtocolVersion::parse(parts[2])?;
        Self::new(parts[0], parts[1], protocol_version)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    pub fn set_method(&mut self, method: &str) -> Result<()> {
        let method = method.trim();
        validate_word("Method", method)?;
        self.method = method.to_string();
        Ok(())
    }

    pub fn set_request_uri(&mut self, request_uri: &str) -> Result<()> {
        let request_uri = request_uri.trim();
        validate_word("RequestUri", request_uri)?;
        self.request_uri = request_uri.to_string();
        Ok(())
    }
}

impl Default for RequestLine {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            request_uri: "/".to_string(),
            protocol_version: ProtocolVersion::default(),
        }
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}{CRLF}",
            self.method, self.request_uri, self.protocol_version
        )
    }
}
