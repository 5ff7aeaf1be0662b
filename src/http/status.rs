use std::fmt;

use crate::error::{Error, Result};
use crate::http::token::{strip_crlf, validate_token, CRLF};
use crate::http::version::ProtocolVersion;

macro_rules! status_codes {
    ($($code:literal $variant:ident $reason:literal;)*) => {
        /// The closed set of RFC 2616 status codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode {
            $(
                #[doc = concat!("`", stringify!($code), "` ", $reason)]
                $variant,
            )*
        }

        impl StatusCode {
            /// Returns the numeric HTTP status code.
            ///
            /// # Example
            ///
            /// ```
            /// # use carbide::http::status::StatusCode;
            /// assert_eq!(StatusCode::Ok.as_u16(), 200);
            /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
            /// ```
            pub fn as_u16(&self) -> u16 {
                match self {
                    $(StatusCode::$variant => $code,)*
                }
            }

            /// Returns the standard reason phrase for this status code.
            pub fn reason_phrase(&self) -> &'static str {
                match self {
                    $(StatusCode::$variant => $reason,)*
                }
            }

            /// Maps a numeric code onto the enumeration, `None` for unknown codes.
            pub fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(StatusCode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    100 Continue "Continue";
    101 SwitchingProtocols "Switching Protocols";
    200 Ok "OK";
    201 Created "Created";
    202 Accepted "Accepted";
    203 NonAuthoritativeInformation "Non-Authoritative Information";
    204 NoContent "No Content";
    205 ResetContent "Reset Content";
    206 PartialContent "Partial Content";
    300 MultipleChoices "Multiple Choices";
    301 MovedPermanently "Moved Permanently";
    302 Found "Found";
    303 SeeOther "See Other";
    304 NotModified "Not Modified";
    305 UseProxy "Use Proxy";
    307 TemporaryRedirect "Temporary Redirect";
    400 BadRequest "Bad Request";
    401 Unauthorized "Unauthorized";
    402 PaymentRequired "Payment Required";
    403 Forbidden "Forbidden";
    404 NotFound "Not Found";
    405 MethodNotAllowed "Method Not Allowed";
    406 NotAcceptable "Not Acceptable";
    407 ProxyAuthenticationRequired "Proxy Authentication Required";
    408 RequestTimeout "Request Time-out";
    409 Conflict "Conflict";
    410 Gone "Gone";
    411 LengthRequired "Length Required";
    412 PreconditionFailed "Precondition Failed";
    413 RequestEntityTooLarge "Request Entity Too Large";
    414 RequestUriTooLarge "Request-URI Too Large";
    415 UnsupportedMediaType "Unsupported Media Type";
    416 RequestedRangeNotSatisfiable "Requested range not satisfiable";
    417 ExpectationFailed "Expectation Failed";
    500 InternalServerError "Internal Server Error";
    501 NotImplemented "Not Implemented";
    502 BadGateway "Bad Gateway";
    503 ServiceUnavailable "Service Unavailable";
    504 GatewayTimeout "Gateway Time-out";
    505 HttpVersionNotSupported "HTTP Version not supported";
}

impl StatusCode {
    /// Responses with these codes never carry a body.
    pub fn forbids_body(&self) -> bool {
        let code = self.as_u16();
        (100..200).contains(&code) || code == 204 || code == 304
    }
}

/// A status code with the reason phrase that accompanied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: StatusCode,
    pub reason: String,
}

impl Status {
    pub fn new(code: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Parses `200 OK`. A missing reason falls back to the standard phrase;
    /// codes outside the known set are rejected.
    pub fn parse(value: &str) -> Result<Self> {
        let value = strip_crlf(value).trim();
        let (code, reason) = match value.split_once(' ') {
            Some((code, reason)) => (code, Some(reason.trim())),
            None => (value, None),
        };

        let numeric: u16 = code
            .parse()
            .map_err(|_| Error::format(format!("invalid status code '{code}'")))?;
        let code = StatusCode::from_u16(numeric)
            .ok_or_else(|| Error::format(format!("unknown status code {numeric}")))?;

        let reason = match reason {
            Some(reason) if !reason.is_empty() => {
                validate_token("Reason", reason)?;
                reason.to_string()
            }
            _ => code.reason_phrase().to_string(),
        };

        Ok(Self { code, reason })
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        Self::new(code, code.reason_phrase())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code.as_u16(), self.reason)
    }
}

/// `HTTP/1.1 200 OK\r\n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub protocol_version: ProtocolVersion,
    pub status: Status,
}

impl StatusLine {
    pub fn new(protocol_version: ProtocolVersion, status: impl Into<Status>) -> Self {
        Self {
            protocol_version,
            status: status.into(),
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let value = strip_crlf(value);
        let (version, status) = value
            .split_once(' ')
            .ok_or_else(|| Error::format(format!("invalid status line '{value}'")))?;

        Ok(Self {
            protocol_version: ProtocolVersion::parse(version)?,
            status: Status::parse(status)?,
        })
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new(ProtocolVersion::default(), StatusCode::Ok)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{CRLF}", self.protocol_version, self.status)
    }
}
