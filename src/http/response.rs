use crate::error::Result;
use crate::http::header::{Header, HeaderCollection};
use crate::http::message::{header_accessors, HttpMessage, Message};
use crate::http::names::{entity, general, response};
use crate::http::status::{Status, StatusCode, StatusLine};
use crate::http::version::ProtocolVersion;

/// Represents a complete HTTP response: status line, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    line: StatusLine,
    headers: HeaderCollection,
    body: Vec<u8>,
    trailers: HeaderCollection,
}

impl Response {
    /// An empty response with the given status and no headers.
    pub fn new(status: StatusCode) -> Self {
        Self {
            line: StatusLine::new(ProtocolVersion::default(), status),
            headers: HeaderCollection::new(),
            body: Vec::new(),
            trailers: HeaderCollection::new(),
        }
    }

    /// Reinterprets a received message's first line as a status line.
    pub fn from_message(message: Message) -> Result<Self> {
        Ok(Self {
            line: StatusLine::parse(&message.first_line)?,
            headers: message.headers,
            body: message.body,
            trailers: message.trailers,
        })
    }

    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .content_type("text/plain")
            .body(body.into())
            .build()
    }

    pub fn bad_request() -> Self {
        Self::with_status(StatusCode::BadRequest)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::with_status(StatusCode::NotFound)
    }

    pub fn method_not_allowed(allow: &'static str) -> Self {
        ResponseBuilder::new(StatusCode::MethodNotAllowed)
            .header(Header::from_static(entity::ALLOW, allow))
            .content_type("text/plain")
            .body(b"405 Method Not Allowed".to_vec())
            .build()
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error() -> Self {
        Self::with_status(StatusCode::InternalServerError)
    }

    /// A plain-text response whose body is the status line text, e.g. `404 Not Found`.
    pub fn with_status(status: StatusCode) -> Self {
        let body = format!("{} {}", status.as_u16(), status.reason_phrase());
        ResponseBuilder::new(status)
            .content_type("text/plain")
            .body(body.into_bytes())
            .build()
    }

    pub fn status_line(&self) -> &StatusLine {
        &self.line
    }

    pub fn status(&self) -> &Status {
        &self.line.status
    }

    pub fn status_code(&self) -> StatusCode {
        self.line.status.code
    }

    pub fn set_status(&mut self, status: impl Into<Status>) {
        self.line.status = status.into();
    }

    pub fn set_protocol_version(&mut self, version: ProtocolVersion) {
        self.line.protocol_version = version;
    }

    header_accessors! {
        [pub]
        accept_ranges, set_accept_ranges => response::ACCEPT_RANGES;
        age, set_age => response::AGE;
        etag, set_etag => response::ETAG;
        location, set_location => response::LOCATION;
        proxy_authenticate, set_proxy_authenticate => response::PROXY_AUTHENTICATE;
        retry_after, set_retry_after => response::RETRY_AFTER;
        server, set_server => response::SERVER;
        set_cookie, set_set_cookie => response::SET_COOKIE;
        vary, set_vary => response::VARY;
        www_authenticate, set_www_authenticate => response::WWW_AUTHENTICATE;
    }
}

impl HttpMessage for Response {
    fn first_line(&self) -> String {
        self.line.to_string()
    }

    fn protocol_version(&self) -> &ProtocolVersion {
        &self.line.protocol_version
    }

    fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderCollection {
        &mut self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn set_body(&mut self, body: Vec<u8>) {
        if !self.is_chunked() {
            self.headers.sync_content_length(body.len());
        }
        self.body = body;
    }

    fn trailers(&self) -> &HeaderCollection {
        &self.trailers
    }
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .content_type("application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: Status,
    version: ProtocolVersion,
    headers: HeaderCollection,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status: status.into(),
            version: ProtocolVersion::default(),
            headers: HeaderCollection::new(),
            body: Vec::new(),
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.status.reason = reason.into();
        self
    }

    pub fn version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    /// Appends an already validated header.
    pub fn header(mut self, header: Header) -> Self {
        self.headers.add(header);
        self
    }

    pub fn content_type(self, content_type: &'static str) -> Self {
        self.header(Header::from_static(entity::CONTENT_TYPE, content_type))
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Adds `Content-Length` from the body size unless the response is chunked
    /// or already carries one.
    pub fn build(mut self) -> Response {
        let chunked = self
            .headers
            .value(general::TRANSFER_ENCODING)
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
        if !chunked && !self.headers.contains(entity::CONTENT_LENGTH) {
            self.headers.add(Header::from_static(
                entity::CONTENT_LENGTH,
                &self.body.len().to_string(),
            ));
        }

        Response {
            line: StatusLine::new(self.version, self.status),
            headers: self.headers,
            body: self.body,
            trailers: HeaderCollection::new(),
        }
    }
}
