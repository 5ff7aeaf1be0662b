use url::Url;

use crate::error::Result;
use crate::http::header::{Header, HeaderCollection};
use crate::http::message::{header_accessors, HttpMessage, Message};
use crate::http::names::{entity, general, request};
use crate::http::request_line::RequestLine;
use crate::http::version::ProtocolVersion;

/// HTTP request methods the dispatcher knows how to route.
///
/// The request line itself accepts any method token; this enum is the view
/// used when deciding what a handler supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// TRACE - Loop-back of the request message
    TRACE,
    /// CONNECT - Tunnel through a proxy
    CONNECT,
    /// PATCH - Partial modification of a resource
    PATCH,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Example
    ///
    /// ```
    /// # use carbide::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "TRACE" => Some(Method::TRACE),
            "CONNECT" => Some(Method::CONNECT),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::CONNECT => "CONNECT",
            Method::PATCH => "PATCH",
        }
    }
}

/// An HTTP request: request line, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    line: RequestLine,
    headers: HeaderCollection,
    body: Vec<u8>,
    trailers: HeaderCollection,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// A `GET / HTTP/1.1` request with the default client headers:
    /// `Content-Type: text/plain`, `Content-Length: 0`, `Connection: close`
    /// and a `User-Agent` naming this crate.
    pub fn new() -> Self {
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let headers = [
            Header::from_static(entity::CONTENT_TYPE, "text/plain"),
            Header::from_static(entity::CONTENT_LENGTH, "0"),
            Header::from_static(general::CONNECTION, "close"),
            Header::from_static(request::USER_AGENT, &user_agent),
        ]
        .into_iter()
        .collect();

        Self {
            line: RequestLine::default(),
            headers,
            body: Vec::new(),
            trailers: HeaderCollection::new(),
        }
    }

    /// Reinterprets a received message's first line as a request line.
    pub fn from_message(message: Message) -> Result<Self> {
        Ok(Self {
            line: RequestLine::parse(&message.first_line)?,
            headers: message.headers,
            body: message.body,
            trailers: message.trailers,
        })
    }

    pub fn request_line(&self) -> &RequestLine {
        &self.line
    }

    pub fn method(&self) -> &str {
        self.line.method()
    }

    pub fn set_method(&mut self, method: &str) -> Result<()> {
        self.line.set_method(method)
    }

    /// The method as a [`Method`], `None` for extension methods.
    pub fn method_kind(&self) -> Option<Method> {
        Method::from_str(self.line.method())
    }

    pub fn request_uri(&self) -> &str {
        self.line.request_uri()
    }

    pub fn set_request_uri(&mut self, uri: &str) -> Result<()> {
        self.line.set_request_uri(uri)
    }

    pub fn set_protocol_version(&mut self, version: ProtocolVersion) {
        self.line.protocol_version = version;
    }

    /// The request URI up to (not including) the first `?`.
    pub fn request_uri_without_query_string(&self) -> &str {
        let uri = self.request_uri();
        match uri.find('?') {
            Some(sep) if sep > 0 => &uri[..sep],
            _ => uri,
        }
    }

    /// Everything after the first `?`, empty when there is no query.
    pub fn query_string(&self) -> &str {
        let uri = self.request_uri();
        match uri.find('?') {
            Some(sep) if sep > 0 => &uri[sep + 1..],
            _ => "",
        }
    }

    /// Percent-decoded query value for `key`, or an empty string when the key is
    /// absent or the URI cannot be interpreted.
    pub fn query_value(&self, key: &str) -> String {
        let uri = self.request_uri();
        let absolute = if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("http://{}{}", self.host().unwrap_or("localhost"), uri)
        };

        let Ok(url) = Url::parse(&absolute) else {
            return String::new();
        };

        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    /// Whether the client wants a reply. Absent or unparseable values count as
    /// `true`; every request gets a response unless it explicitly says `false`.
    pub fn response_needed(&self) -> bool {
        match self.header_value(general::RESPONSE_NEEDED) {
            Some(value) if value.trim().eq_ignore_ascii_case("false") => false,
            _ => true,
        }
    }

    pub fn set_response_needed(&mut self, needed: bool) -> Result<()> {
        self.set_header_value(general::RESPONSE_NEEDED, if needed { "True" } else { "False" })
    }

    header_accessors! {
        [pub]
        accept, set_accept => request::ACCEPT;
        accept_encoding, set_accept_encoding => request::ACCEPT_ENCODING;
        accept_language, set_accept_language => request::ACCEPT_LANGUAGE;
        authorization, set_authorization => request::AUTHORIZATION;
        cookie, set_cookie => request::COOKIE;
        expect, set_expect => request::EXPECT;
        from_address, set_from_address => request::FROM;
        host, set_host => request::HOST;
        if_match, set_if_match => request::IF_MATCH;
        if_modified_since, set_if_modified_since => request::IF_MODIFIED_SINCE;
        if_none_match, set_if_none_match => request::IF_NONE_MATCH;
        if_range, set_if_range => request::IF_RANGE;
        if_unmodified_since, set_if_unmodified_since => request::IF_UNMODIFIED_SINCE;
        max_forwards, set_max_forwards => request::MAX_FORWARDS;
        proxy_authorization, set_proxy_authorization => request::PROXY_AUTHORIZATION;
        range, set_range => request::RANGE;
        referer, set_referer => request::REFERER;
        te, set_te => request::TE;
        user_agent, set_user_agent => request::USER_AGENT;
    }
}

impl HttpMessage for Request {
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

/// Builder for requests sent through a client connection.
///
/// Unlike [`Request::new`] it starts from an empty header block.
pub struct RequestBuilder {
    line: RequestLine,
    headers: HeaderCollection,
    body: Vec<u8>,
}

impl RequestBuilder {
    pub fn new(method: &str, uri: &str) -> Result<Self> {
        Ok(Self {
            line: RequestLine::new(method, uri, ProtocolVersion::default())?,
            headers: HeaderCollection::new(),
            body: Vec::new(),
        })
    }

    pub fn version(mut self, version: ProtocolVersion) -> Self {
        self.line.protocol_version = version;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        self.headers.set(name, value, true)?;
        Ok(self)
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Adds `Content-Length` for the body unless the request is chunked or
    /// already carries one.
    pub fn build(mut self) -> Request {
        let chunked = self
            .headers
            .value(general::TRANSFER_ENCODING)
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
        if !chunked && !self.headers.contains(entity::CONTENT_LENGTH) && !self.body.is_empty() {
            self.headers.add(Header::from_static(
                entity::CONTENT_LENGTH,
                &self.body.len().to_string(),
            ));
        }

        Request {
            line: self.line,
            headers: self.headers,
            body: self.body,
            trailers: HeaderCollection::new(),
        }
    }
}
