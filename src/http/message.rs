//! The behaviour shared by requests and responses: a start line, an ordered
//! header block, a body and (for chunked bodies) trailer headers.

use crate::error::{Error, Result};
use crate::http::chunked::ChunkedBody;
use crate::http::header::HeaderCollection;
use crate::http::names::{entity, general, transfer_encoding};
use crate::http::version::ProtocolVersion;

/// Chunk size used when a chunked message is serialized for sending.
pub const SEND_CHUNK_SIZE: usize = 8 * 1024;

/// Generates a getter/setter pair per header name. Setters always replace the
/// first existing header of that name.
macro_rules! header_accessors {
    ([] $($(#[$doc:meta])* $get:ident, $set:ident => $name:expr;)*) => {
        $(
            $(#[$doc])*
            fn $get(&self) -> Option<&str> {
                self.header_value($name)
            }

            fn $set(&mut self, value: &str) -> $crate::error::Result<()> {
                self.set_header_value($name, value)
            }
        )*
    };
    ([pub] $($(#[$doc:meta])* $get:ident, $set:ident => $name:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $get(&self) -> Option<&str> {
                self.header_value($name)
            }

            pub fn $set(&mut self, value: &str) -> $crate::error::Result<()> {
                self.set_header_value($name, value)
            }
        )*
    };
}

pub(crate) use header_accessors;

/// An HTTP message whose start line depends on the message kind.
pub trait HttpMessage {
    /// The serialized start line, CRLF included.
    fn first_line(&self) -> String;

    fn protocol_version(&self) -> &ProtocolVersion;

    fn headers(&self) -> &HeaderCollection;

    fn headers_mut(&mut self) -> &mut HeaderCollection;

    fn body(&self) -> &[u8];

    /// Replaces the body. A `Content-Length` already present is kept in step
    /// unless the message is chunked.
    fn set_body(&mut self, body: Vec<u8>);

    fn trailers(&self) -> &HeaderCollection;

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers().value(name)
    }

    fn set_header_value(&mut self, name: &str, value: &str) -> Result<()> {
        self.headers_mut().set(name, value, true)
    }

    header_accessors! {
        []
        cache_control, set_cache_control => general::CACHE_CONTROL;
        connection, set_connection => general::CONNECTION;
        date, set_date => general::DATE;
        pragma, set_pragma => general::PRAGMA;
        trailer, set_trailer => general::TRAILER;
        transfer_encoding, set_transfer_encoding => general::TRANSFER_ENCODING;
        upgrade, set_upgrade => general::UPGRADE;
        via, set_via => general::VIA;
        warning, set_warning => general::WARNING;
        allow, set_allow => entity::ALLOW;
        content_encoding, set_content_encoding => entity::CONTENT_ENCODING;
        content_language, set_content_language => entity::CONTENT_LANGUAGE;
        content_location, set_content_location => entity::CONTENT_LOCATION;
        content_range, set_content_range => entity::CONTENT_RANGE;
        content_type, set_content_type => entity::CONTENT_TYPE;
        expires, set_expires => entity::EXPIRES;
        last_modified, set_last_modified => entity::LAST_MODIFIED;
    }

    /// `Content-Length` as a number. A malformed value is a format error.
    fn content_length(&self) -> Result<Option<usize>> {
        self.header_value(entity::CONTENT_LENGTH)
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| Error::format(format!("invalid Content-Length '{v}'")))
            })
            .transpose()
    }

    fn set_content_length(&mut self, length: usize) -> Result<()> {
        self.set_header_value(entity::CONTENT_LENGTH, &length.to_string())
    }

    /// `true` when the last transfer-coding applied is `chunked`.
    fn is_chunked(&self) -> bool {
        self.transfer_encoding()
            .and_then(|v| v.split(',').next_back())
            .is_some_and(|last| last.trim().eq_ignore_ascii_case(transfer_encoding::CHUNKED))
    }

    /// Whether the connection must close after this message.
    ///
    /// `Connection: close` always closes; HTTP/1.0 closes unless the peer asked
    /// for `keep-alive`.
    fn wants_close(&self) -> bool {
        let tokens = |needle: &str| {
            self.connection().is_some_and(|v| {
                v.split(',').any(|t| t.trim().eq_ignore_ascii_case(needle))
            })
        };

        if tokens("close") {
            return true;
        }
        self.protocol_version().closes_by_default() && !tokens("keep-alive")
    }

    /// Start line plus the serialized header block.
    fn head_bytes(&self) -> Vec<u8> {
        let mut buf = self.first_line().into_bytes();
        buf.extend_from_slice(self.headers().to_string().as_bytes());
        buf
    }

    /// The body as it goes on the wire: chunk-framed when the message is chunked.
    fn body_bytes(&self) -> Vec<u8> {
        if self.is_chunked() {
            let mut chunked = ChunkedBody::from_data(self.body(), SEND_CHUNK_SIZE);
            chunked.trailers = self.trailers().clone();
            chunked.to_wire_bytes()
        } else {
            self.body().to_vec()
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.head_bytes();
        buf.extend_from_slice(&self.body_bytes());
        buf
    }
}

/// A message whose start line has not yet been interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub first_line: String,
    pub headers: HeaderCollection,
    pub body: Vec<u8>,
    pub trailers: HeaderCollection,
}

impl Message {
    pub fn new(first_line: impl Into<String>, headers: HeaderCollection) -> Self {
        Self {
            first_line: first_line.into(),
            headers,
            body: Vec::new(),
            trailers: HeaderCollection::new(),
        }
    }
}
