//! Head parsing and body framing over a receive buffer.
//!
//! The functions here never block: they report `Ok(None)` when the buffer does not
//! yet hold enough bytes, so callers can read more and try again.

use bytes::BytesMut;

use crate::error::{Error, Result};
use crate::http::chunked::ChunkedDecoder;
use crate::http::header::HeaderCollection;
use crate::http::message::{HttpMessage, Message};
use crate::http::request::Request;
use crate::http::status::StatusCode;
use crate::http::token::{strip_crlf, ByteToken};

/// Largest head (start line plus headers) accepted from a peer.
pub const MAX_HEAD_LEN: usize = 64 * 1024;

/// How the body following a head is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    Empty,
    Length(usize),
    Chunked,
    /// Read until the peer closes the connection (responses only).
    UntilClose,
}

/// Body framing of a request: chunked, then `Content-Length`, otherwise empty.
pub fn request_framing(request: &Request) -> Result<BodyFraming> {
    if request.is_chunked() {
        return Ok(BodyFraming::Chunked);
    }
    Ok(match request.content_length()? {
        Some(0) | None => BodyFraming::Empty,
        Some(n) => BodyFraming::Length(n),
    })
}

/// Body framing of a response to a request made with `request_method`.
pub fn response_framing(
    status: StatusCode,
    request_method: &str,
    headers: &impl HttpMessage,
) -> Result<BodyFraming> {
    if status.forbids_body() || request_method.eq_ignore_ascii_case("HEAD") {
        return Ok(BodyFraming::Empty);
    }
    if headers.is_chunked() {
        return Ok(BodyFraming::Chunked);
    }
    Ok(match headers.content_length()? {
        Some(0) => BodyFraming::Empty,
        Some(n) => BodyFraming::Length(n),
        None => BodyFraming::UntilClose,
    })
}

/// Index of the CRLF CRLF that ends the head.
pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Splits a complete head off the front of `buffer`.
///
/// Leading blank lines are skipped. Returns the parsed head and the number of
/// bytes it occupied, or `None` when the terminating blank line has not arrived.
pub fn parse_head(buffer: &mut BytesMut) -> Result<Option<(Message, usize)>> {
    let mut skipped = 0;
    while buffer.starts_with(b"\r\n") {
        let _ = buffer.split_to(2);
        skipped += 2;
    }

    let Some(end) = find_headers_end(buffer) else {
        if buffer.len() > MAX_HEAD_LEN {
            return Err(Error::format("message head too large"));
        }
        return Ok(None);
    };

    let head = buffer.split_to(end + 4);
    let token = ByteToken::new(&head[..end]);
    let lines = token
        .split(b'\n')
        .into_iter()
        .map(|line| line.decode())
        .collect::<Result<Vec<String>>>()?;

    let mut lines = lines.iter().map(|line| strip_crlf(line));
    let first_line = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| Error::format("message has no start line"))?;
    let headers = HeaderCollection::parse_lines(lines)?;

    Ok(Some((Message::new(first_line, headers), skipped + head.len())))
}

/// Reads the body described by `framing` out of `buffer`.
///
/// `decoder` carries chunked state across calls. Returns `None` until the body
/// is complete; `UntilClose` bodies are never complete from here.
pub fn take_body(
    buffer: &mut BytesMut,
    framing: BodyFraming,
    decoder: &mut ChunkedDecoder,
    message: &mut Message,
) -> Result<Option<()>> {
    match framing {
        BodyFraming::Empty => Ok(Some(())),
        BodyFraming::Length(n) => {
            if buffer.len() < n {
                return Ok(None);
            }
            message.body = buffer.split_to(n).to_vec();
            Ok(Some(()))
        }
        BodyFraming::Chunked => {
            if !decoder.decode(buffer)? {
                return Ok(None);
            }
            let body = std::mem::take(decoder).into_body();
            message.body = body.to_bytes();
            message.trailers = body.trailers;
            Ok(Some(()))
        }
        BodyFraming::UntilClose => Ok(None),
    }
}

/// Parses one complete request from `buf`, returning it and the bytes consumed,
/// or `None` when more input is needed.
pub fn parse_request(buf: &[u8]) -> Result<Option<(Request, usize)>> {
    let mut buffer = BytesMut::from(buf);

    let Some((mut message, head_len)) = parse_head(&mut buffer)? else {
        return Ok(None);
    };

    let head_only = Request::from_message(message.clone())?;
    let framing = request_framing(&head_only)?;
    let before = buffer.len();

    let mut decoder = ChunkedDecoder::new();
    if take_body(&mut buffer, framing, &mut decoder, &mut message)?.is_none() {
        return Ok(None);
    }

    let consumed = head_len + (before - buffer.len());
    Ok(Some((Request::from_message(message)?, consumed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_request(req).unwrap().unwrap();

        assert_eq!(parsed.request_uri(), "/");
        assert_eq!(parsed.host(), Some("example.com"));
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn leading_blank_lines_are_skipped() {
        let req = b"\r\n\r\nGET / HTTP/1.1\r\n\r\n";
        let (parsed, consumed) = parse_request(req).unwrap().unwrap();
        assert_eq!(parsed.method(), "GET");
        assert_eq!(consumed, req.len());
    }
}
