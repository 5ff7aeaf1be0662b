//! Chunked transfer-coding: size lines, chunks, the reassembled body and an
//! incremental decoder that works on arbitrarily fragmented input.

use std::fmt;

use bytes::{Buf, BytesMut};

use crate::error::{Error, Result};
use crate::http::header::{Header, HeaderCollection};
use crate::http::token::{strip_crlf, CRLF};

/// Longest size or trailer line accepted before the stream is treated as malformed.
const MAX_LINE_LEN: usize = 8 * 1024;

/// Largest single chunk the decoder will buffer.
pub const MAX_CHUNK_SIZE: usize = 256 * 1024 * 1024;

/// `HEX-SIZE[; extension] CRLF`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkSizeLine {
    pub size: usize,
    pub extension: Option<String>,
}

impl ChunkSizeLine {
    pub fn new(size: usize, extension: Option<String>) -> Self {
        Self { size, extension }
    }

    /// The zero-size line that terminates a chunked body.
    pub fn is_last(&self) -> bool {
        self.size == 0
    }

    pub fn has_extension(&self) -> bool {
        self.extension.as_deref().is_some_and(|e| !e.is_empty())
    }

    pub fn parse(value: &str) -> Result<Self> {
        let value = strip_crlf(value);

        let (size, extension) = match value.split_once(';') {
            Some((size, extension)) => (size.trim(), Some(extension.trim().to_string())),
            None => (value.trim(), None),
        };

        let size = usize::from_str_radix(size, 16)
            .map_err(|_| Error::format(format!("invalid chunk size '{size}'")))?;

        Ok(Self { size, extension })
    }
}

impl fmt::Display for ChunkSizeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.size)?;
        if let Some(extension) = self.extension.as_deref().filter(|e| !e.is_empty()) {
            write!(f, "; {extension}")?;
        }
        f.write_str(CRLF)
    }
}

/// One chunk: its size line and exactly `size` bytes of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    size_line: ChunkSizeLine,
    data: Vec<u8>,
}

impl Chunk {
    pub fn new(data: &[u8]) -> Self {
        Self {
            size_line: ChunkSizeLine::new(data.len(), None),
            data: data.to_vec(),
        }
    }

    /// Builds a chunk from an explicit size; `data` must be exactly `size` bytes.
    pub fn with_extension(size: usize, extension: Option<String>, data: &[u8]) -> Result<Self> {
        Self::from_parts(ChunkSizeLine::new(size, extension), data.to_vec())
    }

    pub fn from_parts(size_line: ChunkSizeLine, data: Vec<u8>) -> Result<Self> {
        if size_line.size != data.len() {
            return Err(Error::format(format!(
                "chunk declares {} bytes but carries {}",
                size_line.size,
                data.len()
            )));
        }
        Ok(Self { size_line, data })
    }

    pub fn terminal() -> Self {
        Self {
            size_line: ChunkSizeLine::default(),
            data: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size_line.size
    }

    pub fn extension(&self) -> Option<&str> {
        self.size_line.extension.as_deref()
    }

    pub fn size_line(&self) -> &ChunkSizeLine {
        &self.size_line
    }

    pub fn is_last(&self) -> bool {
        self.size_line.is_last()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Framing overhead: the size line plus the CRLF after the data.
    pub fn non_data_byte_count(&self) -> usize {
        self.size_line.to_string().len() + CRLF.len()
    }

    /// Size line, data, CRLF.
    pub fn to_bytes(&self) -> Vec<u8> {
        let size_line = self.size_line.to_string();
        let mut buf = Vec::with_capacity(size_line.len() + self.data.len() + CRLF.len());
        buf.extend_from_slice(size_line.as_bytes());
        buf.extend_from_slice(&self.data);
        buf.extend_from_slice(CRLF.as_bytes());
        buf
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkCollection {
    chunks: Vec<Chunk>,
}

impl ChunkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    pub fn add_range(&mut self, chunks: impl IntoIterator<Item = Chunk>) {
        self.chunks.extend(chunks);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Every chunk with its framing, back to back.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(Chunk::to_bytes).collect()
    }
}

/// A decoded chunked body: the data chunks plus any trailer headers.
///
/// The terminal zero-size chunk is framing and is not stored in `chunks`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedBody {
    pub chunks: ChunkCollection,
    pub trailers: HeaderCollection,
}

impl ChunkedBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `data` into chunks of at most `chunk_size` bytes.
    pub fn from_data(data: &[u8], chunk_size: usize) -> Self {
        let mut body = Self::new();
        for piece in data.chunks(chunk_size.max(1)) {
            body.chunks.add(Chunk::new(piece));
        }
        body
    }

    pub fn total_size(&self) -> usize {
        self.chunks.iter().map(Chunk::size).sum()
    }

    /// The payload: every chunk's data concatenated, framing and trailers excluded.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.total_size());
        for chunk in self.chunks.iter() {
            buf.extend_from_slice(chunk.data());
        }
        buf
    }

    /// The full wire form: framed chunks, terminal chunk, trailers, final CRLF.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut buf = self.chunks.to_bytes();
        buf.extend_from_slice(ChunkSizeLine::default().to_string().as_bytes());
        buf.extend_from_slice(self.trailers.to_string().as_bytes());
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DecodeState {
    SizeLine,
    Data(ChunkSizeLine),
    Trailers,
    Done,
}

/// Incremental chunked-body decoder.
///
/// Feed it the receive buffer whenever more bytes arrive; it consumes whole
/// lines and whole chunks only, leaving partial input in the buffer.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: DecodeState,
    body: ChunkedBody,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::SizeLine,
            body: ChunkedBody::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == DecodeState::Done
    }

    /// Decodes from `buffer`. Returns `Ok(true)` once the final CRLF after the
    /// trailers has been consumed.
    pub fn decode(&mut self, buffer: &mut BytesMut) -> Result<bool> {
        loop {
            match &self.state {
                DecodeState::SizeLine => {
                    let Some(line) = take_line(buffer)? else {
                        return Ok(false);
                    };
                    let size_line = ChunkSizeLine::parse(&line)?;
                    if size_line.size > MAX_CHUNK_SIZE {
                        return Err(Error::format(format!(
                            "chunk size {:#X} exceeds the {MAX_CHUNK_SIZE} byte limit",
                            size_line.size
                        )));
                    }
                    self.state = if size_line.is_last() {
                        DecodeState::Trailers
                    } else {
                        DecodeState::Data(size_line)
                    };
                }

                DecodeState::Data(size_line) => {
                    let size = size_line.size;
                    let needed = size
                        .checked_add(CRLF.len())
                        .ok_or_else(|| Error::format("chunk size overflows"))?;
                    if buffer.len() < needed {
                        return Ok(false);
                    }

                    let data = buffer.split_to(size).to_vec();
                    if &buffer[..2] != CRLF.as_bytes() {
                        return Err(Error::format("chunk data not followed by CRLF"));
                    }
                    buffer.advance(2);

                    let size_line = size_line.clone();
                    self.body.chunks.add(Chunk::from_parts(size_line, data)?);
                    self.state = DecodeState::SizeLine;
                }

                DecodeState::Trailers => {
                    let Some(line) = take_line(buffer)? else {
                        return Ok(false);
                    };
                    if strip_crlf(&line).is_empty() {
                        self.state = DecodeState::Done;
                    } else {
                        self.body.trailers.add(Header::parse(&line)?);
                    }
                }

                DecodeState::Done => return Ok(true),
            }
        }
    }

    pub fn into_body(self) -> ChunkedBody {
        self.body
    }
}

/// Splits one CRLF-terminated line off the front of `buffer`.
fn take_line(buffer: &mut BytesMut) -> Result<Option<String>> {
    match buffer.windows(2).position(|w| w == CRLF.as_bytes()) {
        Some(end) => {
            let line = buffer.split_to(end + 2);
            String::from_utf8(line.to_vec())
                .map(Some)
                .map_err(|_| Error::format("chunk line is not valid UTF-8"))
        }
        None if buffer.len() > MAX_LINE_LEN => Err(Error::format("chunk line too long")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_across_fragment_boundaries() {
        let wire = b"4\r\nWiki\r\n5; name=x\r\npedia\r\n0\r\nExpires: never\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let mut buffer = BytesMut::new();

        let mut done = false;
        for byte in wire.iter() {
            buffer.extend_from_slice(&[*byte]);
            done = decoder.decode(&mut buffer).unwrap();
        }

        assert!(done);
        assert!(buffer.is_empty());
        let body = decoder.into_body();
        assert_eq!(body.to_bytes(), b"Wikipedia");
        assert_eq!(body.chunks.get(1).unwrap().extension(), Some("name=x"));
        assert_eq!(body.trailers.value("Expires"), Some("never"));
    }

    #[test]
    fn missing_crlf_after_data_is_rejected() {
        let mut decoder = ChunkedDecoder::new();
        let mut buffer = BytesMut::from(&b"2\r\nabXY"[..]);
        assert!(decoder.decode(&mut buffer).is_err());
    }

    #[test]
    fn leaves_following_message_in_buffer() {
        let mut decoder = ChunkedDecoder::new();
        let mut buffer = BytesMut::from(&b"0\r\n\r\nGET / HTTP/1.1\r\n"[..]);
        assert!(decoder.decode(&mut buffer).unwrap());
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n");
    }
}
