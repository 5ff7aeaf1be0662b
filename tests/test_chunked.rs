use bytes::BytesMut;
use carbide::Error;
use carbide::http::chunked::{
    Chunk, ChunkCollection, ChunkSizeLine, ChunkedBody, ChunkedDecoder, MAX_CHUNK_SIZE,
};
use carbide::http::header::Header;

#[test]
fn test_chunk_framing_for_a_range_of_sizes() {
    for size in [0usize, 1, 9, 10, 15, 16, 255, 256, 4095, 0xFFFF] {
        let data = vec![b'x'; size];
        let chunk = Chunk::new(&data);

        let mut expected = format!("{size:X}\r\n").into_bytes();
        expected.extend_from_slice(&data);
        expected.extend_from_slice(b"\r\n");

        assert_eq!(chunk.to_bytes(), expected, "size {size}");
        assert_eq!(chunk.non_data_byte_count(), expected.len() - size);
    }
}

#[test]
fn test_size_line_with_extension() {
    let line = ChunkSizeLine::parse("1A; name=value\r\n").unwrap();

    assert_eq!(line.size, 26);
    assert_eq!(line.extension.as_deref(), Some("name=value"));
    assert_eq!(line.to_string(), "1A; name=value\r\n");
}

#[test]
fn test_size_line_rejects_non_hex() {
    assert!(matches!(ChunkSizeLine::parse("zz\r\n"), Err(Error::Format(_))));
}

#[test]
fn test_chunk_with_mismatched_size_fails() {
    assert!(Chunk::with_extension(4, None, b"abc").is_err());
}

#[test]
fn test_chunked_body_concatenates_data() {
    let mut body = ChunkedBody::new();
    body.chunks.add_range([Chunk::new(b"Hello, "), Chunk::new(b"chunked "), Chunk::new(b"world")]);

    assert_eq!(body.total_size(), 20);
    assert_eq!(body.to_bytes(), b"Hello, chunked world".to_vec());
}

#[test]
fn test_collection_to_bytes_is_framed() {
    let mut chunks = ChunkCollection::new();
    chunks.add(Chunk::new(b"ab"));
    chunks.add(Chunk::new(b"c"));

    assert_eq!(chunks.to_bytes(), b"2\r\nab\r\n1\r\nc\r\n".to_vec());
}

#[test]
fn test_wire_bytes_include_terminal_and_trailers() {
    let mut body = ChunkedBody::from_data(b"abcde", 2);
    body.trailers.add(Header::new("Expires", "never").unwrap());

    assert_eq!(body.chunks.len(), 3);
    assert_eq!(
        body.to_wire_bytes(),
        b"2\r\nab\r\n2\r\ncd\r\n1\r\ne\r\n0\r\nExpires: never\r\n\r\n".to_vec()
    );
}

#[test]
fn test_decoder_handles_one_byte_at_a_time() {
    let wire = b"5\r\nhello\r\n6; ext\r\n world\r\n0\r\nX-Sum: 11\r\n\r\nNEXT";
    let mut decoder = ChunkedDecoder::new();
    let mut buffer = BytesMut::new();
    let mut done = false;

    for byte in wire.iter() {
        buffer.extend_from_slice(&[*byte]);
        if decoder.decode(&mut buffer).unwrap() {
            done = true;
            break;
        }
    }

    assert!(done);
    let body = decoder.into_body();
    assert_eq!(body.to_bytes(), b"hello world".to_vec());
    assert_eq!(body.chunks.get(1).unwrap().extension(), Some("ext"));
    assert_eq!(body.trailers.value("X-Sum"), Some("11"));
}

#[test]
fn test_decoder_rejects_missing_crlf_after_data() {
    let mut decoder = ChunkedDecoder::new();
    let mut buffer = BytesMut::from(&b"3\r\nabcXX0\r\n\r\n"[..]);

    assert!(decoder.decode(&mut buffer).is_err());
}

#[test]
fn test_decoder_rejects_size_that_overflows() {
    let mut decoder = ChunkedDecoder::new();
    let mut buffer = BytesMut::from(&b"FFFFFFFFFFFFFFFF\r\nab"[..]);

    assert!(matches!(decoder.decode(&mut buffer), Err(Error::Format(_))));
}

#[test]
fn test_decoder_rejects_oversized_chunk() {
    let mut decoder = ChunkedDecoder::new();
    let line = format!("{:X}\r\n", MAX_CHUNK_SIZE + 1);
    let mut buffer = BytesMut::from(line.as_bytes());

    assert!(matches!(decoder.decode(&mut buffer), Err(Error::Format(_))));
}

#[test]
fn test_size_line_wider_than_usize_is_format_error() {
    assert!(matches!(
        ChunkSizeLine::parse("1FFFFFFFFFFFFFFFF\r\n"),
        Err(Error::Format(_))
    ));
}
