use carbide::http::header::Header;
use carbide::http::message::{HttpMessage, Message};
use carbide::http::response::{Response, ResponseBuilder};
use carbide::http::status::StatusCode;

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::NoContent.as_u16(), 204);
    assert_eq!(StatusCode::TemporaryRedirect.as_u16(), 307);
    assert_eq!(StatusCode::ExpectationFailed.as_u16(), 417);
    assert_eq!(StatusCode::HttpVersionNotSupported.as_u16(), 505);
}

#[test]
fn test_status_code_from_u16() {
    assert_eq!(StatusCode::from_u16(404), Some(StatusCode::NotFound));
    assert_eq!(StatusCode::from_u16(306), None);
    assert_eq!(StatusCode::from_u16(999), None);
}

#[test]
fn test_response_ok() {
    let response = Response::ok("Hello");

    assert_eq!(response.status_code(), StatusCode::Ok);
    assert_eq!(response.content_type(), Some("text/plain"));
    assert_eq!(response.content_length().unwrap(), Some(5));
    assert_eq!(
        response.to_bytes(),
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nHello".to_vec()
    );
}

#[test]
fn test_response_not_found() {
    let response = Response::not_found();

    assert_eq!(response.status_code(), StatusCode::NotFound);
    assert_eq!(response.body(), b"404 Not Found");
}

#[test]
fn test_method_not_allowed_carries_allow() {
    let response = Response::method_not_allowed("GET, HEAD");

    assert_eq!(response.status_code(), StatusCode::MethodNotAllowed);
    assert_eq!(response.allow(), Some("GET, HEAD"));
}

#[test]
fn test_builder_custom_reason() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .reason("Fine")
        .body(Vec::new())
        .build();

    assert_eq!(response.first_line(), "HTTP/1.1 200 Fine\r\n");
    assert_eq!(response.content_length().unwrap(), Some(0));
}

#[test]
fn test_chunked_response_serialization() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header(Header::new("Transfer-Encoding", "chunked").unwrap())
        .body(b"abc".to_vec())
        .build();

    assert!(response.is_chunked());
    assert_eq!(response.content_length().unwrap(), None);
    assert_eq!(
        response.to_bytes(),
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n".to_vec()
    );
}

#[test]
fn test_from_message() {
    let mut headers = carbide::http::header::HeaderCollection::new();
    headers.add(Header::new("ETag", "\"v1\"").unwrap());
    let response = Response::from_message(Message::new("HTTP/1.0 304 Not Modified\r\n", headers)).unwrap();

    assert_eq!(response.status_code(), StatusCode::NotModified);
    assert_eq!(response.etag(), Some("\"v1\""));
    assert!(response.wants_close());
}

#[test]
fn test_from_message_with_bad_status() {
    let message = Message::new("HTTP/1.1 999 Odd", Default::default());
    assert!(Response::from_message(message).is_err());
}
