use carbide::Error;
use carbide::http::request_line::RequestLine;
use carbide::http::status::{Status, StatusCode, StatusLine};
use carbide::http::version::ProtocolVersion;

#[test]
fn test_protocol_version_round_trip() {
    let version = ProtocolVersion::parse("HTTP/1.0\r\n").unwrap();

    assert_eq!(version.protocol(), "HTTP");
    assert_eq!(version.version(), "1.0");
    assert_eq!(version.to_string(), ProtocolVersion::HTTP_1_0);
    assert_eq!(ProtocolVersion::default().to_string(), ProtocolVersion::HTTP_1_1);
}

#[test]
fn test_protocol_version_garbage_fails() {
    assert!(matches!(ProtocolVersion::parse("garbage"), Err(Error::Format(_))));
}

#[test]
fn test_request_line_round_trip() {
    let text = "GET /index.html HTTP/1.1\r\n";
    let line = RequestLine::parse(text).unwrap();

    assert_eq!(line.method(), "GET");
    assert_eq!(line.request_uri(), "/index.html");
    assert_eq!(line.protocol_version, ProtocolVersion::http_1_1());
    assert_eq!(line.to_string(), text);
}

#[test]
fn test_request_line_too_few_parts() {
    assert!(matches!(RequestLine::parse("GET /"), Err(Error::Format(_))));
}

#[test]
fn test_request_line_bad_version() {
    assert!(RequestLine::parse("GET / nonsense").is_err());
}

#[test]
fn test_status_parse_known_code() {
    let status = Status::parse("200 OK").unwrap();

    assert_eq!(status.code, StatusCode::Ok);
    assert_eq!(status.reason, "OK");
}

#[test]
fn test_status_parse_keeps_received_reason() {
    let status = Status::parse("404 Nope").unwrap();
    assert_eq!(status.code, StatusCode::NotFound);
    assert_eq!(status.reason, "Nope");
}

#[test]
fn test_status_parse_missing_reason_uses_standard_phrase() {
    let status = Status::parse("204").unwrap();
    assert_eq!(status.reason, "No Content");
}

#[test]
fn test_status_parse_unknown_code_fails() {
    assert!(matches!(Status::parse("999 Whatever"), Err(Error::Format(_))));
    assert!(Status::parse("abc OK").is_err());
}

#[test]
fn test_status_line_round_trip() {
    let text = "HTTP/1.1 500 Internal Server Error\r\n";
    let line = StatusLine::parse(text).unwrap();

    assert_eq!(line.status.code, StatusCode::InternalServerError);
    assert_eq!(line.to_string(), text);
}
