use carbide::Error;
use carbide::http::header::{Header, HeaderCollection};

#[test]
fn test_header_new_trims() {
    let header = Header::new("  Host ", "  example.com  ").unwrap();

    assert_eq!(header.name(), "Host");
    assert_eq!(header.value(), "example.com");
}

#[test]
fn test_header_rejects_control_characters() {
    assert!(matches!(
        Header::new("X-Test", "a\r\nInjected: yes"),
        Err(Error::InvalidToken { .. })
    ));
    assert!(matches!(Header::new("", "x"), Err(Error::InvalidToken { .. })));
}

#[test]
fn test_header_parse_splits_at_first_colon() {
    let header = Header::parse("Host: example.com:8080\r\n").unwrap();

    assert_eq!(header.name(), "Host");
    assert_eq!(header.value(), "example.com:8080");
}

#[test]
fn test_header_parse_without_colon_is_format_error() {
    assert!(matches!(Header::parse("NoColonHere"), Err(Error::Format(_))));
}

#[test]
fn test_header_display() {
    let header = Header::new("Content-Type", "text/plain").unwrap();
    assert_eq!(header.to_string(), "Content-Type: text/plain\r\n");
}

#[test]
fn test_lookup_is_case_insensitive_and_returns_first() {
    let mut headers = HeaderCollection::new();
    headers.add(Header::new("Accept", "text/html").unwrap());
    headers.add(Header::new("accept", "application/json").unwrap());

    assert!(headers.contains("ACCEPT"));
    assert_eq!(headers.value("accept"), Some("text/html"));
    assert_eq!(headers.len(), 2);
}

#[test]
fn test_remove_variants() {
    let mut headers: HeaderCollection = [
        Header::new("Via", "1").unwrap(),
        Header::new("Host", "h").unwrap(),
        Header::new("Via", "2").unwrap(),
        Header::new("Via", "3").unwrap(),
    ]
    .into_iter()
    .collect();

    let removed = headers.remove(&Header::new("VIA", "ignored").unwrap()).unwrap();
    assert_eq!(removed.value(), "1");

    assert_eq!(headers.remove_all_by_name("via"), 2);
    assert_eq!(headers.len(), 1);

    let host = headers.remove_at(0);
    assert_eq!(host.name(), "Host");
    assert!(headers.is_empty());
    assert!(headers.remove_by_name("Host").is_none());
}

#[test]
fn test_unknown_headers() {
    let mut headers = HeaderCollection::new();
    headers.add(Header::new("Host", "h").unwrap());
    headers.add(Header::new("X-Request-Id", "42").unwrap());
    headers.add(Header::new("Response-Needed", "false").unwrap());

    assert_eq!(
        headers.unknown_headers(),
        vec![("X-Request-Id".to_string(), "42".to_string())]
    );
    assert!(headers[0].is_known());
}

#[test]
fn test_serialize_drops_empty_values_and_keeps_order() {
    let mut headers = HeaderCollection::new();
    headers.add(Header::new("Host", "example.com").unwrap());
    headers.add(Header::new("X-Empty", "").unwrap());
    headers.add(Header::new("Accept", "*/*").unwrap());

    let text = headers.to_string();
    assert_eq!(text, "Host: example.com\r\nAccept: */*\r\n\r\n");

    let reparsed = HeaderCollection::parse_lines(text.split("\r\n")).unwrap();
    let names: Vec<&str> = reparsed.iter().map(Header::name).collect();
    assert_eq!(names, vec!["Host", "Accept"]);
}

#[test]
fn test_empty_collection_serializes_to_bare_crlf() {
    assert_eq!(HeaderCollection::new().to_string(), "\r\n");
}

#[test]
fn test_to_array() {
    let mut headers = HeaderCollection::new();
    headers.set("Host", "h", true).unwrap();
    headers.set("Host", "i", false).unwrap();

    assert_eq!(
        headers.to_array(),
        vec![
            ("Host".to_string(), "h".to_string()),
            ("Host".to_string(), "i".to_string())
        ]
    );
}
