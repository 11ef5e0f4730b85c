//! Header Tests
//!
//! Tests for header line reading and request parsing.

use std::io::{BufRead, BufReader, Cursor, Read};
use lms::protocol::{read_line, Arity, Request};
use lms::LmsError;

// =============================================================================
// Line Reading Tests
// =============================================================================

#[test]
fn test_read_line_strips_terminator() {
    let mut cursor = Cursor::new(b"LOGIN|stu1|pw\n".to_vec());
    let line = read_line(&mut cursor, 1024).unwrap();
    assert_eq!(line.as_deref(), Some("LOGIN|stu1|pw"));
}

#[test]
fn test_read_line_strips_carriage_return() {
    let mut cursor = Cursor::new(b"ASSIGN_LIST|stu1\r\n".to_vec());
    let line = read_line(&mut cursor, 1024).unwrap();
    assert_eq!(line.as_deref(), Some("ASSIGN_LIST|stu1"));
}

#[test]
fn test_read_line_leaves_payload_in_reader() {
    let mut data = b"ASSIGN_SUBMIT_FILE|stu1|7|hw.zip|5\n".to_vec();
    data.extend_from_slice(b"\x00\x01\n\x02\x03");
    let mut reader = BufReader::new(Cursor::new(data));

    let line = read_line(&mut reader, 1024).unwrap().unwrap();
    assert_eq!(line, "ASSIGN_SUBMIT_FILE|stu1|7|hw.zip|5");

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload).unwrap();
    assert_eq!(payload, b"\x00\x01\n\x02\x03");
}

#[test]
fn test_read_line_across_small_buffers() {
    // A 4-byte buffer forces the line to arrive in many pieces
    let mut reader = BufReader::with_capacity(4, Cursor::new(b"NOTICE_LIST|teacher\nrest".to_vec()));
    let line = read_line(&mut reader, 1024).unwrap();
    assert_eq!(line.as_deref(), Some("NOTICE_LIST|teacher"));

    let rest = reader.fill_buf().unwrap().to_vec();
    assert_eq!(rest, b"rest");
}

#[test]
fn test_read_line_eof_without_terminator() {
    let mut cursor = Cursor::new(b"LOGIN|stu1".to_vec());
    assert_eq!(read_line(&mut cursor, 1024).unwrap(), None);
}

#[test]
fn test_read_line_empty_stream() {
    let mut cursor = Cursor::new(Vec::new());
    assert_eq!(read_line(&mut cursor, 1024).unwrap(), None);
}

#[test]
fn test_read_line_too_long() {
    let mut data = vec![b'A'; 200];
    data.push(b'\n');
    let mut cursor = Cursor::new(data);

    match read_line(&mut cursor, 100) {
        Err(LmsError::HeaderTooLong { limit }) => assert_eq!(limit, 100),
        other => panic!("Expected HeaderTooLong, got {:?}", other),
    }
}

#[test]
fn test_read_line_exactly_at_limit() {
    let mut data = vec![b'A'; 100];
    data.push(b'\n');
    let mut cursor = Cursor::new(data);
    let line = read_line(&mut cursor, 100).unwrap().unwrap();
    assert_eq!(line.len(), 100);
}

#[test]
fn test_read_line_invalid_utf8_is_replaced() {
    let mut cursor = Cursor::new(b"CHAT_POST|a|b|\xff\xfe\n".to_vec());
    let line = read_line(&mut cursor, 1024).unwrap().unwrap();
    assert!(line.starts_with("CHAT_POST|a|b|"));
    assert!(line.contains('\u{FFFD}'));
}

#[test]
fn test_read_line_utf8_content() {
    let mut cursor = Cursor::new("NOTICE_CREATE|teacher|중간고사 안내\n".as_bytes().to_vec());
    let line = read_line(&mut cursor, 1024).unwrap().unwrap();
    assert_eq!(line, "NOTICE_CREATE|teacher|중간고사 안내");
}

// =============================================================================
// Request Parsing Tests
// =============================================================================

#[test]
fn test_parse_verb_and_fields() {
    let request = Request::parse("ASSIGN_SUBMIT_FILE|stu1|7|hw.zip|1024");
    assert_eq!(request.verb, "ASSIGN_SUBMIT_FILE");
    assert_eq!(request.fields, vec!["stu1", "7", "hw.zip", "1024"]);
}

#[test]
fn test_parse_verb_only() {
    let request = Request::parse("PING");
    assert_eq!(request.verb, "PING");
    assert!(request.fields.is_empty());
}

#[test]
fn test_parse_keeps_empty_fields() {
    let request = Request::parse("CHAT_POST|a||");
    assert_eq!(request.fields, vec!["a", "", ""]);
}

#[test]
fn test_parse_empty_line() {
    let request = Request::parse("");
    assert_eq!(request.verb, "");
    assert!(request.fields.is_empty());
}

#[test]
fn test_to_line_round_trip() {
    let request = Request::new("VIDEO_WATCH", ["stu1", "3"]);
    let line = request.to_line();
    assert_eq!(line, "VIDEO_WATCH|stu1|3\n");
    assert_eq!(Request::parse(line.trim_end()), request);
}

// =============================================================================
// Arity Tests
// =============================================================================

#[test]
fn test_exact_arity() {
    let arity = Arity::Exact(2);
    assert!(arity.accepts(2));
    assert!(!arity.accepts(1));
    assert!(!arity.accepts(3));
}

#[test]
fn test_at_least_arity() {
    let arity = Arity::AtLeast(3);
    assert!(!arity.accepts(2));
    assert!(arity.accepts(3));
    assert!(arity.accepts(10));
}
