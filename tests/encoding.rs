//! Encoding detection and numeric-character-reference boundary scenarios.

use pretty_assertions::assert_eq;

use xmlcore::errors::{Error, SyntaxError};
use xmlcore::reader::Node;
use xmlcore::Reader;

#[test]
fn utf8_bom_is_consumed_silently() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"<a/>");
    let mut reader = Reader::new(bytes.as_slice());
    assert!(matches!(reader.read().unwrap(), Node::ElementStart { name } if name == "a"));
    assert!(matches!(reader.read().unwrap(), Node::ElementEnd { .. }));
    assert!(matches!(reader.read().unwrap(), Node::Eof));
}

#[test]
fn utf16_le_bom_is_auto_detected() {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "<a>h\u{e9}</a>".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let mut reader = Reader::new(bytes.as_slice());
    assert!(matches!(reader.read().unwrap(), Node::ElementStart { name } if name == "a"));
    assert!(matches!(reader.read().unwrap(), Node::Text { content } if content == "h\u{e9}"));
    assert!(matches!(reader.read().unwrap(), Node::ElementEnd { .. }));
}

#[test]
fn xml_declaration_encoding_switches_the_active_decoder() {
    let mut reader = Reader::new(br#"<?xml version="1.0" encoding="UTF-8"?><a/>"#.as_slice());
    match reader.read().unwrap() {
        Node::XmlDeclaration { version, encoding, .. } => {
            assert_eq!(version, "1.0");
            assert_eq!(encoding, Some("UTF-8"));
        }
        other => panic!("expected xml_declaration, got {other:?}"),
    }
}

#[test]
fn missing_version_defaults_to_one_point_zero() {
    let mut reader = Reader::new(br#"<?xml encoding="UTF-8"?><a/>"#.as_slice());
    match reader.read().unwrap() {
        Node::XmlDeclaration { version, .. } => assert_eq!(version, "1.0"),
        other => panic!("expected xml_declaration, got {other:?}"),
    }
}

#[test]
fn numeric_character_reference_overflow_is_rejected() {
    let mut reader = Reader::new(b"<a>&#99999999999999999999;</a>".as_slice());
    assert!(matches!(reader.read().unwrap(), Node::ElementStart { .. }));
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::Overflow(_)));
}

#[test]
fn invalid_codepoint_character_reference_is_ill_formed() {
    let mut reader = Reader::new(b"<a>&#xD800;</a>".as_slice());
    assert!(matches!(reader.read().unwrap(), Node::ElementStart { .. }));
    let err = reader.read().unwrap_err();
    assert!(!matches!(err, Error::Overflow(_)));
}

#[test]
fn malformed_reference_is_a_syntax_error() {
    let mut reader = Reader::new(b"<a>& </a>".as_slice());
    assert!(matches!(reader.read().unwrap(), Node::ElementStart { .. }));
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::Syntax(SyntaxError::MalformedReference, _)));
}
