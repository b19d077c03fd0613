//! End-to-end well-formedness scenarios, reading full documents through
//! [`xmlcore::Reader`] and checking the resulting node sequence and, for
//! intentionally ill-formed input, the specific error surfaced.

use pretty_assertions::assert_eq;

use xmlcore::errors::{Error, IllFormedError, SyntaxError};
use xmlcore::reader::Node;
use xmlcore::{Reader, ReaderConfig};

/// A snapshot of one [`Node`], owned so a whole document's worth can be
/// collected into a `Vec` without fighting the reader's `&self` borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Snapshot {
    ElementStart { name: String, attrs: Vec<(String, String)> },
    ElementEnd { name: String },
    Text(String),
    CData(String),
    CharRef(u32),
    EntityRef(String),
    Comment(String),
    Pi { target: String, data: String },
    XmlDecl { version: String, encoding: Option<String> },
    Eof,
}

fn snapshot(reader: &Reader<&[u8]>, node: &Node<'_>) -> Snapshot {
    match node {
        Node::ElementStart { name } => {
            let attrs = (0..reader.attribute_count())
                .map(|i| {
                    (
                        reader.attribute_name(i).unwrap().to_string(),
                        reader.attribute_value(i).unwrap().to_string(),
                    )
                })
                .collect();
            Snapshot::ElementStart { name: name.to_string(), attrs }
        }
        Node::ElementEnd { name } => Snapshot::ElementEnd { name: name.to_string() },
        Node::Text { content } => Snapshot::Text(content.to_string()),
        Node::CData { content } => Snapshot::CData(content.to_string()),
        Node::CharacterReference { codepoint } => Snapshot::CharRef(*codepoint),
        Node::EntityReference { name } => Snapshot::EntityRef(name.to_string()),
        Node::Comment { content } => Snapshot::Comment(content.to_string()),
        Node::Pi { target, data } => Snapshot::Pi { target: target.to_string(), data: data.to_string() },
        Node::XmlDeclaration { version, encoding, .. } => {
            Snapshot::XmlDecl { version: version.to_string(), encoding: encoding.map(str::to_string) }
        }
        Node::Eof => Snapshot::Eof,
    }
}

fn collect(xml: &str) -> Vec<Snapshot> {
    let mut reader = Reader::new(xml.as_bytes());
    let mut out = Vec::new();
    loop {
        let node = reader.read().expect("well-formed document");
        let snap = snapshot(&reader, &node);
        let is_eof = snap == Snapshot::Eof;
        out.push(snap);
        if is_eof {
            return out;
        }
    }
}

#[test]
fn empty_element() {
    assert_eq!(
        collect("<a/>"),
        vec![
            Snapshot::ElementStart { name: "a".to_string(), attrs: vec![] },
            Snapshot::ElementEnd { name: "a".to_string() },
            Snapshot::Eof,
        ]
    );
}

#[test]
fn element_with_quoted_attributes_and_text() {
    assert_eq!(
        collect(r#"<a x="1" y='2'>t</a>"#),
        vec![
            Snapshot::ElementStart {
                name: "a".to_string(),
                attrs: vec![("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())],
            },
            Snapshot::Text("t".to_string()),
            Snapshot::ElementEnd { name: "a".to_string() },
            Snapshot::Eof,
        ]
    );
}

#[test]
fn mixed_line_endings_collapse_to_lf() {
    assert_eq!(
        collect("<r>\r\nA\rB\nC</r>"),
        vec![
            Snapshot::ElementStart { name: "r".to_string(), attrs: vec![] },
            Snapshot::Text("\nA\nB\nC".to_string()),
            Snapshot::ElementEnd { name: "r".to_string() },
            Snapshot::Eof,
        ]
    );
}

#[test]
fn content_references_are_not_expanded() {
    assert_eq!(
        collect("<a>&amp;&#65;&lt;</a>"),
        vec![
            Snapshot::ElementStart { name: "a".to_string(), attrs: vec![] },
            Snapshot::EntityRef("amp".to_string()),
            Snapshot::CharRef(65),
            Snapshot::EntityRef("lt".to_string()),
            Snapshot::ElementEnd { name: "a".to_string() },
            Snapshot::Eof,
        ]
    );
}

#[test]
fn xml_declaration_scenario() {
    assert_eq!(
        collect(r#"<?xml version="1.0" encoding="UTF-8"?><a/>"#),
        vec![
            Snapshot::XmlDecl { version: "1.0".to_string(), encoding: Some("UTF-8".to_string()) },
            Snapshot::ElementStart { name: "a".to_string(), attrs: vec![] },
            Snapshot::ElementEnd { name: "a".to_string() },
            Snapshot::Eof,
        ]
    );
}

#[test]
fn mismatched_end_tag_is_an_error() {
    let mut reader = Reader::new(b"<a></b>".as_slice());
    assert!(matches!(reader.read().unwrap(), Node::ElementStart { .. }));
    let err = reader.read().unwrap_err();
    match err {
        Error::IllFormed(IllFormedError::MismatchedEndTag { expected, found }, pos) => {
            assert_eq!(expected, "a");
            assert_eq!(found, "b");
            // Position of `b` itself, not wherever the cursor ends up after
            // consuming the rest of the end tag.
            assert_eq!(pos.line, 1);
            assert_eq!(pos.column, 6);
        }
        other => panic!("expected MismatchedEndTag, got {other:?}"),
    }
}

#[test]
fn unmatched_end_tag_is_an_error() {
    let mut reader = Reader::new(b"</a>".as_slice());
    let err = reader.read().unwrap_err();
    assert!(matches!(
        err,
        Error::IllFormed(IllFormedError::UnmatchedEndTag(name), _) if name == "a"
    ));
}

#[test]
fn doctype_is_rejected() {
    let mut reader = Reader::new(b"<!DOCTYPE x><a/>".as_slice());
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::IllFormed(IllFormedError::DoctypeUnsupported, _)));
}

#[test]
fn comment_and_cdata_round_trip() {
    assert_eq!(
        collect("<a><!-- note -->[<![CDATA[<raw>]]>]</a>"),
        vec![
            Snapshot::ElementStart { name: "a".to_string(), attrs: vec![] },
            Snapshot::Comment(" note ".to_string()),
            Snapshot::Text("[".to_string()),
            Snapshot::CData("<raw>".to_string()),
            Snapshot::Text("]".to_string()),
            Snapshot::ElementEnd { name: "a".to_string() },
            Snapshot::Eof,
        ]
    );
}

#[test]
fn cdata_end_sequence_outside_cdata_is_rejected() {
    let mut reader = Reader::new(b"<a>]]></a>".as_slice());
    assert!(matches!(reader.read().unwrap(), Node::ElementStart { .. }));
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::Syntax(SyntaxError::UnexpectedCDataEnd, _)));
}

#[test]
fn missing_whitespace_between_attributes_is_rejected() {
    let mut reader = Reader::new(br#"<a x="1"y="2"/>"#.as_slice());
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::Syntax(SyntaxError::ExpectedWhitespace, _)));
}

#[test]
fn long_text_run_splits_into_consecutive_text_nodes() {
    let xml = format!("<a>{}</a>", "x".repeat(20));
    let mut config = ReaderConfig::new();
    config.with_buffer_capacity(8);
    let mut reader = Reader::with_config(xml.as_bytes(), config);
    assert!(matches!(reader.read().unwrap(), Node::ElementStart { .. }));

    let mut text = String::new();
    loop {
        match reader.read().unwrap() {
            Node::Text { content } => text.push_str(content),
            Node::ElementEnd { .. } => break,
            other => panic!("unexpected node {other:?}"),
        }
    }
    assert_eq!(text, "x".repeat(20));
}

#[test]
fn overlong_name_is_an_overflow_error() {
    let xml = format!("<{}/>", "n".repeat(20));
    let mut config = ReaderConfig::new();
    config.with_buffer_capacity(8);
    let mut reader = Reader::with_config(xml.as_bytes(), config);
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::Overflow(_)));
}

#[test]
fn duplicate_attribute_is_rejected() {
    let mut reader = Reader::new(br#"<a x="1" x="2"/>"#.as_slice());
    let err = reader.read().unwrap_err();
    assert!(matches!(
        err,
        Error::IllFormed(IllFormedError::DuplicateAttribute { name }, _) if name == "x"
    ));
}

#[test]
fn processing_instruction_outside_declaration() {
    assert_eq!(
        collect("<a><?pi some data?></a>"),
        vec![
            Snapshot::ElementStart { name: "a".to_string(), attrs: vec![] },
            Snapshot::Pi { target: "pi".to_string(), data: "some data".to_string() },
            Snapshot::ElementEnd { name: "a".to_string() },
            Snapshot::Eof,
        ]
    );
}

#[test]
fn attribute_value_whitespace_is_normalized_to_spaces() {
    assert_eq!(
        collect("<a x=\"1\t2\n3\"/>"),
        vec![
            Snapshot::ElementStart { name: "a".to_string(), attrs: vec![("x".to_string(), "1 2 3".to_string())] },
            Snapshot::ElementEnd { name: "a".to_string() },
            Snapshot::Eof,
        ]
    );
}
