//! Namespace resolution scenarios.

use pretty_assertions::assert_eq;

use xmlcore::errors::{Error, NamespaceError};
use xmlcore::reader::Node;
use xmlcore::Reader;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedStart {
    prefix: Option<String>,
    local: String,
    namespace_uri: Option<String>,
}

fn next_start(reader: &mut Reader<&[u8]>) -> ResolvedStart {
    match reader.read().expect("well-formed document") {
        Node::ElementStart { .. } => {
            let resolved = reader.element_name_ns().expect("element start resolves a name");
            ResolvedStart {
                prefix: resolved.prefix.clone(),
                local: resolved.local.clone(),
                namespace_uri: resolved.namespace_uri.clone(),
            }
        }
        other => panic!("expected element_start, got {other:?}"),
    }
}

#[test]
fn prefixed_elements_resolve_against_declared_binding() {
    let mut reader = Reader::new(br#"<p:a xmlns:p="u"><p:b/></p:a>"#.as_slice());

    let a = next_start(&mut reader);
    assert_eq!(a, ResolvedStart { prefix: Some("p".to_string()), local: "a".to_string(), namespace_uri: Some("u".to_string()) });

    let b = next_start(&mut reader);
    assert_eq!(b, ResolvedStart { prefix: Some("p".to_string()), local: "b".to_string(), namespace_uri: Some("u".to_string()) });

    assert!(matches!(reader.read().unwrap(), Node::ElementEnd { name } if name == "p:b"));
    assert!(matches!(reader.read().unwrap(), Node::ElementEnd { name } if name == "p:a"));
    assert!(matches!(reader.read().unwrap(), Node::Eof));
}

#[test]
fn default_namespace_applies_to_unprefixed_descendants() {
    let mut reader = Reader::new(br#"<root xmlns="urn:example"><child/></root>"#.as_slice());

    let root = next_start(&mut reader);
    assert_eq!(root.namespace_uri, Some("urn:example".to_string()));

    let child = next_start(&mut reader);
    assert_eq!(child.namespace_uri, Some("urn:example".to_string()));
}

#[test]
fn scope_ends_when_element_closes() {
    let mut reader = Reader::new(br#"<a><b xmlns:p="urn:b"><p:c/></b><p:d/></a>"#.as_slice());

    let _a = next_start(&mut reader);
    let _b = next_start(&mut reader);
    let c = next_start(&mut reader);
    assert_eq!(c.namespace_uri, Some("urn:b".to_string()));

    assert!(matches!(reader.read().unwrap(), Node::ElementEnd { .. })); // </p:c> synthesized
    assert!(matches!(reader.read().unwrap(), Node::ElementEnd { .. })); // </b>

    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::Namespace(NamespaceError::UndeclaredPrefix(p), _) if p == "p"));
}

#[test]
fn undeclared_prefix_is_an_error() {
    let mut reader = Reader::new(br#"<p:a/>"#.as_slice());
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::Namespace(NamespaceError::UndeclaredPrefix(p), _) if p == "p"));
}

#[test]
fn xml_prefix_resolves_without_declaration() {
    let mut reader = Reader::new(br#"<a xml:lang="en"/>"#.as_slice());
    let start = next_start(&mut reader);
    assert_eq!(start.local, "a");
    assert_eq!(reader.attribute_count(), 1);
    let resolved = reader.attribute_name_ns(0).unwrap();
    assert_eq!(resolved.namespace_uri.as_deref(), Some(xmlcore::name::XML_NAMESPACE));
}

#[test]
fn cannot_undeclare_a_prefix_with_empty_uri() {
    let mut reader = Reader::new(br#"<a xmlns:p="u"><b xmlns:p=""/></a>"#.as_slice());
    let _a = next_start(&mut reader);
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::Namespace(NamespaceError::CannotUndeclarePrefix(p), _) if p == "p"));
}
