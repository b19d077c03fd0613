//! Qualified names and namespace scope tracking, per the W3C
//! [Namespaces in XML 1.0][spec] (Third Edition) recommendation.
//!
//! [spec]: https://www.w3.org/TR/xml-names/

use crate::chars::is_ncname;
use crate::errors::NamespaceError;

/// The namespace name bound to the reserved `xml` prefix, fixed by the spec
/// and never declared explicitly.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace name bound to the reserved `xmlns` prefix.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A name split into an optional namespace prefix and a local part.
///
/// `QName::parse` only checks the *lexical* shape (at most one colon,
/// both halves are valid `NCName`s); it does not resolve the prefix against
/// any scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local: &'a str,
}

impl<'a> QName<'a> {
    /// Splits `raw` on its first colon and validates both halves as `NCName`s.
    ///
    /// A name with no colon is returned with `prefix: None`. A name with more
    /// than one colon, or with either half not a valid `NCName`, is rejected.
    pub fn parse(raw: &'a str) -> Result<Self, NamespaceError> {
        match raw.split_once(':') {
            None => {
                if is_ncname(raw) {
                    Ok(QName { prefix: None, local: raw })
                } else {
                    Err(NamespaceError::InvalidQName(raw.to_string()))
                }
            }
            Some((prefix, local)) => {
                if prefix.is_empty() || local.contains(':') || !is_ncname(prefix) || !is_ncname(local) {
                    return Err(NamespaceError::InvalidQName(raw.to_string()));
                }
                Ok(QName { prefix: Some(prefix), local })
            }
        }
    }
}

/// An entry recording one `xmlns[:prefix]="uri"` binding, indexed into an
/// internally owned text buffer rather than heap-allocating a `String` per
/// binding.
#[derive(Debug, Clone)]
struct NamespaceEntry {
    /// Offset of this entry's text (prefix followed by uri) in `buffer`.
    start: usize,
    /// Length of the prefix part; zero means this binds the default namespace.
    prefix_len: usize,
    /// Length of the uri part. Zero means the prefix/default was explicitly
    /// undeclared with `xmlns[:prefix]=""` and no longer resolves.
    uri_len: usize,
    /// Element nesting depth at which this binding was declared; the
    /// declaring element itself is depth 1.
    level: i32,
}

impl NamespaceEntry {
    fn prefix<'b>(&self, buffer: &'b str) -> &'b str {
        &buffer[self.start..self.start + self.prefix_len]
    }

    fn uri<'b>(&self, buffer: &'b str) -> Option<&'b str> {
        if self.uri_len == 0 {
            None
        } else {
            let start = self.start + self.prefix_len;
            Some(&buffer[start..start + self.uri_len])
        }
    }
}

/// Tracks the stack of in-scope namespace bindings across nested elements.
///
/// Bindings declared on an element apply to that element and its descendants
/// until the element closes, at which point [`NamespaceResolver::end_element`]
/// unwinds exactly the bindings declared at that depth.
#[derive(Debug, Default, Clone)]
pub struct NamespaceResolver {
    bindings: Vec<NamespaceEntry>,
    buffer: String,
    depth: i32,
}

impl NamespaceResolver {
    /// Creates an empty resolver with no bindings in scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new element scope. Call once per `element_start`, before any
    /// [`Self::bind`] calls for that element's `xmlns` attributes.
    pub fn begin_element(&mut self) {
        self.depth += 1;
    }

    /// Records one `xmlns="uri"` (`prefix = ""`) or `xmlns:prefix="uri"`
    /// binding for the current element scope.
    ///
    /// Does not validate the prefix or uri; callers are expected to reject
    /// the reserved `xml`/`xmlns` prefixes being rebound before calling this.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        let start = self.buffer.len();
        self.buffer.push_str(prefix);
        self.buffer.push_str(uri);
        self.bindings.push(NamespaceEntry {
            start,
            prefix_len: prefix.len(),
            uri_len: uri.len(),
            level: self.depth,
        });
    }

    /// Closes the current element scope, unwinding every binding declared on
    /// the element that is now closing. Call once per matched end tag, after
    /// the caller is done reading the closing node.
    pub fn end_element(&mut self) {
        let closing_level = self.depth;
        match self.bindings.iter().rposition(|n| n.level < closing_level) {
            None => {
                self.buffer.clear();
                self.bindings.clear();
            }
            Some(last_kept) => {
                if let Some(cut) = self.bindings.get(last_kept + 1).map(|n| n.start) {
                    self.buffer.truncate(cut);
                    self.bindings.truncate(last_kept + 1);
                }
            }
        }
        self.depth -= 1;
    }

    fn lookup(&self, prefix: &str) -> Option<&NamespaceEntry> {
        self.bindings
            .iter()
            .rev()
            .find(|n| n.prefix(&self.buffer) == prefix)
    }

    /// Resolves an element's qualified name into its namespace name, if any.
    ///
    /// Unlike attributes, an unprefixed element name *does* pick up the
    /// current default namespace declaration.
    pub fn resolve_element<'n>(&self, name: QName<'n>) -> Result<Option<&str>, NamespaceError> {
        match name.prefix {
            None => Ok(self.lookup("").and_then(|n| n.uri(&self.buffer))),
            Some("xml") => Ok(Some(XML_NAMESPACE)),
            Some("xmlns") => Err(NamespaceError::QNameNotAllowed(format!(
                "xmlns:{}",
                name.local
            ))),
            Some(prefix) => match self.lookup(prefix) {
                Some(n) => Ok(n.uri(&self.buffer)),
                None => Err(NamespaceError::UndeclaredPrefix(prefix.to_string())),
            },
        }
    }

    /// Resolves an attribute's qualified name into its namespace name, if any.
    ///
    /// An unprefixed attribute name never binds to a namespace, default or
    /// otherwise; only `prefix:local` attribute names are namespace-qualified.
    pub fn resolve_attribute<'n>(&self, name: QName<'n>) -> Result<Option<&str>, NamespaceError> {
        match name.prefix {
            None => Ok(None),
            Some("xml") => Ok(Some(XML_NAMESPACE)),
            Some("xmlns") => Ok(Some(XMLNS_NAMESPACE)),
            Some(prefix) => match self.lookup(prefix) {
                Some(n) => Ok(n.uri(&self.buffer)),
                None => Err(NamespaceError::UndeclaredPrefix(prefix.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn qname_splits_on_colon() {
        let q = QName::parse("a:b").unwrap();
        assert_eq!(q.prefix, Some("a"));
        assert_eq!(q.local, "b");

        let q = QName::parse("b").unwrap();
        assert_eq!(q.prefix, None);
        assert_eq!(q.local, "b");
    }

    #[test]
    fn qname_rejects_multiple_colons_and_empty_parts() {
        assert!(QName::parse("a:b:c").is_err());
        assert!(QName::parse(":b").is_err());
        assert!(QName::parse("a:").is_err());
        assert!(QName::parse("").is_err());
    }

    #[test]
    fn default_namespace_applies_to_unprefixed_elements_only() {
        let mut r = NamespaceResolver::new();
        r.begin_element();
        r.bind("", "urn:example");
        let elem = QName::parse("item").unwrap();
        let attr = QName::parse("item").unwrap();
        assert_eq!(r.resolve_element(elem).unwrap(), Some("urn:example"));
        assert_eq!(r.resolve_attribute(attr).unwrap(), None);
    }

    #[test]
    fn prefixed_lookup_and_undeclared_prefix() {
        let mut r = NamespaceResolver::new();
        r.begin_element();
        r.bind("p", "urn:p");
        let found = QName::parse("p:item").unwrap();
        assert_eq!(r.resolve_element(found).unwrap(), Some("urn:p"));

        let missing = QName::parse("q:item").unwrap();
        assert!(r.resolve_element(missing).is_err());
    }

    #[test]
    fn scopes_unwind_on_end_element() {
        let mut r = NamespaceResolver::new();
        r.begin_element();
        r.bind("p", "urn:outer");
        r.begin_element();
        r.bind("p", "urn:inner");
        let name = QName::parse("p:x").unwrap();
        assert_eq!(r.resolve_element(name).unwrap(), Some("urn:inner"));
        r.end_element();
        assert_eq!(r.resolve_element(name).unwrap(), Some("urn:outer"));
        r.end_element();
        assert!(r.resolve_element(name).is_err());
    }

    #[test]
    fn empty_uri_undeclares_default_namespace() {
        let mut r = NamespaceResolver::new();
        r.begin_element();
        r.bind("", "urn:outer");
        r.begin_element();
        r.bind("", "");
        let name = QName::parse("item").unwrap();
        assert_eq!(r.resolve_element(name).unwrap(), None);
        r.end_element();
        assert_eq!(r.resolve_element(name).unwrap(), Some("urn:outer"));
    }

    #[test]
    fn xml_prefix_resolves_to_fixed_namespace_without_declaration() {
        let r = NamespaceResolver::new();
        let name = QName::parse("xml:lang").unwrap();
        assert_eq!(r.resolve_attribute(name).unwrap(), Some(XML_NAMESPACE));
    }
}
