//! The buffered pull reader: the component callers actually drive.
//!
//! A [`Reader`] owns a byte source, a [`Decoder`], and the [`Scanner`]; it
//! turns one or more [`Token`]s into a single user-visible [`Node`] per call
//! to [`Reader::read`], the way the reference crate's `reader/state.rs`
//! assembles `Event`s out of `Parser` tokens. Everything that needs memory
//! across tokens — matching end tags, collecting attributes, expanding
//! entities, namespace scope tracking — lives here, not in the Scanner.
//!
//! ## Buffer management
//!
//! The Reader keeps a single growable `Vec<u8>` that is always valid UTF-8,
//! since every codepoint it feeds the Scanner is first UTF-8-encoded into
//! this buffer at the offset the Scanner is told about. Between `read` calls
//! — when [`Scanner::is_idle`] reports no construct is in progress — the
//! buffer is cleared and the Scanner's notion of "current offset" rewound to
//! zero via [`Scanner::reset_position`].
//!
//! `buffer_capacity` is an enforced ceiling on top of that, not just an
//! initial allocation hint: [`Reader::read`] checks it every time it is about
//! to append a codepoint. What happens once the current construct would
//! outgrow it depends on what that construct is, per [`Scanner::pinned_span`]:
//! text, CDATA, comment bodies and PI data are cut short and handed back as a
//! node early, with the Scanner resuming the same construct at a fresh offset
//! — so a long run surfaces as several consecutive nodes of the same kind
//! rather than one. An attribute value is cut the same way, but silently: the
//! chunk is folded into the value being assembled and scanning resumes, since
//! an attribute's value is always returned to the caller as one assembled
//! string. A name (element, attribute, end tag, entity, PI target) cannot be
//! split this way and outgrowing the buffer there is an
//! [`Error::Overflow`].
//!
//! Values that must outlive the buffer that produced them (an open element's
//! name, the XML declaration's fields) are copied into small owned `String`
//! fields on the Reader itself rather than left as slices into `buf`, so a
//! later buffer compaction can't invalidate them.

use std::io::Read;

use crate::encoding::{AutoDecoder, Decoder};
use crate::entities::predefined_entity;
use crate::errors::{EncodingError, Error, IllFormedError, NamespaceError, Result, SyntaxError};
use crate::name::{NamespaceResolver, QName};
use crate::scanner::{Emit, PinnedSpan, Position, Range, ScanError, Scanner, SplitKind, Token};

/// Constructor-time options for a [`Reader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    buffer_capacity: usize,
    namespace_aware: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig { buffer_capacity: 4096, namespace_aware: true }
    }
}

impl ReaderConfig {
    /// Creates a default configuration: a 4 KiB buffer, namespace-aware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial capacity of the internal text buffer. Must be at least 2.
    pub fn with_buffer_capacity(&mut self, capacity: usize) -> &mut Self {
        self.buffer_capacity = capacity.max(2);
        self
    }

    /// Whether `xmlns`/`xmlns:prefix` declarations are resolved into
    /// `(prefix, namespace_uri, local)` triples. Defaults to `true`.
    pub fn with_namespace_aware(&mut self, aware: bool) -> &mut Self {
        self.namespace_aware = aware;
        self
    }
}

/// A resolved qualified name: the raw prefix and local part plus, if
/// namespace-aware mode is enabled and a binding was in scope, the resolved
/// namespace URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// The raw namespace prefix, if the name was qualified (`prefix:local`).
    pub prefix: Option<String>,
    /// The namespace name the prefix (or, for elements, the in-scope default
    /// namespace) resolved to, if any binding was in scope.
    pub namespace_uri: Option<String>,
    /// The local part of the name.
    pub local: String,
}

#[derive(Debug, Clone)]
struct ResolvedAttribute {
    raw_name: String,
    resolved: ResolvedName,
    value: String,
}

/// A node of the document, as seen by the caller of [`Reader::read`].
///
/// Attributes of an `ElementStart` are not carried inline; they're reached
/// through [`Reader::attribute_count`] and friends while this node is the
/// most recently returned one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    XmlDeclaration { version: &'a str, encoding: Option<&'a str>, standalone: Option<bool> },
    ElementStart { name: &'a str },
    ElementEnd { name: &'a str },
    Text { content: &'a str },
    CData { content: &'a str },
    CharacterReference { codepoint: u32 },
    EntityReference { name: &'a str },
    Comment { content: &'a str },
    Pi { target: &'a str, data: &'a str },
    Eof,
}

/// A buffered, pull-based XML reader over any [`Read`] byte source.
pub struct Reader<R> {
    source: R,
    decoder: Box<dyn Decoder>,
    scanner: Scanner,
    config: ReaderConfig,

    buf: Vec<u8>,
    /// `(byte offset into buf, position of the codepoint starting there)`,
    /// one entry per codepoint currently in `buf`. Cleared in lockstep with
    /// `buf` so a completed token's byte [`Range`] can be traced back to
    /// where it actually started, not wherever the live cursor has since
    /// advanced to.
    char_starts: Vec<(usize, Position)>,
    /// A codepoint already pulled from the decoder (and already normalized)
    /// that a buffer-capacity split postponed feeding to the Scanner; replayed
    /// at the start of the next `read` call before pulling a new one.
    pending_char: Option<(char, Position)>,
    /// Scratch owned text for a content/CDATA/comment/PI-data chunk that a
    /// buffer-capacity split forced out of `buf` before it could be returned
    /// as a borrowed slice.
    split_scratch: String,

    line: usize,
    column: usize,
    byte_offset: usize,
    after_cr: bool,

    ns: Option<NamespaceResolver>,
    open_elements: Vec<String>,
    pending_pop: bool,
    pending_synthetic_end: Option<String>,

    pending_element_name: Option<Range>,
    pending_attr_name: Option<Range>,
    value_scratch: String,
    raw_attrs: Vec<(Range, String)>,

    current_element_name: String,
    current_element_resolved: Option<ResolvedName>,
    current_attrs: Vec<ResolvedAttribute>,

    decl_version: String,
    decl_encoding: Option<String>,
    pi_target: String,
    pi_data: String,
}

impl<R: Read> Reader<R> {
    /// Builds a reader over `source` using the default [`ReaderConfig`].
    pub fn new(source: R) -> Self {
        Self::with_config(source, ReaderConfig::default())
    }

    /// Builds a reader over `source` with an explicit configuration.
    pub fn with_config(source: R, config: ReaderConfig) -> Self {
        Reader {
            source,
            decoder: Box::new(AutoDecoder::new()),
            scanner: Scanner::new(),
            buf: Vec::with_capacity(config.buffer_capacity),
            char_starts: Vec::new(),
            pending_char: None,
            split_scratch: String::new(),
            config,
            line: 1,
            column: 1,
            byte_offset: 0,
            after_cr: false,
            ns: None,
            open_elements: Vec::new(),
            pending_pop: false,
            pending_synthetic_end: None,
            pending_element_name: None,
            pending_attr_name: None,
            value_scratch: String::new(),
            raw_attrs: Vec::new(),
            current_element_name: String::new(),
            current_element_resolved: None,
            current_attrs: Vec::new(),
            decl_version: String::new(),
            decl_encoding: None,
            pi_target: String::new(),
            pi_data: String::new(),
        }
    }

    /// Replaces the decoder, e.g. to force a specific encoding instead of
    /// auto-detection.
    pub fn set_decoder(&mut self, decoder: Box<dyn Decoder>) {
        self.decoder = decoder;
    }

    /// Returns the next node, or [`Node::Eof`] once the document is
    /// exhausted. Once an error is returned, the Reader's state is frozen;
    /// callers must not call `read` again.
    pub fn read(&mut self) -> Result<Node<'_>> {
        if self.scanner.is_idle() && !self.buf.is_empty() {
            let shift = self.buf.len();
            self.buf.clear();
            self.char_starts.clear();
            self.scanner.reset_position(shift);
        }

        if let Some(name) = self.pending_synthetic_end.take() {
            let pos = self.position();
            return self.finish_element_end(name, pos);
        }

        if self.pending_pop {
            if let Some(ns) = self.ns.as_mut() {
                ns.end_element();
            }
            self.pending_pop = false;
        }

        loop {
            let (c, char_pos) = match self.pending_char.take() {
                Some(pending) => pending,
                None => {
                    let char_pos = self.position();
                    match self.next_normalized_char()? {
                        None => {
                            self.scanner.end_input().map_err(|e| self.wrap_scan_error(e))?;
                            return Ok(Node::Eof);
                        }
                        Some(c) => (self.apply_attribute_normalization(c), char_pos),
                    }
                }
            };

            if let Some(node) = self.check_capacity(c, char_pos)? {
                return Ok(node);
            }

            let start = self.buf.len();
            let mut tmp = [0u8; 4];
            self.buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
            let range = Range { start, end: self.buf.len() };
            self.char_starts.push((start, char_pos));
            let emit = self.scanner.feed(c, range).map_err(|e| self.wrap_scan_error(e))?;
            if let Some(node) = self.apply_emit(emit)? {
                return Ok(node);
            }
        }
    }

    /// Checks whether feeding `c` would push the Scanner's currently pinned
    /// construct past `buffer_capacity`, and if so handles it per
    /// [`Scanner::pinned_span`]: split off a node, silently flush an
    /// in-progress attribute value, or fail with [`Error::Overflow`]. Returns
    /// `Ok(None)` when there's nothing to do and `c` should be fed normally.
    fn check_capacity(&mut self, c: char, char_pos: Position) -> Result<Option<Node<'_>>> {
        let mut tmp = [0u8; 4];
        let extra = c.encode_utf8(&mut tmp).len();
        let span = match self.scanner.pinned_span() {
            Some(span) => span,
            None => return Ok(None),
        };
        let start = match span {
            PinnedSpan::Splittable(_, start) | PinnedSpan::AttributeValue(start) | PinnedSpan::Fixed(start) => {
                start
            }
        };
        if (self.buf.len() - start) + extra <= self.config.buffer_capacity {
            return Ok(None);
        }

        match span {
            PinnedSpan::Fixed(_) => Err(Error::Overflow(self.position())),
            PinnedSpan::AttributeValue(start) => {
                let chunk = self.text(Range { start, end: self.buf.len() }).to_string();
                self.value_scratch.push_str(&chunk);
                self.buf.clear();
                self.char_starts.clear();
                self.scanner.split_span(0);
                Ok(None)
            }
            PinnedSpan::Splittable(kind, start) => {
                let chunk = self.text(Range { start, end: self.buf.len() }).to_string();
                self.split_scratch.clear();
                self.split_scratch.push_str(&chunk);
                self.buf.clear();
                self.char_starts.clear();
                self.scanner.split_span(0);
                self.pending_char = Some((c, char_pos));
                Ok(Some(match kind {
                    SplitKind::Text => Node::Text { content: &self.split_scratch },
                    SplitKind::CData => Node::CData { content: &self.split_scratch },
                    SplitKind::Comment => Node::Comment { content: &self.split_scratch },
                    SplitKind::PiData => Node::Pi { target: &self.pi_target, data: &self.split_scratch },
                }))
            }
        }
    }

    /// The position of the codepoint that started at `byte_offset` in the
    /// current buffer, as recorded in `char_starts`. Falls back to the live
    /// cursor position if the offset isn't tracked (shouldn't happen for any
    /// offset taken from a token emitted against the current buffer).
    fn position_of(&self, byte_offset: usize) -> Position {
        self.char_starts
            .iter()
            .find(|(start, _)| *start == byte_offset)
            .map(|(_, pos)| *pos)
            .unwrap_or_else(|| self.position())
    }

    /// The resolved name of the most recently returned `ElementStart`/`ElementEnd` node.
    pub fn element_name_ns(&self) -> Option<&ResolvedName> {
        self.current_element_resolved.as_ref()
    }

    /// The number of attributes on the most recently returned `ElementStart`.
    pub fn attribute_count(&self) -> usize {
        self.current_attrs.len()
    }

    /// The raw (unresolved) name of the attribute at `index`.
    pub fn attribute_name(&self, index: usize) -> Option<&str> {
        self.current_attrs.get(index).map(|a| a.raw_name.as_str())
    }

    /// The resolved name of the attribute at `index`.
    pub fn attribute_name_ns(&self, index: usize) -> Option<&ResolvedName> {
        self.current_attrs.get(index).map(|a| &a.resolved)
    }

    /// The fully normalized and entity-expanded value of the attribute at `index`.
    pub fn attribute_value(&self, index: usize) -> Option<&str> {
        self.current_attrs.get(index).map(|a| a.value.as_str())
    }

    /// Finds the index of an attribute by its raw name.
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.current_attrs.iter().position(|a| a.raw_name == name)
    }

    fn text(&self, range: Range) -> &str {
        std::str::from_utf8(&self.buf[range.start..range.end])
            .expect("reader buffer is always valid utf-8")
    }

    fn position(&self) -> Position {
        Position { byte_offset: self.byte_offset, line: self.line, column: self.column }
    }

    fn wrap_scan_error(&self, e: ScanError) -> Error {
        let pos = self.position();
        match e {
            ScanError::Syntax(SyntaxError::UnexpectedEndOfInput) => Error::UnexpectedEndOfInput(pos),
            ScanError::Syntax(SyntaxError::Overflow) => Error::Overflow(pos),
            ScanError::Syntax(s) => Error::Syntax(s, pos),
            ScanError::IllFormed(i) => Error::IllFormed(i, pos),
        }
    }

    /// Reads one already-CRLF/CR-normalized codepoint from the decoder,
    /// tracking line/column as it goes.
    fn next_normalized_char(&mut self) -> Result<Option<char>> {
        loop {
            let decoded = self
                .decoder
                .read_codepoint(&mut self.source)
                .map_err(|e| self.wrap_encoding_error(e))?;
            let (c, len) = match decoded {
                None => return Ok(None),
                Some(v) => v,
            };
            self.byte_offset += len as usize;

            if self.after_cr {
                self.after_cr = false;
                if c == '\n' {
                    continue;
                }
            }
            let c = if c == '\r' {
                self.after_cr = true;
                '\n'
            } else {
                c
            };

            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            return Ok(Some(c));
        }
    }

    fn wrap_encoding_error(&self, e: EncodingError) -> Error {
        Error::Encoding(e, self.position())
    }

    /// Rewrites tab/LF to a single space while inside an attribute value's
    /// literal text, per XML 1.0 §3.3.3 (CDATA-type attribute normalization).
    /// CR has already become LF by the time this runs.
    fn apply_attribute_normalization(&self, c: char) -> char {
        if self.scanner.in_attribute_value_literal() && matches!(c, '\t' | '\n') {
            ' '
        } else {
            c
        }
    }

    fn apply_emit(&mut self, emit: Emit) -> Result<Option<Node<'_>>> {
        match emit {
            Emit::None => Ok(None),
            Emit::One(t) => self.apply_token(t),
            Emit::Two(a, b) => {
                let first = self.apply_token(a)?;
                debug_assert!(first.is_none(), "first token of a pair never yields a node directly");
                self.apply_token(b)
            }
        }
    }

    fn apply_token(&mut self, token: Token) -> Result<Option<Node<'_>>> {
        match token {
            Token::XmlDeclStart => {
                self.raw_attrs.clear();
                Ok(None)
            }
            Token::XmlDeclEnd => self.finish_xml_declaration(),
            Token::ElementStart { name } => {
                self.pending_element_name = Some(name);
                self.raw_attrs.clear();
                Ok(None)
            }
            Token::AttributeName { name } => {
                self.pending_attr_name = Some(name);
                self.value_scratch.clear();
                Ok(None)
            }
            Token::AttributeValueText { range } => {
                self.value_scratch.push_str(self.text(range));
                Ok(None)
            }
            Token::AttributeValueCharRef { codepoint } => {
                let ch = char::from_u32(codepoint).expect("scanner validated codepoint");
                self.value_scratch.push(ch);
                Ok(None)
            }
            Token::AttributeValueEntityRef { name } => {
                let entity_name = self.text(name).to_string();
                match predefined_entity(&entity_name) {
                    Some(replacement) => {
                        self.value_scratch.push_str(replacement);
                        Ok(None)
                    }
                    None => Err(self.illformed(IllFormedError::UndeclaredEntityReference(entity_name))),
                }
            }
            Token::AttributeValueEnd => {
                let name = self.pending_attr_name.take().expect("attribute name precedes its value");
                let value = std::mem::take(&mut self.value_scratch);
                self.raw_attrs.push((name, value));
                Ok(None)
            }
            Token::ElementStartEnd { empty } => self.finish_element_start(empty),
            Token::ElementEnd { name } => {
                let pos = self.position_of(name.start);
                let found = self.text(name).to_string();
                self.finish_element_end(found, pos)
            }
            Token::Text { range } => Ok(Some(Node::Text { content: self.text(range) })),
            Token::CData { range } => Ok(Some(Node::CData { content: self.text(range) })),
            Token::CharacterReference { codepoint } => Ok(Some(Node::CharacterReference { codepoint })),
            Token::EntityReference { name } => Ok(Some(Node::EntityReference { name: self.text(name) })),
            Token::Comment { range } => Ok(Some(Node::Comment { content: self.text(range) })),
            Token::PiTarget { target } => {
                self.pi_target.clear();
                self.pi_target.push_str(self.text(target));
                Ok(None)
            }
            Token::PiData { range } => {
                self.pi_data.clear();
                self.pi_data.push_str(self.text(range));
                Ok(Some(Node::Pi { target: &self.pi_target, data: &self.pi_data }))
            }
        }
    }

    fn illformed(&self, e: IllFormedError) -> Error {
        Error::IllFormed(e, self.position())
    }

    fn namespace_error(&self, e: NamespaceError) -> Error {
        Error::Namespace(e, self.position())
    }

    fn finish_xml_declaration(&mut self) -> Result<Option<Node<'_>>> {
        self.decl_version.clear();
        self.decl_version.push_str("1.0");
        self.decl_encoding = None;
        let mut standalone = None;

        for (name_range, value) in self.raw_attrs.drain(..) {
            let name = std::str::from_utf8(&self.buf[name_range.start..name_range.end])
                .expect("reader buffer is always valid utf-8");
            match name {
                "version" => {
                    self.decl_version.clear();
                    self.decl_version.push_str(&value);
                }
                "encoding" => self.decl_encoding = Some(value),
                "standalone" => {
                    standalone = match value.as_str() {
                        "yes" => Some(true),
                        "no" => Some(false),
                        _ => None,
                    }
                }
                _ => {}
            }
        }

        if let Some(enc) = &self.decl_encoding {
            self.decoder.adapt_to(enc).map_err(|e| self.wrap_encoding_error(e))?;
        }

        Ok(Some(Node::XmlDeclaration {
            version: &self.decl_version,
            encoding: self.decl_encoding.as_deref(),
            standalone,
        }))
    }

    fn finish_element_start(&mut self, empty: bool) -> Result<Option<Node<'_>>> {
        let name_range = self.pending_element_name.take().expect("element_start precedes its end");
        let name_text = self.text(name_range).to_string();

        if self.config.namespace_aware && self.ns.is_none() {
            self.ns = Some(NamespaceResolver::new());
        }
        if let Some(ns) = self.ns.as_mut() {
            ns.begin_element();
        }

        let attrs = std::mem::take(&mut self.raw_attrs);

        if self.config.namespace_aware {
            for (name_range, value) in &attrs {
                let raw = self.text(*name_range);
                if let Ok(qname) = QName::parse(raw) {
                    let is_default_decl = qname.prefix.is_none() && qname.local == "xmlns";
                    let is_prefixed_decl = qname.prefix == Some("xmlns");
                    if is_default_decl || is_prefixed_decl {
                        let prefix = if is_default_decl { "" } else { qname.local };
                        self.bind_namespace(prefix, value)?;
                    }
                }
            }
        }

        let mut element_attrs = Vec::with_capacity(attrs.len());
        for (name_range, value) in attrs {
            let raw = self.text(name_range).to_string();
            let resolved = self.resolve_name(&raw, false)?;
            element_attrs.push(ResolvedAttribute { raw_name: raw, resolved, value });
        }

        if self.config.namespace_aware {
            let mut seen: Vec<(Option<String>, String)> = Vec::new();
            for a in &element_attrs {
                let key = (a.resolved.namespace_uri.clone(), a.resolved.local.clone());
                if seen.contains(&key) {
                    return Err(self.illformed(IllFormedError::DuplicateAttribute { name: a.raw_name.clone() }));
                }
                seen.push(key);
            }
        } else {
            let mut seen: Vec<&str> = Vec::new();
            for a in &element_attrs {
                if seen.contains(&a.raw_name.as_str()) {
                    return Err(self.illformed(IllFormedError::DuplicateAttribute { name: a.raw_name.clone() }));
                }
                seen.push(&a.raw_name);
            }
        }

        let resolved_element = self.resolve_name(&name_text, true)?;

        self.open_elements.push(name_text.clone());
        self.current_element_name.clear();
        self.current_element_name.push_str(&name_text);
        self.current_element_resolved = Some(resolved_element);
        self.current_attrs = element_attrs;

        if empty {
            self.pending_synthetic_end = Some(name_text);
        }

        Ok(Some(Node::ElementStart { name: &self.current_element_name }))
    }

    fn bind_namespace(&mut self, prefix: &str, uri: &str) -> Result<()> {
        if prefix == "xml" {
            if uri != crate::name::XML_NAMESPACE {
                return Err(self.namespace_error(NamespaceError::InvalidBinding { prefix: "xml".to_string() }));
            }
        } else if prefix == "xmlns" {
            return Err(self.namespace_error(NamespaceError::InvalidBinding { prefix: "xmlns".to_string() }));
        } else if !prefix.is_empty() && uri.is_empty() {
            return Err(self.namespace_error(NamespaceError::CannotUndeclarePrefix(prefix.to_string())));
        }
        if let Some(ns) = self.ns.as_mut() {
            ns.bind(prefix, uri);
        }
        Ok(())
    }

    fn resolve_name(&self, raw: &str, is_element: bool) -> Result<ResolvedName> {
        let qname = QName::parse(raw).map_err(|e| self.namespace_error(e))?;
        let namespace_uri = match &self.ns {
            Some(ns) => {
                let result = if is_element { ns.resolve_element(qname) } else { ns.resolve_attribute(qname) };
                result.map_err(|e| self.namespace_error(e))?.map(str::to_string)
            }
            None => None,
        };
        Ok(ResolvedName {
            prefix: qname.prefix.map(str::to_string),
            namespace_uri,
            local: qname.local.to_string(),
        })
    }

    fn finish_element_end(&mut self, found: String, name_pos: Position) -> Result<Node<'_>> {
        match self.open_elements.pop() {
            None => Err(Error::IllFormed(IllFormedError::UnmatchedEndTag(found), name_pos)),
            Some(expected) if expected != found => {
                self.open_elements.push(expected.clone());
                Err(Error::IllFormed(IllFormedError::MismatchedEndTag { expected, found }, name_pos))
            }
            Some(expected) => {
                let resolved = self.resolve_name(&expected, true)?;
                self.current_element_name.clear();
                self.current_element_name.push_str(&expected);
                self.current_element_resolved = Some(resolved);
                self.current_attrs.clear();
                self.pending_pop = true;
                Ok(Node::ElementEnd { name: &self.current_element_name })
            }
        }
    }
}
