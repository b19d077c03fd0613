//! The codepoint-level state machine that recognizes XML syntax.
//!
//! A [`Scanner`] is fed one Unicode scalar value at a time via [`Scanner::feed`]
//! along with the byte range that codepoint occupies in the caller's buffer. It
//! never copies or owns text itself — every [`Token`] it emits carries
//! [`Range`]s back into that buffer, or bare scalar values for character
//! references. This mirrors the shape of the reference crate's `Parser::feed`
//! state machine (`src/parser/mod.rs`): one big `match` over a `State` enum,
//! with closely related sub-states folded into a single variant holding a
//! small nested scan value (as the reference crate does with
//! `State::Comment(CommentParser)` and `State::CData(CDataParser)`). The
//! difference is granularity: the reference crate searches for byte
//! delimiters and defers name/attribute grammar to a later pass, while this
//! Scanner validates name and attribute grammar as it goes, one codepoint at
//! a time, since that's what well-formedness checking needs.
//!
//! Line/column tracking and checks that need memory across tokens (matching
//! end tag names, duplicate attributes, predefined-entity resolution) are
//! *not* done here — they're the [`crate::reader::Reader`]'s job, which owns
//! the buffer this Scanner's ranges point into.
//!
//! A handful of XML productions are scoped down from the full grammar for
//! this implementation; see the module-level comment sections marked
//! "simplification" below and the corresponding notes in `DESIGN.md`.

use crate::chars::{is_char, is_name_char, is_name_start_char, is_whitespace};
use crate::errors::{IllFormedError, SyntaxError};

/// A 1-indexed line/column position, paired with the byte offset it refers to.
///
/// The Scanner itself never constructs one of these — it has no memory of
/// line breaks. The [`crate::reader::Reader`] tracks line/column as it reads
/// (after CRLF/CR normalization) and attaches a `Position` when it turns a
/// [`ScanError`] into a crate-level [`crate::errors::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub byte_offset: usize,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A half-open byte interval `[start, end)` into the caller's buffer.
///
/// Valid only until the next call that advances the owning Reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// A unit of XML syntax recognized by the [`Scanner`].
///
/// Content-level character and entity references are emitted as their own
/// tokens rather than merged into surrounding text, so a Reader replaying
/// tokens in order reproduces the exact interleaving of literal text and
/// references that appeared in the source.
///
/// The XML declaration is scanned with the same attribute-list sub-grammar as
/// a start tag's attributes — `XmlDeclStart`/`XmlDeclEnd` bracket a run of
/// `AttributeName`/`AttributeValueText`/`AttributeValueEnd` tokens exactly
/// like `ElementStart`/`ElementStartEnd` do, rather than the Scanner itself
/// knowing the field names `version`/`encoding`/`standalone`. The Reader,
/// which already has to assemble attribute fragments into owned values,
/// recognizes those three names and builds the `xml_declaration` node from
/// them. This is the same owning-vs-allocation-free split already used for
/// attribute value pieces; see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    XmlDeclStart,
    XmlDeclEnd,
    ElementStart { name: Range },
    AttributeName { name: Range },
    AttributeValueText { range: Range },
    AttributeValueCharRef { codepoint: u32 },
    AttributeValueEntityRef { name: Range },
    AttributeValueEnd,
    ElementStartEnd { empty: bool },
    ElementEnd { name: Range },
    Text { range: Range },
    CData { range: Range },
    CharacterReference { codepoint: u32 },
    EntityReference { name: Range },
    Comment { range: Range },
    PiTarget { target: Range },
    PiData { range: Range },
}

/// What [`Scanner::feed`] produced for this codepoint: nothing yet, exactly
/// one token, or — when a character both closes a pending text/value span and
/// completes another construct in the same codepoint — two, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    None,
    One(Token),
    Two(Token, Token),
}

/// A lexical or content-level failure raised by the Scanner itself.
///
/// The Scanner has no notion of source position; the Reader attaches one
/// before surfacing this as a [`crate::errors::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    Syntax(SyntaxError),
    IllFormed(IllFormedError),
}

impl From<SyntaxError> for ScanError {
    fn from(e: SyntaxError) -> Self {
        ScanError::Syntax(e)
    }
}

impl From<IllFormedError> for ScanError {
    fn from(e: IllFormedError) -> Self {
        ScanError::IllFormed(e)
    }
}

/// Sub-state for scanning a comment body, tracking only how many trailing
/// hyphens have just been seen — grounded on the reference crate's
/// `CommentParser`, which plays the same role over raw bytes via `memchr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommentScan {
    start: usize,
    hyphens: u8,
}

/// Sub-state for scanning a CDATA section body, tracking progress toward `]]>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CDataScan {
    start: usize,
    brackets: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PiScan {
    Target { start: usize },
    AfterTarget,
    Data { start: usize },
    MaybeEnd { start: usize },
}

/// Which attribute-like list is currently being scanned: a start tag's real
/// attributes, or the XML declaration's `version`/`encoding`/`standalone`
/// pseudo-attributes. Both share the same Name/`=`/quoted-value states; only
/// the list terminator (`>` or `/>` vs `?>`) and the bracketing tokens differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Tag,
    XmlDecl,
}

/// Which reference kind is being scanned, so the completed token is routed to
/// the right `Token` variant once its terminating `;` arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefContext {
    Content,
    AttributeValue { kind: ListKind, quote: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Very start of the document, before any markup has been seen.
    Prolog,
    /// Just saw `<`. `at_start` is true only for the very first `<` in the
    /// document, which is the only position an XML declaration may open.
    TagOpen { at_start: bool },
    /// Just saw `<?`; expecting a PI target name (or the literal `xml`).
    PiAfterQuestionMark { at_start: bool },
    /// Matching the reserved word `xml` case-insensitively, one char at a
    /// time, after `<?`. `matched` counts how many of `x`,`m`,`l` matched so
    /// far; `exact` tracks whether every matched char was exactly lowercase.
    MaybeXmlOrPi { matched: u8, exact: bool, at_start: bool, start: usize },
    /// All three of `x`,`m`,`l` matched; the next character decides whether
    /// this is the literal declaration opener or a longer PI target name.
    MaybeXmlComplete { exact: bool, at_start: bool, start: usize },
    Pi(PiScan),
    /// Inside the root content region (also used, as a simplification, for
    /// text before/after the root — see DESIGN.md).
    Content,
    /// `brackets` counts trailing, not-yet-disproved `]` characters seen so
    /// far, capped at 2, the same way `CDataScan` tracks progress toward
    /// `]]>` — here so a `]]>` appearing in text outside CDATA can be
    /// rejected instead of silently folded into the text span.
    ContentText { start: usize, brackets: u8 },
    ElementName { start: usize },
    /// Between attributes in a start tag or the XML declaration: expects
    /// whitespace, the next attribute/pseudo-attribute name, or the list's
    /// terminator (`>`/`/>` for a tag, `?>` for a declaration). `needs_whitespace`
    /// is true right after an attribute value's closing quote, when no
    /// whitespace has yet separated it from a following attribute name.
    AttributeList { kind: ListKind, needs_whitespace: bool },
    AttributeName { kind: ListKind, start: usize },
    /// Attribute name finished via whitespace; awaiting `=`.
    AfterAttributeName { kind: ListKind },
    /// `=` consumed; awaiting the opening quote (optional whitespace before).
    AfterAttributeEq { kind: ListKind },
    AttributeValue { kind: ListKind, quote: char, start: usize },
    Reference { context: RefContext },
    CharRefKind { context: RefContext },
    CharRefDecimal { context: RefContext, value: u32 },
    CharRefHex { context: RefContext, value: u32 },
    EntityRefName { context: RefContext, start: usize },
    /// `/` consumed in a start tag's attribute list; only `>` may follow.
    ExpectGtAfterSlash,
    XmlDeclMaybeEnd,
    EndTagOpen,
    EndTagName { start: usize },
    AfterEndTagName { name: Range },
    /// Just saw `<!`; deciding between comment, CDATA, and DOCTYPE.
    BangOpen,
    /// Just saw `<!-`; the next `-` begins a comment.
    MaybeComment,
    Comment(CommentScan),
    /// Matching the literal `[CDATA[` after `<!`, by how many bytes matched.
    MaybeCData { matched: u8 },
    CData(CDataScan),
}

/// Which kind of node a split-off chunk of a too-long content span becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    Text,
    CData,
    Comment,
    PiData,
}

/// What the Reader should do about the construct the Scanner currently has
/// pinned to a byte offset, once that construct would outgrow the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinnedSpan {
    /// Content that may be cut into multiple consecutive nodes of this kind.
    Splittable(SplitKind, usize),
    /// An attribute value: never required to fit in one buffer window, but
    /// also never split into multiple nodes — the Reader instead flushes the
    /// accumulated text into its own assembled value and keeps accumulating.
    AttributeValue(usize),
    /// A name or other token that must fit whole; outgrowing the buffer here
    /// is an [`Error::Overflow`](crate::errors::Error::Overflow).
    Fixed(usize),
}

const CDATA_LITERAL: &[u8] = b"[CDATA[";

/// Deterministic, allocation-free XML syntax recognizer.
///
/// Construct with [`Scanner::new`], feed it one codepoint at a time with
/// [`Scanner::feed`], and call [`Scanner::end_input`] once the byte source is
/// exhausted to confirm the document didn't end mid-construct.
#[derive(Debug, Clone)]
pub struct Scanner {
    state: State,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Scanner { state: State::Prolog }
    }

    /// True while positioned inside an attribute value's literal text (not
    /// inside a reference within it). The Reader uses this to decide whether
    /// to apply CDATA-style attribute-value normalization (tab/CR/LF -> space)
    /// to the next incoming character before feeding it here.
    pub fn in_attribute_value_literal(&self) -> bool {
        matches!(self.state, State::AttributeValue { .. })
    }

    /// Shifts every byte offset this Scanner remembers back by `shift`, used
    /// by the Reader after it compacts its buffer. Must only be called when
    /// the Scanner is not mid-token across the compaction point.
    pub fn reset_position(&mut self, shift: usize) {
        fn sh(r: Range, by: usize) -> Range {
            Range { start: r.start - by, end: r.end - by }
        }
        self.state = match self.state {
            State::MaybeXmlOrPi { matched, exact, at_start, start } => {
                State::MaybeXmlOrPi { matched, exact, at_start, start: start - shift }
            }
            State::MaybeXmlComplete { exact, at_start, start } => {
                State::MaybeXmlComplete { exact, at_start, start: start - shift }
            }
            State::Pi(PiScan::Target { start }) => State::Pi(PiScan::Target { start: start - shift }),
            State::Pi(PiScan::Data { start }) => State::Pi(PiScan::Data { start: start - shift }),
            State::Pi(PiScan::MaybeEnd { start }) => {
                State::Pi(PiScan::MaybeEnd { start: start - shift })
            }
            State::ContentText { start, brackets } => {
                State::ContentText { start: start - shift, brackets }
            }
            State::ElementName { start } => State::ElementName { start: start - shift },
            State::AttributeName { kind, start } => {
                State::AttributeName { kind, start: start - shift }
            }
            State::AttributeValue { kind, quote, start } => {
                State::AttributeValue { kind, quote, start: start - shift }
            }
            State::EntityRefName { context, start } => {
                State::EntityRefName { context, start: start - shift }
            }
            State::EndTagName { start } => State::EndTagName { start: start - shift },
            State::AfterEndTagName { name } => State::AfterEndTagName { name: sh(name, shift) },
            State::Comment(CommentScan { start, hyphens }) => {
                State::Comment(CommentScan { start: start - shift, hyphens })
            }
            State::CData(CDataScan { start, brackets }) => {
                State::CData(CDataScan { start: start - shift, brackets })
            }
            other => other,
        };
    }

    /// True when the Scanner is not in the middle of any construct (i.e. the
    /// Reader is free to discard and recompact its buffer). Only true in
    /// [`State::Content`], which carries no byte offsets.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Content)
    }

    /// The byte offset a currently open, buffer-bound construct began at, and
    /// what the Reader may do if that construct grows past its configured
    /// buffer window. `None` means the Scanner isn't pinned to any buffer
    /// offset right now (e.g. [`State::Content`], or a single-character
    /// lookahead state), so no overflow check applies.
    pub fn pinned_span(&self) -> Option<PinnedSpan> {
        match self.state {
            State::ContentText { start, .. } => Some(PinnedSpan::Splittable(SplitKind::Text, start)),
            State::CData(CDataScan { start, .. }) => {
                Some(PinnedSpan::Splittable(SplitKind::CData, start))
            }
            State::Comment(CommentScan { start, .. }) => {
                Some(PinnedSpan::Splittable(SplitKind::Comment, start))
            }
            State::Pi(PiScan::Data { start }) => Some(PinnedSpan::Splittable(SplitKind::PiData, start)),
            State::AttributeValue { start, .. } => Some(PinnedSpan::AttributeValue(start)),
            State::ElementName { start } => Some(PinnedSpan::Fixed(start)),
            State::AttributeName { start, .. } => Some(PinnedSpan::Fixed(start)),
            State::EndTagName { start } => Some(PinnedSpan::Fixed(start)),
            State::EntityRefName { start, .. } => Some(PinnedSpan::Fixed(start)),
            State::Pi(PiScan::Target { start }) => Some(PinnedSpan::Fixed(start)),
            State::MaybeXmlOrPi { start, .. } => Some(PinnedSpan::Fixed(start)),
            State::MaybeXmlComplete { start, .. } => Some(PinnedSpan::Fixed(start)),
            _ => None,
        }
    }

    /// Cuts a splittable or attribute-value span short at the Reader's
    /// request, resuming the same construct as though it had started fresh at
    /// `new_start`. Only valid right after the Reader has copied out
    /// everything from the old start up to its current buffer length; any
    /// in-progress bracket/hyphen lookahead (`]]`, `--`) is reset, since that
    /// lookahead no longer has the bytes behind it to compare against.
    pub fn split_span(&mut self, new_start: usize) {
        self.state = match self.state {
            State::ContentText { .. } => State::ContentText { start: new_start, brackets: 0 },
            State::CData(CDataScan { .. }) => {
                State::CData(CDataScan { start: new_start, brackets: 0 })
            }
            State::Comment(CommentScan { .. }) => {
                State::Comment(CommentScan { start: new_start, hyphens: 0 })
            }
            State::Pi(PiScan::Data { .. }) => State::Pi(PiScan::Data { start: new_start }),
            State::AttributeValue { kind, quote, .. } => {
                State::AttributeValue { kind, quote, start: new_start }
            }
            other => other,
        };
    }

    /// Confirms the document did not end in the middle of an open construct.
    pub fn end_input(&self) -> Result<(), ScanError> {
        match self.state {
            State::Content => Ok(()),
            _ => Err(SyntaxError::UnexpectedEndOfInput.into()),
        }
    }

    /// Feeds one Unicode scalar value, occupying byte range `range` in the
    /// caller's buffer, into the machine. Returns whatever complete token(s)
    /// this codepoint produced.
    pub fn feed(&mut self, c: char, range: Range) -> Result<Emit, ScanError> {
        if !is_char(c) {
            return Err(SyntaxError::InvalidChar.into());
        }

        match self.state {
            State::Prolog => {
                if c == '<' {
                    self.state = State::TagOpen { at_start: true };
                    Ok(Emit::None)
                } else if is_whitespace(c) {
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::UnexpectedLessThan.into())
                }
            }

            State::Content => {
                if c == '<' {
                    self.state = State::TagOpen { at_start: false };
                    Ok(Emit::None)
                } else if c == '&' {
                    self.state = State::Reference { context: RefContext::Content };
                    Ok(Emit::None)
                } else {
                    let brackets = if c == ']' { 1 } else { 0 };
                    self.state = State::ContentText { start: range.start, brackets };
                    Ok(Emit::None)
                }
            }

            State::ContentText { start, brackets } => {
                if c == '<' || c == '&' {
                    let text = Range { start, end: range.start };
                    self.state = if c == '<' {
                        State::TagOpen { at_start: false }
                    } else {
                        State::Reference { context: RefContext::Content }
                    };
                    Ok(Emit::One(Token::Text { range: text }))
                } else if c == ']' {
                    self.state = State::ContentText { start, brackets: (brackets + 1).min(2) };
                    Ok(Emit::None)
                } else if c == '>' && brackets >= 2 {
                    Err(SyntaxError::UnexpectedCDataEnd.into())
                } else {
                    self.state = State::ContentText { start, brackets: 0 };
                    Ok(Emit::None)
                }
            }

            State::TagOpen { at_start } => match c {
                '?' => {
                    self.state = State::PiAfterQuestionMark { at_start };
                    Ok(Emit::None)
                }
                '!' => {
                    self.state = State::BangOpen;
                    Ok(Emit::None)
                }
                '/' => {
                    self.state = State::EndTagOpen;
                    Ok(Emit::None)
                }
                c if is_name_start_char(c) => {
                    self.state = State::ElementName { start: range.start };
                    Ok(Emit::None)
                }
                _ => Err(SyntaxError::ExpectedName.into()),
            },

            State::PiAfterQuestionMark { at_start } => {
                if c == 'x' {
                    self.state =
                        State::MaybeXmlOrPi { matched: 1, exact: true, at_start, start: range.start };
                    Ok(Emit::None)
                } else if c == 'X' {
                    self.state = State::MaybeXmlOrPi {
                        matched: 1,
                        exact: false,
                        at_start,
                        start: range.start,
                    };
                    Ok(Emit::None)
                } else if is_name_start_char(c) {
                    self.state = State::Pi(PiScan::Target { start: range.start });
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::ExpectedName.into())
                }
            }

            State::MaybeXmlOrPi { matched, exact, at_start, start } => {
                let (expect, is_last) = if matched == 1 { ('m', false) } else { ('l', true) };
                if c.to_ascii_lowercase() == expect {
                    let exact = exact && c == expect;
                    self.state = if is_last {
                        State::MaybeXmlComplete { exact, at_start, start }
                    } else {
                        State::MaybeXmlOrPi { matched: matched + 1, exact, at_start, start }
                    };
                    Ok(Emit::None)
                } else if is_name_char(c) {
                    self.state = State::Pi(PiScan::Target { start });
                    Ok(Emit::None)
                } else {
                    self.finish_pi_target(Range { start, end: range.start }, c, range)
                }
            }

            State::MaybeXmlComplete { exact, at_start, start } => {
                if is_name_char(c) {
                    self.state = State::Pi(PiScan::Target { start });
                    Ok(Emit::None)
                } else if exact && at_start {
                    self.feed_attribute_list(ListKind::XmlDecl, false, c, range)
                        .map(|emit| match emit {
                            Emit::None => Emit::One(Token::XmlDeclStart),
                            Emit::One(t) => Emit::Two(Token::XmlDeclStart, t),
                            Emit::Two(_, _) => unreachable!("xml decl open cannot close immediately"),
                        })
                } else {
                    Err(IllFormedError::InvalidPiTarget("xml".to_string()).into())
                }
            }

            State::Pi(PiScan::Target { start }) => {
                if is_name_char(c) {
                    Ok(Emit::None)
                } else {
                    self.finish_pi_target(Range { start, end: range.start }, c, range)
                }
            }

            State::Pi(PiScan::AfterTarget) => {
                if is_whitespace(c) {
                    Ok(Emit::None)
                } else if c == '?' {
                    self.state = State::Pi(PiScan::MaybeEnd { start: range.end });
                    Ok(Emit::None)
                } else {
                    self.state = State::Pi(PiScan::Data { start: range.start });
                    Ok(Emit::None)
                }
            }

            State::Pi(PiScan::Data { start }) => {
                if c == '?' {
                    self.state = State::Pi(PiScan::MaybeEnd { start });
                    Ok(Emit::None)
                } else {
                    Ok(Emit::None)
                }
            }

            State::Pi(PiScan::MaybeEnd { start }) => {
                if c == '>' {
                    let data = Range { start, end: range.start - 1 };
                    self.state = State::Content;
                    Ok(Emit::One(Token::PiData { range: data }))
                } else {
                    self.state = State::Pi(PiScan::Data { start });
                    Ok(Emit::None)
                }
            }

            State::XmlDeclMaybeEnd => {
                if c == '>' {
                    self.state = State::Content;
                    Ok(Emit::One(Token::XmlDeclEnd))
                } else {
                    Err(SyntaxError::MalformedXmlDeclaration.into())
                }
            }

            State::BangOpen => {
                if c == '-' {
                    self.state = State::MaybeComment;
                    Ok(Emit::None)
                } else if c == '[' {
                    self.state = State::MaybeCData { matched: 1 };
                    Ok(Emit::None)
                } else if c == 'D' {
                    Err(IllFormedError::DoctypeUnsupported.into())
                } else {
                    Err(SyntaxError::ExpectedName.into())
                }
            }

            State::MaybeComment => {
                if c == '-' {
                    self.state = State::Comment(CommentScan { start: range.end, hyphens: 0 });
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::ExpectedName.into())
                }
            }

            State::Comment(CommentScan { start, hyphens }) => {
                if c == '-' {
                    self.state = State::Comment(CommentScan { start, hyphens: hyphens + 1 });
                    Ok(Emit::None)
                } else if c == '>' && hyphens >= 2 {
                    if hyphens > 2 {
                        return Err(SyntaxError::DoubleHyphenInComment.into());
                    }
                    let text = Range { start, end: range.start - 2 };
                    self.state = State::Content;
                    Ok(Emit::One(Token::Comment { range: text }))
                } else if hyphens >= 2 {
                    Err(SyntaxError::DoubleHyphenInComment.into())
                } else {
                    self.state = State::Comment(CommentScan { start, hyphens: 0 });
                    Ok(Emit::None)
                }
            }

            State::MaybeCData { matched } => {
                let expected = CDATA_LITERAL[matched as usize] as char;
                if c != expected {
                    return Err(SyntaxError::ExpectedName.into());
                }
                let next = matched + 1;
                self.state = if next as usize == CDATA_LITERAL.len() {
                    State::CData(CDataScan { start: range.end, brackets: 0 })
                } else {
                    State::MaybeCData { matched: next }
                };
                Ok(Emit::None)
            }

            State::CData(CDataScan { start, brackets }) => {
                if c == ']' {
                    self.state = State::CData(CDataScan { start, brackets: (brackets + 1).min(2) });
                    Ok(Emit::None)
                } else if c == '>' && brackets >= 2 {
                    let text = Range { start, end: range.start - 2 };
                    self.state = State::Content;
                    Ok(Emit::One(Token::CData { range: text }))
                } else {
                    self.state = State::CData(CDataScan { start, brackets: 0 });
                    Ok(Emit::None)
                }
            }

            State::ElementName { start } => {
                if is_name_char(c) {
                    Ok(Emit::None)
                } else {
                    self.finish_element_name(Range { start, end: range.start }, c, range)
                }
            }

            State::AttributeList { kind, needs_whitespace } => {
                self.feed_attribute_list(kind, needs_whitespace, c, range)
            }

            State::AttributeName { kind, start } => {
                if is_name_char(c) {
                    Ok(Emit::None)
                } else {
                    let name = Range { start, end: range.start };
                    if c == '=' {
                        self.state = State::AfterAttributeEq { kind };
                    } else if is_whitespace(c) {
                        self.state = State::AfterAttributeName { kind };
                    } else {
                        return Err(SyntaxError::ExpectedEquals.into());
                    }
                    Ok(Emit::One(Token::AttributeName { name }))
                }
            }

            State::AfterAttributeName { kind } => {
                if is_whitespace(c) {
                    Ok(Emit::None)
                } else if c == '=' {
                    self.state = State::AfterAttributeEq { kind };
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::ExpectedEquals.into())
                }
            }

            State::AfterAttributeEq { kind } => {
                if is_whitespace(c) {
                    Ok(Emit::None)
                } else if c == '"' || c == '\'' {
                    self.state = State::AttributeValue { kind, quote: c, start: range.end };
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::MismatchedAttributeQuote.into())
                }
            }

            State::AttributeValue { kind, quote, start } => {
                if c == quote {
                    let text = Range { start, end: range.start };
                    self.state = State::AttributeList { kind, needs_whitespace: true };
                    if text.is_empty() {
                        Ok(Emit::One(Token::AttributeValueEnd))
                    } else {
                        Ok(Emit::Two(
                            Token::AttributeValueText { range: text },
                            Token::AttributeValueEnd,
                        ))
                    }
                } else if c == '<' {
                    Err(SyntaxError::UnexpectedLessThan.into())
                } else if c == '&' {
                    let text = Range { start, end: range.start };
                    self.state =
                        State::Reference { context: RefContext::AttributeValue { kind, quote } };
                    if text.is_empty() {
                        Ok(Emit::None)
                    } else {
                        Ok(Emit::One(Token::AttributeValueText { range: text }))
                    }
                } else {
                    Ok(Emit::None)
                }
            }

            State::ExpectGtAfterSlash => {
                if c == '>' {
                    self.state = State::Content;
                    Ok(Emit::One(Token::ElementStartEnd { empty: true }))
                } else {
                    Err(SyntaxError::UnclosedTag.into())
                }
            }

            State::Reference { context } => {
                if c == '#' {
                    self.state = State::CharRefKind { context };
                    Ok(Emit::None)
                } else if is_name_start_char(c) {
                    self.state = State::EntityRefName { context, start: range.start };
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::MalformedReference.into())
                }
            }

            State::CharRefKind { context } => {
                if c == 'x' {
                    self.state = State::CharRefHex { context, value: 0 };
                    Ok(Emit::None)
                } else if let Some(d) = c.to_digit(10) {
                    self.state = State::CharRefDecimal { context, value: d };
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::InvalidCharacterReferenceDigit.into())
                }
            }

            State::CharRefDecimal { context, value } => {
                if let Some(d) = c.to_digit(10) {
                    let value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(d))
                        .ok_or(SyntaxError::Overflow)?;
                    self.state = State::CharRefDecimal { context, value };
                    Ok(Emit::None)
                } else if c == ';' {
                    self.finish_char_ref(value, context, range)
                } else {
                    Err(SyntaxError::InvalidCharacterReferenceDigit.into())
                }
            }

            State::CharRefHex { context, value } => {
                if let Some(d) = c.to_digit(16) {
                    let value = value
                        .checked_mul(16)
                        .and_then(|v| v.checked_add(d))
                        .ok_or(SyntaxError::Overflow)?;
                    self.state = State::CharRefHex { context, value };
                    Ok(Emit::None)
                } else if c == ';' {
                    self.finish_char_ref(value, context, range)
                } else {
                    Err(SyntaxError::InvalidCharacterReferenceDigit.into())
                }
            }

            State::EntityRefName { context, start } => {
                if is_name_char(c) {
                    Ok(Emit::None)
                } else if c == ';' {
                    let name = Range { start, end: range.start };
                    self.state = self.state_after_reference(context, range);
                    match context {
                        RefContext::Content => Ok(Emit::One(Token::EntityReference { name })),
                        RefContext::AttributeValue { .. } => {
                            Ok(Emit::One(Token::AttributeValueEntityRef { name }))
                        }
                    }
                } else {
                    Err(SyntaxError::MalformedReference.into())
                }
            }

            State::EndTagOpen => {
                if is_name_start_char(c) {
                    self.state = State::EndTagName { start: range.start };
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::ExpectedName.into())
                }
            }

            State::EndTagName { start } => {
                if is_name_char(c) {
                    Ok(Emit::None)
                } else if c == '>' {
                    let name = Range { start, end: range.start };
                    self.state = State::Content;
                    Ok(Emit::One(Token::ElementEnd { name }))
                } else if is_whitespace(c) {
                    let name = Range { start, end: range.start };
                    self.state = State::AfterEndTagName { name };
                    Ok(Emit::None)
                } else {
                    Err(SyntaxError::UnclosedTag.into())
                }
            }

            State::AfterEndTagName { name } => {
                if is_whitespace(c) {
                    Ok(Emit::None)
                } else if c == '>' {
                    self.state = State::Content;
                    Ok(Emit::One(Token::ElementEnd { name }))
                } else {
                    Err(SyntaxError::UnclosedTag.into())
                }
            }
        }
    }

    fn finish_pi_target(&mut self, target: Range, c: char, range: Range) -> Result<Emit, ScanError> {
        if is_whitespace(c) {
            self.state = State::Pi(PiScan::AfterTarget);
            Ok(Emit::One(Token::PiTarget { target }))
        } else if c == '?' {
            self.state = State::Pi(PiScan::MaybeEnd { start: range.end });
            Ok(Emit::One(Token::PiTarget { target }))
        } else {
            Err(SyntaxError::ExpectedWhitespace.into())
        }
    }

    fn finish_element_name(&mut self, name: Range, c: char, range: Range) -> Result<Emit, ScanError> {
        let start_token = Token::ElementStart { name };
        if c == '>' {
            self.state = State::Content;
            Ok(Emit::Two(start_token, Token::ElementStartEnd { empty: false }))
        } else if c == '/' {
            self.state = State::ExpectGtAfterSlash;
            Ok(Emit::One(start_token))
        } else if is_whitespace(c) {
            self.state = State::AttributeList { kind: ListKind::Tag, needs_whitespace: false };
            Ok(Emit::One(start_token))
        } else if is_name_start_char(c) {
            self.state = State::AttributeName { kind: ListKind::Tag, start: range.start };
            Ok(Emit::One(start_token))
        } else {
            Err(SyntaxError::ExpectedWhitespace.into())
        }
    }

    fn feed_attribute_list(
        &mut self,
        kind: ListKind,
        needs_whitespace: bool,
        c: char,
        range: Range,
    ) -> Result<Emit, ScanError> {
        if is_whitespace(c) {
            self.state = State::AttributeList { kind, needs_whitespace: false };
            Ok(Emit::None)
        } else if is_name_start_char(c) {
            if needs_whitespace {
                return Err(SyntaxError::ExpectedWhitespace.into());
            }
            self.state = State::AttributeName { kind, start: range.start };
            Ok(Emit::None)
        } else {
            match (kind, c) {
                (ListKind::Tag, '/') => {
                    self.state = State::ExpectGtAfterSlash;
                    Ok(Emit::None)
                }
                (ListKind::Tag, '>') => {
                    self.state = State::Content;
                    Ok(Emit::One(Token::ElementStartEnd { empty: false }))
                }
                (ListKind::XmlDecl, '?') => {
                    self.state = State::XmlDeclMaybeEnd;
                    Ok(Emit::None)
                }
                _ => Err(SyntaxError::ExpectedName.into()),
            }
        }
    }

    fn finish_char_ref(
        &mut self,
        value: u32,
        context: RefContext,
        range: Range,
    ) -> Result<Emit, ScanError> {
        if char::from_u32(value).filter(|c| is_char(*c)).is_none() {
            return Err(IllFormedError::InvalidCharacterReference(value).into());
        }
        self.state = self.state_after_reference(context, range);
        match context {
            RefContext::Content => Ok(Emit::One(Token::CharacterReference { codepoint: value })),
            RefContext::AttributeValue { .. } => {
                Ok(Emit::One(Token::AttributeValueCharRef { codepoint: value }))
            }
        }
    }

    fn state_after_reference(&self, context: RefContext, range: Range) -> State {
        match context {
            RefContext::Content => State::Content,
            RefContext::AttributeValue { kind, quote } => {
                State::AttributeValue { kind, quote, start: range.end }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(input: &str) -> Vec<Token> {
        let mut scanner = Scanner::new();
        let mut tokens = Vec::new();
        let mut offset = 0usize;
        for c in input.chars() {
            let len = c.len_utf8();
            let range = Range { start: offset, end: offset + len };
            offset += len;
            match scanner.feed(c, range).expect("scan failed") {
                Emit::None => {}
                Emit::One(t) => tokens.push(t),
                Emit::Two(a, b) => {
                    tokens.push(a);
                    tokens.push(b);
                }
            }
        }
        scanner.end_input().expect("unexpected end of input");
        tokens
    }

    #[test]
    fn empty_element() {
        let tokens = scan("<a/>");
        assert_eq!(
            tokens,
            vec![
                Token::ElementStart { name: Range { start: 1, end: 2 } },
                Token::ElementStartEnd { empty: true },
            ]
        );
    }

    #[test]
    fn element_with_text() {
        let tokens = scan("<a>t</a>");
        assert_eq!(
            tokens,
            vec![
                Token::ElementStart { name: Range { start: 1, end: 2 } },
                Token::ElementStartEnd { empty: false },
                Token::Text { range: Range { start: 3, end: 4 } },
                Token::ElementEnd { name: Range { start: 6, end: 7 } },
            ]
        );
    }

    #[test]
    fn attribute_with_quotes() {
        let tokens = scan(r#"<a x="1"/>"#);
        assert_eq!(
            tokens,
            vec![
                Token::ElementStart { name: Range { start: 1, end: 2 } },
                Token::AttributeName { name: Range { start: 3, end: 4 } },
                Token::AttributeValueText { range: Range { start: 6, end: 7 } },
                Token::AttributeValueEnd,
                Token::ElementStartEnd { empty: true },
            ]
        );
    }

    #[test]
    fn entity_and_char_references_in_content() {
        let tokens = scan("<a>&amp;&#65;</a>");
        assert_eq!(
            tokens,
            vec![
                Token::ElementStart { name: Range { start: 1, end: 2 } },
                Token::ElementStartEnd { empty: false },
                Token::EntityReference { name: Range { start: 4, end: 7 } },
                Token::CharacterReference { codepoint: 65 },
                Token::ElementEnd { name: Range { start: 15, end: 16 } },
            ]
        );
    }

    #[test]
    fn doctype_is_rejected() {
        let mut scanner = Scanner::new();
        let mut offset = 0usize;
        let mut result = Ok(Emit::None);
        for c in "<!DOCTYPE".chars() {
            let len = c.len_utf8();
            result = scanner.feed(c, Range { start: offset, end: offset + len });
            offset += len;
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(
            result,
            Err(ScanError::IllFormed(IllFormedError::DoctypeUnsupported))
        ));
    }

    #[test]
    fn comment_rejects_double_hyphen() {
        let mut scanner = Scanner::new();
        let mut offset = 0usize;
        let mut last = Ok(Emit::None);
        for c in "<!-- a -- b -->".chars() {
            let len = c.len_utf8();
            last = scanner.feed(c, Range { start: offset, end: offset + len });
            offset += len;
            if last.is_err() {
                break;
            }
        }
        assert!(matches!(
            last,
            Err(ScanError::Syntax(SyntaxError::DoubleHyphenInComment))
        ));
    }

    #[test]
    fn xml_declaration_is_scanned_as_pseudo_attributes() {
        let tokens = scan(r#"<?xml version="1.0"?><a/>"#);
        assert_eq!(
            tokens,
            vec![
                Token::XmlDeclStart,
                Token::AttributeName { name: Range { start: 6, end: 13 } },
                Token::AttributeValueText { range: Range { start: 15, end: 18 } },
                Token::AttributeValueEnd,
                Token::XmlDeclEnd,
                Token::ElementStart { name: Range { start: 22, end: 23 } },
                Token::ElementStartEnd { empty: true },
            ]
        );
    }

    #[test]
    fn cdata_end_sequence_in_plain_text_is_rejected() {
        let mut scanner = Scanner::new();
        let mut offset = 0usize;
        let mut last = Ok(Emit::None);
        for c in "<a>]]></a>".chars() {
            let len = c.len_utf8();
            last = scanner.feed(c, Range { start: offset, end: offset + len });
            offset += len;
            if last.is_err() {
                break;
            }
        }
        assert!(matches!(
            last,
            Err(ScanError::Syntax(SyntaxError::UnexpectedCDataEnd))
        ));
    }

    #[test]
    fn lone_bracket_greater_than_in_text_is_fine() {
        let tokens = scan("<a>]></a>");
        assert_eq!(
            tokens,
            vec![
                Token::ElementStart { name: Range { start: 1, end: 2 } },
                Token::ElementStartEnd { empty: false },
                Token::Text { range: Range { start: 3, end: 5 } },
                Token::ElementEnd { name: Range { start: 7, end: 8 } },
            ]
        );
    }

    #[test]
    fn missing_whitespace_between_attributes_is_rejected() {
        let mut scanner = Scanner::new();
        let mut offset = 0usize;
        let mut last = Ok(Emit::None);
        for c in r#"<a x="1"y="2"/>"#.chars() {
            let len = c.len_utf8();
            last = scanner.feed(c, Range { start: offset, end: offset + len });
            offset += len;
            if last.is_err() {
                break;
            }
        }
        assert!(matches!(
            last,
            Err(ScanError::Syntax(SyntaxError::ExpectedWhitespace))
        ));
    }

    #[test]
    fn mismatched_end_tag_name_is_surfaced_to_caller() {
        // The Scanner itself has no notion of "mismatched" - it just reports
        // the two element names; the Reader compares them against its stack.
        let tokens = scan("<a></b>");
        assert_eq!(
            tokens,
            vec![
                Token::ElementStart { name: Range { start: 1, end: 2 } },
                Token::ElementStartEnd { empty: false },
                Token::ElementEnd { name: Range { start: 5, end: 6 } },
            ]
        );
    }
}
