//! Error types returned by this crate.

use std::fmt;
use std::io;
use std::str::Utf8Error;

use crate::scanner::Position;

/// A specialized [`Result`](std::result::Result) type where the error is hard-wired to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The error type used by this crate.
///
/// Every variant other than [`Error::Io`] carries a [`Position`] at which the
/// error was detected, retrievable through [`Error::position`].
#[derive(Debug)]
pub enum Error {
    /// Failure to read from the underlying byte source.
    Io(io::Error),
    /// A lexical (Scanner-level) well-formedness violation.
    Syntax(SyntaxError, Position),
    /// A structural (Reader-level) well-formedness violation.
    IllFormed(IllFormedError, Position),
    /// A namespace well-formedness violation.
    Namespace(NamespaceError, Position),
    /// An encoding-related failure.
    Encoding(EncodingError, Position),
    /// The input ended in the middle of a construct.
    UnexpectedEndOfInput(Position),
    /// A name, or an unfinished token, did not fit in the configured buffer.
    Overflow(Position),
}

impl Error {
    /// The position at which this error was detected, if known.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Io(_) => None,
            Error::Syntax(_, p)
            | Error::IllFormed(_, p)
            | Error::Namespace(_, p)
            | Error::Encoding(_, p)
            | Error::UnexpectedEndOfInput(p)
            | Error::Overflow(p) => Some(*p),
        }
    }

    /// A coarse, fieldless classification of this error, matching the taxonomy
    /// callers that only care about the error category would want to match on.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Io(_) => ErrorCode::ReadFailed,
            Error::Syntax(..) => ErrorCode::SyntaxError,
            Error::UnexpectedEndOfInput(_) => ErrorCode::UnexpectedEndOfInput,
            Error::Overflow(_) => ErrorCode::Overflow,
            Error::IllFormed(IllFormedError::MismatchedEndTag { .. }, _) => {
                ErrorCode::MismatchedEndTag
            }
            Error::IllFormed(IllFormedError::UnmatchedEndTag(_), _) => {
                ErrorCode::MismatchedEndTag
            }
            Error::IllFormed(IllFormedError::DuplicateAttribute { .. }, _) => {
                ErrorCode::DuplicateAttribute
            }
            Error::IllFormed(IllFormedError::DoctypeUnsupported, _) => {
                ErrorCode::DoctypeUnsupported
            }
            Error::IllFormed(IllFormedError::InvalidCharacterReference(_), _) => {
                ErrorCode::InvalidCharacterReference
            }
            Error::IllFormed(IllFormedError::UndeclaredEntityReference(_), _) => {
                ErrorCode::UndeclaredEntityReference
            }
            Error::IllFormed(IllFormedError::InvalidPiTarget(_), _) => {
                ErrorCode::InvalidPiTarget
            }
            Error::Namespace(NamespaceError::UndeclaredPrefix(_), _) => {
                ErrorCode::UndeclaredNsPrefix
            }
            Error::Namespace(NamespaceError::CannotUndeclarePrefix(_), _) => {
                ErrorCode::CannotUndeclareNsPrefix
            }
            Error::Namespace(NamespaceError::InvalidBinding { .. }, _) => {
                ErrorCode::InvalidNsBinding
            }
            Error::Namespace(NamespaceError::InvalidQName(_), _) => ErrorCode::InvalidQName,
            Error::Namespace(NamespaceError::QNameNotAllowed(_), _) => {
                ErrorCode::QNameNotAllowed
            }
            Error::Encoding(EncodingError::InvalidUtf8, _) => ErrorCode::InvalidUtf8,
            Error::Encoding(EncodingError::InvalidUtf16, _) => ErrorCode::InvalidUtf16,
            Error::Encoding(EncodingError::InvalidEncoding(_), _) => ErrorCode::InvalidEncoding,
            Error::Encoding(EncodingError::XmlDeclarationEncodingUnsupported(_), _) => {
                ErrorCode::XmlDeclarationEncodingUnsupported
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Syntax(e, pos) => write!(f, "{} at {}", e, pos),
            Error::IllFormed(e, pos) => write!(f, "{} at {}", e, pos),
            Error::Namespace(e, pos) => write!(f, "{} at {}", e, pos),
            Error::Encoding(e, pos) => write!(f, "{} at {}", e, pos),
            Error::UnexpectedEndOfInput(pos) => {
                write!(f, "unexpected end of input at {}", pos)
            }
            Error::Overflow(pos) => write!(f, "token exceeds the configured buffer at {}", pos),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

/// A fieldless classification of an [`Error`], mirroring the external error
/// taxonomy without requiring callers to destructure the richer nested variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    SyntaxError,
    UnexpectedEndOfInput,
    Overflow,
    MismatchedEndTag,
    DuplicateAttribute,
    UndeclaredNsPrefix,
    CannotUndeclareNsPrefix,
    InvalidNsBinding,
    InvalidQName,
    QNameNotAllowed,
    InvalidCharacterReference,
    UndeclaredEntityReference,
    InvalidPiTarget,
    InvalidUtf8,
    InvalidUtf16,
    InvalidEncoding,
    DoctypeUnsupported,
    XmlDeclarationEncodingUnsupported,
    ReadFailed,
}

/// Lexical well-formedness violations, detected by the [`Scanner`](crate::scanner::Scanner)
/// as it walks the codepoint stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    /// A `<` appeared where only content or a new tag may start.
    UnexpectedLessThan,
    /// `]]>` appeared in text outside of a CDATA section.
    UnexpectedCDataEnd,
    /// `--` appeared inside a comment body, or a comment ended with `--->`.
    DoubleHyphenInComment,
    /// An attribute value's closing quote did not match its opener.
    MismatchedAttributeQuote,
    /// Whitespace was required between two tokens (e.g. between attributes) but missing.
    ExpectedWhitespace,
    /// `=` was expected after an attribute name.
    ExpectedEquals,
    /// A name was expected but the codepoint seen cannot start one.
    ExpectedName,
    /// A comment was opened but never closed.
    UnclosedComment,
    /// A CDATA section was opened but never closed.
    UnclosedCData,
    /// A processing instruction was opened but never closed.
    UnclosedPI,
    /// A tag was opened but never closed.
    UnclosedTag,
    /// The XML declaration is malformed.
    MalformedXmlDeclaration,
    /// A character reference contained a non-hex/non-digit codepoint.
    InvalidCharacterReferenceDigit,
    /// A bare `&` was not followed by a valid name and `;` nor `#`.
    MalformedReference,
    /// A codepoint outside the XML `Char` production appeared in the document.
    InvalidChar,
    /// The input ended in the middle of an open construct.
    UnexpectedEndOfInput,
    /// A numeric character reference's value exceeded `u32` range.
    Overflow,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SyntaxError::UnexpectedLessThan => "'<' is not allowed inside an attribute value",
            SyntaxError::UnexpectedCDataEnd => "']]>' is not allowed in text outside CDATA",
            SyntaxError::DoubleHyphenInComment => "'--' is not allowed inside a comment",
            SyntaxError::MismatchedAttributeQuote => "closing quote does not match opening quote",
            SyntaxError::ExpectedWhitespace => "expected whitespace",
            SyntaxError::ExpectedEquals => "expected '=' after attribute name",
            SyntaxError::ExpectedName => "expected a name",
            SyntaxError::UnclosedComment => "comment was not closed with '-->'",
            SyntaxError::UnclosedCData => "CDATA section was not closed with ']]>'",
            SyntaxError::UnclosedPI => "processing instruction was not closed with '?>'",
            SyntaxError::UnclosedTag => "tag was not closed with '>'",
            SyntaxError::MalformedXmlDeclaration => "malformed XML declaration",
            SyntaxError::InvalidCharacterReferenceDigit => {
                "invalid digit in numeric character reference"
            }
            SyntaxError::MalformedReference => "'&' not followed by a valid reference",
            SyntaxError::InvalidChar => "character is not allowed in an XML document",
            SyntaxError::UnexpectedEndOfInput => "unexpected end of input",
            SyntaxError::Overflow => "numeric character reference value overflowed",
        };
        f.write_str(msg)
    }
}

/// Structural (cross-token) well-formedness violations, detected by the Reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IllFormedError {
    /// An end tag's name did not match the currently open element.
    MismatchedEndTag { expected: String, found: String },
    /// An end tag appeared with no corresponding open element.
    UnmatchedEndTag(String),
    /// The same attribute name (or, namespace-aware, the same resolved `(uri, local)`
    /// pair) appeared twice on one element.
    DuplicateAttribute { name: String },
    /// `<!DOCTYPE` was seen; DOCTYPE/DTD is not supported by this reader.
    DoctypeUnsupported,
    /// A numeric character reference did not denote a valid XML `Char`.
    InvalidCharacterReference(u32),
    /// A named entity reference other than the five predefined ones was used
    /// where no DTD can declare it (i.e. always, since DTDs are unsupported).
    UndeclaredEntityReference(String),
    /// A processing instruction target was literally `xml` (case-insensitively)
    /// but the PI was not the leading XML declaration.
    InvalidPiTarget(String),
}

impl fmt::Display for IllFormedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllFormedError::MismatchedEndTag { expected, found } => {
                write!(f, "expected </{}>, found </{}>", expected, found)
            }
            IllFormedError::UnmatchedEndTag(name) => {
                write!(f, "found </{}> without a matching open element", name)
            }
            IllFormedError::DuplicateAttribute { name } => {
                write!(f, "duplicate attribute '{}'", name)
            }
            IllFormedError::DoctypeUnsupported => {
                write!(f, "DOCTYPE declarations are not supported")
            }
            IllFormedError::InvalidCharacterReference(cp) => {
                write!(f, "character reference to invalid codepoint U+{:X}", cp)
            }
            IllFormedError::UndeclaredEntityReference(name) => {
                write!(f, "reference to undeclared entity '{}'", name)
            }
            IllFormedError::InvalidPiTarget(name) => {
                write!(f, "'{}' is a reserved processing instruction target", name)
            }
        }
    }
}

/// Namespace well-formedness violations (XML Namespaces 1.0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    /// A QName used a prefix with no matching `xmlns:prefix` binding in scope.
    UndeclaredPrefix(String),
    /// `xmlns:prefix=""` was used to undeclare a prefix, which this implementation disallows.
    CannotUndeclarePrefix(String),
    /// `xml` or `xmlns` was bound, or misused, contrary to XML Namespaces §4.
    InvalidBinding { prefix: String },
    /// A QName had more than one colon, or an empty prefix/local part.
    InvalidQName(String),
    /// A QName was not allowed in this position (reserved for future extension points).
    QNameNotAllowed(String),
}

impl fmt::Display for NamespaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceError::UndeclaredPrefix(p) => {
                write!(f, "undeclared namespace prefix '{}'", p)
            }
            NamespaceError::CannotUndeclarePrefix(p) => {
                write!(f, "cannot undeclare namespace prefix '{}'", p)
            }
            NamespaceError::InvalidBinding { prefix } => {
                write!(f, "invalid binding for reserved prefix '{}'", prefix)
            }
            NamespaceError::InvalidQName(n) => write!(f, "'{}' is not a valid QName", n),
            NamespaceError::QNameNotAllowed(n) => {
                write!(f, "qualified name '{}' is not allowed here", n)
            }
        }
    }
}

/// Encoding-related failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The byte stream is not valid UTF-8.
    InvalidUtf8,
    /// The byte stream is not valid UTF-16 (unpaired surrogate, or odd trailing byte).
    InvalidUtf16,
    /// `adapt_to` was called with, or the XML declaration named, an unrecognized encoding.
    InvalidEncoding(String),
    /// The XML declaration named an encoding incompatible with the byte-order mark
    /// or auto-detected encoding already in effect.
    XmlDeclarationEncodingUnsupported(String),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::InvalidUtf8 => write!(f, "invalid UTF-8 byte sequence"),
            EncodingError::InvalidUtf16 => write!(f, "invalid UTF-16 code unit sequence"),
            EncodingError::InvalidEncoding(name) => {
                write!(f, "unrecognized encoding name '{}'", name)
            }
            EncodingError::XmlDeclarationEncodingUnsupported(name) => {
                write!(
                    f,
                    "declared encoding '{}' is incompatible with the detected encoding",
                    name
                )
            }
        }
    }
}

impl From<Utf8Error> for EncodingError {
    #[inline]
    fn from(_: Utf8Error) -> EncodingError {
        EncodingError::InvalidUtf8
    }
}
