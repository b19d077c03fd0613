//! Pluggable byte-to-codepoint decoders.
//!
//! A [`Decoder`] turns a byte-oriented [`Read`] source into a stream of Unicode
//! scalar values, one at a time. The trait is kept object-safe (grounded on the
//! design note that the Reader holds a boxed decoder rather than being generic
//! over it) so a [`Reader`](crate::reader::Reader) can be built with any decoder
//! chosen at construction time, including user-supplied ones.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read};

use crate::errors::EncodingError;

/// Byte-order-mark / leading-byte-pattern sniffing table, per XML 1.0 Appendix F.
///
/// [`AutoDecoder`] uses this on its first read to pick a concrete decoder.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// A decoder consumes raw bytes from a source and yields Unicode scalar values.
///
/// Implementors decode exactly one codepoint per call. `Ok(None)` means the
/// source is exhausted at a codepoint boundary (a legitimate end of input);
/// an `Err` means the bytes consumed so far do not form a valid codepoint in
/// this encoding.
pub trait Decoder: fmt::Debug {
    /// Decodes the next codepoint from `source`.
    ///
    /// Returns the decoded scalar value and the number of bytes it occupied
    /// in the source encoding, or `None` at a clean end of input.
    fn read_codepoint(&mut self, source: &mut dyn Read) -> Result<Option<(char, u8)>, EncodingError>;

    /// Directs the decoder to adopt the named encoding, as declared by an XML
    /// declaration's `encoding` pseudo-attribute.
    ///
    /// Recognized names are case-insensitive `UTF-8`, `UTF-16`, `UTF-16LE`,
    /// `UTF-16BE`. Returns an error if the name is unrecognized, or if it
    /// contradicts an encoding already determined by BOM/pattern sniffing.
    fn adapt_to(&mut self, encoding_name: &str) -> Result<(), EncodingError>;

    /// The name of the encoding currently in effect.
    fn name(&self) -> &str;
}

/// Decodes a strict UTF-8 byte stream.
///
/// Rejects overlong encodings, encoded surrogate halves, and sequences that
/// would decode to a value greater than `U+10FFFF`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Decoder;

impl Decoder for Utf8Decoder {
    fn read_codepoint(&mut self, source: &mut dyn Read) -> Result<Option<(char, u8)>, EncodingError> {
        let first = match read_byte(source)? {
            Some(b) => b,
            None => return Ok(None),
        };
        let (len, mut value, min) = match first {
            0x00..=0x7F => return Ok(Some((first as char, 1))),
            0xC2..=0xDF => (2, (first & 0x1F) as u32, 0x80),
            0xE0..=0xEF => (3, (first & 0x0F) as u32, 0x800),
            0xF0..=0xF4 => (4, (first & 0x07) as u32, 0x10000),
            _ => return Err(EncodingError::InvalidUtf8),
        };
        for _ in 1..len {
            let b = require_byte(source)?;
            if b & 0xC0 != 0x80 {
                return Err(EncodingError::InvalidUtf8);
            }
            value = (value << 6) | (b & 0x3F) as u32;
        }
        if value < min || value > 0x10FFFF || (0xD800..=0xDFFF).contains(&value) {
            return Err(EncodingError::InvalidUtf8);
        }
        let c = char::from_u32(value).ok_or(EncodingError::InvalidUtf8)?;
        Ok(Some((c, len as u8)))
    }

    fn adapt_to(&mut self, encoding_name: &str) -> Result<(), EncodingError> {
        if encoding_name.eq_ignore_ascii_case("UTF-8") {
            Ok(())
        } else {
            Err(EncodingError::XmlDeclarationEncodingUnsupported(
                encoding_name.to_string(),
            ))
        }
    }

    fn name(&self) -> &str {
        "UTF-8"
    }
}

/// Decodes a UTF-16 byte stream of a fixed endianness, joining surrogate pairs.
#[derive(Debug, Clone, Copy)]
pub struct Utf16Decoder {
    big_endian: bool,
}

impl Utf16Decoder {
    /// Creates a decoder for UTF-16 big-endian input.
    pub fn big_endian() -> Self {
        Utf16Decoder { big_endian: true }
    }

    /// Creates a decoder for UTF-16 little-endian input.
    pub fn little_endian() -> Self {
        Utf16Decoder { big_endian: false }
    }

    fn read_unit(&self, source: &mut dyn Read) -> Result<Option<u16>, EncodingError> {
        let mut buf = [0u8; 2];
        match read_exact_or_none(source, &mut buf)? {
            false => Ok(None),
            true => Ok(Some(if self.big_endian {
                u16::from_be_bytes(buf)
            } else {
                u16::from_le_bytes(buf)
            })),
        }
    }

    fn require_unit(&self, source: &mut dyn Read) -> Result<u16, EncodingError> {
        self.read_unit(source)?.ok_or(EncodingError::InvalidUtf16)
    }
}

impl Decoder for Utf16Decoder {
    fn read_codepoint(&mut self, source: &mut dyn Read) -> Result<Option<(char, u8)>, EncodingError> {
        let unit = match self.read_unit(source)? {
            Some(u) => u,
            None => return Ok(None),
        };
        match unit {
            0xD800..=0xDBFF => {
                let low = self.require_unit(source)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(EncodingError::InvalidUtf16);
                }
                let high10 = (unit - 0xD800) as u32;
                let low10 = (low - 0xDC00) as u32;
                let value = 0x10000 + (high10 << 10) + low10;
                let c = char::from_u32(value).ok_or(EncodingError::InvalidUtf16)?;
                Ok(Some((c, 4)))
            }
            0xDC00..=0xDFFF => Err(EncodingError::InvalidUtf16),
            _ => {
                let c = char::from_u32(unit as u32).ok_or(EncodingError::InvalidUtf16)?;
                Ok(Some((c, 2)))
            }
        }
    }

    fn adapt_to(&mut self, encoding_name: &str) -> Result<(), EncodingError> {
        let matches_self = if self.big_endian {
            encoding_name.eq_ignore_ascii_case("UTF-16")
                || encoding_name.eq_ignore_ascii_case("UTF-16BE")
        } else {
            encoding_name.eq_ignore_ascii_case("UTF-16")
                || encoding_name.eq_ignore_ascii_case("UTF-16LE")
        };
        if matches_self {
            Ok(())
        } else {
            Err(EncodingError::XmlDeclarationEncodingUnsupported(
                encoding_name.to_string(),
            ))
        }
    }

    fn name(&self) -> &str {
        if self.big_endian {
            "UTF-16BE"
        } else {
            "UTF-16LE"
        }
    }
}

/// Wraps an inner [`Read`] so that a handful of already-consumed "prefetch"
/// bytes are replayed before reads resume from the inner source.
///
/// Used by [`AutoDecoder`] to hand its chosen concrete decoder the leading
/// bytes it peeked at during encoding sniffing.
struct Prefixed<'a> {
    prefix: VecDeque<u8>,
    inner: &'a mut dyn Read,
}

impl Read for Prefixed<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.prefix.is_empty() {
            return self.inner.read(buf);
        }
        let mut n = 0;
        while n < buf.len() {
            match self.prefix.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

/// The auto-detecting decoder: on its first codepoint, sniffs a BOM or a
/// zero-byte pattern from the leading bytes and settles on a concrete
/// [`Utf8Decoder`] or [`Utf16Decoder`]; every subsequent call delegates to it.
#[derive(Debug)]
pub struct AutoDecoder {
    resolved: Option<Box<dyn Decoder>>,
}

impl Default for AutoDecoder {
    fn default() -> Self {
        AutoDecoder { resolved: None }
    }
}

impl AutoDecoder {
    /// Creates a new auto-detecting decoder. Detection happens lazily on the
    /// first call to [`Decoder::read_codepoint`].
    pub fn new() -> Self {
        Self::default()
    }

    fn sniff(source: &mut dyn Read) -> Result<(Box<dyn Decoder>, VecDeque<u8>), EncodingError> {
        let mut peek = [0u8; 4];
        let mut peeked = 0usize;
        for slot in peek.iter_mut() {
            match read_byte(source)? {
                Some(b) => {
                    *slot = b;
                    peeked += 1;
                }
                None => break,
            }
        }
        let peek = &peek[..peeked];

        let (decoder, consumed): (Box<dyn Decoder>, usize) = if peek.starts_with(&UTF8_BOM) {
            (Box::new(Utf8Decoder), 3)
        } else if peek.starts_with(&UTF16_BE_BOM) {
            (Box::new(Utf16Decoder::big_endian()), 2)
        } else if peek.starts_with(&UTF16_LE_BOM) {
            (Box::new(Utf16Decoder::little_endian()), 2)
        } else if peek.len() >= 2 && peek[0] == 0x00 && peek[1] != 0x00 {
            (Box::new(Utf16Decoder::big_endian()), 0)
        } else if peek.len() >= 2 && peek[1] == 0x00 && peek[0] != 0x00 {
            (Box::new(Utf16Decoder::little_endian()), 0)
        } else {
            (Box::new(Utf8Decoder), 0)
        };

        let leftover: VecDeque<u8> = peek[consumed..].iter().copied().collect();
        Ok((decoder, leftover))
    }
}

impl Decoder for AutoDecoder {
    fn read_codepoint(&mut self, source: &mut dyn Read) -> Result<Option<(char, u8)>, EncodingError> {
        if self.resolved.is_none() {
            let (decoder, leftover) = Self::sniff(source)?;
            self.resolved = Some(decoder);
            if !leftover.is_empty() {
                let decoder = self.resolved.as_mut().unwrap();
                let mut prefixed = Prefixed {
                    prefix: leftover,
                    inner: source,
                };
                return decoder.read_codepoint(&mut prefixed);
            }
        }
        self.resolved.as_mut().unwrap().read_codepoint(source)
    }

    fn adapt_to(&mut self, encoding_name: &str) -> Result<(), EncodingError> {
        match &mut self.resolved {
            Some(decoder) => decoder.adapt_to(encoding_name),
            None => {
                // No bytes have been sniffed yet (e.g. an empty document):
                // accept the declaration at face value for UTF-8/UTF-16LE/BE,
                // otherwise reject it outright.
                let decoder: Box<dyn Decoder> = if encoding_name.eq_ignore_ascii_case("UTF-8") {
                    Box::new(Utf8Decoder)
                } else if encoding_name.eq_ignore_ascii_case("UTF-16LE") {
                    Box::new(Utf16Decoder::little_endian())
                } else if encoding_name.eq_ignore_ascii_case("UTF-16BE") {
                    Box::new(Utf16Decoder::big_endian())
                } else {
                    return Err(EncodingError::InvalidEncoding(encoding_name.to_string()));
                };
                self.resolved = Some(decoder);
                Ok(())
            }
        }
    }

    fn name(&self) -> &str {
        match &self.resolved {
            Some(decoder) => decoder.name(),
            None => "UTF-8",
        }
    }
}

fn read_byte(source: &mut dyn Read) -> Result<Option<u8>, EncodingError> {
    let mut buf = [0u8; 1];
    match read_exact_or_none(source, &mut buf)? {
        false => Ok(None),
        true => Ok(Some(buf[0])),
    }
}

fn require_byte(source: &mut dyn Read) -> Result<u8, EncodingError> {
    read_byte(source)?.ok_or(EncodingError::InvalidUtf8)
}

/// Like `Read::read_exact`, but treats immediately hitting EOF (zero bytes
/// read before filling `buf` at all) as `Ok(false)` rather than an error, and
/// any partial fill thereafter as an encoding error (an incomplete sequence
/// at end of input).
fn read_exact_or_none(source: &mut dyn Read, buf: &mut [u8]) -> Result<bool, EncodingError> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return Err(EncodingError::InvalidUtf8),
        }
    }
    if filled == 0 {
        Ok(false)
    } else if filled == buf.len() {
        Ok(true)
    } else {
        Err(EncodingError::InvalidUtf8)
    }
}
