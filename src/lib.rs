//! A streaming, namespace-aware XML reader.
//!
//! This crate implements a conforming subset of [XML 1.0 (Fifth Edition)][xml10]
//! and [Namespaces in XML 1.0 (Third Edition)][xmlns] well-formedness checking:
//! elements, attributes, text, CDATA sections, comments, processing instructions,
//! character and entity references, and the XML declaration. DOCTYPE/DTD is an
//! explicit non-goal and is rejected as soon as `<!DOCTYPE` is seen.
//!
//! [xml10]: https://www.w3.org/TR/xml/
//! [xmlns]: https://www.w3.org/TR/xml-names/
//!
//! ## Architecture
//!
//! - [`scanner`]: a codepoint-at-a-time, allocation-free deterministic state
//!   machine that recognizes XML syntax and emits [`scanner::Token`]s carrying
//!   byte ranges into the caller's buffer.
//! - [`reader`]: a buffered pull [`reader::Reader`] that drives the scanner
//!   over a byte source, assembling tokens into [`reader::Node`]s, expanding
//!   entities, resolving namespaces, and tracking the open-element stack.
//! - [`encoding`]: pluggable [`encoding::Decoder`]s (UTF-8, UTF-16, and
//!   BOM/pattern auto-detection).
//! - [`name`]: qualified name parsing and namespace scope tracking.
//! - [`chars`]: the character-class predicates the XML grammar is built on.
//! - [`entities`]: the five predefined entities.
//! - [`errors`]: the crate's error taxonomy.
//!
//! ## Example
//!
//! ```no_run
//! use xmlcore::reader::{Node, Reader};
//!
//! let xml = br#"<catalog><book id="1">Rust in Action</book></catalog>"#;
//! let mut reader = Reader::new(&xml[..]);
//!
//! loop {
//!     match reader.read().unwrap() {
//!         Node::ElementStart { name } => println!("start: {name}"),
//!         Node::Text { content } => println!("text: {content}"),
//!         Node::ElementEnd { name } => println!("end: {name}"),
//!         Node::Eof => break,
//!         _ => {}
//!     }
//! }
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chars;
pub mod encoding;
pub mod entities;
pub mod errors;
pub mod name;
pub mod reader;
pub mod scanner;

pub use errors::{Error, Result};
pub use reader::{Node, Reader, ReaderConfig};
