//! # dirsrv Codec
//!
//! BER (Basic Encoding Rules) element reader and writer for the LDAP
//! message pipeline.
//!
//! The reader is zero-copy: [`Element`]s borrow the input and constructed
//! elements are walked lazily through [`SequenceIter`], so operation
//! handlers can consume a request one sub-element at a time.
//!
//! ## Encoding Rules
//!
//! - Definite lengths only; indefinite length is a framing error
//! - Long-form lengths of at most 4 octets
//! - Integers are two's complement, at most 8 octets
//! - The writer always emits minimal lengths and integers
//!
//! Any malformed tag, length or premature end of input is a
//! [`CodecError`], which the server treats as fatal to the connection.
//!
//! ## Usage
//!
//! ```
//! use dirsrv_codec::{BerReader, BerWriter, Tag};
//!
//! let mut writer = BerWriter::new();
//! writer.write_sequence(|w| {
//!     w.write_integer(7);
//!     w.write_octet_string(b"dc=example,dc=com");
//! });
//! let bytes = writer.into_bytes();
//!
//! let mut reader = BerReader::new(&bytes);
//! let message = reader.read_tagged(Tag::SEQUENCE).unwrap();
//! let mut fields = message.reader().unwrap();
//! assert_eq!(fields.read_integer().unwrap(), 7);
//! assert_eq!(fields.read_string().unwrap(), "dc=example,dc=com");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod tag;

pub use decoder::{element_length, BerReader, Element, SequenceIter};
pub use encoder::BerWriter;
pub use error::{CodecError, CodecResult};
pub use tag::{Tag, TagClass};
