//! Error types for the codec crate.

use crate::tag::Tag;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while reading or writing BER elements.
///
/// Every variant is a *framing* error: the byte stream cannot be trusted
/// past the point of failure, so callers tear down the connection rather
/// than answering the request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended in the middle of a tag, length or contents.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Indefinite-length encoding is not allowed in LDAP.
    #[error("indefinite-length encoding is forbidden")]
    IndefiniteLength,

    /// The long-form length uses more octets than supported.
    #[error("length uses {octets} octets, at most 4 are supported")]
    LengthOverflow {
        /// Number of length octets announced by the first length byte.
        octets: u8,
    },

    /// The identifier octets are malformed.
    #[error("invalid tag: {message}")]
    InvalidTag {
        /// Description of the tag error.
        message: String,
    },

    /// An element carried a different tag than the grammar requires.
    #[error("unexpected tag: expected {expected}, got {actual}")]
    UnexpectedTag {
        /// Tag the grammar required.
        expected: Tag,
        /// Tag found on the wire.
        actual: Tag,
    },

    /// An INTEGER or ENUMERATED element is empty or too wide.
    #[error("invalid integer: {message}")]
    InvalidInteger {
        /// Description of the integer error.
        message: String,
    },

    /// A BOOLEAN element does not hold exactly one octet.
    #[error("invalid boolean encoding")]
    InvalidBoolean,

    /// A string element is not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Bytes remain after the last element of a structure.
    #[error("{remaining} trailing bytes after element")]
    TrailingData {
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// A frame announces a size beyond the configured maximum.
    #[error("frame of {claimed} bytes exceeds limit of {max_allowed}")]
    FrameTooLarge {
        /// Size announced by the frame header.
        claimed: u64,
        /// Configured upper bound.
        max_allowed: u64,
    },

    /// Structural violation not covered by another variant.
    #[error("invalid structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },
}

impl CodecError {
    /// Create an invalid tag error.
    pub fn invalid_tag(message: impl Into<String>) -> Self {
        Self::InvalidTag {
            message: message.into(),
        }
    }

    /// Create an invalid integer error.
    pub fn invalid_integer(message: impl Into<String>) -> Self {
        Self::InvalidInteger {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an unexpected tag error.
    pub fn unexpected_tag(expected: Tag, actual: Tag) -> Self {
        Self::UnexpectedTag { expected, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_tag_display_names_both_tags() {
        let err = CodecError::unexpected_tag(Tag::SEQUENCE, Tag::OCTET_STRING);
        let msg = err.to_string();
        assert!(msg.contains("universal 16"));
        assert!(msg.contains("universal 4"));
    }
}
