//! Error types for the protocol crate.

use dirsrv_codec::CodecError;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding LDAP messages.
///
/// [`ProtocolError::Codec`] and [`ProtocolError::UnknownOperation`] are
/// framing errors and end the connection. [`ProtocolError::InvalidValue`]
/// is a well-formed element carrying a value the grammar does not allow;
/// it is answered with a `protocolError` result on the same connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// BER framing error.
    #[error("decoding error: {0}")]
    Codec(#[from] CodecError),

    /// The protocolOp tag does not name an LDAP operation.
    #[error("unknown protocol operation tag {tag}")]
    UnknownOperation {
        /// Raw identifier octet.
        tag: String,
    },

    /// A field holds a value outside its allowed range.
    #[error("invalid {field}: {message}")]
    InvalidValue {
        /// The field being decoded.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },
}

impl ProtocolError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }

    /// Returns true if the connection must be dropped.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            ProtocolError::Codec(_) | ProtocolError::UnknownOperation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ProtocolError::from(CodecError::UnexpectedEof).is_framing());
        assert!(ProtocolError::UnknownOperation { tag: "[application 30 primitive]".into() }.is_framing());
        assert!(!ProtocolError::invalid_value("scope", "7").is_framing());
    }
}
