//! Error types for the operation pipeline.

use dirsrv_core::{BackendError, DnError, EntryError};
use dirsrv_protocol::{LdapResult, ProtocolError, ResultCode};
use thiserror::Error;

/// Result type for operation handlers.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that end an operation early.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// The frame could not be decoded; the connection is dropped.
    #[error("framing error: {0}")]
    Framing(ProtocolError),

    /// The operation fails with this result; the connection stays open.
    #[error("{}: {}", .0.code, .0.message)]
    Operation(LdapResult),
}

impl ServerError {
    /// An operation-scoped failure.
    pub fn result(code: ResultCode, message: impl Into<String>) -> Self {
        Self::Operation(LdapResult::new(code, message))
    }

    /// `protocolError` with a diagnostic message.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::result(ResultCode::ProtocolError, message)
    }

    /// `invalidDNSyntax` for a DN that does not parse.
    pub fn invalid_dn() -> Self {
        Self::result(ResultCode::InvalidDnSyntax, "invalid DN")
    }

    /// A referral to the given URIs.
    pub fn referral(referrals: Vec<String>) -> Self {
        Self::Operation(LdapResult::referral(referrals))
    }

    /// Returns true if the connection must be closed.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, ServerError::Framing(_))
    }

    /// The result sent to the client, if any.
    pub fn into_result(self) -> Option<LdapResult> {
        match self {
            ServerError::Framing(_) => None,
            ServerError::Operation(result) => Some(result),
        }
    }
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidValue { message, .. } => Self::protocol(message),
            framing => Self::Framing(framing),
        }
    }
}

impl From<BackendError> for ServerError {
    fn from(err: BackendError) -> Self {
        Self::Operation(err.to_result())
    }
}

impl From<EntryError> for ServerError {
    fn from(err: EntryError) -> Self {
        Self::Operation(err.to_result())
    }
}

impl From<DnError> for ServerError {
    fn from(_: DnError) -> Self {
        Self::invalid_dn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsrv_codec::CodecError;

    #[test]
    fn error_classification() {
        let framing: ServerError = ProtocolError::from(CodecError::UnexpectedEof).into();
        assert!(framing.is_connection_fatal());
        assert!(framing.into_result().is_none());

        let invalid: ServerError =
            ProtocolError::invalid_value("operation", "unrecognized modify operation 7").into();
        assert!(!invalid.is_connection_fatal());
        let result = invalid.into_result().unwrap();
        assert_eq!(result.code, ResultCode::ProtocolError);
        assert_eq!(result.message, "unrecognized modify operation 7");
    }

    #[test]
    fn backend_errors_pass_through() {
        let err: ServerError = BackendError::no_such_object(Some("dc=example,dc=com".into())).into();
        let result = err.into_result().unwrap();
        assert_eq!(result.code, ResultCode::NoSuchObject);
        assert_eq!(result.matched_dn, "dc=example,dc=com");
    }

    #[test]
    fn error_display() {
        let err = ServerError::invalid_dn();
        assert!(err.to_string().contains("invalid DN"));
    }
}
