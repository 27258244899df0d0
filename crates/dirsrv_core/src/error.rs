//! Error types for the directory model.

use dirsrv_protocol::{LdapResult, ResultCode};
use thiserror::Error;

/// Errors raised while parsing a distinguished name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DnError {
    /// An AVA has no `=`.
    #[error("missing '=' at offset {offset}")]
    MissingEquals {
        /// Byte offset in the input.
        offset: usize,
    },

    /// An AVA has an empty attribute type.
    #[error("empty attribute type at offset {offset}")]
    EmptyType {
        /// Byte offset in the input.
        offset: usize,
    },

    /// The attribute type is neither a descriptor nor a numeric OID.
    #[error("invalid attribute type {attr_type:?}")]
    InvalidType {
        /// The offending type.
        attr_type: String,
    },

    /// A backslash at the end of the input.
    #[error("dangling escape at end of DN")]
    DanglingEscape,

    /// A backslash followed by something that is not an escapable character
    /// or a hex pair.
    #[error("invalid escape at offset {offset}")]
    BadEscape {
        /// Byte offset in the input.
        offset: usize,
    },

    /// A quoted value without a closing quote.
    #[error("unterminated quoted value")]
    UnterminatedQuote,

    /// Characters after a closing quote.
    #[error("unexpected character after quoted value at offset {offset}")]
    TrailingAfterQuote {
        /// Byte offset in the input.
        offset: usize,
    },

    /// A `#` value that is not an even number of hex digits.
    #[error("invalid hex value")]
    InvalidHexValue,

    /// An RDN with no AVAs, such as `dc=a,,dc=b`.
    #[error("empty RDN")]
    EmptyRdn,

    /// Escaped octets do not form UTF-8.
    #[error("value is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors raised while building or modifying an entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// The same type appeared twice in an add request.
    #[error("attribute provided more than once")]
    DuplicateAttribute {
        /// Attribute type.
        attr_type: String,
    },

    /// An attribute would have no values.
    #[error("no values for attribute type")]
    NoValues {
        /// Attribute type.
        attr_type: String,
    },

    /// A value to add is already present.
    #[error("modify/add: {attr_type}: value #{index} already exists")]
    ValueExists {
        /// Attribute type.
        attr_type: String,
        /// Index of the value in the modification.
        index: usize,
    },

    /// The attribute to delete is not present.
    #[error("modify/delete: {attr_type}: no such attribute")]
    NoSuchAttribute {
        /// Attribute type.
        attr_type: String,
    },

    /// A value to delete is not present.
    #[error("modify/delete: {attr_type}: no such value")]
    NoSuchValue {
        /// Attribute type.
        attr_type: String,
    },

    /// The change would remove a value named in the RDN.
    #[error("value of naming attribute '{attr_type}' is not present")]
    RdnValue {
        /// Attribute type.
        attr_type: String,
    },

    /// A user tried to set an operational attribute.
    #[error("no-user-modification attribute type")]
    NoUserModification {
        /// Attribute type.
        attr_type: String,
    },

    /// A non-add modification was merged into a new entry.
    #[error("{attr_type}: only add modifications build an entry")]
    NotAnAdd {
        /// Attribute type.
        attr_type: String,
    },
}

impl EntryError {
    /// The LDAP result code for this error.
    pub fn result_code(&self) -> ResultCode {
        match self {
            EntryError::DuplicateAttribute { .. } | EntryError::NotAnAdd { .. } => {
                ResultCode::OperationsError
            }
            EntryError::NoValues { .. } => ResultCode::ProtocolError,
            EntryError::ValueExists { .. } => ResultCode::AttributeOrValueExists,
            EntryError::NoSuchAttribute { .. } | EntryError::NoSuchValue { .. } => {
                ResultCode::NoSuchAttribute
            }
            EntryError::RdnValue { .. } => ResultCode::NotAllowedOnRdn,
            EntryError::NoUserModification { .. } => ResultCode::ConstraintViolation,
        }
    }

    /// Converts to the result sent to the client.
    pub fn to_result(&self) -> LdapResult {
        LdapResult::new(self.result_code(), self.to_string())
    }
}

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// A failure reported by a backend.
///
/// The pipeline passes code, message and matched DN to the client verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct BackendError {
    /// Result code.
    pub code: ResultCode,
    /// Diagnostic message.
    pub message: String,
    /// Deepest existing entry, for name resolution failures.
    pub matched: Option<String>,
}

impl BackendError {
    /// Creates a backend error.
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            matched: None,
        }
    }

    /// Sets the matched DN.
    pub fn with_matched(mut self, matched: impl Into<String>) -> Self {
        self.matched = Some(matched.into());
        self
    }

    /// `noSuchObject`
    pub fn no_such_object(matched: Option<String>) -> Self {
        Self {
            code: ResultCode::NoSuchObject,
            message: String::new(),
            matched,
        }
    }

    /// `entryAlreadyExists`
    pub fn already_exists() -> Self {
        Self::new(ResultCode::EntryAlreadyExists, "")
    }

    /// `unwillingToPerform`
    pub fn unwilling(message: impl Into<String>) -> Self {
        Self::new(ResultCode::UnwillingToPerform, message)
    }

    /// `invalidCredentials`
    pub fn invalid_credentials() -> Self {
        Self::new(ResultCode::InvalidCredentials, "")
    }

    /// Converts to the result sent to the client.
    pub fn to_result(&self) -> LdapResult {
        let result = LdapResult::new(self.code, self.message.clone());
        match self.matched {
            Some(ref matched) => result.with_matched_dn(matched.clone()),
            None => result,
        }
    }
}

impl From<EntryError> for BackendError {
    fn from(err: EntryError) -> Self {
        Self::new(err.result_code(), err.to_string())
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while registering backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Another backend already serves the suffix.
    #[error("suffix \"{suffix}\" already served by backend {existing}")]
    DuplicateSuffix {
        /// Normalized suffix.
        suffix: String,
        /// Id of the backend that claimed it first.
        existing: String,
    },

    /// Backend ids must be unique.
    #[error("backend id {id} already registered")]
    DuplicateId {
        /// The id.
        id: String,
    },

    /// A backend must serve at least one suffix.
    #[error("backend {id} has no suffixes")]
    NoSuffixes {
        /// The id.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_error_codes() {
        let dup = EntryError::DuplicateAttribute {
            attr_type: "cn".into(),
        };
        assert_eq!(dup.result_code(), ResultCode::OperationsError);
        assert_eq!(dup.to_result().message, "attribute provided more than once");

        let nousermod = EntryError::NoUserModification {
            attr_type: "createTimestamp".into(),
        };
        assert_eq!(nousermod.result_code(), ResultCode::ConstraintViolation);
        assert_eq!(nousermod.to_string(), "no-user-modification attribute type");
    }

    #[test]
    fn backend_error_carries_matched_dn() {
        let err = BackendError::no_such_object(Some("dc=example,dc=com".into()));
        let result = err.to_result();
        assert_eq!(result.code, ResultCode::NoSuchObject);
        assert_eq!(result.matched_dn, "dc=example,dc=com");
    }
}
