//! # dirsrv Protocol
//!
//! LDAPv3 message grammar on top of `dirsrv_codec`.
//!
//! The envelope decoder ([`LdapMessage::decode`]) only splits a frame into
//! message id, operation element and controls. Operation handlers decode
//! their own request grammar from the raw element, so a malformed request
//! is detected in the handler that owns it.
//!
//! Errors come in two kinds (see [`ProtocolError::is_framing`]): framing
//! errors end the connection, while an out-of-range enumeration is answered
//! with a `protocolError` result.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod control;
mod error;
pub mod filter;
mod frame;
pub mod message;
pub mod request;
pub mod response;
mod result_code;

pub use control::Control;
pub use error::{ProtocolError, ProtocolResult};
pub use filter::Filter;
pub use frame::{FrameBuffer, DEFAULT_MAX_FRAME_SIZE};
pub use message::{encode_message, LdapMessage, OperationKind};
pub use request::{
    AddRequest, Authentication, BindRequest, Change, DerefAliases, ModifyOperation,
    ModifyRequest, PartialAttribute, Request, Scope, SearchRequest,
};
pub use response::{
    notice_of_disconnection, LdapResult, Response, SearchResultEntry,
    NOTICE_OF_DISCONNECTION_OID,
};
pub use result_code::ResultCode;
