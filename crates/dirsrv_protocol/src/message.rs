//! The LDAPMessage envelope.
//!
//! ```text
//! LDAPMessage ::= SEQUENCE {
//!     messageID       INTEGER (0 .. maxInt),
//!     protocolOp      CHOICE { ... },
//!     controls        [0] Controls OPTIONAL }
//! ```
//!
//! Decoding the envelope only splits the frame into its three parts. The
//! operation element is handed to the request decoders in
//! [`crate::request`], which run inside the operation handlers.

use crate::control::{decode_controls, encode_controls, Control};
use crate::error::{ProtocolError, ProtocolResult};
use dirsrv_codec::{BerReader, BerWriter, Element, Tag};

/// Highest message id allowed by the grammar.
pub const MAX_MESSAGE_ID: i64 = i32::MAX as i64;

/// Application tags of the protocol operations.
pub mod tags {
    use dirsrv_codec::Tag;

    /// `BindRequest`
    pub const BIND_REQUEST: Tag = Tag::application(0, true);
    /// `BindResponse`
    pub const BIND_RESPONSE: Tag = Tag::application(1, true);
    /// `UnbindRequest`
    pub const UNBIND_REQUEST: Tag = Tag::application(2, false);
    /// `SearchRequest`
    pub const SEARCH_REQUEST: Tag = Tag::application(3, true);
    /// `SearchResultEntry`
    pub const SEARCH_RESULT_ENTRY: Tag = Tag::application(4, true);
    /// `SearchResultDone`
    pub const SEARCH_RESULT_DONE: Tag = Tag::application(5, true);
    /// `ModifyRequest`
    pub const MODIFY_REQUEST: Tag = Tag::application(6, true);
    /// `ModifyResponse`
    pub const MODIFY_RESPONSE: Tag = Tag::application(7, true);
    /// `AddRequest`
    pub const ADD_REQUEST: Tag = Tag::application(8, true);
    /// `AddResponse`
    pub const ADD_RESPONSE: Tag = Tag::application(9, true);
    /// `DelRequest`
    pub const DEL_REQUEST: Tag = Tag::application(10, false);
    /// `DelResponse`
    pub const DEL_RESPONSE: Tag = Tag::application(11, true);
    /// `ModifyDNRequest`
    pub const MODDN_REQUEST: Tag = Tag::application(12, true);
    /// `ModifyDNResponse`
    pub const MODDN_RESPONSE: Tag = Tag::application(13, true);
    /// `CompareRequest`
    pub const COMPARE_REQUEST: Tag = Tag::application(14, true);
    /// `CompareResponse`
    pub const COMPARE_RESPONSE: Tag = Tag::application(15, true);
    /// `AbandonRequest`
    pub const ABANDON_REQUEST: Tag = Tag::application(16, false);
    /// `ExtendedRequest`
    pub const EXTENDED_REQUEST: Tag = Tag::application(23, true);
    /// `ExtendedResponse`
    pub const EXTENDED_RESPONSE: Tag = Tag::application(24, true);
    /// `controls [0]` in the envelope.
    pub const CONTROLS: Tag = Tag::context(0, true);
}

/// The kind of request carried by an LDAPMessage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Bind
    Bind,
    /// Unbind
    Unbind,
    /// Search
    Search,
    /// Modify
    Modify,
    /// Add
    Add,
    /// Delete
    Delete,
    /// Modify DN
    ModifyDn,
    /// Compare
    Compare,
    /// Abandon
    Abandon,
    /// Extended operation
    Extended,
}

impl OperationKind {
    /// Maps a protocolOp tag to an operation kind.
    pub fn from_tag(tag: Tag) -> Option<Self> {
        use self::tags::*;
        let kind = match tag {
            t if t == BIND_REQUEST => OperationKind::Bind,
            t if t == UNBIND_REQUEST => OperationKind::Unbind,
            t if t == SEARCH_REQUEST => OperationKind::Search,
            t if t == MODIFY_REQUEST => OperationKind::Modify,
            t if t == ADD_REQUEST => OperationKind::Add,
            t if t == DEL_REQUEST => OperationKind::Delete,
            t if t == MODDN_REQUEST => OperationKind::ModifyDn,
            t if t == COMPARE_REQUEST => OperationKind::Compare,
            t if t == ABANDON_REQUEST => OperationKind::Abandon,
            t if t == EXTENDED_REQUEST => OperationKind::Extended,
            _ => return None,
        };
        Some(kind)
    }

    /// Tag of the request element.
    pub fn request_tag(self) -> Tag {
        use self::tags::*;
        match self {
            OperationKind::Bind => BIND_REQUEST,
            OperationKind::Unbind => UNBIND_REQUEST,
            OperationKind::Search => SEARCH_REQUEST,
            OperationKind::Modify => MODIFY_REQUEST,
            OperationKind::Add => ADD_REQUEST,
            OperationKind::Delete => DEL_REQUEST,
            OperationKind::ModifyDn => MODDN_REQUEST,
            OperationKind::Compare => COMPARE_REQUEST,
            OperationKind::Abandon => ABANDON_REQUEST,
            OperationKind::Extended => EXTENDED_REQUEST,
        }
    }

    /// Tag of the final response element, if the operation has one.
    pub fn response_tag(self) -> Option<Tag> {
        use self::tags::*;
        match self {
            OperationKind::Bind => Some(BIND_RESPONSE),
            OperationKind::Search => Some(SEARCH_RESULT_DONE),
            OperationKind::Modify => Some(MODIFY_RESPONSE),
            OperationKind::Add => Some(ADD_RESPONSE),
            OperationKind::Delete => Some(DEL_RESPONSE),
            OperationKind::ModifyDn => Some(MODDN_RESPONSE),
            OperationKind::Compare => Some(COMPARE_RESPONSE),
            OperationKind::Extended => Some(EXTENDED_RESPONSE),
            OperationKind::Unbind | OperationKind::Abandon => None,
        }
    }

    /// Short upper-case name used in stats lines.
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Bind => "BIND",
            OperationKind::Unbind => "UNBIND",
            OperationKind::Search => "SRCH",
            OperationKind::Modify => "MOD",
            OperationKind::Add => "ADD",
            OperationKind::Delete => "DEL",
            OperationKind::ModifyDn => "MODRDN",
            OperationKind::Compare => "CMP",
            OperationKind::Abandon => "ABANDON",
            OperationKind::Extended => "EXT",
        }
    }
}

/// A decoded LDAPMessage envelope borrowing the frame bytes.
#[derive(Debug, Clone, Copy)]
pub struct LdapMessage<'a> {
    /// Message id chosen by the client.
    pub message_id: i64,
    /// Operation kind derived from the protocolOp tag.
    pub kind: OperationKind,
    /// The raw protocolOp element.
    pub op: Element<'a>,
    controls: Option<Element<'a>>,
}

impl<'a> LdapMessage<'a> {
    /// Decodes one complete frame.
    ///
    /// Every error returned here is a framing error.
    pub fn decode(frame: &'a [u8]) -> ProtocolResult<Self> {
        let mut outer = BerReader::new(frame);
        let message = outer.read_tagged(Tag::SEQUENCE)?;
        outer.finish()?;

        let mut fields = message.reader()?;
        let message_id = fields.read_integer()?;
        if !(0..=MAX_MESSAGE_ID).contains(&message_id) {
            return Err(dirsrv_codec::CodecError::invalid_integer(format!(
                "message id {message_id} out of range"
            ))
            .into());
        }

        let op = fields.read_element()?;
        let kind =
            OperationKind::from_tag(op.tag()).ok_or_else(|| ProtocolError::UnknownOperation {
                tag: op.tag().to_string(),
            })?;

        let controls = fields.read_optional(tags::CONTROLS)?;
        fields.finish()?;

        Ok(Self {
            message_id,
            kind,
            op,
            controls,
        })
    }

    /// Returns true if the message carries a controls element.
    pub fn has_controls(&self) -> bool {
        self.controls.is_some()
    }

    /// Decodes the controls attached to the message.
    pub fn controls(&self) -> ProtocolResult<Vec<Control>> {
        match self.controls {
            Some(element) => decode_controls(element),
            None => Ok(Vec::new()),
        }
    }
}

/// Wraps an encoded protocolOp in an LDAPMessage.
pub fn encode_message(
    message_id: i64,
    controls: &[Control],
    op: impl FnOnce(&mut BerWriter),
) -> Vec<u8> {
    let mut writer = BerWriter::new();
    writer.write_sequence(|w| {
        w.write_integer(message_id);
        op(w);
        if !controls.is_empty() {
            encode_controls(w, controls);
        }
    });
    writer.into_bytes()
}
