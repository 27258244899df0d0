//! Response grammar.

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{encode_message, tags, OperationKind};
use crate::result_code::ResultCode;
use dirsrv_codec::{BerReader, BerWriter, Element, Tag};

/// OID of the unsolicited Notice of Disconnection.
pub const NOTICE_OF_DISCONNECTION_OID: &str = "1.3.6.1.4.1.1466.20036";

const REFERRAL: Tag = Tag::context(3, true);
const RESPONSE_NAME: Tag = Tag::context(10, false);
const RESPONSE_VALUE: Tag = Tag::context(11, false);

/// `LDAPResult ::= SEQUENCE { resultCode, matchedDN, diagnosticMessage, referral [3] OPTIONAL }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapResult {
    /// Result code.
    pub code: ResultCode,
    /// Deepest existing entry on a name resolution failure.
    pub matched_dn: String,
    /// Diagnostic text.
    pub message: String,
    /// Referral URIs, sent only with [`ResultCode::Referral`].
    pub referrals: Vec<String>,
}

impl LdapResult {
    /// Creates a result with a code and diagnostic message.
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            matched_dn: String::new(),
            message: message.into(),
            referrals: Vec::new(),
        }
    }

    /// A bare success result.
    pub fn success() -> Self {
        Self::new(ResultCode::Success, "")
    }

    /// A referral result.
    pub fn referral(referrals: Vec<String>) -> Self {
        Self::new(ResultCode::Referral, "").with_referrals(referrals)
    }

    /// Sets the matched DN.
    pub fn with_matched_dn(mut self, matched_dn: impl Into<String>) -> Self {
        self.matched_dn = matched_dn.into();
        self
    }

    /// Sets the referral URIs.
    pub fn with_referrals(mut self, referrals: Vec<String>) -> Self {
        self.referrals = referrals;
        self
    }

    fn encode_components(&self, w: &mut BerWriter) {
        w.write_enumerated(i64::from(self.code.to_code()));
        w.write_octet_string(self.matched_dn.as_bytes());
        w.write_octet_string(self.message.as_bytes());
        if !self.referrals.is_empty() {
            w.write_constructed(REFERRAL, |w| {
                for uri in &self.referrals {
                    w.write_octet_string(uri.as_bytes());
                }
            });
        }
    }

    fn decode_components(reader: &mut BerReader<'_>) -> ProtocolResult<Self> {
        let raw_code = reader.read_enumerated()?;
        let code = u32::try_from(raw_code)
            .map(ResultCode::from_code)
            .map_err(|_| ProtocolError::invalid_value("resultCode", raw_code.to_string()))?;
        let matched_dn = reader.read_string()?.to_string();
        let message = reader.read_string()?.to_string();
        let mut referrals = Vec::new();
        if let Some(list) = reader.read_optional(REFERRAL)? {
            for uri in list.sequence()? {
                referrals.push(uri?.expect(Tag::OCTET_STRING)?.as_str()?.to_string());
            }
        }
        Ok(Self {
            code,
            matched_dn,
            message,
            referrals,
        })
    }
}

impl Default for LdapResult {
    fn default() -> Self {
        Self::success()
    }
}

/// `SearchResultEntry ::= [APPLICATION 4] SEQUENCE { objectName, attributes }`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResultEntry {
    /// Entry DN.
    pub dn: String,
    /// `(type, values)` pairs; values are empty when only types were requested.
    pub attributes: Vec<(String, Vec<Vec<u8>>)>,
}

impl SearchResultEntry {
    /// Returns the values of the first attribute matching `attr_type`
    /// case-insensitively.
    pub fn values(&self, attr_type: &str) -> Option<&[Vec<u8>]> {
        self.attributes
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(attr_type))
            .map(|(_, v)| v.as_slice())
    }
}

/// A server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `BindResponse`
    Bind(LdapResult),
    /// `AddResponse`
    Add(LdapResult),
    /// `ModifyResponse`
    Modify(LdapResult),
    /// `DelResponse`
    Delete(LdapResult),
    /// `ModifyDNResponse`
    ModifyDn(LdapResult),
    /// `CompareResponse`
    Compare(LdapResult),
    /// `SearchResultEntry`
    SearchEntry(SearchResultEntry),
    /// `SearchResultDone`
    SearchDone(LdapResult),
    /// `ExtendedResponse`
    Extended {
        /// Result.
        result: LdapResult,
        /// responseName.
        name: Option<String>,
        /// responseValue.
        value: Option<Vec<u8>>,
    },
}

impl Response {
    /// Builds the final response for an operation kind.
    ///
    /// Returns `None` for operations that have no response.
    pub fn for_kind(kind: OperationKind, result: LdapResult) -> Option<Self> {
        let response = match kind {
            OperationKind::Bind => Response::Bind(result),
            OperationKind::Add => Response::Add(result),
            OperationKind::Modify => Response::Modify(result),
            OperationKind::Delete => Response::Delete(result),
            OperationKind::ModifyDn => Response::ModifyDn(result),
            OperationKind::Compare => Response::Compare(result),
            OperationKind::Search => Response::SearchDone(result),
            OperationKind::Extended => Response::Extended {
                result,
                name: None,
                value: None,
            },
            OperationKind::Unbind | OperationKind::Abandon => return None,
        };
        Some(response)
    }

    /// The LDAP result, for every response except a search entry.
    pub fn result(&self) -> Option<&LdapResult> {
        match self {
            Response::Bind(r)
            | Response::Add(r)
            | Response::Modify(r)
            | Response::Delete(r)
            | Response::ModifyDn(r)
            | Response::Compare(r)
            | Response::SearchDone(r) => Some(r),
            Response::Extended { result, .. } => Some(result),
            Response::SearchEntry(_) => None,
        }
    }

    /// Encodes the response as a complete frame.
    pub fn encode(&self, message_id: i64) -> Vec<u8> {
        encode_message(message_id, &[], |w| match self {
            Response::Bind(r) => encode_result(w, tags::BIND_RESPONSE, r),
            Response::Add(r) => encode_result(w, tags::ADD_RESPONSE, r),
            Response::Modify(r) => encode_result(w, tags::MODIFY_RESPONSE, r),
            Response::Delete(r) => encode_result(w, tags::DEL_RESPONSE, r),
            Response::ModifyDn(r) => encode_result(w, tags::MODDN_RESPONSE, r),
            Response::Compare(r) => encode_result(w, tags::COMPARE_RESPONSE, r),
            Response::SearchDone(r) => encode_result(w, tags::SEARCH_RESULT_DONE, r),
            Response::SearchEntry(entry) => {
                w.write_constructed(tags::SEARCH_RESULT_ENTRY, |w| {
                    w.write_octet_string(entry.dn.as_bytes());
                    w.write_sequence(|w| {
                        for (attr_type, values) in &entry.attributes {
                            w.write_sequence(|w| {
                                w.write_octet_string(attr_type.as_bytes());
                                w.write_constructed(Tag::SET, |w| {
                                    for value in values {
                                        w.write_octet_string(value);
                                    }
                                });
                            });
                        }
                    });
                });
            }
            Response::Extended {
                result,
                name,
                value,
            } => {
                w.write_constructed(tags::EXTENDED_RESPONSE, |w| {
                    result.encode_components(w);
                    if let Some(name) = name {
                        w.write_primitive(RESPONSE_NAME, name.as_bytes());
                    }
                    if let Some(value) = value {
                        w.write_primitive(RESPONSE_VALUE, value);
                    }
                });
            }
        })
    }

    /// Decodes a response frame, returning its message id.
    pub fn decode(frame: &[u8]) -> ProtocolResult<(i64, Self)> {
        // The envelope decoder only knows request tags.
        let mut outer = BerReader::new(frame);
        let message = outer.read_tagged(Tag::SEQUENCE)?;
        outer.finish()?;
        let mut fields = message.reader()?;
        let message_id = fields.read_integer()?;
        let op = fields.read_element()?;
        fields.read_optional(tags::CONTROLS)?;
        fields.finish()?;
        Ok((message_id, Self::decode_op(op)?))
    }

    fn decode_op(op: Element<'_>) -> ProtocolResult<Self> {
        let mut reader = op.reader()?;
        let tag = op.tag();
        let response = if tag == tags::SEARCH_RESULT_ENTRY {
            let dn = reader.read_string()?.to_string();
            let mut attributes = Vec::new();
            for attr in reader.read_tagged(Tag::SEQUENCE)?.sequence()? {
                let mut fields = attr?.expect(Tag::SEQUENCE)?.reader()?;
                let attr_type = fields.read_string()?.to_string();
                let mut values = Vec::new();
                for value in fields.read_tagged(Tag::SET)?.sequence()? {
                    values.push(value?.expect(Tag::OCTET_STRING)?.as_octets().to_vec());
                }
                fields.finish()?;
                attributes.push((attr_type, values));
            }
            Response::SearchEntry(SearchResultEntry { dn, attributes })
        } else if tag == tags::EXTENDED_RESPONSE {
            let result = LdapResult::decode_components(&mut reader)?;
            let name = reader
                .read_optional(RESPONSE_NAME)?
                .map(|e| e.as_str().map(str::to_string))
                .transpose()?;
            let value = reader
                .read_optional(RESPONSE_VALUE)?
                .map(|e| e.as_octets().to_vec());
            Response::Extended {
                result,
                name,
                value,
            }
        } else {
            let result = LdapResult::decode_components(&mut reader)?;
            match tag {
                t if t == tags::BIND_RESPONSE => Response::Bind(result),
                t if t == tags::ADD_RESPONSE => Response::Add(result),
                t if t == tags::MODIFY_RESPONSE => Response::Modify(result),
                t if t == tags::DEL_RESPONSE => Response::Delete(result),
                t if t == tags::MODDN_RESPONSE => Response::ModifyDn(result),
                t if t == tags::COMPARE_RESPONSE => Response::Compare(result),
                t if t == tags::SEARCH_RESULT_DONE => Response::SearchDone(result),
                other => {
                    return Err(ProtocolError::UnknownOperation {
                        tag: other.to_string(),
                    })
                }
            }
        };
        reader.finish()?;
        Ok(response)
    }
}

fn encode_result(w: &mut BerWriter, tag: Tag, result: &LdapResult) {
    w.write_constructed(tag, |w| result.encode_components(w));
}

/// Encodes the unsolicited Notice of Disconnection sent before closing a
/// connection on a framing error.
pub fn notice_of_disconnection(message: impl Into<String>) -> Vec<u8> {
    Response::Extended {
        result: LdapResult::new(ResultCode::ProtocolError, message),
        name: Some(NOTICE_OF_DISCONNECTION_OID.to_string()),
        value: None,
    }
    .encode(0)
}

/// Returns true if `frame` is a Notice of Disconnection.
pub fn is_notice_of_disconnection(frame: &[u8]) -> bool {
    matches!(
        Response::decode(frame),
        Ok((0, Response::Extended { name: Some(ref name), .. })) if name == NOTICE_OF_DISCONNECTION_OID
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_response_bytes() {
        let frame = Response::Add(LdapResult::success()).encode(1);
        assert_eq!(
            frame,
            vec![0x30, 0x0c, 0x02, 0x01, 0x01, 0x69, 0x07, 0x0a, 0x01, 0x00, 0x04, 0x00, 0x04, 0x00]
        );
    }

    #[test]
    fn referral_is_context_three() {
        let result = LdapResult::referral(vec!["ldap://master.example.com/".into()]);
        let frame = Response::Add(result.clone()).encode(3);
        assert!(frame.contains(&0xa3));
        assert_eq!(Response::decode(&frame).unwrap(), (3, Response::Add(result)));
    }

    #[test]
    fn search_entry_roundtrip() {
        let entry = SearchResultEntry {
            dn: "cn=foo,dc=example,dc=com".into(),
            attributes: vec![("cn".into(), vec![b"foo".to_vec()])],
        };
        let frame = Response::SearchEntry(entry.clone()).encode(2);
        let (id, decoded) = Response::decode(&frame).unwrap();
        assert_eq!(id, 2);
        assert_eq!(decoded, Response::SearchEntry(entry.clone()));
        assert_eq!(entry.values("CN"), Some(&[b"foo".to_vec()][..]));
    }

    #[test]
    fn notice_of_disconnection_shape() {
        let frame = notice_of_disconnection("decoding error");
        assert!(is_notice_of_disconnection(&frame));
        let (id, response) = Response::decode(&frame).unwrap();
        assert_eq!(id, 0);
        let result = response.result().unwrap();
        assert_eq!(result.code, ResultCode::ProtocolError);
        assert_eq!(result.message, "decoding error");
    }

    #[test]
    fn no_response_for_unbind() {
        assert!(Response::for_kind(OperationKind::Unbind, LdapResult::success()).is_none());
        assert!(matches!(
            Response::for_kind(OperationKind::Search, LdapResult::success()),
            Some(Response::SearchDone(_))
        ));
    }
}
