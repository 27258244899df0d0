//! Request grammar.
//!
//! `AddRequest` borrows the frame and walks its attribute list lazily;
//! the remaining requests are small and decode into owned values. Every
//! decoder takes the raw protocolOp element from [`LdapMessage::op`].
//!
//! [`LdapMessage::op`]: crate::message::LdapMessage

use crate::control::Control;
use crate::error::{ProtocolError, ProtocolResult};
use crate::filter::{AttributeValueAssertion, Filter};
use crate::message::{encode_message, tags};
use dirsrv_codec::{BerWriter, Element, SequenceIter, Tag};

const SIMPLE_AUTH: Tag = Tag::context(0, false);
const SASL_AUTH: Tag = Tag::context(3, true);
const NEW_SUPERIOR: Tag = Tag::context(0, false);
const EXTENDED_NAME: Tag = Tag::context(0, false);
const EXTENDED_VALUE: Tag = Tag::context(1, false);

/// `maxInt` of RFC 4511, the upper bound of search limits.
pub const MAX_INT: i64 = 2_147_483_647;

/// One `(type, values)` pair of an add request, borrowing the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialAttribute<'a> {
    /// Attribute description as sent by the client.
    pub attr_type: &'a str,
    /// Values in wire order.
    pub values: Vec<&'a [u8]>,
}

/// `AddRequest ::= [APPLICATION 8] SEQUENCE { entry LDAPDN, attributes AttributeList }`
#[derive(Debug, Clone, Copy)]
pub struct AddRequest<'a> {
    /// DN of the new entry, not yet normalized.
    pub name: &'a str,
    attributes: Element<'a>,
}

impl<'a> AddRequest<'a> {
    /// Decodes the name and locates the attribute list.
    pub fn decode(op: Element<'a>) -> ProtocolResult<Self> {
        let mut reader = op.expect(tags::ADD_REQUEST)?.reader()?;
        let name = reader.read_string()?;
        let attributes = reader.read_tagged(Tag::SEQUENCE)?;
        reader.finish()?;
        Ok(Self { name, attributes })
    }

    /// Returns a lazy iterator over the attribute list.
    pub fn attributes(&self) -> ProtocolResult<AttributeIter<'a>> {
        Ok(AttributeIter {
            inner: self.attributes.sequence()?,
            failed: false,
        })
    }
}

/// Lazy iterator over the `(type, values)` pairs of an add request.
///
/// Each item is decoded on demand. Any decoding failure is yielded once
/// and the iterator then ends.
#[derive(Debug, Clone)]
pub struct AttributeIter<'a> {
    inner: SequenceIter<'a>,
    failed: bool,
}

impl<'a> Iterator for AttributeIter<'a> {
    type Item = ProtocolResult<PartialAttribute<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self
            .inner
            .next()?
            .map_err(ProtocolError::from)
            .and_then(decode_partial_attribute);
        self.failed = item.is_err();
        Some(item)
    }
}

impl std::iter::FusedIterator for AttributeIter<'_> {}

fn decode_partial_attribute(element: Element<'_>) -> ProtocolResult<PartialAttribute<'_>> {
    let mut reader = element.expect(Tag::SEQUENCE)?.reader()?;
    let attr_type = reader.read_string()?;
    let set = reader.read_tagged(Tag::SET)?;
    reader.finish()?;

    let mut values = Vec::new();
    for value in set.sequence()? {
        values.push(value?.expect(Tag::OCTET_STRING)?.as_octets());
    }
    Ok(PartialAttribute { attr_type, values })
}

fn decode_owned_values(set: Element<'_>) -> ProtocolResult<Vec<Vec<u8>>> {
    let mut values = Vec::new();
    for value in set.expect(Tag::SET)?.sequence()? {
        values.push(value?.expect(Tag::OCTET_STRING)?.as_octets().to_vec());
    }
    Ok(values)
}

/// The operation of one modify change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifyOperation {
    /// add (0)
    Add,
    /// delete (1)
    Delete,
    /// replace (2)
    Replace,
}

impl ModifyOperation {
    /// Maps the wire enumeration.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            0 => Some(ModifyOperation::Add),
            1 => Some(ModifyOperation::Delete),
            2 => Some(ModifyOperation::Replace),
            _ => None,
        }
    }

    /// The wire enumeration value.
    pub fn to_wire(self) -> i64 {
        match self {
            ModifyOperation::Add => 0,
            ModifyOperation::Delete => 1,
            ModifyOperation::Replace => 2,
        }
    }

    /// The LDIF keyword: `add`, `delete` or `replace`.
    pub fn keyword(self) -> &'static str {
        match self {
            ModifyOperation::Add => "add",
            ModifyOperation::Delete => "delete",
            ModifyOperation::Replace => "replace",
        }
    }
}

/// One change of a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// What to do with the values.
    pub operation: ModifyOperation,
    /// Attribute description.
    pub attr_type: String,
    /// Values, possibly empty.
    pub values: Vec<Vec<u8>>,
}

impl Change {
    /// Creates a change.
    pub fn new(operation: ModifyOperation, attr_type: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            operation,
            attr_type: attr_type.into(),
            values,
        }
    }
}

/// `ModifyRequest ::= [APPLICATION 6] SEQUENCE { object LDAPDN, changes SEQUENCE OF change }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    /// DN of the target entry, not yet normalized.
    pub object: String,
    /// Changes in wire order.
    pub changes: Vec<Change>,
}

impl ModifyRequest {
    /// Decodes a modify request.
    ///
    /// An out-of-range operation enumeration is reported as
    /// [`ProtocolError::InvalidValue`].
    pub fn decode(op: Element<'_>) -> ProtocolResult<Self> {
        let mut reader = op.expect(tags::MODIFY_REQUEST)?.reader()?;
        let object = reader.read_string()?.to_string();
        let list = reader.read_tagged(Tag::SEQUENCE)?;
        reader.finish()?;

        let mut changes = Vec::new();
        let mut invalid = None;
        for element in list.sequence()? {
            let mut fields = element?.expect(Tag::SEQUENCE)?.reader()?;
            let raw_op = fields.read_enumerated()?;
            let mut modification = fields.read_tagged(Tag::SEQUENCE)?.reader()?;
            fields.finish()?;
            let attr_type = modification.read_string()?.to_string();
            let values = decode_owned_values(modification.read_element()?)?;
            modification.finish()?;

            match ModifyOperation::from_wire(raw_op) {
                Some(operation) => changes.push(Change {
                    operation,
                    attr_type,
                    values,
                }),
                None if invalid.is_none() => invalid = Some(raw_op),
                None => {}
            }
        }
        // Framing errors anywhere in the list win over a bad enumeration.
        if let Some(raw_op) = invalid {
            return Err(ProtocolError::invalid_value(
                "operation",
                format!("unrecognized modify operation {raw_op}"),
            ));
        }
        Ok(Self { object, changes })
    }
}

/// Returns the DN of a `DelRequest ::= [APPLICATION 10] LDAPDN`.
pub fn delete_dn(op: Element<'_>) -> ProtocolResult<&str> {
    Ok(op.expect(tags::DEL_REQUEST)?.as_str()?)
}

/// Returns the message id named by `AbandonRequest ::= [APPLICATION 16] MessageID`.
pub fn abandon_id(op: Element<'_>) -> ProtocolResult<i64> {
    Ok(op.expect(tags::ABANDON_REQUEST)?.as_integer()?)
}

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// baseObject (0)
    Base,
    /// singleLevel (1)
    OneLevel,
    /// wholeSubtree (2)
    Subtree,
}

impl Scope {
    fn from_wire(value: i64) -> Option<Self> {
        match value {
            0 => Some(Scope::Base),
            1 => Some(Scope::OneLevel),
            2 => Some(Scope::Subtree),
            _ => None,
        }
    }

    fn to_wire(self) -> i64 {
        match self {
            Scope::Base => 0,
            Scope::OneLevel => 1,
            Scope::Subtree => 2,
        }
    }
}

/// Alias dereferencing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerefAliases {
    /// neverDerefAliases (0)
    Never,
    /// derefInSearching (1)
    InSearching,
    /// derefFindingBaseObj (2)
    FindingBase,
    /// derefAlways (3)
    Always,
}

impl DerefAliases {
    fn from_wire(value: i64) -> Option<Self> {
        match value {
            0 => Some(DerefAliases::Never),
            1 => Some(DerefAliases::InSearching),
            2 => Some(DerefAliases::FindingBase),
            3 => Some(DerefAliases::Always),
            _ => None,
        }
    }

    fn to_wire(self) -> i64 {
        match self {
            DerefAliases::Never => 0,
            DerefAliases::InSearching => 1,
            DerefAliases::FindingBase => 2,
            DerefAliases::Always => 3,
        }
    }
}

/// `SearchRequest ::= [APPLICATION 3] SEQUENCE { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Base DN, not yet normalized.
    pub base: String,
    /// Scope.
    pub scope: Scope,
    /// Alias dereferencing.
    pub deref: DerefAliases,
    /// Maximum entries; 0 means unlimited.
    pub size_limit: i64,
    /// Seconds; 0 means unlimited.
    pub time_limit: i64,
    /// Return attribute names only.
    pub types_only: bool,
    /// Filter.
    pub filter: Filter,
    /// Requested attributes.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// A subtree search for every entry under `base`.
    pub fn subtree(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            scope: Scope::Subtree,
            deref: DerefAliases::Never,
            size_limit: 0,
            time_limit: 0,
            types_only: false,
            filter: Filter::any_entry(),
            attributes: Vec::new(),
        }
    }

    /// Decodes a search request.
    pub fn decode(op: Element<'_>) -> ProtocolResult<Self> {
        let mut reader = op.expect(tags::SEARCH_REQUEST)?.reader()?;
        let base = reader.read_string()?.to_string();
        let raw_scope = reader.read_enumerated()?;
        let raw_deref = reader.read_enumerated()?;
        let size_limit = reader.read_integer()?;
        let time_limit = reader.read_integer()?;
        let types_only = reader.read_boolean()?;
        let filter = Filter::decode(reader.read_element()?)?;
        let mut attributes = Vec::new();
        for attr in reader.read_tagged(Tag::SEQUENCE)?.sequence()? {
            attributes.push(attr?.expect(Tag::OCTET_STRING)?.as_str()?.to_string());
        }
        reader.finish()?;

        let scope = Scope::from_wire(raw_scope)
            .ok_or_else(|| ProtocolError::invalid_value("scope", raw_scope.to_string()))?;
        let deref = DerefAliases::from_wire(raw_deref)
            .ok_or_else(|| ProtocolError::invalid_value("derefAliases", raw_deref.to_string()))?;
        if !(0..=MAX_INT).contains(&size_limit) {
            return Err(ProtocolError::invalid_value("sizeLimit", size_limit.to_string()));
        }
        if !(0..=MAX_INT).contains(&time_limit) {
            return Err(ProtocolError::invalid_value("timeLimit", time_limit.to_string()));
        }

        Ok(Self {
            base,
            scope,
            deref,
            size_limit,
            time_limit,
            types_only,
            filter,
            attributes,
        })
    }
}

/// Bind authentication choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// `simple [0] OCTET STRING`
    Simple(Vec<u8>),
    /// `sasl [3] SaslCredentials`
    Sasl {
        /// Mechanism name.
        mechanism: String,
        /// Initial credentials.
        credentials: Option<Vec<u8>>,
    },
    /// Any other choice, identified by its tag.
    Unsupported(String),
}

/// `BindRequest ::= [APPLICATION 0] SEQUENCE { version, name, authentication }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    /// Protocol version requested.
    pub version: i64,
    /// Bind DN, not yet normalized.
    pub name: String,
    /// Credentials.
    pub authentication: Authentication,
}

impl BindRequest {
    /// A version 3 simple bind.
    pub fn simple(name: impl Into<String>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            version: 3,
            name: name.into(),
            authentication: Authentication::Simple(password.into()),
        }
    }

    /// Decodes a bind request.
    pub fn decode(op: Element<'_>) -> ProtocolResult<Self> {
        let mut reader = op.expect(tags::BIND_REQUEST)?.reader()?;
        let version = reader.read_integer()?;
        let name = reader.read_string()?.to_string();
        let auth = reader.read_element()?;
        reader.finish()?;

        let authentication = match auth.tag() {
            t if t == SIMPLE_AUTH => Authentication::Simple(auth.as_octets().to_vec()),
            t if t == SASL_AUTH => {
                let mut fields = auth.reader()?;
                let mechanism = fields.read_string()?.to_string();
                let credentials = fields
                    .read_optional(Tag::OCTET_STRING)?
                    .map(|c| c.as_octets().to_vec());
                fields.finish()?;
                Authentication::Sasl {
                    mechanism,
                    credentials,
                }
            }
            other => Authentication::Unsupported(other.to_string()),
        };

        Ok(Self {
            version,
            name,
            authentication,
        })
    }
}

/// An owned request, used to produce frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Add an entry.
    Add {
        /// Entry DN.
        name: String,
        /// `(type, values)` pairs in order.
        attributes: Vec<(String, Vec<Vec<u8>>)>,
    },
    /// Modify an entry.
    Modify(ModifyRequest),
    /// Delete an entry.
    Delete(String),
    /// Search.
    Search(SearchRequest),
    /// Bind.
    Bind(BindRequest),
    /// Unbind.
    Unbind,
    /// Abandon the given message id.
    Abandon(i64),
    /// Rename an entry.
    ModifyDn {
        /// Entry DN.
        entry: String,
        /// New RDN.
        new_rdn: String,
        /// Remove the old RDN values.
        delete_old_rdn: bool,
        /// New parent.
        new_superior: Option<String>,
    },
    /// Compare an attribute value.
    Compare {
        /// Entry DN.
        entry: String,
        /// Assertion.
        assertion: AttributeValueAssertion,
    },
    /// Extended operation.
    Extended {
        /// Request OID.
        oid: String,
        /// Request value.
        value: Option<Vec<u8>>,
    },
}

impl Request {
    /// Encodes the request as a complete LDAPMessage frame.
    pub fn encode(&self, message_id: i64, controls: &[Control]) -> Vec<u8> {
        encode_message(message_id, controls, |w| self.encode_op(w))
    }

    fn encode_op(&self, w: &mut BerWriter) {
        match self {
            Request::Add { name, attributes } => {
                w.write_constructed(tags::ADD_REQUEST, |w| {
                    w.write_octet_string(name.as_bytes());
                    w.write_sequence(|w| {
                        for (attr_type, values) in attributes {
                            encode_attribute(w, attr_type, values);
                        }
                    });
                });
            }
            Request::Modify(request) => {
                w.write_constructed(tags::MODIFY_REQUEST, |w| {
                    w.write_octet_string(request.object.as_bytes());
                    w.write_sequence(|w| {
                        for change in &request.changes {
                            w.write_sequence(|w| {
                                w.write_enumerated(change.operation.to_wire());
                                encode_attribute(w, &change.attr_type, &change.values);
                            });
                        }
                    });
                });
            }
            Request::Delete(dn) => w.write_primitive(tags::DEL_REQUEST, dn.as_bytes()),
            Request::Search(request) => {
                w.write_constructed(tags::SEARCH_REQUEST, |w| {
                    w.write_octet_string(request.base.as_bytes());
                    w.write_enumerated(request.scope.to_wire());
                    w.write_enumerated(request.deref.to_wire());
                    w.write_integer(request.size_limit);
                    w.write_integer(request.time_limit);
                    w.write_boolean(request.types_only);
                    request.filter.encode(w);
                    w.write_sequence(|w| {
                        for attr in &request.attributes {
                            w.write_octet_string(attr.as_bytes());
                        }
                    });
                });
            }
            Request::Bind(request) => {
                w.write_constructed(tags::BIND_REQUEST, |w| {
                    w.write_integer(request.version);
                    w.write_octet_string(request.name.as_bytes());
                    match &request.authentication {
                        Authentication::Simple(password) => w.write_primitive(SIMPLE_AUTH, password),
                        Authentication::Sasl {
                            mechanism,
                            credentials,
                        } => w.write_constructed(SASL_AUTH, |w| {
                            w.write_octet_string(mechanism.as_bytes());
                            if let Some(credentials) = credentials {
                                w.write_octet_string(credentials);
                            }
                        }),
                        // Encoded as an unassigned context choice.
                        Authentication::Unsupported(_) => w.write_null(Tag::context(9, false)),
                    }
                });
            }
            Request::Unbind => w.write_null(tags::UNBIND_REQUEST),
            Request::Abandon(id) => w.write_tagged_integer(tags::ABANDON_REQUEST, *id),
            Request::ModifyDn {
                entry,
                new_rdn,
                delete_old_rdn,
                new_superior,
            } => {
                w.write_constructed(tags::MODDN_REQUEST, |w| {
                    w.write_octet_string(entry.as_bytes());
                    w.write_octet_string(new_rdn.as_bytes());
                    w.write_boolean(*delete_old_rdn);
                    if let Some(superior) = new_superior {
                        w.write_primitive(NEW_SUPERIOR, superior.as_bytes());
                    }
                });
            }
            Request::Compare { entry, assertion } => {
                w.write_constructed(tags::COMPARE_REQUEST, |w| {
                    w.write_octet_string(entry.as_bytes());
                    w.write_sequence(|w| {
                        w.write_octet_string(assertion.attr_type.as_bytes());
                        w.write_octet_string(&assertion.value);
                    });
                });
            }
            Request::Extended { oid, value } => {
                w.write_constructed(tags::EXTENDED_REQUEST, |w| {
                    w.write_primitive(EXTENDED_NAME, oid.as_bytes());
                    if let Some(value) = value {
                        w.write_primitive(EXTENDED_VALUE, value);
                    }
                });
            }
        }
    }
}

fn encode_attribute<V: AsRef<[u8]>>(w: &mut BerWriter, attr_type: &str, values: &[V]) {
    w.write_sequence(|w| {
        w.write_octet_string(attr_type.as_bytes());
        w.write_constructed(Tag::SET, |w| {
            for value in values {
                w.write_octet_string(value.as_ref());
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{LdapMessage, OperationKind};

    fn add_request(attributes: Vec<(&str, Vec<&str>)>) -> Vec<u8> {
        Request::Add {
            name: "cn=foo,dc=example,dc=com".into(),
            attributes: attributes
                .into_iter()
                .map(|(t, vs)| (t.to_string(), vs.into_iter().map(|v| v.as_bytes().to_vec()).collect()))
                .collect(),
        }
        .encode(1, &[])
    }

    #[test]
    fn add_attributes_walk_lazily() {
        let frame = add_request(vec![("objectClass", vec!["person", "top"]), ("cn", vec!["foo"])]);
        let message = LdapMessage::decode(&frame).unwrap();
        assert_eq!(message.kind, OperationKind::Add);

        let request = AddRequest::decode(message.op).unwrap();
        assert_eq!(request.name, "cn=foo,dc=example,dc=com");

        let mut attrs = request.attributes().unwrap();
        let first = attrs.next().unwrap().unwrap();
        assert_eq!(first.attr_type, "objectClass");
        assert_eq!(first.values, vec![&b"person"[..], &b"top"[..]]);
        let second = attrs.next().unwrap().unwrap();
        assert_eq!(second.attr_type, "cn");
        assert!(attrs.next().is_none());
    }

    #[test]
    fn add_with_empty_attribute_list_decodes() {
        let frame = add_request(vec![]);
        let message = LdapMessage::decode(&frame).unwrap();
        let request = AddRequest::decode(message.op).unwrap();
        assert_eq!(request.attributes().unwrap().count(), 0);
    }

    #[test]
    fn malformed_attribute_ends_iteration() {
        // attributes: SEQUENCE { SEQUENCE { OCTET STRING "cn", INTEGER 1 } }
        let mut w = BerWriter::new();
        w.write_constructed(tags::ADD_REQUEST, |w| {
            w.write_octet_string(b"dc=example,dc=com");
            w.write_sequence(|w| {
                w.write_sequence(|w| {
                    w.write_octet_string(b"cn");
                    w.write_integer(1);
                });
                encode_attribute(w, "sn", &[b"x"]);
            });
        });
        let bytes = w.into_bytes();
        let op = dirsrv_codec::BerReader::new(&bytes).read_element().unwrap();
        let mut attrs = AddRequest::decode(op).unwrap().attributes().unwrap();
        assert!(attrs.next().unwrap().unwrap_err().is_framing());
        assert!(attrs.next().is_none());
    }

    #[test]
    fn modify_request_decodes() {
        let request = ModifyRequest {
            object: "cn=foo,dc=example,dc=com".into(),
            changes: vec![
                Change::new(ModifyOperation::Replace, "sn", vec![b"bar".to_vec()]),
                Change::new(ModifyOperation::Delete, "mail", vec![]),
            ],
        };
        let frame = Request::Modify(request.clone()).encode(4, &[]);
        let message = LdapMessage::decode(&frame).unwrap();
        assert_eq!(ModifyRequest::decode(message.op).unwrap(), request);
    }

    #[test]
    fn unknown_modify_operation_is_operation_error() {
        let mut w = BerWriter::new();
        w.write_constructed(tags::MODIFY_REQUEST, |w| {
            w.write_octet_string(b"cn=foo");
            w.write_sequence(|w| {
                w.write_sequence(|w| {
                    w.write_enumerated(7);
                    encode_attribute(w, "sn", &[b"x"]);
                });
            });
        });
        let bytes = w.into_bytes();
        let op = dirsrv_codec::BerReader::new(&bytes).read_element().unwrap();
        let err = ModifyRequest::decode(op).unwrap_err();
        assert!(!err.is_framing());
        assert!(err.to_string().contains("unrecognized modify operation"));
    }

    #[test]
    fn delete_and_abandon() {
        let frame = Request::Delete("cn=foo,dc=example,dc=com".into()).encode(2, &[]);
        let message = LdapMessage::decode(&frame).unwrap();
        assert_eq!(delete_dn(message.op).unwrap(), "cn=foo,dc=example,dc=com");

        let frame = Request::Abandon(9).encode(3, &[]);
        let message = LdapMessage::decode(&frame).unwrap();
        assert_eq!(message.kind, OperationKind::Abandon);
        assert_eq!(abandon_id(message.op).unwrap(), 9);
    }

    #[test]
    fn search_request_decodes() {
        let mut request = SearchRequest::subtree("dc=example,dc=com");
        request.size_limit = 5;
        request.attributes = vec!["cn".into(), "+".into()];
        request.filter = Filter::equality("cn", "foo");
        let frame = Request::Search(request.clone()).encode(7, &[]);
        let message = LdapMessage::decode(&frame).unwrap();
        assert_eq!(SearchRequest::decode(message.op).unwrap(), request);
    }

    #[test]
    fn bad_scope_is_operation_error() {
        let mut w = BerWriter::new();
        w.write_constructed(tags::SEARCH_REQUEST, |w| {
            w.write_octet_string(b"");
            w.write_enumerated(5);
            w.write_enumerated(0);
            w.write_integer(0);
            w.write_integer(0);
            w.write_boolean(false);
            Filter::any_entry().encode(w);
            w.write_sequence(|_| {});
        });
        let bytes = w.into_bytes();
        let op = dirsrv_codec::BerReader::new(&bytes).read_element().unwrap();
        assert!(!SearchRequest::decode(op).unwrap_err().is_framing());
    }

    #[test]
    fn limits_above_max_int_are_rejected() {
        for (size_limit, time_limit) in [(MAX_INT + 1, 0), (0, MAX_INT + 1), (0, i64::MAX)] {
            let mut request = SearchRequest::subtree("dc=example,dc=com");
            request.size_limit = size_limit;
            request.time_limit = time_limit;
            let frame = Request::Search(request).encode(1, &[]);
            let message = LdapMessage::decode(&frame).unwrap();
            let err = SearchRequest::decode(message.op).unwrap_err();
            assert!(!err.is_framing(), "{err:?}");
        }

        let mut request = SearchRequest::subtree("dc=example,dc=com");
        request.time_limit = MAX_INT;
        let frame = Request::Search(request).encode(1, &[]);
        let message = LdapMessage::decode(&frame).unwrap();
        assert_eq!(SearchRequest::decode(message.op).unwrap().time_limit, MAX_INT);
    }

    #[test]
    fn bind_requests_decode() {
        let simple = BindRequest::simple("cn=admin,dc=example,dc=com", "secret");
        let frame = Request::Bind(simple.clone()).encode(1, &[]);
        let message = LdapMessage::decode(&frame).unwrap();
        assert_eq!(BindRequest::decode(message.op).unwrap(), simple);

        let sasl = BindRequest {
            version: 3,
            name: String::new(),
            authentication: Authentication::Sasl {
                mechanism: "EXTERNAL".into(),
                credentials: None,
            },
        };
        let frame = Request::Bind(sasl.clone()).encode(1, &[]);
        let message = LdapMessage::decode(&frame).unwrap();
        assert_eq!(BindRequest::decode(message.op).unwrap(), sasl);
    }
}
