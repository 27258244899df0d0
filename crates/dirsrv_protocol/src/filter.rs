//! Search filters.

use crate::error::ProtocolResult;
use dirsrv_codec::{BerReader, BerWriter, CodecError, Element, Tag};

/// Nesting limit for `and`/`or`/`not`.
pub const MAX_FILTER_DEPTH: usize = 32;

mod tags {
    use dirsrv_codec::Tag;

    pub const AND: Tag = Tag::context(0, true);
    pub const OR: Tag = Tag::context(1, true);
    pub const NOT: Tag = Tag::context(2, true);
    pub const EQUALITY: Tag = Tag::context(3, true);
    pub const SUBSTRINGS: Tag = Tag::context(4, true);
    pub const GREATER_OR_EQUAL: Tag = Tag::context(5, true);
    pub const LESS_OR_EQUAL: Tag = Tag::context(6, true);
    pub const PRESENT: Tag = Tag::context(7, false);
    pub const APPROX: Tag = Tag::context(8, true);
    pub const EXTENSIBLE: Tag = Tag::context(9, true);

    pub const SUB_INITIAL: Tag = Tag::context(0, false);
    pub const SUB_ANY: Tag = Tag::context(1, false);
    pub const SUB_FINAL: Tag = Tag::context(2, false);

    pub const MR_RULE: Tag = Tag::context(1, false);
    pub const MR_TYPE: Tag = Tag::context(2, false);
    pub const MR_VALUE: Tag = Tag::context(3, false);
    pub const MR_DN_ATTRIBUTES: Tag = Tag::context(4, false);
}

/// A decoded search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All sub-filters match.
    And(Vec<Filter>),
    /// Any sub-filter matches.
    Or(Vec<Filter>),
    /// The sub-filter does not match.
    Not(Box<Filter>),
    /// `(type=value)`
    Equality(AttributeValueAssertion),
    /// `(type=initial*any*final)`
    Substrings(SubstringFilter),
    /// `(type>=value)`
    GreaterOrEqual(AttributeValueAssertion),
    /// `(type<=value)`
    LessOrEqual(AttributeValueAssertion),
    /// `(type=*)`
    Present(String),
    /// `(type~=value)`
    Approx(AttributeValueAssertion),
    /// `(type:rule:=value)`
    Extensible(MatchingRuleAssertion),
}

/// Attribute description and assertion value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValueAssertion {
    /// Attribute description.
    pub attr_type: String,
    /// Asserted value.
    pub value: Vec<u8>,
}

/// The components of a substring filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubstringFilter {
    /// Attribute description.
    pub attr_type: String,
    /// Leading fragment.
    pub initial: Option<Vec<u8>>,
    /// Fragments that must appear in order.
    pub any: Vec<Vec<u8>>,
    /// Trailing fragment.
    pub final_: Option<Vec<u8>>,
}

/// An extensible match assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingRuleAssertion {
    /// Matching rule OID or name.
    pub matching_rule: Option<String>,
    /// Attribute description.
    pub attr_type: Option<String>,
    /// Asserted value.
    pub value: Vec<u8>,
    /// Match against DN attributes too.
    pub dn_attributes: bool,
}

impl Filter {
    /// Convenience constructor for `(type=value)`.
    pub fn equality(attr_type: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Filter::Equality(AttributeValueAssertion {
            attr_type: attr_type.into(),
            value: value.into(),
        })
    }

    /// Convenience constructor for `(type=*)`.
    pub fn present(attr_type: impl Into<String>) -> Self {
        Filter::Present(attr_type.into())
    }

    /// `(objectClass=*)`, the filter matching every entry.
    pub fn any_entry() -> Self {
        Filter::present("objectClass")
    }

    /// Decodes a filter element.
    pub fn decode(element: Element<'_>) -> ProtocolResult<Self> {
        decode_filter(element, 0)
    }

    /// Encodes the filter.
    pub fn encode(&self, w: &mut BerWriter) {
        match self {
            Filter::And(items) => w.write_constructed(tags::AND, |w| {
                items.iter().for_each(|f| f.encode(w));
            }),
            Filter::Or(items) => w.write_constructed(tags::OR, |w| {
                items.iter().for_each(|f| f.encode(w));
            }),
            Filter::Not(inner) => w.write_constructed(tags::NOT, |w| inner.encode(w)),
            Filter::Equality(ava) => encode_ava(w, tags::EQUALITY, ava),
            Filter::GreaterOrEqual(ava) => encode_ava(w, tags::GREATER_OR_EQUAL, ava),
            Filter::LessOrEqual(ava) => encode_ava(w, tags::LESS_OR_EQUAL, ava),
            Filter::Approx(ava) => encode_ava(w, tags::APPROX, ava),
            Filter::Present(attr) => w.write_primitive(tags::PRESENT, attr.as_bytes()),
            Filter::Substrings(sub) => w.write_constructed(tags::SUBSTRINGS, |w| {
                w.write_octet_string(sub.attr_type.as_bytes());
                w.write_sequence(|w| {
                    if let Some(ref initial) = sub.initial {
                        w.write_primitive(tags::SUB_INITIAL, initial);
                    }
                    for any in &sub.any {
                        w.write_primitive(tags::SUB_ANY, any);
                    }
                    if let Some(ref final_) = sub.final_ {
                        w.write_primitive(tags::SUB_FINAL, final_);
                    }
                });
            }),
            Filter::Extensible(mra) => w.write_constructed(tags::EXTENSIBLE, |w| {
                if let Some(ref rule) = mra.matching_rule {
                    w.write_primitive(tags::MR_RULE, rule.as_bytes());
                }
                if let Some(ref attr) = mra.attr_type {
                    w.write_primitive(tags::MR_TYPE, attr.as_bytes());
                }
                w.write_primitive(tags::MR_VALUE, &mra.value);
                if mra.dn_attributes {
                    w.write_primitive(tags::MR_DN_ATTRIBUTES, &[0xff]);
                }
            }),
        }
    }
}

fn encode_ava(w: &mut BerWriter, tag: Tag, ava: &AttributeValueAssertion) {
    w.write_constructed(tag, |w| {
        w.write_octet_string(ava.attr_type.as_bytes());
        w.write_octet_string(&ava.value);
    });
}

fn decode_filter(element: Element<'_>, depth: usize) -> ProtocolResult<Filter> {
    if depth > MAX_FILTER_DEPTH {
        return Err(CodecError::invalid_structure("filter nested too deeply").into());
    }

    let tag = element.tag();
    let filter = match tag {
        t if t == tags::AND || t == tags::OR => {
            let mut items = Vec::new();
            for child in element.sequence()? {
                items.push(decode_filter(child?, depth + 1)?);
            }
            if t == tags::AND {
                Filter::And(items)
            } else {
                Filter::Or(items)
            }
        }
        t if t == tags::NOT => {
            let mut reader = element.reader()?;
            let inner = decode_filter(reader.read_element()?, depth + 1)?;
            reader.finish()?;
            Filter::Not(Box::new(inner))
        }
        t if t == tags::EQUALITY => Filter::Equality(decode_ava(element)?),
        t if t == tags::GREATER_OR_EQUAL => Filter::GreaterOrEqual(decode_ava(element)?),
        t if t == tags::LESS_OR_EQUAL => Filter::LessOrEqual(decode_ava(element)?),
        t if t == tags::APPROX => Filter::Approx(decode_ava(element)?),
        t if t == tags::PRESENT => Filter::Present(element.as_str()?.to_string()),
        t if t == tags::SUBSTRINGS => Filter::Substrings(decode_substrings(element)?),
        t if t == tags::EXTENSIBLE => Filter::Extensible(decode_extensible(element)?),
        other => {
            return Err(CodecError::invalid_tag(format!("{other} is not a filter choice")).into())
        }
    };
    Ok(filter)
}

fn decode_ava(element: Element<'_>) -> ProtocolResult<AttributeValueAssertion> {
    let mut reader = element.reader()?;
    let attr_type = reader.read_string()?.to_string();
    let value = reader.read_octet_string()?.to_vec();
    reader.finish()?;
    Ok(AttributeValueAssertion { attr_type, value })
}

fn decode_substrings(element: Element<'_>) -> ProtocolResult<SubstringFilter> {
    let mut reader = element.reader()?;
    let mut sub = SubstringFilter {
        attr_type: reader.read_string()?.to_string(),
        ..SubstringFilter::default()
    };
    let fragments = reader.read_tagged(Tag::SEQUENCE)?;
    reader.finish()?;

    for fragment in fragments.sequence()? {
        let fragment = fragment?;
        let value = fragment.as_octets().to_vec();
        match fragment.tag() {
            t if t == tags::SUB_INITIAL && sub.initial.is_none() && sub.any.is_empty() => {
                sub.initial = Some(value);
            }
            t if t == tags::SUB_ANY && sub.final_.is_none() => sub.any.push(value),
            t if t == tags::SUB_FINAL && sub.final_.is_none() => sub.final_ = Some(value),
            other => {
                return Err(CodecError::invalid_structure(format!(
                    "unexpected substring component {other}"
                ))
                .into())
            }
        }
    }
    if sub.initial.is_none() && sub.any.is_empty() && sub.final_.is_none() {
        return Err(CodecError::invalid_structure("empty substring filter").into());
    }
    Ok(sub)
}

fn decode_extensible(element: Element<'_>) -> ProtocolResult<MatchingRuleAssertion> {
    let mut reader: BerReader<'_> = element.reader()?;
    let matching_rule = reader
        .read_optional(tags::MR_RULE)?
        .map(|e| e.as_str().map(str::to_string))
        .transpose()?;
    let attr_type = reader
        .read_optional(tags::MR_TYPE)?
        .map(|e| e.as_str().map(str::to_string))
        .transpose()?;
    let value = reader.read_tagged(tags::MR_VALUE)?.as_octets().to_vec();
    let dn_attributes = match reader.read_optional(tags::MR_DN_ATTRIBUTES)? {
        Some(flag) => flag.as_boolean()?,
        None => false,
    };
    reader.finish()?;
    Ok(MatchingRuleAssertion {
        matching_rule,
        attr_type,
        value,
        dn_attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(filter: &Filter) -> Filter {
        let mut w = BerWriter::new();
        filter.encode(&mut w);
        let bytes = w.into_bytes();
        Filter::decode(BerReader::new(&bytes).read_element().unwrap()).unwrap()
    }

    #[test]
    fn present_is_primitive() {
        let mut w = BerWriter::new();
        Filter::any_entry().encode(&mut w);
        assert_eq!(w.as_bytes()[0], 0x87);
        assert_eq!(&w.as_bytes()[2..], b"objectClass");
    }

    #[test]
    fn nested_filter_decodes() {
        let filter = Filter::And(vec![
            Filter::equality("cn", "foo"),
            Filter::Not(Box::new(Filter::present("mail"))),
            Filter::Substrings(SubstringFilter {
                attr_type: "sn".into(),
                initial: Some(b"sm".to_vec()),
                any: vec![b"i".to_vec()],
                final_: Some(b"h".to_vec()),
            }),
            Filter::Extensible(MatchingRuleAssertion {
                matching_rule: Some("2.5.13.2".into()),
                attr_type: None,
                value: b"x".to_vec(),
                dn_attributes: true,
            }),
        ]);
        assert_eq!(roundtrip(&filter), filter);
    }

    #[test]
    fn deep_nesting_rejected() {
        let mut filter = Filter::any_entry();
        for _ in 0..=MAX_FILTER_DEPTH + 1 {
            filter = Filter::Not(Box::new(filter));
        }
        let mut w = BerWriter::new();
        filter.encode(&mut w);
        let bytes = w.into_bytes();
        let err = Filter::decode(BerReader::new(&bytes).read_element().unwrap()).unwrap_err();
        assert!(err.is_framing());
    }

    #[test]
    fn substring_order_enforced() {
        // SUBSTRINGS { "cn", SEQUENCE { final "a", initial "b" } }
        let mut w = BerWriter::new();
        w.write_constructed(tags::SUBSTRINGS, |w| {
            w.write_octet_string(b"cn");
            w.write_sequence(|w| {
                w.write_primitive(tags::SUB_FINAL, b"a");
                w.write_primitive(tags::SUB_INITIAL, b"b");
            });
        });
        let bytes = w.into_bytes();
        assert!(Filter::decode(BerReader::new(&bytes).read_element().unwrap()).is_err());
    }

    #[test]
    fn unknown_choice_rejected() {
        let bytes = [0x8a, 0x00];
        assert!(Filter::decode(BerReader::new(&bytes).read_element().unwrap()).is_err());
    }
}
