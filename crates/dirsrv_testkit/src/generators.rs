//! Property-based test generators using proptest.
//!
//! Provides strategies for generating DNs, attributes and requests.
//! Generated DNs are always syntactically valid.

use dirsrv_protocol::{ModifyOperation, Request, SearchRequest};
use proptest::prelude::*;

use crate::builders::{add_request, bind, delete, modify};
use crate::fixtures::SUFFIX;

/// Strategy for attribute type descriptors.
pub fn attr_type_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9-]{0,15}").expect("Invalid regex")
}

/// Strategy for printable attribute values without leading or trailing
/// spaces.
pub fn attr_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9]([a-zA-Z0-9 .@-]{0,14}[a-zA-Z0-9])?")
        .expect("Invalid regex")
}

/// Strategy for arbitrary binary values.
pub fn binary_value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for one `type=value` RDN.
pub fn rdn_strategy() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["cn", "ou", "uid", "o", "CN", "Uid"]),
        attr_value_strategy(),
    )
        .prop_map(|(t, v)| format!("{t}={v}"))
}

/// Strategy for DNs under the fixture suffix.
pub fn dn_under_suffix_strategy() -> impl Strategy<Value = String> {
    rdn_strategy().prop_map(|rdn| format!("{rdn},{SUFFIX}"))
}

/// Strategy for DNs of one to four RDNs.
pub fn dn_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(rdn_strategy(), 1..5).prop_map(|rdns| rdns.join(","))
}

/// Strategy for add requests under the fixture suffix.
///
/// Attribute types may repeat and value sets may be empty, so some
/// requests are rejected.
pub fn add_request_strategy() -> impl Strategy<Value = Request> {
    (
        dn_under_suffix_strategy(),
        prop::collection::vec(
            (attr_type_strategy(), prop::collection::vec(attr_value_strategy(), 0..3)),
            0..5,
        ),
    )
        .prop_map(|(dn, attrs)| {
            let borrowed: Vec<(&str, Vec<&str>)> = attrs
                .iter()
                .map(|(t, vs)| (t.as_str(), vs.iter().map(String::as_str).collect()))
                .collect();
            let pairs: Vec<(&str, &[&str])> =
                borrowed.iter().map(|(t, vs)| (*t, vs.as_slice())).collect();
            add_request(&dn, &pairs)
        })
}

/// Strategy for modify operations.
pub fn modify_operation_strategy() -> impl Strategy<Value = ModifyOperation> {
    prop_oneof![
        Just(ModifyOperation::Add),
        Just(ModifyOperation::Delete),
        Just(ModifyOperation::Replace),
    ]
}

/// Strategy for requests of every kind the server handles.
pub fn request_strategy() -> impl Strategy<Value = Request> {
    prop_oneof![
        add_request_strategy(),
        (
            dn_under_suffix_strategy(),
            modify_operation_strategy(),
            attr_type_strategy(),
            prop::collection::vec(attr_value_strategy(), 0..3),
        )
            .prop_map(|(dn, op, t, vs)| {
                let values: Vec<&str> = vs.iter().map(String::as_str).collect();
                modify(&dn, op, &t, &values)
            }),
        dn_under_suffix_strategy().prop_map(|dn| delete(&dn)),
        (dn_strategy(), 0i64..4).prop_map(|(base, size_limit)| {
            let mut request = SearchRequest::subtree(base);
            request.size_limit = size_limit;
            Request::Search(request)
        }),
        (dn_under_suffix_strategy(), attr_value_strategy()).prop_map(|(dn, pw)| bind(&dn, &pw)),
        (0i64..100).prop_map(Request::Abandon),
    ]
}

/// Strategy for byte strings that start like a frame.
pub fn frame_like_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..48).prop_map(|mut bytes| {
        bytes.insert(0, 0x30);
        bytes
    })
}
