//! Request and entry builders.

use dirsrv_core::{Dn, Entry, Modification};
use dirsrv_protocol::{BindRequest, Change, ModifyOperation, ModifyRequest, Request, SearchRequest};

/// Builds an entry with one value per attribute.
pub fn entry(dn: &str, attrs: &[(&str, &str)]) -> Entry {
    let mods = attrs
        .iter()
        .map(|(t, v)| Modification::add(*t, vec![v.as_bytes().to_vec()]))
        .collect();
    Entry::from_modifications(Dn::parse(dn).expect("Invalid DN"), mods)
        .expect("Invalid fixture entry")
}

/// An add request with the given attributes.
pub fn add_request(dn: &str, attrs: &[(&str, &[&str])]) -> Request {
    Request::Add {
        name: dn.to_string(),
        attributes: attrs
            .iter()
            .map(|(t, vs)| (t.to_string(), vs.iter().map(|v| v.as_bytes().to_vec()).collect()))
            .collect(),
    }
}

/// An add request for a `person` named by the first RDN value of `dn`.
pub fn add_person(dn: &str) -> Request {
    let cn = dn
        .split(',')
        .next()
        .and_then(|rdn| rdn.split_once('='))
        .map_or("unnamed", |(_, v)| v);
    add_request(dn, &[("objectClass", &["person"]), ("cn", &[cn]), ("sn", &["Test"])])
}

/// A modify request with one change.
pub fn modify(dn: &str, op: ModifyOperation, attr_type: &str, values: &[&str]) -> Request {
    Request::Modify(ModifyRequest {
        object: dn.to_string(),
        changes: vec![Change::new(
            op,
            attr_type,
            values.iter().map(|v| v.as_bytes().to_vec()).collect(),
        )],
    })
}

/// A delete request.
pub fn delete(dn: &str) -> Request {
    Request::Delete(dn.to_string())
}

/// A simple bind request.
pub fn bind(dn: &str, password: &str) -> Request {
    Request::Bind(BindRequest::simple(dn, password.as_bytes()))
}

/// A subtree search with an optional size limit.
pub fn search_subtree(base: &str, size_limit: i64) -> Request {
    let mut request = SearchRequest::subtree(base);
    request.size_limit = size_limit;
    Request::Search(request)
}
