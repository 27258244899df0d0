//! Filter evaluation against entries.
//!
//! Evaluation is three-valued: a component that cannot be evaluated (an
//! extensible match, for instance) is undefined, and an entry is returned
//! only when the whole filter is true.

use crate::attribute::normalize_value;
use crate::entry::Entry;
use dirsrv_protocol::filter::{AttributeValueAssertion, SubstringFilter};
use dirsrv_protocol::Filter;
use std::cmp::Ordering;

/// True if `entry` matches `filter`.
pub fn matches(filter: &Filter, entry: &Entry) -> bool {
    evaluate(filter, entry) == Some(true)
}

/// Evaluates a filter; `None` means undefined.
pub fn evaluate(filter: &Filter, entry: &Entry) -> Option<bool> {
    match filter {
        Filter::And(items) => {
            let mut result = Some(true);
            for item in items {
                match evaluate(item, entry) {
                    Some(false) => return Some(false),
                    None => result = None,
                    Some(true) => {}
                }
            }
            result
        }
        Filter::Or(items) => {
            let mut result = Some(false);
            for item in items {
                match evaluate(item, entry) {
                    Some(true) => return Some(true),
                    None => result = None,
                    Some(false) => {}
                }
            }
            result
        }
        Filter::Not(inner) => evaluate(inner, entry).map(|r| !r),
        Filter::Present(attr_type) => Some(entry.has(attr_type)),
        Filter::Equality(ava) | Filter::Approx(ava) => {
            compare(entry, ava, |ordering| ordering == Ordering::Equal)
        }
        Filter::GreaterOrEqual(ava) => compare(entry, ava, |ordering| ordering != Ordering::Less),
        Filter::LessOrEqual(ava) => compare(entry, ava, |ordering| ordering != Ordering::Greater),
        Filter::Substrings(sub) => Some(substrings(entry, sub)),
        Filter::Extensible(_) => None,
    }
}

fn compare(
    entry: &Entry,
    ava: &AttributeValueAssertion,
    accept: impl Fn(Ordering) -> bool,
) -> Option<bool> {
    let Some(attr) = entry.get(&ava.attr_type) else {
        return Some(false);
    };
    let asserted = normalize_value(&ava.value);
    Some(
        attr.values()
            .iter()
            .any(|v| accept((*normalize_value(v)).cmp(&*asserted))),
    )
}

fn substrings(entry: &Entry, sub: &SubstringFilter) -> bool {
    let Some(attr) = entry.get(&sub.attr_type) else {
        return false;
    };
    let initial = sub.initial.as_deref().map(normalize_value);
    let any: Vec<_> = sub.any.iter().map(|a| normalize_value(a)).collect();
    let final_ = sub.final_.as_deref().map(normalize_value);

    attr.values().iter().any(|value| {
        let value = normalize_value(value);
        let mut rest: &[u8] = value.as_ref();
        if let Some(ref initial) = initial {
            match rest.strip_prefix(&**initial) {
                Some(tail) => rest = tail,
                None => return false,
            }
        }
        for fragment in &any {
            match find(rest, fragment) {
                Some(at) => rest = &rest[at + fragment.len()..],
                None => return false,
            }
        }
        match final_ {
            Some(ref final_) => rest.ends_with(&**final_),
            None => true,
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::modification::Modification;
    use dirsrv_protocol::filter::MatchingRuleAssertion;

    fn entry() -> Entry {
        Entry::from_modifications(
            Dn::parse("cn=John Smith,dc=example,dc=com").unwrap(),
            vec![
                Modification::add("objectClass", vec![b"person".to_vec()]),
                Modification::add("cn", vec![b"John Smith".to_vec()]),
                Modification::add("uidNumber", vec![b"1005".to_vec()]),
            ],
        )
        .unwrap()
    }

    fn substring(initial: Option<&str>, any: &[&str], final_: Option<&str>) -> Filter {
        Filter::Substrings(SubstringFilter {
            attr_type: "cn".into(),
            initial: initial.map(|s| s.as_bytes().to_vec()),
            any: any.iter().map(|s| s.as_bytes().to_vec()).collect(),
            final_: final_.map(|s| s.as_bytes().to_vec()),
        })
    }

    #[test]
    fn equality_and_presence() {
        let e = entry();
        assert!(matches(&Filter::equality("CN", "john  SMITH"), &e));
        assert!(!matches(&Filter::equality("cn", "jane"), &e));
        assert!(matches(&Filter::any_entry(), &e));
        assert!(!matches(&Filter::present("mail"), &e));
    }

    #[test]
    fn substring_matching() {
        let e = entry();
        assert!(matches(&substring(Some("jo"), &["n s"], Some("th")), &e));
        assert!(matches(&substring(None, &["smi"], None), &e));
        assert!(!matches(&substring(Some("smith"), &[], None), &e));
        assert!(!matches(&substring(Some("john"), &["x"], None), &e));
    }

    #[test]
    fn ordering_matches() {
        let e = entry();
        let ge = Filter::GreaterOrEqual(AttributeValueAssertion {
            attr_type: "uidNumber".into(),
            value: b"1000".to_vec(),
        });
        let le = Filter::LessOrEqual(AttributeValueAssertion {
            attr_type: "uidNumber".into(),
            value: b"1000".to_vec(),
        });
        assert!(matches(&ge, &e));
        assert!(!matches(&le, &e));
    }

    #[test]
    fn undefined_propagates() {
        let e = entry();
        let extensible = Filter::Extensible(MatchingRuleAssertion {
            matching_rule: None,
            attr_type: Some("cn".into()),
            value: b"x".to_vec(),
            dn_attributes: false,
        });
        assert_eq!(evaluate(&extensible, &e), None);
        assert_eq!(evaluate(&Filter::Not(Box::new(extensible.clone())), &e), None);
        assert!(!matches(&Filter::Not(Box::new(extensible.clone())), &e));
        assert!(matches(
            &Filter::Or(vec![extensible.clone(), Filter::any_entry()]),
            &e
        ));
        assert_eq!(
            evaluate(&Filter::And(vec![extensible, Filter::any_entry()]), &e),
            None
        );
        assert!(matches(&Filter::And(vec![]), &e));
        assert!(!matches(&Filter::Or(vec![]), &e));
    }
}
