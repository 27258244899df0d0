//! Distinguished names.
//!
//! A [`Dn`] keeps the string the client sent next to a canonical form.
//! Every namespace comparison uses the canonical form.
//!
//! Normalization follows the RFC 4514 string grammar without schema:
//!
//! - RDNs are separated by unescaped `,` (or the legacy `;`), AVAs by `+`
//! - attribute types are descriptors or numeric OIDs, lowercased
//! - values are unescaped, unquoted, case-folded and have runs of
//!   whitespace collapsed; `#hex` values are kept as lowercase hex
//! - AVAs of a multi-valued RDN are sorted
//!
//! The output escapes every special character, so normalizing a
//! normalized DN returns it unchanged.

use crate::error::DnError;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One `type=value` assertion of an RDN, in normalized form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ava {
    attr_type: String,
    value: String,
    hex: bool,
}

impl Ava {
    /// Lowercased attribute type.
    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    /// Folded value, or `#hex` for BER encoded values.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True for `#hex` values.
    pub fn is_hex(&self) -> bool {
        self.hex
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&self.attr_type);
        out.push('=');
        if self.hex {
            out.push_str(&self.value);
        } else {
            escape_value(&self.value, out);
        }
    }
}

type Rdn = Vec<Ava>;

/// A parsed distinguished name.
///
/// Equality, ordering and hashing use the normalized form only.
#[derive(Debug, Clone)]
pub struct Dn {
    raw: String,
    normalized: String,
    rdns: Vec<Rdn>,
}

impl Dn {
    /// Parses and normalizes a DN.
    pub fn parse(raw: &str) -> Result<Self, DnError> {
        let rdns = parse_rdns(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            normalized: render(&rdns),
            rdns,
        })
    }

    /// The root DN (empty string).
    pub fn root() -> Self {
        Self {
            raw: String::new(),
            normalized: String::new(),
            rdns: Vec::new(),
        }
    }

    fn from_rdns(rdns: Vec<Rdn>) -> Self {
        let normalized = render(&rdns);
        Self {
            raw: normalized.clone(),
            normalized,
            rdns,
        }
    }

    /// The DN as the client sent it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized DN.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// True for the root DN.
    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of RDNs.
    pub fn depth(&self) -> usize {
        self.rdns.len()
    }

    /// The leftmost RDN in normalized form.
    pub fn rdn(&self) -> Option<String> {
        self.rdns.first().map(|rdn| render(std::slice::from_ref(rdn)))
    }

    /// The AVAs of the leftmost RDN.
    pub fn rdn_avas(&self) -> &[Ava] {
        self.rdns.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// The DN with the leftmost RDN removed. `None` for the root.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self::from_rdns(self.rdns[1..].to_vec()))
    }

    /// True if `self` names `other` or one of its ancestors.
    ///
    /// The comparison is RDN by RDN, so `dc=com` is a suffix of
    /// `dc=example,dc=com` but `c=com` is not.
    pub fn is_suffix_of(&self, other: &Dn) -> bool {
        let Some(start) = other.rdns.len().checked_sub(self.rdns.len()) else {
            return false;
        };
        other.rdns[start..] == self.rdns[..]
    }

    /// True if `other` is an immediate child of `self`.
    pub fn is_parent_of(&self, other: &Dn) -> bool {
        other.depth() == self.depth() + 1 && self.is_suffix_of(other)
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Normalizes a DN string.
pub fn normalize(raw: &str) -> Result<String, DnError> {
    parse_rdns(raw).map(|rdns| render(&rdns))
}

/// Case-folds a string value: lowercase with whitespace runs collapsed.
pub fn fold_value(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn render(rdns: &[Rdn]) -> String {
    let mut out = String::new();
    for (i, rdn) in rdns.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        for (j, ava) in rdn.iter().enumerate() {
            if j > 0 {
                out.push('+');
            }
            ava.write_to(&mut out);
        }
    }
    out
}

fn escape_value(value: &str, out: &mut String) {
    let last = value.chars().count().saturating_sub(1);
    for (i, ch) in value.chars().enumerate() {
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                out.push('\\');
                out.push(ch);
            }
            '#' if i == 0 => out.push_str("\\#"),
            ' ' if i == 0 || i == last => out.push_str("\\ "),
            '\0' => out.push_str("\\00"),
            _ => out.push(ch),
        }
    }
}

fn is_separator(byte: u8) -> bool {
    matches!(byte, b',' | b';' | b'+')
}

fn is_escapable(byte: u8) -> bool {
    matches!(
        byte,
        b',' | b'+' | b'"' | b'\\' | b'<' | b'>' | b';' | b'#' | b'=' | b' '
    )
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn valid_type(attr_type: &str) -> bool {
    let bytes = attr_type.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() => bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'-'),
        Some(b) if b.is_ascii_digit() => attr_type
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())),
        _ => false,
    }
}

fn parse_rdns(input: &str) -> Result<Vec<Rdn>, DnError> {
    if input.bytes().all(|b| b == b' ') {
        return Ok(Vec::new());
    }

    let mut parser = Parser {
        input: input.as_bytes(),
        pos: 0,
    };
    let mut rdns = Vec::new();
    let mut rdn = Vec::new();
    loop {
        rdn.push(parser.ava()?);
        match parser.bump() {
            Some(b'+') => {}
            Some(_) => {
                rdn.sort();
                rdns.push(std::mem::take(&mut rdn));
            }
            None => {
                rdn.sort();
                rdns.push(rdn);
                return Ok(rdns);
            }
        }
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    /// True at the end of an AVA: end of input or a separator.
    fn at_boundary(&self) -> bool {
        self.peek().map_or(true, is_separator)
    }

    fn ava(&mut self) -> Result<Ava, DnError> {
        self.skip_spaces();
        if self.at_boundary() {
            return Err(DnError::EmptyRdn);
        }

        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b'=' || is_separator(byte) {
                break;
            }
            self.pos += 1;
        }
        if self.peek() != Some(b'=') {
            return Err(DnError::MissingEquals { offset: self.pos });
        }
        // Only ASCII bytes end the type, so the slice is on char boundaries.
        let attr_type = String::from_utf8_lossy(&self.input[start..self.pos])
            .trim_matches(' ')
            .to_string();
        if attr_type.is_empty() {
            return Err(DnError::EmptyType { offset: start });
        }
        if !valid_type(&attr_type) {
            return Err(DnError::InvalidType { attr_type });
        }
        self.pos += 1;
        self.skip_spaces();

        let (value, hex) = match self.peek() {
            Some(b'"') => (self.quoted_value()?, false),
            Some(b'#') => (self.hex_value()?, true),
            _ => (self.string_value()?, false),
        };

        Ok(Ava {
            attr_type: attr_type.to_ascii_lowercase(),
            value: if hex { value } else { fold_value(&value) },
            hex,
        })
    }

    fn escape(&mut self, out: &mut Vec<u8>) -> Result<(), DnError> {
        let backslash = self.pos;
        self.pos += 1;
        let Some(first) = self.peek() else {
            return Err(DnError::DanglingEscape);
        };
        if let Some(high) = hex_digit(first) {
            let low = self
                .input
                .get(self.pos + 1)
                .copied()
                .and_then(hex_digit)
                .ok_or(DnError::BadEscape { offset: backslash })?;
            out.push(high << 4 | low);
            self.pos += 2;
        } else if is_escapable(first) {
            out.push(first);
            self.pos += 1;
        } else {
            return Err(DnError::BadEscape { offset: backslash });
        }
        Ok(())
    }

    fn string_value(&mut self) -> Result<String, DnError> {
        let mut out = Vec::new();
        while let Some(byte) = self.peek() {
            match byte {
                b'\\' => self.escape(&mut out)?,
                b if is_separator(b) => break,
                b => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        String::from_utf8(out).map_err(|_| DnError::InvalidUtf8)
    }

    fn quoted_value(&mut self) -> Result<String, DnError> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err(DnError::UnterminatedQuote),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => self.escape(&mut out)?,
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        self.skip_spaces();
        if !self.at_boundary() {
            return Err(DnError::TrailingAfterQuote { offset: self.pos });
        }
        String::from_utf8(out).map_err(|_| DnError::InvalidUtf8)
    }

    fn hex_value(&mut self) -> Result<String, DnError> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().and_then(hex_digit).is_some() {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        self.skip_spaces();
        if digits.is_empty() || digits.len() % 2 != 0 || !self.at_boundary() {
            return Err(DnError::InvalidHexValue);
        }
        let mut value = String::with_capacity(digits.len() + 1);
        value.push('#');
        value.extend(digits.iter().map(|b| char::from(b.to_ascii_lowercase())));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn norm(s: &str) -> String {
        normalize(s).unwrap()
    }

    #[test]
    fn case_and_spacing_fold() {
        assert_eq!(norm("CN=Foo Bar , DC=Example,dc=COM"), "cn=foo bar,dc=example,dc=com");
        assert_eq!(norm("cn=  a    b  "), "cn=a b");
        assert_eq!(norm("cn=a;dc=com"), "cn=a,dc=com");
    }

    #[test]
    fn root_dn() {
        assert_eq!(norm(""), "");
        assert_eq!(norm("   "), "");
        assert!(Dn::parse("").unwrap().is_root());
    }

    #[test]
    fn escapes_and_quotes() {
        assert_eq!(norm(r"cn=Smith\, John,dc=com"), r"cn=smith\, john,dc=com");
        assert_eq!(norm(r#"cn="Smith, John",dc=com"#), r"cn=smith\, john,dc=com");
        assert_eq!(norm(r"cn=\4a\4F,dc=com"), "cn=jo,dc=com");
        assert_eq!(norm(r"cn=\#hash"), r"cn=\#hash");
        assert_eq!(norm("cn=#04024869"), "cn=#04024869");
        assert_eq!(norm("cn=#0A0B"), "cn=#0a0b");
    }

    #[test]
    fn multi_valued_rdn_sorted() {
        assert_eq!(norm("uid=b+cn=a,dc=com"), "cn=a+uid=b,dc=com");
    }

    #[test]
    fn numeric_oid_types() {
        assert_eq!(norm("2.5.4.3=foo"), "2.5.4.3=foo");
        assert!(matches!(normalize("2..5=foo"), Err(DnError::InvalidType { .. })));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(normalize("cn"), Err(DnError::MissingEquals { .. })));
        assert!(matches!(normalize("=foo"), Err(DnError::EmptyType { .. })));
        assert!(matches!(normalize("c_n=foo"), Err(DnError::InvalidType { .. })));
        assert_eq!(normalize(r"cn=foo\"), Err(DnError::DanglingEscape));
        assert!(matches!(normalize(r"cn=\zz"), Err(DnError::BadEscape { .. })));
        assert!(matches!(normalize(r"cn=\4"), Err(DnError::BadEscape { .. })));
        assert_eq!(normalize(r#"cn="foo"#), Err(DnError::UnterminatedQuote));
        assert!(matches!(normalize(r#"cn="foo"x"#), Err(DnError::TrailingAfterQuote { .. })));
        assert_eq!(normalize("cn=#abc"), Err(DnError::InvalidHexValue));
        assert_eq!(normalize("cn=a,,dc=com"), Err(DnError::EmptyRdn));
        assert_eq!(normalize("cn=a,"), Err(DnError::EmptyRdn));
        assert_eq!(normalize(r"cn=\ff\fe"), Err(DnError::InvalidUtf8));
    }

    #[test]
    fn parent_and_rdn() {
        let dn = Dn::parse("cn=Foo,dc=Example,dc=com").unwrap();
        assert_eq!(dn.raw(), "cn=Foo,dc=Example,dc=com");
        assert_eq!(dn.rdn().as_deref(), Some("cn=foo"));
        assert_eq!(dn.depth(), 3);

        let parent = dn.parent().unwrap();
        assert_eq!(parent.as_str(), "dc=example,dc=com");
        assert!(parent.is_parent_of(&dn));
        assert!(Dn::root().parent().is_none());
    }

    #[test]
    fn suffix_is_rdn_aware() {
        let entry = Dn::parse("cn=foo,dc=example,dc=com").unwrap();
        assert!(Dn::parse("dc=com").unwrap().is_suffix_of(&entry));
        assert!(Dn::parse("DC=Example, DC=Com").unwrap().is_suffix_of(&entry));
        assert!(entry.is_suffix_of(&entry));
        assert!(Dn::root().is_suffix_of(&entry));
        assert!(!Dn::parse("c=com").unwrap().is_suffix_of(&entry));
        assert!(!Dn::parse("ample,dc=com").unwrap().is_suffix_of(&entry));
        assert!(!entry.is_suffix_of(&entry.parent().unwrap()));
    }

    #[test]
    fn equality_uses_normalized_form() {
        assert_eq!(
            Dn::parse("CN=Foo,DC=Com").unwrap(),
            Dn::parse("cn=foo, dc=com").unwrap()
        );
    }

    fn escape_for_input(value: &str) -> String {
        let mut out = String::new();
        for ch in value.chars() {
            if ch.is_ascii() && is_escapable(ch as u8) {
                out.push('\\');
            }
            out.push(ch);
        }
        out
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(input in "\\PC{0,40}") {
            if let Ok(once) = normalize(&input) {
                prop_assert_eq!(normalize(&once), Ok(once.clone()));
            }
        }

        #[test]
        fn structured_dns_normalize_idempotently(
            rdns in prop::collection::vec(
                ("[a-zA-Z][a-zA-Z0-9-]{0,6}", "[ -~]{0,10}"),
                1..5,
            )
        ) {
            let input = rdns
                .iter()
                .map(|(t, v)| format!("{t}={}", escape_for_input(v)))
                .collect::<Vec<_>>()
                .join(",");
            let once = normalize(&input);
            prop_assert!(once.is_ok(), "{input:?} failed: {once:?}");
            let once = once.unwrap();
            prop_assert_eq!(normalize(&once), Ok(once.clone()));
            prop_assert_eq!(Dn::parse(&once).unwrap().depth(), rdns.len());
        }
    }
}
