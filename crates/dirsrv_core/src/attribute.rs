//! Attributes and value matching.

use crate::dn::fold_value;
use crate::error::EntryError;
use std::borrow::Cow;

/// Folds a value for equality matching.
///
/// UTF-8 values compare case-insensitively with whitespace runs collapsed;
/// anything else compares octet by octet.
pub fn normalize_value(value: &[u8]) -> Cow<'_, [u8]> {
    match std::str::from_utf8(value) {
        Ok(text) => {
            let folded = fold_value(text);
            if folded.as_bytes() == value {
                Cow::Borrowed(value)
            } else {
                Cow::Owned(folded.into_bytes())
            }
        }
        Err(_) => Cow::Borrowed(value),
    }
}

/// True if two values are equal under [`normalize_value`].
pub fn values_match(a: &[u8], b: &[u8]) -> bool {
    a == b || normalize_value(a) == normalize_value(b)
}

/// Returns the lowercased attribute description used for lookups.
pub fn type_key(attr_type: &str) -> String {
    attr_type.to_ascii_lowercase()
}

/// Returns the attribute description without options (`cn;lang-en` -> `cn`).
pub fn base_type(attr_type: &str) -> &str {
    attr_type.split(';').next().unwrap_or(attr_type)
}

/// Descriptors of the naming attributes of RFC 4519, by OID.
const NAMING_OIDS: &[(&str, &str)] = &[
    ("2.5.4.3", "cn"),
    ("2.5.4.4", "sn"),
    ("2.5.4.6", "c"),
    ("2.5.4.7", "l"),
    ("2.5.4.8", "st"),
    ("2.5.4.9", "street"),
    ("2.5.4.10", "o"),
    ("2.5.4.11", "ou"),
    ("2.5.4.12", "title"),
    ("0.9.2342.19200300.100.1.1", "uid"),
    ("0.9.2342.19200300.100.1.25", "dc"),
];

/// Maps a lowercased attribute type to a descriptor where one is known.
///
/// Only the naming attributes are mapped; other numeric OIDs are returned
/// as given, since there is no schema to consult.
pub fn canonical_type(attr_type: &str) -> &str {
    let oid = attr_type.strip_prefix("oid.").unwrap_or(attr_type);
    NAMING_OIDS
        .iter()
        .find(|(known, _)| *known == oid)
        .map_or(attr_type, |(_, descriptor)| descriptor)
}

/// A named attribute with at least one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    key: String,
    values: Vec<Vec<u8>>,
}

impl Attribute {
    /// Creates an attribute, collapsing duplicate values.
    pub fn new(name: impl Into<String>, values: Vec<Vec<u8>>) -> Result<Self, EntryError> {
        let name = name.into();
        if values.is_empty() {
            return Err(EntryError::NoValues { attr_type: name });
        }
        let mut unique: Vec<Vec<u8>> = Vec::with_capacity(values.len());
        for value in values {
            if !unique.iter().any(|v| values_match(v, &value)) {
                unique.push(value);
            }
        }
        Ok(Self {
            key: type_key(&name),
            name,
            values: unique,
        })
    }

    /// Creates a single-valued attribute.
    pub fn single(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        Self {
            key: type_key(&name),
            name,
            values: vec![value.into()],
        }
    }

    /// A valueless attribute, filled in by modify before it is observable.
    pub(crate) fn empty(name: String) -> Self {
        Self {
            key: type_key(&name),
            name,
            values: Vec::new(),
        }
    }

    /// Attribute description as first supplied.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased description.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// True if this attribute has the given description.
    pub fn is(&self, attr_type: &str) -> bool {
        self.key.eq_ignore_ascii_case(attr_type)
    }

    /// Values in insertion order.
    pub fn values(&self) -> &[Vec<u8>] {
        &self.values
    }

    /// The first value as UTF-8, if it is text.
    pub fn first_str(&self) -> Option<&str> {
        self.values.first().and_then(|v| std::str::from_utf8(v).ok())
    }

    /// True if a matching value is present.
    pub fn contains(&self, value: &[u8]) -> bool {
        self.values.iter().any(|v| values_match(v, value))
    }

    /// Appends a value. Returns false if a matching value already exists.
    pub(crate) fn push(&mut self, value: Vec<u8>) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Removes a matching value. Returns false if it was absent.
    pub(crate) fn remove(&mut self, value: &[u8]) -> bool {
        match self.values.iter().position(|v| values_match(v, value)) {
            Some(index) => {
                self.values.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the attribute.
    pub fn into_parts(self) -> (String, Vec<Vec<u8>>) {
        (self.name, self.values)
    }
}
