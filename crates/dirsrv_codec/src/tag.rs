//! BER identifier octets.

use std::fmt;

/// The class bits of a BER tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    /// Universal (ASN.1 built-in types).
    Universal,
    /// Application-wide (LDAP protocol operations).
    Application,
    /// Context-specific (CHOICE arms, optional fields).
    Context,
    /// Private use.
    Private,
}

impl TagClass {
    const fn bits(self) -> u8 {
        match self {
            TagClass::Universal => 0x00,
            TagClass::Application => 0x40,
            TagClass::Context => 0x80,
            TagClass::Private => 0xc0,
        }
    }

    const fn from_bits(byte: u8) -> Self {
        match byte & 0xc0 {
            0x00 => TagClass::Universal,
            0x40 => TagClass::Application,
            0x80 => TagClass::Context,
            _ => TagClass::Private,
        }
    }
}

/// A decoded BER tag: class, constructed bit and tag number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    /// Tag class.
    pub class: TagClass,
    /// Whether the contents are themselves BER elements.
    pub constructed: bool,
    /// Tag number within the class.
    pub number: u32,
}

/// Largest tag number accepted in high-tag form (four base-128 octets).
const MAX_TAG_NUMBER: u32 = (1 << 28) - 1;

impl Tag {
    /// `BOOLEAN`
    pub const BOOLEAN: Tag = Tag::universal(1, false);
    /// `INTEGER`
    pub const INTEGER: Tag = Tag::universal(2, false);
    /// `OCTET STRING`
    pub const OCTET_STRING: Tag = Tag::universal(4, false);
    /// `NULL`
    pub const NULL: Tag = Tag::universal(5, false);
    /// `ENUMERATED`
    pub const ENUMERATED: Tag = Tag::universal(10, false);
    /// `SEQUENCE` / `SEQUENCE OF`
    pub const SEQUENCE: Tag = Tag::universal(16, true);
    /// `SET` / `SET OF`
    pub const SET: Tag = Tag::universal(17, true);

    /// Creates a universal-class tag.
    #[must_use]
    pub const fn universal(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::Universal,
            constructed,
            number,
        }
    }

    /// Creates an application-class tag.
    #[must_use]
    pub const fn application(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::Application,
            constructed,
            number,
        }
    }

    /// Creates a context-specific tag.
    #[must_use]
    pub const fn context(number: u32, constructed: bool) -> Self {
        Self {
            class: TagClass::Context,
            constructed,
            number,
        }
    }

    /// Appends the identifier octets for this tag.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode_into(&self, buffer: &mut Vec<u8>) {
        let mut first = self.class.bits();
        if self.constructed {
            first |= 0x20;
        }

        if self.number < 0x1f {
            buffer.push(first | self.number as u8);
            return;
        }

        buffer.push(first | 0x1f);
        let mut groups = Vec::with_capacity(4);
        let mut n = self.number;
        loop {
            groups.push((n & 0x7f) as u8);
            n >>= 7;
            if n == 0 {
                break;
            }
        }
        for (i, group) in groups.iter().rev().enumerate() {
            let more = i + 1 < groups.len();
            buffer.push(if more { group | 0x80 } else { *group });
        }
    }

    /// Parses identifier octets, returning the tag and the octets consumed.
    ///
    /// Returns `Ok(None)` when `data` ends before the tag is complete.
    pub(crate) fn parse(data: &[u8]) -> Result<Option<(Tag, usize)>, crate::CodecError> {
        let Some(&first) = data.first() else {
            return Ok(None);
        };
        let class = TagClass::from_bits(first);
        let constructed = first & 0x20 != 0;
        let low = u32::from(first & 0x1f);

        if low != 0x1f {
            return Ok(Some((
                Tag {
                    class,
                    constructed,
                    number: low,
                },
                1,
            )));
        }

        let mut number: u32 = 0;
        for (i, &byte) in data[1..].iter().enumerate() {
            if i == 0 && byte == 0x80 {
                return Err(crate::CodecError::invalid_tag(
                    "high tag number has a leading zero group",
                ));
            }
            if number > MAX_TAG_NUMBER >> 7 {
                return Err(crate::CodecError::invalid_tag("tag number too large"));
            }
            number = (number << 7) | u32::from(byte & 0x7f);
            if byte & 0x80 == 0 {
                if number < 0x1f {
                    return Err(crate::CodecError::invalid_tag(
                        "high tag form used for a low tag number",
                    ));
                }
                return Ok(Some((
                    Tag {
                        class,
                        constructed,
                        number,
                    },
                    i + 2,
                )));
            }
        }
        Ok(None)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            TagClass::Universal => "universal",
            TagClass::Application => "application",
            TagClass::Context => "context",
            TagClass::Private => "private",
        };
        let form = if self.constructed { "constructed" } else { "primitive" };
        write!(f, "[{class} {} {form}]", self.number)
    }
}
