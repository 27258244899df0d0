//! BER element reader.

use crate::error::{CodecError, CodecResult};
use crate::tag::Tag;

/// Maximum number of long-form length octets accepted.
const MAX_LENGTH_OCTETS: u8 = 4;

/// One decoded BER element: its tag and a borrowed view of its contents.
///
/// Elements never copy the input. Constructed elements are walked with
/// [`Element::reader`] or [`Element::sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    tag: Tag,
    contents: &'a [u8],
}

impl<'a> Element<'a> {
    /// Returns the element tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the raw contents octets.
    pub fn contents(&self) -> &'a [u8] {
        self.contents
    }

    /// Fails with [`CodecError::UnexpectedTag`] unless the tag matches.
    pub fn expect(self, expected: Tag) -> CodecResult<Self> {
        if self.tag == expected {
            Ok(self)
        } else {
            Err(CodecError::unexpected_tag(expected, self.tag))
        }
    }

    /// Returns a reader over the contents of a constructed element.
    pub fn reader(&self) -> CodecResult<BerReader<'a>> {
        if !self.tag.constructed {
            return Err(CodecError::invalid_structure(format!(
                "{} is not constructed",
                self.tag
            )));
        }
        Ok(BerReader::new(self.contents))
    }

    /// Returns a lazy iterator over the sub-elements of a constructed element.
    ///
    /// The iterator is finite and cannot be restarted; it yields at most one
    /// error and then stops.
    pub fn sequence(&self) -> CodecResult<SequenceIter<'a>> {
        self.reader().map(SequenceIter::new)
    }

    /// Interprets the contents as an octet string.
    pub fn as_octets(&self) -> &'a [u8] {
        self.contents
    }

    /// Interprets the contents as a UTF-8 string.
    pub fn as_str(&self) -> CodecResult<&'a str> {
        std::str::from_utf8(self.contents).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Interprets the contents as a two's complement integer.
    pub fn as_integer(&self) -> CodecResult<i64> {
        decode_integer(self.contents)
    }

    /// Interprets the contents as a boolean (any non-zero octet is true).
    pub fn as_boolean(&self) -> CodecResult<bool> {
        match self.contents {
            [byte] => Ok(*byte != 0),
            _ => Err(CodecError::InvalidBoolean),
        }
    }
}

/// A cursor over a sequence of BER elements.
///
/// The reader holds a borrowed slice and a position; every `read_*` call
/// consumes exactly one element or fails without consuming anything useful
/// (after an error the stream is considered corrupt).
#[derive(Debug, Clone)]
pub struct BerReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BerReader<'a> {
    /// Create a new reader for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Current offset into the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the tag of the next element without consuming it.
    pub fn peek_tag(&self) -> CodecResult<Option<Tag>> {
        if self.is_empty() {
            return Ok(None);
        }
        match Tag::parse(self.remaining())? {
            Some((tag, _)) => Ok(Some(tag)),
            None => Err(CodecError::UnexpectedEof),
        }
    }

    /// Reads the next element.
    pub fn read_element(&mut self) -> CodecResult<Element<'a>> {
        let header = match parse_header(self.remaining())? {
            Some(header) => header,
            None => return Err(CodecError::UnexpectedEof),
        };
        let start = self.pos + header.header_len;
        let end = start
            .checked_add(header.content_len)
            .ok_or(CodecError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        self.pos = end;
        Ok(Element {
            tag: header.tag,
            contents: &self.data[start..end],
        })
    }

    /// Reads the next element and checks its tag.
    pub fn read_tagged(&mut self, expected: Tag) -> CodecResult<Element<'a>> {
        self.read_element()?.expect(expected)
    }

    /// Reads the next element if it carries `tag`; otherwise leaves the cursor.
    pub fn read_optional(&mut self, tag: Tag) -> CodecResult<Option<Element<'a>>> {
        match self.peek_tag()? {
            Some(next) if next == tag => self.read_element().map(Some),
            _ => Ok(None),
        }
    }

    /// Reads a universal OCTET STRING.
    pub fn read_octet_string(&mut self) -> CodecResult<&'a [u8]> {
        self.read_tagged(Tag::OCTET_STRING).map(|e| e.as_octets())
    }

    /// Reads a universal OCTET STRING holding UTF-8 text.
    pub fn read_string(&mut self) -> CodecResult<&'a str> {
        self.read_tagged(Tag::OCTET_STRING)?.as_str()
    }

    /// Reads a universal INTEGER.
    pub fn read_integer(&mut self) -> CodecResult<i64> {
        self.read_tagged(Tag::INTEGER)?.as_integer()
    }

    /// Reads a universal ENUMERATED.
    pub fn read_enumerated(&mut self) -> CodecResult<i64> {
        self.read_tagged(Tag::ENUMERATED)?.as_integer()
    }

    /// Reads a universal BOOLEAN.
    pub fn read_boolean(&mut self) -> CodecResult<bool> {
        self.read_tagged(Tag::BOOLEAN)?.as_boolean()
    }

    /// Fails if any bytes remain.
    pub fn finish(&self) -> CodecResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingData {
                remaining: self.data.len() - self.pos,
            })
        }
    }
}

/// Lazy iterator over the elements of a constructed element.
///
/// Yields `Ok(element)` until the contents are exhausted. The first error
/// is yielded once and the iterator then returns `None` forever, so a
/// handler can stop at the first framing error with ordinary control flow.
#[derive(Debug, Clone)]
pub struct SequenceIter<'a> {
    reader: BerReader<'a>,
    failed: bool,
}

impl<'a> SequenceIter<'a> {
    fn new(reader: BerReader<'a>) -> Self {
        Self {
            reader,
            failed: false,
        }
    }

    /// Returns true once the iterator has produced an error.
    pub fn failed(&self) -> bool {
        self.failed
    }
}

impl<'a> Iterator for SequenceIter<'a> {
    type Item = CodecResult<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        match self.reader.read_element() {
            Ok(element) => Some(Ok(element)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for SequenceIter<'_> {}

struct Header {
    tag: Tag,
    header_len: usize,
    content_len: usize,
}

/// Parses tag and length. `Ok(None)` means more input is needed.
fn parse_header(data: &[u8]) -> CodecResult<Option<Header>> {
    let Some((tag, tag_len)) = Tag::parse(data)? else {
        return Ok(None);
    };
    let Some(&first) = data.get(tag_len) else {
        return Ok(None);
    };

    if first < 0x80 {
        return Ok(Some(Header {
            tag,
            header_len: tag_len + 1,
            content_len: usize::from(first),
        }));
    }
    if first == 0x80 {
        return Err(CodecError::IndefiniteLength);
    }

    let octets = first & 0x7f;
    if octets > MAX_LENGTH_OCTETS {
        return Err(CodecError::LengthOverflow { octets });
    }
    let start = tag_len + 1;
    let end = start + usize::from(octets);
    let Some(length_bytes) = data.get(start..end) else {
        return Ok(None);
    };
    let content_len = length_bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));

    Ok(Some(Header {
        tag,
        header_len: end,
        content_len,
    }))
}

/// Returns the total encoded size of the element at the start of `data`.
///
/// `Ok(None)` means the header is not yet complete. The returned size may
/// exceed `data.len()`; callers use it to decide how much more to buffer.
pub fn element_length(data: &[u8]) -> CodecResult<Option<(Tag, u64)>> {
    Ok(parse_header(data)?.map(|h| (h.tag, (h.header_len + h.content_len) as u64)))
}

fn decode_integer(bytes: &[u8]) -> CodecResult<i64> {
    if bytes.is_empty() {
        return Err(CodecError::invalid_integer("empty contents"));
    }
    if bytes.len() > 8 {
        return Err(CodecError::invalid_integer(format!(
            "{} octets do not fit in 64 bits",
            bytes.len()
        )));
    }
    // Sign-extend from the first octet.
    let mut value: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in bytes {
        value = (value << 8) | i64::from(byte);
    }
    Ok(value)
}
