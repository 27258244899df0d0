//! BER element writer.

use crate::tag::Tag;

/// A BER writer producing definite, minimal-length encodings.
///
/// Constructed elements are written through [`BerWriter::write_constructed`],
/// which encodes the children into a scratch writer and then emits the
/// header with the exact content length.
#[derive(Debug, Default, Clone)]
pub struct BerWriter {
    buffer: Vec<u8>,
}

impl BerWriter {
    /// Create a new writer.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Consume this writer and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes a primitive element with arbitrary contents.
    pub fn write_primitive(&mut self, tag: Tag, contents: &[u8]) {
        tag.encode_into(&mut self.buffer);
        self.write_length(contents.len());
        self.buffer.extend_from_slice(contents);
    }

    /// Writes a constructed element whose children are produced by `f`.
    pub fn write_constructed<R>(&mut self, tag: Tag, f: impl FnOnce(&mut BerWriter) -> R) -> R {
        let mut inner = BerWriter::new();
        let result = f(&mut inner);
        tag.encode_into(&mut self.buffer);
        self.write_length(inner.buffer.len());
        self.buffer.extend_from_slice(&inner.buffer);
        result
    }

    /// Writes a universal SEQUENCE.
    pub fn write_sequence<R>(&mut self, f: impl FnOnce(&mut BerWriter) -> R) -> R {
        self.write_constructed(Tag::SEQUENCE, f)
    }

    /// Writes a universal OCTET STRING.
    pub fn write_octet_string(&mut self, value: &[u8]) {
        self.write_primitive(Tag::OCTET_STRING, value);
    }

    /// Writes an INTEGER with an explicit tag.
    pub fn write_tagged_integer(&mut self, tag: Tag, value: i64) {
        let bytes = value.to_be_bytes();
        let start = minimal_integer_start(&bytes);
        self.write_primitive(tag, &bytes[start..]);
    }

    /// Writes a universal INTEGER.
    pub fn write_integer(&mut self, value: i64) {
        self.write_tagged_integer(Tag::INTEGER, value);
    }

    /// Writes a universal ENUMERATED.
    pub fn write_enumerated(&mut self, value: i64) {
        self.write_tagged_integer(Tag::ENUMERATED, value);
    }

    /// Writes a universal BOOLEAN (`0xff` for true, as DER requires).
    pub fn write_boolean(&mut self, value: bool) {
        self.write_primitive(Tag::BOOLEAN, &[if value { 0xff } else { 0x00 }]);
    }

    /// Writes an empty element with the given tag.
    pub fn write_null(&mut self, tag: Tag) {
        self.write_primitive(tag, &[]);
    }

    /// Appends pre-encoded element bytes verbatim.
    pub fn write_raw(&mut self, encoded: &[u8]) {
        self.buffer.extend_from_slice(encoded);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_length(&mut self, len: usize) {
        if len < 0x80 {
            self.buffer.push(len as u8);
            return;
        }
        let bytes = (len as u64).to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        let significant = &bytes[skip..];
        self.buffer.push(0x80 | significant.len() as u8);
        self.buffer.extend_from_slice(significant);
    }
}

/// Index of the first octet of the shortest two's complement form.
fn minimal_integer_start(bytes: &[u8; 8]) -> usize {
    let mut start = 0;
    while start < 7 {
        let (current, next) = (bytes[start], bytes[start + 1]);
        let redundant = (current == 0x00 && next & 0x80 == 0) || (current == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::BerReader;

    fn integer_bytes(value: i64) -> Vec<u8> {
        let mut writer = BerWriter::new();
        writer.write_integer(value);
        writer.into_bytes()
    }

    #[test]
    fn integers_use_shortest_form() {
        assert_eq!(integer_bytes(0), vec![0x02, 0x01, 0x00]);
        assert_eq!(integer_bytes(127), vec![0x02, 0x01, 0x7f]);
        assert_eq!(integer_bytes(128), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(integer_bytes(-1), vec![0x02, 0x01, 0xff]);
        assert_eq!(integer_bytes(-129), vec![0x02, 0x02, 0xff, 0x7f]);
    }

    #[test]
    fn long_form_length_is_minimal() {
        let mut writer = BerWriter::new();
        writer.write_octet_string(&[0u8; 300]);
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[..4], &[0x04, 0x82, 0x01, 0x2c]);
        assert_eq!(bytes.len(), 304);
    }

    #[test]
    fn constructed_elements_nest() {
        let mut writer = BerWriter::new();
        writer.write_sequence(|w| {
            w.write_octet_string(b"cn");
            w.write_constructed(Tag::SET, |w| w.write_octet_string(b"foo"));
        });
        assert_eq!(
            writer.as_bytes(),
            &[0x30, 0x0b, 0x04, 0x02, b'c', b'n', 0x31, 0x05, 0x04, 0x03, b'f', b'o', b'o']
        );
    }

    #[test]
    fn writer_output_is_readable() {
        let mut writer = BerWriter::new();
        writer.write_sequence(|w| {
            w.write_integer(i64::MIN);
            w.write_boolean(true);
            w.write_enumerated(2);
        });
        let bytes = writer.into_bytes();

        let mut reader = BerReader::new(&bytes);
        let mut inner = reader.read_element().unwrap().reader().unwrap();
        assert_eq!(inner.read_integer().unwrap(), i64::MIN);
        assert!(inner.read_boolean().unwrap());
        assert_eq!(inner.read_enumerated().unwrap(), 2);
        inner.finish().unwrap();
    }
}
