//! Request controls.

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::tags;
use dirsrv_codec::{BerWriter, Element, Tag};

/// A control attached to an LDAPMessage.
///
/// ```text
/// Control ::= SEQUENCE {
///     controlType     LDAPOID,
///     criticality     BOOLEAN DEFAULT FALSE,
///     controlValue    OCTET STRING OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// Control OID.
    pub oid: String,
    /// Whether the server must refuse the operation if it cannot honor it.
    pub critical: bool,
    /// Control-specific value.
    pub value: Option<Vec<u8>>,
}

impl Control {
    /// Creates a control.
    pub fn new(oid: impl Into<String>, critical: bool, value: Option<Vec<u8>>) -> Self {
        Self {
            oid: oid.into(),
            critical,
            value,
        }
    }
}

/// Decodes the `[0] Controls` element of an envelope.
pub(crate) fn decode_controls(element: Element<'_>) -> ProtocolResult<Vec<Control>> {
    let mut controls = Vec::new();
    for item in element.sequence()? {
        let mut fields = item?.expect(Tag::SEQUENCE)?.reader()?;
        let oid = fields.read_string()?;
        if oid.is_empty() {
            return Err(ProtocolError::invalid_value("controlType", "empty OID"));
        }
        let critical = match fields.read_optional(Tag::BOOLEAN)? {
            Some(flag) => flag.as_boolean()?,
            None => false,
        };
        let value = fields
            .read_optional(Tag::OCTET_STRING)?
            .map(|v| v.as_octets().to_vec());
        fields.finish()?;

        controls.push(Control {
            oid: oid.to_string(),
            critical,
            value,
        });
    }
    Ok(controls)
}

/// Writes the `[0] Controls` element.
pub(crate) fn encode_controls(writer: &mut BerWriter, controls: &[Control]) {
    writer.write_constructed(tags::CONTROLS, |w| {
        for control in controls {
            w.write_sequence(|w| {
                w.write_octet_string(control.oid.as_bytes());
                if control.critical {
                    w.write_boolean(true);
                }
                if let Some(ref value) = control.value {
                    w.write_octet_string(value);
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsrv_codec::BerReader;

    fn roundtrip(controls: &[Control]) -> Vec<Control> {
        let mut writer = BerWriter::new();
        encode_controls(&mut writer, controls);
        let bytes = writer.into_bytes();
        let element = BerReader::new(&bytes).read_element().unwrap();
        decode_controls(element).unwrap()
    }

    #[test]
    fn criticality_defaults_to_false() {
        let decoded = roundtrip(&[Control::new("1.2.3", false, Some(vec![1, 2]))]);
        assert_eq!(decoded.len(), 1);
        assert!(!decoded[0].critical);
        assert_eq!(decoded[0].value, Some(vec![1, 2]));
    }

    #[test]
    fn multiple_controls_keep_order() {
        let controls = vec![
            Control::new("1.1", true, None),
            Control::new("2.2", false, None),
        ];
        assert_eq!(roundtrip(&controls), controls);
    }

    #[test]
    fn empty_oid_is_invalid_value() {
        let mut writer = BerWriter::new();
        writer.write_constructed(tags::CONTROLS, |w| {
            w.write_sequence(|w| w.write_octet_string(b""));
        });
        let bytes = writer.into_bytes();
        let element = BerReader::new(&bytes).read_element().unwrap();
        let err = decode_controls(element).unwrap_err();
        assert!(!err.is_framing());
    }

    #[test]
    fn malformed_control_is_framing_error() {
        // [0] { SEQUENCE { INTEGER 1 } }
        let bytes = [0xa0, 0x05, 0x30, 0x03, 0x02, 0x01, 0x01];
        let element = BerReader::new(&bytes).read_element().unwrap();
        assert!(decode_controls(element).unwrap_err().is_framing());
    }
}
