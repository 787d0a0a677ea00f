//! Built-in primitive types
//!
//! The working set of universal primitives shipped with the codec:
//! BOOLEAN, INTEGER, OCTET STRING, BIT STRING, NULL, OBJECT IDENTIFIER
//! and UTF8String. Each implements [`Asn1Type`] and is pre-registered
//! in the process-wide registry.
//!
//! Canonical value forms are enforced when the rule asks for them:
//! BOOLEAN TRUE is exactly `0xFF`, INTEGER contents are minimal, BIT
//! STRING padding bits are zero. Long OCTET/BIT/UTF8 strings are
//! segmented under CER.

use x690_core::{X690Error, X690Result};

use crate::ident::{Tag, universal};
use crate::pdu::{self, Pdu};
use crate::registry::{Asn1Type, Registry};
use crate::tlv::Tlv;

/// Register every built-in primitive into `registry`
pub fn register_builtins(registry: &Registry) {
    registry.register::<Boolean>();
    registry.register::<Integer>();
    registry.register::<OctetString>();
    registry.register::<BitString>();
    registry.register::<Null>();
    registry.register::<ObjectIdentifier>();
    registry.register::<Utf8String>();
}

/// Write one primitive TLV, segmenting under CER when the content
/// exceeds the rule's segment size
fn write_string(
    pdu: &mut Pdu,
    tag: Tag,
    body: Vec<u8>,
    trailing_unused: Option<u8>,
) -> X690Result<usize> {
    if let Some(segment_len) = pdu.rule().max_segment_len() {
        let payload_len = body.len() + usize::from(trailing_unused.is_some());
        if payload_len > segment_len {
            return pdu.write_segmented(tag, &body, trailing_unused);
        }
    }
    let body = match trailing_unused {
        Some(unused) => {
            let mut with_prefix = vec![unused];
            with_prefix.extend_from_slice(&body);
            with_prefix
        }
        None => body,
    };
    pdu.write_tlv(&Tlv::new(tag, body, pdu.rule()))
}

/// Reassemble a constructed string encoding (CER segments, or arbitrary
/// BER nesting) into one flat content buffer
fn collect_string(tlv: &Tlv) -> X690Result<Vec<u8>> {
    if !tlv.is_constructed() {
        return Ok(tlv.value().to_vec());
    }
    if !tlv.rule().allows_indefinite() {
        return Err(X690Error::DerNonCanonical(
            "constructed string encoding".to_string(),
        ));
    }
    let mut out = Vec::new();
    for child in pdu::read_children(tlv)? {
        out.extend_from_slice(&collect_string(&child)?);
    }
    Ok(out)
}

/// BOOLEAN (universal 1)
///
/// Encoded as a single content octet; TRUE is always emitted as `0xFF`.
/// BER accepts any non-zero octet as TRUE; CER/DER reject everything
/// but `0x00` and `0xFF`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Boolean(pub bool);

impl Asn1Type for Boolean {
    fn tag(&self) -> Tag {
        Tag::universal(false, universal::BOOLEAN)
    }

    fn write(&self, _registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        let body = vec![if self.0 { 0xFF } else { 0x00 }];
        pdu.write_tlv(&Tlv::new(self.tag(), body, pdu.rule()))
    }

    fn read(&mut self, _registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        tlv.expect_tag(universal::BOOLEAN)?;
        let [octet] = tlv.value() else {
            return Err(X690Error::InvalidValue(format!(
                "BOOLEAN content must be 1 byte, got {}",
                tlv.value().len()
            )));
        };
        if tlv.rule().requires_canonical_values() && !matches!(*octet, 0x00 | 0xFF) {
            return Err(X690Error::DerNonCanonical(format!(
                "BOOLEAN TRUE must be 0xFF, got {:#04x}",
                octet
            )));
        }
        self.0 = *octet != 0x00;
        Ok(())
    }

    fn byte_len(&self) -> usize {
        1
    }

    fn display(&self) -> String {
        self.0.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// INTEGER (universal 2), two's complement, minimal octets
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Integer(pub i64);

impl Integer {
    /// Minimal big-endian two's complement content octets
    fn content(&self) -> Vec<u8> {
        let value = self.0;
        if value == 0 {
            return vec![0];
        }

        let mut bytes = Vec::new();
        if value < 0 {
            let mut temp = value;
            while temp != -1 {
                bytes.push((temp & 0xFF) as u8);
                temp >>= 8;
            }
            // Sign bit must survive: prepend 0xFF if the top byte
            // looks positive
            if bytes.is_empty() || (bytes[bytes.len() - 1] & 0x80) == 0 {
                bytes.push(0xFF);
            }
        } else {
            let mut temp = value;
            while temp > 0 {
                bytes.push((temp & 0xFF) as u8);
                temp >>= 8;
            }
            if (bytes[bytes.len() - 1] & 0x80) != 0 {
                bytes.push(0x00);
            }
        }

        bytes.reverse();
        bytes
    }
}

impl Asn1Type for Integer {
    fn tag(&self) -> Tag {
        Tag::universal(false, universal::INTEGER)
    }

    fn write(&self, _registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        pdu.write_tlv(&Tlv::new(self.tag(), self.content(), pdu.rule()))
    }

    fn read(&mut self, _registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        tlv.expect_tag(universal::INTEGER)?;
        let bytes = tlv.value();
        if bytes.is_empty() {
            return Err(X690Error::InvalidValue(
                "zero-length INTEGER content".to_string(),
            ));
        }
        if bytes.len() > 8 {
            return Err(X690Error::InvalidValue(format!(
                "INTEGER content of {} bytes exceeds i64",
                bytes.len()
            )));
        }
        // Non-minimal leading octets are always illegal for INTEGER
        if bytes.len() > 1 {
            let redundant = (bytes[0] == 0x00 && bytes[1] & 0x80 == 0)
                || (bytes[0] == 0xFF && bytes[1] & 0x80 != 0);
            if redundant {
                return Err(X690Error::InvalidValue(
                    "non-minimal INTEGER content".to_string(),
                ));
            }
        }

        let mut value: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        for &byte in bytes {
            value = (value << 8) | byte as i64;
        }
        self.0 = value;
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.content().len()
    }

    fn display(&self) -> String {
        self.0.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// OCTET STRING (universal 4)
///
/// Emitted as one primitive TLV under BER/DER regardless of size;
/// segmented into 1000-byte chunks under CER when longer than one
/// segment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OctetString(pub Vec<u8>);

impl Asn1Type for OctetString {
    fn tag(&self) -> Tag {
        Tag::universal(false, universal::OCTET_STRING)
    }

    fn write(&self, _registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        write_string(pdu, self.tag(), self.0.clone(), None)
    }

    fn read(&mut self, _registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        tlv.expect_tag(universal::OCTET_STRING)?;
        self.0 = collect_string(tlv)?;
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.0.len()
    }

    fn display(&self) -> String {
        let hex: Vec<String> = self.0.iter().map(|b| format!("{:02X}", b)).collect();
        format!("OCTET STRING ({})", hex.join(" "))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// BIT STRING (universal 3)
///
/// The first content octet counts the unused bits in the last data
/// octet (0-7). Under CER/DER the unused bits must be zero in the data.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BitString {
    pub data: Vec<u8>,
    pub unused: u8,
}

impl BitString {
    pub fn new(data: Vec<u8>, unused: u8) -> X690Result<Self> {
        if unused > 7 {
            return Err(X690Error::InvalidValue(
                "unused bits must be 0-7".to_string(),
            ));
        }
        if data.is_empty() && unused != 0 {
            return Err(X690Error::InvalidValue(
                "empty BIT STRING cannot have unused bits".to_string(),
            ));
        }
        Ok(Self { data, unused })
    }

    /// Number of bits carried
    pub fn bit_len(&self) -> usize {
        self.data.len() * 8 - self.unused as usize
    }

    fn check(data: &[u8], unused: u8, canonical: bool) -> X690Result<()> {
        if unused > 7 {
            return Err(X690Error::InvalidValue(
                "unused bits must be 0-7".to_string(),
            ));
        }
        if data.is_empty() && unused != 0 {
            return Err(X690Error::InvalidValue(
                "empty BIT STRING cannot have unused bits".to_string(),
            ));
        }
        if canonical && unused > 0 {
            let mask = (1u8 << unused) - 1;
            if data[data.len() - 1] & mask != 0 {
                return Err(X690Error::DerNonCanonical(
                    "BIT STRING padding bits must be zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Asn1Type for BitString {
    fn tag(&self) -> Tag {
        Tag::universal(false, universal::BIT_STRING)
    }

    fn write(&self, _registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        write_string(pdu, self.tag(), self.data.clone(), Some(self.unused))
    }

    fn read(&mut self, _registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        tlv.expect_tag(universal::BIT_STRING)?;
        let canonical = tlv.rule().requires_canonical_values();

        if tlv.is_constructed() {
            if !tlv.rule().allows_indefinite() {
                return Err(X690Error::DerNonCanonical(
                    "constructed BIT STRING encoding".to_string(),
                ));
            }
            // Each segment repeats the unused-bit octet; only the last
            // segment may be partial.
            let segments = pdu::read_children(tlv)?;
            let mut data = Vec::new();
            let mut unused = 0;
            for (index, segment) in segments.iter().enumerate() {
                let body = collect_string(segment)?;
                let (&head, tail) = body.split_first().ok_or_else(|| {
                    X690Error::InvalidValue("empty BIT STRING segment".to_string())
                })?;
                if index + 1 < segments.len() && head != 0 {
                    return Err(X690Error::InvalidValue(
                        "non-final BIT STRING segment with unused bits".to_string(),
                    ));
                }
                data.extend_from_slice(tail);
                unused = head;
            }
            Self::check(&data, unused, canonical)?;
            self.data = data;
            self.unused = unused;
            return Ok(());
        }

        let (&unused, data) = tlv.value().split_first().ok_or_else(|| {
            X690Error::InvalidValue("empty BIT STRING content".to_string())
        })?;
        Self::check(data, unused, canonical)?;
        self.data = data.to_vec();
        self.unused = unused;
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.data.len()
    }

    fn display(&self) -> String {
        format!("BIT STRING ({} bits)", self.bit_len())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// NULL (universal 5), always empty content
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Null;

impl Asn1Type for Null {
    fn tag(&self) -> Tag {
        Tag::universal(false, universal::NULL)
    }

    fn write(&self, _registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        pdu.write_tlv(&Tlv::new(self.tag(), Vec::new(), pdu.rule()))
    }

    fn read(&mut self, _registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        tlv.expect_tag(universal::NULL)?;
        if !tlv.value().is_empty() {
            return Err(X690Error::InvalidValue(format!(
                "NULL with {} content bytes",
                tlv.value().len()
            )));
        }
        Ok(())
    }

    fn byte_len(&self) -> usize {
        0
    }

    fn display(&self) -> String {
        "NULL".to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// OBJECT IDENTIFIER (universal 6)
///
/// The first two arcs X.Y are packed as `40*X + Y`; every further arc
/// is base-128 with the high bit as continuation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ObjectIdentifier(pub Vec<u32>);

impl ObjectIdentifier {
    fn push_base128(bytes: &mut Vec<u8>, value: u32) {
        let mut groups = Vec::new();
        let mut temp = value;
        loop {
            groups.push((temp & 0x7F) as u8);
            temp >>= 7;
            if temp == 0 {
                break;
            }
        }
        for (i, &group) in groups.iter().rev().enumerate() {
            if i < groups.len() - 1 {
                bytes.push(group | 0x80);
            } else {
                bytes.push(group);
            }
        }
    }

    fn content(&self) -> X690Result<Vec<u8>> {
        if self.0.len() < 2 {
            return Err(X690Error::InvalidValue(
                "OBJECT IDENTIFIER needs at least 2 arcs".to_string(),
            ));
        }
        // Root arc 0-2; arcs 0 and 1 only allow a second arc below 40
        if self.0[0] > 2 || (self.0[0] < 2 && self.0[1] >= 40) {
            return Err(X690Error::InvalidValue(
                "OBJECT IDENTIFIER leading arcs out of range".to_string(),
            ));
        }
        let first = 40u32
            .checked_mul(self.0[0])
            .and_then(|x| x.checked_add(self.0[1]))
            .ok_or_else(|| {
                X690Error::InvalidValue("OBJECT IDENTIFIER leading arcs too large".to_string())
            })?;

        let mut bytes = Vec::new();
        Self::push_base128(&mut bytes, first);
        for &arc in &self.0[2..] {
            Self::push_base128(&mut bytes, arc);
        }
        Ok(bytes)
    }
}

impl Asn1Type for ObjectIdentifier {
    fn tag(&self) -> Tag {
        Tag::universal(false, universal::OBJECT_IDENTIFIER)
    }

    fn write(&self, _registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        pdu.write_tlv(&Tlv::new(self.tag(), self.content()?, pdu.rule()))
    }

    fn read(&mut self, _registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        tlv.expect_tag(universal::OBJECT_IDENTIFIER)?;
        let bytes = tlv.value();
        if bytes.is_empty() {
            return Err(X690Error::InvalidValue(
                "empty OBJECT IDENTIFIER content".to_string(),
            ));
        }

        // Every subidentifier is base-128, the first one included: a
        // first octet with the continuation bit set continues into the
        // next octet (e.g. 2.999 is 88 37).
        let mut subids = Vec::new();
        let mut arc = 0u32;
        let mut continuing = false;
        for &byte in bytes {
            if arc >= (1 << 25) {
                return Err(X690Error::InvalidValue(
                    "OBJECT IDENTIFIER arc overflows u32".to_string(),
                ));
            }
            arc = (arc << 7) | (byte & 0x7F) as u32;
            continuing = byte & 0x80 != 0;
            if !continuing {
                subids.push(arc);
                arc = 0;
            }
        }
        if continuing {
            return Err(X690Error::InvalidValue(
                "OBJECT IDENTIFIER ends mid-arc".to_string(),
            ));
        }

        let first = subids[0];
        let mut arcs = if first < 40 {
            vec![0, first]
        } else if first < 80 {
            vec![1, first - 40]
        } else {
            vec![2, first - 80]
        };
        arcs.extend_from_slice(&subids[1..]);

        self.0 = arcs;
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.content().map_or(0, |c| c.len())
    }

    fn display(&self) -> String {
        let arcs: Vec<String> = self.0.iter().map(u32::to_string).collect();
        arcs.join(".")
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// UTF8String (universal 12), segmented under CER like OCTET STRING
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Utf8String(pub String);

impl Asn1Type for Utf8String {
    fn tag(&self) -> Tag {
        Tag::universal(false, universal::UTF8_STRING)
    }

    fn write(&self, _registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        write_string(pdu, self.tag(), self.0.clone().into_bytes(), None)
    }

    fn read(&mut self, _registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        tlv.expect_tag(universal::UTF8_STRING)?;
        let bytes = collect_string(tlv)?;
        self.0 = String::from_utf8(bytes)
            .map_err(|e| X690Error::InvalidValue(format!("invalid UTF-8: {}", e)))?;
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.0.len()
    }

    fn display(&self) -> String {
        self.0.clone()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{marshal, unmarshal};
    use x690_core::EncodingRule;

    const ALL_RULES: [EncodingRule; 3] =
        [EncodingRule::Ber, EncodingRule::Cer, EncodingRule::Der];

    #[test]
    fn test_boolean_round_trip() {
        for rule in ALL_RULES {
            for value in [Boolean(true), Boolean(false)] {
                let mut pdu = marshal(&value, rule).unwrap();
                let decoded: Boolean = unmarshal(&mut pdu).unwrap();
                assert_eq!(decoded, value, "rule {}", rule);
            }
        }
    }

    #[test]
    fn test_boolean_canonical_form() {
        // 0x01 is TRUE under BER, non-canonical under DER
        let data = [0x01, 0x01, 0x01];
        let mut ber = Pdu::from_bytes(&data, EncodingRule::Ber);
        assert_eq!(unmarshal::<Boolean>(&mut ber).unwrap(), Boolean(true));
        let mut der = Pdu::from_bytes(&data, EncodingRule::Der);
        assert!(matches!(
            unmarshal::<Boolean>(&mut der),
            Err(X690Error::DerNonCanonical(_))
        ));
    }

    #[test]
    fn test_integer_wire_forms() {
        let cases: &[(i64, &[u8])] = &[
            (0, &[0x02, 0x01, 0x00]),
            (3, &[0x02, 0x01, 0x03]),
            (127, &[0x02, 0x01, 0x7F]),
            (128, &[0x02, 0x02, 0x00, 0x80]),
            (-1, &[0x02, 0x01, 0xFF]),
            (-128, &[0x02, 0x01, 0x80]),
            (-129, &[0x02, 0x02, 0xFF, 0x7F]),
            (256, &[0x02, 0x02, 0x01, 0x00]),
        ];
        for &(value, expected) in cases {
            let pdu = marshal(&Integer(value), EncodingRule::Der).unwrap();
            assert_eq!(pdu.data(), expected, "value {}", value);
        }
    }

    #[test]
    fn test_integer_round_trip() {
        let values = [0i64, 1, -1, 127, 128, -128, -129, i64::MAX, i64::MIN];
        for rule in ALL_RULES {
            for value in values {
                let mut pdu = marshal(&Integer(value), rule).unwrap();
                let decoded: Integer = unmarshal(&mut pdu).unwrap();
                assert_eq!(decoded.0, value, "value {} rule {}", value, rule);
            }
        }
    }

    #[test]
    fn test_integer_rejects_redundant_leading_octet() {
        let mut pdu = Pdu::from_bytes(&[0x02, 0x02, 0x00, 0x7F], EncodingRule::Ber);
        assert!(unmarshal::<Integer>(&mut pdu).is_err());
    }

    #[test]
    fn test_octet_string_round_trip() {
        for rule in ALL_RULES {
            let value = OctetString(b"hello world".to_vec());
            let mut pdu = marshal(&value, rule).unwrap();
            let decoded: OctetString = unmarshal(&mut pdu).unwrap();
            assert_eq!(decoded, value, "rule {}", rule);
        }
    }

    #[test]
    fn test_long_octet_string_segmented_under_cer() {
        let value = OctetString(vec![0x42; 3000]);
        let mut cer = marshal(&value, EncodingRule::Cer).unwrap();
        // Constructed OCTET STRING with indefinite length
        assert_eq!(cer.data()[0], 0x24);
        assert_eq!(cer.data()[1], 0x80);
        let decoded: OctetString = unmarshal(&mut cer).unwrap();
        assert_eq!(decoded, value);

        // DER keeps a single primitive TLV
        let der = marshal(&value, EncodingRule::Der).unwrap();
        assert_eq!(der.data()[0], 0x04);
    }

    #[test]
    fn test_bit_string_round_trip() {
        let value = BitString::new(vec![0b1010_0000], 4).unwrap();
        for rule in ALL_RULES {
            let mut pdu = marshal(&value, rule).unwrap();
            let decoded: BitString = unmarshal(&mut pdu).unwrap();
            assert_eq!(decoded, value, "rule {}", rule);
        }
        assert_eq!(value.bit_len(), 4);
    }

    #[test]
    fn test_bit_string_padding_must_be_zero_under_der() {
        // 3 unused bits but the low bits are set
        let data = [0x03, 0x02, 0x03, 0b0000_0111];
        let mut der = Pdu::from_bytes(&data, EncodingRule::Der);
        assert!(matches!(
            unmarshal::<BitString>(&mut der),
            Err(X690Error::DerNonCanonical(_))
        ));
        let mut ber = Pdu::from_bytes(&data, EncodingRule::Ber);
        assert!(unmarshal::<BitString>(&mut ber).is_ok());
    }

    #[test]
    fn test_long_bit_string_segmented_under_cer() {
        let value = BitString::new(vec![0xA0; 2000], 0).unwrap();
        let mut cer = marshal(&value, EncodingRule::Cer).unwrap();
        assert_eq!(cer.data()[0], 0x23);
        let decoded: BitString = unmarshal(&mut cer).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_null_round_trip() {
        for rule in ALL_RULES {
            let mut pdu = marshal(&Null, rule).unwrap();
            assert_eq!(pdu.data(), &[0x05, 0x00]);
            let decoded: Null = unmarshal(&mut pdu).unwrap();
            assert_eq!(decoded, Null);
        }
    }

    #[test]
    fn test_null_rejects_content() {
        let mut pdu = Pdu::from_bytes(&[0x05, 0x01, 0x00], EncodingRule::Ber);
        assert!(unmarshal::<Null>(&mut pdu).is_err());
    }

    #[test]
    fn test_oid_wire_form() {
        let value = ObjectIdentifier(vec![1, 2, 840, 113549]);
        let pdu = marshal(&value, EncodingRule::Der).unwrap();
        assert_eq!(
            pdu.data(),
            &[0x06, 0x06, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]
        );
    }

    #[test]
    fn test_oid_round_trip() {
        for rule in ALL_RULES {
            let value = ObjectIdentifier(vec![2, 5, 4, 3]);
            let mut pdu = marshal(&value, rule).unwrap();
            let decoded: ObjectIdentifier = unmarshal(&mut pdu).unwrap();
            assert_eq!(decoded, value, "rule {}", rule);
            assert_eq!(decoded.display(), "2.5.4.3");
        }
    }

    #[test]
    fn test_oid_large_second_arc() {
        // 2.999: the first subidentifier 40*2+999 = 1079 spans two
        // base-128 octets
        let value = ObjectIdentifier(vec![2, 999]);
        let mut pdu = marshal(&value, EncodingRule::Der).unwrap();
        assert_eq!(pdu.data(), &[0x06, 0x02, 0x88, 0x37]);
        let decoded: ObjectIdentifier = unmarshal(&mut pdu).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_oid_too_few_arcs() {
        let value = ObjectIdentifier(vec![1]);
        assert!(marshal(&value, EncodingRule::Der).is_err());
    }

    #[test]
    fn test_oid_leading_arcs_out_of_range() {
        // Roots 0 and 1 only carry second arcs below 40; root arc > 2
        // does not exist
        assert!(marshal(&ObjectIdentifier(vec![1, 40]), EncodingRule::Der).is_err());
        assert!(marshal(&ObjectIdentifier(vec![3, 1]), EncodingRule::Der).is_err());
    }

    #[test]
    fn test_utf8_string_round_trip() {
        for rule in ALL_RULES {
            let value = Utf8String("héllo, wörld".to_string());
            let mut pdu = marshal(&value, rule).unwrap();
            let decoded: Utf8String = unmarshal(&mut pdu).unwrap();
            assert_eq!(decoded, value, "rule {}", rule);
        }
    }

    #[test]
    fn test_utf8_string_rejects_bad_bytes() {
        let mut pdu = Pdu::from_bytes(&[0x0C, 0x02, 0xFF, 0xFE], EncodingRule::Ber);
        assert!(unmarshal::<Utf8String>(&mut pdu).is_err());
    }

    #[test]
    fn test_wrong_tag_rejected() {
        // OCTET STRING bytes decoded as INTEGER
        let mut pdu = Pdu::from_bytes(&[0x04, 0x01, 0x03], EncodingRule::Ber);
        assert!(matches!(
            unmarshal::<Integer>(&mut pdu),
            Err(X690Error::UnexpectedTag {
                expected: 2,
                found: 4
            })
        ));
    }
}
