//! SET/SEQUENCE composite marshaling
//!
//! Encodes aggregate values field by field through the dispatch layer,
//! applying per-field tagging overrides, and wraps the concatenation in
//! the composite's constructed TLV. Under CER/DER the encoded elements
//! of a SET are sorted by ascending byte value before concatenation.

use x690_core::{EncodingRule, X690Error, X690Result};

use crate::ident::{Length, Tag, TagClass, universal};
use crate::pdu::{self, Pdu};
use crate::registry::{self, Asn1Type, Registry, ValueKind};
use crate::tlv::Tlv;

/// Pre-resolved per-field layout record
///
/// The effective class/tag, explicit-vs-implicit mode and
/// optional-absent behaviour for one composite field. Tag-string
/// syntax, if any, is resolved by the caller before this record is
/// built.
#[derive(Debug, Clone)]
pub struct FieldOptions {
    /// Field name, used to annotate errors
    pub name: &'static str,
    /// Effective tag class of the override
    pub class: TagClass,
    /// Tag override; `None` keeps the field value's own identifier
    pub tag: Option<u32>,
    /// EXPLICIT (wrap) vs IMPLICIT (replace) tagging
    pub explicit: bool,
    /// Whether the field may be absent
    pub optional: bool,
}

impl FieldOptions {
    /// Field encoded under its own identifier
    pub fn plain(name: &'static str) -> Self {
        Self {
            name,
            class: TagClass::ContextSpecific,
            tag: None,
            explicit: false,
            optional: false,
        }
    }

    /// IMPLICIT context tag: replaces the field's own identifier
    pub fn implicit(name: &'static str, tag: u32) -> Self {
        Self {
            name,
            class: TagClass::ContextSpecific,
            tag: Some(tag),
            explicit: false,
            optional: false,
        }
    }

    /// EXPLICIT context tag: wraps the field's full encoding
    pub fn explicit(name: &'static str, tag: u32) -> Self {
        Self {
            name,
            class: TagClass::ContextSpecific,
            tag: Some(tag),
            explicit: true,
            optional: false,
        }
    }

    /// Mark the field as OPTIONAL
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// The wire identifier this field is expected to carry
    fn expected(&self, value: &dyn Asn1Type) -> (TagClass, u32) {
        match self.tag {
            Some(tag) => (self.class, tag),
            None => {
                let tag = value.tag();
                (tag.class(), tag.number())
            }
        }
    }
}

/// Encode one field, applying its tagging override
fn encode_field(
    registry: &Registry,
    value: &dyn Asn1Type,
    options: &FieldOptions,
    rule: EncodingRule,
) -> X690Result<Vec<u8>> {
    let mut scratch = Pdu::new(rule);
    registry::encode_value(registry, value, &mut scratch)
        .map_err(|e| e.in_field(options.name))?;

    let Some(tag) = options.tag else {
        return Ok(scratch.data().to_vec());
    };

    if options.explicit {
        let wrapper = Tlv::new(
            Tag::new(options.class, true, tag),
            scratch.data().to_vec(),
            rule,
        );
        let mut out = Pdu::new(rule);
        out.write_tlv(&wrapper)?;
        Ok(out.data().to_vec())
    } else {
        scratch.rewind();
        let mut tlv = scratch.tlv()?;
        tlv.retag(options.class, tag);
        let mut out = Pdu::new(rule);
        out.write_tlv(&tlv)?;
        Ok(out.data().to_vec())
    }
}

/// Decode one consumed child TLV into a field, undoing its tagging
fn decode_field(
    registry: &Registry,
    field: &mut dyn Asn1Type,
    options: &FieldOptions,
    child: &Tlv,
) -> X690Result<()> {
    let result = match options.tag {
        Some(_) if options.explicit => {
            let children = pdu::read_children(child)?;
            match children.as_slice() {
                [inner] => registry::decode_value(registry, field, inner),
                [] => Err(X690Error::InvalidValue(
                    "empty EXPLICIT wrapper".to_string(),
                )),
                extra => Err(X690Error::InvalidValue(format!(
                    "{} extra TLVs in EXPLICIT wrapper",
                    extra.len() - 1
                ))),
            }
        }
        Some(_) => {
            let native = field.tag().with_constructed(child.is_constructed());
            let inner = Tlv::from_parts(
                native,
                Length::Definite(child.value().len()),
                child.value().to_vec(),
                child.rule(),
            )?;
            registry::decode_value(registry, field, &inner)
        }
        None => registry::decode_value(registry, field, child),
    };
    result.map_err(|e| e.in_field(options.name))
}

/// Encode fields and wrap them in a constructed TLV tagged `outer`
///
/// When `canonical` is set the encoded field byte-strings are sorted by
/// ascending byte value before concatenation.
fn encode_composite(
    registry: &Registry,
    fields: &[(&dyn Asn1Type, FieldOptions)],
    rule: EncodingRule,
    outer: Tag,
    canonical: bool,
) -> X690Result<Pdu> {
    let mut encoded: Vec<Vec<u8>> = Vec::with_capacity(fields.len());
    for (value, options) in fields {
        encoded.push(encode_field(registry, *value, options, rule)?);
    }
    if canonical {
        encoded.sort();
    }

    let body: Vec<u8> = encoded.concat();
    let mut out = Pdu::new(rule);
    out.write_tlv(&Tlv::new(outer.with_constructed(true), body, rule))?;
    out.rewind();
    Ok(out)
}

/// Encode a SEQUENCE: declaration order, wrapped in universal tag 16
pub fn encode_sequence(
    registry: &Registry,
    fields: &[(&dyn Asn1Type, FieldOptions)],
    rule: EncodingRule,
) -> X690Result<Pdu> {
    encode_composite(
        registry,
        fields,
        rule,
        Tag::universal(true, universal::SEQUENCE),
        false,
    )
}

/// Encode a SET, wrapped in universal tag 17
///
/// Under CER/DER the element encodings are canonically reordered.
pub fn encode_set(
    registry: &Registry,
    fields: &[(&dyn Asn1Type, FieldOptions)],
    rule: EncodingRule,
) -> X690Result<Pdu> {
    encode_composite(
        registry,
        fields,
        rule,
        Tag::universal(true, universal::SET),
        rule.requires_canonical_set_order(),
    )
}

/// Decode a SEQUENCE body into its declared fields, in order
///
/// The first failing field aborts the decode; its error is propagated
/// annotated with the field name. Trailing bytes after the last field
/// are an error.
pub fn decode_sequence(
    registry: &Registry,
    tlv: &Tlv,
    fields: &mut [(&mut dyn Asn1Type, FieldOptions)],
) -> X690Result<()> {
    let mut sub = Pdu::from_bytes(tlv.value(), tlv.rule());

    for (field, options) in fields.iter_mut() {
        if !sub.has_more_data() {
            if options.optional {
                continue;
            }
            return Err(X690Error::InvalidValue("missing field".to_string())
                .in_field(options.name));
        }

        let peeked = sub.peek_tlv()?;
        let (class, tag) = options.expected(&**field);
        if (peeked.class(), peeked.tag()) != (class, tag) {
            if options.optional {
                continue;
            }
            return Err(X690Error::UnexpectedTag {
                expected: tag,
                found: peeked.tag(),
            }
            .in_field(options.name));
        }

        let child = sub.tlv()?;
        decode_field(registry, &mut **field, options, &child)?;
    }

    if sub.has_more_data() {
        return Err(X690Error::InvalidValue(format!(
            "{} trailing bytes after last field",
            sub.remaining()
        )));
    }
    Ok(())
}

/// Decode a SET body: children may appear in any order
pub fn decode_set(
    registry: &Registry,
    tlv: &Tlv,
    fields: &mut [(&mut dyn Asn1Type, FieldOptions)],
) -> X690Result<()> {
    let mut sub = Pdu::from_bytes(tlv.value(), tlv.rule());
    let mut filled = vec![false; fields.len()];

    while sub.has_more_data() {
        let child = sub.tlv()?;
        let position = fields.iter().zip(&filled).position(|((field, options), done)| {
            !*done && options.expected(&**field) == (child.class(), child.tag())
        });
        let Some(index) = position else {
            return Err(X690Error::InvalidValue(format!(
                "no SET field matches tag {}",
                child.tag()
            )));
        };
        let (field, options) = &mut fields[index];
        decode_field(registry, &mut **field, options, &child)?;
        filled[index] = true;
    }

    for ((_, options), done) in fields.iter().zip(&filled) {
        if !*done && !options.optional {
            return Err(X690Error::InvalidValue("missing field".to_string())
                .in_field(options.name));
        }
    }
    Ok(())
}

/// Dispatch fallback for aggregate-shaped values without a registration
///
/// Iterates the value's children under default field options and wraps
/// them in the value's own (constructed) tag.
pub(crate) fn write_elements(
    registry: &Registry,
    value: &dyn Asn1Type,
    pdu: &mut Pdu,
    canonical_set: bool,
) -> X690Result<usize> {
    let mut encoded: Vec<Vec<u8>> = Vec::new();
    for element in value.elements() {
        let mut scratch = Pdu::new(pdu.rule());
        registry::encode_value(registry, element, &mut scratch)?;
        encoded.push(scratch.data().to_vec());
    }
    if canonical_set && pdu.rule().requires_canonical_set_order() {
        encoded.sort();
    }
    pdu.write_tlv(&Tlv::new(
        value.tag().with_constructed(true),
        encoded.concat(),
        pdu.rule(),
    ))
}

/// SEQUENCE OF: a homogeneous ordered collection
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SequenceOf<T>(pub Vec<T>);

impl<T: Asn1Type + Default> Asn1Type for SequenceOf<T> {
    fn tag(&self) -> Tag {
        Tag::universal(true, universal::SEQUENCE)
    }

    fn write(&self, registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        write_elements(registry, self, pdu, false)
    }

    fn read(&mut self, registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        if tlv.class() == TagClass::Universal {
            tlv.expect_tag(universal::SEQUENCE)?;
        }
        self.0.clear();
        for (index, child) in pdu::read_children(tlv)?.iter().enumerate() {
            let mut element = T::default();
            registry::decode_value(registry, &mut element, child)
                .map_err(|e| e.in_field(format!("[{}]", index)))?;
            self.0.push(element);
        }
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.0.iter().map(|e| e.byte_len()).sum()
    }

    fn display(&self) -> String {
        let items: Vec<String> = self.0.iter().map(|e| e.display()).collect();
        format!("SEQUENCE OF [{}]", items.join(", "))
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Sequence
    }

    fn elements(&self) -> Vec<&dyn Asn1Type> {
        self.0.iter().map(|e| e as &dyn Asn1Type).collect()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// SET OF: a homogeneous collection with canonical ordering under
/// CER/DER
///
/// Element order after decoding reflects encounter order in the buffer:
/// a SET OF round-tripped through CER or DER comes back canonically
/// ordered, not in the caller's original order. Only BER preserves the
/// input order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SetOf<T>(pub Vec<T>);

impl<T: Asn1Type + Default> Asn1Type for SetOf<T> {
    fn tag(&self) -> Tag {
        Tag::universal(true, universal::SET)
    }

    fn write(&self, registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        write_elements(registry, self, pdu, true)
    }

    fn read(&mut self, registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        if tlv.class() == TagClass::Universal {
            tlv.expect_tag(universal::SET)?;
        }
        self.0.clear();
        for (index, child) in pdu::read_children(tlv)?.iter().enumerate() {
            let mut element = T::default();
            registry::decode_value(registry, &mut element, child)
                .map_err(|e| e.in_field(format!("[{}]", index)))?;
            self.0.push(element);
        }
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.0.iter().map(|e| e.byte_len()).sum()
    }

    fn display(&self) -> String {
        let items: Vec<String> = self.0.iter().map(|e| e.display()).collect();
        format!("SET OF [{}]", items.join(", "))
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Set
    }

    fn elements(&self) -> Vec<&dyn Asn1Type> {
        self.0.iter().map(|e| e as &dyn Asn1Type).collect()
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
    use crate::primitives::{Integer, OctetString};
    use crate::registry::{marshal, unmarshal};

    #[test]
    fn test_implicit_field_wire_bytes() {
        // INTEGER 3 as an IMPLICIT [2] SEQUENCE field under DER:
        // the field alone must encode as 82 01 03.
        let value = Integer(3);
        let fields: Vec<(&dyn Asn1Type, FieldOptions)> =
            vec![(&value, FieldOptions::implicit("version", 2))];
        let pdu = encode_sequence(Registry::global(), &fields, EncodingRule::Der).unwrap();
        assert_eq!(pdu.data(), &[0x30, 0x03, 0x82, 0x01, 0x03]);
    }

    #[test]
    fn test_sequence_round_trip_with_tagging() {
        let a = Integer(3);
        let b = OctetString(vec![0xAA]);
        let fields: Vec<(&dyn Asn1Type, FieldOptions)> = vec![
            (&a, FieldOptions::implicit("version", 2)),
            (&b, FieldOptions::explicit("payload", 5)),
        ];
        let pdu = encode_sequence(Registry::global(), &fields, EncodingRule::Der).unwrap();

        let mut reader = Pdu::from_bytes(pdu.data(), EncodingRule::Der);
        let outer = reader.tlv().unwrap();
        let mut version = Integer::default();
        let mut payload = OctetString::default();
        let mut targets: Vec<(&mut dyn Asn1Type, FieldOptions)> = vec![
            (&mut version, FieldOptions::implicit("version", 2)),
            (&mut payload, FieldOptions::explicit("payload", 5)),
        ];
        decode_sequence(Registry::global(), &outer, &mut targets).unwrap();
        assert_eq!(version, Integer(3));
        assert_eq!(payload, OctetString(vec![0xAA]));
    }

    #[test]
    fn test_optional_field_absent() {
        let a = Integer(9);
        let fields: Vec<(&dyn Asn1Type, FieldOptions)> =
            vec![(&a, FieldOptions::implicit("present", 0))];
        let pdu = encode_sequence(Registry::global(), &fields, EncodingRule::Der).unwrap();

        let mut reader = Pdu::from_bytes(pdu.data(), EncodingRule::Der);
        let outer = reader.tlv().unwrap();
        let mut present = Integer::default();
        let mut absent = OctetString::default();
        let mut targets: Vec<(&mut dyn Asn1Type, FieldOptions)> = vec![
            (&mut present, FieldOptions::implicit("present", 0)),
            (&mut absent, FieldOptions::implicit("absent", 1).optional()),
        ];
        decode_sequence(Registry::global(), &outer, &mut targets).unwrap();
        assert_eq!(present, Integer(9));
        assert_eq!(absent, OctetString::default());
    }

    #[test]
    fn test_missing_required_field_names_it() {
        let outer = Tlv::constructed(universal::SEQUENCE, vec![], EncodingRule::Der);
        let mut version = Integer::default();
        let mut targets: Vec<(&mut dyn Asn1Type, FieldOptions)> =
            vec![(&mut version, FieldOptions::implicit("version", 0))];
        let err = decode_sequence(Registry::global(), &outer, &mut targets).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        // SEQUENCE holding one INTEGER plus an unexpected extra TLV
        let body = vec![0x02, 0x01, 0x03, 0x05, 0x00];
        let outer = Tlv::constructed(universal::SEQUENCE, body, EncodingRule::Ber);
        let mut only = Integer::default();
        let mut targets: Vec<(&mut dyn Asn1Type, FieldOptions)> =
            vec![(&mut only, FieldOptions::plain("only"))];
        let err = decode_sequence(Registry::global(), &outer, &mut targets).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn test_set_of_canonical_order_is_input_independent() {
        let forward = SetOf(vec![Integer(300), Integer(1), Integer(-5)]);
        let backward = SetOf(vec![Integer(-5), Integer(1), Integer(300)]);
        for rule in [EncodingRule::Cer, EncodingRule::Der] {
            let a = marshal(&forward, rule).unwrap();
            let b = marshal(&backward, rule).unwrap();
            assert_eq!(a.data(), b.data(), "rule {}", rule);
        }
    }

    #[test]
    fn test_set_of_ber_preserves_input_order() {
        let forward = SetOf(vec![Integer(300), Integer(1)]);
        let backward = SetOf(vec![Integer(1), Integer(300)]);
        let a = marshal(&forward, EncodingRule::Ber).unwrap();
        let b = marshal(&backward, EncodingRule::Ber).unwrap();
        assert_ne!(a.data(), b.data());

        let mut pdu = Pdu::from_bytes(a.data(), EncodingRule::Ber);
        let decoded: SetOf<Integer> = unmarshal(&mut pdu).unwrap();
        assert_eq!(decoded, forward);
    }

    #[test]
    fn test_set_of_der_round_trip_is_encounter_order() {
        let input = SetOf(vec![Integer(300), Integer(1)]);
        let mut pdu = marshal(&input, EncodingRule::Der).unwrap();
        let decoded: SetOf<Integer> = unmarshal(&mut pdu).unwrap();
        // 1 encodes as 02 01 01, 300 as 02 02 01 2C: the shorter
        // encoding sorts first.
        assert_eq!(decoded, SetOf(vec![Integer(1), Integer(300)]));
    }

    #[test]
    fn test_sequence_of_round_trip() {
        let input = SequenceOf(vec![Integer(1), Integer(2), Integer(3)]);
        for rule in [EncodingRule::Ber, EncodingRule::Cer, EncodingRule::Der] {
            let mut pdu = marshal(&input, rule).unwrap();
            let decoded: SequenceOf<Integer> = unmarshal(&mut pdu).unwrap();
            assert_eq!(decoded, input, "rule {}", rule);
        }
    }

    #[test]
    fn test_child_failure_annotated_with_index() {
        // Second element is a zero-length INTEGER
        let body = vec![0x02, 0x01, 0x01, 0x02, 0x00];
        let outer = Tlv::constructed(universal::SEQUENCE, body, EncodingRule::Ber);
        let mut target = SequenceOf::<Integer>::default();
        let err = target.read(Registry::global(), &outer).unwrap_err();
        assert!(err.to_string().contains("[1]"));
    }

    #[test]
    fn test_explicit_wrapper_with_extra_tlv_rejected() {
        // [5] EXPLICIT OCTET STRING wrapper carrying a stray trailing
        // INTEGER: the garbage must not be silently ignored.
        let data = [0x30, 0x08, 0xA5, 0x06, 0x04, 0x01, 0xAA, 0x02, 0x01, 0x07];
        let mut reader = Pdu::from_bytes(&data, EncodingRule::Ber);
        let outer = reader.tlv().unwrap();
        let mut payload = OctetString::default();
        let mut targets: Vec<(&mut dyn Asn1Type, FieldOptions)> =
            vec![(&mut payload, FieldOptions::explicit("payload", 5))];
        let err = decode_sequence(Registry::global(), &outer, &mut targets).unwrap_err();
        assert!(err.to_string().contains("EXPLICIT"));
    }
}
