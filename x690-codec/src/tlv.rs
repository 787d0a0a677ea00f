//! Decoded TLV unit
//!
//! A [`Tlv`] is one decoded header+body: class, tag number, constructed
//! flag, length form and the owned content bytes, together with the
//! encoding rule that produced it.

use crate::ident::{Length, Tag, TagClass};
use x690_core::{EncodingRule, X690Error, X690Result};

/// One decoded Tag-Length-Value unit
///
/// # Invariants
/// - A definite length always equals `value.len()`.
/// - An indefinite length is only present when the owning rule allows
///   it; `value` then holds the scanned content without the EOC marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    class: TagClass,
    tag: u32,
    constructed: bool,
    length: Length,
    value: Vec<u8>,
    rule: EncodingRule,
}

impl Tlv {
    /// Create a definite-length TLV owning `value`
    pub fn new(tag: Tag, value: Vec<u8>, rule: EncodingRule) -> Self {
        Self {
            class: tag.class(),
            tag: tag.number(),
            constructed: tag.is_constructed(),
            length: Length::Definite(value.len()),
            value,
            rule,
        }
    }

    /// Create a primitive, definite-length TLV with a universal tag
    pub fn primitive(tag_number: u32, value: Vec<u8>, rule: EncodingRule) -> Self {
        Self::new(Tag::universal(false, tag_number), value, rule)
    }

    /// Create a constructed, definite-length TLV with a universal tag
    pub fn constructed(tag_number: u32, value: Vec<u8>, rule: EncodingRule) -> Self {
        Self::new(Tag::universal(true, tag_number), value, rule)
    }

    /// Create a constructed, indefinite-length TLV
    ///
    /// # Errors
    /// `IndefiniteProhibited` if the rule does not allow the indefinite
    /// form.
    pub fn indefinite(tag: Tag, value: Vec<u8>, rule: EncodingRule) -> X690Result<Self> {
        if !rule.allows_indefinite() {
            return Err(X690Error::IndefiniteProhibited(rule));
        }
        Ok(Self {
            class: tag.class(),
            tag: tag.number(),
            constructed: tag.is_constructed(),
            length: Length::Indefinite,
            value,
            rule,
        })
    }

    /// Assemble a TLV from already-decoded parts
    ///
    /// Used by the PDU after it has parsed the header and pulled the
    /// content bytes; upholds the length/value invariant.
    pub(crate) fn from_parts(
        tag: Tag,
        length: Length,
        value: Vec<u8>,
        rule: EncodingRule,
    ) -> X690Result<Self> {
        if let Length::Definite(n) = length {
            if n != value.len() {
                return Err(X690Error::TruncatedContent {
                    declared: n,
                    available: value.len(),
                });
            }
        } else if !rule.allows_indefinite() {
            return Err(X690Error::IndefiniteProhibited(rule));
        }
        Ok(Self {
            class: tag.class(),
            tag: tag.number(),
            constructed: tag.is_constructed(),
            length,
            value,
            rule,
        })
    }

    /// Tag class
    pub fn class(&self) -> TagClass {
        self.class
    }

    /// Tag number
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Whether the encoding is constructed
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Length form as decoded from the wire
    pub fn length(&self) -> Length {
        self.length
    }

    /// Content bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Consume the TLV, returning the content bytes
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Encoding rule this TLV was produced under
    pub fn rule(&self) -> EncodingRule {
        self.rule
    }

    /// The full identifier as a [`Tag`]
    pub fn identifier(&self) -> Tag {
        Tag::new(self.class, self.constructed, self.tag)
    }

    /// Serialized header bytes (identifier + length octets)
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = self.identifier().encode();
        out.extend_from_slice(&self.length.encode());
        out
    }

    /// Total encoded size of this TLV, EOC included for the indefinite
    /// form
    pub fn encoded_len(&self) -> usize {
        let trailer = if self.length.is_indefinite() { 2 } else { 0 };
        self.header_bytes().len() + self.value.len() + trailer
    }

    /// Re-tag this TLV in place, keeping length and content
    ///
    /// Implicit tagging: the outer identifier is replaced while the
    /// constructed flag and the body stay as they are.
    pub fn retag(&mut self, class: TagClass, tag: u32) {
        self.class = class;
        self.tag = tag;
    }

    /// Check that the identifier matches the expected universal tag
    pub fn expect_tag(&self, tag: u32) -> X690Result<()> {
        if self.tag != tag {
            return Err(X690Error::UnexpectedTag {
                expected: tag,
                found: self.tag,
            });
        }
        Ok(())
    }
}
