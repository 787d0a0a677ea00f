//! Per-encoding-rule policy table
//!
//! BER, CER and DER share the same TLV structure and differ only in a
//! handful of legality rules. This module centralises those differences
//! as predicates on [`EncodingRule`] so the rest of the codec never
//! branches on the rule directly.

use std::fmt;

/// ASN.1 encoding rule (ITU-T X.690)
///
/// - **BER**: definite or indefinite lengths, no canonical ordering.
/// - **CER**: indefinite lengths, canonical SET ordering, long primitive
///   strings split into 1000-byte segments.
/// - **DER**: definite, minimal-octet lengths only, canonical SET
///   ordering, no segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingRule {
    Ber,
    Cer,
    Der,
}

impl EncodingRule {
    /// Whether the rule permits the indefinite length form
    pub fn allows_indefinite(self) -> bool {
        match self {
            EncodingRule::Ber | EncodingRule::Cer => true,
            EncodingRule::Der => false,
        }
    }

    /// Whether SET-OF element encodings must be sorted by ascending
    /// byte value before concatenation
    pub fn requires_canonical_set_order(self) -> bool {
        match self {
            EncodingRule::Ber => false,
            EncodingRule::Cer | EncodingRule::Der => true,
        }
    }

    /// Whether decoded length octets must use the minimal form
    pub fn requires_minimal_length(self) -> bool {
        self == EncodingRule::Der
    }

    /// Maximum content bytes per segment when a long primitive string
    /// is emitted as a constructed, indefinite-length encoding
    ///
    /// `None` means the rule emits the string as a single primitive TLV
    /// regardless of size.
    pub fn max_segment_len(self) -> Option<usize> {
        match self {
            EncodingRule::Cer => Some(1000),
            EncodingRule::Ber | EncodingRule::Der => None,
        }
    }

    /// Whether canonical value forms (BOOLEAN TRUE = 0xFF, zero padding
    /// bits in BIT STRING) are enforced at decode time
    pub fn requires_canonical_values(self) -> bool {
        match self {
            EncodingRule::Ber => false,
            EncodingRule::Cer | EncodingRule::Der => true,
        }
    }
}

impl fmt::Display for EncodingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingRule::Ber => write!(f, "BER"),
            EncodingRule::Cer => write!(f, "CER"),
            EncodingRule::Der => write!(f, "DER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indefinite_policy() {
        assert!(EncodingRule::Ber.allows_indefinite());
        assert!(EncodingRule::Cer.allows_indefinite());
        assert!(!EncodingRule::Der.allows_indefinite());
    }

    #[test]
    fn test_canonical_set_order_policy() {
        assert!(!EncodingRule::Ber.requires_canonical_set_order());
        assert!(EncodingRule::Cer.requires_canonical_set_order());
        assert!(EncodingRule::Der.requires_canonical_set_order());
    }

    #[test]
    fn test_segment_policy() {
        assert_eq!(EncodingRule::Cer.max_segment_len(), Some(1000));
        assert_eq!(EncodingRule::Ber.max_segment_len(), None);
        assert_eq!(EncodingRule::Der.max_segment_len(), None);
    }
}
