//! Identifier and length octets (Tag, Length)
//!
//! Pure parse/serialize functions for the first bytes of a TLV,
//! independent of any buffer object.

use x690_core::{X690Error, X690Result};

/// Tag class
///
/// ASN.1 defines four tag classes:
/// - **Universal**: Standard ASN.1 types (INTEGER, OCTET STRING, etc.)
/// - **Application**: Application-specific types
/// - **Context-specific**: Context-dependent types (used in SEQUENCE/SET/CHOICE)
/// - **Private**: Private/implementation-specific types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    /// Universal class (00)
    Universal = 0,
    /// Application class (01)
    Application = 1,
    /// Context-specific class (10)
    ContextSpecific = 2,
    /// Private class (11)
    Private = 3,
}

impl TagClass {
    /// Get tag class from the first identifier octet (bits 8-7)
    pub fn from_octet(octet: u8) -> Self {
        match (octet >> 6) & 0x03 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    /// Convert tag class to identifier-octet bits (for encoding)
    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// Universal tag numbers used by the built-in types
pub mod universal {
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const UTF8_STRING: u32 = 12;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
}

/// TLV identifier (tag)
///
/// Consists of:
/// - **Class**: Universal, Application, Context-specific, or Private
/// - **Constructed/Primitive**: whether the value contains nested TLVs
/// - **Tag Number**: 0-30 in the first octet, or high-tag-number form
///
/// # Encoding Format
///
/// Short form (tag number 0-30):
/// ```text
/// Bits: 8 7 6 5 4 3 2 1
///       C C P T T T T T
/// ```
///
/// High-tag-number form (tag number > 30):
/// ```text
/// First octet:      C C P 1 1 1 1 1
/// Following octets: M T T T T T T T   (M = continuation, last octet M = 0)
/// ```
/// Continuation octets contribute 7 bits each, big-endian. At most 5
/// continuation octets are accepted, capping tag numbers at 28 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    class: TagClass,
    constructed: bool,
    number: u32,
}

/// High-tag-number form: at most 5 continuation octets (28-bit cap)
const MAX_TAG_OCTETS: usize = 5;

impl Tag {
    /// Create a new tag
    pub fn new(class: TagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    /// Create a Universal class tag
    pub fn universal(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::Universal, constructed, number)
    }

    /// Create an Application class tag
    pub fn application(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::Application, constructed, number)
    }

    /// Create a Context-specific class tag
    pub fn context(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::ContextSpecific, constructed, number)
    }

    /// Create a Private class tag
    pub fn private(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::Private, constructed, number)
    }

    /// Get tag class
    pub fn class(&self) -> TagClass {
        self.class
    }

    /// Check if the tag marks a constructed encoding
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Get tag number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Return the same tag with the constructed flag replaced
    pub fn with_constructed(self, constructed: bool) -> Self {
        Self {
            constructed,
            ..self
        }
    }

    /// Encode tag to bytes
    ///
    /// Uses the single-octet form for tag numbers 0-30 and the
    /// high-tag-number form otherwise, always minimal.
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::new();

        let class_bits = self.class.to_bits();
        let constructed_bit = if self.constructed { 0x20 } else { 0x00 };

        if self.number <= 30 {
            result.push(class_bits | constructed_bit | (self.number as u8 & 0x1F));
        } else {
            result.push(class_bits | constructed_bit | 0x1F);

            // Collect 7-bit groups, least significant first
            let mut remaining = self.number;
            let mut groups = Vec::new();
            while remaining > 0 {
                groups.push((remaining & 0x7F) as u8);
                remaining >>= 7;
            }

            // Emit big-endian with the continuation bit on all but the last
            for (i, &group) in groups.iter().rev().enumerate() {
                if i < groups.len() - 1 {
                    result.push(group | 0x80);
                } else {
                    result.push(group);
                }
            }
        }

        result
    }

    /// Decode a tag from the start of `data`
    ///
    /// # Returns
    /// `Ok((tag, bytes_consumed))` on success.
    ///
    /// # Errors
    /// - `EmptyIdentifier` if `data` is empty
    /// - `TruncatedTag` if a continuation octet sequence never terminates
    /// - `TagTooLarge` if more than 5 continuation octets are present
    pub fn decode(data: &[u8]) -> X690Result<(Self, usize)> {
        let first = *data.first().ok_or(X690Error::EmptyIdentifier)?;

        let class = TagClass::from_octet(first);
        let constructed = (first & 0x20) != 0;
        let tag_bits = first & 0x1F;

        if tag_bits < 31 {
            return Ok((Self::new(class, constructed, tag_bits as u32), 1));
        }

        // High-tag-number form
        let mut number = 0u32;
        let mut pos = 1;
        loop {
            if pos > MAX_TAG_OCTETS {
                return Err(X690Error::TagTooLarge);
            }
            let octet = *data.get(pos).ok_or(X690Error::TruncatedTag)?;
            if number > (u32::MAX >> 7) {
                return Err(X690Error::TagTooLarge);
            }
            number = (number << 7) | (octet & 0x7F) as u32;
            pos += 1;
            if octet & 0x80 == 0 {
                break;
            }
        }

        Ok((Self::new(class, constructed, number), pos))
    }
}

/// TLV length
///
/// Three wire forms exist:
/// - **Short form** (1 octet): lengths 0-127, high bit clear.
/// - **Long form**: first octet has the high bit set, low 7 bits count
///   the subsequent big-endian length octets.
/// - **Indefinite form**: `0x80` (long form with a count of 0); the
///   content is terminated by an End-Of-Contents marker instead of a
///   declared byte count. Legal only under BER/CER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Length {
    /// Declared byte count
    Definite(usize),
    /// Content terminated by an EOC marker (BER/CER only)
    Indefinite,
}

/// Long form: at most 4 length octets (32-bit cap, keeps the offset
/// arithmetic overflow-free)
const MAX_LENGTH_OCTETS: usize = 4;

impl Length {
    /// Get the declared byte count, if definite
    pub fn definite(&self) -> Option<usize> {
        match self {
            Length::Definite(n) => Some(*n),
            Length::Indefinite => None,
        }
    }

    /// Check for the indefinite form
    pub fn is_indefinite(&self) -> bool {
        matches!(self, Length::Indefinite)
    }

    /// Encode length to bytes
    ///
    /// Short form for values below 128; otherwise the minimal-octet
    /// long form (required for DER canonicality). The indefinite form
    /// encodes as the single octet `0x80`.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Length::Indefinite => vec![0x80],
            Length::Definite(length) => {
                if *length < 128 {
                    return vec![*length as u8];
                }

                // Minimal number of big-endian octets
                let mut num_octets = 0;
                let mut temp = *length;
                while temp > 0 {
                    num_octets += 1;
                    temp >>= 8;
                }

                let mut result = vec![0x80 | num_octets as u8];
                for i in (0..num_octets).rev() {
                    result.push(((*length >> (i * 8)) & 0xFF) as u8);
                }
                result
            }
        }
    }

    /// Decode a length from the start of `data`
    ///
    /// # Returns
    /// `Ok((length, bytes_consumed))` on success.
    ///
    /// # Errors
    /// - `EmptyLength` if `data` is empty
    /// - `LengthTooLarge` if more than 4 subsequent octets are declared
    /// - `TruncatedLength` if fewer octets are present than declared
    pub fn decode(data: &[u8]) -> X690Result<(Self, usize)> {
        let first = *data.first().ok_or(X690Error::EmptyLength)?;

        if first & 0x80 == 0 {
            return Ok((Length::Definite((first & 0x7F) as usize), 1));
        }

        let num_octets = (first & 0x7F) as usize;
        if num_octets == 0 {
            return Ok((Length::Indefinite, 1));
        }
        if num_octets > MAX_LENGTH_OCTETS {
            return Err(X690Error::LengthTooLarge(num_octets));
        }
        if data.len() < 1 + num_octets {
            return Err(X690Error::TruncatedLength {
                declared: num_octets,
                available: data.len() - 1,
            });
        }

        let mut length = 0usize;
        for &octet in &data[1..1 + num_octets] {
            length = (length << 8) | octet as usize;
        }

        Ok((Length::Definite(length), 1 + num_octets))
    }

    /// Check that the encoded length octets at the start of `data` use
    /// the canonical (minimal) form required by DER
    ///
    /// Rejects the indefinite form, a long form used for a value below
    /// 128, and a redundant leading zero length octet.
    pub fn check_canonical(data: &[u8]) -> X690Result<()> {
        let first = *data.first().ok_or(X690Error::EmptyLength)?;

        if first & 0x80 == 0 {
            return Ok(());
        }

        let num_octets = (first & 0x7F) as usize;
        if num_octets == 0 {
            return Err(X690Error::DerNonCanonical(
                "indefinite length form".to_string(),
            ));
        }
        if num_octets > MAX_LENGTH_OCTETS {
            return Err(X690Error::LengthTooLarge(num_octets));
        }
        if data.len() < 1 + num_octets {
            return Err(X690Error::TruncatedLength {
                declared: num_octets,
                available: data.len() - 1,
            });
        }

        if data[1] == 0 {
            return Err(X690Error::DerNonCanonical(
                "redundant leading zero in length octets".to_string(),
            ));
        }
        if num_octets == 1 && data[1] < 128 {
            return Err(X690Error::DerNonCanonical(format!(
                "long form used for length {} (short form required)",
                data[1]
            )));
        }

        Ok(())
    }
}
