//! BER/CER/DER TLV codec engine for ASN.1 (ITU-T X.690)
//!
//! Every ASN.1 value is encoded as a TLV (Tag-Length-Value) triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! ## Tag Encoding
//!
//! The tag identifies the type of the data:
//! - **Class** (2 bits): Universal (00), Application (01), Context-specific (10), Private (11)
//! - **Constructed/Primitive** (1 bit): 0 = Primitive, 1 = Constructed
//! - **Tag Number** (5 bits, or high-tag-number continuation octets)
//!
//! ## Length Encoding
//!
//! - **Short form** (1 byte): lengths 0-127, bit 7 clear
//! - **Long form**: bit 7 set, bits 6-0 count the big-endian length octets
//! - **Indefinite form** (`0x80`): content closed by an End-Of-Contents
//!   marker; legal under BER and CER only
//!
//! ## Encoding rules
//!
//! The three rules share this structure and differ in legality checks:
//! DER requires definite, minimal-octet lengths and canonical value
//! forms; CER segments long primitive strings into 1000-byte chunks
//! under an indefinite-length constructed wrapper; BER accepts all
//! forms. [`x690_core::EncodingRule`] carries the per-rule policy.
//!
//! ## Layers
//!
//! - [`ident`]: identifier/length octet parsing and serialization
//! - [`scanner`]: End-Of-Contents search for indefinite lengths
//! - [`tlv`] / [`pdu`]: the decoded unit and the buffer+cursor around
//!   one encoded stream
//! - [`registry`]: type-identity dispatch ([`marshal`]/[`unmarshal`])
//! - [`choice`]: CHOICE alternative registration and resolution
//! - [`composite`]: SET/SEQUENCE field marshaling with canonical SET
//!   ordering
//! - [`primitives`]: the built-in universal types
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use x690_codec::{marshal, unmarshal, Integer};
//! use x690_core::EncodingRule;
//!
//! let mut pdu = marshal(&Integer(12345), EncodingRule::Der)?;
//! let decoded: Integer = unmarshal(&mut pdu)?;
//! # Ok::<(), x690_core::X690Error>(())
//! ```

pub mod choice;
pub mod composite;
pub mod constraint;
pub mod ident;
pub mod pdu;
pub mod primitives;
pub mod registry;
pub mod scanner;
pub mod tlv;

pub use choice::{Choice, Choices, Hint};
pub use composite::{FieldOptions, SequenceOf, SetOf};
pub use constraint::{Constraint, Phase};
pub use ident::{Length, Tag, TagClass};
pub use pdu::Pdu;
pub use primitives::{
    BitString, Boolean, Integer, Null, ObjectIdentifier, OctetString, Utf8String,
};
pub use registry::{
    Asn1Type, Registration, Registry, ValueKind, marshal, marshal_with, unmarshal,
    unmarshal_with,
};
pub use tlv::Tlv;
pub use x690_core::{EncodingRule, X690Error, X690Result};
