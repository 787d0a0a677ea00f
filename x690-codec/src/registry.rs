//! Type registry and codec dispatch
//!
//! Maps a value's type identity (its [`TypeId`]) to a registration
//! record holding a factory and optional verifiers, wire overrides and
//! constraints. [`marshal`]/[`unmarshal`] resolve a value's type against
//! the registry and route encoding/decoding through the registered
//! entry, falling back on the value's own contract when the type is not
//! registered.
//!
//! # Concurrency
//!
//! Registration mutates a shared map and is guarded by a writer lock;
//! lookups take the read lock only. The process-wide registry is a
//! lazily-initialized singleton pre-loaded with the built-in primitive
//! types; an application can also construct its own [`Registry`] and use
//! the `*_with` entry points.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use x690_core::{EncodingRule, X690Result};

use crate::composite;
use crate::constraint::{self, Constraint, Phase};
use crate::ident::Tag;
use crate::pdu::Pdu;
use crate::tlv::Tlv;

/// Structural shape of a value, used by the dispatch fallback ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Self-describing leaf value
    Primitive,
    /// Tagged union over registered alternatives
    Choice,
    /// Ordered aggregate (SEQUENCE / SEQUENCE OF)
    Sequence,
    /// Unordered aggregate (SET / SET OF)
    Set,
}

/// Contract every codec-visible type satisfies
///
/// A type exposes its default tag, a self-describing encode/decode
/// pair, its logical length (for size constraints) and a human-readable
/// form. Aggregate types additionally report their shape through
/// [`kind`](Asn1Type::kind) and their children through
/// [`elements`](Asn1Type::elements).
pub trait Asn1Type: Any + fmt::Debug + Send {
    /// Default identifier for this type
    fn tag(&self) -> Tag;

    /// Encode this value as one TLV into `pdu`
    ///
    /// Aggregate types dispatch their children through `registry`, so
    /// registrations apply at every nesting level; leaves ignore it.
    ///
    /// # Returns
    /// The number of bytes written.
    fn write(&self, registry: &Registry, pdu: &mut Pdu) -> X690Result<usize>;

    /// Fill this value from a decoded TLV
    ///
    /// Must consume exactly the TLV body; a body that disagrees with
    /// the type's expectations is an error, never a best guess.
    /// Aggregate types dispatch their children through `registry`.
    fn read(&mut self, registry: &Registry, tlv: &Tlv) -> X690Result<()>;

    /// Logical content length in bytes, as used by size constraints
    fn byte_len(&self) -> usize;

    /// Human-readable form of the value
    fn display(&self) -> String;

    /// Structural shape, driving the dispatch fallback ladder
    fn kind(&self) -> ValueKind {
        ValueKind::Primitive
    }

    /// Child values of an aggregate (empty for leaves)
    fn elements(&self) -> Vec<&dyn Asn1Type> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Decode-time pre-check over the raw TLV body
pub type Verifier = Box<dyn Fn(&[u8]) -> X690Result<()> + Send + Sync>;

/// Replacement encoder: produces the TLV body, keeping the type's tag
pub type EncodeOverride = Box<dyn Fn(&dyn Asn1Type) -> X690Result<Vec<u8>> + Send + Sync>;

/// Replacement decoder: fills the value from the decoded TLV
pub type DecodeOverride = Box<dyn Fn(&mut dyn Asn1Type, &Tlv) -> X690Result<()> + Send + Sync>;

fn make_default<T: Asn1Type + Default>() -> Box<dyn Asn1Type> {
    Box::new(T::default())
}

/// One registry entry: factory plus optional behaviour attachments
pub struct Registration {
    factory: fn() -> Box<dyn Asn1Type>,
    type_name: &'static str,
    verifiers: Vec<Verifier>,
    encode_override: Option<EncodeOverride>,
    decode_override: Option<DecodeOverride>,
    constraints: Vec<Constraint>,
    phase: Phase,
}

impl Registration {
    /// Default registration for a type: factory only, no attachments
    pub fn of<T: Asn1Type + Default>() -> Self {
        Self {
            factory: make_default::<T>,
            type_name: std::any::type_name::<T>(),
            verifiers: Vec::new(),
            encode_override: None,
            decode_override: None,
            constraints: Vec::new(),
            phase: Phase::Both,
        }
    }

    /// Add a decode-time pre-check over the raw body bytes
    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifiers.push(verifier);
        self
    }

    /// Replace the default wire representation, keeping the type's tag
    pub fn with_overrides(mut self, encode: EncodeOverride, decode: DecodeOverride) -> Self {
        self.encode_override = Some(encode);
        self.decode_override = Some(decode);
        self
    }

    /// Attach a constraint to the registration's constraint group
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Set the phase the constraint group runs at
    pub fn at_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Construct an empty value of the registered type
    pub fn make(&self) -> Box<dyn Asn1Type> {
        (self.factory)()
    }

    /// Name of the registered type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("type_name", &self.type_name)
            .field("verifiers", &self.verifiers.len())
            .field("constraints", &self.constraints.len())
            .field("phase", &self.phase)
            .finish()
    }
}

/// Type-identity keyed registration table
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<TypeId, Arc<Registration>>>,
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::with_builtins);

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with the built-in primitive types
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::primitives::register_builtins(&registry);
        registry
    }

    /// The process-wide registry (built-ins pre-registered)
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Register a type with a default registration
    ///
    /// Registering the same type again replaces the entry; this is not
    /// an error.
    pub fn register<T: Asn1Type + Default>(&self) {
        self.register_with::<T>(Registration::of::<T>());
    }

    /// Register a type with an explicit registration record
    pub fn register_with<T: Asn1Type>(&self, registration: Registration) {
        log::trace!("registering {}", registration.type_name);
        let mut entries = self.entries.write().expect("registry lock poisoned");
        entries.insert(TypeId::of::<T>(), Arc::new(registration));
    }

    /// Look up the registration for a type identity
    pub fn lookup(&self, type_id: TypeId) -> Option<Arc<Registration>> {
        let entries = self.entries.read().expect("registry lock poisoned");
        entries.get(&type_id).cloned()
    }
}

/// Encode `value` under `rule` through the process-wide registry
///
/// Returns a PDU holding the complete encoding, cursor rewound to 0.
pub fn marshal(value: &dyn Asn1Type, rule: EncodingRule) -> X690Result<Pdu> {
    marshal_with(Registry::global(), value, rule)
}

/// Encode `value` under `rule` through an explicit registry
pub fn marshal_with(
    registry: &Registry,
    value: &dyn Asn1Type,
    rule: EncodingRule,
) -> X690Result<Pdu> {
    let mut pdu = Pdu::new(rule);
    encode_value(registry, value, &mut pdu)?;
    pdu.rewind();
    Ok(pdu)
}

/// Decode the next TLV in `pdu` into a `T` via the process-wide registry
pub fn unmarshal<T: Asn1Type + Default>(pdu: &mut Pdu) -> X690Result<T> {
    unmarshal_with(Registry::global(), pdu)
}

/// Decode the next TLV in `pdu` into a `T` via an explicit registry
pub fn unmarshal_with<T: Asn1Type + Default>(
    registry: &Registry,
    pdu: &mut Pdu,
) -> X690Result<T> {
    let tlv = pdu.tlv()?;
    let mut value = T::default();
    decode_value(registry, &mut value, &tlv)?;
    Ok(value)
}

/// Dispatch one value onto `pdu`
///
/// Resolution order: a registration for the value's type identity;
/// otherwise the fallback ladder, where CHOICE values and
/// self-describing primitives encode themselves and aggregates are
/// iterated element by element. The registry is threaded through so
/// nested values resolve against it too.
pub(crate) fn encode_value(
    registry: &Registry,
    value: &dyn Asn1Type,
    pdu: &mut Pdu,
) -> X690Result<usize> {
    if let Some(entry) = registry.lookup(value.as_any().type_id()) {
        log::trace!("encode {} via registration", entry.type_name);
        if entry.phase.applies_on_encode() {
            constraint::run(&entry.constraints, value)?;
        }
        if let Some(encode) = &entry.encode_override {
            let body = encode(value)?;
            let tlv = Tlv::new(value.tag(), body, pdu.rule());
            return pdu.write_tlv(&tlv);
        }
        return value.write(registry, pdu);
    }

    match value.kind() {
        ValueKind::Primitive | ValueKind::Choice => value.write(registry, pdu),
        ValueKind::Sequence => composite::write_elements(registry, value, pdu, false),
        ValueKind::Set => composite::write_elements(registry, value, pdu, true),
    }
}

/// Dispatch one decoded TLV into `target`
pub(crate) fn decode_value(
    registry: &Registry,
    target: &mut dyn Asn1Type,
    tlv: &Tlv,
) -> X690Result<()> {
    let type_id = target.as_any().type_id();
    if let Some(entry) = registry.lookup(type_id) {
        log::trace!("decode {} via registration", entry.type_name);
        for verifier in &entry.verifiers {
            verifier(tlv.value())?;
        }
        if let Some(decode) = &entry.decode_override {
            decode(target, tlv)?;
        } else {
            target.read(registry, tlv)?;
        }
        if entry.phase.applies_on_decode() {
            constraint::run(&entry.constraints, target)?;
        }
        return Ok(());
    }

    target.read(registry, tlv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::SequenceOf;
    use crate::constraint::size_range;
    use crate::primitives::{Integer, OctetString};
    use x690_core::X690Error;

    #[test]
    fn test_marshal_unmarshal_round_trip() {
        for rule in [EncodingRule::Ber, EncodingRule::Cer, EncodingRule::Der] {
            let value = Integer(-129);
            let mut pdu = marshal(&value, rule).unwrap();
            let decoded: Integer = unmarshal(&mut pdu).unwrap();
            assert_eq!(decoded, value, "rule {}", rule);
        }
    }

    #[test]
    fn test_unregistered_type_uses_own_contract() {
        #[derive(Debug, Default, PartialEq)]
        struct Flag(bool);

        impl Asn1Type for Flag {
            fn tag(&self) -> Tag {
                Tag::universal(false, 1)
            }
            fn write(&self, _registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
                let body = vec![if self.0 { 0xFF } else { 0x00 }];
                pdu.write_tlv(&Tlv::new(self.tag(), body, pdu.rule()))
            }
            fn read(&mut self, _registry: &Registry, tlv: &Tlv) -> X690Result<()> {
                self.0 = tlv.value() != [0x00];
                Ok(())
            }
            fn byte_len(&self) -> usize {
                1
            }
            fn display(&self) -> String {
                self.0.to_string()
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let mut pdu = marshal(&Flag(true), EncodingRule::Der).unwrap();
        let decoded: Flag = unmarshal(&mut pdu).unwrap();
        assert_eq!(decoded, Flag(true));
    }

    #[test]
    fn test_constraint_runs_at_registered_phase() {
        let registry = Registry::with_builtins();
        registry.register_with::<OctetString>(
            Registration::of::<OctetString>()
                .with_constraint(size_range(0, 2))
                .at_phase(Phase::Encode),
        );

        let long = OctetString(vec![0; 5]);
        let err = marshal_with(&registry, &long, EncodingRule::Der).unwrap_err();
        assert!(matches!(err, X690Error::Constraint(_)));

        // Decode phase is not registered: the same bytes decode fine
        let bytes = marshal(&long, EncodingRule::Der).unwrap();
        let mut pdu = Pdu::from_bytes(bytes.data(), EncodingRule::Der);
        let decoded: OctetString = unmarshal_with(&registry, &mut pdu).unwrap();
        assert_eq!(decoded, long);
    }

    #[test]
    fn test_verifier_rejects_raw_body() {
        let registry = Registry::with_builtins();
        registry.register_with::<Integer>(Registration::of::<Integer>().with_verifier(
            Box::new(|body| {
                if body.first() == Some(&0x80) {
                    return Err(X690Error::InvalidValue("negative not allowed".to_string()));
                }
                Ok(())
            }),
        ));

        let mut pdu = Pdu::from_bytes(&[0x02, 0x01, 0x80], EncodingRule::Der);
        let result: X690Result<Integer> = unmarshal_with(&registry, &mut pdu);
        assert!(matches!(result, Err(X690Error::InvalidValue(_))));
    }

    /// Registry whose Integers travel as ASCII decimal, same tag
    fn ascii_integer_registry() -> Registry {
        let registry = Registry::with_builtins();
        registry.register_with::<Integer>(Registration::of::<Integer>().with_overrides(
            Box::new(|value| {
                let integer = value
                    .as_any()
                    .downcast_ref::<Integer>()
                    .ok_or_else(|| X690Error::InvalidValue("not an Integer".to_string()))?;
                Ok(integer.0.to_string().into_bytes())
            }),
            Box::new(|target, tlv| {
                let integer = target
                    .as_any_mut()
                    .downcast_mut::<Integer>()
                    .ok_or_else(|| X690Error::InvalidValue("not an Integer".to_string()))?;
                let text = std::str::from_utf8(tlv.value())
                    .map_err(|e| X690Error::InvalidValue(e.to_string()))?;
                integer.0 = text
                    .parse()
                    .map_err(|_| X690Error::InvalidValue(format!("bad integer {:?}", text)))?;
                Ok(())
            }),
        ));
        registry
    }

    #[test]
    fn test_override_replaces_wire_form() {
        let registry = ascii_integer_registry();
        let mut pdu = marshal_with(&registry, &Integer(42), EncodingRule::Ber).unwrap();
        assert_eq!(pdu.data(), &[0x02, 0x02, b'4', b'2']);
        let decoded: Integer = unmarshal_with(&registry, &mut pdu).unwrap();
        assert_eq!(decoded, Integer(42));
    }

    #[test]
    fn test_explicit_registry_reaches_nested_values() {
        // The override must apply to container children, not just the
        // top-level value.
        let registry = ascii_integer_registry();
        let value = SequenceOf(vec![Integer(42)]);
        let mut pdu = marshal_with(&registry, &value, EncodingRule::Ber).unwrap();
        assert_eq!(pdu.data(), &[0x30, 0x04, 0x02, 0x02, b'4', b'2']);

        let decoded: SequenceOf<Integer> = unmarshal_with(&registry, &mut pdu).unwrap();
        assert_eq!(decoded, value);

        // The same bytes through the global registry decode the ASCII
        // digits as raw two's complement.
        let mut raw = Pdu::from_bytes(&[0x30, 0x04, 0x02, 0x02, b'4', b'2'], EncodingRule::Ber);
        let plain: SequenceOf<Integer> = unmarshal(&mut raw).unwrap();
        assert_eq!(plain, SequenceOf(vec![Integer(0x3432)]));
    }

    #[test]
    fn test_reregistration_replaces_entry() {
        let registry = Registry::new();
        registry.register::<Integer>();
        registry.register::<Integer>();
        assert!(registry.lookup(TypeId::of::<Integer>()).is_some());
    }
}
