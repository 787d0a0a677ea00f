//! CHOICE alternative registration and resolution
//!
//! A [`Choices`] registry holds the alternatives of one ASN.1 CHOICE,
//! each with a discriminating context tag. During encode the
//! alternative is selected by the value's runtime type; during decode
//! the observed context tag maps straight back to the alternative's
//! concrete type.
//!
//! Registration takes the writer lock, resolution the read lock, so
//! concurrent registration against one registry is safe.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, RwLock};

use x690_core::{X690Error, X690Result};

use crate::ident::{Length, Tag, TagClass};
use crate::pdu::{self, Pdu};
use crate::registry::{Asn1Type, Registry, ValueKind};
use crate::tlv::Tlv;

/// Disambiguation hint for [`Choices::choose`] when one concrete type
/// is registered under several tags
#[derive(Debug, Clone)]
pub enum Hint {
    /// Select the alternative carrying this tag
    Tag(u32),
    /// Select the alternative whose type name ends with this suffix
    Name(&'static str),
}

fn make_default<T: Asn1Type + Default>() -> Box<dyn Asn1Type> {
    Box::new(T::default())
}

/// One registered CHOICE alternative
#[derive(Debug, Clone)]
pub struct Alternative {
    tag: u32,
    class: TagClass,
    explicit: bool,
    type_id: TypeId,
    type_name: &'static str,
    make: fn() -> Box<dyn Asn1Type>,
}

impl Alternative {
    /// Discriminating tag number
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Tag class on the wire
    pub fn class(&self) -> TagClass {
        self.class
    }

    /// Whether the alternative is EXPLICIT-tagged
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Name of the alternative's concrete type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Construct an empty value of the alternative's type
    pub fn make(&self) -> Box<dyn Asn1Type> {
        (self.make)()
    }
}

/// Registry of the alternatives of one CHOICE
///
/// Built once (manual or automatic tagging), then read-mostly.
pub struct Choices {
    automatic: bool,
    alternatives: RwLock<Vec<Alternative>>,
}

impl Choices {
    /// Create a registry with manual tagging
    ///
    /// Every alternative is registered with its own tag; a duplicate
    /// tag is an error, never a silent overwrite.
    pub fn new() -> Self {
        Self {
            automatic: false,
            alternatives: RwLock::new(Vec::new()),
        }
    }

    /// Create a registry with automatic tagging
    ///
    /// Tags are assigned sequentially from 0 in registration order and
    /// the tagging mode is forced to EXPLICIT: several alternatives
    /// sharing one context-specific class could not otherwise be told
    /// apart structurally.
    pub fn automatic() -> Self {
        Self {
            automatic: true,
            alternatives: RwLock::new(Vec::new()),
        }
    }

    /// Whether this registry assigns tags automatically
    pub fn is_automatic(&self) -> bool {
        self.automatic
    }

    /// Number of registered alternatives
    pub fn len(&self) -> usize {
        self.alternatives.read().expect("choices lock poisoned").len()
    }

    /// Whether no alternative has been registered yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register an alternative under automatic tagging
    ///
    /// # Returns
    /// The assigned tag (sequential, starting at 0).
    ///
    /// # Errors
    /// `InvalidValue` if the registry uses manual tagging.
    pub fn register<T: Asn1Type + Default>(&self) -> X690Result<u32> {
        if !self.automatic {
            return Err(X690Error::InvalidValue(
                "manual-tagging CHOICE requires register_tagged".to_string(),
            ));
        }
        let mut alternatives = self.alternatives.write().expect("choices lock poisoned");
        let tag = alternatives.len() as u32;
        alternatives.push(Alternative {
            tag,
            class: TagClass::ContextSpecific,
            explicit: true,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            make: make_default::<T>,
        });
        Ok(tag)
    }

    /// Register an alternative under manual tagging
    ///
    /// # Errors
    /// - `DuplicateChoiceTag` if the tag is already registered
    /// - `InvalidValue` if the registry uses automatic tagging
    pub fn register_tagged<T: Asn1Type + Default>(
        &self,
        tag: u32,
        explicit: bool,
    ) -> X690Result<u32> {
        if self.automatic {
            return Err(X690Error::InvalidValue(
                "automatic-tagging CHOICE assigns its own tags".to_string(),
            ));
        }
        let mut alternatives = self.alternatives.write().expect("choices lock poisoned");
        if alternatives.iter().any(|alt| alt.tag == tag) {
            return Err(X690Error::DuplicateChoiceTag(tag));
        }
        alternatives.push(Alternative {
            tag,
            class: TagClass::ContextSpecific,
            explicit,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            make: make_default::<T>,
        });
        Ok(tag)
    }

    /// Select the alternative matching a value's runtime type
    ///
    /// If the same type is registered under several tags a
    /// disambiguating [`Hint`] is required.
    ///
    /// # Errors
    /// `NoMatchingAlternative` naming the offending type when no
    /// alternative matches, or when the match is ambiguous and no hint
    /// (or a non-matching hint) was supplied.
    pub fn choose(&self, value: &dyn Asn1Type, hint: Option<&Hint>) -> X690Result<Alternative> {
        let alternatives = self.alternatives.read().expect("choices lock poisoned");
        let type_id = value.as_any().type_id();
        let matches: Vec<&Alternative> = alternatives
            .iter()
            .filter(|alt| alt.type_id == type_id)
            .collect();

        match (matches.len(), hint) {
            (0, _) => Err(X690Error::NoMatchingAlternative(value.display())),
            (1, None) => Ok(matches[0].clone()),
            (_, Some(Hint::Tag(tag))) => matches
                .iter()
                .find(|alt| alt.tag == *tag)
                .map(|alt| (*alt).clone())
                .ok_or_else(|| X690Error::NoMatchingAlternative(value.display())),
            (_, Some(Hint::Name(name))) => matches
                .iter()
                .find(|alt| alt.type_name.ends_with(name))
                .map(|alt| (*alt).clone())
                .ok_or_else(|| X690Error::NoMatchingAlternative(value.display())),
            (n, None) => {
                log::debug!("ambiguous CHOICE: {} alternatives match", n);
                Err(X690Error::NoMatchingAlternative(value.display()))
            }
        }
    }

    /// Look up an alternative by its observed tag (decode path)
    pub fn by_tag(&self, tag: u32) -> Option<Alternative> {
        let alternatives = self.alternatives.read().expect("choices lock poisoned");
        alternatives.iter().find(|alt| alt.tag == tag).cloned()
    }
}

impl Default for Choices {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Choices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Choices")
            .field("automatic", &self.automatic)
            .field("len", &self.len())
            .finish()
    }
}

/// A CHOICE value: one selected alternative plus its registry
///
/// Encoded bare, the value serializes as exactly the chosen
/// alternative's encoding under the alternative's registered tagging;
/// an unconstrained CHOICE carries no tag of its own.
#[derive(Debug)]
pub struct Choice {
    choices: Arc<Choices>,
    selected: Option<Box<dyn Asn1Type>>,
    hint: Option<Hint>,
}

impl Choice {
    /// Create an unselected CHOICE over a registry
    pub fn new(choices: Arc<Choices>) -> Self {
        Self {
            choices,
            selected: None,
            hint: None,
        }
    }

    /// Create a CHOICE with a selected alternative value
    pub fn selecting<T: Asn1Type>(choices: Arc<Choices>, value: T) -> Self {
        Self {
            choices,
            selected: Some(Box::new(value)),
            hint: None,
        }
    }

    /// Attach a disambiguation hint for encode-time resolution
    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Select an alternative value
    pub fn select<T: Asn1Type>(&mut self, value: T) {
        self.selected = Some(Box::new(value));
    }

    /// The selected alternative, if any
    pub fn selected(&self) -> Option<&dyn Asn1Type> {
        self.selected.as_deref()
    }

    /// Downcast the selected alternative to a concrete type
    pub fn value<T: Asn1Type>(&self) -> Option<&T> {
        self.selected
            .as_deref()
            .and_then(|v| v.as_any().downcast_ref::<T>())
    }

    fn selected_or_err(&self) -> X690Result<&dyn Asn1Type> {
        self.selected
            .as_deref()
            .ok_or_else(|| X690Error::NoMatchingAlternative("<unselected CHOICE>".to_string()))
    }
}

impl Asn1Type for Choice {
    fn tag(&self) -> Tag {
        match self.selected_or_err() {
            Ok(inner) => match self.choices.choose(inner, self.hint.as_ref()) {
                Ok(alt) => Tag::new(alt.class(), alt.is_explicit(), alt.tag()),
                Err(_) => inner.tag(),
            },
            Err(_) => Tag::context(false, 0),
        }
    }

    fn write(&self, registry: &Registry, pdu: &mut Pdu) -> X690Result<usize> {
        let inner = self.selected_or_err()?;
        let alt = self.choices.choose(inner, self.hint.as_ref())?;

        // Encode the alternative on its own, then apply its tagging
        let mut scratch = Pdu::new(pdu.rule());
        crate::registry::encode_value(registry, inner, &mut scratch)?;

        if alt.is_explicit() {
            let wrapper = Tlv::new(
                Tag::new(alt.class(), true, alt.tag()),
                scratch.data().to_vec(),
                pdu.rule(),
            );
            pdu.write_tlv(&wrapper)
        } else {
            scratch.rewind();
            let mut inner_tlv = scratch.tlv()?;
            inner_tlv.retag(alt.class(), alt.tag());
            pdu.write_tlv(&inner_tlv)
        }
    }

    fn read(&mut self, registry: &Registry, tlv: &Tlv) -> X690Result<()> {
        let alt = self
            .choices
            .by_tag(tlv.tag())
            .ok_or_else(|| X690Error::NoMatchingAlternative(format!("tag {}", tlv.tag())))?;
        let mut value = alt.make();

        if alt.is_explicit() {
            // The context TLV wraps exactly one inner encoding
            let children = pdu::read_children(tlv)?;
            let inner = match children.as_slice() {
                [inner] => inner,
                [] => {
                    return Err(X690Error::InvalidValue(
                        "empty EXPLICIT CHOICE wrapper".to_string(),
                    ));
                }
                extra => {
                    return Err(X690Error::InvalidValue(format!(
                        "{} extra TLVs in EXPLICIT CHOICE wrapper",
                        extra.len() - 1
                    )));
                }
            };
            crate::registry::decode_value(registry, value.as_mut(), inner)?;
        } else {
            // The context tag replaced the alternative's own identifier
            let native = value.tag().with_constructed(tlv.is_constructed());
            let inner = Tlv::from_parts(
                native,
                Length::Definite(tlv.value().len()),
                tlv.value().to_vec(),
                tlv.rule(),
            )?;
            crate::registry::decode_value(registry, value.as_mut(), &inner)?;
        }

        self.selected = Some(value);
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.selected.as_deref().map_or(0, |v| v.byte_len())
    }

    fn display(&self) -> String {
        match self.selected.as_deref() {
            Some(inner) => format!("CHOICE {{ {} }}", inner.display()),
            None => "CHOICE { }".to_string(),
        }
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Choice
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
