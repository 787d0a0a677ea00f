//! Constraint execution
//!
//! Constraints are ordered lists of predicates attached to a type
//! registration and executed at a configured phase. The codec runs the
//! list, stops at the first failure and surfaces it unchanged.

use crate::registry::Asn1Type;
use x690_core::{X690Error, X690Result};

/// When a registered constraint group runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Only while encoding
    Encode,
    /// Only while decoding
    Decode,
    /// On both paths
    Both,
}

impl Phase {
    pub fn applies_on_encode(self) -> bool {
        matches!(self, Phase::Encode | Phase::Both)
    }

    pub fn applies_on_decode(self) -> bool {
        matches!(self, Phase::Decode | Phase::Both)
    }
}

/// A single validation predicate over a value
pub type Constraint = Box<dyn Fn(&dyn Asn1Type) -> X690Result<()> + Send + Sync>;

/// Run a constraint list, stopping at the first failure
pub fn run(constraints: &[Constraint], value: &dyn Asn1Type) -> X690Result<()> {
    for constraint in constraints {
        constraint(value)?;
    }
    Ok(())
}

/// Stock constraint: the value's logical length must be within
/// `min..=max` bytes
pub fn size_range(min: usize, max: usize) -> Constraint {
    Box::new(move |value| {
        let len = value.byte_len();
        if len < min || len > max {
            return Err(X690Error::Constraint(format!(
                "size {} outside {}..={}",
                len, min, max
            )));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::OctetString;

    #[test]
    fn test_run_stops_at_first_failure() {
        let constraints: Vec<Constraint> = vec![
            size_range(0, 2),
            Box::new(|_| Err(X690Error::Constraint("unreachable".to_string()))),
        ];
        let value = OctetString(vec![0; 5]);
        let err = run(&constraints, &value).unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_size_range() {
        let constraint = size_range(1, 4);
        assert!(constraint(&OctetString(vec![0; 4])).is_ok());
        assert!(constraint(&OctetString(vec![])).is_err());
    }

    #[test]
    fn test_phase() {
        assert!(Phase::Both.applies_on_encode());
        assert!(Phase::Both.applies_on_decode());
        assert!(Phase::Encode.applies_on_encode());
        assert!(!Phase::Encode.applies_on_decode());
        assert!(!Phase::Decode.applies_on_encode());
    }
}
