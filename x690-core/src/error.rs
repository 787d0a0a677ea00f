use crate::rule::EncodingRule;
use thiserror::Error;

/// Main error type for x690 codec operations
///
/// Every recoverable parse or encode failure is reported through this
/// enum; malformed input never panics. Truncation variants carry both
/// the declared and the available byte counts so callers can see the
/// exact shortfall.
#[derive(Error, Debug)]
pub enum X690Error {
    #[error("empty input where an identifier octet was expected")]
    EmptyIdentifier,

    #[error("empty input where a length octet was expected")]
    EmptyLength,

    #[error("truncated tag: high-tag-number form ends before a terminating octet")]
    TruncatedTag,

    #[error("truncated length: {declared} length octets declared, only {available} available")]
    TruncatedLength { declared: usize, available: usize },

    #[error("truncated content: {declared} bytes declared, only {available} available")]
    TruncatedContent { declared: usize, available: usize },

    #[error("tag number exceeds the 28-bit cap")]
    TagTooLarge,

    #[error("length encoding declares {0} octets (max 4)")]
    LengthTooLarge(usize),

    #[error("indefinite length is not permitted under {0}")]
    IndefiniteProhibited(EncodingRule),

    #[error("offset {offset} is out of bounds (buffer length {len})")]
    OutOfBounds { offset: usize, len: usize },

    #[error("operation not implemented for encoding rule {0}")]
    RuleNotImplemented(EncodingRule),

    #[error("no matching CHOICE alternative for {0}")]
    NoMatchingAlternative(String),

    #[error("CHOICE tag {0} is already registered")]
    DuplicateChoiceTag(u32),

    #[error("non-canonical DER encoding: {0}")]
    DerNonCanonical(String),

    #[error("unexpected tag: expected {expected}, found {found}")]
    UnexpectedTag { expected: u32, found: u32 },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("field {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<X690Error>,
    },
}

impl X690Error {
    /// Annotate an error with the composite field or element it came from
    pub fn in_field(self, field: impl Into<String>) -> Self {
        X690Error::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for x690 codec operations
pub type X690Result<T> = Result<T, X690Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_names_both_operands() {
        let err = X690Error::TruncatedContent {
            declared: 10,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("3"));
    }

    #[test]
    fn test_field_annotation_keeps_source() {
        let err = X690Error::EmptyLength.in_field("version");
        let msg = err.to_string();
        assert!(msg.contains("version"));
        assert!(msg.contains("length octet"));
    }
}
