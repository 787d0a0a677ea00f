//! Core types for the x690 ASN.1 codec
//!
//! This crate provides the error taxonomy and the per-encoding-rule
//! policy table shared by every layer of the codec.

pub mod error;
pub mod rule;

pub use error::{X690Error, X690Result};
pub use rule::EncodingRule;
