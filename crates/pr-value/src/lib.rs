// SPDX-License-Identifier: MIT OR Apache-2.0
//! pr-value
//!
//! Typed value algebra for predictor input/output fields.
//!
//! A [`PrimitiveType`] has a canonical in-memory form ([`CanonicalValue`]), a
//! JSON-schema fragment ([`PrimitiveType::json_type`]), and a normalization
//! rule that coerces a loose JSON input into the canonical form
//! ([`PrimitiveType::normalize`]). [`Repetition`] layers optional/required/
//! repeated cardinality on top via [`FieldType`]. [`Coder`] lets custom
//! (dataclass-shaped) values plug into the same normalize/encode pipeline.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod coder;
mod field;
mod primitive;
mod secret;

pub use coder::{Coder, CoderRegistry};
pub use field::FieldType;
pub use primitive::{CanonicalValue, PrimitiveType};
pub use secret::SecretValue;

/// Closed set of cardinality rules a [`FieldType`] can carry.
///
/// `Required` fields must have a non-null value; `Optional` fields permit
/// the JSON null value to pass through untouched; `Repeated` fields wrap
/// the primitive in an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repetition {
    /// The field must carry a non-null value.
    Required,
    /// The field may be absent or null.
    Optional,
    /// The field is a sequence of values, each validated independently.
    Repeated,
}

impl Repetition {
    /// Returns `true` if `Repetition::Optional` permits the JSON null
    /// value to pass through this field untouched.
    #[must_use]
    pub fn allows_null(&self) -> bool {
        matches!(self, Self::Optional)
    }

    /// Returns `true` if values under this repetition are wrapped in an
    /// ordered sequence.
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        matches!(self, Self::Repeated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_allows_null() {
        assert!(Repetition::Optional.allows_null());
        assert!(!Repetition::Required.allows_null());
        assert!(!Repetition::Repeated.allows_null());
    }

    #[test]
    fn repeated_is_repeated() {
        assert!(Repetition::Repeated.is_repeated());
        assert!(!Repetition::Required.is_repeated());
    }

    #[test]
    fn repetition_serde_roundtrip() {
        for r in [Repetition::Required, Repetition::Optional, Repetition::Repeated] {
            let json = serde_json::to_string(&r).unwrap();
            let back: Repetition = serde_json::from_str(&json).unwrap();
            assert_eq!(back, r);
        }
    }
}
