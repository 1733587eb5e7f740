// SPDX-License-Identifier: MIT OR Apache-2.0
//! Secret values: render masked everywhere except the parent-facing encode
//! boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A string value whose true contents must never appear in logs or
/// schemas, but which is emitted in cleartext to the parent orchestrator.
///
/// `Debug`, `Display`, and the default `Serialize` impl all render the
/// fixed mask `"**********"`. Only [`SecretValue::reveal`] (used by the
/// value algebra's JSON-encode boundary) returns the true contents.
#[derive(Clone, Deserialize)]
pub struct SecretValue(String);

/// The literal mask secrets render as in logs and schemas.
pub const SECRET_MASK: &str = "**********";

impl SecretValue {
    /// Wrap a string as a secret.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the true cleartext value.
    ///
    /// Only call this at the encode boundary to the parent orchestrator.
    #[must_use]
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue({SECRET_MASK})")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SECRET_MASK)
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(SECRET_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_returns_cleartext() {
        let s = SecretValue::new("sk-abc123");
        assert_eq!(s.reveal(), "sk-abc123");
    }

    #[test]
    fn debug_and_display_mask() {
        let s = SecretValue::new("sk-abc123");
        assert_eq!(format!("{s}"), SECRET_MASK);
        assert_eq!(format!("{s:?}"), format!("SecretValue({SECRET_MASK})"));
    }

    #[test]
    fn serde_serialize_masks() {
        let s = SecretValue::new("sk-abc123");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, format!("\"{SECRET_MASK}\""));
    }

    #[test]
    fn equality_compares_cleartext() {
        assert_eq!(SecretValue::new("x"), SecretValue::new("x"));
        assert_ne!(SecretValue::new("x"), SecretValue::new("y"));
    }
}
