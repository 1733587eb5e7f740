// SPDX-License-Identifier: MIT OR Apache-2.0
//! Closed set of scalar value kinds and their canonical in-memory form.

use crate::coder::CoderRegistry;
use crate::secret::SecretValue;
use pr_error::{ErrorCode, RunnerError};
use serde::{Deserialize, Serialize};

/// The closed set of scalar kinds a predictor field can declare.
///
/// `Custom` defers normalization and encoding to a registered [`crate::Coder`]
/// looked up by `descriptor`; every other variant is handled directly by
/// [`PrimitiveType::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimitiveType {
    /// `true`/`false` only.
    Bool,
    /// Integral numbers; rejects lossy floats (e.g. `1.5`).
    Integer,
    /// Any finite number; widens integers.
    Float,
    /// UTF-8 text.
    String,
    /// A string holding a filesystem path or URI.
    Path,
    /// A string masked in logs and schemas, revealed only at the
    /// parent-encode boundary.
    Secret,
    /// Accepts any JSON value unchanged.
    Any,
    /// Delegates normalize/encode to the coder registered under
    /// `descriptor`.
    Custom {
        /// The registry key this custom type's [`crate::Coder`] is registered
        /// under.
        descriptor: String,
    },
}

/// The canonical in-memory form a [`PrimitiveType`] normalizes into.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    /// JSON `null`.
    Null,
    /// A normalized `Bool` value.
    Bool(bool),
    /// A normalized `Integer` value.
    Integer(i64),
    /// A normalized `Float` value.
    Float(f64),
    /// A normalized `String` value.
    String(String),
    /// A normalized `Path` value.
    Path(String),
    /// A normalized `Secret` value.
    Secret(SecretValue),
    /// A passthrough `Any` value.
    Any(serde_json::Value),
    /// A coder-decoded `Custom` value.
    Custom(serde_json::Value),
    /// A `Repeated` field's element sequence (built by [`crate::FieldType`],
    /// not by `PrimitiveType` itself).
    List(Vec<CanonicalValue>),
}

impl PrimitiveType {
    /// Coerce a loose JSON value into this primitive's canonical form.
    ///
    /// `Integer` rejects floats that aren't exactly representable as an
    /// integer (`1.5` fails, `2.0` succeeds); `Float` accepts both integers
    /// and floats. `Path` and `Secret` accept only JSON strings. `Custom`
    /// looks its coder up in `registry` and fails construction if none is
    /// registered for its descriptor.
    pub fn normalize(
        &self,
        raw: &serde_json::Value,
        registry: &CoderRegistry,
    ) -> Result<CanonicalValue, RunnerError> {
        match self {
            Self::Bool => raw
                .as_bool()
                .map(CanonicalValue::Bool)
                .ok_or_else(|| mismatch("bool", raw)),
            Self::Integer => normalize_integer(raw),
            Self::Float => raw
                .as_f64()
                .map(CanonicalValue::Float)
                .ok_or_else(|| mismatch("float", raw)),
            Self::String => raw
                .as_str()
                .map(|s| CanonicalValue::String(s.to_string()))
                .ok_or_else(|| mismatch("string", raw)),
            Self::Path => raw
                .as_str()
                .map(|s| CanonicalValue::Path(s.to_string()))
                .ok_or_else(|| mismatch("path", raw)),
            Self::Secret => raw
                .as_str()
                .map(|s| CanonicalValue::Secret(SecretValue::new(s)))
                .ok_or_else(|| mismatch("secret", raw)),
            Self::Any => Ok(CanonicalValue::Any(raw.clone())),
            Self::Custom { descriptor } => {
                let coder = registry.require(descriptor)?;
                Ok(CanonicalValue::Custom(coder.decode(raw)?))
            }
        }
    }

    /// The OpenAPI schema fragment for this primitive, ignoring cardinality
    /// (callers wrap `Repeated` fields in `{type: array, items: ...}`).
    #[must_use]
    pub fn json_type(&self) -> serde_json::Value {
        match self {
            Self::Bool => serde_json::json!({"type": "boolean"}),
            Self::Integer => serde_json::json!({"type": "integer"}),
            Self::Float => serde_json::json!({"type": "number"}),
            Self::String => serde_json::json!({"type": "string"}),
            Self::Path => serde_json::json!({"type": "string", "format": "uri"}),
            Self::Secret => serde_json::json!({
                "type": "string",
                "format": "password",
                "writeOnly": true,
                "x-cog-secret": true,
            }),
            Self::Any => serde_json::json!({}),
            Self::Custom { .. } => serde_json::json!({"type": "object"}),
        }
    }

    /// Produce the JSON-ready encoding of a canonical value for this
    /// primitive. `Secret` reveals its cleartext here; every other variant
    /// round-trips its normalized form.
    pub fn json_encode(
        &self,
        value: &CanonicalValue,
        registry: &CoderRegistry,
    ) -> Result<serde_json::Value, RunnerError> {
        match (self, value) {
            (_, CanonicalValue::Null) => Ok(serde_json::Value::Null),
            (Self::Bool, CanonicalValue::Bool(b)) => Ok(serde_json::Value::Bool(*b)),
            (Self::Integer, CanonicalValue::Integer(i)) => {
                Ok(serde_json::Value::Number((*i).into()))
            }
            (Self::Float, CanonicalValue::Float(f)) => Ok(serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)),
            (Self::String, CanonicalValue::String(s)) => Ok(serde_json::Value::String(s.clone())),
            (Self::Path, CanonicalValue::Path(s)) => Ok(serde_json::Value::String(s.clone())),
            (Self::Secret, CanonicalValue::Secret(s)) => {
                Ok(serde_json::Value::String(s.reveal().to_string()))
            }
            (Self::Any, CanonicalValue::Any(v)) => Ok(v.clone()),
            (Self::Custom { descriptor }, CanonicalValue::Custom(v)) => {
                registry.require(descriptor)?.encode(v)
            }
            _ => Err(RunnerError::new(
                ErrorCode::FieldTypeMismatch,
                "canonical value does not match its declared primitive type",
            )),
        }
    }
}

fn normalize_integer(raw: &serde_json::Value) -> Result<CanonicalValue, RunnerError> {
    if let Some(i) = raw.as_i64() {
        return Ok(CanonicalValue::Integer(i));
    }
    if let Some(f) = raw.as_f64() {
        if f.fract() == 0.0 && f.is_finite() {
            return Ok(CanonicalValue::Integer(f as i64));
        }
    }
    Err(mismatch("integer", raw))
}

fn mismatch(expected: &str, raw: &serde_json::Value) -> RunnerError {
    RunnerError::new(
        ErrorCode::FieldTypeMismatch,
        format!("expected {expected}, got {raw}"),
    )
    .with_context("expected", expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::Coder;

    fn reg() -> CoderRegistry {
        CoderRegistry::new()
    }

    #[test]
    fn bool_normalizes() {
        let v = PrimitiveType::Bool.normalize(&serde_json::json!(true), &reg()).unwrap();
        assert_eq!(v, CanonicalValue::Bool(true));
    }

    #[test]
    fn bool_rejects_non_bool() {
        assert!(PrimitiveType::Bool.normalize(&serde_json::json!(1), &reg()).is_err());
    }

    #[test]
    fn integer_accepts_exact_numerics() {
        let v = PrimitiveType::Integer.normalize(&serde_json::json!(7), &reg()).unwrap();
        assert_eq!(v, CanonicalValue::Integer(7));
        let v = PrimitiveType::Integer.normalize(&serde_json::json!(2.0), &reg()).unwrap();
        assert_eq!(v, CanonicalValue::Integer(2));
    }

    #[test]
    fn integer_rejects_lossy_float() {
        assert!(PrimitiveType::Integer.normalize(&serde_json::json!(1.5), &reg()).is_err());
    }

    #[test]
    fn float_widens_integer() {
        let v = PrimitiveType::Float.normalize(&serde_json::json!(3), &reg()).unwrap();
        assert_eq!(v, CanonicalValue::Float(3.0));
    }

    #[test]
    fn string_requires_string() {
        assert!(PrimitiveType::String.normalize(&serde_json::json!(1), &reg()).is_err());
        let v = PrimitiveType::String
            .normalize(&serde_json::json!("hi"), &reg())
            .unwrap();
        assert_eq!(v, CanonicalValue::String("hi".into()));
    }

    #[test]
    fn secret_normalizes_from_string() {
        let v = PrimitiveType::Secret
            .normalize(&serde_json::json!("sk-1"), &reg())
            .unwrap();
        match v {
            CanonicalValue::Secret(s) => assert_eq!(s.reveal(), "sk-1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn any_passes_through() {
        let raw = serde_json::json!({"a": [1, 2]});
        let v = PrimitiveType::Any.normalize(&raw, &reg()).unwrap();
        assert_eq!(v, CanonicalValue::Any(raw));
    }

    #[test]
    fn custom_without_coder_fails() {
        let t = PrimitiveType::Custom { descriptor: "missing".into() };
        let err = t.normalize(&serde_json::json!({}), &reg()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConstraintInvalid);
    }

    struct EchoCoder;
    impl Coder for EchoCoder {
        fn descriptor(&self) -> &str {
            "echo"
        }
        fn decode(&self, raw: &serde_json::Value) -> Result<serde_json::Value, RunnerError> {
            Ok(raw.clone())
        }
        fn encode(&self, value: &serde_json::Value) -> Result<serde_json::Value, RunnerError> {
            Ok(value.clone())
        }
    }

    #[test]
    fn custom_with_coder_round_trips() {
        let registry = reg();
        registry.register(EchoCoder);
        let t = PrimitiveType::Custom { descriptor: "echo".into() };
        let raw = serde_json::json!({"x": 1});
        let normalized = t.normalize(&raw, &registry).unwrap();
        let encoded = t.json_encode(&normalized, &registry).unwrap();
        assert_eq!(encoded, raw);
    }

    #[test]
    fn secret_json_type_is_masked_writeonly() {
        let schema = PrimitiveType::Secret.json_type();
        assert_eq!(schema["x-cog-secret"], serde_json::json!(true));
        assert_eq!(schema["writeOnly"], serde_json::json!(true));
    }

    #[test]
    fn path_json_type_is_uri_string() {
        let schema = PrimitiveType::Path.json_type();
        assert_eq!(schema["format"], serde_json::json!("uri"));
    }

    #[test]
    fn any_json_type_is_empty_schema() {
        assert_eq!(PrimitiveType::Any.json_type(), serde_json::json!({}));
    }

    #[test]
    fn secret_json_encode_reveals_cleartext() {
        let v = CanonicalValue::Secret(SecretValue::new("sk-1"));
        let encoded = PrimitiveType::Secret.json_encode(&v, &reg()).unwrap();
        assert_eq!(encoded, serde_json::json!("sk-1"));
    }

    #[test]
    fn idempotent_normalize_for_non_secret_primitives() {
        let registry = reg();
        for (t, raw) in [
            (PrimitiveType::Bool, serde_json::json!(true)),
            (PrimitiveType::Integer, serde_json::json!(5)),
            (PrimitiveType::Float, serde_json::json!(5.5)),
            (PrimitiveType::String, serde_json::json!("hi")),
            (PrimitiveType::Path, serde_json::json!("/tmp/x")),
        ] {
            let once = t.normalize(&raw, &registry).unwrap();
            let encoded = t.json_encode(&once, &registry).unwrap();
            let twice = t.normalize(&encoded, &registry).unwrap();
            assert_eq!(once, twice);
        }
    }
}
