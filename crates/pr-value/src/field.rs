// SPDX-License-Identifier: MIT OR Apache-2.0
//! A primitive type plus cardinality: the unit a predictor's input/output
//! schema is actually built from.

use crate::coder::CoderRegistry;
use crate::primitive::{CanonicalValue, PrimitiveType};
use crate::Repetition;
use pr_error::{ErrorCode, RunnerError};

/// A [`PrimitiveType`] combined with a [`Repetition`].
///
/// `normalize` and `json_type` both dispatch on cardinality first, then
/// defer to the wrapped primitive for each scalar element.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    /// The scalar kind each element of this field carries.
    pub primitive: PrimitiveType,
    /// Whether the field is required, optional, or repeated.
    pub repetition: Repetition,
}

impl FieldType {
    /// Construct a required field of the given primitive.
    #[must_use]
    pub fn required(primitive: PrimitiveType) -> Self {
        Self { primitive, repetition: Repetition::Required }
    }

    /// Construct an optional field of the given primitive.
    #[must_use]
    pub fn optional(primitive: PrimitiveType) -> Self {
        Self { primitive, repetition: Repetition::Optional }
    }

    /// Construct a repeated field of the given primitive.
    #[must_use]
    pub fn repeated(primitive: PrimitiveType) -> Self {
        Self { primitive, repetition: Repetition::Repeated }
    }

    /// Coerce a loose JSON value into canonical form, honoring cardinality:
    /// `Required` rejects `null`, `Optional` passes `null` straight through,
    /// `Repeated` validates the value is an array and maps the primitive's
    /// normalize over each element.
    pub fn normalize(
        &self,
        raw: &serde_json::Value,
        registry: &CoderRegistry,
    ) -> Result<CanonicalValue, RunnerError> {
        if raw.is_null() {
            return if self.repetition.allows_null() {
                Ok(CanonicalValue::Null)
            } else {
                Err(RunnerError::new(ErrorCode::FieldRequired, "field is required"))
            };
        }
        if self.repetition.is_repeated() {
            let items = raw.as_array().ok_or_else(|| {
                RunnerError::new(ErrorCode::FieldTypeMismatch, "expected an array")
            })?;
            let normalized = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    self.primitive.normalize(item, registry).map_err(|e| {
                        e.with_context("index", i)
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(CanonicalValue::List(normalized));
        }
        self.primitive.normalize(raw, registry)
    }

    /// Produce the JSON-ready encoding of a canonical value for this field,
    /// wrapping `Repeated` results back into a JSON array.
    pub fn json_encode(
        &self,
        value: &CanonicalValue,
        registry: &CoderRegistry,
    ) -> Result<serde_json::Value, RunnerError> {
        match value {
            CanonicalValue::Null => Ok(serde_json::Value::Null),
            CanonicalValue::List(items) => {
                let encoded = items
                    .iter()
                    .map(|item| self.primitive.json_encode(item, registry))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(serde_json::Value::Array(encoded))
            }
            scalar => self.primitive.json_encode(scalar, registry),
        }
    }

    /// The OpenAPI schema fragment for this field, wrapping `Repeated`
    /// fields as `{type: array, items: ...}`.
    #[must_use]
    pub fn json_type(&self) -> serde_json::Value {
        let inner = self.primitive.json_type();
        if self.repetition.is_repeated() {
            serde_json::json!({"type": "array", "items": inner})
        } else {
            inner
        }
    }
}
