// SPDX-License-Identifier: MIT OR Apache-2.0
//! The predictor's declared return shape.

use pr_error::{ErrorCode, RunnerError};
use pr_value::{CanonicalValue, CoderRegistry, FieldType, PrimitiveType};

/// The closed set of shapes a predictor's return value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// A single scalar value.
    Single,
    /// A fixed list collected eagerly.
    List,
    /// Items yielded lazily and appended to the response across epochs.
    Iterator,
    /// Like `Iterator`, but elements are strings meant to be displayed
    /// concatenated rather than as a JSON array of parts.
    ConcatIterator,
    /// A structured object with named, ordered fields.
    Object,
}

/// The predictor's return type: a kind tag plus either a scalar primitive
/// or, for `Object`, an ordered field mapping.
///
/// Invariants (spec §3): iterator element types must be `Required`;
/// `ConcatIterator`'s element must be `String`; the output type as a whole
/// is never `Optional`.
#[derive(Debug, Clone)]
pub enum OutputType {
    /// `Single`, `List`, `Iterator`, or `ConcatIterator`, wrapping one
    /// primitive element type.
    Scalar {
        /// Which of the four scalar-ish kinds this is.
        kind: OutputKind,
        /// The element's primitive type.
        element: PrimitiveType,
    },
    /// A structured object with ordered, named fields.
    Object {
        /// Declared fields in output order.
        fields: Vec<(String, FieldType)>,
    },
}

impl OutputType {
    /// Construct and validate a scalar output type.
    pub fn scalar(kind: OutputKind, element: PrimitiveType) -> Result<Self, RunnerError> {
        if kind == OutputKind::ConcatIterator && element != PrimitiveType::String {
            return Err(RunnerError::new(
                ErrorCode::PredictorShapeInvalid,
                "CONCAT_ITERATOR output element must be STRING",
            ));
        }
        Ok(Self::Scalar { kind, element })
    }

    /// Construct an object output type from ordered fields.
    #[must_use]
    pub fn object(fields: Vec<(String, FieldType)>) -> Self {
        Self::Object { fields }
    }

    /// Whether items are produced incrementally (iterator-shaped) rather
    /// than collected before the first response write.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            Self::Scalar { kind: OutputKind::Iterator | OutputKind::ConcatIterator, .. }
        )
    }

    /// Normalize a produced value (or, for streaming kinds, one yielded
    /// item) against this output type.
    pub fn normalize_item(
        &self,
        raw: &serde_json::Value,
        registry: &CoderRegistry,
    ) -> Result<CanonicalValue, RunnerError> {
        match self {
            Self::Scalar { element, .. } => element.normalize(raw, registry),
            Self::Object { fields } => {
                let obj = raw.as_object().ok_or_else(|| {
                    RunnerError::new(ErrorCode::FieldTypeMismatch, "expected an object output")
                })?;
                let mut out = Vec::with_capacity(fields.len());
                for (name, field_type) in fields {
                    let value = obj.get(name).cloned().unwrap_or(serde_json::Value::Null);
                    out.push(field_type.normalize(&value, registry).map_err(|e| {
                        e.with_context("field_name", name.clone())
                    })?);
                }
                Ok(CanonicalValue::List(out))
            }
        }
    }

    /// Encode a normalized item back to a JSON-ready value, the mirror of
    /// [`Self::normalize_item`]. Used by the response writer to attempt
    /// output serialization before attaching a value to a response (spec
    /// §7's "output serialization errors" category).
    pub fn encode_item(
        &self,
        value: &CanonicalValue,
        registry: &CoderRegistry,
    ) -> Result<serde_json::Value, RunnerError> {
        match self {
            Self::Scalar { element, .. } => element.json_encode(value, registry),
            Self::Object { fields } => {
                let items = match value {
                    CanonicalValue::List(items) => items,
                    other => {
                        return Err(RunnerError::new(
                            ErrorCode::OutputEncodingFailed,
                            format!("expected an object output, got {other:?}"),
                        ))
                    }
                };
                let mut obj = serde_json::Map::with_capacity(fields.len());
                for ((name, field_type), item) in fields.iter().zip(items) {
                    obj.insert(name.clone(), field_type.json_encode(item, registry)?);
                }
                Ok(serde_json::Value::Object(obj))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_iterator_requires_string_element() {
        let err = OutputType::scalar(OutputKind::ConcatIterator, PrimitiveType::Integer).unwrap_err();
        assert_eq!(err.code, ErrorCode::PredictorShapeInvalid);
    }

    #[test]
    fn concat_iterator_of_string_is_ok() {
        assert!(OutputType::scalar(OutputKind::ConcatIterator, PrimitiveType::String).is_ok());
    }

    #[test]
    fn iterator_kinds_are_streaming() {
        let t = OutputType::scalar(OutputKind::Iterator, PrimitiveType::String).unwrap();
        assert!(t.is_streaming());
        let t = OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap();
        assert!(!t.is_streaming());
    }

    #[test]
    fn object_normalize_maps_fields_in_order() {
        let t = OutputType::object(vec![
            ("a".into(), FieldType::required(PrimitiveType::Integer)),
            ("b".into(), FieldType::required(PrimitiveType::String)),
        ]);
        let registry = CoderRegistry::new();
        let v = t
            .normalize_item(&serde_json::json!({"a": 1, "b": "x"}), &registry)
            .unwrap();
        assert_eq!(
            v,
            CanonicalValue::List(vec![
                CanonicalValue::Integer(1),
                CanonicalValue::String("x".into()),
            ])
        );
    }

    #[test]
    fn scalar_encode_item_round_trips_normalize() {
        let t = OutputType::scalar(OutputKind::Single, PrimitiveType::Integer).unwrap();
        let registry = CoderRegistry::new();
        let normalized = t.normalize_item(&serde_json::json!(7), &registry).unwrap();
        assert_eq!(t.encode_item(&normalized, &registry).unwrap(), serde_json::json!(7));
    }

    #[test]
    fn object_encode_item_round_trips_fields_by_name() {
        let t = OutputType::object(vec![
            ("a".into(), FieldType::required(PrimitiveType::Integer)),
            ("b".into(), FieldType::required(PrimitiveType::String)),
        ]);
        let registry = CoderRegistry::new();
        let raw = serde_json::json!({"a": 1, "b": "x"});
        let normalized = t.normalize_item(&raw, &registry).unwrap();
        assert_eq!(t.encode_item(&normalized, &registry).unwrap(), raw);
    }
}
