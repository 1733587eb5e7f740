// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uniform invocation surface over a user predictor: setup, input
//! validation, and predict dispatch, regardless of which of the four call
//! shapes the predictor implements.

use crate::callable::PredictCallable;
use async_trait::async_trait;
use indexmap::IndexMap;
use pr_error::{ErrorCode, RunnerError};
use pr_schema::PredictorInfo;
use pr_value::{CanonicalValue, CoderRegistry};
use std::path::Path;
use std::sync::Arc;

/// Environment variable the adapter reads to source a weights URL for the
/// user predictor's `setup`, per spec §6.
pub const WEIGHTS_URL_ENV: &str = "COG_WEIGHTS";

/// Well-known local path checked for predictor weights when no URL is
/// configured.
pub const WEIGHTS_LOCAL_PATH: &str = "./weights";

/// Where predictor weights were sourced from, passed to
/// [`PredictorImpl::setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsSource {
    /// An environment-provided URL.
    Url(String),
    /// A well-known local path that exists on disk.
    LocalPath(String),
}

impl WeightsSource {
    /// The string the predictor's `setup` should treat as its weights
    /// location, regardless of which variant this is.
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Url(s) | Self::LocalPath(s) => s,
        }
    }
}

/// Resolve a weights source: environment URL first, else the well-known
/// local path if it exists, else `None`. Mirrors spec §4.5's setup rule.
#[must_use]
pub fn resolve_weights_source() -> Option<WeightsSource> {
    if let Ok(url) = std::env::var(WEIGHTS_URL_ENV) {
        if !url.is_empty() {
            return Some(WeightsSource::Url(url));
        }
    }
    if Path::new(WEIGHTS_LOCAL_PATH).exists() {
        return Some(WeightsSource::LocalPath(WEIGHTS_LOCAL_PATH.to_string()));
    }
    None
}

/// The user-provided entry point, in its normalized form.
///
/// A statically typed runtime has no annotation reflection to walk, so the
/// predictor author implements this trait directly instead of the adapter
/// discovering `setup`/`predict` by introspecting a class (see
/// `pr-schema`'s `PredictorBuilder` doc comment for the same trade-off on
/// the schema side).
#[async_trait]
pub trait PredictorImpl: Send + Sync {
    /// Run one-time setup, given the resolved weights source (if any).
    /// Default is a no-op, for predictors that declare no weights
    /// parameter.
    async fn setup(&self, _weights: Option<WeightsSource>) -> Result<(), RunnerError> {
        Ok(())
    }

    /// Invoke the predictor with already-validated, normalized inputs.
    /// Returns uniformly regardless of whether the implementation is
    /// sync, async, or a (a)sync generator.
    fn predict(&self, inputs: IndexMap<String, CanonicalValue>) -> PredictCallable;
}

/// Binds a [`PredictorInfo`] schema to a [`PredictorImpl`], performing
/// input validation and output normalization uniformly around whatever the
/// implementation does.
pub struct PredictorAdapter {
    info: PredictorInfo,
    registry: CoderRegistry,
    imp: Arc<dyn PredictorImpl>,
}

impl PredictorAdapter {
    /// Bind a schema to an implementation and the coder registry used to
    /// normalize/encode `CUSTOM` fields.
    #[must_use]
    pub fn new(info: PredictorInfo, registry: CoderRegistry, imp: Arc<dyn PredictorImpl>) -> Self {
        Self { info, registry, imp }
    }

    /// The bound schema.
    #[must_use]
    pub fn info(&self) -> &PredictorInfo {
        &self.info
    }

    /// Run predictor setup, resolving a weights source first.
    pub async fn setup(&self) -> Result<(), RunnerError> {
        self.imp.setup(resolve_weights_source()).await
    }

    /// Validate a request's raw `input` object against the declared
    /// schema (spec §4.5 `check_input`):
    ///
    /// 1. Every supplied field is normalized via its `FieldType`; unknown
    ///    keys are discarded with a warning, not an error.
    /// 2. Every missing field is defaulted; a missing required field with
    ///    no default fails with `FIELD_REQUIRED`.
    /// 3. The normalized value is checked against its declared
    ///    constraints, element-wise for `REPEATED` fields.
    pub fn check_input(
        &self,
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<IndexMap<String, CanonicalValue>, RunnerError> {
        for key in raw.keys() {
            if self.info.input(key).is_none() {
                tracing::warn!(field = %key, "unknown input field discarded");
            }
        }

        let mut out = IndexMap::with_capacity(self.info.inputs.len());
        for field in self.info.ordered_inputs() {
            let normalized = match raw.get(&field.name) {
                Some(value) => field.field_type.normalize(value, &self.registry)?,
                None => match &field.default {
                    Some(default) => field.field_type.normalize(default, &self.registry)?,
                    None => {
                        if field.field_type.repetition.allows_null() {
                            CanonicalValue::Null
                        } else {
                            return Err(RunnerError::new(ErrorCode::FieldRequired, "Field required")
                                .with_context("field", field.name.clone()));
                        }
                    }
                },
            };
            field
                .constraints
                .check(&field.name, &normalized)
                .map_err(|e| e.with_context("field", field.name.clone()))?;
            out.insert(field.name.clone(), normalized);
        }
        Ok(out)
    }

    /// Dispatch to the bound implementation with already-validated inputs.
    #[must_use]
    pub fn call(&self, inputs: IndexMap<String, CanonicalValue>) -> PredictCallable {
        self.imp.predict(inputs)
    }

    /// Normalize one produced value (a full result for non-streaming
    /// output kinds, or a single yielded item for streaming ones) against
    /// the declared [`pr_schema::OutputType`].
    pub fn normalize_output(&self, raw: &serde_json::Value) -> Result<CanonicalValue, RunnerError> {
        self.info.output.normalize_item(raw, &self.registry)
    }

    /// Encode a normalized output value back to JSON, attempting
    /// serialization before it is attached to a response (spec §7's
    /// output-serialization-error category).
    pub fn encode_output(&self, value: &CanonicalValue) -> Result<serde_json::Value, RunnerError> {
        self.info
            .output
            .encode_item(value, &self.registry)
            .map_err(|e| RunnerError::new(ErrorCode::OutputEncodingFailed, e.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_schema::{Constraints, InputDecl, OutputKind, OutputType, PredictorBuilder};
    use pr_value::{FieldType, PrimitiveType};

    struct EchoPredictor;

    #[async_trait]
    impl PredictorImpl for EchoPredictor {
        fn predict(&self, inputs: IndexMap<String, CanonicalValue>) -> PredictCallable {
            let s = match inputs.get("s") {
                Some(CanonicalValue::String(s)) => s.clone(),
                _ => String::new(),
            };
            PredictCallable::Single(Ok(serde_json::json!(format!("*{s}*"))))
        }
    }

    fn adapter() -> PredictorAdapter {
        let registry = CoderRegistry::new();
        let info = PredictorBuilder::new("m", "Predictor")
            .input(InputDecl {
                name: "s".into(),
                field_type: FieldType::required(PrimitiveType::String),
                default: None,
                constraints: Constraints::default(),
            })
            .input(InputDecl {
                name: "count".into(),
                field_type: FieldType::optional(PrimitiveType::Integer),
                default: Some(serde_json::json!(null)),
                constraints: Constraints { ge: Some(0.0), le: Some(100.0), ..Default::default() },
            })
            .output(OutputType::scalar(OutputKind::Single, PrimitiveType::String).unwrap())
            .build(&registry)
            .unwrap();
        PredictorAdapter::new(info, registry, Arc::new(EchoPredictor))
    }

    #[test]
    fn check_input_normalizes_and_defaults() {
        let a = adapter();
        let raw = serde_json::json!({"s": "bar"});
        let inputs = a.check_input(raw.as_object().unwrap()).unwrap();
        assert_eq!(inputs.get("s"), Some(&CanonicalValue::String("bar".into())));
        assert_eq!(inputs.get("count"), Some(&CanonicalValue::Null));
    }

    #[test]
    fn check_input_rejects_missing_required_field() {
        let a = adapter();
        let raw = serde_json::json!({});
        let err = a.check_input(raw.as_object().unwrap()).unwrap_err();
        assert_eq!(err.code, ErrorCode::FieldRequired);
        assert_eq!(err.context.get("field").and_then(|v| v.as_str()), Some("s"));
    }

    #[test]
    fn check_input_reports_constraint_violation() {
        let a = adapter();
        let raw = serde_json::json!({"s": "bar", "count": 150});
        let err = a.check_input(raw.as_object().unwrap()).unwrap_err();
        assert_eq!(err.code, ErrorCode::FieldConstraintViolation);
        assert!(err.message.contains("count fails constraint <= 100"));
    }

    #[test]
    fn check_input_discards_unknown_keys() {
        let a = adapter();
        let raw = serde_json::json!({"s": "bar", "extra": 1});
        let inputs = a.check_input(raw.as_object().unwrap()).unwrap();
        assert!(!inputs.contains_key("extra"));
    }

    #[test]
    fn call_dispatches_to_implementation() {
        let a = adapter();
        let raw = serde_json::json!({"s": "bar"});
        let inputs = a.check_input(raw.as_object().unwrap()).unwrap();
        match a.call(inputs) {
            PredictCallable::Single(Ok(v)) => assert_eq!(v, serde_json::json!("*bar*")),
            _ => panic!("expected PredictCallable::Single(Ok(_))"),
        }
    }

    #[test]
    fn normalize_and_encode_output_round_trip() {
        let a = adapter();
        let normalized = a.normalize_output(&serde_json::json!("*bar*")).unwrap();
        assert_eq!(a.encode_output(&normalized).unwrap(), serde_json::json!("*bar*"));
    }

    #[test]
    fn resolve_weights_source_prefers_env_url() {
        std::env::set_var(WEIGHTS_URL_ENV, "https://example.test/weights.bin");
        let source = resolve_weights_source();
        std::env::remove_var(WEIGHTS_URL_ENV);
        assert_eq!(source, Some(WeightsSource::Url("https://example.test/weights.bin".into())));
    }

    #[test]
    fn resolve_weights_source_none_when_nothing_present() {
        std::env::remove_var(WEIGHTS_URL_ENV);
        if !Path::new(WEIGHTS_LOCAL_PATH).exists() {
            assert_eq!(resolve_weights_source(), None);
        }
    }
}
