//! Unified error taxonomy with stable error codes for the prediction runner.
//!
//! Every runner error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. Use the builder returned by
//! [`RunnerError::new`] to construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
///
/// Mirrors the error-category breakdown from the runner's error-handling
/// design: configuration errors are terminal for the process, everything
/// else is scoped to a single prediction and never poisons the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing config, invalid module, invalid predictor shape, invalid
    /// input-field constraints. Surfaces as a failed setup.
    Config,
    /// Type mismatch, constraint violation, missing required field.
    /// Surfaces as a failed prediction, never a process exit.
    Validation,
    /// An exception raised by user code during a prediction call.
    Runtime,
    /// A value could not be encoded to JSON on the way out to the parent.
    Serialization,
    /// Delivery of an IPC status update or a webhook failed.
    Ipc,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Validation => "validation",
            Self::Runtime => "runtime",
            Self::Serialization => "serialization",
            Self::Ipc => "ipc",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Config --
    /// `config.json` did not appear in the working directory before the
    /// startup deadline.
    ConfigMissing,
    /// `config.json` exists but failed to parse or is missing a field.
    ConfigInvalid,
    /// The configured module could not be loaded, or the symbol was not
    /// found within it.
    ModuleLoadFailed,
    /// The predictor does not expose a valid entry point (e.g. a class
    /// without a `predict` method, or a parameter without a type).
    PredictorShapeInvalid,
    /// A declared input field has an incompatible combination of
    /// constraints (e.g. `choices` together with `ge`/`le`).
    ConstraintInvalid,
    /// Predictor `setup()` raised or returned an error.
    SetupFailed,

    // -- Validation --
    /// A required input field had no value and no default.
    FieldRequired,
    /// A supplied value could not be normalized to the field's declared
    /// type.
    FieldTypeMismatch,
    /// A normalized value violates one of the field's declared
    /// constraints.
    FieldConstraintViolation,

    // -- Runtime --
    /// The predictor raised an exception while computing a prediction.
    PredictionFailed,

    // -- Serialization --
    /// An output value could not be encoded to JSON before being attached
    /// to the response.
    OutputEncodingFailed,

    // -- Ipc --
    /// The IPC HTTP POST to the parent orchestrator failed.
    IpcDeliveryFailed,
    /// Delivery of a webhook notification failed.
    WebhookDeliveryFailed,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigMissing
            | Self::ConfigInvalid
            | Self::ModuleLoadFailed
            | Self::PredictorShapeInvalid
            | Self::ConstraintInvalid
            | Self::SetupFailed => ErrorCategory::Config,

            Self::FieldRequired | Self::FieldTypeMismatch | Self::FieldConstraintViolation => {
                ErrorCategory::Validation
            }

            Self::PredictionFailed => ErrorCategory::Runtime,

            Self::OutputEncodingFailed => ErrorCategory::Serialization,

            Self::IpcDeliveryFailed | Self::WebhookDeliveryFailed => ErrorCategory::Ipc,

            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"CONFIG_MISSING"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "CONFIG_MISSING",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::ModuleLoadFailed => "MODULE_LOAD_FAILED",
            Self::PredictorShapeInvalid => "PREDICTOR_SHAPE_INVALID",
            Self::ConstraintInvalid => "CONSTRAINT_INVALID",
            Self::SetupFailed => "SETUP_FAILED",
            Self::FieldRequired => "FIELD_REQUIRED",
            Self::FieldTypeMismatch => "FIELD_TYPE_MISMATCH",
            Self::FieldConstraintViolation => "FIELD_CONSTRAINT_VIOLATION",
            Self::PredictionFailed => "PREDICTION_FAILED",
            Self::OutputEncodingFailed => "OUTPUT_ENCODING_FAILED",
            Self::IpcDeliveryFailed => "IPC_DELIVERY_FAILED",
            Self::WebhookDeliveryFailed => "WEBHOOK_DELIVERY_FAILED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunnerError
// ---------------------------------------------------------------------------

/// Unified runner error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use pr_error::{RunnerError, ErrorCode};
///
/// let err = RunnerError::new(ErrorCode::FieldConstraintViolation, "count fails constraint <= 100")
///     .with_context("field", "count")
///     .with_context("le", 100);
/// ```
pub struct RunnerError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl RunnerError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// The wire-facing form of this error: `"<context>: <message>"` when the
    /// context carries a `field` key, else just `message`.
    ///
    /// Matches the response contract's `error = <name>: <reason>` shape for
    /// input-validation failures.
    pub fn wire_message(&self) -> String {
        match self.context.get("field").and_then(|v| v.as_str()) {
            Some(field) => format!("{field}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

impl fmt::Debug for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("RunnerError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::ConfigMissing,
        ErrorCode::ConfigInvalid,
        ErrorCode::ModuleLoadFailed,
        ErrorCode::PredictorShapeInvalid,
        ErrorCode::ConstraintInvalid,
        ErrorCode::SetupFailed,
        ErrorCode::FieldRequired,
        ErrorCode::FieldTypeMismatch,
        ErrorCode::FieldConstraintViolation,
        ErrorCode::PredictionFailed,
        ErrorCode::OutputEncodingFailed,
        ErrorCode::IpcDeliveryFailed,
        ErrorCode::WebhookDeliveryFailed,
        ErrorCode::Internal,
    ];

    #[test]
    fn basic_construction() {
        let err = RunnerError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = RunnerError::new(ErrorCode::ModuleLoadFailed, "no such module");
        assert_eq!(err.to_string(), "[MODULE_LOAD_FAILED] no such module");
    }

    #[test]
    fn display_with_context() {
        let err = RunnerError::new(ErrorCode::FieldRequired, "field required")
            .with_context("field", "s");
        let s = err.to_string();
        assert!(s.starts_with("[FIELD_REQUIRED] field required"));
        assert!(s.contains("\"field\":\"s\""));
    }

    #[test]
    fn wire_message_prefixes_field() {
        let err = RunnerError::new(ErrorCode::FieldConstraintViolation, "fails constraint <= 100")
            .with_context("field", "count");
        assert_eq!(err.wire_message(), "count: fails constraint <= 100");
    }

    #[test]
    fn wire_message_without_field_is_bare_message() {
        let err = RunnerError::new(ErrorCode::PredictionFailed, "division by zero");
        assert_eq!(err.wire_message(), "division by zero");
    }

    #[test]
    fn debug_with_source() {
        let src = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let err = RunnerError::new(ErrorCode::SetupFailed, "setup failed").with_source(src);
        let dbg = format!("{err:?}");
        assert!(dbg.contains("source"));
        assert!(dbg.contains("file missing"));
    }

    #[test]
    fn config_codes_categorised() {
        for code in [
            ErrorCode::ConfigMissing,
            ErrorCode::ConfigInvalid,
            ErrorCode::ModuleLoadFailed,
            ErrorCode::PredictorShapeInvalid,
            ErrorCode::ConstraintInvalid,
            ErrorCode::SetupFailed,
        ] {
            assert_eq!(code.category(), ErrorCategory::Config);
        }
    }

    #[test]
    fn validation_codes_categorised() {
        for code in [
            ErrorCode::FieldRequired,
            ErrorCode::FieldTypeMismatch,
            ErrorCode::FieldConstraintViolation,
        ] {
            assert_eq!(code.category(), ErrorCategory::Validation);
        }
    }

    #[test]
    fn runtime_and_serialization_and_ipc_categorised() {
        assert_eq!(ErrorCode::PredictionFailed.category(), ErrorCategory::Runtime);
        assert_eq!(
            ErrorCode::OutputEncodingFailed.category(),
            ErrorCategory::Serialization
        );
        assert_eq!(ErrorCode::IpcDeliveryFailed.category(), ErrorCategory::Ipc);
        assert_eq!(
            ErrorCode::WebhookDeliveryFailed.category(),
            ErrorCategory::Ipc
        );
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()));
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let code = ErrorCode::FieldRequired;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, r#""FIELD_REQUIRED""#);
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn error_category_serde_roundtrip() {
        let cat = ErrorCategory::Validation;
        let json = serde_json::to_string(&cat).unwrap();
        assert_eq!(json, r#""validation""#);
        let back: ErrorCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cat);
    }

    #[test]
    fn std_error_source_chain() {
        let inner = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = RunnerError::new(ErrorCode::SetupFailed, "setup").with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "not found");
    }

    #[test]
    fn category_display() {
        assert_eq!(ErrorCategory::Config.to_string(), "config");
        assert_eq!(ErrorCategory::Ipc.to_string(), "ipc");
    }
}
