// SPDX-License-Identifier: MIT OR Apache-2.0
//! Custom-type encode/decode registry for `PrimitiveType::Custom` fields.

use pr_error::{ErrorCode, RunnerError};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// An encode/decode pair for a custom value type (e.g. a dictionary-valued
/// or dataclass-valued field).
///
/// Implementors are looked up by [`Coder::descriptor`] through a
/// process-global [`CoderRegistry`]; a `CUSTOM` field whose descriptor has
/// no matching coder fails predictor construction.
pub trait Coder: Send + Sync {
    /// Stable name this coder is registered and looked up under.
    fn descriptor(&self) -> &str;

    /// Decode a loose JSON value into this coder's canonical JSON
    /// representation.
    fn decode(&self, raw: &serde_json::Value) -> Result<serde_json::Value, RunnerError>;

    /// Encode this coder's canonical JSON representation back into a
    /// JSON-ready value for the wire.
    fn encode(&self, value: &serde_json::Value) -> Result<serde_json::Value, RunnerError>;
}

/// Process-global registry of [`Coder`]s, keyed by descriptor.
///
/// Registration happens once at startup (typically while building the
/// predictor's schema); lookups happen on every normalize/encode call for a
/// `CUSTOM` field.
#[derive(Clone, Default)]
pub struct CoderRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<dyn Coder>>>>,
}

fn global() -> &'static CoderRegistry {
    static REGISTRY: OnceLock<CoderRegistry> = OnceLock::new();
    REGISTRY.get_or_init(CoderRegistry::default)
}

impl CoderRegistry {
    /// Create an empty registry (useful for isolated tests).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the process-global registry shared by the whole runner.
    #[must_use]
    pub fn global() -> Self {
        global().clone()
    }

    /// Register a coder under its own descriptor, replacing any previous
    /// registration with the same name.
    pub fn register(&self, coder: impl Coder + 'static) {
        let mut guard = self.inner.write().expect("coder registry poisoned");
        guard.insert(coder.descriptor().to_string(), Arc::new(coder));
    }

    /// Look up a coder by descriptor.
    #[must_use]
    pub fn get(&self, descriptor: &str) -> Option<Arc<dyn Coder>> {
        let guard = self.inner.read().expect("coder registry poisoned");
        guard.get(descriptor).cloned()
    }

    /// Look up a coder by descriptor, failing predictor construction with
    /// [`ErrorCode::ConstraintInvalid`] if it isn't registered.
    pub fn require(&self, descriptor: &str) -> Result<Arc<dyn Coder>, RunnerError> {
        self.get(descriptor).ok_or_else(|| {
            RunnerError::new(
                ErrorCode::ConstraintInvalid,
                format!("no coder registered for custom type '{descriptor}'"),
            )
            .with_context("descriptor", descriptor)
        })
    }
}
