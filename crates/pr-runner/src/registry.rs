// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative predictor lookup, replacing dynamic module loading.
//!
//! Rust has no runtime module-import equivalent to point `config.json`'s
//! `module_name`/`predictor_name` at, so embedding binaries register a
//! [`PredictorFactory`] per `(module_name, predictor_name)` pair ahead of
//! time; the runner looks the pair up once `config.json` has been read.

use pr_error::{ErrorCode, RunnerError};
use pr_predictor::PredictorImpl;
use pr_schema::PredictorInfo;
use pr_value::CoderRegistry;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the immutable schema and implementation for one predictor
/// symbol.
pub trait PredictorFactory: Send + Sync {
    /// Build the `(PredictorInfo, PredictorImpl)` pair for this predictor,
    /// registering any [`pr_value::Coder`]s it needs against `coders`
    /// first.
    fn build(
        &self,
        coders: &CoderRegistry,
    ) -> Result<(PredictorInfo, Arc<dyn PredictorImpl>), RunnerError>;
}

/// Maps `(module_name, predictor_name)` to a [`PredictorFactory`].
#[derive(Default)]
pub struct PredictorRegistry {
    factories: HashMap<(String, String), Arc<dyn PredictorFactory>>,
}

impl PredictorRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under the given module/predictor symbol pair.
    pub fn register(
        &mut self,
        module_name: impl Into<String>,
        predictor_name: impl Into<String>,
        factory: impl PredictorFactory + 'static,
    ) {
        self.factories
            .insert((module_name.into(), predictor_name.into()), Arc::new(factory));
    }

    /// Look up the factory for `config.json`'s declared module/predictor,
    /// failing with [`ErrorCode::ModuleLoadFailed`] if nothing is
    /// registered under that pair.
    pub fn resolve(
        &self,
        module_name: &str,
        predictor_name: &str,
    ) -> Result<Arc<dyn PredictorFactory>, RunnerError> {
        self.factories
            .get(&(module_name.to_string(), predictor_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                RunnerError::new(
                    ErrorCode::ModuleLoadFailed,
                    format!("no predictor registered for {module_name}::{predictor_name}"),
                )
                .with_context("module_name", module_name)
                .with_context("predictor_name", predictor_name)
            })
    }
}
