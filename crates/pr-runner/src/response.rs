// SPDX-License-Identifier: MIT OR Apache-2.0
//! `response-<pid>-<epoch>.json` body, per spec §3 and §6.

use serde::Serialize;
use std::collections::BTreeMap;

/// The closed set of states a [`PredictionResponse`] can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    /// The task has been created but the predictor has not yet been
    /// invoked.
    Starting,
    /// The predictor is running; for streaming output this is also used
    /// for every intermediate epoch.
    Processing,
    /// The predictor completed and the final output is attached.
    Succeeded,
    /// The prediction was cancelled before or during the predictor call.
    Canceled,
    /// The predictor raised, or output serialization failed.
    Failed,
}

impl PredictionStatus {
    /// Whether this status is terminal (no further epoch will be written
    /// for the same pid).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Canceled | Self::Failed)
    }
}

/// A response snapshot written to `response-<pid>-<epoch:05d>.json`.
///
/// For streaming predictors the same pid is rewritten atomically across
/// increasing epochs; `output` grows from absent/empty to the full
/// collected sequence. For non-streaming predictors a single epoch-0 file
/// carries the terminal state directly.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    /// Current lifecycle status.
    pub status: PredictionStatus,
    /// The single normalized output value, or — for streaming kinds — the
    /// JSON array built up across epochs so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Populated on `status: failed`; the wire-facing error message (spec
    /// §7's `<name>: <reason>` shape for validation failures).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Captured log lines for this prediction, if any were buffered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    /// Metrics recorded in the prediction's [`pr_scope::Scope`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, f64>>,
    /// RFC3339 UTC timestamp of when the prediction task was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// RFC3339 UTC timestamp of when a terminal status was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl PredictionResponse {
    /// The initial `{status: "starting"}` response built when a
    /// prediction task is created.
    #[must_use]
    pub fn starting(started_at: impl Into<String>) -> Self {
        Self {
            status: PredictionStatus::Starting,
            output: None,
            error: None,
            logs: None,
            metrics: None,
            started_at: Some(started_at.into()),
            completed_at: None,
        }
    }
}
