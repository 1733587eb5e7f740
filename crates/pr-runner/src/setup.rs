// SPDX-License-Identifier: MIT OR Apache-2.0
//! Startup handshake: config handshake, schema emission, and predictor
//! setup (spec §4.6 steps 2-4, §6's `setup_result.json`).

use crate::workdir::{atomic_write, remove_if_exists};
use chrono::Utc;
use pr_error::RunnerError;
use serde::Serialize;
use std::path::Path;

/// Control files removed before a fresh run, in case a previous run left
/// them behind (spec §4.6 step 2).
const STALE_ARTIFACTS: &[&str] = &["setup_result.json", "stop", "openapi.json", "ready"];

/// Remove every stale artifact a previous run may have left in the
/// working directory.
pub async fn clean_stale_artifacts(working_dir: &Path) -> Result<(), RunnerError> {
    for name in STALE_ARTIFACTS {
        remove_if_exists(&working_dir.join(name)).await?;
    }
    Ok(())
}

/// `setup_result.json`'s `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStatus {
    /// Predictor `setup()` returned without error.
    Succeeded,
    /// Predictor `setup()` raised, or the predictor/schema failed to
    /// build.
    Failed,
}

#[derive(Serialize)]
struct SetupResult {
    started_at: String,
    completed_at: String,
    status: SetupStatus,
}

/// Write `setup_result.json` atomically, recording the window setup ran
/// in and whether it succeeded.
pub async fn write_setup_result(
    working_dir: &Path,
    started_at: &str,
    status: SetupStatus,
) -> Result<(), RunnerError> {
    let result = SetupResult {
        started_at: started_at.to_string(),
        completed_at: Utc::now().to_rfc3339(),
        status,
    };
    let body = serde_json::to_vec(&result).expect("SetupResult always serializes");
    atomic_write(working_dir, "setup_result.json", &body).await
}

/// Write the OpenAPI document for a built [`pr_schema::PredictorInfo`].
pub async fn write_openapi(
    working_dir: &Path,
    info: &pr_schema::PredictorInfo,
) -> Result<(), RunnerError> {
    let doc = pr_openapi::emit(info);
    let body = serde_json::to_vec(&doc).expect("OpenAPI document always serializes");
    atomic_write(working_dir, "openapi.json", &body).await
}

/// Create the zero-byte `ready` file parents without IPC support poll for.
pub async fn write_ready_marker(working_dir: &Path) -> Result<(), RunnerError> {
    atomic_write(working_dir, "ready", b"").await
}

/// Create the `async_predict` marker. In this runtime every prediction —
/// regardless of the shape the user implementation takes — runs as a
/// tokio task under the same cooperative cancellation token, so the
/// marker is written unconditionally rather than gated on introspecting a
/// sync/async distinction (see `DESIGN.md`'s note on cancellation
/// duality).
pub async fn write_async_predict_marker(working_dir: &Path) -> Result<(), RunnerError> {
    atomic_write(working_dir, "async_predict", b"").await
}
