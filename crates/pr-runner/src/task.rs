// SPDX-License-Identifier: MIT OR Apache-2.0
//! A single prediction: the per-pid lifecycle from `{status: starting}`
//! through collection, cancellation, or failure, down to the terminal
//! response file (spec §4.6 "Prediction task").

use crate::ipc::{IpcClient, IpcStatus};
use crate::request::PredictionRequest;
use crate::response::{PredictionResponse, PredictionStatus};
use crate::workdir::{atomic_write, response_filename};
use chrono::Utc;
use futures::StreamExt;
use pr_error::RunnerError;
use pr_predictor::{CancellationToken, PredictCallable, PredictorAdapter};
use pr_scope::{Scope, ScopeRegistry, TaggedWriter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a prediction task needs, shared across every in-flight pid.
pub struct PredictionContext {
    /// Shared working directory the whole runner operates in.
    pub working_dir: PathBuf,
    /// Bound schema + implementation.
    pub adapter: Arc<PredictorAdapter>,
    /// Out-of-band status reporting.
    pub ipc: Arc<IpcClient>,
    /// Tagged stdio capture, shared with the tracing subscriber.
    pub writer: TaggedWriter,
    /// Process-global scope tracker.
    pub scope_registry: &'static ScopeRegistry,
}

enum Outcome {
    Succeeded(serde_json::Value),
    Canceled(Option<serde_json::Value>),
    Failed(String),
}

/// Writes response files per spec §4.6: every transition when the request
/// carries a `webhook`, only the terminal one otherwise. Epochs increase
/// strictly from 0 with no gaps for a given pid.
struct ResponseEmitter<'a> {
    working_dir: &'a Path,
    pid: &'a str,
    webhook: bool,
    epoch: u32,
}

impl<'a> ResponseEmitter<'a> {
    fn new(working_dir: &'a Path, pid: &'a str, webhook: bool) -> Self {
        Self { working_dir, pid, webhook, epoch: 0 }
    }

    async fn emit(&mut self, ipc: &IpcClient, response: &PredictionResponse) -> Result<(), RunnerError> {
        if !self.webhook && !response.status.is_terminal() {
            return Ok(());
        }
        let body = serde_json::to_vec(response).expect("PredictionResponse always serializes");
        let name = response_filename(self.pid, self.epoch);
        atomic_write(self.working_dir, &name, &body).await?;
        ipc.notify(IpcStatus::Output, Some(self.pid)).await;
        self.epoch += 1;
        Ok(())
    }
}

fn non_empty(metrics: BTreeMap<String, f64>) -> Option<BTreeMap<String, f64>> {
    if metrics.is_empty() {
        None
    } else {
        Some(metrics)
    }
}

fn finalize_single(
    ctx: &PredictionContext,
    raw: &serde_json::Value,
) -> Result<serde_json::Value, RunnerError> {
    let normalized = ctx.adapter.normalize_output(raw)?;
    ctx.adapter.encode_output(&normalized)
}

fn encode_stream_item(
    ctx: &PredictionContext,
    raw: &serde_json::Value,
) -> Result<serde_json::Value, RunnerError> {
    finalize_single(ctx, raw)
}

/// Run one prediction end to end, writing every response file the
/// spec-mandated cadence requires, then clean up its scope.
///
/// The whole run executes inside [`pr_scope::ScopeRegistry::scope_pid`],
/// so every log line and `tracing` call made while this prediction's own
/// task is polling is attributed to `pid` alone — a concurrently running
/// prediction's task carries its own independent scope and can't
/// overwrite this one's.
pub async fn run_prediction(
    ctx: Arc<PredictionContext>,
    pid: String,
    request: PredictionRequest,
    cancel: CancellationToken,
) {
    let registry = ctx.scope_registry;
    registry
        .scope_pid(pid.clone(), run_scoped(ctx.clone(), pid.clone(), request, cancel))
        .await;
    registry.close(&pid);
}

async fn run_scoped(
    ctx: Arc<PredictionContext>,
    pid: String,
    request: PredictionRequest,
    cancel: CancellationToken,
) {
    let started_at = Utc::now().to_rfc3339();
    let scope = ctx.scope_registry.open(pid.clone(), request.context.clone());
    let webhook = request.webhook.is_some();
    let mut emitter = ResponseEmitter::new(&ctx.working_dir, &pid, webhook);

    if let Err(e) = emitter.emit(&ctx.ipc, &PredictionResponse::starting(started_at.clone())).await {
        tracing::error!(pid = %pid, error = %e, "failed writing starting response");
    }

    let outcome = execute(&ctx, &pid, &request, &cancel, &mut emitter, &started_at).await;

    let completed_at = Utc::now().to_rfc3339();
    ctx.writer.flush_pid(&pid);
    let metrics = non_empty(scope.metrics_snapshot());
    let logs = scope.logs_snapshot();

    let final_response = match outcome {
        Outcome::Succeeded(output) => PredictionResponse {
            status: PredictionStatus::Succeeded,
            output: Some(output),
            error: None,
            logs,
            metrics,
            started_at: Some(started_at.clone()),
            completed_at: Some(completed_at),
        },
        Outcome::Canceled(output) => PredictionResponse {
            status: PredictionStatus::Canceled,
            output,
            error: None,
            logs,
            metrics,
            started_at: Some(started_at.clone()),
            completed_at: Some(completed_at),
        },
        Outcome::Failed(message) => PredictionResponse {
            status: PredictionStatus::Failed,
            output: None,
            error: Some(message),
            logs,
            metrics,
            started_at: Some(started_at.clone()),
            completed_at: Some(completed_at),
        },
    };

    if let Err(e) = emitter.emit(&ctx.ipc, &final_response).await {
        tracing::error!(pid = %pid, error = %e, "failed writing terminal response");
    }
}

async fn execute(
    ctx: &Arc<PredictionContext>,
    pid: &str,
    request: &PredictionRequest,
    cancel: &CancellationToken,
    emitter: &mut ResponseEmitter<'_>,
    started_at: &str,
) -> Outcome {
    let inputs = match ctx.adapter.check_input(&request.input) {
        Ok(v) => v,
        Err(e) => return Outcome::Failed(e.wire_message()),
    };

    match ctx.adapter.call(inputs) {
        PredictCallable::Single(item) => match item {
            Ok(raw) => match finalize_single(ctx, &raw) {
                Ok(v) => Outcome::Succeeded(v),
                Err(e) => Outcome::Failed(e.wire_message()),
            },
            Err(e) => Outcome::Failed(e.wire_message()),
        },

        PredictCallable::AsyncSingle(fut) => tokio::select! {
            biased;
            () = cancel.cancelled() => Outcome::Canceled(None),
            result = fut => match result {
                Ok(raw) => match finalize_single(ctx, &raw) {
                    Ok(v) => Outcome::Succeeded(v),
                    Err(e) => Outcome::Failed(e.wire_message()),
                },
                Err(e) => Outcome::Failed(e.wire_message()),
            },
        },

        PredictCallable::SyncStream(iter) => {
            run_sync_stream(ctx, pid, iter, cancel, emitter, started_at).await
        }

        PredictCallable::AsyncStream(stream) => {
            run_async_stream(ctx, pid, stream, cancel, emitter, started_at).await
        }
    }
}

async fn emit_progress(
    ctx: &PredictionContext,
    pid: &str,
    emitter: &mut ResponseEmitter<'_>,
    collected: &[serde_json::Value],
    started_at: &str,
) {
    let response = PredictionResponse {
        status: PredictionStatus::Processing,
        output: Some(serde_json::Value::Array(collected.to_vec())),
        error: None,
        logs: None,
        metrics: None,
        started_at: Some(started_at.to_string()),
        completed_at: None,
    };
    if let Err(e) = emitter.emit(&ctx.ipc, &response).await {
        tracing::error!(pid = %pid, error = %e, "failed writing streamed response");
    }
}

async fn run_sync_stream(
    ctx: &Arc<PredictionContext>,
    pid: &str,
    mut iter: Box<dyn Iterator<Item = pr_predictor::PredictItem> + Send>,
    cancel: &CancellationToken,
    emitter: &mut ResponseEmitter<'_>,
    started_at: &str,
) -> Outcome {
    let mut collected = Vec::new();
    loop {
        if cancel.is_cancelled() {
            return Outcome::Canceled(Some(serde_json::Value::Array(collected)));
        }
        match iter.next() {
            None => break,
            Some(Ok(raw)) => match encode_stream_item(ctx, &raw) {
                Ok(encoded) => {
                    collected.push(encoded);
                    emit_progress(ctx, pid, emitter, &collected, started_at).await;
                }
                Err(e) => return Outcome::Failed(e.wire_message()),
            },
            Some(Err(e)) => return Outcome::Failed(e.wire_message()),
        }
        tokio::task::yield_now().await;
    }
    Outcome::Succeeded(serde_json::Value::Array(collected))
}

async fn run_async_stream(
    ctx: &Arc<PredictionContext>,
    pid: &str,
    stream: futures::stream::BoxStream<'static, pr_predictor::PredictItem>,
    cancel: &CancellationToken,
    emitter: &mut ResponseEmitter<'_>,
    started_at: &str,
) -> Outcome {
    let mut collected = Vec::new();
    tokio::pin!(stream);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Outcome::Canceled(Some(serde_json::Value::Array(collected))),
            next = stream.next() => match next {
                None => break,
                Some(Ok(raw)) => match encode_stream_item(ctx, &raw) {
                    Ok(encoded) => {
                        collected.push(encoded);
                        emit_progress(ctx, pid, emitter, &collected, started_at).await;
                    }
                    Err(e) => return Outcome::Failed(e.wire_message()),
                },
                Some(Err(e)) => return Outcome::Failed(e.wire_message()),
            },
        }
    }
    Outcome::Succeeded(serde_json::Value::Array(collected))
}
