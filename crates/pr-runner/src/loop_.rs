// SPDX-License-Identifier: MIT OR Apache-2.0
//! The main event loop (spec §4.6 "Main loop"): watches the working
//! directory at a fixed poll interval, dispatches requests and cancels,
//! tracks the ready/busy IPC signal, and reaps completed tasks.

use crate::ipc::{IpcClient, IpcStatus};
use crate::request::PredictionRequest;
use crate::task::{run_prediction, PredictionContext};
use crate::workdir::{parse_cancel_filename, parse_request_filename, remove_if_exists};
use pr_predictor::CancellationToken;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Interval between working-directory scans.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct InFlight {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives the request/cancel/stop protocol until a `stop` file appears.
pub struct EventLoop {
    ctx: Arc<PredictionContext>,
    ipc: Arc<IpcClient>,
    max_concurrency: u32,
    in_flight: HashMap<String, InFlight>,
    currently_ready: bool,
}

impl EventLoop {
    /// Build a fresh loop bound to `ctx` with no in-flight work.
    #[must_use]
    pub fn new(ctx: Arc<PredictionContext>, ipc: Arc<IpcClient>, max_concurrency: u32) -> Self {
        Self { ctx, ipc, max_concurrency, in_flight: HashMap::new(), currently_ready: true }
    }

    /// Run until the parent drops a `stop` file, then cancel every
    /// in-flight prediction, await their completion, and return.
    pub async fn run(&mut self) {
        loop {
            if self.ctx.working_dir.join("stop").exists() {
                self.shut_down().await;
                return;
            }
            if let Err(e) = self.scan_once().await {
                tracing::error!(error = %e, "working directory scan failed");
            }
            self.reap_completed();
            self.update_ready_signal().await;
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn scan_once(&mut self) -> Result<(), pr_error::RunnerError> {
        let mut entries = tokio::fs::read_dir(&self.ctx.working_dir).await.map_err(|e| {
            pr_error::RunnerError::new(
                pr_error::ErrorCode::Internal,
                format!("reading working directory: {e}"),
            )
            .with_source(e)
        })?;

        let mut cancels = Vec::new();
        let mut requests = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            pr_error::RunnerError::new(pr_error::ErrorCode::Internal, format!("reading directory entry: {e}"))
                .with_source(e)
        })? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(pid) = parse_cancel_filename(&name) {
                cancels.push((name, pid));
            } else if let Some(pid) = parse_request_filename(&name) {
                requests.push((name, pid));
            }
        }

        for (name, pid) in cancels {
            remove_if_exists(&self.ctx.working_dir.join(&name)).await?;
            match self.in_flight.get(&pid) {
                Some(task) => task.cancel.cancel(),
                None => tracing::warn!(pid = %pid, "cancel for unknown or already-completed pid"),
            }
        }

        for (name, pid) in requests {
            let path = self.ctx.working_dir.join(&name);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(pid = %pid, error = %e, "failed reading request file");
                    continue;
                }
            };
            remove_if_exists(&path).await?;

            let request: PredictionRequest = match serde_json::from_slice(&bytes) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(pid = %pid, error = %e, "malformed request body");
                    continue;
                }
            };

            self.dispatch(pid, request).await;
        }

        Ok(())
    }

    async fn dispatch(&mut self, pid: String, request: PredictionRequest) {
        let cancel = CancellationToken::new();
        let ctx = self.ctx.clone();
        let task_cancel = cancel.clone();
        let task_pid = pid.clone();
        let handle =
            tokio::spawn(async move { run_prediction(ctx, task_pid, request, task_cancel).await });
        self.in_flight.insert(pid, InFlight { cancel, handle });

        if self.in_flight.len() as u32 >= self.max_concurrency && self.currently_ready {
            self.currently_ready = false;
            self.ipc.notify(IpcStatus::Busy, None).await;
        }
    }

    fn reap_completed(&mut self) {
        self.in_flight.retain(|pid, task| {
            if task.handle.is_finished() {
                tracing::debug!(pid = %pid, "prediction task reaped");
                false
            } else {
                true
            }
        });
    }

    async fn update_ready_signal(&mut self) {
        if !self.currently_ready && (self.in_flight.len() as u32) < self.max_concurrency {
            self.currently_ready = true;
            self.ipc.notify(IpcStatus::Ready, None).await;
        }
    }

    async fn shut_down(&mut self) {
        for task in self.in_flight.values() {
            task.cancel.cancel();
        }
        for (pid, task) in self.in_flight.drain() {
            if let Err(e) = task.handle.await {
                tracing::error!(pid = %pid, error = %e, "prediction task panicked during shutdown");
            }
        }
    }
}
