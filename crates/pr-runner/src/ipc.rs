// SPDX-License-Identifier: MIT OR Apache-2.0
//! Out-of-band status reporting to the parent orchestrator (spec §6).
//!
//! Delivery failures are logged and ignored: the working directory remains
//! the authoritative channel, IPC is a best-effort nudge.

use serde::Serialize;

/// The three lifecycle transitions the runner reports over IPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IpcStatus {
    /// In-flight count dropped below `max_concurrency`.
    Ready,
    /// In-flight count reached `max_concurrency`.
    Busy,
    /// A new response file was written.
    Output,
}

#[derive(Serialize)]
struct IpcMessage<'a> {
    name: &'a str,
    pid: Option<&'a str>,
    status: IpcStatus,
}

/// Posts compact `{name, pid, status}` JSON to the parent's IPC URL.
pub struct IpcClient {
    name: String,
    url: Option<String>,
    http: reqwest::Client,
}

impl IpcClient {
    /// Construct a client. `url` of `None` makes every [`Self::notify`]
    /// call a no-op (useful for tests and for parents that only read the
    /// `ready` file).
    #[must_use]
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self { name: name.into(), url, http: reqwest::Client::new() }
    }

    /// Report a status transition, optionally scoped to a pid (only
    /// meaningful for [`IpcStatus::Output`]). Failures are logged and
    /// swallowed.
    pub async fn notify(&self, status: IpcStatus, pid: Option<&str>) {
        let Some(url) = &self.url else { return };
        let message = IpcMessage { name: &self.name, pid, status };
        match self.http.post(url).json(&message).send().await {
            Ok(resp) if !resp.status().is_success() => {
                tracing::warn!(status = ?status, http_status = %resp.status(), "ipc delivery rejected");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(status = ?status, error = %e, "ipc delivery failed");
            }
        }
    }
}
