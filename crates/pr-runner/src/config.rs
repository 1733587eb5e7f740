// SPDX-License-Identifier: MIT OR Apache-2.0
//! `config.json`: the parent's one-shot startup handshake (spec §4.6, §6).

use pr_error::{ErrorCode, RunnerError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// How long the runner waits for `config.json` to appear before giving up
/// (spec §4.6 step 1).
pub const CONFIG_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between checks for `config.json` while waiting.
const CONFIG_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The parent-supplied startup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Which module the predictor is declared in (looked up in a
    /// [`crate::registry::PredictorRegistry`], not dynamically loaded).
    pub module_name: String,
    /// The symbol within that module to treat as the predictor.
    pub predictor_name: String,
    /// Maximum number of predictions the runner will run concurrently.
    pub max_concurrency: u32,
}

impl RunnerConfig {
    fn validate(self) -> Result<Self, RunnerError> {
        if self.max_concurrency < 1 {
            return Err(RunnerError::new(
                ErrorCode::ConfigInvalid,
                "max_concurrency must be >= 1",
            ));
        }
        Ok(self)
    }
}

/// Poll `working_dir/config.json` until it appears, parse it, and delete
/// it. Returns [`ErrorCode::ConfigMissing`] if it never appears within
/// [`CONFIG_WAIT_TIMEOUT`], or [`ErrorCode::ConfigInvalid`] if it appears
/// but fails to parse or validate.
pub async fn wait_for_config(working_dir: &Path) -> Result<RunnerConfig, RunnerError> {
    let path = working_dir.join("config.json");
    let deadline = tokio::time::Instant::now() + CONFIG_WAIT_TIMEOUT;

    loop {
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let config: RunnerConfig = serde_json::from_slice(&bytes).map_err(|e| {
                    RunnerError::new(ErrorCode::ConfigInvalid, format!("invalid config.json: {e}"))
                })?;
                let config = config.validate()?;
                let _ = tokio::fs::remove_file(&path).await;
                return Ok(config);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if tokio::time::Instant::now() >= deadline {
                    return Err(RunnerError::new(
                        ErrorCode::ConfigMissing,
                        "config.json did not appear within the startup deadline",
                    ));
                }
                tokio::time::sleep(CONFIG_POLL_INTERVAL).await;
            }
            Err(e) => {
                return Err(
                    RunnerError::new(ErrorCode::ConfigInvalid, format!("reading config.json: {e}"))
                        .with_source(e),
                )
            }
        }
    }
}
