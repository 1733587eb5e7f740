// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-level lifecycle: the exit codes of spec §4.7, and the
//! keyboard-interrupt-ignoring background task installed once setup
//! succeeds so that a terminal `SIGINT` reaches only the parent.

/// Exit codes the `predict-runner` binary returns, per spec §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Clean shutdown via the `stop` file protocol.
    Normal,
    /// Predictor `setup()` failed.
    SetupFailed,
    /// `config.json` never appeared within the startup deadline.
    ConfigMissing,
}

impl ExitOutcome {
    /// The process exit code for this outcome.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::SetupFailed => 1,
            Self::ConfigMissing => -1,
        }
    }
}

/// Spawn a background task that swallows every `SIGINT` for the lifetime
/// of the process. The parent orchestrator is the one that's meant to
/// observe a terminal `Ctrl-C`; the runner only stops via the `stop` file.
///
/// Returns the task handle so callers can keep it alive for the process
/// lifetime (dropping it would abort the ignoring task).
#[cfg(unix)]
pub fn ignore_keyboard_interrupt() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async {
        let Ok(mut stream) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        else {
            tracing::warn!("failed installing SIGINT handler; interrupts will use default behavior");
            return;
        };
        loop {
            stream.recv().await;
            tracing::debug!("ignored SIGINT; shutdown is driven by the stop file");
        }
    })
}

/// Non-Unix fallback: `tokio::signal::ctrl_c` has no "ignore and keep
/// going" mode, so this re-arms itself after every notification instead.
#[cfg(not(unix))]
pub fn ignore_keyboard_interrupt() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::debug!("ignored Ctrl-C; shutdown is driven by the stop file");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(ExitOutcome::Normal.code(), 0);
        assert_eq!(ExitOutcome::SetupFailed.code(), 1);
        assert_eq!(ExitOutcome::ConfigMissing.code(), -1);
    }
}
