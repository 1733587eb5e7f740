// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tees formatted tracing output through the pid-tagged [`LineRouter`],
//! both to stdout and into the active prediction's [`Scope`] — an
//! explicit `MakeWriter` in place of a process-wide stdout monkey-patch.

use crate::line_router::LineRouter;
use crate::scope::ScopeRegistry;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::Metadata;
use tracing_subscriber::fmt::MakeWriter;

/// Conventional `tracing` target a predictor uses to mark a log record as
/// its own output, e.g. `tracing::info!(target: "predictor", "loss: {x}")`.
/// Only records emitted against this target are folded into the active
/// prediction's captured `logs`; every other record (the runner's own
/// operational diagnostics included) still reaches the console through
/// the same pid-tagged sink but is never appended to a `Scope`.
pub const PREDICTOR_LOG_TARGET: &str = "predictor";

/// A [`tracing_subscriber`] writer that tags every line with the
/// currently active prediction pid and mirrors it to stdout. Lines
/// recorded against [`PREDICTOR_LOG_TARGET`] are additionally appended to
/// that prediction's [`crate::Scope`] for inclusion in its response; all
/// other records (runner diagnostics) are console-only.
#[derive(Clone)]
pub struct TaggedWriter {
    router: Arc<Mutex<LineRouter>>,
    registry: &'static ScopeRegistry,
    capturing: bool,
}

impl TaggedWriter {
    /// Construct a writer backed by the process-global [`ScopeRegistry`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ScopeRegistry::global())
    }

    /// Construct a writer backed by an explicit registry, for tests that
    /// need isolation from the process-global one.
    #[must_use]
    pub fn with_registry(registry: &'static ScopeRegistry) -> Self {
        Self { router: Arc::new(Mutex::new(LineRouter::new())), registry, capturing: false }
    }

    fn with_capture(&self, capturing: bool) -> Self {
        Self { router: self.router.clone(), registry: self.registry, capturing }
    }

    /// Flush any pending partial line for `pid` into its scope and
    /// stdout. Called when a prediction reaches a terminal state, so a
    /// trailing line without a newline isn't lost.
    pub fn flush_pid(&self, pid: &str) {
        let line = {
            let mut router = self.router.lock().expect("line router mutex poisoned");
            router.flush(pid)
        };
        let Some(line) = line else { return };
        println!("{line}");
        if let Some(scope) = self.registry.get(pid) {
            scope.append_log(&line);
        }
    }
}

impl Default for TaggedWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for TaggedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let chunk = String::from_utf8_lossy(buf);
        let pid = self.registry.current_pid();
        let lines = {
            let mut router = self.router.lock().expect("line router mutex poisoned");
            router.write(pid.as_deref(), &chunk)
        };
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for line in &lines {
            writeln!(handle, "{line}")?;
            if self.capturing {
                if let Some(pid) = &pid {
                    if let Some(scope) = self.registry.get(pid) {
                        scope.append_log(line);
                    }
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

impl<'a> MakeWriter<'a> for TaggedWriter {
    type Writer = TaggedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.with_capture(false)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.with_capture(meta.target() == PREDICTOR_LOG_TARGET)
    }
}
