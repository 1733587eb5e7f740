// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-prediction runtime state: context, metrics, and lifecycle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

/// Per-prediction context: identity, copied request context, and recorded
/// metrics.
///
/// Created on dispatch, destroyed after the response is flushed. Metric
/// recording is idempotent overwrite, matching a predictor calling
/// `record_metric` more than once for the same name.
#[derive(Debug, Default)]
pub struct Scope {
    pid: String,
    context: BTreeMap<String, String>,
    metrics: Mutex<BTreeMap<String, f64>>,
    logs: Mutex<String>,
}

impl Scope {
    /// Create a scope for `pid`, copying `context` from the incoming
    /// request.
    #[must_use]
    pub fn new(pid: impl Into<String>, context: BTreeMap<String, String>) -> Self {
        Self {
            pid: pid.into(),
            context,
            metrics: Mutex::new(BTreeMap::new()),
            logs: Mutex::new(String::new()),
        }
    }

    /// The pid this scope belongs to.
    #[must_use]
    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// The request-supplied context map.
    #[must_use]
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Record (or overwrite) a metric value.
    pub fn record_metric(&self, name: impl Into<String>, value: f64) {
        self.metrics.lock().expect("scope metrics mutex poisoned").insert(name.into(), value);
    }

    /// A snapshot of every recorded metric, for attaching to the response.
    #[must_use]
    pub fn metrics_snapshot(&self) -> BTreeMap<String, f64> {
        self.metrics.lock().expect("scope metrics mutex poisoned").clone()
    }

    /// Append a captured, already line-tagged log line to this scope's
    /// buffer.
    pub fn append_log(&self, line: &str) {
        let mut logs = self.logs.lock().expect("scope logs mutex poisoned");
        if !logs.is_empty() {
            logs.push('\n');
        }
        logs.push_str(line);
    }

    /// The accumulated log text for this prediction, if anything was
    /// captured.
    #[must_use]
    pub fn logs_snapshot(&self) -> Option<String> {
        let logs = self.logs.lock().expect("scope logs mutex poisoned");
        if logs.is_empty() {
            None
        } else {
            Some(logs.clone())
        }
    }
}

tokio::task_local! {
    /// The pid of the prediction whose task is currently executing, scoped
    /// to that task alone via [`ScopeRegistry::scope_pid`]. Unset outside
    /// any prediction's task (the `[pid=logger]` case).
    ///
    /// A task-local rather than a shared `RwLock` deliberately: two
    /// predictions dispatched concurrently (spec allows `max_concurrency
    /// > 1`) run as separate `tokio::spawn`ed tasks, and a single
    /// process-wide "current pid" would have the second task's `open()`
    /// silently steal attribution from the first's still-running task.
    static CURRENT_PID: String;
}

/// Registry of active [`Scope`]s keyed by pid.
#[derive(Default)]
pub struct ScopeRegistry {
    scopes: RwLock<BTreeMap<String, Arc<Scope>>>,
}

fn global() -> &'static ScopeRegistry {
    static REGISTRY: OnceLock<ScopeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ScopeRegistry::default)
}

impl ScopeRegistry {
    /// Construct an empty registry (isolated instance, for tests).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-global registry shared by the whole runner.
    #[must_use]
    pub fn global() -> &'static ScopeRegistry {
        global()
    }

    /// Open a new scope for `pid`.
    pub fn open(&self, pid: impl Into<String>, context: BTreeMap<String, String>) -> Arc<Scope> {
        let pid = pid.into();
        let scope = Arc::new(Scope::new(pid.clone(), context));
        self.scopes.write().expect("scope map poisoned").insert(pid, scope.clone());
        scope
    }

    /// Look up the scope for `pid`, if still open.
    #[must_use]
    pub fn get(&self, pid: &str) -> Option<Arc<Scope>> {
        self.scopes.read().expect("scope map poisoned").get(pid).cloned()
    }

    /// The pid of the prediction task currently executing on this async
    /// task, or `None` if none (`[pid=logger]`). Reads the task-local set
    /// by [`ScopeRegistry::scope_pid`] for the task that's actually
    /// polling right now, so concurrently running predictions each see
    /// only their own pid.
    #[must_use]
    pub fn current_pid(&self) -> Option<String> {
        CURRENT_PID.try_with(Clone::clone).ok()
    }

    /// Run `fut` with `pid` established as the current pid for the
    /// duration of its own execution only. Every log line written (and
    /// every `tracing` call made) while `fut` itself is being polled is
    /// attributed to `pid`; other tasks polled concurrently (another
    /// prediction, the event loop) are unaffected.
    pub async fn scope_pid<F: std::future::Future>(&self, pid: String, fut: F) -> F::Output {
        CURRENT_PID.scope(pid, fut).await
    }

    /// Close and drop the scope for `pid`.
    pub fn close(&self, pid: &str) {
        self.scopes.write().expect("scope map poisoned").remove(pid);
    }
}
