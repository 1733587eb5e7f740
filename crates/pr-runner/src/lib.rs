// SPDX-License-Identifier: MIT OR Apache-2.0
//! pr_runner
//!
//! The file-runner event loop (spec §4.6) and the lifecycle handshake
//! around it (spec §4.7): reads `config.json`, builds the predictor via a
//! registered [`PredictorFactory`], runs setup, then watches the working
//! directory for `request-*`/`cancel-*` files until the parent drops a
//! `stop` file.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod ipc;
mod lifecycle;
mod loop_;
mod registry;
mod request;
mod response;
mod setup;
mod task;
mod workdir;

pub use config::{wait_for_config, RunnerConfig, CONFIG_WAIT_TIMEOUT};
pub use ipc::{IpcClient, IpcStatus};
pub use lifecycle::{ignore_keyboard_interrupt, ExitOutcome};
pub use loop_::{EventLoop, POLL_INTERVAL};
pub use registry::{PredictorFactory, PredictorRegistry};
pub use request::PredictionRequest;
pub use response::{PredictionResponse, PredictionStatus};
pub use setup::SetupStatus;
pub use task::PredictionContext;
pub use workdir::{atomic_write, parse_cancel_filename, parse_request_filename, response_filename};

use pr_scope::{ScopeRegistry, TaggedWriter};
use std::path::PathBuf;
use std::sync::Arc;

/// Runtime parameters supplied on the command line (spec §6 CLI surface).
#[derive(Debug, Clone)]
pub struct RunnerArgs {
    /// The `--name` the runner identifies itself as over IPC.
    pub name: String,
    /// The `--ipc-url` status updates are POSTed to, if any.
    pub ipc_url: Option<String>,
    /// The `--working-dir` shared with the parent orchestrator.
    pub working_dir: PathBuf,
}

/// Run the full startup handshake (config handshake, schema build,
/// predictor setup) followed by the main request/cancel loop, returning
/// the process exit outcome once the loop stops.
pub async fn run(args: RunnerArgs, registry: PredictorRegistry, writer: TaggedWriter) -> ExitOutcome {
    let config = match wait_for_config(&args.working_dir).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "config.json did not arrive in time");
            return ExitOutcome::ConfigMissing;
        }
    };

    if let Err(e) = setup::clean_stale_artifacts(&args.working_dir).await {
        tracing::error!(error = %e, "failed cleaning stale artifacts");
    }

    let started_at = chrono::Utc::now().to_rfc3339();
    let ipc = Arc::new(IpcClient::new(args.name.clone(), args.ipc_url.clone()));

    let factory = match registry.resolve(&config.module_name, &config.predictor_name) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(error = %e, "no predictor registered for the configured module/predictor");
            let _ = setup::write_setup_result(&args.working_dir, &started_at, SetupStatus::Failed).await;
            return ExitOutcome::SetupFailed;
        }
    };

    let coders = pr_value::CoderRegistry::new();
    let (info, imp) = match factory.build(&coders) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed building predictor schema");
            let _ = setup::write_setup_result(&args.working_dir, &started_at, SetupStatus::Failed).await;
            return ExitOutcome::SetupFailed;
        }
    };

    if let Err(e) = setup::write_openapi(&args.working_dir, &info).await {
        tracing::error!(error = %e, "failed writing openapi.json");
    }

    let adapter = Arc::new(pr_predictor::PredictorAdapter::new(info, coders, imp));

    if let Err(e) = adapter.setup().await {
        tracing::error!(error = %e, "predictor setup failed");
        let _ = setup::write_setup_result(&args.working_dir, &started_at, SetupStatus::Failed).await;
        return ExitOutcome::SetupFailed;
    }
    if let Err(e) = setup::write_setup_result(&args.working_dir, &started_at, SetupStatus::Succeeded).await {
        tracing::error!(error = %e, "failed writing setup_result.json");
    }
    if let Err(e) = setup::write_async_predict_marker(&args.working_dir).await {
        tracing::error!(error = %e, "failed writing async_predict marker");
    }

    // Keep the ignoring task alive for the rest of the process; a terminal
    // SIGINT should reach the parent, not stop this runner.
    let _sigint_guard = lifecycle::ignore_keyboard_interrupt();

    ipc.notify(IpcStatus::Ready, None).await;
    if let Err(e) = setup::write_ready_marker(&args.working_dir).await {
        tracing::error!(error = %e, "failed writing ready marker");
    }

    let ctx = Arc::new(PredictionContext {
        working_dir: args.working_dir.clone(),
        adapter,
        ipc: ipc.clone(),
        writer,
        scope_registry: ScopeRegistry::global(),
    });

    EventLoop::new(ctx, ipc, config.max_concurrency).run().await;

    ExitOutcome::Normal
}
