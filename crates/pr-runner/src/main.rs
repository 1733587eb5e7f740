// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

use async_trait::async_trait;
use clap::Parser;
use indexmap::IndexMap;
use pr_predictor::{PredictCallable, PredictorImpl};
use pr_runner::{PredictorFactory, PredictorRegistry, RunnerArgs};
use pr_schema::{InputDecl, OutputKind, OutputType, PredictorBuilder};
use pr_scope::TaggedWriter;
use pr_value::{CanonicalValue, CoderRegistry, FieldType, PrimitiveType};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Watches a working directory and serves a registered predictor (spec §6
/// CLI surface).
#[derive(Parser, Debug)]
#[command(name = "predict-runner", version, about = "ML prediction runner core")]
struct Args {
    /// Identifier this runner reports as over IPC.
    #[arg(long)]
    name: String,

    /// Base URL the runner POSTs `{name, pid, status}` status updates to.
    #[arg(long = "ipc-url")]
    ipc_url: Option<String>,

    /// Shared working directory exchanged with the parent orchestrator.
    #[arg(long = "working-dir", default_value = ".")]
    working_dir: PathBuf,
}

/// The built-in demo predictor registered under `demo::Echo`, present so
/// the binary is runnable without a downstream crate supplying its own
/// [`PredictorFactory`]. A real deployment registers its own predictor(s)
/// here instead, the same way `abp-daemon`'s `main` wires up its backends.
struct EchoPredictor;

#[async_trait]
impl PredictorImpl for EchoPredictor {
    fn predict(&self, inputs: IndexMap<String, CanonicalValue>) -> PredictCallable {
        let s = match inputs.get("s") {
            Some(CanonicalValue::String(s)) => s.clone(),
            _ => String::new(),
        };
        PredictCallable::Single(Ok(serde_json::json!(format!("*{s}*"))))
    }
}

struct EchoFactory;

impl PredictorFactory for EchoFactory {
    fn build(
        &self,
        coders: &CoderRegistry,
    ) -> Result<(pr_schema::PredictorInfo, Arc<dyn PredictorImpl>), pr_error::RunnerError> {
        let info = PredictorBuilder::new("demo", "Echo")
            .input(InputDecl {
                name: "s".into(),
                field_type: FieldType::required(PrimitiveType::String),
                default: None,
                constraints: Default::default(),
            })
            .output(OutputType::scalar(OutputKind::Single, PrimitiveType::String)?)
            .build(coders)
            .map_err(|mut errs| errs.remove(0))?;
        Ok((info, Arc::new(EchoPredictor)))
    }
}

fn default_registry() -> PredictorRegistry {
    let mut registry = PredictorRegistry::new();
    registry.register("demo", "Echo", EchoFactory);
    registry
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = std::env::var("COG_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let writer = TaggedWriter::new();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(writer.clone())
        .init();

    let runner_args =
        RunnerArgs { name: args.name, ipc_url: args.ipc_url, working_dir: args.working_dir };

    let outcome = pr_runner::run(runner_args, default_registry(), writer).await;
    std::process::exit(outcome.code());
}
