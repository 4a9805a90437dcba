// Flowlet CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Validate the workflow name against the closed registry
//                  before building the engine, so typos fail fast without
//                  touching the provider.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flowlet_openai::OpenAiDriver;
use flowlet_worker::workflows::build_engine;
use flowlet_worker::{WorkerConfig, WorkflowKind};

#[derive(Parser)]
#[command(name = "flowlet")]
#[command(about = "Flowlet - run durable n8n-style automation workflows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow with a JSON input object
    Run {
        /// Workflow name (see `flowlet list`)
        workflow: String,

        /// JSON input matching the workflow's input shape
        input: String,
    },

    /// List the registered workflow names
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any configuration
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { workflow, input } => run(&workflow, &input).await,
        Commands::List => {
            for kind in WorkflowKind::ALL {
                println!("{}", kind.as_str());
            }
            Ok(())
        }
    }
}

async fn run(workflow: &str, input: &str) -> anyhow::Result<()> {
    let kind = WorkflowKind::from_str(workflow)?;
    let input: serde_json::Value =
        serde_json::from_str(input).context("input is not valid JSON")?;

    let config = WorkerConfig::from_env();
    tracing::info!(
        workflow = kind.as_str(),
        task_queue = %config.task_queue,
        "starting workflow run"
    );

    let driver = OpenAiDriver::new()
        .context("failed to construct the OpenAI driver")?
        .with_default_model(config.default_model.clone());
    let engine = build_engine(Arc::new(driver));

    let result = engine
        .run(kind.as_str(), input)
        .await
        .with_context(|| format!("workflow {} failed", kind.as_str()))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
