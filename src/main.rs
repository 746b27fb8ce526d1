use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use posttag::{CorpusPipelineBuilder, GatewayError, GroqClientBuilder, MissingTagPolicy, ModelGateway};
use tracing_subscriber::EnvFilter;

/// Prompt sent by `posttag smoke` when none is given.
const SMOKE_PROMPT: &str = "What is the capital of Odisha?";

/// posttag - enrich social-media posts with LLM metadata and unified tags
#[derive(Parser)]
#[command(name = "posttag")]
#[command(about = "Enrich social-media posts with LLM-derived metadata and a unified tag vocabulary")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Extract metadata for every post, unify tags and write the enriched corpus
    Process(ProcessCommand),
    /// Send a single prompt to the configured model and print the reply
    Smoke(SmokeCommand),
}

#[derive(Parser)]
struct ProcessCommand {
    /// JSON array of raw posts
    #[arg(short, long, value_name = "PATH", default_value = "data/raw_posts.json")]
    input: PathBuf,

    /// Destination for the enriched posts
    #[arg(short, long, value_name = "PATH", default_value = "data/processed_posts.json")]
    output: PathBuf,

    /// Post attribute holding the body text
    #[arg(long, value_name = "FIELD", default_value = "text")]
    text_field: String,

    /// What to do with a tag the unified mapping does not cover: fail, keep or drop
    #[arg(long, value_name = "POLICY", default_value = "fail")]
    on_missing_tag: MissingTagPolicy,
}

#[derive(Parser)]
struct SmokeCommand {
    /// Prompt to send
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,
}

fn main() {
    // Load .env before reading any configuration
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Process(cmd) => handle_process(cmd),
        Commands::Smoke(cmd) => handle_smoke(cmd),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

/// 1 for configuration mistakes, 2 for failures during a run.
fn exit_code(error: &anyhow::Error) -> i32 {
    if is_user_error(error) { 1 } else { 2 }
}

/// Determines if an error is a configuration mistake (vs a runtime failure).
fn is_user_error(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<GatewayError>(),
        Some(
            GatewayError::MissingApiKey
                | GatewayError::InvalidUrl(_)
                | GatewayError::InvalidTimeout(_)
        )
    )
}

fn build_gateway() -> Result<Arc<dyn ModelGateway>> {
    let client = GroqClientBuilder::new().build()?;
    tracing::debug!(model = client.model(), base_url = client.base_url(), "model gateway ready");
    Ok(Arc::new(client))
}

/// Handles the process command.
fn handle_process(cmd: &ProcessCommand) -> Result<()> {
    let gateway = build_gateway()?;
    execute_process(cmd, gateway)
}

/// Runs the pipeline with a provided gateway.
///
/// Separated from `handle_process` so tests can pass a stub gateway.
fn execute_process(cmd: &ProcessCommand, gateway: Arc<dyn ModelGateway>) -> Result<()> {
    ensure_parent_directory(&cmd.output)?;

    let pipeline = CorpusPipelineBuilder::new()
        .gateway(gateway)
        .text_field(cmd.text_field.clone())
        .missing_tag_policy(cmd.on_missing_tag)
        .build();

    let summary = pipeline
        .run(&cmd.input, &cmd.output)
        .with_context(|| format!("Failed to process {}", cmd.input.display()))?;

    println!("{summary}");
    Ok(())
}

/// Handles the smoke command by sending one prompt and printing the reply.
fn handle_smoke(cmd: &SmokeCommand) -> Result<()> {
    let gateway = build_gateway()?;
    let prompt = cmd.prompt.as_deref().unwrap_or(SMOKE_PROMPT);

    let reply = gateway
        .complete(prompt)
        .context("Smoke test request failed")?;
    println!("{reply}");
    Ok(())
}

/// Ensures the parent directory of the output file exists.
fn ensure_parent_directory(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create output directory: {}", parent.display())
        })?;
    }
    Ok(())
}
