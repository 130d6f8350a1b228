//! Copyforge CLI entry point.
//!
//! This binary is the composition root for the whole system:
//!
//! 1. **Parse arguments**: the pipeline input file, an optional
//!    `PipelineConfig` JSON file, and provider settings (flags or the
//!    `ANTHROPIC_API_KEY`, `COPYFORGE_MODEL` and `ANTHROPIC_BASE_URL`
//!    environment variables).
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or pretty
//!    layer, plus an OpenTelemetry OTLP exporter when
//!    `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//! 3. **Construct infrastructure**: an [`llm::AnthropicProvider`] injected
//!    into a [`stages::PipelineExecutor`].
//! 4. **Run once** and write the `PipelineResult` JSON to `--output` or
//!    stdout. Ctrl-C cancels the run. The exit status is non-zero when the
//!    run did not succeed.

mod observability;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use llm::{AnthropicConfig, AnthropicProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
use pipeline::{PipelineConfig, PipelineInput, PipelineResult};
use stages::{CancellationToken, PipelineExecutor};

use observability::LogFormat;

#[derive(Debug, Parser)]
#[command(
    name = "copyforge",
    version,
    about = "Generate SEO-aware marketing articles with an LLM pipeline"
)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the pipeline once for a single input.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Pipeline input JSON (topic, targetKeyword, wordCountGoal, ...).
    #[arg(long, short)]
    input: PathBuf,

    /// Pipeline configuration JSON. Omitted fields take their defaults.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Where to write the result JSON. Defaults to stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Debug, Args)]
struct ProviderArgs {
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "COPYFORGE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Transport timeout for a single HTTP exchange, in seconds.
    #[arg(long, default_value_t = 120)]
    http_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _telemetry = observability::init(cli.log_format)?;

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let input: PipelineInput = read_json(&args.input).context("failed to load pipeline input")?;
    let config = match &args.config {
        Some(path) => {
            read_json::<PipelineConfig>(path).context("failed to load pipeline config")?
        }
        None => PipelineConfig::default(),
    };

    let provider = AnthropicProvider::new(
        AnthropicConfig::new(args.provider.api_key)
            .with_model(args.provider.model)
            .with_base_url(args.provider.base_url)
            .with_request_timeout(Duration::from_secs(args.provider.http_timeout_secs)),
    )?;
    let executor = PipelineExecutor::new(Arc::new(provider), config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling run");
            on_interrupt.cancel();
        }
    });

    let result = executor.run_with_cancellation(&input, cancel).await;
    write_result(&result, args.output.as_deref())?;

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn write_result(result: &PipelineResult, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("cannot write {}", path.display()))?;
            tracing::info!(path = %path.display(), success = result.success, "Result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
