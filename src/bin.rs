//! Binary entry point for `sippy-agent`.
//!
//! This module provides the command-line interface with options for the config file,
//! logging verbosity, and model overrides. It initializes logging and starts the agent.

use std::sync::Arc;

use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use sippy_agent::{
    base::{config::Config, types::Void},
    interaction::cli::CliOptions,
};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Sippy AI agent – your CI/CD analysis assistant.
///
/// Configuration can come from `.hidden/config.toml` or `SIPPY_AGENT_*` environment
/// variables; the flags below override both.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the agent looks for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: WARN level
    /// - -v: INFO level
    /// - -vv: DEBUG level
    /// - -vvv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Model name to use (e.g., llama3.1:8b, gpt-4.1).
    #[arg(long)]
    model: Option<String>,
    /// OpenAI-compatible LLM API endpoint.
    #[arg(long)]
    endpoint: Option<String>,
    /// Sampling temperature for the model.
    #[arg(long)]
    temperature: Option<f32>,
    /// Maximum reasoning steps per question.
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Print each thought, action, and observation as it happens.
    #[arg(long)]
    show_thinking: bool,
    /// Print the structured response as JSON.
    #[arg(long)]
    json: bool,
    /// Answer a single question and exit.
    #[arg(short, long)]
    query: Option<String>,
    /// Export spans over OTLP/HTTP.
    #[arg(long)]
    otlp: bool,
}

/// Main entry point for the sippy-agent binary.
///
/// Sets up logging based on verbosity, loads configuration, and starts the agent.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Construct the level filter.

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer. Logs go to stderr so they never mix with answers.

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    // Prepare the otlp layer.

    let otel = if args.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("sippy-agent");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stderr).init();

    // Load the config and apply overrides.

    let mut config = Config::load(args.config.as_deref())?;

    {
        let inner = Arc::make_mut(&mut config.inner);

        if let Some(model) = args.model {
            inner.model_name = model;
        }
        if let Some(endpoint) = args.endpoint {
            inner.llm_endpoint = endpoint;
        }
        if let Some(temperature) = args.temperature {
            inner.temperature = temperature;
        }
        if let Some(max_iterations) = args.max_iterations {
            inner.max_iterations = max_iterations;
        }

        inner.validate()?;
    }

    let options = CliOptions {
        show_thinking: args.show_thinking,
        json: args.json,
        query: args.query,
    };

    sippy_agent::start(config, options).await
}
