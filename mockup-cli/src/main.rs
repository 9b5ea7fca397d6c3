//! # Mockup Canvas CLI
//!
//! Headless mockup rendering from the command line.

use clap::Parser;
use mockup_cli::{run, CliArgs, CliConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = CliConfig::from(args);

    tracing::info!(
        design = ?config.design,
        artwork = config.artwork.len(),
        preset = ?config.preset,
        format = %config.format,
        "Starting mockup-cli {}",
        env!("CARGO_PKG_VERSION")
    );

    let summary = run(&config).await?;

    for failure in &summary.failures {
        tracing::warn!("Layer {} was not loaded: {}", failure.record_id, failure.error);
    }
    tracing::info!(
        layers = summary.layers,
        gestures = summary.gestures,
        width = summary.output_size.0,
        height = summary.output_size.1,
        "Done"
    );
    Ok(())
}

/// Initialize tracing with optional JSON output.
///
/// Set `RUST_LOG_FORMAT=json` for structured JSON logs.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mockup_cli=debug,mockup_core=info,mockup_renderer=info"));

    let use_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}
