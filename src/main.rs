use clap::Parser;
use tracing_subscriber::EnvFilter;

use vidgrab::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // diagnostics go to stderr so they never mix with the prompts;
    // RUST_LOG turns them up when needed
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    Cli::parse().run().await
}
