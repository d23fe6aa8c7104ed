use anyhow::{Context, Result};
use clap::Parser;
use lexicrawl::{run, Cli, ReqwestBackend};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let controls = cli.build_controls();
    let backend = Arc::new(ReqwestBackend::new().context("failed to build the HTTP client")?);

    let words = run(&controls, backend).await.context("harvest failed")?;

    // Stdout carries exactly one JSON document; diagnostics went to stderr.
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer(&mut out, &words).context("failed to serialize the result")?;
    writeln!(out).context("failed to write the result")?;
    Ok(())
}
