/// fanfetch - concurrent downloader
///
/// Fetches every configured URL in parallel under one shared deadline, writes
/// each body to its own file, and prints one status line per URL followed by
/// a completion line. Logs and progress go to stderr.
use clap::Parser;
use tracing::info;

use fanfetch_downloader::config::Args;
use fanfetch_downloader::{Config, Coordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing on stderr so stdout carries only status lines
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fanfetch_downloader=info,fanfetch_shared=info,fanfetch::progress=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args)?;
    let coordinator = Coordinator::new(config)?;

    let mut stdout = std::io::stdout();
    let report = coordinator.run(&mut stdout).await?;

    info!(
        "{} of {} download(s) succeeded",
        report.summary.succeeded, report.summary.total
    );
    Ok(())
}
