use anyhow::{Context, Result};
use chrono::Local;
use eps_noms::{
    fetch::HttpFetcher, store::GcsStore, workbook::XlsxLoader, Config, Pipeline, RunOutcome,
};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Exit status for a run that had nothing to do.
const EXIT_NO_OP: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    match run().await {
        Ok(outcome) if outcome.is_no_op() => {
            info!(?outcome, "no-op");
            ExitCode::from(EXIT_NO_OP)
        }
        Ok(outcome) => {
            info!(?outcome, "archived");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RunOutcome> {
    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::load().context("loading configuration")?;
    info!(
        listing = %config.listing_url,
        bucket = %config.archive.bucket,
        prefix = %config.archive.prefix,
        work_dir = %config.work_dir.display(),
        "configured"
    );

    // ─── 3) collaborators ────────────────────────────────────────────
    let fetcher = HttpFetcher::new(&config.http)?;
    let store = GcsStore::connect(&config.archive)
        .await
        .context("connecting to the archive bucket")?;

    // ─── 4) one run ──────────────────────────────────────────────────
    let outcome = Pipeline::new(&config, &fetcher, &store, &XlsxLoader)
        .run(Local::now().naive_local())
        .await?;
    Ok(outcome)
}
