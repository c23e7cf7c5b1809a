use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use garmin_dives_client::garmin::ReqwestGarminClient;
use garmin_dives_client::payload::ReqwestPayloadClient;
use garmin_dives_sync::{DiveSync, SyncConfig, observability};

/// Import new Garmin Connect dives into Payload CMS.
#[derive(Parser, Debug)]
#[command(name = "garmin-dives-sync", version, about)]
struct Cli {
    /// Fetch and transform, but write nothing.
    #[arg(long)]
    dry_run: bool,

    /// Fetch from this date (YYYY-MM-DD) instead of the stored cursor.
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Days to reach back when the collection is empty.
    #[arg(long)]
    lookback_days: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let log_env = observability::log_directive(|k| std::env::var(k).ok());
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(observability::env_filter(&log_env))
        .init();
    tracing::info!("garmin-dives-sync: log filter: {}", log_env);

    let mut config = SyncConfig::from_env().context("loading configuration")?;
    config.options.dry_run = cli.dry_run;
    config.options.since = cli.since;
    if let Some(days) = cli.lookback_days {
        config.options.lookback_days = days;
    }

    let garmin = ReqwestGarminClient::from_config(&config.garmin)?;
    let payload = ReqwestPayloadClient::from_config(&config.payload)?;
    let sync = DiveSync::new(
        Arc::new(garmin),
        config.garmin.credentials.clone(),
        Arc::new(payload),
        config.payload.credentials.clone(),
        config.options,
    );

    let today = chrono::Local::now().date_naive();
    let report = sync.run(today).await.context("sync failed")?;
    tracing::info!(
        "garmin-dives-sync: {} created, {} already stored, {} skipped",
        report.created,
        report.already_present,
        report.skipped
    );
    Ok(())
}
