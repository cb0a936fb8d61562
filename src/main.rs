//! Twitch Drops Watchdog: binary entrypoint
//! Loads config, wires the catalog client, state store and notifiers into
//! the watchdog, then polls until Ctrl-C / SIGTERM.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use twitch_drops_watchdog::catalog::twitch_gql::TwitchGqlClient;
use twitch_drops_watchdog::metrics::{describe_metrics, Metrics};
use twitch_drops_watchdog::{config, JsonFileStore, NotifierMux, Watchdog};

#[derive(Parser, Debug)]
#[command(name = "twitch-drops-watchdog", version, about = "Notifies subscribers about new Twitch Drop campaigns and games")]
struct Cli {
    /// Config file (TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minutes between polls; overrides the config file
    #[arg(long, value_name = "MINUTES")]
    polling_interval: Option<u64>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("twitch_drops_watchdog=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn start_metrics_server() -> Result<()> {
    let Ok(addr) = std::env::var("METRICS_ADDR") else {
        describe_metrics();
        return Ok(());
    };
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid METRICS_ADDR {addr}"))?;
    let metrics = Metrics::install()?;
    tokio::spawn(async move {
        if let Err(e) = metrics.serve(addr).await {
            tracing::error!("metrics server stopped: {e:#}");
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e:#}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e:#}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    // 1) Config
    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(minutes) = cli.polling_interval {
        cfg.set_polling_interval(minutes)
            .context("invalid --polling-interval")?;
    }

    start_metrics_server()?;

    // 2) Components
    let client = TwitchGqlClient::from_config(&cfg.twitch)?;
    let store = JsonFileStore::open(&cfg.database_path).await?;
    let notifiers = NotifierMux::from_config(&cfg.notifiers)?;

    let mut watchdog = Watchdog::new(Box::new(client), Box::new(store), cfg.polling_interval())
        .with_detail_enrichment(cfg.fetch_details);
    watchdog.add_listener(Box::new(notifiers));

    // 3) Run
    if cli.once {
        let report = watchdog.run_cycle(Utc::now()).await?;
        tracing::info!(
            new_campaigns = report.new_campaigns.len(),
            new_games = report.new_games.len(),
            "single cycle finished"
        );
        return Ok(());
    }

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown requested");
        let _ = tx.send(true);
    });

    watchdog.run(rx).await;
    Ok(())
}
