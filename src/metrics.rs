// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Registers help text for every metric the watchdog emits (once per process).
pub fn describe_metrics() {
    DESCRIBED.get_or_init(|| {
        describe_counter!("watchdog_cycles_total", "Poll cycles started");
        describe_counter!("watchdog_cycle_errors_total", "Poll cycles aborted by an error");
        describe_counter!("watchdog_new_campaigns_total", "Campaigns seen for the first time");
        describe_counter!("watchdog_new_games_total", "Games seen for the first time");
        describe_counter!("watchdog_expired_campaigns_total", "Known campaigns removed after their end time");
        describe_counter!("watchdog_listener_errors_total", "Listener hooks that returned an error");
        describe_gauge!("watchdog_last_cycle_ts", "Unix time of the last successful cycle");
        describe_counter!("notify_deliveries_total", "Successful deliveries per notifier");
        describe_counter!("notify_delivery_errors_total", "Failed deliveries per notifier");
        describe_counter!("catalog_malformed_campaigns_total", "Upstream campaign records that failed to parse");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_metrics();
        Ok(Self { handle })
    }

    /// Wrap an existing handle (e.g. from a locally scoped recorder).
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// `/metrics` in the Prometheus exposition format plus `/healthz`.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new()
            .route("/healthz", get(|| async { "ok" }))
            .route(
                "/metrics",
                get(move || {
                    let h = handle.clone();
                    async move { h.render() }
                }),
            )
    }

    /// Serve the router until the task is dropped.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind metrics listener on {addr}"))?;
        tracing::info!(%addr, "metrics endpoint listening");
        axum::serve(listener, self.router())
            .await
            .context("metrics server")
    }
}
