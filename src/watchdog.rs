//! # Watchdog
//! Polls the catalog, diffs against the state store and raises each new
//! campaign / new game exactly once per store record.
//!
//! One cycle: expire → fetch → diff → persist → (enrich) → notify → flush.
//! Everything runs sequentially on the caller's task; the only wait between
//! cycles is the interval sleep, which a shutdown signal interrupts.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::catalog::{Campaign, CatalogClient, Game};
use crate::store::StateStore;

/// Receives the batches raised by a cycle. Every hook is isolated: an error
/// is logged by the watchdog and never reaches other listeners.
#[async_trait::async_trait]
pub trait ChangeListener: Send {
    fn name(&self) -> &str {
        "listener"
    }

    async fn on_new_campaigns(&mut self, _campaigns: &[Campaign]) -> Result<()> {
        Ok(())
    }

    async fn on_new_games(&mut self, _games: &[Game]) -> Result<()> {
        Ok(())
    }

    /// Called once per successful cycle after both batches were delivered.
    async fn on_cycle_complete(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Typed form of the listener hooks, for consumers behind a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    NewCampaigns(Vec<Campaign>),
    NewGames(Vec<Game>),
    CycleComplete,
}

/// Forwards every hook onto an mpsc channel.
pub struct ChannelListener {
    tx: mpsc::Sender<WatchdogEvent>,
}

impl ChannelListener {
    pub fn new(tx: mpsc::Sender<WatchdogEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<WatchdogEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    async fn forward(&self, ev: WatchdogEvent) -> Result<()> {
        self.tx
            .send(ev)
            .await
            .map_err(|_| anyhow!("watchdog event channel closed"))
    }
}

#[async_trait::async_trait]
impl ChangeListener for ChannelListener {
    fn name(&self) -> &str {
        "channel"
    }

    async fn on_new_campaigns(&mut self, campaigns: &[Campaign]) -> Result<()> {
        self.forward(WatchdogEvent::NewCampaigns(campaigns.to_vec()))
            .await
    }

    async fn on_new_games(&mut self, games: &[Game]) -> Result<()> {
        self.forward(WatchdogEvent::NewGames(games.to_vec())).await
    }

    async fn on_cycle_complete(&mut self) -> Result<()> {
        self.forward(WatchdogEvent::CycleComplete).await
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub expired: usize,
    pub fetched: usize,
    pub skipped_ended: usize,
    pub new_campaigns: Vec<Campaign>,
    pub new_games: Vec<Game>,
}

pub struct Watchdog {
    client: Box<dyn CatalogClient>,
    store: Box<dyn StateStore>,
    interval: Duration,
    fetch_details: bool,
    listeners: Vec<Box<dyn ChangeListener>>,
}

impl Watchdog {
    pub fn new(client: Box<dyn CatalogClient>, store: Box<dyn StateStore>, interval: Duration) -> Self {
        Self {
            client,
            store,
            interval,
            fetch_details: false,
            listeners: Vec::new(),
        }
    }

    /// Replace list records of new campaigns with their detail records
    /// before notifying.
    pub fn with_detail_enrichment(mut self, enabled: bool) -> Self {
        self.fetch_details = enabled;
        self
    }

    /// Listeners run in registration order.
    pub fn add_listener(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    /// Polls until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            client = self.client.name(),
            interval_secs = self.interval.as_secs(),
            listeners = self.listeners.len(),
            "watchdog started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_cycle(Utc::now()).await {
                Ok(report) => {
                    tracing::info!(
                        fetched = report.fetched,
                        expired = report.expired,
                        new_campaigns = report.new_campaigns.len(),
                        new_games = report.new_games.len(),
                        "poll cycle finished"
                    );
                }
                Err(e) => {
                    tracing::error!("failed to update drop campaigns: {e:#}");
                    counter!("watchdog_cycle_errors_total").increment(1);
                }
            }

            tracing::info!(secs = self.interval.as_secs(), "sleeping until next poll");
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("watchdog stopped");
    }

    /// One full cycle at `now`. Errors before notification abort the cycle
    /// without raising events; listener errors never surface here.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        counter!("watchdog_cycles_total").increment(1);
        let mut report = self.update(now).await?;

        if self.fetch_details && !report.new_campaigns.is_empty() {
            enrich(self.client.as_ref(), &mut report.new_campaigns).await;
        }

        self.notify(&report).await;
        gauge!("watchdog_last_cycle_ts").set(now.timestamp() as f64);
        Ok(report)
    }

    /// Expire, fetch, diff and persist.
    async fn update(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        // 1) Expiry is driven by time only, not by absence upstream.
        let known = self
            .store
            .list_campaigns()
            .await
            .context("list known campaigns")?;
        for (id, rec) in known {
            if rec.end_at <= now {
                self.store
                    .remove_campaign(&id)
                    .await
                    .with_context(|| format!("remove expired campaign {id}"))?;
                tracing::debug!(campaign_id = %id, "expired campaign removed");
                report.expired += 1;
            }
        }
        counter!("watchdog_expired_campaigns_total").increment(report.expired as u64);

        // 2) Fetch
        tracing::info!("fetching campaigns...");
        let campaigns = self
            .client
            .list_campaigns()
            .await
            .context("fetch drop campaigns")?;
        report.fetched = campaigns.len();
        tracing::info!(count = campaigns.len(), "found campaigns");

        // 3) Diff, in upstream order
        for campaign in campaigns {
            if campaign.has_ended(now) {
                report.skipped_ended += 1;
                continue;
            }

            if self
                .store
                .add_campaign(&campaign)
                .await
                .with_context(|| format!("add campaign {}", campaign.id))?
            {
                tracing::info!(game = %campaign.game.display_name, campaign = %campaign.name, "new campaign");
                counter!("watchdog_new_campaigns_total").increment(1);
                report.new_campaigns.push(campaign.clone());
            }

            if self
                .store
                .add_game(&campaign.game)
                .await
                .with_context(|| format!("add game {}", campaign.game.id))?
            {
                tracing::info!(game = %campaign.game.display_name, "new game");
                counter!("watchdog_new_games_total").increment(1);
                report.new_games.push(campaign.game);
            }
        }

        // 4) Persist; a failed save still lets this cycle notify.
        if let Err(e) = self.store.save().await {
            tracing::error!("failed to save state store: {e:#}");
        }

        Ok(report)
    }

    async fn notify(&mut self, report: &CycleReport) {
        if !report.new_campaigns.is_empty() {
            for listener in self.listeners.iter_mut() {
                if let Err(e) = listener.on_new_campaigns(&report.new_campaigns).await {
                    tracing::error!(listener = listener.name(), "listener failed on new campaigns: {e:#}");
                    counter!("watchdog_listener_errors_total").increment(1);
                }
            }
        }

        if !report.new_games.is_empty() {
            for listener in self.listeners.iter_mut() {
                if let Err(e) = listener.on_new_games(&report.new_games).await {
                    tracing::error!(listener = listener.name(), "listener failed on new games: {e:#}");
                    counter!("watchdog_listener_errors_total").increment(1);
                }
            }
        }

        for listener in self.listeners.iter_mut() {
            if let Err(e) = listener.on_cycle_complete().await {
                tracing::error!(listener = listener.name(), "listener failed to complete cycle: {e:#}");
                counter!("watchdog_listener_errors_total").increment(1);
            }
        }
    }
}

/// Swaps list records for detail records; any failure keeps the list records.
async fn enrich(client: &dyn CatalogClient, campaigns: &mut [Campaign]) {
    let ids: Vec<String> = campaigns.iter().map(|c| c.id.clone()).collect();
    match client.get_campaign_details(&ids).await {
        Ok(details) => {
            let mut by_id: HashMap<String, Campaign> =
                details.into_iter().map(|d| (d.id.clone(), d)).collect();
            for c in campaigns.iter_mut() {
                if let Some(d) = by_id.remove(&c.id) {
                    *c = d;
                }
            }
        }
        Err(e) => {
            tracing::warn!("campaign details unavailable, using list records: {e:#}");
        }
    }
}
