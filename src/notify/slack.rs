use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;

use super::pacing::SendPacer;
use super::{render, DeliverBatch, Subscriber};
use crate::catalog::{Campaign, Game};

/// Batched transport: one Slack message per subscriber webhook per cycle.
pub struct SlackNotifier {
    client: Client,
    pacer: SendPacer,
}

impl SlackNotifier {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            pacer: SendPacer::default(),
        }
    }

    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.pacer = SendPacer::new(interval);
        self
    }

    async fn post(&mut self, url: &str, text: String) -> Result<()> {
        let body = serde_json::json!({ "text": text });
        self.pacer.wait_turn().await;
        let res = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("slack post");
        self.pacer.record_send(Instant::now());
        res?.error_for_status().context("slack non-2xx")?;
        Ok(())
    }
}

impl Default for SlackNotifier {
    fn default() -> Self {
        Self::new()
    }
}

pub fn campaigns_text(campaigns: &[Campaign], subscriber: &Subscriber) -> String {
    let mut text = String::from("*New Twitch Drop Campaigns*");
    for c in campaigns {
        text.push_str("\n• ");
        text.push_str(&render::campaign_line(c, subscriber.timezone()));
    }
    text
}

pub fn games_text(games: &[Game]) -> String {
    let mut text = String::from("*New Games*");
    for g in games {
        text.push_str("\n• ");
        text.push_str(&g.display_name);
    }
    text
}

#[async_trait::async_trait]
impl DeliverBatch for SlackNotifier {
    fn kind(&self) -> &'static str {
        "slack"
    }

    async fn deliver_campaigns(&mut self, subscriber: &Subscriber, campaigns: &[Campaign]) -> Result<()> {
        tracing::info!(webhook = subscriber.identity(), count = campaigns.len(), "sending new campaigns slack message");
        self.post(subscriber.identity(), campaigns_text(campaigns, subscriber))
            .await
    }

    async fn deliver_games(&mut self, subscriber: &Subscriber, games: &[Game]) -> Result<()> {
        tracing::info!(webhook = subscriber.identity(), count = games.len(), "sending new games slack message");
        self.post(subscriber.identity(), games_text(games)).await
    }
}
