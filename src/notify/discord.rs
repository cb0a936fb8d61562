use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use super::pacing::SendPacer;
use super::{render, Deliver, Subscriber};
use crate::catalog::{Campaign, Game};

/// Immediate transport: one embed per event, posted to the subscriber's webhook.
pub struct DiscordNotifier {
    client: Client,
    timeout: Duration,
    max_retries: u8,
    pacer: SendPacer,
}

impl DiscordNotifier {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
            pacer: SendPacer::new(Duration::from_secs(1)),
        }
    }

    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.pacer = SendPacer::new(interval);
        self
    }

    async fn post(&mut self, webhook: &str, payload: &DiscordWebhookPayload) -> Result<()> {
        self.pacer.wait_turn().await;
        let res = self.post_with_retries(webhook, payload).await;
        self.pacer.record_send(Instant::now());
        res
    }

    async fn post_with_retries(&self, webhook: &str, payload: &DiscordWebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                            continue;
                        }
                        return Err(anyhow!("Discord webhook HTTP error: {e}"));
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("Discord webhook request failed: {e}"));
                }
            }
        }
    }
}

impl Default for DiscordNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Deliver for DiscordNotifier {
    fn kind(&self) -> &'static str {
        "discord"
    }

    async fn deliver_campaign(&mut self, subscriber: &Subscriber, campaign: &Campaign) -> Result<()> {
        tracing::info!(webhook = subscriber.identity(), campaign_id = %campaign.id, "sending new_drop_campaign discord notification");
        let payload = DiscordWebhookPayload::campaign(campaign, subscriber);
        self.post(subscriber.identity(), &payload).await
    }

    async fn deliver_game(&mut self, subscriber: &Subscriber, game: &Game) -> Result<()> {
        tracing::info!(webhook = subscriber.identity(), game_id = %game.id, "sending new_game discord notification");
        let payload = DiscordWebhookPayload::game(game);
        self.post(subscriber.identity(), &payload).await
    }
}

#[derive(Debug, Serialize)]
struct DiscordField {
    name: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct DiscordThumbnail {
    url: String,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    fields: Vec<DiscordField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<DiscordThumbnail>,
}

#[derive(Debug, Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

fn field(name: &str, value: impl Into<String>) -> DiscordField {
    DiscordField {
        name: name.to_string(),
        value: value.into(),
    }
}

impl DiscordWebhookPayload {
    fn embed(title: &str, fields: Vec<DiscordField>, thumbnail: Option<&str>) -> Self {
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: title.to_string(),
                fields,
                thumbnail: thumbnail.map(|url| DiscordThumbnail {
                    url: url.to_string(),
                }),
            }],
        }
    }

    fn campaign(c: &Campaign, subscriber: &Subscriber) -> Self {
        let tz = subscriber.timezone();
        Self::embed(
            "New Drop Campaign",
            vec![
                field("Game", c.game.display_name.as_str()),
                field("Campaign", c.name.as_str()),
                field("Starts", render::format_time(c.start_at, tz)),
                field("Ends", render::format_time(c.end_at, tz)),
            ],
            c.thumbnail_url(),
        )
    }

    fn game(g: &Game) -> Self {
        Self::embed(
            "New Game",
            vec![field("Name", g.display_name.as_str())],
            g.box_art_url.as_deref(),
        )
    }
}
