// src/notify/mux.rs
use anyhow::{anyhow, Context, Result};
use std::time::Duration;

use super::discord::DiscordNotifier;
use super::email::EmailSender;
use super::slack::SlackNotifier;
use super::subscriber::parse_timezone;
use super::{BufferedNotifier, Event, ImmediateNotifier, Interests, Notifier, Subscriber};
use crate::catalog::{Campaign, Game};
use crate::config::{EmailConfig, NotifiersConfig, WebhookSubscriberConfig};
use crate::watchdog::ChangeListener;

/// Fans every change out to all configured notifiers.
#[derive(Default)]
pub struct NotifierMux {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn with(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Builds one notifier per configured section. A section without
    /// subscribers is skipped with a warning; email without credentials is
    /// a configuration error.
    pub fn from_config(cfg: &NotifiersConfig) -> Result<Self> {
        let mut mux = Self::new();

        if let Some(email) = &cfg.email {
            if let Some(n) = build_email(email)? {
                mux.push(Box::new(n));
            }
        }

        if let Some(discord) = &cfg.discord {
            let subs = webhook_subscribers(&discord.subscribers)?;
            if subs.is_empty() {
                tracing::warn!(notifier = "discord", "no subscribers configured, skipping");
            } else {
                let mut transport = DiscordNotifier::new();
                if let Some(ms) = discord.send_interval_ms {
                    transport = transport.with_send_interval(Duration::from_millis(ms));
                }
                mux.push(Box::new(ImmediateNotifier::new(transport).with_subscribers(subs)));
            }
        }

        if let Some(slack) = &cfg.slack {
            let subs = webhook_subscribers(&slack.subscribers)?;
            if subs.is_empty() {
                tracing::warn!(notifier = "slack", "no subscribers configured, skipping");
            } else {
                let mut transport = SlackNotifier::new();
                if let Some(ms) = slack.send_interval_ms {
                    transport = transport.with_send_interval(Duration::from_millis(ms));
                }
                mux.push(Box::new(BufferedNotifier::new(transport).with_subscribers(subs)));
            }
        }

        if mux.is_empty() {
            tracing::warn!("no notifiers configured; changes will only be logged");
        } else {
            tracing::info!(notifiers = ?mux.names(), "notifiers ready");
        }
        Ok(mux)
    }

    /// Routes one event into every notifier, in registration order.
    pub async fn dispatch(&mut self, event: &Event) {
        for n in self.notifiers.iter_mut() {
            let matched = n.route(event).await;
            tracing::debug!(notifier = n.name(), event = %event.kind(), matched, "routed event");
        }
    }

    /// Sends everything buffered. Returns the number of batches attempted.
    pub async fn flush(&mut self) -> usize {
        let mut batches = 0;
        for n in self.notifiers.iter_mut() {
            let sent = n.flush().await;
            if sent > 0 {
                tracing::info!(notifier = n.name(), batches = sent, "flushed notifier");
            }
            batches += sent;
        }
        batches
    }
}

fn build_email(cfg: &EmailConfig) -> Result<Option<BufferedNotifier<EmailSender>>> {
    let creds = cfg
        .credentials
        .as_ref()
        .ok_or_else(|| anyhow!("email notifier requires credentials"))?;

    let mut subs = Vec::with_capacity(cfg.subscribers.len());
    for s in &cfg.subscribers {
        let interests = Interests::from_event_map(&s.events, &s.email)?;
        let tz = parse_timezone(s.timezone.as_deref(), &s.email);
        subs.push(Subscriber::new(s.email.clone(), interests).with_timezone(tz));
    }
    if subs.is_empty() {
        tracing::warn!(notifier = "email", "no subscribers configured, skipping");
        return Ok(None);
    }

    let sender = EmailSender::from_config(creds, cfg.send_interval()).context("email notifier")?;
    Ok(Some(BufferedNotifier::new(sender).with_subscribers(subs)))
}

fn webhook_subscribers(cfgs: &[WebhookSubscriberConfig]) -> Result<Vec<Subscriber>> {
    cfgs.iter()
        .map(|s| {
            let interests = Interests::from_event_map(&s.events, &s.webhook_url)?;
            let tz = parse_timezone(s.timezone.as_deref(), &s.webhook_url);
            Ok(Subscriber::new(s.webhook_url.clone(), interests).with_timezone(tz))
        })
        .collect()
}

#[async_trait::async_trait]
impl ChangeListener for NotifierMux {
    fn name(&self) -> &str {
        "notifiers"
    }

    async fn on_new_campaigns(&mut self, campaigns: &[Campaign]) -> Result<()> {
        for campaign in campaigns {
            self.dispatch(&Event::NewDropCampaign(campaign.clone())).await;
        }
        Ok(())
    }

    async fn on_new_games(&mut self, games: &[Game]) -> Result<()> {
        for game in games {
            self.dispatch(&Event::NewGame(game.clone())).await;
        }
        Ok(())
    }

    async fn on_cycle_complete(&mut self) -> Result<()> {
        self.flush().await;
        Ok(())
    }
}
