// src/notify/dispatch.rs
use anyhow::Result;
use metrics::counter;
use std::collections::BTreeMap;

use super::{Deliver, DeliverBatch, EventKind, Notifier, Subscriber};
use crate::catalog::{Campaign, Game};

/// Counts and logs one delivery attempt. Returns whether it succeeded.
fn record_delivery(notifier: &'static str, subscriber: &Subscriber, kind: EventKind, res: Result<()>) -> bool {
    match res {
        Ok(()) => {
            counter!("notify_deliveries_total", "notifier" => notifier).increment(1);
            true
        }
        Err(e) => {
            tracing::error!(
                notifier,
                subscriber = subscriber.identity(),
                event = %kind,
                "error notifying subscriber: {e:#}"
            );
            counter!("notify_delivery_errors_total", "notifier" => notifier).increment(1);
            false
        }
    }
}

/// Delivers each event to each matching subscriber right away.
pub struct ImmediateNotifier<D> {
    subscribers: Vec<Subscriber>,
    transport: D,
}

impl<D: Deliver> ImmediateNotifier<D> {
    pub fn new(transport: D) -> Self {
        Self {
            subscribers: Vec::new(),
            transport,
        }
    }

    pub fn with_subscribers(mut self, subscribers: impl IntoIterator<Item = Subscriber>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    pub fn transport(&self) -> &D {
        &self.transport
    }
}

#[async_trait::async_trait]
impl<D: Deliver> Notifier for ImmediateNotifier<D> {
    fn name(&self) -> &'static str {
        self.transport.kind()
    }

    fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    fn subscribers(&self) -> &[Subscriber] {
        &self.subscribers
    }

    async fn route_campaign(&mut self, campaign: &Campaign) -> usize {
        let Self {
            subscribers,
            transport,
        } = self;
        let name = transport.kind();
        let mut matched = 0;
        for sub in subscribers.iter().filter(|s| s.wants_campaign(campaign)) {
            matched += 1;
            let res = transport.deliver_campaign(sub, campaign).await;
            record_delivery(name, sub, EventKind::NewDropCampaign, res);
        }
        matched
    }

    async fn route_game(&mut self, game: &Game) -> usize {
        let Self {
            subscribers,
            transport,
        } = self;
        let name = transport.kind();
        let mut matched = 0;
        for sub in subscribers.iter().filter(|s| s.wants_game(game)) {
            matched += 1;
            let res = transport.deliver_game(sub, game).await;
            record_delivery(name, sub, EventKind::NewGame, res);
        }
        matched
    }

    async fn flush(&mut self) -> usize {
        0
    }
}

/// Pending entities per subscriber, keyed by registration index so flush
/// order follows subscription order.
#[derive(Debug, Default)]
struct EventBuffers {
    campaigns: BTreeMap<usize, Vec<Campaign>>,
    games: BTreeMap<usize, Vec<Game>>,
}

/// Accumulates matches during a cycle and sends one batch per
/// (event kind, subscriber) on flush.
pub struct BufferedNotifier<D> {
    subscribers: Vec<Subscriber>,
    buffers: EventBuffers,
    transport: D,
}

impl<D: DeliverBatch> BufferedNotifier<D> {
    pub fn new(transport: D) -> Self {
        Self {
            subscribers: Vec::new(),
            buffers: EventBuffers::default(),
            transport,
        }
    }

    pub fn with_subscribers(mut self, subscribers: impl IntoIterator<Item = Subscriber>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    pub fn transport(&self) -> &D {
        &self.transport
    }

    /// Number of entities waiting for `kind` across all subscribers.
    pub fn pending(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::NewDropCampaign => self.buffers.campaigns.values().map(Vec::len).sum(),
            EventKind::NewGame => self.buffers.games.values().map(Vec::len).sum(),
        }
    }

    /// Sends and clears the buffers of one kind only. An entry is cleared
    /// whether or not its batch call succeeded; the other kind is untouched.
    pub async fn flush_kind(&mut self, kind: EventKind) -> usize {
        let name = self.transport.kind();
        let mut sent = 0;
        match kind {
            EventKind::NewDropCampaign => {
                let pending = std::mem::take(&mut self.buffers.campaigns);
                for (idx, campaigns) in pending {
                    let Some(sub) = self.subscribers.get(idx) else { continue };
                    if campaigns.is_empty() {
                        continue;
                    }
                    tracing::debug!(notifier = name, subscriber = sub.identity(), count = campaigns.len(), "flushing campaigns");
                    let res = self.transport.deliver_campaigns(sub, &campaigns).await;
                    record_delivery(name, sub, kind, res);
                    sent += 1;
                }
            }
            EventKind::NewGame => {
                let pending = std::mem::take(&mut self.buffers.games);
                for (idx, games) in pending {
                    let Some(sub) = self.subscribers.get(idx) else { continue };
                    if games.is_empty() {
                        continue;
                    }
                    tracing::debug!(notifier = name, subscriber = sub.identity(), count = games.len(), "flushing games");
                    let res = self.transport.deliver_games(sub, &games).await;
                    record_delivery(name, sub, kind, res);
                    sent += 1;
                }
            }
        }
        sent
    }
}

#[async_trait::async_trait]
impl<D: DeliverBatch> Notifier for BufferedNotifier<D> {
    fn name(&self) -> &'static str {
        self.transport.kind()
    }

    fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    fn subscribers(&self) -> &[Subscriber] {
        &self.subscribers
    }

    async fn route_campaign(&mut self, campaign: &Campaign) -> usize {
        let mut matched = 0;
        for (idx, sub) in self.subscribers.iter().enumerate() {
            if sub.wants_campaign(campaign) {
                self.buffers
                    .campaigns
                    .entry(idx)
                    .or_default()
                    .push(campaign.clone());
                matched += 1;
            }
        }
        matched
    }

    async fn route_game(&mut self, game: &Game) -> usize {
        let mut matched = 0;
        for (idx, sub) in self.subscribers.iter().enumerate() {
            if sub.wants_game(game) {
                self.buffers.games.entry(idx).or_default().push(game.clone());
                matched += 1;
            }
        }
        matched
    }

    async fn flush(&mut self) -> usize {
        let mut sent = 0;
        for kind in EventKind::ALL {
            sent += self.flush_kind(kind).await;
        }
        sent
    }
}
