//! Notifier framework: subscribers with interest filters, notifiers that
//! route events to them, and the transports that do the actual delivery.

pub mod discord;
pub mod dispatch;
pub mod email;
pub mod mux;
pub mod pacing;
pub mod render;
pub mod slack;
pub mod subscriber;

use anyhow::Result;
use std::fmt;

use crate::catalog::{Campaign, Game};

pub use dispatch::{BufferedNotifier, ImmediateNotifier};
pub use mux::NotifierMux;
pub use subscriber::{GameFilter, Interests, Subscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    NewDropCampaign,
    NewGame,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::NewDropCampaign, EventKind::NewGame];

    /// Key used in subscriber configuration.
    pub fn key(self) -> &'static str {
        match self {
            EventKind::NewDropCampaign => "new_drop_campaign",
            EventKind::NewGame => "new_game",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A change raised by the watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NewDropCampaign(Campaign),
    NewGame(Game),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::NewDropCampaign(_) => EventKind::NewDropCampaign,
            Event::NewGame(_) => EventKind::NewGame,
        }
    }
}

/// Routing surface the mux drives. Delivery failures stay inside the
/// notifier; nothing here returns an error.
#[async_trait::async_trait]
pub trait Notifier: Send {
    fn name(&self) -> &'static str;

    fn subscribe(&mut self, subscriber: Subscriber);

    fn subscribers(&self) -> &[Subscriber];

    /// Returns how many subscribers matched.
    async fn route_campaign(&mut self, campaign: &Campaign) -> usize;

    /// Returns how many subscribers matched.
    async fn route_game(&mut self, game: &Game) -> usize;

    /// Sends whatever is pending. Returns the number of batches attempted.
    async fn flush(&mut self) -> usize;

    async fn route(&mut self, event: &Event) -> usize {
        match event {
            Event::NewDropCampaign(c) => self.route_campaign(c).await,
            Event::NewGame(g) => self.route_game(g).await,
        }
    }
}

/// Transport that sends one notification per event.
#[async_trait::async_trait]
pub trait Deliver: Send {
    fn kind(&self) -> &'static str;

    async fn deliver_campaign(&mut self, subscriber: &Subscriber, campaign: &Campaign) -> Result<()>;

    async fn deliver_game(&mut self, subscriber: &Subscriber, game: &Game) -> Result<()>;
}

/// Transport that sends one notification per subscriber per cycle.
#[async_trait::async_trait]
pub trait DeliverBatch: Send {
    fn kind(&self) -> &'static str;

    async fn deliver_campaigns(&mut self, subscriber: &Subscriber, campaigns: &[Campaign]) -> Result<()>;

    async fn deliver_games(&mut self, subscriber: &Subscriber, games: &[Game]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_keys_round_trip() {
        for k in EventKind::ALL {
            assert_eq!(EventKind::from_key(k.key()), Some(k));
        }
        assert_eq!(EventKind::from_key("new_stream"), None);
        assert_eq!(EventKind::NewGame.to_string(), "new_game");
    }
}
