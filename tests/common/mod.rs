// tests/common/mod.rs
// Shared fakes and fixture builders for the integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use twitch_drops_watchdog::notify::{Deliver, DeliverBatch};
use twitch_drops_watchdog::{Campaign, CatalogClient, ChangeListener, Game, Subscriber};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn game(id: &str, name: &str) -> Game {
    Game {
        id: id.into(),
        display_name: name.into(),
        box_art_url: None,
    }
}

/// Campaign running from a week before `end` until `end`.
pub fn campaign(id: &str, game: &Game, end: DateTime<Utc>) -> Campaign {
    Campaign {
        id: id.into(),
        name: format!("{id} drops"),
        game: game.clone(),
        start_at: end - Duration::days(7),
        end_at: end,
        image_url: None,
        status: Some("ACTIVE".into()),
        details_url: None,
    }
}

/// Catalog that replays one scripted response per call; `None` is a fetch error.
/// Once the script runs out the last response is repeated.
#[derive(Clone, Default)]
pub struct ScriptedCatalog {
    script: Arc<Mutex<VecDeque<Option<Vec<Campaign>>>>>,
    details: Arc<Mutex<Option<Vec<Campaign>>>>,
    pub detail_calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedCatalog {
    pub fn new(script: Vec<Option<Vec<Campaign>>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Default::default()
        }
    }

    /// Detail records to answer with; `None` makes the details call fail.
    pub fn with_details(self, details: Option<Vec<Campaign>>) -> Self {
        *self.details.lock() = details;
        self
    }
}

#[async_trait::async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let mut script = self.script.lock();
        let next = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().cloned().flatten()
        };
        next.ok_or_else(|| anyhow!("scripted fetch failure"))
    }

    async fn get_campaign_details(&self, ids: &[String]) -> Result<Vec<Campaign>> {
        self.detail_calls.lock().push(ids.to_vec());
        self.details
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("scripted details failure"))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Campaigns(Vec<String>),
    Games(Vec<String>),
    Complete,
}

/// Listener that records every hook; optionally fails every hook.
#[derive(Clone, Default)]
pub struct RecordingListener {
    pub seen: Arc<Mutex<Vec<Seen>>>,
    pub fail: bool,
}

impl RecordingListener {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn take(&self) -> Vec<Seen> {
        std::mem::take(&mut *self.seen.lock())
    }

    fn result(&self) -> Result<()> {
        if self.fail {
            Err(anyhow!("listener refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ChangeListener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    async fn on_new_campaigns(&mut self, campaigns: &[Campaign]) -> Result<()> {
        self.seen
            .lock()
            .push(Seen::Campaigns(campaigns.iter().map(|c| c.id.clone()).collect()));
        self.result()
    }

    async fn on_new_games(&mut self, games: &[Game]) -> Result<()> {
        self.seen
            .lock()
            .push(Seen::Games(games.iter().map(|g| g.id.clone()).collect()));
        self.result()
    }

    async fn on_cycle_complete(&mut self) -> Result<()> {
        self.seen.lock().push(Seen::Complete);
        self.result()
    }
}

/// One recorded transport call: (subscriber identity, ids delivered).
pub type Sent = (String, Vec<String>);

/// Transport that records calls and fails for identities listed in `fail_for`.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub campaigns: Arc<Mutex<Vec<Sent>>>,
    pub games: Arc<Mutex<Vec<Sent>>>,
    pub fail_for: Vec<String>,
}

impl RecordingTransport {
    pub fn failing_for(identity: &str) -> Self {
        Self {
            fail_for: vec![identity.to_string()],
            ..Default::default()
        }
    }

    fn outcome(&self, sub: &Subscriber) -> Result<()> {
        if self.fail_for.iter().any(|f| f == sub.identity()) {
            Err(anyhow!("transport down for {}", sub.identity()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Deliver for RecordingTransport {
    fn kind(&self) -> &'static str {
        "recording"
    }

    async fn deliver_campaign(&mut self, sub: &Subscriber, campaign: &Campaign) -> Result<()> {
        self.campaigns
            .lock()
            .push((sub.identity().to_string(), vec![campaign.id.clone()]));
        self.outcome(sub)
    }

    async fn deliver_game(&mut self, sub: &Subscriber, game: &Game) -> Result<()> {
        self.games
            .lock()
            .push((sub.identity().to_string(), vec![game.id.clone()]));
        self.outcome(sub)
    }
}

#[async_trait::async_trait]
impl DeliverBatch for RecordingTransport {
    fn kind(&self) -> &'static str {
        "recording-batch"
    }

    async fn deliver_campaigns(&mut self, sub: &Subscriber, campaigns: &[Campaign]) -> Result<()> {
        self.campaigns.lock().push((
            sub.identity().to_string(),
            campaigns.iter().map(|c| c.id.clone()).collect(),
        ));
        self.outcome(sub)
    }

    async fn deliver_games(&mut self, sub: &Subscriber, games: &[Game]) -> Result<()> {
        self.games.lock().push((
            sub.identity().to_string(),
            games.iter().map(|g| g.id.clone()).collect(),
        ));
        self.outcome(sub)
    }
}
