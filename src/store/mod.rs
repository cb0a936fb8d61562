//! State store: which campaigns and games the watchdog has already seen.
//!
//! The watchdog only talks to [`StateStore`]; whether the records live in a
//! JSON file or in memory must not change its behavior.

pub mod json_file;
pub mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Campaign, Game};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// What is remembered about a known campaign: only when it stops being relevant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnownCampaign {
    #[serde(rename = "endAt")]
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnownGame {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Read persisted state. No-op for stores without a backing file.
    async fn load(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write state back. No-op for stores without a backing file.
    async fn save(&mut self) -> Result<()> {
        Ok(())
    }

    /// Returns `true` iff the campaign id was not known before.
    async fn add_campaign(&mut self, campaign: &Campaign) -> Result<bool>;

    /// Removing an unknown id is not an error.
    async fn remove_campaign(&mut self, id: &str) -> Result<()>;

    /// Returns `true` iff the game id was not known before.
    async fn add_game(&mut self, game: &Game) -> Result<bool>;

    async fn list_campaigns(&self) -> Result<Vec<(String, KnownCampaign)>>;

    async fn list_games(&self) -> Result<Vec<(String, KnownGame)>>;
}

/// On-disk document shared by the concrete stores.
///
/// ```json
/// {"campaigns": {"<id>": {"endAt": "..."}}, "games": {"<id>": {"displayName": "..."}}}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreDocument {
    #[serde(default)]
    pub campaigns: BTreeMap<String, KnownCampaign>,
    #[serde(default)]
    pub games: BTreeMap<String, KnownGame>,
}

impl StoreDocument {
    pub fn add_campaign(&mut self, campaign: &Campaign) -> bool {
        if self.campaigns.contains_key(&campaign.id) {
            return false;
        }
        self.campaigns.insert(
            campaign.id.clone(),
            KnownCampaign {
                end_at: campaign.end_at,
            },
        );
        true
    }

    pub fn remove_campaign(&mut self, id: &str) {
        self.campaigns.remove(id);
    }

    pub fn add_game(&mut self, game: &Game) -> bool {
        if self.games.contains_key(&game.id) {
            return false;
        }
        self.games.insert(
            game.id.clone(),
            KnownGame {
                display_name: game.display_name.clone(),
            },
        );
        true
    }

    pub fn campaigns(&self) -> Vec<(String, KnownCampaign)> {
        self.campaigns
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn games(&self) -> Vec<(String, KnownGame)> {
        self.games
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
