use anyhow::Result;

use super::{KnownCampaign, KnownGame, StateStore, StoreDocument};
use crate::catalog::{Campaign, Game};

/// Process-local store; state is lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    doc: StoreDocument,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: StoreDocument) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &StoreDocument {
        &self.doc
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStore {
    async fn add_campaign(&mut self, campaign: &Campaign) -> Result<bool> {
        Ok(self.doc.add_campaign(campaign))
    }

    async fn remove_campaign(&mut self, id: &str) -> Result<()> {
        self.doc.remove_campaign(id);
        Ok(())
    }

    async fn add_game(&mut self, game: &Game) -> Result<bool> {
        Ok(self.doc.add_game(game))
    }

    async fn list_campaigns(&self) -> Result<Vec<(String, KnownCampaign)>> {
        Ok(self.doc.campaigns())
    }

    async fn list_games(&self) -> Result<Vec<(String, KnownGame)>> {
        Ok(self.doc.games())
    }
}
