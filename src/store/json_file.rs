// src/store/json_file.rs
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{KnownCampaign, KnownGame, StateStore, StoreDocument};
use crate::catalog::{Campaign, Game};

/// Store backed by a single pretty-printed JSON document.
///
/// Mutations only touch memory; nothing reaches disk until `save`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    doc: StoreDocument,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: StoreDocument::default(),
        }
    }

    /// Construct and `load` in one step.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path);
        store.load().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl StateStore for JsonFileStore {
    /// A missing file means an empty store; an unreadable one is an error.
    async fn load(&mut self) -> Result<()> {
        self.doc = match fs::read_to_string(&self.path).await {
            Ok(s) if s.trim().is_empty() => StoreDocument::default(),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parse state store {}", self.path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no state store yet, starting empty");
                StoreDocument::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read state store {}", self.path.display()))
            }
        };
        tracing::debug!(
            campaigns = self.doc.campaigns.len(),
            games = self.doc.games.len(),
            "state store loaded"
        );
        Ok(())
    }

    /// Writes to a sibling temp file and renames it over the target.
    async fn save(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create state dir {}", dir.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(&self.doc).context("encode state store")?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

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
