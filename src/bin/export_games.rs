//! Prints the games known to a JSON state store, sorted by display name.
//! Usage: export_games [database.json]

use anyhow::Result;
use serde::Serialize;
use twitch_drops_watchdog::{JsonFileStore, StateStore};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedGame {
    id: String,
    display_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "database.json".to_string());
    let store = JsonFileStore::open(path).await?;

    let mut games: Vec<ExportedGame> = store
        .list_games()
        .await?
        .into_iter()
        .map(|(id, g)| ExportedGame {
            id,
            display_name: g.display_name,
        })
        .collect();
    games.sort_by(|a, b| a.display_name.cmp(&b.display_name));

    println!("{}", serde_json::to_string_pretty(&games)?);
    Ok(())
}
