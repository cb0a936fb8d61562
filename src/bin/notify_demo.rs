//! Pushes a sample campaign and game through the configured notifiers
//! (one routed cycle plus flush) to check transports end to end.

use anyhow::Result;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use twitch_drops_watchdog::{config, Campaign, ChangeListener, Game, NotifierMux};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = config::load(path.as_deref())?;
    let mut mux = NotifierMux::from_config(&cfg.notifiers)?;

    let now = Utc::now();
    let game = Game {
        id: "0".into(),
        display_name: "Demo Game".into(),
        box_art_url: None,
    };
    let campaign = Campaign {
        id: "demo-campaign".into(),
        name: "Demo Drops".into(),
        game: game.clone(),
        start_at: now,
        end_at: now + Duration::days(7),
        image_url: None,
        status: Some("ACTIVE".into()),
        details_url: None,
    };

    mux.on_new_campaigns(&[campaign]).await?;
    mux.on_new_games(&[game]).await?;
    mux.on_cycle_complete().await?;

    println!("notify-demo done ({} notifiers)", mux.len());
    Ok(())
}
