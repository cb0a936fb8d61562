//! Notification bodies shared by the transports.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use html_escape::encode_text;

use crate::catalog::{Campaign, Game};

/// e.g. `05 May 2024 19:00 CEST`
pub fn format_time(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%d %B %Y %H:%M %Z").to_string()
}

pub fn campaigns_html(campaigns: &[Campaign], tz: Tz) -> String {
    let mut out = String::from("<h2>New Twitch Drop Campaigns</h2>\n<table>\n");
    for c in campaigns {
        let img = c
            .thumbnail_url()
            .map(|u| format!("<img src=\"{}\" width=\"120\">", encode_text(u)))
            .unwrap_or_default();
        out.push_str(&format!(
            "<tr><td>{img}</td><td><b>{}</b><br>{}<br>Starts: {}<br>Ends: {}</td></tr>\n",
            encode_text(&c.game.display_name),
            encode_text(&c.name),
            format_time(c.start_at, tz),
            format_time(c.end_at, tz),
        ));
    }
    out.push_str("</table>\n");
    out
}

pub fn games_html(games: &[Game]) -> String {
    let mut out = String::from("<h2>New Games</h2>\n<ul>\n");
    for g in games {
        out.push_str(&format!("<li>{}</li>\n", encode_text(&g.display_name)));
    }
    out.push_str("</ul>\n");
    out
}

/// One line per campaign, for chat webhooks.
pub fn campaign_line(c: &Campaign, tz: Tz) -> String {
    format!(
        "{} · {} (until {})",
        c.game.display_name,
        c.name,
        format_time(c.end_at, tz)
    )
}
