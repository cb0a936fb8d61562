// src/notify/subscriber.rs
use anyhow::{bail, Result};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::BTreeMap;

use super::EventKind;
use crate::catalog::{Campaign, Game};

/// Restricts `new_drop_campaign` to some games. Entries are game ids or
/// display names; an empty filter lets every campaign through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    entries: Vec<String>,
}

impl GameFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Exact id match, or case-insensitive display-name match.
    pub fn matches(&self, game: &Game) -> bool {
        if self.entries.is_empty() {
            return true;
        }
        let name = game.display_name.to_lowercase();
        self.entries
            .iter()
            .any(|e| *e == game.id || e.to_lowercase() == name)
    }
}

/// Which events a subscriber wants. Absent = not interested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interests {
    pub new_drop_campaign: Option<GameFilter>,
    pub new_game: bool,
}

impl Interests {
    /// Every campaign and every game.
    pub fn all() -> Self {
        Self {
            new_drop_campaign: Some(GameFilter::any()),
            new_game: true,
        }
    }

    pub fn campaigns(filter: GameFilter) -> Self {
        Self {
            new_drop_campaign: Some(filter),
            new_game: false,
        }
    }

    pub fn games() -> Self {
        Self {
            new_drop_campaign: None,
            new_game: true,
        }
    }

    pub fn wants(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::NewDropCampaign => self.new_drop_campaign.is_some(),
            EventKind::NewGame => self.new_game,
        }
    }

    /// Builds interests from a configured `events` map.
    ///
    /// A `null` value means not interested. Unknown keys are logged and
    /// ignored. Malformed options for a known key are an error.
    pub fn from_event_map(events: &BTreeMap<String, Value>, subscriber: &str) -> Result<Self> {
        let mut out = Interests::default();
        for (key, options) in events {
            if options.is_null() {
                tracing::debug!(subscriber, event = %key, "event switched off");
                continue;
            }
            match EventKind::from_key(key) {
                Some(EventKind::NewDropCampaign) => {
                    out.new_drop_campaign = Some(parse_game_filter(options, subscriber)?);
                }
                Some(EventKind::NewGame) => out.new_game = true,
                None => {
                    tracing::error!(subscriber, event = %key, "unrecognized event key, ignoring");
                }
            }
        }
        Ok(out)
    }
}

fn parse_game_filter(options: &Value, subscriber: &str) -> Result<GameFilter> {
    let games = match options {
        Value::Object(map) => match map.get("games") {
            None | Some(Value::Null) => return Ok(GameFilter::any()),
            Some(g) => g,
        },
        other => bail!("subscriber {subscriber}: new_drop_campaign options must be a table, got {other}"),
    };
    let Value::Array(items) = games else {
        bail!("subscriber {subscriber}: new_drop_campaign.games must be a list");
    };
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) if !s.trim().is_empty() => entries.push(s.trim().to_string()),
            Value::Number(n) => entries.push(n.to_string()),
            other => bail!("subscriber {subscriber}: invalid game filter entry {other}"),
        }
    }
    Ok(GameFilter { entries })
}

/// A delivery identity plus its interests. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    identity: String,
    timezone: Tz,
    interests: Interests,
}

impl Subscriber {
    pub fn new(identity: impl Into<String>, interests: Interests) -> Self {
        Self {
            identity: identity.into(),
            timezone: Tz::UTC,
            interests,
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Email address, webhook URL, ... depending on the transport.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn interests(&self) -> &Interests {
        &self.interests
    }

    pub fn wants_campaign(&self, campaign: &Campaign) -> bool {
        self.interests
            .new_drop_campaign
            .as_ref()
            .is_some_and(|f| f.matches(&campaign.game))
    }

    pub fn wants_game(&self, _game: &Game) -> bool {
        self.interests.wants(EventKind::NewGame)
    }
}

/// Parses an IANA zone name, falling back to UTC with a warning.
pub fn parse_timezone(name: Option<&str>, subscriber: &str) -> Tz {
    match name.map(str::trim).filter(|s| !s.is_empty()) {
        None => Tz::UTC,
        Some(n) => n.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!(subscriber, timezone = n, "unknown timezone, using UTC");
            Tz::UTC
        }),
    }
}
