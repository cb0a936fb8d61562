// src/catalog/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A game as it appears inside a campaign payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub display_name: String,
    #[serde(default, rename = "boxArtURL", skip_serializing_if = "Option::is_none")]
    pub box_art_url: Option<String>,
}

/// A Drop Campaign. Field names follow the Twitch GraphQL payload so the
/// same struct deserializes both the dashboard list and the detail query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub game: Game,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default, rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, rename = "detailsURL", skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
}

impl Campaign {
    /// True once `now` has reached the end timestamp.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_at <= now
    }

    /// Campaign artwork, falling back to the game's box art.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or(self.game.box_art_url.as_deref())
    }
}

#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Every campaign currently listed, in upstream order.
    async fn list_campaigns(&self) -> Result<Vec<Campaign>>;
    /// Detailed records for the given campaign ids.
    async fn get_campaign_details(&self, ids: &[String]) -> Result<Vec<Campaign>>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn campaign(image: Option<&str>, box_art: Option<&str>) -> Campaign {
        Campaign {
            id: "c1".into(),
            name: "Launch Week".into(),
            game: Game {
                id: "g1".into(),
                display_name: "Foo".into(),
                box_art_url: box_art.map(str::to_string),
            },
            start_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2024, 5, 8, 0, 0, 0).unwrap(),
            image_url: image.map(str::to_string),
            status: None,
            details_url: None,
        }
    }

    #[test]
    fn ended_at_exact_end_timestamp() {
        let c = campaign(None, None);
        assert!(!c.has_ended(c.end_at - chrono::Duration::seconds(1)));
        assert!(c.has_ended(c.end_at));
    }

    #[test]
    fn thumbnail_falls_back_to_box_art() {
        assert_eq!(
            campaign(Some("img"), Some("box")).thumbnail_url(),
            Some("img")
        );
        assert_eq!(campaign(Some(""), Some("box")).thumbnail_url(), Some("box"));
        assert_eq!(campaign(None, None).thumbnail_url(), None);
    }

    #[test]
    fn deserializes_twitch_field_names() {
        let json = r#"{
            "id": "c9",
            "name": "Season 3",
            "status": "ACTIVE",
            "startAt": "2024-05-01T17:00:00Z",
            "endAt": "2024-05-15T17:00:00Z",
            "imageURL": null,
            "game": {"id": "123", "displayName": "Halo", "boxArtURL": "https://x/box.jpg"},
            "self": {"isAccountConnected": false}
        }"#;
        let c: Campaign = serde_json::from_str(json).unwrap();
        assert_eq!(c.game.display_name, "Halo");
        assert_eq!(c.image_url, None);
        assert_eq!(c.thumbnail_url(), Some("https://x/box.jpg"));
        assert_eq!(c.status.as_deref(), Some("ACTIVE"));
    }
}
