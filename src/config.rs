// src/config.rs
//! Watchdog configuration: a TOML or JSON file with env-resolved secrets.
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_PATH: &str = "WATCHDOG_CONFIG_PATH";
const ENV_OAUTH_TOKEN: &str = "TWITCH_OAUTH_TOKEN";
const ENV_SMTP_PASSWORD: &str = "SMTP_PASSWORD";

/// Public client id of the Twitch web player.
pub const DEFAULT_CLIENT_ID: &str = "kimne78kx3ncx6brgo4mv6wki5h1ko";

fn default_polling_interval() -> u64 {
    15
}
fn default_database_path() -> PathBuf {
    PathBuf::from("database.json")
}
fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}
fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_email_interval_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_polling_interval")]
    pub polling_interval_minutes: u64,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Replace new campaigns with their detail records before notifying.
    #[serde(default)]
    pub fetch_details: bool,
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub notifiers: NotifiersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// "ENV" means: read from TWITCH_OAUTH_TOKEN
    pub oauth_token: String,
    #[serde(default)]
    pub channel_login: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifiersConfig {
    pub email: Option<EmailConfig>,
    pub discord: Option<WebhookNotifierConfig>,
    pub slack: Option<WebhookNotifierConfig>,
}

impl NotifiersConfig {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.discord.is_none() && self.slack.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub credentials: Option<EmailCredentials>,
    #[serde(default = "default_email_interval_ms")]
    pub send_interval_ms: u64,
    #[serde(default)]
    pub subscribers: Vec<EmailSubscriberConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailCredentials {
    pub user: String,
    /// "ENV" means: read from SMTP_PASSWORD
    pub password: String,
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSubscriberConfig {
    pub email: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub events: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookNotifierConfig {
    /// Minimum gap between posts; transport default when absent.
    #[serde(default)]
    pub send_interval_ms: Option<u64>,
    #[serde(default)]
    pub subscribers: Vec<WebhookSubscriberConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSubscriberConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub events: BTreeMap<String, serde_json::Value>,
}

impl EmailConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }
}

impl AppConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_minutes.saturating_mul(60))
    }

    /// Sets the poll interval; zero or a value that overflows in seconds is rejected.
    pub fn set_polling_interval(&mut self, minutes: u64) -> Result<()> {
        check_polling_interval(minutes)?;
        self.polling_interval_minutes = minutes;
        Ok(())
    }

    /// Resolve "ENV" secrets and check invariants.
    fn finalize(mut self) -> Result<Self> {
        check_polling_interval(self.polling_interval_minutes)?;

        self.twitch.oauth_token = resolve_secret(&self.twitch.oauth_token, ENV_OAUTH_TOKEN)?;

        if let Some(creds) = self
            .notifiers
            .email
            .as_mut()
            .and_then(|e| e.credentials.as_mut())
        {
            creds.password = resolve_secret(&creds.password, ENV_SMTP_PASSWORD)?;
        }

        Ok(self)
    }
}

fn check_polling_interval(minutes: u64) -> Result<()> {
    if minutes == 0 {
        bail!("polling_interval_minutes must be greater than zero");
    }
    if minutes.checked_mul(60).is_none() {
        bail!("polling_interval_minutes {minutes} is too large");
    }
    Ok(())
}

fn resolve_secret(value: &str, var: &str) -> Result<String> {
    if value.trim().eq_ignore_ascii_case("env") {
        return env::var(var).map_err(|_| anyhow!("Missing {var} env var"));
    }
    Ok(value.to_string())
}

/// Load configuration from an explicit path. Supports TOML or JSON formats.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))?
        .finalize()
}

/// Pick the config file:
/// 1) explicit path (CLI)
/// 2) $WATCHDOG_CONFIG_PATH
/// 3) config/watchdog.toml
/// 4) config/watchdog.json
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() {
            return Ok(p.to_path_buf());
        }
        bail!("config file {} does not exist", p.display());
    }
    if let Ok(p) = env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(pb);
        }
        bail!("{ENV_PATH} points to non-existent path");
    }
    let toml_p = PathBuf::from("config/watchdog.toml");
    if toml_p.exists() {
        return Ok(toml_p);
    }
    let json_p = PathBuf::from("config/watchdog.json");
    if json_p.exists() {
        return Ok(json_p);
    }
    Err(anyhow!(
        "no config file found (use --config, {ENV_PATH}, config/watchdog.toml or config/watchdog.json)"
    ))
}

pub fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = resolve_path(explicit)?;
    tracing::info!(path = %path.display(), "loading config");
    load_from(&path)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("invalid JSON config");
    }
    if hint_ext == "toml" {
        return toml::from_str(s).context("invalid TOML config");
    }
    // Unknown extension: sniff JSON first, then TOML
    if s.trim_start().starts_with('{') {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
    }
    toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
polling_interval_minutes = 5

[twitch]
oauth_token = "abc"

[notifiers.email]
send_interval_ms = 10

[notifiers.email.credentials]
user = "bot@example.com"
password = "pw"

[[notifiers.email.subscribers]]
email = "a@example.com"
timezone = "Europe/Prague"
events = { new_drop_campaign = { games = ["Rust"] }, new_game = {} }

[[notifiers.discord.subscribers]]
webhook_url = "https://discord/hook"
events = { new_game = {} }
"#;

    #[test]
    fn toml_config_parses_with_defaults() {
        let cfg = parse_config(TOML, "toml").unwrap().finalize().unwrap();
        assert_eq!(cfg.polling_interval(), Duration::from_secs(300));
        assert_eq!(cfg.database_path, PathBuf::from("database.json"));
        assert!(!cfg.fetch_details);
        assert_eq!(cfg.twitch.client_id, DEFAULT_CLIENT_ID);

        let email = cfg.notifiers.email.unwrap();
        let creds = email.credentials.as_ref().unwrap();
        assert_eq!(creds.host, "smtp.gmail.com");
        assert_eq!(creds.port, 587);
        assert_eq!(email.send_interval(), Duration::from_millis(10));
        assert_eq!(email.subscribers[0].timezone.as_deref(), Some("Europe/Prague"));
        assert!(email.subscribers[0].events.contains_key("new_drop_campaign"));

        let discord = cfg.notifiers.discord.unwrap();
        assert_eq!(discord.send_interval_ms, None);
        assert_eq!(discord.subscribers.len(), 1);
        assert!(cfg.notifiers.slack.is_none());
    }

    #[test]
    fn json_is_sniffed_without_extension() {
        let json = r#"{"twitch": {"oauth_token": "t"}, "database_path": "state/db.json"}"#;
        let cfg = parse_config(json, "").unwrap();
        assert_eq!(cfg.database_path, PathBuf::from("state/db.json"));
        assert!(cfg.notifiers.is_empty());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let json = r#"{"polling_interval_minutes": 0, "twitch": {"oauth_token": "t"}}"#;
        let err = parse_config(json, "json").unwrap().finalize().unwrap_err();
        assert!(err.to_string().contains("polling_interval_minutes"));
    }

    #[test]
    fn oversized_interval_is_rejected() {
        let json = format!(
            r#"{{"polling_interval_minutes": {}, "twitch": {{"oauth_token": "t"}}}}"#,
            u64::MAX / 10
        );
        let err = parse_config(&json, "json").unwrap().finalize().unwrap_err();
        assert!(err.to_string().contains("too large"));

        let mut cfg = parse_config(r#"{"twitch": {"oauth_token": "t"}}"#, "json").unwrap();
        assert!(cfg.set_polling_interval(u64::MAX / 10).is_err());
        assert!(cfg.set_polling_interval(0).is_err());
        assert_eq!(cfg.polling_interval_minutes, 15);
        cfg.set_polling_interval(2).unwrap();
        assert_eq!(cfg.polling_interval(), Duration::from_secs(120));
    }

    #[test]
    fn missing_twitch_section_is_an_error() {
        assert!(parse_config("polling_interval_minutes = 3", "toml").is_err());
    }
}
