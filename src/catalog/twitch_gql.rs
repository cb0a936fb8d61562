use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::catalog::types::{Campaign, CatalogClient};
use crate::config::TwitchConfig;

const GQL_URL: &str = "https://gql.twitch.tv/gql";
const DASHBOARD_OPERATION: &str = "ViewerDropsDashboard";
const DASHBOARD_HASH: &str = "e8b98b52bbd7ccd37d0b671ad0d47be5238caa5bea637d2a65776175b4a23a64";
const DETAILS_OPERATION: &str = "DropCampaignDetails";
const DETAILS_HASH: &str = "14b5e8a50777165cfc3971e1d93b4758613fe1c817d5542c398dce70b7a45c05";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GqlOperation<'a> {
    operation_name: &'a str,
    extensions: Extensions<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<DetailsVariables<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Extensions<'a> {
    persisted_query: PersistedQuery<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedQuery<'a> {
    version: u8,
    sha256_hash: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailsVariables<'a> {
    #[serde(rename = "dropID")]
    drop_id: &'a str,
    channel_login: &'a str,
}

impl<'a> GqlOperation<'a> {
    fn persisted(operation_name: &'a str, sha256_hash: &'a str) -> Self {
        Self {
            operation_name,
            extensions: Extensions {
                persisted_query: PersistedQuery {
                    version: 1,
                    sha256_hash,
                },
            },
            variables: None,
        }
    }
}

/// Thin client for the persisted GraphQL queries behind the Drops dashboard.
pub struct TwitchGqlClient {
    http: Client,
    endpoint: String,
    client_id: String,
    oauth_token: String,
    channel_login: String,
}

impl TwitchGqlClient {
    pub fn new(client_id: &str, oauth_token: &str, channel_login: &str) -> Result<Self> {
        if oauth_token.trim().is_empty() {
            bail!("missing Twitch OAuth token");
        }
        let http = Client::builder()
            .user_agent(concat!("twitch-drops-watchdog/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("build twitch http client")?;
        Ok(Self {
            http,
            endpoint: GQL_URL.to_string(),
            client_id: client_id.to_string(),
            oauth_token: oauth_token.to_string(),
            channel_login: channel_login.to_string(),
        })
    }

    pub fn from_config(cfg: &TwitchConfig) -> Result<Self> {
        Self::new(&cfg.client_id, &cfg.oauth_token, &cfg.channel_login)
    }

    /// Point the client at another GraphQL endpoint (proxies, local fakes).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn post(&self, operations: &[GqlOperation<'_>]) -> Result<Vec<Value>> {
        let request_body = serde_json::to_string(operations).context("encode gql request")?;

        let resp = self
            .http
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("OAuth {}", self.oauth_token))
            .header("Client-Id", &self.client_id)
            .header(header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(request_body.clone())
            .send()
            .await
            .context("twitch gql post")?;

        let status = resp.status();
        let text = resp.text().await.context("read twitch gql body")?;

        if !status.is_success() {
            tracing::debug!(request = %request_body, response = %text, "twitch gql bad status");
            bail!("twitch gql returned status {status}");
        }

        let responses: Vec<Value> = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(request = %request_body, response = %text, "twitch gql body is not a JSON array");
                return Err(e).context("parse twitch gql response");
            }
        };

        for r in &responses {
            if let Some(errors) = r.get("errors").filter(|e| !e.is_null()) {
                tracing::debug!(request = %request_body, errors = %errors, "twitch gql errors");
                bail!("twitch gql response contains errors: {errors}");
            }
        }

        Ok(responses)
    }
}

#[async_trait]
impl CatalogClient for TwitchGqlClient {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let ops = [GqlOperation::persisted(DASHBOARD_OPERATION, DASHBOARD_HASH)];
        let responses = self.post(&ops).await?;
        parse_dashboard(&responses)
    }

    async fn get_campaign_details(&self, ids: &[String]) -> Result<Vec<Campaign>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ops: Vec<GqlOperation<'_>> = ids
            .iter()
            .map(|id| GqlOperation {
                variables: Some(DetailsVariables {
                    drop_id: id,
                    channel_login: &self.channel_login,
                }),
                ..GqlOperation::persisted(DETAILS_OPERATION, DETAILS_HASH)
            })
            .collect();
        let responses = self.post(&ops).await?;
        parse_details(&responses)
    }

    fn name(&self) -> &'static str {
        "twitch-gql"
    }
}

/// Extracts `[0].data.currentUser.dropCampaigns`. Entries that do not
/// deserialize are skipped with a warning; a missing list is an error.
pub fn parse_dashboard(responses: &[Value]) -> Result<Vec<Campaign>> {
    let list = responses
        .first()
        .and_then(|r| r.pointer("/data/currentUser/dropCampaigns"))
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("missing data.currentUser.dropCampaigns in dashboard response"))?;

    let mut out = Vec::with_capacity(list.len());
    for raw in list {
        match serde_json::from_value::<Campaign>(raw.clone()) {
            Ok(c) => out.push(c),
            Err(e) => {
                tracing::warn!(error = %e, raw = %raw, "skipping malformed campaign");
                counter!("catalog_malformed_campaigns_total").increment(1);
            }
        }
    }
    Ok(out)
}

/// Extracts `[i].data.user.dropCampaign` from a batched details response.
pub fn parse_details(responses: &[Value]) -> Result<Vec<Campaign>> {
    responses
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let raw = r
                .pointer("/data/user/dropCampaign")
                .filter(|v| !v.is_null())
                .ok_or_else(|| anyhow!("missing data.user.dropCampaign in details response #{i}"))?;
            serde_json::from_value::<Campaign>(raw.clone())
                .with_context(|| format!("parse campaign details #{i}"))
        })
        .collect()
}
