use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use std::time::Duration;
use tokio::time::Instant;

use super::pacing::SendPacer;
use super::{render, DeliverBatch, Subscriber};
use crate::catalog::{Campaign, Game};
use crate::config::EmailCredentials;

pub const CAMPAIGNS_SUBJECT: &str = "New Twitch Drop Campaigns!";
pub const GAMES_SUBJECT: &str = "New Games";

/// Batched SMTP transport: one email per subscriber per cycle.
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    pacer: SendPacer,
}

impl EmailSender {
    pub fn from_config(creds: &EmailCredentials, send_interval: Duration) -> Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&creds.host)
            .with_context(|| format!("invalid SMTP host {}", creds.host))?
            .port(creds.port)
            .credentials(Credentials::new(creds.user.clone(), creds.password.clone()))
            .build();

        Ok(Self {
            mailer,
            from: sender_mailbox(creds)?,
            pacer: SendPacer::new(send_interval),
        })
    }

    async fn send(&mut self, to: &str, subject: &str, html: String) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("invalid recipient address {to}"))?;
        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html)
            .context("build email")?;

        self.pacer.wait_turn().await;
        let res = self.mailer.send(msg).await.context("send email");
        self.pacer.record_send(Instant::now());
        res.map(|_| ())
    }
}

/// `from` when configured, otherwise the SMTP login.
pub fn sender_mailbox(creds: &EmailCredentials) -> Result<Mailbox> {
    let addr = creds.from.as_deref().unwrap_or(&creds.user);
    addr.parse::<Mailbox>()
        .with_context(|| format!("invalid sender address {addr}"))
}

#[async_trait::async_trait]
impl DeliverBatch for EmailSender {
    fn kind(&self) -> &'static str {
        "email"
    }

    async fn deliver_campaigns(&mut self, subscriber: &Subscriber, campaigns: &[Campaign]) -> Result<()> {
        tracing::info!(to = subscriber.identity(), count = campaigns.len(), "sending new campaigns email");
        let body = render::campaigns_html(campaigns, subscriber.timezone());
        self.send(subscriber.identity(), CAMPAIGNS_SUBJECT, body).await
    }

    async fn deliver_games(&mut self, subscriber: &Subscriber, games: &[Game]) -> Result<()> {
        tracing::info!(to = subscriber.identity(), count = games.len(), "sending new games email");
        let body = render::games_html(games);
        self.send(subscriber.identity(), GAMES_SUBJECT, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(from: Option<&str>) -> EmailCredentials {
        EmailCredentials {
            user: "bot@example.com".into(),
            password: "secret".into(),
            host: "smtp.example.com".into(),
            port: 587,
            from: from.map(str::to_string),
        }
    }

    #[test]
    fn sender_defaults_to_smtp_user() {
        let from = sender_mailbox(&creds(None)).unwrap();
        assert_eq!(from.email.to_string(), "bot@example.com");
        let custom = sender_mailbox(&creds(Some("Drops Bot <drops@example.com>"))).unwrap();
        assert_eq!(custom.email.to_string(), "drops@example.com");
    }

    #[test]
    fn invalid_sender_address_is_rejected() {
        assert!(sender_mailbox(&creds(Some("not an address"))).is_err());
    }
}
