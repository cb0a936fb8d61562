// src/notify/pacing.rs
use std::time::Duration;
use tokio::time::Instant;

/// Keeps a minimum gap between consecutive sends on one transport.
/// - First send never waits.
/// - Inside the gap, the caller waits out the remainder.
/// - State is updated explicitly via `record_send` after an attempt.
#[derive(Debug, Clone, Default)]
pub struct SendPacer {
    interval: Duration,
    last_send: Option<Instant>,
}

impl SendPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: None,
        }
    }

    /// How long a send at `now` still has to wait. Does NOT mutate state.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_send {
            None => Duration::ZERO,
            Some(ts) => self
                .interval
                .saturating_sub(now.saturating_duration_since(ts)),
        }
    }

    pub fn record_send(&mut self, now: Instant) {
        self.last_send = Some(now);
    }

    pub async fn wait_turn(&self) {
        let wait = self.remaining(Instant::now());
        if !wait.is_zero() {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "pacing send");
            tokio::time::sleep(wait).await;
        }
    }
}
