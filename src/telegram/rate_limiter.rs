//! Pacing for outgoing Telegram messages.
//!
//! Bots may send roughly thirty messages per second overall. Every send
//! goes through one limiter that keeps a minimum gap between messages and
//! pauses all sending while a flood wait is in effect.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct LimiterState {
    last_send: Option<Instant>,
    blocked_until: Option<Instant>,
}

impl LimiterState {
    fn next_allowed(&self, min_interval: Duration) -> Option<Instant> {
        let after_last = self.last_send.map(|t| t + min_interval);
        match (after_last, self.blocked_until) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Shared send limiter.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(LimiterState::default()),
        }
    }

    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Waits for the next send slot and claims it.
    ///
    /// Returns how long the caller waited. Senders queue on the internal
    /// lock so slots are handed out in order.
    pub async fn acquire(&self) -> Duration {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let wait = state
            .next_allowed(self.min_interval)
            .map_or(Duration::ZERO, |at| at.saturating_duration_since(now));

        if !wait.is_zero() {
            debug!("Rate limiter: waiting {:?} before next send", wait);
            tokio::time::sleep(wait).await;
        }

        state.last_send = Some(Instant::now());
        state.blocked_until = None;
        wait
    }

    /// Blocks all sends for the flood wait Telegram asked for.
    pub async fn block_for(&self, wait_seconds: u32) {
        warn!(
            "Received flood wait from Telegram: {} seconds",
            wait_seconds
        );
        let until = Instant::now() + Duration::from_secs(u64::from(wait_seconds));
        let mut state = self.state.lock().await;
        state.blocked_until = Some(state.blocked_until.map_or(until, |b| b.max(until)));
    }

    /// Time remaining until the next send is allowed.
    pub async fn time_until_allowed(&self) -> Duration {
        let state = self.state.lock().await;
        state
            .next_allowed(self.min_interval)
            .map_or(Duration::ZERO, |at| {
                at.saturating_duration_since(Instant::now())
            })
    }
}
