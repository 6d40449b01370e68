//! Timeout scheduler runner.
//!
//! Each tick runs one sweep over the shared chat state:
//! 1. Collect warnings, timed out searches and expired reveals under the lock
//! 2. Release the lock
//! 3. Notify the affected users
//!
//! A failed send is logged and never retried; the state change stands.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::chat::{ChatState, SweepReport, TimedOut};
use crate::commands::{Keyboard, Reply};
use crate::telegram::Messenger;

/// Messages that can be sent to the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerMessage {
    /// Run a sweep now.
    TriggerSweep,
    /// Stop the scheduler.
    Shutdown,
}

/// Search timeout scheduler.
pub struct TimeoutScheduler<M> {
    messenger: Arc<M>,

    /// Shared chat state.
    state: Arc<RwLock<ChatState>>,

    /// Time between sweeps.
    check_interval: Duration,
}

impl<M: Messenger> TimeoutScheduler<M> {
    /// Creates a new timeout scheduler.
    #[must_use]
    pub fn new(messenger: Arc<M>, state: Arc<RwLock<ChatState>>) -> Self {
        Self {
            messenger,
            state,
            check_interval: Duration::from_secs(5),
        }
    }

    /// Sets the time between sweeps.
    #[must_use]
    pub const fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Runs the scheduler loop.
    pub async fn run(&self, mut rx: mpsc::Receiver<SchedulerMessage>) {
        info!(
            "Timeout scheduler started (every {}s)",
            self.check_interval.as_secs()
        );

        let mut check_timer = interval(self.check_interval);

        loop {
            tokio::select! {
                _ = check_timer.tick() => {
                    self.sweep_at(Instant::now()).await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(SchedulerMessage::TriggerSweep) => {
                            debug!("Received sweep trigger");
                            self.sweep_at(Instant::now()).await;
                        }
                        Some(SchedulerMessage::Shutdown) | None => {
                            info!("Scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// One sweep as of `now`.
    async fn sweep_at(&self, now: Instant) {
        let report = self.state.write().await.sweep_waiting(now);
        if report.is_empty() {
            return;
        }
        debug!(
            "Sweep: {} warned, {} timed out, {} reveals expired",
            report.warnings.len(),
            report.timed_out.len(),
            report.expired_reveals.len()
        );
        self.notify(report).await;
    }

    async fn notify(&self, report: SweepReport) {
        let warning = Reply::markdown(
            "⏳ *Still searching for your match*...\n\n\
             It's taking a bit longer than usual. We'll keep looking!",
        );
        for user in report.warnings {
            self.deliver(user, &warning).await;
        }

        for timed_out in report.timed_out {
            info!("Search timed out for user {}", timed_out.user_id);
            for reply in timeout_notice(timed_out) {
                self.deliver(timed_out.user_id, &reply).await;
            }
        }

        let expired = Reply::markdown(
            "⌛ *Reveal request expired*\n\n\
             Your partner didn't answer in time. You can use /reveal to ask again.",
        );
        for (requester, partner) in report.expired_reveals {
            debug!("Reveal request from {} to {} expired", requester, partner);
            self.deliver(requester, &expired).await;
        }
    }

    async fn deliver(&self, chat_id: i64, reply: &Reply) {
        if let Err(e) = self.messenger.send(chat_id, reply).await {
            warn!("Failed to notify {}: {}", chat_id, e);
        }
    }
}

/// Messages sent to a user whose search ran out of time.
fn timeout_notice(timed_out: TimedOut) -> Vec<Reply> {
    let reason = match timed_out.topic {
        Some(topic) => format!("No users available for '{topic}' topic chat at the moment."),
        None => "No users are available for one-on-one chat at the moment.".to_owned(),
    };
    vec![
        Reply::markdown(format!("⏱️ *Search timeout*\n\n{reason}")),
        Reply::markdown(
            "💡 **Suggestions:**\n\
             • Try at a different time when more users might be online\n\
             • Consider changing to a different chat mode\n\
             • If using topic-based chat, try a more popular topic",
        ),
        Reply::markdown("✨ *What would you like to do next?*").with_keyboard(
            Keyboard::new()
                .button("🔄 Try Again", "try_again")
                .button("🔀 Change Chat Mode", "change_mode"),
        ),
    ]
}

impl<M> std::fmt::Debug for TimeoutScheduler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutScheduler")
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Topic, UserProfile};
    use crate::telegram::RecordingMessenger;

    fn setup(users: &[i64]) -> (TimeoutScheduler<RecordingMessenger>, Arc<RecordingMessenger>) {
        let mut state = ChatState::default();
        for &id in users {
            state.register_user(UserProfile::new(id, format!("User{id}")));
        }
        let messenger = Arc::new(RecordingMessenger::new());
        let scheduler = TimeoutScheduler::new(Arc::clone(&messenger), Arc::new(RwLock::new(state)));
        (scheduler, messenger)
    }

    fn ago(secs: u64) -> Instant {
        Instant::now().checked_sub(Duration::from_secs(secs)).unwrap()
    }

    #[tokio::test]
    async fn test_warns_once_while_searching() {
        let (scheduler, messenger) = setup(&[1]);
        let start = ago(40);
        scheduler.state.write().await.request_connection_at(1, start);

        scheduler.sweep_at(start + Duration::from_secs(31)).await;
        scheduler.sweep_at(start + Duration::from_secs(33)).await;

        let texts = messenger.texts_to(1);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("⏳ *Still searching for your match*"));
        assert!(scheduler.state.read().await.is_waiting(1));
    }

    #[tokio::test]
    async fn test_times_out_one_on_one_search() {
        let (scheduler, messenger) = setup(&[1]);
        let start = ago(120);
        scheduler.state.write().await.request_connection_at(1, start);

        scheduler.sweep_at(start + Duration::from_secs(61)).await;

        let sent = messenger.sent_to(1);
        assert_eq!(sent.len(), 3);
        assert_eq!(
            sent[0].text,
            "⏱️ *Search timeout*\n\nNo users are available for one-on-one chat at the moment."
        );
        let keyboard = sent[2].keyboard.as_ref().unwrap();
        assert!(keyboard.has_data("try_again"));
        assert!(keyboard.has_data("change_mode"));
        assert!(!scheduler.state.read().await.is_waiting(1));
    }

    #[tokio::test]
    async fn test_topic_timeout_names_topic() {
        let notice = timeout_notice(TimedOut {
            user_id: 1,
            topic: Some(Topic::Music),
        });
        assert_eq!(
            notice[0].text,
            "⏱️ *Search timeout*\n\nNo users available for 'music' topic chat at the moment."
        );
    }

    #[tokio::test]
    async fn test_expired_reveal_notifies_requester() {
        let (scheduler, messenger) = setup(&[1, 2]);
        let start = ago(400);
        {
            let mut state = scheduler.state.write().await;
            state.request_connection_at(1, start);
            state.request_connection_at(2, start);
            state.request_reveal_at(1, start);
        }

        scheduler.sweep_at(start + Duration::from_secs(301)).await;

        assert!(messenger.texts_to(1)[0].starts_with("⌛ *Reveal request expired*"));
        assert!(messenger.texts_to(2).is_empty());
        assert!(!scheduler.state.read().await.has_pending_reveal(1));
    }

    #[tokio::test]
    async fn test_quiet_sweep_sends_nothing() {
        let (scheduler, messenger) = setup(&[1]);
        scheduler.sweep_at(Instant::now()).await;
        assert_eq!(messenger.total_sent(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (scheduler, _messenger) = setup(&[]);
        let (tx, rx) = mpsc::channel(4);
        tx.send(SchedulerMessage::TriggerSweep).await.unwrap();
        tx.send(SchedulerMessage::Shutdown).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
            .await
            .unwrap();
    }
}
