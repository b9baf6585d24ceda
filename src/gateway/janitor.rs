//! Periodic expiry sweep for the conversation store.
//!
//! Reads and writes already sweep, so this only bounds how long idle sessions
//! linger when traffic stops.

use crate::sessions::ConversationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the sweep loop. Returns `None` when `interval` is zero (disabled).
pub fn spawn_janitor(
    store: Arc<dyn ConversationStore>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("Session janitor disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.cleanup_expired_sessions();
            if removed > 0 {
                tracing::debug!(removed, store = store.name(), "Janitor swept expired sessions");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::{Clock, InMemoryConversationStore, Message};
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;

    struct FixedClock(Mutex<DateTime<Utc>>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    #[tokio::test]
    async fn zero_interval_disables_janitor() {
        let store: Arc<dyn ConversationStore> =
            Arc::new(InMemoryConversationStore::new(10, Duration::from_secs(60)));
        assert!(spawn_janitor(store, Duration::ZERO).is_none());
    }

    #[tokio::test]
    async fn janitor_removes_expired_sessions() {
        let clock = Arc::new(FixedClock(Mutex::new(Utc::now())));
        let store = Arc::new(InMemoryConversationStore::with_clock(
            10,
            Duration::from_secs(60),
            clock.clone(),
        ));
        store.update_history("idle", vec![Message::user("hi")]);
        assert_eq!(store.get_stats().active_sessions, 1);

        *clock.0.lock() += chrono::Duration::seconds(120);
        let handle = spawn_janitor(store.clone(), Duration::from_millis(20)).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.get_stats().active_sessions, 0);
        assert_eq!(store.tracked_sessions(), 0);
        handle.abort();
    }
}
