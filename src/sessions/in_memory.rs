//! In-memory conversation store implementation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::policy::cap_history;
use super::traits::{Clock, ConversationStore, Message, SessionStats, SystemClock};
use crate::util::sanitize_session_id;

pub const DEFAULT_MAX_HISTORY: usize = 10;
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// One tracked session. `history` is `None` until the first write, so a
/// session that has only been read is tracked for expiry but not counted
/// as active.
#[derive(Debug, Clone)]
struct SessionEntry {
    history: Option<Vec<Message>>,
    last_access: DateTime<Utc>,
}

impl SessionEntry {
    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_access = self.last_access.max(now);
    }
}

/// A conversation store backed by a single mutex-protected hash map.
///
/// History and last-access time live in the same entry, so every operation
/// updates both under one lock and the expiry sweep never races a writer.
pub struct InMemoryConversationStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    max_history: usize,
    session_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemoryConversationStore {
    pub fn new(max_history: usize, session_timeout: Duration) -> Self {
        Self::with_clock(max_history, session_timeout, Arc::new(SystemClock))
    }

    /// Construct with an explicit time source. A `max_history` of zero is
    /// raised to one.
    pub fn with_clock(max_history: usize, session_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        let max_history = max_history.max(1);
        tracing::info!(
            max_history,
            timeout_minutes = session_timeout.as_secs() / 60,
            "Initialized conversation store"
        );
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_history,
            session_timeout,
            clock,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Number of tracked sessions, including ones that were only read.
    pub fn tracked_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    fn timeout_delta(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_timeout).unwrap_or(chrono::Duration::MAX)
    }

    fn sweep_locked(&self, sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) -> usize {
        let timeout = self.timeout_delta();
        let before = sessions.len();
        sessions.retain(|session_id, entry| {
            let expired = now.signed_duration_since(entry.last_access) > timeout;
            if expired {
                tracing::info!(
                    session = %sanitize_session_id(session_id),
                    "Expired session cleaned up"
                );
            }
            !expired
        });
        before - sessions.len()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY, DEFAULT_SESSION_TIMEOUT)
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn get_history(&self, session_id: &str) -> Vec<Message> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        self.sweep_locked(&mut sessions, now);

        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                history: None,
                last_access: now,
            });
        entry.touch(now);

        let history = entry.history.clone().unwrap_or_default();
        tracing::debug!(
            session = %sanitize_session_id(session_id),
            messages = history.len(),
            "Retrieved history"
        );
        history
    }

    fn update_history(&self, session_id: &str, messages: Vec<Message>) {
        let retained = cap_history(messages, self.max_history);
        let count = retained.len();

        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        self.sweep_locked(&mut sessions, now);

        match sessions.get_mut(session_id) {
            Some(entry) => {
                entry.history = Some(retained);
                entry.touch(now);
            }
            None => {
                sessions.insert(
                    session_id.to_string(),
                    SessionEntry {
                        history: Some(retained),
                        last_access: now,
                    },
                );
            }
        }
        drop(sessions);

        tracing::debug!(
            session = %sanitize_session_id(session_id),
            messages = count,
            "Updated history"
        );
    }

    fn clear_session(&self, session_id: &str) {
        let removed = self.sessions.lock().remove(session_id).is_some();
        if removed {
            tracing::info!(session = %sanitize_session_id(session_id), "Cleared session");
        } else {
            tracing::debug!(session = %sanitize_session_id(session_id), "Clear on unknown session");
        }
    }

    fn cleanup_expired_sessions(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        self.sweep_locked(&mut sessions, now)
    }

    fn get_stats(&self) -> SessionStats {
        let sessions = self.sessions.lock();
        let (active_sessions, total_messages) = sessions
            .values()
            .filter_map(|entry| entry.history.as_ref())
            .fold((0, 0), |(count, total), history| (count + 1, total + history.len()));

        SessionStats {
            active_sessions,
            total_messages,
            max_history: self.max_history,
            session_timeout_minutes: self.session_timeout.as_secs_f64() / 60.0,
        }
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
