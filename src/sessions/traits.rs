//! Conversation storage traits and types for per-session message history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged entry in a session history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Snapshot of store occupancy, as reported by [`ConversationStore::get_stats`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    /// Sessions holding a written history.
    pub active_sessions: usize,
    /// Sum of history lengths across all sessions.
    pub total_messages: usize,
    pub max_history: usize,
    pub session_timeout_minutes: f64,
}

/// Time source for last-access bookkeeping and expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time via `chrono::Utc::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Bounded, expiring store of conversation histories keyed by session id.
///
/// Implementations never fail the caller: unknown ids read as empty history,
/// and clearing an absent session is a no-op.
pub trait ConversationStore: Send + Sync {
    /// Return a copy of the session history, touching its last-access time.
    /// Expired sessions are swept before the lookup.
    fn get_history(&self, session_id: &str) -> Vec<Message>;

    /// Replace the session history with a capped copy of `messages`.
    fn update_history(&self, session_id: &str, messages: Vec<Message>);

    /// Drop the session entirely. Idempotent.
    fn clear_session(&self, session_id: &str);

    /// Remove every session idle for longer than the timeout. Returns the count removed.
    fn cleanup_expired_sessions(&self) -> usize;

    /// Occupancy snapshot. Does not sweep.
    fn get_stats(&self) -> SessionStats;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}
