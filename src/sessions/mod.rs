//! Session management: bounded, expiring conversation history per session.

pub mod in_memory;
pub mod policy;
pub mod traits;

pub use in_memory::InMemoryConversationStore;
pub use policy::cap_history;
pub use traits::{Clock, ConversationStore, Message, Role, SessionStats, SystemClock};

use crate::config::ConversationConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create the process-wide conversation store from config.
pub fn create_conversation_store(config: &ConversationConfig) -> Arc<dyn ConversationStore> {
    Arc::new(InMemoryConversationStore::new(
        config.max_history,
        Duration::from_secs(config.session_timeout_minutes.saturating_mul(60)),
    ))
}
