//! Per-user "what is the bot waiting for" state.
//!
//! Entries expire after a fixed TTL. Expired entries are invisible to `get`,
//! are removed the next time they are touched, and are swept in bulk by
//! `purge_expired`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    /// Next message is a movie URL or catalog id.
    AwaitingMovieReference,
    /// Next message is the slot time for this movie.
    AwaitingSlotDatetime {
        #[serde(rename = "movieId")]
        movie_id: i32,
    },
    /// Next message is the user's catalog account id.
    AwaitingCatalogAccount,
}

#[derive(Debug, Clone)]
struct Entry {
    state: ConversationState,
    set_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ConversationStore {
    entries: Arc<DashMap<i64, Entry>>,
    ttl: Duration,
}

impl ConversationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Replaces whatever the user was doing before.
    pub fn set(&self, user_id: i64, state: ConversationState) {
        debug!(user_id = user_id, state = ?state, "Conversation state set");
        self.entries.insert(
            user_id,
            Entry {
                state,
                set_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, user_id: i64) -> Option<ConversationState> {
        self.get_at(user_id, Instant::now())
    }

    pub fn clear(&self, user_id: i64) -> Option<ConversationState> {
        self.entries.remove(&user_id).map(|(_, entry)| entry.state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.set_at) <= self.ttl);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged = purged, "Expired conversation states purged");
        }
        purged
    }

    fn get_at(&self, user_id: i64, now: Instant) -> Option<ConversationState> {
        {
            let entry = self.entries.get(&user_id)?;
            if now.saturating_duration_since(entry.set_at) <= self.ttl {
                return Some(entry.state.clone());
            }
        }

        // Read guard must be gone before removing.
        self.entries
            .remove_if(&user_id, |_, e| now.saturating_duration_since(e.set_at) > self.ttl);
        debug!(user_id = user_id, "Conversation state expired");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_should_return_what_was_set() {
        let store = ConversationStore::new(Duration::from_secs(60));
        store.set(1, ConversationState::AwaitingSlotDatetime { movie_id: 7 });

        assert_eq!(
            store.get(1),
            Some(ConversationState::AwaitingSlotDatetime { movie_id: 7 })
        );
        assert_eq!(store.get(2), None);
    }

    #[test]
    fn set_should_replace_previous_state() {
        let store = ConversationStore::new(Duration::from_secs(60));
        store.set(1, ConversationState::AwaitingMovieReference);
        store.set(1, ConversationState::AwaitingCatalogAccount);

        assert_eq!(store.get(1), Some(ConversationState::AwaitingCatalogAccount));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_should_remove_state() {
        let store = ConversationStore::new(Duration::from_secs(60));
        store.set(1, ConversationState::AwaitingMovieReference);

        assert_eq!(store.clear(1), Some(ConversationState::AwaitingMovieReference));
        assert_eq!(store.get(1), None);
        assert_eq!(store.clear(1), None);
    }

    #[test]
    fn expired_state_should_be_invisible_and_purged() {
        let store = ConversationStore::new(Duration::from_secs(60));
        store.set(1, ConversationState::AwaitingMovieReference);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(store.get_at(1, later), None);
        assert!(store.is_empty());
    }

    #[test]
    fn purge_expired_should_drop_only_stale_entries() {
        let store = ConversationStore::new(Duration::from_secs(60));
        for user_id in 0..1000 {
            store.set(user_id, ConversationState::AwaitingMovieReference);
        }

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(store.purge_expired_at(later), 1000);
        assert!(store.is_empty());

        store.set(1, ConversationState::AwaitingCatalogAccount);
        assert_eq!(store.purge_expired(), 0);
        assert_eq!(store.get(1), Some(ConversationState::AwaitingCatalogAccount));
    }

    #[test]
    fn states_should_be_isolated_per_user() {
        let store = ConversationStore::new(Duration::from_secs(60));
        store.set(1, ConversationState::AwaitingMovieReference);
        store.set(2, ConversationState::AwaitingCatalogAccount);

        store.clear(1);

        assert_eq!(store.get(2), Some(ConversationState::AwaitingCatalogAccount));
    }

    #[test]
    fn state_should_serialize_with_tag() {
        let json = serde_json::to_value(ConversationState::AwaitingSlotDatetime { movie_id: 3 })
            .unwrap();
        assert_eq!(json["state"], "AWAITING_SLOT_DATETIME");
        assert_eq!(json["movieId"], 3);
    }
}
