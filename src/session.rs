//! In-memory conversation sessions (non-persistent).
//!
//! Each session owns its own history behind a mutex, so concurrent requests
//! on one session are serialized and different sessions never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::agent::ConversationHistory;

pub type SharedHistory = Arc<Mutex<ConversationHistory>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SharedHistory>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the history for `id`, creating an empty one if needed.
    pub async fn get_or_create(&self, id: &str) -> SharedHistory {
        if let Some(history) = self.sessions.read().await.get(id) {
            return history.clone();
        }

        self.sessions
            .write()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    pub async fn get(&self, id: &str) -> Option<SharedHistory> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Clear the history of `id`. Returns `false` if the session is unknown.
    pub async fn reset(&self, id: &str) -> bool {
        let Some(history) = self.get(id).await else {
            return false;
        };
        history.lock().await.reset();
        true
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
