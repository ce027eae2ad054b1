//! In-memory backend: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use ctxforge_core::error::MemoryError;
use ctxforge_core::memory::{MemoryBackend, MemoryEntry};
use ctxforge_core::profile::UserProfile;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory backend that keeps session logs and profiles in maps.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryBackend {
    sessions: Arc<RwLock<HashMap<String, Vec<MemoryEntry>>>>,
    profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    fn name(&self) -> &str { "in_memory" }

    async fn load_session(&self, session_id: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(self.sessions.read().await.get(session_id).cloned().unwrap_or_default())
    }

    async fn save_session(&self, session_id: &str, entries: &[MemoryEntry]) -> Result<(), MemoryError> {
        let mut sessions = self.sessions.write().await;
        if entries.is_empty() {
            sessions.remove(session_id);
        } else {
            sessions.insert(session_id.to_string(), entries.to_vec());
        }
        Ok(())
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, MemoryError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), MemoryError> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, MemoryError> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
