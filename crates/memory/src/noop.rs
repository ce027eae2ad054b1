//! No-op memory backend: disables persistent memory entirely.

use async_trait::async_trait;
use ctxforge_core::error::MemoryError;
use ctxforge_core::memory::{MemoryBackend, MemoryEntry};
use ctxforge_core::profile::UserProfile;

/// A no-op memory backend that stores nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryBackend for NoopMemory {
    fn name(&self) -> &str { "none" }

    async fn load_session(&self, _session_id: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn save_session(&self, _session_id: &str, _entries: &[MemoryEntry]) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn load_profile(&self, _user_id: &str) -> Result<Option<UserProfile>, MemoryError> {
        Ok(None)
    }

    async fn save_profile(&self, _profile: &UserProfile) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, MemoryError> {
        Ok(Vec::new())
    }
}
