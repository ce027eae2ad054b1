//! `MemoryStore`: the short-term and long-term memory service.
//!
//! Wraps a [`MemoryBackend`] with the retention cap, read and write
//! timeouts, preference inference and per-key write serialization. Memory is an
//! optimization for the caller: the plain getters never fail, they log a
//! warning, publish [`PipelineEvent::MemoryDegraded`] and return defaults.

use crate::inference::{KeywordInference, PreferenceInference};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ctxforge_core::error::MemoryError;
use ctxforge_core::event::{EventBus, PipelineEvent};
use ctxforge_core::memory::{ActionRecord, MemoryBackend, MemoryEntry};
use ctxforge_core::profile::{PreferenceSignal, UserProfile};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_SHORT_TERM: usize = 20;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(2000);

type LockMap = Mutex<HashMap<String, Arc<Mutex<()>>>>;

pub struct MemoryStore {
    backend: Arc<dyn MemoryBackend>,
    max_short_term: usize,
    read_timeout: Duration,
    write_timeout: Duration,
    inference: Arc<dyn PreferenceInference>,
    session_locks: LockMap,
    user_locks: LockMap,
    events: Option<Arc<EventBus>>,
}

impl MemoryStore {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self {
            backend,
            max_short_term: DEFAULT_MAX_SHORT_TERM,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            inference: Arc::new(KeywordInference),
            session_locks: Mutex::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
            events: None,
        }
    }

    /// Cap on retained entries per session. Zero is treated as one.
    pub fn with_max_short_term(mut self, max: usize) -> Self {
        self.max_short_term = max.max(1);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_inference(mut self, inference: Arc<dyn PreferenceInference>) -> Self {
        self.inference = inference;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn max_short_term(&self) -> usize {
        self.max_short_term
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// The most recent entries for a session, newest first.
    pub async fn try_short_term(&self, session_id: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
        let mut entries = self
            .bounded("load_session", self.read_timeout, self.backend.load_session(session_id))
            .await?;
        entries.reverse();
        entries.truncate(self.max_short_term);
        Ok(entries)
    }

    /// Like [`try_short_term`](Self::try_short_term) but degrades to empty.
    pub async fn get_short_term(&self, session_id: &str) -> Vec<MemoryEntry> {
        match self.try_short_term(session_id).await {
            Ok(entries) => entries,
            Err(e) => {
                self.degraded("get_short_term", &e);
                Vec::new()
            }
        }
    }

    /// The user's profile, or a fresh default one if none was stored.
    pub async fn try_long_term(&self, user_id: &str) -> Result<UserProfile, MemoryError> {
        let stored = self
            .bounded("load_profile", self.read_timeout, self.backend.load_profile(user_id))
            .await?;
        Ok(stored.unwrap_or_else(|| UserProfile::new(user_id)))
    }

    pub async fn get_long_term(&self, user_id: &str) -> UserProfile {
        match self.try_long_term(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                self.degraded("get_long_term", &e);
                UserProfile::new(user_id)
            }
        }
    }

    /// Actions of recent interactions, newest first, capped at `limit`.
    pub async fn recent_actions(&self, session_id: &str, limit: usize) -> Vec<ActionRecord> {
        self.get_short_term(session_id)
            .await
            .into_iter()
            .flat_map(|entry| entry.actions.into_iter().rev())
            .take(limit)
            .collect()
    }

    // ── Writes ──────────────────────────────────────────────────────────

    /// Append an interaction to the session log and fold it into the
    /// user's profile. Failures and timeouts are logged and swallowed.
    pub async fn record_interaction(&self, session_id: &str, user_id: &str, entry: MemoryEntry) {
        let signals = self.inference.infer(&entry);

        let lock = lock_for(&self.session_locks, session_id).await;
        let short_term_len = {
            let _guard = lock.lock().await;
            self.append_entry(session_id, entry).await
        };
        release(&self.session_locks, session_id, lock).await;

        if let Some(len) = short_term_len {
            debug!(session_id, user_id, short_term_len = len, "Interaction recorded");
            self.publish(PipelineEvent::InteractionRecorded {
                session_id: session_id.to_string(),
                user_id: user_id.to_string(),
                short_term_len: len,
                timestamp: Utc::now(),
            });
        }

        let lock = lock_for(&self.user_locks, user_id).await;
        {
            let _guard = lock.lock().await;
            self.update_profile(user_id, &signals).await;
        }
        release(&self.user_locks, user_id, lock).await;
    }

    async fn update_profile(&self, user_id: &str, signals: &[PreferenceSignal]) {
        let mut profile = match self.try_long_term(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                // Folding onto a default would overwrite whatever is stored.
                self.degraded("update_profile", &e);
                return;
            }
        };
        profile.apply_all(signals);
        let save = self.backend.save_profile(&profile);
        if let Err(e) = self.bounded("save_profile", self.write_timeout, save).await {
            self.degraded("save_profile", &e);
        }
    }

    /// Returns the retained log length, or `None` if nothing was written.
    async fn append_entry(&self, session_id: &str, entry: MemoryEntry) -> Option<usize> {
        let mut log = match self
            .bounded("load_session", self.read_timeout, self.backend.load_session(session_id))
            .await
        {
            Ok(log) => log,
            Err(e) => {
                self.degraded("record_interaction", &e);
                return None;
            }
        };
        log.push(entry);
        if log.len() > self.max_short_term {
            let excess = log.len() - self.max_short_term;
            log.drain(..excess);
        }
        let save = self.backend.save_session(session_id, &log);
        match self.bounded("save_session", self.write_timeout, save).await {
            Ok(()) => Some(log.len()),
            Err(e) => {
                self.degraded("save_session", &e);
                None
            }
        }
    }

    /// Remove short-term entries older than `older_than_days`.
    pub async fn cleanup(&self, older_than_days: u32) -> usize {
        self.cleanup_at(Utc::now(), older_than_days).await
    }

    /// [`cleanup`](Self::cleanup) against a fixed clock. Returns the number
    /// of entries removed. Profiles are never touched.
    pub async fn cleanup_at(&self, now: DateTime<Utc>, older_than_days: u32) -> usize {
        let cutoff = now - ChronoDuration::days(i64::from(older_than_days));
        let sessions = match self
            .bounded("list_sessions", self.read_timeout, self.backend.list_sessions())
            .await
        {
            Ok(sessions) => sessions,
            Err(e) => {
                self.degraded("cleanup", &e);
                return 0;
            }
        };

        let mut removed = 0;
        let mut remaining = 0;
        for session_id in sessions {
            let lock = lock_for(&self.session_locks, &session_id).await;
            let (dropped, kept) = {
                let _guard = lock.lock().await;
                self.prune_session(&session_id, cutoff).await
            };
            release(&self.session_locks, &session_id, lock).await;
            removed += dropped;
            remaining += kept;
        }

        info!(removed, remaining, older_than_days, "Short-term memory cleanup finished");
        self.publish(PipelineEvent::CleanupCompleted {
            removed,
            remaining,
            timestamp: Utc::now(),
        });
        removed
    }

    /// Returns (removed, kept) for one session log.
    async fn prune_session(&self, session_id: &str, cutoff: DateTime<Utc>) -> (usize, usize) {
        let load = self.backend.load_session(session_id);
        let mut log = match self.bounded("load_session", self.read_timeout, load).await {
            Ok(log) => log,
            Err(e) => {
                self.degraded("cleanup", &e);
                return (0, 0);
            }
        };
        let before = log.len();
        log.retain(|entry| entry.timestamp >= cutoff);
        let dropped = before - log.len();
        if dropped == 0 {
            return (0, before);
        }
        let save = self.backend.save_session(session_id, &log);
        match self.bounded("save_session", self.write_timeout, save).await {
            Ok(()) => (dropped, log.len()),
            Err(e) => {
                self.degraded("cleanup", &e);
                (0, before)
            }
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    async fn bounded<T>(
        &self,
        operation: &str,
        limit: Duration,
        fut: impl Future<Output = Result<T, MemoryError>>,
    ) -> Result<T, MemoryError> {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(MemoryError::Timeout {
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }),
        }
    }

    fn degraded(&self, operation: &str, error: &MemoryError) {
        warn!(operation, error = %error, backend = self.backend.name(), "Memory degraded, using defaults");
        self.publish(PipelineEvent::MemoryDegraded {
            operation: operation.to_string(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: PipelineEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

async fn lock_for(map: &LockMap, key: &str) -> Arc<Mutex<()>> {
    map.lock().await.entry(key.to_string()).or_default().clone()
}

/// Drop a key's lock once no other task holds or waits on it.
async fn release(map: &LockMap, key: &str, lock: Arc<Mutex<()>>) {
    let mut map = map.lock().await;
    // The map and `lock` are the only owners left.
    if Arc::strong_count(&lock) == 2 {
        map.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryBackend;
    use async_trait::async_trait;
    use ctxforge_core::event::drain;
    use ctxforge_core::memory::{ActionKind, Outcome};
    use ctxforge_core::profile::ResponseLength;

    fn entry(input: &str) -> MemoryEntry {
        MemoryEntry::new(input, "ok", vec![])
    }

    fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(InMemoryBackend::new()))
    }

    /// Fails every operation.
    struct BrokenBackend;

    #[async_trait]
    impl MemoryBackend for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }
        async fn load_session(&self, _: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
            Err(MemoryError::Storage("disk on fire".into()))
        }
        async fn save_session(&self, _: &str, _: &[MemoryEntry]) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("disk on fire".into()))
        }
        async fn load_profile(&self, _: &str) -> Result<Option<UserProfile>, MemoryError> {
            Err(MemoryError::Storage("disk on fire".into()))
        }
        async fn save_profile(&self, _: &UserProfile) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("disk on fire".into()))
        }
        async fn list_sessions(&self) -> Result<Vec<String>, MemoryError> {
            Err(MemoryError::Storage("disk on fire".into()))
        }
    }

    /// Never answers reads.
    struct HangingBackend;

    #[async_trait]
    impl MemoryBackend for HangingBackend {
        fn name(&self) -> &str {
            "hanging"
        }
        async fn load_session(&self, _: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
            std::future::pending().await
        }
        async fn save_session(&self, _: &str, _: &[MemoryEntry]) -> Result<(), MemoryError> {
            Ok(())
        }
        async fn load_profile(&self, _: &str) -> Result<Option<UserProfile>, MemoryError> {
            std::future::pending().await
        }
        async fn save_profile(&self, _: &UserProfile) -> Result<(), MemoryError> {
            Ok(())
        }
        async fn list_sessions(&self) -> Result<Vec<String>, MemoryError> {
            Ok(Vec::new())
        }
    }

    /// Answers reads instantly and never finishes a write.
    struct StuckWriter;

    #[async_trait]
    impl MemoryBackend for StuckWriter {
        fn name(&self) -> &str {
            "stuck-writer"
        }
        async fn load_session(&self, _: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
            Ok(vec![entry("stale").at(Utc::now() - ChronoDuration::days(60))])
        }
        async fn save_session(&self, _: &str, _: &[MemoryEntry]) -> Result<(), MemoryError> {
            std::future::pending().await
        }
        async fn load_profile(&self, _: &str) -> Result<Option<UserProfile>, MemoryError> {
            Ok(None)
        }
        async fn save_profile(&self, _: &UserProfile) -> Result<(), MemoryError> {
            std::future::pending().await
        }
        async fn list_sessions(&self) -> Result<Vec<String>, MemoryError> {
            Ok(vec!["s1".into()])
        }
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        assert!(store().get_short_term("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_gets_default_profile() {
        let profile = store().get_long_term("new-user").await;
        assert_eq!(profile.user_id, "new-user");
        assert!(!profile.has_history());
    }

    #[tokio::test]
    async fn short_term_is_newest_first_and_capped() {
        let store = store().with_max_short_term(3);
        for i in 0..5 {
            store.record_interaction("s1", "u1", entry(&format!("request {i}"))).await;
        }
        let recent = store.get_short_term("s1").await;
        let inputs: Vec<_> = recent.iter().map(|e| e.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["request 4", "request 3", "request 2"]);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = store();
        store.record_interaction("s1", "u1", entry("one")).await;
        store.record_interaction("s2", "u1", entry("two")).await;
        assert_eq!(store.get_short_term("s1").await.len(), 1);
        assert_eq!(store.get_short_term("s2").await[0].user_input, "two");
    }

    #[tokio::test]
    async fn recording_updates_profile() {
        let store = store();
        for _ in 0..3 {
            store
                .record_interaction("s1", "u1", entry("use rust").with_outcome(Outcome::Success))
                .await;
        }
        let profile = store.get_long_term("u1").await;
        assert_eq!(profile.technical.technologies["rust"], 3);
        assert_eq!(profile.communication.response_length, ResponseLength::Concise);
        assert_eq!(profile.learning.successes, 3);
    }

    #[tokio::test]
    async fn concurrent_profile_updates_are_not_lost() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .record_interaction(&format!("s{i}"), "shared", entry("docker again"))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let profile = store.get_long_term("shared").await;
        assert_eq!(profile.technical.technologies["docker"], 20);
        assert_eq!(profile.learning.interactions, 20);
    }

    #[tokio::test]
    async fn recent_actions_flatten_newest_first() {
        let store = store();
        let action = |name: &str| {
            ActionRecord::new(
                ActionKind::Custom {
                    name: name.into(),
                    detail: String::new(),
                },
                true,
            )
        };
        store
            .record_interaction("s1", "u1", MemoryEntry::new("a", "", vec![action("a1"), action("a2")]))
            .await;
        store
            .record_interaction("s1", "u1", MemoryEntry::new("b", "", vec![action("b1")]))
            .await;

        let labels: Vec<_> = store
            .recent_actions("s1", 2)
            .await
            .iter()
            .map(|a| a.kind.label().to_string())
            .collect();
        assert_eq!(labels, vec!["b1", "a2"]);
    }

    #[tokio::test]
    async fn cleanup_removes_old_entries_and_is_idempotent() {
        let store = store();
        let now = Utc::now();
        store
            .record_interaction("s1", "u1", entry("old").at(now - ChronoDuration::days(40)))
            .await;
        store
            .record_interaction("s1", "u1", entry("fresh").at(now - ChronoDuration::days(1)))
            .await;
        store
            .record_interaction("s2", "u1", entry("older").at(now - ChronoDuration::days(90)))
            .await;

        assert_eq!(store.cleanup_at(now, 30).await, 2);
        let first: Vec<_> = store.get_short_term("s1").await;
        assert_eq!(first.len(), 1);
        assert!(store.get_short_term("s2").await.is_empty());

        assert_eq!(store.cleanup_at(now, 30).await, 0);
        assert_eq!(store.get_short_term("s1").await, first);
        // Profiles survive cleanup
        assert_eq!(store.get_long_term("u1").await.learning.interactions, 3);
    }

    #[tokio::test]
    async fn broken_backend_degrades_to_defaults() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let store = MemoryStore::new(Arc::new(BrokenBackend)).with_events(Arc::clone(&bus));

        assert!(store.get_short_term("s1").await.is_empty());
        assert_eq!(store.get_long_term("u1").await.user_id, "u1");
        store.record_interaction("s1", "u1", entry("hello")).await;
        assert_eq!(store.cleanup(30).await, 0);

        let events = drain(&mut rx);
        assert!(events.iter().all(|e| e.name() != "interaction_recorded"));
        assert!(events.iter().filter(|e| e.name() == "memory_degraded").count() >= 4);
        assert!(store.try_short_term("s1").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reads_time_out() {
        let store = MemoryStore::new(Arc::new(HangingBackend)).with_read_timeout(Duration::from_millis(50));
        let err = store.try_short_term("s1").await.unwrap_err();
        assert!(matches!(err, MemoryError::Timeout { timeout_ms: 50, .. }));
        assert_eq!(store.get_long_term("u1").await.user_id, "u1");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_writes_time_out_and_degrade() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let store = MemoryStore::new(Arc::new(StuckWriter))
            .with_write_timeout(Duration::from_millis(75))
            .with_events(Arc::clone(&bus));

        store.record_interaction("s1", "u1", entry("hello")).await;
        assert_eq!(store.cleanup(30).await, 0);

        let degraded: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e.as_ref() {
                PipelineEvent::MemoryDegraded { operation, reason, .. } => {
                    Some((operation.clone(), reason.clone()))
                }
                _ => None,
            })
            .collect();
        let operations: Vec<_> = degraded.iter().map(|(op, _)| op.as_str()).collect();
        assert_eq!(operations, vec!["save_session", "save_profile", "cleanup"]);
        assert!(degraded.iter().all(|(_, reason)| reason.contains("75")));
    }

    #[tokio::test]
    async fn lock_maps_shrink_after_use() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .record_interaction(&format!("s{}", i % 3), &format!("u{}", i % 2), entry("hi"))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        store.cleanup(30).await;

        assert!(store.session_locks.lock().await.is_empty());
        assert!(store.user_locks.lock().await.is_empty());
        assert_eq!(store.get_short_term("s0").await.len(), 4);
    }

    #[tokio::test]
    async fn records_publish_event() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let store = store().with_events(Arc::clone(&bus));
        store.record_interaction("s1", "u1", entry("hi")).await;

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e.as_ref(),
            PipelineEvent::InteractionRecorded { short_term_len: 1, .. }
        )));
    }
}
