//! Pipeline events: structured observability for every assembly pass.
//!
//! Events are published when a source settles, a package is scored, a
//! refinement is applied or memory degrades. Subscribers (tests, the CLI,
//! a metrics exporter) react without coupling to the emitting component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All pipeline events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A source returned results within its timeout.
    SourceCompleted {
        source: String,
        items: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A source errored or timed out and contributed nothing.
    SourceFailed {
        source: String,
        reason: String,
        timed_out: bool,
        timestamp: DateTime<Utc>,
    },

    /// A raw package was assembled.
    AssemblyCompleted {
        package_id: String,
        session_id: String,
        duration_ms: u64,
        knowledge_items: usize,
        patterns: usize,
        tools: usize,
        memory_entries: usize,
        degraded: bool,
        timestamp: DateTime<Utc>,
    },

    /// A package was scored.
    QualityScored {
        package_id: String,
        pass: u32,
        completeness: u8,
        feasibility: u8,
        clarity: u8,
        overall: u8,
        can_proceed: bool,
        timestamp: DateTime<Utc>,
    },

    /// A named remediation was applied during refinement.
    RefinementApplied {
        iteration: u32,
        remediation: String,
        timestamp: DateTime<Utc>,
    },

    /// A suggestion had no known remediation.
    SuggestionSkipped {
        suggestion: String,
        timestamp: DateTime<Utc>,
    },

    /// The optimization loop reached Done.
    OptimizationFinished {
        passes: u32,
        best_overall: u8,
        can_proceed: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An interaction was appended to short-term memory.
    InteractionRecorded {
        session_id: String,
        user_id: String,
        short_term_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// A memory read or write failed and a default was used.
    MemoryDegraded {
        operation: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Short-term retention cleanup ran.
    CleanupCompleted {
        removed: usize,
        remaining: usize,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Stable snake_case name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SourceCompleted { .. } => "source_completed",
            Self::SourceFailed { .. } => "source_failed",
            Self::AssemblyCompleted { .. } => "assembly_completed",
            Self::QualityScored { .. } => "quality_scored",
            Self::RefinementApplied { .. } => "refinement_applied",
            Self::SuggestionSkipped { .. } => "suggestion_skipped",
            Self::OptimizationFinished { .. } => "optimization_finished",
            Self::InteractionRecorded { .. } => "interaction_recorded",
            Self::MemoryDegraded { .. } => "memory_degraded",
            Self::CleanupCompleted { .. } => "cleanup_completed",
        }
    }
}

/// A broadcast-based event bus for pipeline events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<PipelineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PipelineEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Drain every event currently buffered for a receiver.
pub fn drain(rx: &mut broadcast::Receiver<Arc<PipelineEvent>>) -> Vec<Arc<PipelineEvent>> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}
