//! Error types for the ctxforge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. Only [`RequestError`]
//! is expected to reach a caller: source and memory failures are absorbed
//! into degraded-but-valid results by the pipeline.

use thiserror::Error;

/// The top-level error type for all ctxforge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request (contract) errors ---
    #[error("Invalid request: {0}")]
    Request(#[from] RequestError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Source errors ---
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Malformed task requests. These are programmer/contract errors and are
/// the only failures that propagate as hard errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("unknown task type '{0}' (expected architecture, feature, bugfix, refactor, decision, progress or general)")]
    InvalidTaskType(String),

    #[error("unknown priority '{0}' (expected high, medium or low)")]
    InvalidPriority(String),

    #[error("session id must not be empty")]
    EmptySessionId,

    #[error("user input must not be empty")]
    EmptyUserInput,
}

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("Source '{source_name}' timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("Source '{source_name}' failed: {reason}")]
    Failed { source_name: String, reason: String },

    #[error("Source not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid response from source: {0}")]
    InvalidResponse(String),
}

impl SourceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupted memory record: {0}")]
    Corrupted(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Memory operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}
