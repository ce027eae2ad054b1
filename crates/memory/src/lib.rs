//! Memory system for ctxforge.
//!
//! Backends persist raw session logs and profiles; [`MemoryStore`] layers
//! retention, timeouts, inference and locking on top of any of them.

pub mod file_backend;
pub mod in_memory;
pub mod inference;
pub mod noop;
pub mod store;

pub use file_backend::FileBackend;
pub use in_memory::InMemoryBackend;
pub use inference::{KeywordInference, PreferenceInference};
pub use noop::NoopMemory;
pub use store::MemoryStore;
