//! File-based memory backend: persistent JSON storage.
//!
//! Each session log is a JSONL file (one `MemoryEntry` per line) and each
//! profile is a pretty-printed JSON document:
//!
//! ```text
//! <root>/sessions/<session_id>.jsonl
//! <root>/profiles/<user_id>.json
//! ```
//!
//! Ids are percent-encoded into file names, so distinct ids never collide.
//!
//! Storage location defaults to `~/.ctxforge/memory`. Files are read on
//! demand and rewritten whole on every save, so a crash never leaves a
//! half-merged log behind. Corrupted lines are skipped with a warning.

use async_trait::async_trait;
use ctxforge_core::error::MemoryError;
use ctxforge_core::memory::{MemoryBackend, MemoryEntry};
use ctxforge_core::profile::UserProfile;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SESSIONS_DIR: &str = "sessions";
const PROFILES_DIR: &str = "profiles";

/// A directory-backed memory store.
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Create a new file-based backend rooted at `root`.
    ///
    /// Directories are created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(root = %root.display(), "File memory backend ready");
        Self { root }
    }

    /// Default root: `~/.ctxforge/memory`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".ctxforge").join("memory")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.root
            .join(SESSIONS_DIR)
            .join(format!("{}.jsonl", file_stem(session_id)))
    }

    fn profile_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join(PROFILES_DIR)
            .join(format!("{}.json", file_stem(user_id)))
    }
}

/// Map an id to a file stem. Every byte outside `[A-Za-z0-9-]` is
/// percent-encoded, so distinct ids never share a file and no stem can
/// contain a path separator or a dot. The empty id encodes to `%`.
fn file_stem(id: &str) -> String {
    if id.is_empty() {
        return "%".to_string();
    }
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

/// Inverse of [`file_stem`]. `None` for names this backend never writes.
fn decode_stem(stem: &str) -> Option<String> {
    if stem == "%" {
        return Some(String::new());
    }
    let bytes = stem.as_bytes();
    let mut id = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = stem.get(i + 1..i + 3)?;
                id.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b if b.is_ascii_alphanumeric() || b == b'-' => {
                id.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(id).ok()
}

/// Parse JSONL content, skipping blank and corrupted lines.
fn parse_jsonl(content: &str, origin: &Path) -> Vec<MemoryEntry> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<MemoryEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(file = %origin.display(), error = %e, "Skipping corrupted memory entry");
                None
            }
        })
        .collect()
}

async fn write_atomic(path: &Path, content: &str) -> Result<(), MemoryError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to create memory directory: {e}")))?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, content)
        .await
        .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| MemoryError::Storage(format!("Failed to replace memory file: {e}")))
}

#[async_trait]
impl MemoryBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn load_session(&self, session_id: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
        let path = self.session_path(session_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(parse_jsonl(&content, &path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(MemoryError::Storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn save_session(&self, session_id: &str, entries: &[MemoryEntry]) -> Result<(), MemoryError> {
        let path = self.session_path(session_id);
        if entries.is_empty() {
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(MemoryError::Storage(format!("Failed to remove session log: {e}"))),
            };
        }

        let mut content = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| MemoryError::Serialization(format!("memory entry: {e}")))?;
            content.push_str(&line);
            content.push('\n');
        }
        write_atomic(&path, &content).await
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, MemoryError> {
        let path = self.profile_path(user_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| MemoryError::Corrupted(format!("{}: {e}", path.display())))
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), MemoryError> {
        let content = serde_json::to_string_pretty(profile)
            .map_err(|e| MemoryError::Serialization(format!("user profile: {e}")))?;
        write_atomic(&self.profile_path(&profile.user_id), &content).await
    }

    async fn list_sessions(&self) -> Result<Vec<String>, MemoryError> {
        let dir = self.root.join(SESSIONS_DIR);
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MemoryError::Storage(format!("Failed to list sessions: {e}"))),
        };

        let mut ids = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to list sessions: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                match decode_stem(stem) {
                    Some(id) => ids.push(id),
                    None => warn!(file = %path.display(), "Skipping session file with a foreign name"),
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
