//! Configuration loading, validation, and management for ctxforge.
//!
//! Loads configuration from `~/.ctxforge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Memory backends accepted by `memory.backend`.
pub const MEMORY_BACKENDS: [&str; 3] = ["file", "in_memory", "none"];

/// The root configuration structure.
///
/// Maps directly to `~/.ctxforge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Memory store configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Source integration configuration
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Context assembly configuration
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Optimization loop configuration
    #[serde(default)]
    pub optimization: OptimizationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "file", "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Directory for the file backend (defaults to `~/.ctxforge/memory`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Maximum short-term entries retained per session
    #[serde(default = "default_max_short_term")]
    pub max_short_term_entries: usize,

    /// Short-term entries older than this are removed by cleanup
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Timeout for a single memory read
    #[serde(default = "default_memory_timeout")]
    pub read_timeout_ms: u64,

    /// Timeout for a single memory write
    #[serde(default = "default_memory_timeout")]
    pub write_timeout_ms: u64,

    /// Maximum prior actions surfaced in a package
    #[serde(default = "default_recent_action_limit")]
    pub recent_action_limit: usize,
}

fn default_memory_backend() -> String {
    "file".into()
}
fn default_max_short_term() -> usize {
    20
}
fn default_retention_days() -> u32 {
    30
}
fn default_memory_timeout() -> u64 {
    2000
}
fn default_recent_action_limit() -> usize {
    20
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
            max_short_term_entries: default_max_short_term(),
            retention_days: default_retention_days(),
            read_timeout_ms: default_memory_timeout(),
            write_timeout_ms: default_memory_timeout(),
            recent_action_limit: default_recent_action_limit(),
        }
    }
}

impl MemoryConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Resolved storage directory for the file backend.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("memory"))
    }
}

/// Weights of the default relevance strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceWeights {
    #[serde(default = "default_lexical_weight")]
    pub lexical: f32,
    #[serde(default = "default_source_weight")]
    pub source: f32,
    #[serde(default = "default_recency_weight")]
    pub recency: f32,
}

fn default_lexical_weight() -> f32 {
    0.5
}
fn default_source_weight() -> f32 {
    0.3
}
fn default_recency_weight() -> f32 {
    0.2
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            lexical: default_lexical_weight(),
            source: default_source_weight(),
            recency: default_recency_weight(),
        }
    }
}

impl RelevanceWeights {
    pub fn total(&self) -> f32 {
        self.lexical + self.source + self.recency
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Independent timeout for each source call
    #[serde(default = "default_source_timeout")]
    pub timeout_ms: u64,

    /// Maximum knowledge items kept per provenance
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Maximum code patterns kept
    #[serde(default = "default_max_patterns")]
    pub max_patterns: usize,

    /// Age at which recency contributes half its weight
    #[serde(default = "default_half_life")]
    pub recency_half_life_days: f32,

    /// Root handed to the file-search provider
    #[serde(default = "default_file_root")]
    pub file_search_root: PathBuf,

    #[serde(default)]
    pub weights: RelevanceWeights,
}

fn default_source_timeout() -> u64 {
    3000
}
fn default_max_items() -> usize {
    10
}
fn default_max_patterns() -> usize {
    5
}
fn default_half_life() -> f32 {
    30.0
}
fn default_file_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_source_timeout(),
            max_items: default_max_items(),
            max_patterns: default_max_patterns(),
            recency_half_life_days: default_half_life(),
            file_search_root: default_file_root(),
            weights: RelevanceWeights::default(),
        }
    }
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Upper bound for each assembly branch
    #[serde(default = "default_branch_timeout")]
    pub branch_timeout_ms: u64,

    /// Directory holding `context.json` and project documents
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,
}

fn default_branch_timeout() -> u64 {
    5000
}
fn default_project_dir() -> PathBuf {
    PathBuf::from(".ctxforge/project")
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            branch_timeout_ms: default_branch_timeout(),
            project_dir: default_project_dir(),
        }
    }
}

impl AssemblyConfig {
    pub fn branch_timeout(&self) -> Duration {
        Duration::from_millis(self.branch_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Refinement attempts after the first scoring pass
    #[serde(default = "default_max_refinements")]
    pub max_refinements: u32,

    /// Items below this relevance are pruned on "information overload"
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f32,

    /// Memory entries older than this are treated as stale
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,
}

fn default_max_refinements() -> u32 {
    2
}
fn default_prune_threshold() -> f32 {
    0.25
}
fn default_stale_after_days() -> u32 {
    7
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_refinements: default_max_refinements(),
            prune_threshold: default_prune_threshold(),
            stale_after_days: default_stale_after_days(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ctxforge/config.toml).
    ///
    /// Environment variables override file values:
    /// - `CTXFORGE_MEMORY_BACKEND`
    /// - `CTXFORGE_MEMORY_PATH`
    /// - `CTXFORGE_SOURCE_TIMEOUT_MS`
    /// - `CTXFORGE_MAX_REFINEMENTS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("CTXFORGE_MEMORY_BACKEND") {
            self.memory.backend = backend;
        }
        if let Some(path) = lookup("CTXFORGE_MEMORY_PATH") {
            self.memory.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("CTXFORGE_SOURCE_TIMEOUT_MS") {
            self.sources.timeout_ms = parse_env("CTXFORGE_SOURCE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("CTXFORGE_MAX_REFINEMENTS") {
            self.optimization.max_refinements = parse_env("CTXFORGE_MAX_REFINEMENTS", &raw)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ctxforge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be one of {:?}, got '{}'",
                MEMORY_BACKENDS, self.memory.backend
            )));
        }

        if self.memory.max_short_term_entries == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_short_term_entries must be > 0".into(),
            ));
        }

        if self.sources.max_items == 0 {
            return Err(ConfigError::ValidationError(
                "sources.max_items must be > 0".into(),
            ));
        }

        if self.sources.timeout_ms == 0
            || self.assembly.branch_timeout_ms == 0
            || self.memory.read_timeout_ms == 0
            || self.memory.write_timeout_ms == 0
        {
            return Err(ConfigError::ValidationError(
                "timeouts must be > 0".into(),
            ));
        }

        let w = &self.sources.weights;
        if w.lexical < 0.0 || w.source < 0.0 || w.recency < 0.0 {
            return Err(ConfigError::ValidationError(
                "relevance weights must be non-negative".into(),
            ));
        }
        if w.total() <= 0.0 {
            return Err(ConfigError::ValidationError(
                "lexical + source + recency weights must be > 0".into(),
            ));
        }

        if self.sources.recency_half_life_days <= 0.0 {
            return Err(ConfigError::ValidationError(
                "sources.recency_half_life_days must be > 0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.optimization.prune_threshold) {
            return Err(ConfigError::ValidationError(
                "optimization.prune_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{key} has an invalid value '{raw}'"))
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory.backend, "file");
        assert_eq!(config.memory.max_short_term_entries, 20);
        assert_eq!(config.sources.max_items, 10);
        assert_eq!(config.optimization.max_refinements, 2);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.sources.timeout_ms, config.sources.timeout_ms);
        assert_eq!(parsed.sources.weights, config.sources.weights);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[sources]\nmax_items = 4\n[sources.weights]\nlexical = 0.8").unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.sources.max_items, 4);
        assert_eq!(config.sources.weights.lexical, 0.8);
        assert_eq!(config.sources.weights.source, 0.3);
        assert_eq!(config.memory.retention_days, 30);
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.memory.backend = "redis".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_weights_rejected() {
        let mut config = AppConfig::default();
        config.sources.weights = RelevanceWeights {
            lexical: 0.0,
            source: 0.0,
            recency: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_prune_threshold_rejected() {
        let mut config = AppConfig::default();
        config.optimization.prune_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_memory_write_timeout_rejected() {
        let mut config = AppConfig::default();
        assert_eq!(config.memory.write_timeout(), Duration::from_millis(2000));
        config.memory.write_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.assembly.branch_timeout_ms, 5000);
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[memory\nbackend = ").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CTXFORGE_MEMORY_BACKEND", "in_memory"),
            ("CTXFORGE_SOURCE_TIMEOUT_MS", "750"),
            ("CTXFORGE_MAX_REFINEMENTS", "4"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.memory.backend, "in_memory");
        assert_eq!(config.sources.timeout(), Duration::from_millis(750));
        assert_eq!(config.optimization.max_refinements, 4);
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "CTXFORGE_SOURCE_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_short_term_entries"));
        assert!(toml_str.contains("prune_threshold"));
    }
}
