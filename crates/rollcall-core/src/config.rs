//! Recognition configuration with layered sources.
//!
//! Values are resolved in priority order:
//! 1. **Compiled defaults** — [`RecognitionConfig::default()`]
//! 2. **Config file** — JSON, merged over defaults field-by-field
//! 3. **Environment variables** — `ROLLCALL_*` (highest priority)
//!
//! The match threshold and embedding dimensions are operational constants
//! determined by the deployed extraction model, not derivable from the
//! algorithms, so both live here rather than being hardcoded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for [`RecognitionConfig`].
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override had an unparseable value.
    #[error("invalid value for {var}: {value}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },
}

/// Configuration for identity resolution and attendance storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RecognitionConfig {
    /// Maximum Euclidean distance at which a query matches a stored vector.
    /// A distance equal to the threshold does NOT match (strict inequality).
    pub match_threshold: f32,

    /// Expected embedding dimensions. When unset, the store learns the
    /// dimension from the first vector it holds.
    pub embedding_dimensions: Option<usize>,

    /// Path to the persisted embedding snapshot.
    pub snapshot_path: PathBuf,

    /// Path to the attendance ledger database.
    pub ledger_path: PathBuf,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.9,
            embedding_dimensions: None,
            snapshot_path: PathBuf::from("rollcall/embeddings.bin"),
            ledger_path: PathBuf::from("rollcall/attendance.db"),
        }
    }
}

impl RecognitionConfig {
    /// Load configuration from a JSON file, then apply `ROLLCALL_*` env
    /// overrides.
    ///
    /// A missing file is not an error — defaults are used as the base layer.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_file_layer(path)?;
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    fn load_file_layer(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&raw)?)
        } else {
            tracing::debug!(?path, "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production; injectable for tests).
    fn apply_overrides(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = get("ROLLCALL_MATCH_THRESHOLD") {
            self.match_threshold = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "ROLLCALL_MATCH_THRESHOLD".into(),
                value: raw,
            })?;
        }
        if let Some(raw) = get("ROLLCALL_EMBEDDING_DIMENSIONS") {
            let dims = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "ROLLCALL_EMBEDDING_DIMENSIONS".into(),
                value: raw,
            })?;
            self.embedding_dimensions = Some(dims);
        }
        if let Some(raw) = get("ROLLCALL_SNAPSHOT_PATH") {
            self.snapshot_path = PathBuf::from(raw);
        }
        if let Some(raw) = get("ROLLCALL_LEDGER_PATH") {
            self.ledger_path = PathBuf::from(raw);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
