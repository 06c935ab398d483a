//! # Persistence Module
//!
//! ## Why This Module Exists
//! Calibrated mappings and user settings have to survive restarts. This module
//! owns the on-disk side of both: a key/value [`store::MappingStore`] for
//! [`MappingRecord`](crate::mapping::MappingRecord)s and a TOML settings file.
//!
//! ## Key Abstractions
//! - **Settings**: every field has a serde default, so partial files load
//! - **MappingStore**: get/set/all over records, in memory or as a TOML file
//! - **PersistenceManager**: a blocking tokio task owning the store, driven
//!   over a channel so file writes stay off the async workers
//!
//! ## Error Handling Strategy
//! Store operations return [`StoreError`]. Settings loading is "fail-safe":
//! a missing or corrupt file degrades to defaults with a warning rather than
//! preventing startup.

pub mod persistence_worker;
pub mod store;

use crate::controller::normalizer::DEFAULT_DEADZONE;
use crate::gesture::{ConflictPolicy, DEFAULT_TRIGGER_THRESHOLD};
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "padscript";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const MAPPINGS_FILE: &str = "mappings.toml";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize mappings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to parse mappings file: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("Persistence worker is no longer running")]
    WorkerGone,

    #[error("Persistence queue is full")]
    QueueFull,
}

/// Runtime-tunable pipeline settings.
///
/// Read by the session on every tick, so changes apply on the next frame.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Settings {
    /// Minimum stick deflection that counts as intentional
    #[serde(default = "default_deadzone")]
    pub stick_deadzone: f32,
    /// Trigger intensity above which a trigger selects a mode
    #[serde(default = "default_trigger_threshold")]
    pub trigger_threshold: f32,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Vowel completing an onset typed on its own
    #[serde(default = "default_vowel")]
    pub default_vowel: char,
}

fn default_deadzone() -> f32 {
    DEFAULT_DEADZONE
}

fn default_trigger_threshold() -> f32 {
    DEFAULT_TRIGGER_THRESHOLD
}

fn default_poll_interval_ms() -> u64 {
    16
}

fn default_vowel() -> char {
    'o'
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stick_deadzone: default_deadzone(),
            trigger_threshold: default_trigger_threshold(),
            conflict_policy: ConflictPolicy::default(),
            poll_interval_ms: default_poll_interval_ms(),
            default_vowel: default_vowel(),
        }
    }
}

/// `<config dir>/padscript`, or `./padscript` when the platform has no
/// config directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        })
        .join(APP_DIR)
}

pub async fn load_settings(dir: &Path) -> Settings {
    let path = dir.join(SETTINGS_FILE);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No settings at {}, using defaults", path.display());
            return Settings::default();
        }
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            return Settings::default();
        }
    };

    match toml::from_str(&content) {
        Ok(settings) => {
            debug!("Loaded settings: {:?}", settings);
            settings
        }
        Err(e) => {
            warn!("Failed to parse {}: {}, using defaults", path.display(), e);
            Settings::default()
        }
    }
}

pub async fn save_settings(dir: &Path, settings: &Settings) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    let content = toml::to_string_pretty(settings)
        .map_err(|e| eyre!("Failed to serialize settings: {}", e))?;
    tokio::fs::write(dir.join(SETTINGS_FILE), content)
        .await
        .map_err(|e| eyre!("Failed to write settings file: {}", e))?;
    Ok(())
}

/// Writes a default settings file on first run.
pub async fn ensure_default_settings(dir: &Path) -> Result<()> {
    let exists = tokio::fs::try_exists(dir.join(SETTINGS_FILE))
        .await
        .map_err(|e| eyre!("Failed to check settings file: {}", e))?;
    if !exists {
        info!("Creating default settings in {}", dir.display());
        save_settings(dir, &Settings::default()).await?;
    }
    Ok(())
}
