//! Application settings persistence
//!
//! Handles saving and loading user preferences.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Lyric display and timing settings
    #[serde(default)]
    pub lyrics: LyricSettings,
}

/// Lyric-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricSettings {
    /// Shift applied to the playback position before it reaches the
    /// scheduler. Positive values show lines earlier.
    #[serde(default)]
    pub offset_ms: i64,
    /// Show translated text under the original line
    #[serde(default = "default_true")]
    pub show_translation: bool,
    /// Extension of translation files stored next to lyric files
    #[serde(default = "default_translation_suffix")]
    pub translation_suffix: String,
}

fn default_true() -> bool {
    true
}

fn default_translation_suffix() -> String {
    "tlrc".to_string()
}

impl Default for LyricSettings {
    fn default() -> Self {
        Self {
            offset_ms: 0,
            show_translation: true,
            translation_suffix: default_translation_suffix(),
        }
    }
}

impl LyricSettings {
    /// Apply the configured offset to a playback position
    pub fn adjust(&self, position_ms: u64) -> u64 {
        position_ms.saturating_add_signed(self.offset_ms)
    }
}

impl Settings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "lyricsync", "LyricSync")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .and_then(|path| match Self::load_from_file(&path) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    if path.exists() {
                        tracing::warn!("Ignoring settings at {:?}: {}", path, e);
                    }
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(path) = Self::file_path() {
            self.save_to_file(&path)
        } else {
            Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ))
        }
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Errors that can occur with settings
#[derive(Debug, Clone)]
pub enum SettingsError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}
