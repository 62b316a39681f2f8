//! Lyrics data types

use serde::{Deserialize, Serialize};

/// A single synchronized lyric line
///
/// Produced only by the parser. `original_text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    /// Lyric text as sung
    pub original_text: String,
    /// Translated text, empty when the line has no translation
    #[serde(default)]
    pub translated_text: String,
    /// Start time in milliseconds
    pub timestamp_ms: u64,
}

impl LyricLine {
    /// Create a line without translation
    pub fn mono(original_text: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            original_text: original_text.into(),
            translated_text: String::new(),
            timestamp_ms,
        }
    }

    /// Whether a translation is attached to this line
    pub fn has_translation(&self) -> bool {
        !self.translated_text.is_empty()
    }
}

/// Which physical input a tagged line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    /// The user-facing lyric
    Original,
    /// The translation blob
    Translated,
}
