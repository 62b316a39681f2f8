//! Lyric sources
//!
//! Raw lyric text as delivered by the music API or found on disk, before
//! parsing. A source is an original LRC blob plus an optional translation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parser::{LyricLine, parse_lyric};

/// Raw lyric payload for one song
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricSource {
    /// Original lyric in LRC format
    pub lyric: String,
    /// Translated lyric in LRC format
    #[serde(default)]
    pub tlyric: Option<String>,
}

impl LyricSource {
    pub fn new(lyric: impl Into<String>, tlyric: Option<String>) -> Self {
        Self {
            lyric: lyric.into(),
            tlyric,
        }
    }

    /// Parse into a lyric timeline
    pub fn parse(&self) -> Vec<LyricLine> {
        parse_lyric(&self.lyric, self.tlyric.as_deref())
    }

    /// Whether a non-blank translation is present
    pub fn has_translation(&self) -> bool {
        self.tlyric.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Read a source from JSON
    ///
    /// Accepts the flat `{"lyric": .., "tlyric": ..}` form as well as the
    /// lyric API response `{"code": 200, "lrc": {"lyric": ..}, "tlyric": {"lyric": ..}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("Invalid lyric JSON")?;

        if value.get("lrc").is_none() {
            return serde_json::from_value(value).context("Invalid lyric payload");
        }

        if let Some(code) = value.get("code").and_then(Value::as_i64) {
            if code != 200 {
                return Err(anyhow!("Lyric API returned code {}", code));
            }
        }

        let lyric = nested_lyric(&value, "lrc").ok_or_else(|| anyhow!("Missing lrc.lyric"))?;
        let tlyric = nested_lyric(&value, "tlyric");
        Ok(Self { lyric, tlyric })
    }

    /// Load a lyric file and its translation sibling, if any
    ///
    /// The translation is looked up as `<stem>.<translation_ext>` next to
    /// `path`, lowercase first and then uppercase.
    pub fn from_path(path: &Path, translation_ext: &str) -> Result<Self> {
        let lyric = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lyrics from {:?}", path))?;

        let tlyric = match find_translation_file(path, translation_ext) {
            Some(tpath) => match fs::read_to_string(&tpath) {
                Ok(content) => {
                    tracing::debug!("Loaded translation from {:?}", tpath);
                    Some(content)
                }
                Err(e) => {
                    tracing::warn!("Failed to read translation {:?}: {}", tpath, e);
                    None
                }
            },
            None => None,
        };

        Ok(Self { lyric, tlyric })
    }

    /// Load an original and an explicit translation file
    pub fn from_paths(path: &Path, translation: &Path) -> Result<Self> {
        let lyric = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lyrics from {:?}", path))?;
        let tlyric = fs::read_to_string(translation)
            .with_context(|| format!("Failed to read translation from {:?}", translation))?;
        Ok(Self::new(lyric, Some(tlyric)))
    }
}

fn nested_lyric(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .get("lyric")?
        .as_str()
        .map(str::to_string)
}

/// Find a translation file with the same stem as `path`
fn find_translation_file(path: &Path, ext: &str) -> Option<PathBuf> {
    let parent = path.parent()?;
    let stem = path.file_stem()?.to_str()?;

    for ext in [ext.to_lowercase(), ext.to_uppercase()] {
        let candidate = parent.join(format!("{}.{}", stem, ext));
        if candidate != path && candidate.exists() {
            return Some(candidate);
        }
    }

    None
}
