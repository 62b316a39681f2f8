//! Feature modules
//!
//! - `lyrics`: lyric parsing and sources
//! - `settings`: persisted user preferences

pub mod lyrics;
pub mod settings;

pub use settings::{LyricSettings, Settings, SettingsError};
