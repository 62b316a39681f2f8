//! Lyrics module - parsing and sources
//!
//! - `parser`: LRC parsing and original/translation merging
//! - `source`: raw lyric payloads from disk or the lyric API

pub mod parser;
pub mod source;

// Re-export commonly used items
pub use parser::*;
pub use source::LyricSource;
