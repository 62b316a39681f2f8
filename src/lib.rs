//! LyricSync - synchronized lyric playback
//!
//! Parses timestamped LRC lyrics (optionally merged with a translation) and
//! activates lines in step with an external audio clock.
//!
//! ```text
//! LyricSource --parse--> [LyricLine] --> LyricScheduler --LineActivation--> UI
//!                                           ^
//!                              play(offset) / pause()
//! ```

pub mod features;
pub mod playback;

pub use features::lyrics::{LyricLine, LyricSource, parse_lyric};
pub use playback::{LineActivation, LyricScheduler, line_event_channel};
