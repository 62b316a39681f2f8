//! Lyric playback events
//!
//! ## Architecture
//! ```text
//! Audio collaborator --[play/pause]--> LyricScheduler --[LineActivation]--> UI
//! ```
//!
//! One event channel may outlive many schedulers: the UI keeps the receiver
//! and each newly loaded song gets a scheduler holding a clone of the sender.

use crate::features::lyrics::LyricLine;

/// A lyric line became the active line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineActivation {
    /// Position in the parsed line sequence
    pub line_index: usize,
    pub original_text: String,
    pub translated_text: String,
}

impl LineActivation {
    pub fn new(line_index: usize, line: &LyricLine) -> Self {
        Self {
            line_index,
            original_text: line.original_text.clone(),
            translated_text: line.translated_text.clone(),
        }
    }
}

// ============ Channel Types ============

/// Sender for line events (held by the scheduler)
pub type LineEventSender = tokio::sync::mpsc::UnboundedSender<LineActivation>;

/// Receiver for line events (held by the UI)
pub type LineEventReceiver = tokio::sync::mpsc::UnboundedReceiver<LineActivation>;

/// Create a new line event channel
pub fn line_event_channel() -> (LineEventSender, LineEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
