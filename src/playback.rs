//! Lyric playback module
//!
//! Synchronizes parsed lyrics with an external audio clock:
//! - `LyricScheduler`: play/pause/seek driven line activation
//! - `timer`: clock and one-shot timer abstraction (tokio and manual)
//! - `events`: line activation events and their channel

pub mod events;
mod scheduler;
pub mod timer;

pub use events::{LineActivation, LineEventReceiver, LineEventSender, line_event_channel};
pub use scheduler::{LyricScheduler, find_line_at};
pub use timer::{ManualTimer, Timer, TimerHandle, TokioTimer};
