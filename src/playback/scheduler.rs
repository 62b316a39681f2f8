//! Time-driven lyric line scheduler
//!
//! `LyricScheduler` turns a playback offset and play/pause signals into a
//! stream of [`LineActivation`] events. It keeps a self-rescheduling chain of
//! one-shot timers: exactly one callback is outstanding while playing, and
//! every delay is recomputed from the playback epoch so drift never carries
//! past a single line.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::events::{LineActivation, LineEventSender};
use super::timer::{Timer, TimerHandle};
use crate::features::lyrics::LyricLine;

/// Index of the first line starting at or after `time_ms`
///
/// Seeking past the last line lands on the last line. Returns 0 for an empty
/// sequence.
pub fn find_line_at(lines: &[LyricLine], time_ms: u64) -> usize {
    lines
        .iter()
        .position(|line| line.timestamp_ms >= time_ms)
        .unwrap_or_else(|| lines.len().saturating_sub(1))
}

struct SchedulerState<H> {
    is_playing: bool,
    /// Next line not yet activated
    cursor: usize,
    /// Clock reading at playback position 0, may be negative
    play_epoch_ms: i64,
    paused_at_ms: Option<u64>,
    pending: Option<H>,
    /// Bumped on every cancel; callbacks from an older generation are stale
    generation: u64,
}

impl<H> Default for SchedulerState<H> {
    fn default() -> Self {
        Self {
            is_playing: false,
            cursor: 0,
            play_epoch_ms: 0,
            paused_at_ms: None,
            pending: None,
            generation: 0,
        }
    }
}

struct Shared<T: Timer> {
    lines: Arc<[LyricLine]>,
    timer: T,
    event_tx: LineEventSender,
    state: Mutex<SchedulerState<T::Handle>>,
}

impl<T: Timer> Shared<T> {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.timer.now().as_millis()).unwrap_or(i64::MAX)
    }

    /// Playback offset right now; saturates for seeks far past the end
    fn elapsed_ms(&self, state: &SchedulerState<T::Handle>) -> i64 {
        self.now_ms().saturating_sub(state.play_epoch_ms)
    }

    fn cancel_pending(state: &mut SchedulerState<T::Handle>) {
        state.generation = state.generation.wrapping_add(1);
        if let Some(handle) = state.pending.take() {
            handle.cancel();
        }
    }

    /// Replace the pending callback with one for `lines[cursor]`
    fn schedule_next(self: &Arc<Self>, state: &mut SchedulerState<T::Handle>) {
        Self::cancel_pending(state);
        if !state.is_playing {
            return;
        }
        let Some(line) = self.lines.get(state.cursor) else {
            tracing::debug!("End of lyrics reached");
            return;
        };

        let timestamp_ms = i64::try_from(line.timestamp_ms).unwrap_or(i64::MAX);
        let delay_ms = timestamp_ms.saturating_sub(self.elapsed_ms(state)).max(0) as u64;
        let generation = state.generation;
        let shared = Arc::downgrade(self);

        tracing::trace!(
            "Line {} scheduled in {}ms (generation {})",
            state.cursor,
            delay_ms,
            generation
        );

        let handle = self.timer.schedule_once(
            Duration::from_millis(delay_ms),
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.fire(generation);
                }
            }),
        );
        state.pending = Some(handle);
    }

    fn fire(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation || !state.is_playing {
            tracing::trace!("Dropping stale lyric timer (generation {})", generation);
            return;
        }
        // This callback is the pending one; it has already fired
        state.pending = None;

        let index = state.cursor;
        if let Some(line) = self.lines.get(index) {
            tracing::trace!("Line {} active: {}", index, line.original_text);
            // The UI may have gone away; playback carries on regardless
            let _ = self.event_tx.send(LineActivation::new(index, line));
        }
        state.cursor += 1;

        self.schedule_next(&mut state);
    }
}

/// Drives line activation for one loaded song
///
/// Created once per song and dropped when the next song loads; dropping
/// cancels the pending timer. Calls are expected from a single control
/// surface.
pub struct LyricScheduler<T: Timer> {
    shared: Arc<Shared<T>>,
}

impl<T: Timer> std::fmt::Debug for LyricScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LyricScheduler")
            .field("lines", &self.shared.lines.len())
            .field("is_playing", &state.is_playing)
            .field("cursor", &state.cursor)
            .field("paused_at_ms", &state.paused_at_ms)
            .finish()
    }
}

impl<T: Timer> LyricScheduler<T> {
    pub fn new(lines: impl Into<Arc<[LyricLine]>>, timer: T, event_tx: LineEventSender) -> Self {
        Self {
            shared: Arc::new(Shared {
                lines: lines.into(),
                timer,
                event_tx,
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    /// The parsed lines, shareable with a renderer
    pub fn lines(&self) -> &Arc<[LyricLine]> {
        &self.shared.lines
    }

    pub fn is_playing(&self) -> bool {
        self.shared.state.lock().is_playing
    }

    /// Index of the next line to be activated
    pub fn cursor(&self) -> usize {
        self.shared.state.lock().cursor
    }

    /// Whether every line has been activated in the current run
    pub fn is_finished(&self) -> bool {
        self.shared.state.lock().cursor >= self.shared.lines.len()
    }

    /// Offset captured by the last `pause()`, `None` unless paused
    pub fn paused_offset(&self) -> Option<u64> {
        self.shared.state.lock().paused_at_ms
    }

    /// Current playback offset in milliseconds
    ///
    /// `None` before the first `play()` and after `stop()`.
    pub fn position(&self) -> Option<u64> {
        let state = self.shared.state.lock();
        if state.is_playing {
            Some(self.shared.elapsed_ms(&state).max(0) as u64)
        } else {
            state.paused_at_ms
        }
    }

    pub fn find_line_at(&self, time_ms: u64) -> usize {
        find_line_at(&self.shared.lines, time_ms)
    }

    /// Start or restart playback at `offset_ms`
    ///
    /// Calling this while already playing reschedules from the new offset.
    /// Resume after `pause()` is `play(paused_offset)`.
    pub fn play(&self, offset_ms: u64) {
        let shared = &self.shared;
        if shared.lines.is_empty() {
            tracing::debug!("No lyric lines, ignoring play");
            return;
        }

        let mut state = shared.state.lock();
        state.is_playing = true;
        state.paused_at_ms = None;
        let offset = i64::try_from(offset_ms).unwrap_or(i64::MAX);
        state.play_epoch_ms = shared.now_ms().saturating_sub(offset);
        state.cursor = find_line_at(&shared.lines, offset_ms);

        tracing::debug!("Lyrics playing from {}ms, cursor={}", offset_ms, state.cursor);
        shared.schedule_next(&mut state);
    }

    /// Pause playback; no event fires after this returns until the next `play()`
    pub fn pause(&self) {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        if !state.is_playing {
            return;
        }

        let offset = shared.elapsed_ms(&state).max(0) as u64;
        state.paused_at_ms = Some(offset);
        state.is_playing = false;
        Shared::<T>::cancel_pending(&mut state);

        tracing::debug!("Lyrics paused at {}ms", offset);
    }

    /// Cancel playback and forget all progress
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        Shared::<T>::cancel_pending(&mut state);
        state.is_playing = false;
        state.cursor = 0;
        state.paused_at_ms = None;
    }
}

impl<T: Timer> Drop for LyricScheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::events::{LineEventReceiver, line_event_channel};
    use crate::playback::timer::{ManualTimer, TimerCallback, TokioTimer};

    /// Timer whose handles cannot cancel, so every callback fires
    #[derive(Clone, Default)]
    struct UncancellableTimer(ManualTimer);

    struct IgnoredHandle;

    impl TimerHandle for IgnoredHandle {
        fn cancel(self) {}
    }

    impl Timer for UncancellableTimer {
        type Handle = IgnoredHandle;

        fn now(&self) -> Duration {
            self.0.now()
        }

        fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> Self::Handle {
            let _ = self.0.schedule_once(delay, callback);
            IgnoredHandle
        }
    }

    fn lines_at(times: &[u64]) -> Vec<LyricLine> {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| LyricLine::mono(format!("line {}", i), t))
            .collect()
    }

    fn setup(times: &[u64]) -> (LyricScheduler<ManualTimer>, ManualTimer, LineEventReceiver) {
        let timer = ManualTimer::new();
        let (tx, rx) = line_event_channel();
        let scheduler = LyricScheduler::new(lines_at(times), timer.clone(), tx);
        (scheduler, timer, rx)
    }

    fn drain(rx: &mut LineEventReceiver) -> Vec<usize> {
        let mut indices = Vec::new();
        while let Ok(event) = rx.try_recv() {
            indices.push(event.line_index);
        }
        indices
    }

    #[test]
    fn test_find_line_at() {
        let lines = lines_at(&[1000, 2000]);
        assert_eq!(find_line_at(&lines, 0), 0);
        assert_eq!(find_line_at(&lines, 1000), 0);
        assert_eq!(find_line_at(&lines, 1500), 1);
        assert_eq!(find_line_at(&lines, 2000), 1);
        assert_eq!(find_line_at(&lines, 9999), 1);
        assert_eq!(find_line_at(&[], 10), 0);
    }

    #[test]
    fn test_play_from_offset() {
        let (scheduler, timer, mut rx) = setup(&[0, 2000, 4000]);
        timer.advance_ms(5000);

        scheduler.play(1000);
        assert_eq!(scheduler.cursor(), 1);

        timer.advance_ms(999);
        assert!(drain(&mut rx).is_empty());
        timer.advance_ms(1);
        assert_eq!(drain(&mut rx), vec![1]);

        timer.advance_ms(1999);
        assert!(drain(&mut rx).is_empty());
        timer.advance_ms(1);
        assert_eq!(drain(&mut rx), vec![2]);

        timer.advance_ms(10_000);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(timer.pending_count(), 0);
        assert_eq!(scheduler.cursor(), 3);
        assert!(scheduler.is_playing());
    }

    #[test]
    fn test_event_carries_line_text() {
        let timer = ManualTimer::new();
        let (tx, mut rx) = line_event_channel();
        let lines = vec![LyricLine {
            original_text: "Hello".to_string(),
            translated_text: "Bonjour".to_string(),
            timestamp_ms: 100,
        }];
        let scheduler = LyricScheduler::new(lines, timer.clone(), tx);

        scheduler.play(0);
        timer.advance_ms(100);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.line_index, 0);
        assert_eq!(event.original_text, "Hello");
        assert_eq!(event.translated_text, "Bonjour");
    }

    #[test]
    fn test_pause_keeps_progress() {
        let (scheduler, timer, mut rx) = setup(&[0, 2000, 4000]);

        scheduler.play(0);
        timer.advance(Duration::ZERO);
        assert_eq!(drain(&mut rx), vec![0]);

        timer.advance_ms(500);
        scheduler.pause();
        assert_eq!(scheduler.paused_offset(), Some(500));
        assert_eq!(timer.pending_count(), 0);

        timer.advance_ms(10_000);
        assert!(drain(&mut rx).is_empty());

        let offset = scheduler.paused_offset().unwrap();
        scheduler.play(offset);
        assert_eq!(scheduler.paused_offset(), None);

        // 2000 - 500
        timer.advance_ms(1499);
        assert!(drain(&mut rx).is_empty());
        timer.advance_ms(1);
        assert_eq!(drain(&mut rx), vec![1]);
    }

    #[test]
    fn test_pause_twice_is_noop() {
        let (scheduler, timer, _rx) = setup(&[0, 2000, 4000]);
        scheduler.play(0);
        timer.advance_ms(700);

        scheduler.pause();
        let first = (scheduler.is_playing(), scheduler.cursor(), scheduler.paused_offset());
        timer.advance_ms(300);
        scheduler.pause();
        let second = (scheduler.is_playing(), scheduler.cursor(), scheduler.paused_offset());

        assert_eq!(first, second);
        assert_eq!(second, (false, 1, Some(700)));
        assert_eq!(scheduler.position(), Some(700));
    }

    #[test]
    fn test_replay_same_offset_no_duplicates() {
        let (scheduler, timer, mut rx) = setup(&[0, 2000, 4000]);

        scheduler.play(0);
        timer.advance_ms(1000);
        scheduler.play(1000);
        scheduler.play(1000);
        assert_eq!(timer.pending_count(), 1);

        timer.advance_ms(10_000);
        assert_eq!(drain(&mut rx), vec![0, 1, 2]);
    }

    #[test]
    fn test_seek_backwards_restarts_sequence() {
        let (scheduler, timer, mut rx) = setup(&[0, 2000, 4000]);

        scheduler.play(3000);
        timer.advance_ms(1000);
        assert_eq!(drain(&mut rx), vec![2]);

        scheduler.play(0);
        timer.advance_ms(2000);
        assert_eq!(drain(&mut rx), vec![0, 1]);
    }

    #[test]
    fn test_seek_past_end_fires_last_line() {
        let (scheduler, timer, mut rx) = setup(&[0, 2000, 4000]);

        scheduler.play(60_000);
        assert_eq!(scheduler.cursor(), 2);
        timer.advance(Duration::ZERO);
        assert_eq!(drain(&mut rx), vec![2]);

        timer.advance_ms(60_000);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(timer.pending_count(), 0);
    }

    #[test]
    fn test_seek_to_max_offset_fires_last_line_now() {
        let (scheduler, timer, mut rx) = setup(&[0, 2000, 4000]);
        timer.advance_ms(1000);

        scheduler.play(u64::MAX);
        assert_eq!(scheduler.cursor(), 2);
        timer.advance(Duration::ZERO);
        assert_eq!(drain(&mut rx), vec![2]);
        assert!(scheduler.is_finished());

        timer.advance_ms(10);
        scheduler.pause();
        assert_eq!(scheduler.paused_offset(), Some(i64::MAX as u64));

        // Seeking back after the end still works
        scheduler.play(0);
        assert!(!scheduler.is_finished());
        timer.advance(Duration::ZERO);
        assert_eq!(drain(&mut rx), vec![0]);
    }

    #[test]
    fn test_stale_callbacks_are_ignored_after_replay() {
        let timer = UncancellableTimer::default();
        let (tx, mut rx) = line_event_channel();
        let scheduler = LyricScheduler::new(lines_at(&[0, 2000, 4000]), timer.clone(), tx);

        scheduler.play(0);
        scheduler.play(0);
        scheduler.play(0);
        assert_eq!(timer.0.pending_count(), 3);

        timer.0.advance_ms(10_000);
        assert_eq!(drain(&mut rx), vec![0, 1, 2]);
    }

    #[test]
    fn test_stale_callbacks_are_ignored_after_pause() {
        let timer = UncancellableTimer::default();
        let (tx, mut rx) = line_event_channel();
        let scheduler = LyricScheduler::new(lines_at(&[0, 2000, 4000]), timer.clone(), tx);

        scheduler.play(0);
        timer.0.advance(Duration::ZERO);
        assert_eq!(drain(&mut rx), vec![0]);

        scheduler.pause();
        assert_eq!(timer.0.pending_count(), 1);
        timer.0.advance_ms(10_000);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(scheduler.cursor(), 1);
    }

    #[test]
    fn test_play_with_no_lines() {
        let (scheduler, timer, mut rx) = setup(&[]);
        scheduler.play(0);

        assert!(!scheduler.is_playing());
        assert_eq!(timer.pending_count(), 0);
        timer.advance_ms(1000);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_stop_resets() {
        let (scheduler, timer, mut rx) = setup(&[0, 2000]);
        scheduler.play(1000);
        scheduler.stop();

        assert_eq!(scheduler.position(), None);
        assert_eq!(scheduler.cursor(), 0);
        timer.advance_ms(5000);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_drop_cancels_pending_timer() {
        let (scheduler, timer, mut rx) = setup(&[0, 2000]);
        scheduler.play(500);
        assert_eq!(timer.pending_count(), 1);

        drop(scheduler);
        assert_eq!(timer.pending_count(), 0);
        timer.advance_ms(5000);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_closed_receiver_does_not_stop_playback() {
        let (scheduler, timer, rx) = setup(&[0, 100, 200]);
        drop(rx);

        scheduler.play(0);
        timer.advance_ms(1000);
        assert_eq!(scheduler.cursor(), 3);
    }

    #[test]
    fn test_position_tracks_clock() {
        let (scheduler, timer, _rx) = setup(&[0, 2000]);
        assert_eq!(scheduler.position(), None);

        timer.advance_ms(250);
        scheduler.play(1000);
        timer.advance_ms(400);
        assert_eq!(scheduler.position(), Some(1400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_drives_lines() {
        let (tx, mut rx) = line_event_channel();
        let scheduler = LyricScheduler::new(lines_at(&[0, 2000, 4000]), TokioTimer::current(), tx);

        let start = tokio::time::Instant::now();
        scheduler.play(1000);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.line_index, 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000) && elapsed < Duration::from_millis(1050));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.line_index, 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000) && elapsed < Duration::from_millis(3050));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pause_silences_events() {
        let (tx, mut rx) = line_event_channel();
        let scheduler = LyricScheduler::new(lines_at(&[0, 100, 200]), TokioTimer::current(), tx);

        scheduler.play(0);
        assert_eq!(rx.recv().await.unwrap().line_index, 0);
        scheduler.pause();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(!scheduler.is_playing());
    }
}
