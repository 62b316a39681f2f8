//! Clock and one-shot timer abstraction
//!
//! The scheduler never sleeps. It asks a [`Timer`] for the current time and
//! for a callback after a delay, and cancels that callback through the
//! returned handle.
//!
//! - [`TokioTimer`]: spawns a sleeping task on a tokio runtime
//! - [`ManualTimer`]: virtual clock advanced by hand, for deterministic tests

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Callback run once when a timer fires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Monotonic clock plus one-shot callback scheduling
pub trait Timer: Send + Sync + 'static {
    type Handle: TimerHandle;

    /// Time elapsed since the timer's origin
    fn now(&self) -> Duration;

    /// Run `callback` once after `delay`
    ///
    /// Must not run the callback before returning.
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> Self::Handle;
}

/// Cancellation handle for a scheduled callback
pub trait TimerHandle: Send + 'static {
    fn cancel(self);
}

// ============ Tokio ============

/// Timer backed by the tokio runtime
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
    origin: Instant,
}

impl TokioTimer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            origin: Instant::now(),
        }
    }

    /// Timer on the runtime the caller is running in
    ///
    /// # Panics
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

/// Handle to a sleeping tokio task
#[derive(Debug)]
pub struct TokioTimerHandle(JoinHandle<()>);

impl TimerHandle for TokioTimerHandle {
    fn cancel(self) {
        self.0.abort();
    }
}

impl Timer for TokioTimer {
    type Handle = TokioTimerHandle;

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> Self::Handle {
        TokioTimerHandle(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        }))
    }
}

// ============ Manual ============

type TimerKey = (Duration, u64);

#[derive(Default)]
struct ManualTimerInner {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerKey, TimerCallback>,
}

/// Virtual clock that only moves when [`ManualTimer::advance`] is called
///
/// Callbacks due at the same instant fire in scheduling order.
#[derive(Clone, Default)]
pub struct ManualTimer {
    inner: Arc<Mutex<ManualTimerInner>>,
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ManualTimer")
            .field("now", &inner.now)
            .field("pending", &inner.pending.len())
            .finish()
    }
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting to fire
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Move the clock forward, firing every callback that becomes due
    ///
    /// Callbacks run without the timer lock held, so they may schedule or
    /// cancel further callbacks. Those that fall within the advanced window
    /// fire in the same call.
    pub fn advance(&self, by: Duration) {
        let target = self.inner.lock().now + by;

        loop {
            let callback = {
                let mut inner = self.inner.lock();
                let due = inner
                    .pending
                    .first_key_value()
                    .map(|(key, _)| *key)
                    .filter(|(at, _)| *at <= target);
                match due {
                    Some(key) => {
                        inner.now = inner.now.max(key.0);
                        inner.pending.remove(&key)
                    }
                    None => {
                        inner.now = target;
                        None
                    }
                }
            };

            match callback {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    /// Shorthand for [`advance`](Self::advance) in milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

/// Handle to a callback queued on a [`ManualTimer`]
#[derive(Debug)]
pub struct ManualTimerHandle {
    key: TimerKey,
    timer: Weak<Mutex<ManualTimerInner>>,
}

impl TimerHandle for ManualTimerHandle {
    fn cancel(self) {
        if let Some(timer) = self.timer.upgrade() {
            timer.lock().pending.remove(&self.key);
        }
    }
}

impl Timer for ManualTimer {
    type Handle = ManualTimerHandle;

    fn now(&self) -> Duration {
        self.inner.lock().now
    }

    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> Self::Handle {
        let mut inner = self.inner.lock();
        let key = (inner.now + delay, inner.next_id);
        inner.next_id += 1;
        inner.pending.insert(key, callback);
        ManualTimerHandle {
            key,
            timer: Arc::downgrade(&self.inner),
        }
    }
}
