//! Wall-clock time source and timers anchored to absolute timestamps.
//!
//! Every engine timer stores the absolute time of its next firing instead of
//! a decrementing counter. The driver calls `poll(now)` as often as it likes
//! (every animation frame in the browser); a backgrounded tab that stops
//! calling for a while simply sees several periods elapse at once.

use std::cell::Cell;
use std::rc::Rc;

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

pub const SECOND_MS: Millis = 1_000;
pub const HOUR_MS: Millis = 3_600 * SECOND_MS;

pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// The real clock: `Date.now()` in the browser, `SystemTime` elsewhere.
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> Millis {
        js_sys::Date::now().max(0.0) as Millis
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> Millis {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to. Clones share the same time, so a
/// test can keep one handle and give another to the engine.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: Millis) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// Recurring timer. Stopped timers hold no handle and never fire.
#[derive(Clone, Debug)]
pub struct IntervalTimer {
    period_ms: Millis,
    next_due: Option<Millis>,
}

impl IntervalTimer {
    pub fn new(period_ms: Millis) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_due: None,
        }
    }

    pub fn period_ms(&self) -> Millis {
        self.period_ms
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Start the timer if it is not already running. A running timer keeps
    /// its phase.
    pub fn start(&mut self, now: Millis) {
        if self.next_due.is_none() {
            self.next_due = Some(now.saturating_add(self.period_ms));
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Number of whole periods that elapsed since the last call. The next
    /// firing stays on the original phase.
    pub fn poll(&mut self, now: Millis) -> u32 {
        let Some(due) = self.next_due else {
            return 0;
        };
        if now < due {
            return 0;
        }
        let fired = (now - due) / self.period_ms + 1;
        self.next_due = Some(due + fired * self.period_ms);
        fired.min(u32::MAX as Millis) as u32
    }
}

/// One-shot timer whose deadline is pushed back every time it is scheduled
/// again. Used for debounced writes.
#[derive(Clone, Debug)]
pub struct Debounce {
    window_ms: Millis,
    deadline: Option<Millis>,
}

impl Debounce {
    pub fn new(window_ms: Millis) -> Self {
        Self {
            window_ms,
            deadline: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn schedule(&mut self, now: Millis) {
        self.deadline = Some(now.saturating_add(self.window_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True once the window has passed without another `schedule`. Firing
    /// disarms the timer.
    pub fn poll(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
