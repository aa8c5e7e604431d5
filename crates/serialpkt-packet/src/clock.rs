use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of a monotonic millisecond counter.
///
/// The counter is 32 bits wide and may wrap; elapsed times are always
/// computed with wrapping subtraction.
pub trait Clock {
    fn now_millis(&self) -> u32;
}

/// Milliseconds since the clock was created, truncated to 32 bits.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same counter, so a test can keep one handle and give
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start)),
        }
    }

    pub fn set(&self, millis: u32) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Advance by `millis`, wrapping at `u32::MAX`.
    pub fn advance(&self, millis: u32) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.wrapping_add(millis))
            });
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_millis(&self) -> u32 {
        (**self).now_millis()
    }
}
