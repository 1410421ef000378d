use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction shared by the controller, the pulse driver and
/// the event loop.
///
/// - now(): returns a monotonic Instant
/// - sleep(): blocks for the provided duration (implementations may simulate)
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Time left until `deadline`, zero if it already passed.
    fn until(&self, deadline: Instant) -> Duration {
        deadline.saturating_duration_since(self.now())
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset
/// sleep(d) advances the offset by d without blocking, so a pulse of 500 ms
/// "takes" 500 ms of simulated time. Clones share the same offset.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move time forward by `d`.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Total simulated time since construction.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);

        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.now() - t0, Duration::from_millis(250));

        let shared = clock.clone();
        shared.advance(Duration::from_secs(1));
        assert_eq!(clock.elapsed(), Duration::from_millis(1250));
    }

    #[test]
    fn until_saturates_for_past_deadlines() {
        let clock = ManualClock::new();
        let deadline = clock.now() + Duration::from_secs(2);
        assert_eq!(clock.until(deadline), Duration::from_secs(2));
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.until(deadline), Duration::ZERO);
    }
}
