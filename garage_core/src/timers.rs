//! Named, cancellable timers owned by the controller.
//!
//! A timer is just a deadline in the table; nothing runs on its own. The
//! event loop asks for `next_deadline`, sleeps until then, and drains
//! `pop_due`. At most one instance per kind is pending: arming a kind
//! replaces whatever was there.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    OpeningDelay,
    MovingTimeout,
    AutoClose,
    VirtualOpening,
    VirtualPulse,
}

impl TimerKind {
    /// Tie-break order for timers sharing a deadline.
    pub const ALL: [TimerKind; 5] = [
        TimerKind::OpeningDelay,
        TimerKind::MovingTimeout,
        TimerKind::AutoClose,
        TimerKind::VirtualOpening,
        TimerKind::VirtualPulse,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            TimerKind::OpeningDelay => "opening-delay",
            TimerKind::MovingTimeout => "moving-timeout",
            TimerKind::AutoClose => "auto-close",
            TimerKind::VirtualOpening => "virtual-opening",
            TimerKind::VirtualPulse => "virtual-opening-pulse",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    deadline: Instant,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerSet {
    armed: HashMap<TimerKind, Armed>,
}

/// `now + delay`, or the latest representable instant short of that.
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    let mut d = delay;
    loop {
        if let Some(t) = now.checked_add(d) {
            return t;
        }
        d /= 2;
    }
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: TimerKind, deadline: Instant, period: Option<Duration>) {
        if self
            .armed
            .insert(kind, Armed { deadline, period })
            .is_some()
        {
            tracing::debug!(timer = %kind, "timer re-armed");
        } else {
            tracing::debug!(timer = %kind, "timer armed");
        }
    }

    /// One-shot at `now + delay`.
    pub fn arm(&mut self, kind: TimerKind, now: Instant, delay: Duration) {
        self.insert(kind, deadline_after(now, delay), None)
    }

    /// Fires every `period`, first at `now + period`. Periods under 1 ms are
    /// clamped so a zero period cannot spin the loop.
    pub fn arm_periodic(&mut self, kind: TimerKind, now: Instant, period: Duration) {
        let period = period.max(Duration::from_millis(1));
        self.insert(kind, deadline_after(now, period), Some(period))
    }

    /// Returns whether an instance was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let was = self.armed.remove(&kind).is_some();
        if was {
            tracing::debug!(timer = %kind, "timer cancelled");
        }
        was
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.armed.get(&kind).map(|a| a.deadline)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.values().map(|a| a.deadline).min()
    }

    pub fn is_idle(&self) -> bool {
        self.armed.is_empty()
    }

    pub fn armed_kinds(&self) -> Vec<TimerKind> {
        TimerKind::ALL
            .into_iter()
            .filter(|k| self.armed.contains_key(k))
            .collect()
    }

    /// Take the earliest timer whose deadline is at or before `now`.
    ///
    /// One-shots are removed. Periodic timers are rescheduled one period
    /// after their deadline, or one period after `now` if the loop fell
    /// behind, so a stall never produces a burst of catch-up fires.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        let kind = TimerKind::ALL
            .into_iter()
            .filter_map(|k| self.armed.get(&k).map(|a| (k, a.deadline)))
            .filter(|(_, d)| *d <= now)
            .min_by_key(|(_, d)| *d)
            .map(|(k, _)| k)?;
        let entry = self.armed.get_mut(&kind)?;
        match entry.period {
            Some(p) => {
                let next = deadline_after(entry.deadline, p);
                entry.deadline = if next > now {
                    next
                } else {
                    deadline_after(now, p)
                };
            }
            None => {
                self.armed.remove(&kind);
            }
        }
        Some(kind)
    }
}
