//! Periodic refresh timer
//!
//! A single timer slot driven by the daemon loop: the loop sleeps until
//! [`RefreshScheduler::next_deadline`] and then calls [`RefreshScheduler::poll`].
//! Arming always replaces the previous timer, so at most one is ever live.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::constants::schedule::MIN_INTERVAL_MINUTES;

/// Identifies one armed timer. Handles of replaced timers go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct ArmedTimer {
    handle: TimerHandle,
    period: Duration,
    deadline: Instant,
}

#[derive(Debug, Default)]
pub struct RefreshScheduler {
    next_handle: u64,
    armed: Option<ArmedTimer>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start firing every `interval_minutes`, replacing any existing timer
    pub fn arm(&mut self, interval_minutes: u32, now: Instant) -> TimerHandle {
        self.armed = None;

        let minutes = if interval_minutes < MIN_INTERVAL_MINUTES {
            warn!(
                interval_minutes = interval_minutes,
                floor = MIN_INTERVAL_MINUTES,
                "Refresh interval too small, using floor"
            );
            MIN_INTERVAL_MINUTES
        } else {
            interval_minutes
        };
        let period = Duration::from_secs(u64::from(minutes) * 60);

        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.armed = Some(ArmedTimer {
            handle,
            period,
            deadline: now + period,
        });
        debug!(handle = handle.0, minutes = minutes, "Refresh timer armed");
        handle
    }

    /// Cancel the timer if `handle` is still the live one. Returns whether
    /// anything was cancelled; stale or repeated calls are no-ops.
    pub fn disarm(&mut self, handle: TimerHandle) -> bool {
        match &self.armed {
            Some(timer) if timer.handle == handle => {
                self.armed = None;
                debug!(handle = handle.0, "Refresh timer disarmed");
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|timer| timer.deadline)
    }

    /// Fire at most once if the deadline has passed, then re-arm for the same
    /// period. Missed periods are not replayed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(timer) = self.armed.as_mut() else {
            return false;
        };
        if now < timer.deadline {
            return false;
        }
        timer.deadline = now + timer.period;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_fires_after_interval_and_rearms() {
        let start = Instant::now();
        let mut scheduler = RefreshScheduler::new();
        scheduler.arm(30, start);

        assert!(!scheduler.poll(start + 29 * MINUTE));
        assert!(scheduler.poll(start + 30 * MINUTE));
        assert!(!scheduler.poll(start + 30 * MINUTE));
        assert_eq!(scheduler.next_deadline(), Some(start + 60 * MINUTE));
        assert!(scheduler.poll(start + 60 * MINUTE));
    }

    #[test]
    fn test_rearm_replaces_previous_timer() {
        let start = Instant::now();
        let mut scheduler = RefreshScheduler::new();
        let first = scheduler.arm(5, start);
        scheduler.arm(10, start);

        let fired: Vec<u32> = (1..=10)
            .filter(|m| scheduler.poll(start + *m * MINUTE))
            .collect();
        assert_eq!(fired, vec![10]);
        assert!(!scheduler.disarm(first));
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let start = Instant::now();
        let mut scheduler = RefreshScheduler::new();
        let handle = scheduler.arm(1, start);

        assert!(scheduler.disarm(handle));
        assert!(!scheduler.disarm(handle));
        assert!(!scheduler.is_armed());
        assert!(!scheduler.poll(start + 100 * MINUTE));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_zero_interval_uses_floor() {
        let start = Instant::now();
        let mut scheduler = RefreshScheduler::new();
        scheduler.arm(0, start);
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + MIN_INTERVAL_MINUTES * MINUTE)
        );
    }

    #[test]
    fn test_late_poll_fires_once() {
        let start = Instant::now();
        let mut scheduler = RefreshScheduler::new();
        scheduler.arm(1, start);

        let late = start + 10 * MINUTE;
        assert!(scheduler.poll(late));
        assert!(!scheduler.poll(late));
        assert_eq!(scheduler.next_deadline(), Some(late + MINUTE));
    }
}
