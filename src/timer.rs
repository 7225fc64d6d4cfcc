//! Cancellable countdown timers.
//!
//! Every timed behavior in the widget (controls auto-hide, skip indicator)
//! runs off a `Countdown` owned by the component that armed it. Owners cancel
//! on every mode change and on close, so no timer outlives its mode.

use std::time::{Duration, Instant};

/// A single-shot countdown against an injected clock.
///
/// The current time is always passed in by the caller, which keeps the timer
/// deterministic under test and ties expiry checks to the UI frame loop.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    deadline: Option<Instant>,
}

impl Countdown {
    /// Create an unarmed countdown.
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm (or re-arm) the countdown to fire `duration` after `now`.
    pub fn arm(&mut self, now: Instant, duration: Duration) {
        self.deadline = Some(now + duration);
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether the countdown is currently armed.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Check for expiry. Fires at most once: an expired countdown disarms
    /// itself so callers can treat the `true` return as an edge.
    pub fn fire_if_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Time left until expiry, if armed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}
