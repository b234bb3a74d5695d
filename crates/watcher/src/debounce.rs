//! Debounce state machine for the store file
//!
//! ```text
//!            event                    deadline passed
//!   Idle ─────────────▶ PendingReload ───────────────▶ Idle (+ reload)
//!    ▲                    │  event: push deadline out
//!    │ quiet period over  │
//!    └──── Suppressed ◀───┘ suppress (our own save)
//! ```
//!
//! Events arriving while suppressed are dropped. Time is passed in by the
//! caller so the machine stays pure.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    PendingReload { deadline: Instant },
    Suppressed { until: Instant },
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    state: WatchState,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            state: WatchState::Idle,
            window,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Record a change event; returns false if it was dropped
    pub fn on_event(&mut self, now: Instant) -> bool {
        match self.state {
            WatchState::Suppressed { until } if now < until => false,
            _ => {
                self.state = WatchState::PendingReload {
                    deadline: now + self.window,
                };
                true
            }
        }
    }

    /// Ignore events until `until`; a pending reload is discarded
    pub fn suppress(&mut self, until: Instant) {
        match self.state {
            WatchState::Suppressed { until: current } if current >= until => {}
            _ => self.state = WatchState::Suppressed { until },
        }
    }

    /// Advance the clock; returns true exactly when a reload is due
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            WatchState::PendingReload { deadline } if now >= deadline => {
                self.state = WatchState::Idle;
                true
            }
            WatchState::Suppressed { until } if now >= until => {
                self.state = WatchState::Idle;
                false
            }
            _ => false,
        }
    }

    /// When `poll` next needs to run, if ever
    pub fn next_wakeup(&self) -> Option<Instant> {
        match self.state {
            WatchState::Idle => None,
            WatchState::PendingReload { deadline } => Some(deadline),
            WatchState::Suppressed { until } => Some(until),
        }
    }
}
