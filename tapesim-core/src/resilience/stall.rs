//! Stall detection for live feeds
//!
//! Tracks the wall-clock time since the last live event. The shadow runner sleeps until
//! [`StallDetector::deadline`] alongside the feed; reaching it means the feed stalled.

use std::time::Duration;
use tokio::time::Instant;

/// State of the stall detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// An event arrived within the timeout
    Fresh,
    /// No event for longer than the timeout
    Stalled,
}

#[derive(Debug, Clone)]
pub struct StallDetector {
    timeout: Duration,
    last_event: Instant,
    events_seen: u64,
}

impl StallDetector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_event: Instant::now(),
            events_seen: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Report that an event was received
    #[inline]
    pub fn record_event(&mut self) {
        self.last_event = Instant::now();
        self.events_seen += 1;
    }

    /// Instant at which the feed counts as stalled unless another event arrives
    pub fn deadline(&self) -> Instant {
        self.last_event + self.timeout
    }

    pub fn time_since_event(&self) -> Duration {
        self.last_event.elapsed()
    }

    pub fn state(&self) -> FeedState {
        if self.time_since_event() >= self.timeout {
            FeedState::Stalled
        } else {
            FeedState::Fresh
        }
    }

    pub fn is_stalled(&self) -> bool {
        self.state() == FeedState::Stalled
    }

    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }
}
