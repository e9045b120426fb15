//! Latency models
//!
//! A latency model decides when an order first becomes eligible to match. Under
//! `ZeroLatency` an order can fill at submission against the book the caller saw. Under
//! `EventDelay` an order must wait a fixed number of tape events, so it can never trade
//! against the same book state that prompted it (no look-ahead).

use crate::core::{Order, SimError, SimResult};
use std::fmt::Debug;

/// Decides first eligibility of an order for matching
pub trait LatencyModel: Debug + Send + Sync {
    /// Name used in configuration and manifests
    fn name(&self) -> String;

    /// Can `order` match when the session cursor is at `cursor`?
    fn is_eligible(&self, order: &Order, cursor: u64) -> bool;
}

/// Orders are matchable immediately, including at submission
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroLatency;

impl LatencyModel for ZeroLatency {
    fn name(&self) -> String {
        "zero".to_string()
    }

    #[inline(always)]
    fn is_eligible(&self, _order: &Order, _cursor: u64) -> bool {
        true
    }
}

/// Orders become matchable `events` tape events after submission
#[derive(Debug, Clone, Copy)]
pub struct EventDelay {
    pub events: u64,
}

impl LatencyModel for EventDelay {
    fn name(&self) -> String {
        format!("events:{}", self.events)
    }

    #[inline]
    fn is_eligible(&self, order: &Order, cursor: u64) -> bool {
        cursor >= order.submitted_at_cursor.saturating_add(self.events)
    }
}

/// Build a latency model from its configured name (`"zero"` or `"events:N"`)
pub fn latency_from_name(name: &str) -> SimResult<Box<dyn LatencyModel>> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("zero") || name.eq_ignore_ascii_case("zero_latency") {
        return Ok(Box::new(ZeroLatency));
    }
    if let Some(events) = name.strip_prefix("events:") {
        let events = events
            .parse::<u64>()
            .map_err(|_| SimError::Config(format!("invalid event delay in latency {:?}", name)))?;
        return Ok(Box::new(EventDelay { events }));
    }
    Err(SimError::Config(format!("unknown latency model {:?}", name)))
}
