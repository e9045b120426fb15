//! Session state snapshot and lifecycle enums
//!
//! ```text
//!  ┌─────────────┐  step(n>0)   ┌────────┐  cursor == total   ┌──────┐
//!  │ NOT_STARTED │ ───────────▶ │ ACTIVE │ ─────────────────▶ │ DONE │
//!  └─────────────┘              └────────┘   or finish(..)    └──────┘
//! ```
//!
//! `SessionState` is what `get_state()` returns. It carries no session id and no wall-clock
//! time, so two replays of the same tape with the same calls serialize byte-identically.

use crate::core::{AssetId, Order, PriceLevel, SimError, SimResult};
use crate::ledger::PortfolioSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    NotStarted,
    Active,
    Done,
}

/// Why a session reached DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoneReason {
    /// Every tape event was applied
    TapeExhausted,
    /// Live feed went quiet for longer than the stall timeout
    Stalled,
    /// Explicitly cancelled (kill switch or caller)
    Cancelled,
    /// Live feed ended
    FeedClosed,
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DoneReason::TapeExhausted => "TAPE_EXHAUSTED",
            DoneReason::Stalled => "STALLED",
            DoneReason::Cancelled => "CANCELLED",
            DoneReason::FeedClosed => "FEED_CLOSED",
        };
        f.write_str(s)
    }
}

/// Where events come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Fixed tape, advanced by `step`
    Replay,
    /// Live feed, advanced by `push_event`
    Live,
}

/// Book view for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetState {
    pub best_bid: Option<PriceLevel>,
    pub best_ask: Option<PriceLevel>,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub mid_price: Option<Decimal>,
    pub spread: Option<Decimal>,
    pub last_trade_price: Option<Decimal>,
    pub crossed: bool,
}

/// Full observable state of a session at its current cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: SessionMode,
    pub status: SessionStatus,
    pub done: bool,
    pub done_reason: Option<DoneReason>,
    pub cursor: u64,
    pub total_events: u64,
    /// Seq / ts of the last applied event
    pub current_seq: Option<u64>,
    pub current_ts: Option<u64>,
    pub assets: BTreeMap<AssetId, AssetState>,
    pub open_orders: Vec<Order>,
    pub order_count: usize,
    pub fill_count: usize,
    pub crossed_observations: u64,
    pub portfolio: PortfolioSnapshot,
}

impl SessionState {
    pub fn asset(&self, asset_id: &str) -> Option<&AssetState> {
        self.assets.get(asset_id)
    }

    /// Open orders for one asset
    pub fn open_orders_for<'a>(&'a self, asset_id: &'a str) -> impl Iterator<Item = &'a Order> + 'a {
        self.open_orders.iter().filter(move |o| o.asset_id == asset_id)
    }

    /// Stable JSON rendering (field order follows the struct, maps are sorted)
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string(self)
            .map_err(|e| SimError::Invariant(format!("state serialization failed: {}", e)))
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SimError::Invariant(format!("state serialization failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::NotStarted).unwrap(),
            "\"NOT_STARTED\""
        );
        assert_eq!(
            serde_json::to_string(&DoneReason::FeedClosed).unwrap(),
            "\"FEED_CLOSED\""
        );
        assert_eq!(DoneReason::Stalled.to_string(), "STALLED");
        assert_eq!(serde_json::to_string(&SessionMode::Live).unwrap(), "\"live\"");
    }
}
