//! Normalized tape events
//!
//! Every schema variant a tape line can take (legacy single `price_change`, modern
//! batched `price_changes`, `last_trade_price`, full `book` snapshots) is resolved once at
//! parse time into [`EventKind`]. Nothing downstream inspects raw JSON.

use crate::core::{AssetId, BookSide, PriceLevel, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One level replacement: set `(side, price)` to `size`, removing the level when size is 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpdate {
    pub asset_id: AssetId,
    pub side: BookSide,
    pub price: Decimal,
    pub size: Decimal,
}

/// A trade print observed on the tape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePrint {
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
}

/// Full-depth snapshot for one asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

/// Payload of an event, resolved from whichever schema the line used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Legacy schema: a single level update
    PriceChange(LevelUpdate),
    /// Modern schema: several level updates applied atomically
    PriceChanges(Vec<LevelUpdate>),
    /// Trade print; never alters levels
    LastTradePrice { asset_id: AssetId, print: TradePrint },
    /// Replace both sides of one asset's book
    Book {
        asset_id: AssetId,
        snapshot: BookSnapshot,
    },
}

impl EventKind {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PriceChange(_) => "price_change",
            EventKind::PriceChanges(_) => "price_changes",
            EventKind::LastTradePrice { .. } => "last_trade_price",
            EventKind::Book { .. } => "book",
        }
    }
}

/// A normalized tape event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    /// Receive timestamp in milliseconds (0 when the tape omits it)
    pub ts_recv: u64,
    /// Event-level asset id as written on the tape
    pub asset_id: Option<AssetId>,
    pub kind: EventKind,
}

impl Event {
    /// Every asset this event touches, in payload order (may repeat for batches)
    pub fn asset_ids(&self) -> Vec<&AssetId> {
        match &self.kind {
            EventKind::PriceChange(update) => vec![&update.asset_id],
            EventKind::PriceChanges(updates) => updates.iter().map(|u| &u.asset_id).collect(),
            EventKind::LastTradePrice { asset_id, .. } | EventKind::Book { asset_id, .. } => {
                vec![asset_id]
            }
        }
    }

    /// Does this event change displayed depth (as opposed to only printing a trade)?
    pub fn updates_levels(&self) -> bool {
        !matches!(self.kind, EventKind::LastTradePrice { .. })
    }
}
