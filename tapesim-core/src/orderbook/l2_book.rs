//! L2 Orderbook - price-level depth reconstructed from tape events
//!
//! One `L2Book` exists per asset. Levels are keyed by exact decimal price, so there are
//! never duplicate prices, and a size-0 update removes its level.
//!
//! ## Design
//!
//! - `BTreeMap<Decimal, Decimal>` per side (price → size)
//! - Best bid / best ask cached after every mutation, so reads are O(1)
//! - Batches are applied in full before the cache is refreshed; no caller ever sees a
//!   half-applied batch
//! - Crossed states (best_bid ≥ best_ask) are kept exactly as observed. Each transition
//!   into a crossed state is logged once and counted; the broker refuses to match against
//!   a crossed book, but the book itself never repairs upstream data.

use crate::core::{AssetId, BookSide, PriceLevel};
use crate::tape::{BookSnapshot, LevelUpdate, TradePrint};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// L2 orderbook for a single asset
#[derive(Debug, Clone)]
pub struct L2Book {
    asset_id: AssetId,
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
    best_bid: Option<PriceLevel>,
    best_ask: Option<PriceLevel>,
    last_trade: Option<TradePrint>,
    /// Seq / ts of the last event applied to this book
    last_seq: u64,
    last_ts: u64,
    crossed: bool,
    crossed_observations: u64,
}

impl L2Book {
    /// Create an empty book
    pub fn new(asset_id: impl Into<AssetId>) -> Self {
        Self {
            asset_id: asset_id.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            best_bid: None,
            best_ask: None,
            last_trade: None,
            last_seq: 0,
            last_ts: 0,
            crossed: false,
            crossed_observations: 0,
        }
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    /// Apply a single level replacement
    pub fn apply_update(&mut self, update: &LevelUpdate) {
        self.set_level(update.side, update.price, update.size);
        self.refresh();
    }

    /// Apply a batch of level replacements atomically
    ///
    /// Updates for other assets are ignored, so a mixed batch can be handed to every book.
    pub fn apply_updates<'a>(&mut self, updates: impl IntoIterator<Item = &'a LevelUpdate>) {
        let mut applied = 0usize;
        for update in updates {
            if update.asset_id != self.asset_id {
                continue;
            }
            self.set_level(update.side, update.price, update.size);
            applied += 1;
        }
        if applied > 0 {
            self.refresh();
        }
    }

    /// Replace both sides with a full-depth snapshot
    pub fn apply_snapshot(&mut self, snapshot: &BookSnapshot) {
        self.bids.clear();
        self.asks.clear();
        for level in &snapshot.bids {
            self.set_level(BookSide::Bid, level.price, level.size);
        }
        for level in &snapshot.asks {
            self.set_level(BookSide::Ask, level.price, level.size);
        }
        self.refresh();
    }

    /// Record a trade print; levels are untouched
    pub fn record_trade(&mut self, print: &TradePrint) {
        self.last_trade = Some(print.clone());
    }

    /// Remember the seq/ts of the event that last touched this book
    pub fn touch(&mut self, seq: u64, ts: u64) {
        self.last_seq = seq;
        self.last_ts = ts;
    }

    #[inline]
    fn set_level(&mut self, side: BookSide, price: Decimal, size: Decimal) {
        let levels = match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        };
        if size.is_zero() {
            levels.remove(&price);
        } else {
            levels.insert(price, size);
        }
    }

    fn refresh(&mut self) {
        self.best_bid = self
            .bids
            .iter()
            .next_back()
            .map(|(p, s)| PriceLevel::new(*p, *s));
        self.best_ask = self.asks.iter().next().map(|(p, s)| PriceLevel::new(*p, *s));

        let crossed = self.is_crossed();
        if crossed && !self.crossed {
            self.crossed_observations += 1;
            warn!(
                asset = %self.asset_id,
                best_bid = ?self.best_bid.map(|l| l.price),
                best_ask = ?self.best_ask.map(|l| l.price),
                seq = self.last_seq,
                "Crossed book observed; matching suspended for this asset"
            );
        } else if !crossed && self.crossed {
            debug!(asset = %self.asset_id, "Book uncrossed");
        }
        self.crossed = crossed;
    }

    /// Best (highest) bid level
    #[inline(always)]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.best_bid
    }

    /// Best (lowest) ask level
    #[inline(always)]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.best_ask
    }

    /// Best level of the given side
    #[inline]
    pub fn best(&self, side: BookSide) -> Option<PriceLevel> {
        match side {
            BookSide::Bid => self.best_bid,
            BookSide::Ask => self.best_ask,
        }
    }

    /// Up to `n` bid levels, price descending
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.bids
            .iter()
            .rev()
            .take(n)
            .map(|(p, s)| PriceLevel::new(*p, *s))
            .collect()
    }

    /// Up to `n` ask levels, price ascending
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.asks
            .iter()
            .take(n)
            .map(|(p, s)| PriceLevel::new(*p, *s))
            .collect()
    }

    /// Displayed size at `(side, price)`, zero when the level does not exist
    pub fn depth_at(&self, side: BookSide, price: Decimal) -> Decimal {
        let levels = match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        };
        levels.get(&price).copied().unwrap_or(Decimal::ZERO)
    }

    /// Number of levels on one side
    pub fn level_count(&self, side: BookSide) -> usize {
        match side {
            BookSide::Bid => self.bids.len(),
            BookSide::Ask => self.asks.len(),
        }
    }

    /// Mid price when both sides exist
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => bid.price.checked_add(ask.price).map(|sum| sum / Decimal::TWO),
            _ => None,
        }
    }

    /// best_ask - best_bid when both sides exist (negative when crossed)
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Price used to value open inventory: mid if two-sided, else last trade
    pub fn mark_price(&self) -> Option<Decimal> {
        self.mid_price()
            .or_else(|| self.last_trade.as_ref().map(|t| t.price))
    }

    /// best_bid ≥ best_ask
    #[inline]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    pub fn last_trade(&self) -> Option<&TradePrint> {
        self.last_trade.as_ref()
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn last_ts(&self) -> u64 {
        self.last_ts
    }

    /// How many times this book transitioned into a crossed state
    pub fn crossed_observations(&self) -> u64 {
        self.crossed_observations
    }
}
