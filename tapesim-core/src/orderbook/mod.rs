//! Per-asset L2 order books
//!
//! - `l2_book`: the level store with cached best bid/ask
//! - `depth`: VWAP / imbalance / liquidity analytics over sorted levels
//!
//! `BookSet` dispatches tape events to the right book(s). Every asset on the tape gets its
//! book before the first event is applied.

pub mod depth;
pub mod l2_book;

pub use l2_book::L2Book;

use crate::core::AssetId;
use crate::tape::{Event, EventKind};
use std::collections::BTreeMap;

/// One L2 book per asset, ordered by asset id
#[derive(Debug, Clone, Default)]
pub struct BookSet {
    books: BTreeMap<AssetId, L2Book>,
}

impl BookSet {
    pub fn new<'a>(asset_ids: impl IntoIterator<Item = &'a AssetId>) -> Self {
        let mut set = Self::default();
        for asset_id in asset_ids {
            set.ensure(asset_id);
        }
        set
    }

    /// Get or create the book for `asset_id`
    pub fn ensure(&mut self, asset_id: &AssetId) -> &mut L2Book {
        self.books
            .entry(asset_id.clone())
            .or_insert_with(|| L2Book::new(asset_id.clone()))
    }

    pub fn get(&self, asset_id: &str) -> Option<&L2Book> {
        self.books.get(asset_id)
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.books.contains_key(asset_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &L2Book)> {
        self.books.iter()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Apply one event to every book it touches
    ///
    /// Returns the touched asset ids (deduplicated, first-touch order). A batch spanning
    /// several assets is fully applied to each book before this returns.
    pub fn apply(&mut self, event: &Event) -> Vec<AssetId> {
        let mut touched: Vec<AssetId> = Vec::new();
        for asset_id in event.asset_ids() {
            if !touched.contains(asset_id) {
                touched.push(asset_id.clone());
            }
        }

        match &event.kind {
            EventKind::PriceChange(update) => {
                self.ensure(&update.asset_id).apply_update(update);
            }
            EventKind::PriceChanges(updates) => {
                for asset_id in &touched {
                    self.ensure(asset_id).apply_updates(updates);
                }
            }
            EventKind::LastTradePrice { asset_id, print } => {
                self.ensure(asset_id).record_trade(print);
            }
            EventKind::Book { asset_id, snapshot } => {
                self.ensure(asset_id).apply_snapshot(snapshot);
            }
        }

        for asset_id in &touched {
            self.ensure(asset_id).touch(event.seq, event.ts_recv);
        }
        touched
    }

    /// Total crossed-state transitions across every book
    pub fn crossed_observations(&self) -> u64 {
        self.books.values().map(|b| b.crossed_observations()).sum()
    }
}
