//! Portfolio ledger
//!
//! The ledger is an append-only log of [`LedgerEntry`] records. Cash, fees, positions and
//! PnL are never stored: every snapshot is a pure fold over the log (see
//! [`fold::FullRecompute`]), which keeps the ledger auditable and lets a saved
//! `ledger.jsonl` be replayed independently into the same snapshot.

pub mod entry;
pub mod fold;

pub use entry::{EntryKind, LedgerEntry};
pub use fold::{FullRecompute, PortfolioFold, PortfolioSnapshot, PositionSnapshot};

use crate::core::{AssetId, SimError, SimResult};
use crate::execution::Fill;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    fold: Box<dyn PortfolioFold>,
    next_entry_id: u64,
    /// Running signed inventory per asset; only used to decide when marks matter
    inventory: BTreeMap<AssetId, Decimal>,
}

impl Ledger {
    /// New ledger funded with `starting_cash` at cursor 0
    pub fn new(starting_cash: Decimal) -> Self {
        Self::with_fold(starting_cash, Box::new(FullRecompute))
    }

    pub fn with_fold(starting_cash: Decimal, fold: Box<dyn PortfolioFold>) -> Self {
        let mut ledger = Self {
            entries: Vec::new(),
            fold,
            next_entry_id: 0,
            inventory: BTreeMap::new(),
        };
        ledger.push(
            0,
            EntryKind::Deposit {
                amount: starting_cash,
            },
        );
        ledger
    }

    /// Rebuild a ledger from a saved entry log
    ///
    /// The log must open with the funding deposit, entry ids must be strictly increasing
    /// and cursors non-decreasing.
    pub fn replay(entries: Vec<LedgerEntry>) -> SimResult<Self> {
        match entries.first() {
            None => return Err(SimError::Invariant("ledger log is empty".into())),
            Some(first) if !matches!(first.kind, EntryKind::Deposit { .. }) => {
                return Err(SimError::Invariant(format!(
                    "ledger log must start with a deposit, found {} at entry {}",
                    first.kind.name(),
                    first.entry_id
                )));
            }
            Some(_) => {}
        }
        let mut inventory: BTreeMap<AssetId, Decimal> = BTreeMap::new();
        for pair in entries.windows(2) {
            if pair[1].entry_id <= pair[0].entry_id {
                return Err(SimError::Invariant(format!(
                    "ledger entry ids not increasing: {} then {}",
                    pair[0].entry_id, pair[1].entry_id
                )));
            }
            if pair[1].cursor < pair[0].cursor {
                return Err(SimError::Invariant(format!(
                    "ledger cursor went backwards at entry {}",
                    pair[1].entry_id
                )));
            }
        }
        for entry in &entries {
            if let EntryKind::Fill { fill } = &entry.kind {
                *inventory.entry(fill.asset_id.clone()).or_default() += fill.position_change();
            }
        }
        let next_entry_id = entries.last().map_or(0, |e| e.entry_id);
        Ok(Self {
            entries,
            fold: Box::new(FullRecompute),
            next_entry_id,
            inventory,
        })
    }

    fn push(&mut self, cursor: u64, kind: EntryKind) {
        self.next_entry_id += 1;
        self.entries.push(LedgerEntry {
            entry_id: self.next_entry_id,
            cursor,
            kind,
        });
    }

    /// Record a fill (and its fee, when non-zero)
    pub fn record(&mut self, fill: &Fill, cursor: u64) {
        *self.inventory.entry(fill.asset_id.clone()).or_default() += fill.position_change();
        self.push(cursor, EntryKind::Fill { fill: fill.clone() });
        if !fill.fee.is_zero() {
            self.push(
                cursor,
                EntryKind::Fee {
                    fill_id: fill.fill_id,
                    asset_id: fill.asset_id.clone(),
                    amount: fill.fee,
                },
            );
        }
        debug!(
            fill = %fill.fill_id,
            asset = %fill.asset_id,
            cash_flow = %fill.net_cash_flow(),
            "Ledger recorded fill"
        );
    }

    /// Mark an asset to `price`; no cash moves
    pub fn mark(&mut self, asset_id: &str, price: Decimal, cursor: u64) {
        self.push(
            cursor,
            EntryKind::Mark {
                asset_id: asset_id.to_string(),
                price,
            },
        );
    }

    /// Current signed inventory for an asset
    pub fn inventory(&self, asset_id: &str) -> Decimal {
        self.inventory.get(asset_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Fold of the whole log
    pub fn snapshot(&self) -> PortfolioSnapshot {
        self.fold.fold(&self.entries, None)
    }

    /// Fold of every entry recorded at or before `cursor`
    pub fn snapshot_at(&self, cursor: u64) -> PortfolioSnapshot {
        self.fold.fold(&self.entries, Some(cursor))
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fold_name(&self) -> &'static str {
        self.fold.name()
    }
}
