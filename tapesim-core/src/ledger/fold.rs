//! Portfolio fold: ledger entries → `PortfolioSnapshot`
//!
//! ## Position math (weighted-average cost)
//!
//! For a position of signed size `q` and average cost `c`, a fill of signed quantity `d`
//! at price `p`:
//!
//! ```text
//! same direction (or flat):  c' = (|q|·c + |d|·p) / (|q| + |d|)
//! reducing:                  realized += (p − c) · min(|d|, |q|) · sign(q)
//! crossing through zero:     closed part realized, remainder opens at c' = p
//! back to flat:              c' = 0
//! ```
//!
//! Equity is `cash + Σ size × mark`, where an asset that was never marked is valued at its
//! average cost (zero unrealized PnL).

use super::entry::{EntryKind, LedgerEntry};
use crate::core::AssetId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Per-asset view inside a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Signed size (positive = long, negative = short)
    pub size: Decimal,
    pub avg_cost: Decimal,
    pub mark_price: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
}

impl PositionSnapshot {
    /// Apply a signed quantity at `price`
    fn apply(&mut self, delta: Decimal, price: Decimal) {
        if delta.is_zero() {
            return;
        }
        let q = self.size;
        let increasing = q.is_zero() || (q > Decimal::ZERO) == (delta > Decimal::ZERO);

        if increasing {
            let new_abs = q.abs() + delta.abs();
            self.avg_cost = (q.abs() * self.avg_cost + delta.abs() * price) / new_abs;
            self.size = q + delta;
            return;
        }

        let closed = delta.abs().min(q.abs());
        let direction = if q > Decimal::ZERO {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        self.realized_pnl += (price - self.avg_cost) * closed * direction;
        self.size = q + delta;

        if self.size.is_zero() {
            self.avg_cost = Decimal::ZERO;
        } else if (self.size > Decimal::ZERO) != (q > Decimal::ZERO) {
            self.avg_cost = price;
        }
    }

    /// Price used for valuation: last mark, else average cost
    pub fn valuation_price(&self) -> Decimal {
        self.mark_price.unwrap_or(self.avg_cost)
    }

    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }
}

/// Derived portfolio state; never stored, always recomputed from entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub starting_cash: Decimal,
    pub cash: Decimal,
    pub fees_paid: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub equity: Decimal,
    pub positions: BTreeMap<AssetId, PositionSnapshot>,
    pub entry_count: usize,
    /// Cursor of the last entry folded (0 when nothing was folded)
    pub as_of_cursor: u64,
}

impl PortfolioSnapshot {
    pub fn position(&self, asset_id: &str) -> Option<&PositionSnapshot> {
        self.positions.get(asset_id)
    }

    /// Signed inventory for an asset (zero when never traded)
    pub fn inventory(&self, asset_id: &str) -> Decimal {
        self.positions
            .get(asset_id)
            .map(|p| p.size)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl + self.unrealized_pnl
    }
}

/// Strategy for turning a ledger log into a snapshot
///
/// Implementations must be pure: the same entries always yield the same snapshot.
pub trait PortfolioFold: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Fold every entry whose cursor is `<= upto` (all entries when `upto` is `None`)
    fn fold(&self, entries: &[LedgerEntry], upto: Option<u64>) -> PortfolioSnapshot;
}

/// Recompute everything from the first entry on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct FullRecompute;

impl PortfolioFold for FullRecompute {
    fn name(&self) -> &'static str {
        "full_recompute"
    }

    fn fold(&self, entries: &[LedgerEntry], upto: Option<u64>) -> PortfolioSnapshot {
        let mut snap = PortfolioSnapshot::default();

        for entry in entries {
            if matches!(upto, Some(limit) if entry.cursor > limit) {
                continue;
            }
            snap.entry_count += 1;
            snap.as_of_cursor = entry.cursor;

            match &entry.kind {
                EntryKind::Deposit { amount } => {
                    snap.starting_cash += *amount;
                    snap.cash += *amount;
                }
                EntryKind::Fill { fill } => {
                    snap.cash += fill.cash_flow();
                    snap.positions
                        .entry(fill.asset_id.clone())
                        .or_default()
                        .apply(fill.position_change(), fill.price);
                }
                EntryKind::Fee { amount, .. } => {
                    snap.cash -= *amount;
                    snap.fees_paid += *amount;
                }
                EntryKind::Mark { asset_id, price } => {
                    snap.positions.entry(asset_id.clone()).or_default().mark_price = Some(*price);
                }
            }
        }

        let mut equity = snap.cash;
        for position in snap.positions.values_mut() {
            position.unrealized_pnl = if position.is_flat() {
                Decimal::ZERO
            } else {
                (position.valuation_price() - position.avg_cost) * position.size
            };
            snap.realized_pnl += position.realized_pnl;
            snap.unrealized_pnl += position.unrealized_pnl;
            equity += position.size * position.valuation_price();
        }
        snap.equity = equity;
        snap
    }
}
