//! Simulated broker
//!
//! Matches the session's limit orders against reconstructed L2 depth.
//!
//! ## Matching rules
//!
//! - One level per evaluation: an order only ever touches the best opposite level, and
//!   fills at that level's price (`BUY` marketable when `limit ≥ best_ask`, `SELL` when
//!   `limit ≤ best_bid`)
//! - Priority within an asset: buys by limit desc then order id asc, sells by limit asc
//!   then order id asc
//! - Liquidity taken from a displayed level is remembered per `(asset, side, price)` and
//!   subtracted from that level until the tape updates it again, so the same displayed
//!   size can't be filled twice
//! - A crossed book is never matched against
//! - Fills at submission are TAKER, fills of resting orders during `step` are MAKER
//!
//! ```text
//! submit_order ──▶ validate ──▶ latency eligible? ──▶ try_match (TAKER)
//!                                                        │
//! tape event ──▶ on_event (release memory) ──▶ step ──▶ try_match (MAKER) per order
//! ```

use super::fees::FeeSchedule;
use super::latency::{LatencyModel, ZeroLatency};
use super::types::{Fill, MatchContext};
use crate::core::{
    AssetId, BookSide, FillId, Liquidity, Order, OrderId, SimError, SimResult, Side,
};
use crate::orderbook::L2Book;
use crate::tape::{Event, EventKind};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

type LevelKey = (AssetId, BookSide, Decimal);

#[derive(Debug)]
pub struct SimulatedBroker {
    fees: FeeSchedule,
    latency: Box<dyn LatencyModel>,
    orders: BTreeMap<OrderId, Order>,
    /// Orders still OPEN / PARTIALLY_FILLED
    active: BTreeSet<OrderId>,
    fills: Vec<Fill>,
    /// Size already taken from a displayed level since the tape last updated it
    consumed: BTreeMap<LevelKey, Decimal>,
    next_order_id: u64,
    next_fill_id: u64,
}

impl Default for SimulatedBroker {
    fn default() -> Self {
        Self::new(FeeSchedule::default(), Box::new(ZeroLatency))
    }
}

impl SimulatedBroker {
    pub fn new(fees: FeeSchedule, latency: Box<dyn LatencyModel>) -> Self {
        Self {
            fees,
            latency,
            orders: BTreeMap::new(),
            active: BTreeSet::new(),
            fills: Vec::new(),
            consumed: BTreeMap::new(),
            next_order_id: 0,
            next_fill_id: 0,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub fn latency_name(&self) -> String {
        self.latency.name()
    }

    /// Validate, register and (if eligible) immediately match a new limit order
    ///
    /// `book` is the current book for `asset_id`; `None` means the session has never seen
    /// the asset, which rejects the order.
    pub fn submit_order(
        &mut self,
        asset_id: &str,
        side: Side,
        limit_price: Decimal,
        size: Decimal,
        book: Option<&L2Book>,
        ctx: MatchContext,
    ) -> SimResult<(OrderId, Vec<Fill>)> {
        if limit_price <= Decimal::ZERO || limit_price > Decimal::ONE {
            return Err(SimError::InvalidOrder(format!(
                "limit_price must be in (0, 1], got {}",
                limit_price
            )));
        }
        if size <= Decimal::ZERO {
            return Err(SimError::InvalidOrder(format!("size must be > 0, got {}", size)));
        }
        let book = book.ok_or_else(|| {
            SimError::InvalidOrder(format!("unknown asset_id {:?}", asset_id))
        })?;

        self.next_order_id += 1;
        let order_id = OrderId::new(self.next_order_id);
        let order = Order::new(
            order_id,
            asset_id.to_string(),
            side,
            limit_price,
            size,
            ctx.seq,
            ctx.cursor,
        );
        self.orders.insert(order_id, order);
        self.active.insert(order_id);

        debug!(
            order = %order_id,
            asset = asset_id,
            %side,
            %limit_price,
            %size,
            cursor = ctx.cursor,
            "Order submitted"
        );

        let fills = self
            .try_match(order_id, book, ctx, Liquidity::Taker)?
            .into_iter()
            .collect();
        Ok((order_id, fills))
    }

    /// Release consumed-liquidity memory for every level this event rewrites
    pub fn on_event(&mut self, event: &Event) {
        if self.consumed.is_empty() {
            return;
        }
        match &event.kind {
            EventKind::PriceChange(update) => {
                self.consumed
                    .remove(&(update.asset_id.clone(), update.side, update.price));
            }
            EventKind::PriceChanges(updates) => {
                for update in updates {
                    self.consumed
                        .remove(&(update.asset_id.clone(), update.side, update.price));
                }
            }
            EventKind::Book { asset_id, .. } => {
                self.consumed.retain(|(asset, _, _), _| asset != asset_id);
            }
            EventKind::LastTradePrice { .. } => {}
        }
    }

    /// Re-evaluate every active order of `asset_id` against `book` in priority order
    pub fn step(&mut self, asset_id: &str, book: &L2Book, ctx: MatchContext) -> SimResult<Vec<Fill>> {
        if book.is_crossed() {
            return Ok(Vec::new());
        }

        let mut buys: Vec<(Reverse<Decimal>, OrderId)> = Vec::new();
        let mut sells: Vec<(Decimal, OrderId)> = Vec::new();
        for order_id in &self.active {
            let Some(order) = self.orders.get(order_id) else {
                continue;
            };
            if order.asset_id != asset_id {
                continue;
            }
            match order.side {
                Side::Buy => buys.push((Reverse(order.limit_price), *order_id)),
                Side::Sell => sells.push((order.limit_price, *order_id)),
            }
        }
        if buys.is_empty() && sells.is_empty() {
            return Ok(Vec::new());
        }
        buys.sort();
        sells.sort();

        let mut fills = Vec::new();
        let queue = buys
            .into_iter()
            .map(|(_, id)| id)
            .chain(sells.into_iter().map(|(_, id)| id));
        for order_id in queue {
            if let Some(fill) = self.try_match(order_id, book, ctx, Liquidity::Maker)? {
                fills.push(fill);
            }
        }
        Ok(fills)
    }

    /// Assets with at least one OPEN / PARTIALLY_FILLED order, sorted
    pub fn active_assets(&self) -> BTreeSet<AssetId> {
        self.active
            .iter()
            .filter_map(|id| self.orders.get(id))
            .map(|order| order.asset_id.clone())
            .collect()
    }

    /// Cancel an order
    ///
    /// Returns `Ok(true)` if the order transitioned to CANCELLED, `Ok(false)` if it was
    /// already terminal (nothing changes).
    pub fn cancel_order(&mut self, order_id: OrderId) -> SimResult<bool> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| SimError::OrderNotFound(order_id.to_string()))?;
        let cancelled = order.cancel();
        if cancelled {
            self.active.remove(&order_id);
            debug!(order = %order_id, released = %order.remaining_size(), "Order cancelled");
        }
        Ok(cancelled)
    }

    /// One matching attempt for one order against the best opposite level
    fn try_match(
        &mut self,
        order_id: OrderId,
        book: &L2Book,
        ctx: MatchContext,
        liquidity: Liquidity,
    ) -> SimResult<Option<Fill>> {
        if book.is_crossed() {
            return Ok(None);
        }
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| SimError::Invariant(format!("active order {} missing", order_id)))?;
        if !order.is_active() || !self.latency.is_eligible(order, ctx.cursor) {
            return Ok(None);
        }

        let contra = order.side.contra_side();
        let Some(level) = book.best(contra) else {
            return Ok(None);
        };
        if !order.is_marketable_at(level.price) {
            return Ok(None);
        }

        let key = (order.asset_id.clone(), contra, level.price);
        let taken = self.consumed.get(&key).copied().unwrap_or(Decimal::ZERO);
        let available = level.size - taken;
        if available <= Decimal::ZERO {
            return Ok(None);
        }

        let quantity = order.remaining_size().min(available);
        let status = order
            .apply_fill(quantity, level.price)
            .map_err(|e| SimError::Invariant(format!("fill for {} rejected: {}", order_id, e)))?;
        if status.is_terminal() {
            self.active.remove(&order_id);
        }
        *self.consumed.entry(key).or_insert(Decimal::ZERO) += quantity;

        self.next_fill_id += 1;
        let fill = Fill {
            fill_id: FillId(self.next_fill_id),
            order_id,
            asset_id: order.asset_id.clone(),
            side: order.side,
            price: level.price,
            size: quantity,
            fee: self.fees.fee(liquidity, level.price, quantity),
            liquidity,
            seq: ctx.seq,
            ts: ctx.ts,
            cursor: ctx.cursor,
        };
        debug!(
            fill = %fill.fill_id,
            order = %order_id,
            price = %fill.price,
            size = %fill.size,
            ?liquidity,
            %status,
            "Order filled"
        );
        self.fills.push(fill.clone());
        Ok(Some(fill))
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Every order ever submitted, in submission order
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// OPEN / PARTIALLY_FILLED orders, in submission order
    pub fn open_orders(&self) -> Vec<&Order> {
        self.active
            .iter()
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    /// Fill log, in fill order
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}
