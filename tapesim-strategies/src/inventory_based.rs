//! Inventory-Based Market Making Strategy
//!
//! Avellaneda-Stoikov flavoured quoting on binary outcome books:
//! - the reservation price is skewed away from the mid in proportion to how far
//!   inventory is from target (long inventory lowers both quotes)
//! - top-of-book imbalance nudges the reservation price toward the heavier side
//! - the half-spread widens with EWMA volatility of the mid once enough samples exist
//!
//! Defaults come from Cargo features; [`InventoryParams`] overrides them at runtime.

use crate::quoting::{make_passive, reconcile, round_down_to_tick, round_up_to_tick, ticks, Quote, TICK_SIZE};
use crate::volatility::EwmaVolatility;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tapesim_core::execution::Fill;
use tapesim_core::orderbook::depth::calculate_imbalance;
use tapesim_core::session::{AssetState, SessionState};
use tapesim_core::strategy::{OrderIntent, Strategy};
use tapesim_core::AssetId;
use tracing::debug;

// ===== CONFIGURATION FROM CARGO FEATURES =====

/// Target inventory (shares)
#[cfg(not(any(feature = "target-inventory-0", feature = "target-inventory-positive")))]
pub const TARGET_INVENTORY: Decimal = dec!(0);

#[cfg(feature = "target-inventory-0")]
pub const TARGET_INVENTORY: Decimal = dec!(0);

#[cfg(feature = "target-inventory-positive")]
pub const TARGET_INVENTORY: Decimal = dec!(50);

/// Risk aversion (higher = stronger skew per share of excess inventory)
#[cfg(not(any(feature = "risk-low", feature = "risk-medium", feature = "risk-high")))]
pub const RISK_AVERSION: Decimal = dec!(1);

#[cfg(feature = "risk-low")]
pub const RISK_AVERSION: Decimal = dec!(0.5);

#[cfg(feature = "risk-medium")]
pub const RISK_AVERSION: Decimal = dec!(1);

#[cfg(feature = "risk-high")]
pub const RISK_AVERSION: Decimal = dec!(2);

/// Book levels per side used for the imbalance signal
#[cfg(not(any(feature = "depth-1", feature = "depth-3", feature = "depth-5")))]
pub const DEPTH_LEVELS: usize = 3;

#[cfg(feature = "depth-1")]
pub const DEPTH_LEVELS: usize = 1;

#[cfg(feature = "depth-3")]
pub const DEPTH_LEVELS: usize = 3;

#[cfg(feature = "depth-5")]
pub const DEPTH_LEVELS: usize = 5;

/// Half-spread before volatility widening (ticks)
pub const BASE_HALF_SPREAD_TICKS: u32 = 2;

/// Extra half-spread per unit of EWMA volatility
pub const VOLATILITY_MULTIPLIER: Decimal = dec!(2);

/// Reservation shift (ticks) at full imbalance
pub const IMBALANCE_WEIGHT: Decimal = dec!(1);

pub const ORDER_SIZE: Decimal = dec!(10);

pub const MAX_POSITION: Decimal = dec!(100);

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryParams {
    pub target_inventory: Decimal,
    pub risk_aversion: Decimal,
    pub depth_levels: usize,
    pub base_half_spread_ticks: u32,
    pub volatility_multiplier: Decimal,
    pub imbalance_weight: Decimal,
    pub order_size: Decimal,
    pub max_position: Decimal,
    /// Assets to quote; empty means every asset in the session
    pub assets: Vec<AssetId>,
}

impl Default for InventoryParams {
    fn default() -> Self {
        Self {
            target_inventory: TARGET_INVENTORY,
            risk_aversion: RISK_AVERSION,
            depth_levels: DEPTH_LEVELS,
            base_half_spread_ticks: BASE_HALF_SPREAD_TICKS,
            volatility_multiplier: VOLATILITY_MULTIPLIER,
            imbalance_weight: IMBALANCE_WEIGHT,
            order_size: ORDER_SIZE,
            max_position: MAX_POSITION,
            assets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InventoryBased {
    params: InventoryParams,
    volatility: BTreeMap<AssetId, EwmaVolatility>,
}

impl InventoryBased {
    pub fn new() -> Self {
        Self::with_params(InventoryParams::default())
    }

    pub fn with_params(params: InventoryParams) -> Self {
        Self {
            params,
            volatility: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &InventoryParams {
        &self.params
    }

    /// Current volatility estimate for an asset, once warmed up
    pub fn volatility(&self, asset_id: &str) -> Option<Decimal> {
        self.volatility
            .get(asset_id)
            .filter(|v| v.is_ready())
            .map(EwmaVolatility::volatility)
    }

    /// Price offset from inventory; positive when long of target
    ///
    /// skew = risk_aversion * (inventory - target) / order_size ticks
    fn inventory_skew(&self, inventory: Decimal) -> Decimal {
        if self.params.order_size <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.params.risk_aversion * (inventory - self.params.target_inventory) / self.params.order_size
            * TICK_SIZE
    }

    fn quote_for(&self, asset: &AssetState, inventory: Decimal, volatility: Option<Decimal>) -> Quote {
        if asset.crossed {
            return Quote::none();
        }
        let (Some(best_bid), Some(best_ask)) = (asset.best_bid, asset.best_ask) else {
            return Quote::none();
        };

        let mid = (best_bid.price + best_ask.price) / dec!(2);
        let imbalance = calculate_imbalance(&asset.bids, &asset.asks, self.params.depth_levels);
        let reservation =
            mid + self.params.imbalance_weight * imbalance * TICK_SIZE - self.inventory_skew(inventory);

        let mut half = ticks(self.params.base_half_spread_ticks);
        if let Some(vol) = volatility {
            half += self.params.volatility_multiplier * vol;
        }

        let (mut bid, mut ask) = make_passive(
            round_down_to_tick(reservation - half),
            round_up_to_tick(reservation + half),
            best_bid.price,
            best_ask.price,
        );
        if inventory >= self.params.max_position {
            bid = None;
        }
        if inventory <= -self.params.max_position {
            ask = None;
        }
        Quote {
            bid,
            ask,
            size: self.params.order_size,
        }
    }

    fn wants(&self, asset_id: &str) -> bool {
        self.params.assets.is_empty() || self.params.assets.iter().any(|a| a == asset_id)
    }
}

impl Strategy for InventoryBased {
    fn on_tick(&mut self, state: &SessionState) -> Vec<OrderIntent> {
        let mut intents = Vec::new();
        for (asset_id, asset) in &state.assets {
            if !self.wants(asset_id) {
                continue;
            }
            if let Some(mid) = asset.mid_price {
                self.volatility.entry(asset_id.clone()).or_default().add_price(mid);
            }
            let quote = self.quote_for(asset, state.portfolio.inventory(asset_id), self.volatility(asset_id));
            intents.extend(reconcile(state, asset_id, &quote));
        }
        intents
    }

    fn on_fill(&mut self, fill: &Fill) {
        debug!(
            order_id = %fill.order_id,
            asset_id = %fill.asset_id,
            side = ?fill.side,
            price = %fill.price,
            size = %fill.size,
            "InventoryBased fill"
        );
    }

    fn name(&self) -> &str {
        "InventoryBased"
    }

    fn reset(&mut self) {
        self.volatility.clear();
    }
}
