//! Simple Spread Market Making Strategy
//!
//! Quotes a fixed number of ticks either side of the mid on every asset whose market
//! spread is wide enough, keeping quotes passive and within a position limit.
//!
//! Defaults come from Cargo features; [`SpreadParams`] overrides them at runtime (the
//! sweep binary uses that to scan parameter grids).

use crate::quoting::{self, make_passive, reconcile, round_down_to_tick, round_up_to_tick, ticks, Quote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tapesim_core::session::{AssetState, SessionState};
use tapesim_core::strategy::{OrderIntent, Strategy};
use tapesim_core::AssetId;

// ===== CONFIGURATION FROM CARGO FEATURES =====

/// Half-spread in ticks
#[cfg(not(any(
    feature = "spread-1tick",
    feature = "spread-2ticks",
    feature = "spread-5ticks"
)))]
pub const HALF_SPREAD_TICKS: u32 = 2;

#[cfg(feature = "spread-1tick")]
pub const HALF_SPREAD_TICKS: u32 = 1;

#[cfg(feature = "spread-2ticks")]
pub const HALF_SPREAD_TICKS: u32 = 2;

#[cfg(feature = "spread-5ticks")]
pub const HALF_SPREAD_TICKS: u32 = 5;

/// Shares per quote
#[cfg(not(any(feature = "size-small", feature = "size-medium", feature = "size-large")))]
pub const ORDER_SIZE: Decimal = dec!(10);

#[cfg(feature = "size-small")]
pub const ORDER_SIZE: Decimal = dec!(5);

#[cfg(feature = "size-medium")]
pub const ORDER_SIZE: Decimal = dec!(10);

#[cfg(feature = "size-large")]
pub const ORDER_SIZE: Decimal = dec!(50);

/// Minimum market spread to quote into (ticks)
/// If market spread < this, pull quotes
#[cfg(not(any(
    feature = "min-spread-1tick",
    feature = "min-spread-2ticks",
    feature = "min-spread-3ticks"
)))]
pub const MIN_SPREAD_TICKS: u32 = 1;

#[cfg(feature = "min-spread-1tick")]
pub const MIN_SPREAD_TICKS: u32 = 1;

#[cfg(feature = "min-spread-2ticks")]
pub const MIN_SPREAD_TICKS: u32 = 2;

#[cfg(feature = "min-spread-3ticks")]
pub const MIN_SPREAD_TICKS: u32 = 3;

/// Absolute inventory at which the adding side stops quoting
pub const MAX_POSITION: Decimal = dec!(100);

/// Runtime parameters; `Default` uses the feature-selected constants
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadParams {
    pub half_spread_ticks: u32,
    pub order_size: Decimal,
    pub min_spread_ticks: u32,
    pub max_position: Decimal,
    /// Assets to quote; empty means every asset in the session
    pub assets: Vec<AssetId>,
}

impl Default for SpreadParams {
    fn default() -> Self {
        Self {
            half_spread_ticks: HALF_SPREAD_TICKS,
            order_size: ORDER_SIZE,
            min_spread_ticks: MIN_SPREAD_TICKS,
            max_position: MAX_POSITION,
            assets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimpleSpread {
    params: SpreadParams,
    name: String,
}

impl SimpleSpread {
    pub fn new() -> Self {
        Self::with_params(SpreadParams::default())
    }

    pub fn with_params(params: SpreadParams) -> Self {
        let name = format!("SimpleSpread(h={},size={})", params.half_spread_ticks, params.order_size);
        Self { params, name }
    }

    pub fn params(&self) -> &SpreadParams {
        &self.params
    }

    /// Where we want to be on one asset
    fn quote_for(&self, asset: &AssetState, inventory: Decimal) -> Quote {
        if asset.crossed {
            return Quote::none();
        }
        let (Some(best_bid), Some(best_ask)) = (asset.best_bid, asset.best_ask) else {
            return Quote::none();
        };
        if best_ask.price - best_bid.price < ticks(self.params.min_spread_ticks) {
            return Quote::none();
        }

        let mid = (best_bid.price + best_ask.price) / dec!(2);
        let half = ticks(self.params.half_spread_ticks);
        let (mut bid, mut ask) = make_passive(
            round_down_to_tick(mid - half),
            round_up_to_tick(mid + half),
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

impl Strategy for SimpleSpread {
    fn on_tick(&mut self, state: &SessionState) -> Vec<OrderIntent> {
        let mut intents = Vec::new();
        for (asset_id, asset) in &state.assets {
            if !self.wants(asset_id) {
                continue;
            }
            let quote = self.quote_for(asset, state.portfolio.inventory(asset_id));
            intents.extend(reconcile(state, asset_id, &quote));
        }
        intents
    }

    fn name(&self) -> &str {
        if self.name.is_empty() {
            "SimpleSpread"
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapesim_core::PriceLevel;

    fn asset(bid: Decimal, ask: Decimal) -> AssetState {
        AssetState {
            best_bid: Some(PriceLevel::new(bid, dec!(100))),
            best_ask: Some(PriceLevel::new(ask, dec!(100))),
            bids: vec![PriceLevel::new(bid, dec!(100))],
            asks: vec![PriceLevel::new(ask, dec!(100))],
            mid_price: Some((bid + ask) / dec!(2)),
            spread: Some(ask - bid),
            last_trade_price: None,
            crossed: false,
        }
    }

    #[test]
    fn test_quotes_around_mid() {
        let strategy = SimpleSpread::with_params(SpreadParams {
            half_spread_ticks: 2,
            ..Default::default()
        });
        let quote = strategy.quote_for(&asset(dec!(0.40), dec!(0.50)), Decimal::ZERO);
        assert_eq!(quote.bid, Some(dec!(0.43)));
        assert_eq!(quote.ask, Some(dec!(0.47)));
        assert_eq!(quote.size, ORDER_SIZE);
    }

    #[test]
    fn test_quotes_stay_passive_in_tight_market() {
        let strategy = SimpleSpread::with_params(SpreadParams {
            half_spread_ticks: 0,
            min_spread_ticks: 1,
            ..Default::default()
        });
        let quote = strategy.quote_for(&asset(dec!(0.50), dec!(0.51)), Decimal::ZERO);
        // mid 0.505: bid rounds to 0.50, ask to 0.51, both inside the market
        assert_eq!(quote.bid, Some(dec!(0.50)));
        assert_eq!(quote.ask, Some(dec!(0.51)));
    }

    #[test]
    fn test_narrow_or_crossed_market_pulls_quotes() {
        let strategy = SimpleSpread::with_params(SpreadParams {
            min_spread_ticks: 3,
            ..Default::default()
        });
        assert_eq!(strategy.quote_for(&asset(dec!(0.50), dec!(0.52)), Decimal::ZERO), Quote::none());

        let mut crossed = asset(dec!(0.40), dec!(0.50));
        crossed.crossed = true;
        assert_eq!(strategy.quote_for(&crossed, Decimal::ZERO), Quote::none());
    }

    #[test]
    fn test_position_limit_drops_adding_side() {
        let strategy = SimpleSpread::new();
        let long = strategy.quote_for(&asset(dec!(0.40), dec!(0.50)), MAX_POSITION);
        assert!(long.bid.is_none());
        assert!(long.ask.is_some());
        let short = strategy.quote_for(&asset(dec!(0.40), dec!(0.50)), -MAX_POSITION);
        assert!(short.bid.is_some());
        assert!(short.ask.is_none());
    }

    #[test]
    fn test_const_values() {
        assert!(HALF_SPREAD_TICKS > 0 && HALF_SPREAD_TICKS < 50);
        assert!(ORDER_SIZE > Decimal::ZERO);
        assert!(quoting::TICK_SIZE > Decimal::ZERO);
    }
}
