//! Shared quoting helpers: tick rounding and quote reconciliation
//!
//! Strategies decide *where* they want to be; [`reconcile`] turns that into the minimal
//! set of intents (cancel stale quotes, submit missing ones) given the open orders the
//! session reports.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tapesim_core::session::SessionState;
use tapesim_core::strategy::OrderIntent;
use tapesim_core::Side;

/// Price grid of binary outcome markets
pub const TICK_SIZE: Decimal = dec!(0.01);
/// Lowest quotable price
pub const MIN_PRICE: Decimal = dec!(0.01);
/// Highest quotable price
pub const MAX_PRICE: Decimal = dec!(0.99);

/// Desired two-sided quote for one asset; `None` means "no order on that side"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub size: Decimal,
}

impl Quote {
    pub fn none() -> Self {
        Self {
            bid: None,
            ask: None,
            size: Decimal::ZERO,
        }
    }
}

#[inline]
pub fn ticks(n: u32) -> Decimal {
    TICK_SIZE * Decimal::from(n)
}

#[inline]
pub fn round_down_to_tick(price: Decimal) -> Decimal {
    (price / TICK_SIZE).floor() * TICK_SIZE
}

#[inline]
pub fn round_up_to_tick(price: Decimal) -> Decimal {
    (price / TICK_SIZE).ceil() * TICK_SIZE
}

/// Clamp our bid/ask so neither crosses the market, then drop sides outside the price range
///
/// Keeps quotes passive: the bid stays at least one tick under the best ask and the ask
/// one tick over the best bid.
pub fn make_passive(bid: Decimal, ask: Decimal, best_bid: Decimal, best_ask: Decimal) -> (Option<Decimal>, Option<Decimal>) {
    let bid = bid.min(best_ask - TICK_SIZE);
    let ask = ask.max(best_bid + TICK_SIZE);
    let bid = (bid >= MIN_PRICE && bid <= MAX_PRICE).then_some(bid);
    let ask = (ask >= MIN_PRICE && ask <= MAX_PRICE).then_some(ask);
    (bid, ask)
}

/// Intents that move the asset's open orders to `quote`
///
/// An open order is kept only if it sits exactly at the wanted price of its side and is
/// the first such order; everything else is cancelled.
pub fn reconcile(state: &SessionState, asset_id: &str, quote: &Quote) -> Vec<OrderIntent> {
    let mut intents = Vec::new();
    let mut have_bid = false;
    let mut have_ask = false;

    for order in state.open_orders_for(asset_id) {
        let (wanted, have) = match order.side {
            Side::Buy => (quote.bid, &mut have_bid),
            Side::Sell => (quote.ask, &mut have_ask),
        };
        if !*have && wanted == Some(order.limit_price) {
            *have = true;
        } else {
            intents.push(OrderIntent::cancel(order.order_id));
        }
    }

    if quote.size > Decimal::ZERO {
        if let (false, Some(price)) = (have_bid, quote.bid) {
            intents.push(OrderIntent::buy(asset_id, price, quote.size));
        }
        if let (false, Some(price)) = (have_ask, quote.ask) {
            intents.push(OrderIntent::sell(asset_id, price, quote.size));
        }
    }
    intents
}
