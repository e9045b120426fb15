/// Orderbook depth analysis over sorted price levels
///
/// Every function takes a best-first slice (bids descending, asks ascending), as returned by
/// `L2Book::top_bids` / `L2Book::top_asks`, and uses exact decimal arithmetic.

use crate::core::PriceLevel;
use rust_decimal::Decimal;

/// Volume-Weighted Average Price across the first `max_levels` levels
///
/// # Returns
/// * `Some(vwap)` - Weighted average price
/// * `None` - If there is no liquidity in range
///
/// # Example
/// ```ignore
/// let bid_vwap = calculate_vwap(&book.top_bids(5), 5);
/// ```
#[inline]
pub fn calculate_vwap(levels: &[PriceLevel], max_levels: usize) -> Option<Decimal> {
    let mut total_value = Decimal::ZERO;
    let mut total_size = Decimal::ZERO;

    for level in levels.iter().take(max_levels) {
        if level.size.is_zero() {
            break;
        }
        total_value += level.price * level.size;
        total_size += level.size;
    }

    if total_size.is_zero() {
        return None;
    }
    Some(total_value / total_size)
}

/// Orderbook imbalance ratio
///
/// # Formula
/// ```text
/// imbalance = (bid_size - ask_size) / (bid_size + ask_size)
/// ```
///
/// Range -1 to +1:
/// - Negative: more resting size on the ask side (sell pressure)
/// - Positive: more resting size on the bid side (buy pressure)
/// - 0: balanced, or both sides empty
#[inline]
pub fn calculate_imbalance(bids: &[PriceLevel], asks: &[PriceLevel], max_levels: usize) -> Decimal {
    let bid_size = calculate_liquidity(bids, max_levels);
    let ask_size = calculate_liquidity(asks, max_levels);
    let total = bid_size + ask_size;

    if total.is_zero() {
        return Decimal::ZERO;
    }
    (bid_size - ask_size) / total
}

/// Total size across the first `max_levels` levels
#[inline]
pub fn calculate_liquidity(levels: &[PriceLevel], max_levels: usize) -> Decimal {
    levels.iter().take(max_levels).map(|l| l.size).sum()
}

/// Spread in basis points relative to the bid
///
/// Returns `None` for a missing side or a crossed/locked book.
#[inline]
pub fn spread_bps(best_bid: Decimal, best_ask: Decimal) -> Option<Decimal> {
    if best_bid <= Decimal::ZERO || best_ask <= best_bid {
        return None;
    }
    Some((best_ask - best_bid) / best_bid * Decimal::from(10_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn levels(raw: &[(Decimal, Decimal)]) -> Vec<PriceLevel> {
        raw.iter().map(|(p, s)| PriceLevel::new(*p, *s)).collect()
    }

    #[test]
    fn test_vwap_two_levels() {
        let asks = levels(&[(dec!(0.50), dec!(10)), (dec!(0.60), dec!(30))]);
        // (5 + 18) / 40
        assert_eq!(calculate_vwap(&asks, 2), Some(dec!(0.575)));
        assert_eq!(calculate_vwap(&asks, 1), Some(dec!(0.50)));
    }

    #[test]
    fn test_vwap_empty_side() {
        assert_eq!(calculate_vwap(&[], 5), None);
    }

    #[test]
    fn test_imbalance_sign() {
        let bids = levels(&[(dec!(0.49), dec!(30))]);
        let asks = levels(&[(dec!(0.51), dec!(10))]);
        assert_eq!(calculate_imbalance(&bids, &asks, 5), dec!(0.5));
        assert_eq!(calculate_imbalance(&asks, &bids, 5), dec!(-0.5));
        assert_eq!(calculate_imbalance(&[], &[], 5), Decimal::ZERO);
    }

    #[test]
    fn test_liquidity_respects_max_levels() {
        let bids = levels(&[(dec!(0.5), dec!(1)), (dec!(0.4), dec!(2)), (dec!(0.3), dec!(4))]);
        assert_eq!(calculate_liquidity(&bids, 2), dec!(3));
        assert_eq!(calculate_liquidity(&bids, 10), dec!(7));
    }

    #[test]
    fn test_spread_bps() {
        assert_eq!(spread_bps(dec!(0.50), dec!(0.51)), Some(dec!(200)));
        assert_eq!(spread_bps(dec!(0.51), dec!(0.51)), None);
        assert_eq!(spread_bps(dec!(0), dec!(0.51)), None);
    }
}
