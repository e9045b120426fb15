//! EWMA volatility of mid-price changes
//!
//! Outcome prices live on a fixed [0, 1] scale, so volatility is tracked as the EWMA of
//! absolute mid changes (price units), not of relative returns.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Observations needed before the estimate is used
pub const MIN_SAMPLES: usize = 5;

/// Decimal places kept in the running estimate
const PRECISION: u32 = 8;

#[derive(Debug, Clone)]
pub struct EwmaVolatility {
    ewma: Decimal,
    /// Smoothing factor in [0, 1]
    alpha: Decimal,
    last_price: Option<Decimal>,
    count: usize,
}

impl EwmaVolatility {
    /// `alpha` is clamped into [0, 1] (e.g. 0.2)
    pub fn new(alpha: Decimal) -> Self {
        Self {
            ewma: Decimal::ZERO,
            alpha: alpha.max(Decimal::ZERO).min(Decimal::ONE),
            last_price: None,
            count: 0,
        }
    }

    #[inline]
    pub fn add_price(&mut self, price: Decimal) {
        if let Some(last) = self.last_price {
            let change = (price - last).abs();
            // ewma = alpha * change + (1 - alpha) * ewma
            self.ewma = (self.alpha * change + (Decimal::ONE - self.alpha) * self.ewma).round_dp(PRECISION);
        }
        self.last_price = Some(price);
        self.count += 1;
    }

    #[inline]
    pub fn volatility(&self) -> Decimal {
        self.ewma
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.count >= MIN_SAMPLES
    }

    pub fn reset(&mut self) {
        self.ewma = Decimal::ZERO;
        self.last_price = None;
        self.count = 0;
    }
}

impl Default for EwmaVolatility {
    fn default() -> Self {
        Self::new(dec!(0.2))
    }
}
