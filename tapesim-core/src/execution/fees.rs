//! Fee schedule
//!
//! Fees are expressed in basis points of notional, with separate maker and taker rates:
//!
//! ```text
//! fee = price × size × bps / 10_000
//! ```
//!
//! Fills at submission time take liquidity (taker rate); fills of resting orders during a
//! step are charged the maker rate. Fractional bps are allowed.

use crate::core::Liquidity;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Basis point scale (1 bps = 0.01%)
pub const BPS_SCALE: Decimal = dec!(10000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Fee rate for resting (passive) fills
    pub maker_fee_bps: Decimal,
    /// Fee rate for fills that take liquidity
    pub taker_fee_bps: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::zero()
    }
}

impl FeeSchedule {
    pub fn new(maker_fee_bps: Decimal, taker_fee_bps: Decimal) -> Self {
        Self {
            maker_fee_bps,
            taker_fee_bps,
        }
    }

    /// No fees on either side
    pub const fn zero() -> Self {
        Self {
            maker_fee_bps: Decimal::ZERO,
            taker_fee_bps: Decimal::ZERO,
        }
    }

    #[inline]
    pub fn rate_bps(&self, liquidity: Liquidity) -> Decimal {
        match liquidity {
            Liquidity::Maker => self.maker_fee_bps,
            Liquidity::Taker => self.taker_fee_bps,
        }
    }

    /// Fee owed on a fill of `size` at `price`
    #[inline]
    pub fn fee(&self, liquidity: Liquidity, price: Decimal, size: Decimal) -> Decimal {
        price * size * self.rate_bps(liquidity) / BPS_SCALE
    }

    /// Negative rates (rebates) are not modeled
    pub fn validate(&self) -> Result<(), String> {
        if self.maker_fee_bps < Decimal::ZERO {
            return Err(format!("maker_fee_bps must be >= 0, got {}", self.maker_fee_bps));
        }
        if self.taker_fee_bps < Decimal::ZERO {
            return Err(format!("taker_fee_bps must be >= 0, got {}", self.taker_fee_bps));
        }
        Ok(())
    }
}
