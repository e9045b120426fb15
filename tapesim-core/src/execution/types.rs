use crate::core::{AssetId, FillId, Liquidity, OrderId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A fill (simulated trade execution)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: FillId,
    pub order_id: OrderId,
    pub asset_id: AssetId,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Fee charged on this fill (always ≥ 0)
    pub fee: Decimal,
    pub liquidity: Liquidity,
    /// Seq of the last applied tape event when the fill happened
    pub seq: u64,
    /// Timestamp (ms) of that event
    pub ts: u64,
    /// Session cursor when the fill happened
    pub cursor: u64,
}

impl Fill {
    /// Calculate notional value (price * size)
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }

    /// Get position change (positive for buys, negative for sells)
    pub fn position_change(&self) -> Decimal {
        match self.side {
            Side::Buy => self.size,
            Side::Sell => -self.size,
        }
    }

    /// Get cash flow before fees (negative for buys, positive for sells)
    pub fn cash_flow(&self) -> Decimal {
        match self.side {
            Side::Buy => -self.notional(),
            Side::Sell => self.notional(),
        }
    }

    /// Cash flow after the fee
    pub fn net_cash_flow(&self) -> Decimal {
        self.cash_flow() - self.fee
    }
}

/// Where in the session a broker call happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchContext {
    pub cursor: u64,
    pub seq: u64,
    pub ts: u64,
}
