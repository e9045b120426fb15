//! Order State Machine
//!
//! Lifecycle of a simulated order:
//!
//! ```text
//!                    ┌──────────┐
//!        submit ───▶ │   Open   │
//!                    └─────┬────┘
//!          ┌───────────────┼──────────────┐
//!          ▼               ▼              ▼
//!     ┌────────┐  ┌─────────────────┐  ┌───────────┐
//!     │ Filled │  │ PartiallyFilled │  │ Cancelled │
//!     └────────┘  └────────┬────────┘  └───────────┘
//!     (terminal)           │ ▲         (terminal)
//!                          │ └── fill
//!                ┌─────────┴─────────┐
//!                ▼                   ▼
//!           ┌────────┐         ┌───────────┐
//!           │ Filled │         │ Cancelled │
//!           └────────┘         └───────────┘
//! ```
//!
//! Transitions are only reachable through [`Order::apply_fill`] and [`Order::cancel`],
//! which the broker calls from `step()` / `cancel_order()`. Terminal orders reject every
//! further transition without mutating anything.

use super::types::{AssetId, OrderId, OrderStatus, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur when applying a fill
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillError {
    /// Fill quantity is zero or negative
    ZeroQuantity,
    /// Fill price is zero or negative
    ZeroPrice,
    /// Fill quantity exceeds remaining order quantity
    ExceedsRemaining {
        fill_qty: Decimal,
        remaining_qty: Decimal,
        total_qty: Decimal,
    },
    /// Order already reached a terminal state
    Terminal(OrderStatus),
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillError::ZeroQuantity => write!(f, "Fill quantity must be positive"),
            FillError::ZeroPrice => write!(f, "Fill price must be positive"),
            FillError::ExceedsRemaining {
                fill_qty,
                remaining_qty,
                total_qty,
            } => write!(
                f,
                "Fill quantity {} exceeds remaining {} (total order: {})",
                fill_qty, remaining_qty, total_qty
            ),
            FillError::Terminal(status) => write!(f, "Order is already {}", status),
        }
    }
}

impl std::error::Error for FillError {}

/// A simulated limit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub asset_id: AssetId,
    pub side: Side,
    pub limit_price: Decimal,
    pub size: Decimal,
    pub filled_size: Decimal,
    pub status: OrderStatus,
    /// Tape seq of the last applied event when the order was submitted (0 before the first step)
    pub submitted_at_seq: u64,
    /// Session cursor when the order was submitted
    pub submitted_at_cursor: u64,
    /// Volume-weighted average fill price, if anything filled
    pub avg_fill_price: Option<Decimal>,
}

impl Order {
    /// Create a new open order
    pub fn new(
        order_id: OrderId,
        asset_id: AssetId,
        side: Side,
        limit_price: Decimal,
        size: Decimal,
        submitted_at_seq: u64,
        submitted_at_cursor: u64,
    ) -> Self {
        Self {
            order_id,
            asset_id,
            side,
            limit_price,
            size,
            filled_size: Decimal::ZERO,
            status: OrderStatus::Open,
            submitted_at_seq,
            submitted_at_cursor,
            avg_fill_price: None,
        }
    }

    /// Remaining unfilled quantity
    #[inline]
    pub fn remaining_size(&self) -> Decimal {
        self.size - self.filled_size
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether `price` on the contra side satisfies this order's limit
    #[inline]
    pub fn is_marketable_at(&self, price: Decimal) -> bool {
        match self.side {
            Side::Buy => self.limit_price >= price,
            Side::Sell => self.limit_price <= price,
        }
    }

    /// Transition: Open/PartiallyFilled → PartiallyFilled/Filled
    ///
    /// # Validation
    ///
    /// - Fill quantity must be > 0
    /// - Fill price must be > 0
    /// - Fill quantity must not exceed remaining quantity
    /// - Order must not be terminal
    ///
    /// The order is NOT modified on validation failure.
    pub fn apply_fill(&mut self, quantity: Decimal, price: Decimal) -> Result<OrderStatus, FillError> {
        if self.status.is_terminal() {
            return Err(FillError::Terminal(self.status));
        }
        if quantity <= Decimal::ZERO {
            return Err(FillError::ZeroQuantity);
        }
        if price <= Decimal::ZERO {
            return Err(FillError::ZeroPrice);
        }
        let remaining = self.remaining_size();
        if quantity > remaining {
            return Err(FillError::ExceedsRemaining {
                fill_qty: quantity,
                remaining_qty: remaining,
                total_qty: self.size,
            });
        }

        let prior_notional = self.avg_fill_price.unwrap_or(Decimal::ZERO) * self.filled_size;
        self.filled_size += quantity;
        self.avg_fill_price = Some((prior_notional + price * quantity) / self.filled_size);

        self.status = if self.filled_size == self.size {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        Ok(self.status)
    }

    /// Transition: Open/PartiallyFilled → Cancelled
    ///
    /// Returns `false` (and changes nothing) when the order is already terminal.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OrderStatus::Cancelled;
        true
    }
}
