//! Strategy abstraction and batch runners
//!
//! A strategy looks at a [`SessionState`] and answers with order intents. It never touches
//! the session directly: the runner applies intents at the session's current cursor, so a
//! strategy cannot see or act on events past that cursor.
//!
//! - `runner`: drive one session with one strategy
//! - `sweep`: run many independent (tape, config, strategy) jobs on a bounded worker pool

pub mod runner;
pub mod sweep;

pub use runner::{IntentOutcome, RunReport, StrategyRunner};
pub use sweep::{SweepJob, SweepOutcome, SweepRunner};

use crate::core::{AssetId, OrderId, Side};
use crate::execution::Fill;
use crate::session::SessionState;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a strategy wants done at the current cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum OrderIntent {
    Submit {
        asset_id: AssetId,
        side: Side,
        limit_price: Decimal,
        size: Decimal,
    },
    Cancel {
        order_id: OrderId,
    },
}

impl OrderIntent {
    pub fn buy(asset_id: impl Into<AssetId>, limit_price: Decimal, size: Decimal) -> Self {
        OrderIntent::Submit {
            asset_id: asset_id.into(),
            side: Side::Buy,
            limit_price,
            size,
        }
    }

    pub fn sell(asset_id: impl Into<AssetId>, limit_price: Decimal, size: Decimal) -> Self {
        OrderIntent::Submit {
            asset_id: asset_id.into(),
            side: Side::Sell,
            limit_price,
            size,
        }
    }

    pub fn cancel(order_id: OrderId) -> Self {
        OrderIntent::Cancel { order_id }
    }
}

/// Strategy trait - all trading strategies must implement this
pub trait Strategy: Send {
    /// Called after every runner step with the session's current state
    fn on_tick(&mut self, state: &SessionState) -> Vec<OrderIntent>;

    /// Called for every fill of this strategy's orders
    fn on_fill(&mut self, _fill: &Fill) {}

    /// Get strategy name
    fn name(&self) -> &str;

    /// Forget all internal state (before reuse on another tape)
    fn reset(&mut self) {}
}

/// Strategy that never trades; useful as a baseline
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Strategy for Idle {
    fn on_tick(&mut self, _state: &SessionState) -> Vec<OrderIntent> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "Idle"
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn on_tick(&mut self, state: &SessionState) -> Vec<OrderIntent> {
        (**self).on_tick(state)
    }

    fn on_fill(&mut self, fill: &Fill) {
        (**self).on_fill(fill)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
