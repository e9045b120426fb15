//! Tapesim Strategies - market making strategies for tape replay and shadow runs
//!
//! Every strategy implements [`tapesim_core::strategy::Strategy`]: it reads a
//! [`SessionState`](tapesim_core::SessionState) snapshot and answers with order intents.
//! Quotes are always tick-aligned, passive and inside the [0.01, 0.99] outcome range.
//!
//! ## Available Strategies
//!
//! ### [`SimpleSpread`] - Basic Market Making
//!
//! Symmetric quotes a fixed number of ticks around mid, pulled when the market spread
//! is too narrow, with a hard position limit.
//!
//! ### [`InventoryBased`] - Avellaneda-Stoikov style
//!
//! Skews a reservation price by inventory distance from target, leans toward book
//! imbalance, and widens the spread with EWMA volatility of the mid.
//!
//! ## Compile-Time Configuration
//!
//! Defaults are selected with Cargo features; `with_params` overrides them at runtime.
//!
//! ### Spread (SimpleSpread)
//! - `spread-1tick`, `spread-2ticks` (**default**), `spread-5ticks`
//! - `min-spread-1tick` (**default**), `min-spread-2ticks`, `min-spread-3ticks`
//!
//! ### Order Size (SimpleSpread)
//! - `size-small` (5), `size-medium` (10, **default**), `size-large` (50)
//!
//! ### Inventory (InventoryBased)
//! - `target-inventory-0` (**default**), `target-inventory-positive` (50 shares)
//! - `risk-low`, `risk-medium` (**default**), `risk-high`
//! - `depth-1`, `depth-3` (**default**), `depth-5`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tapesim_core::prelude::*;
//! use tapesim_strategies::SimpleSpread;
//!
//! let mut session = Session::load("tape.jsonl", &SimConfig::default())?;
//! let report = StrategyRunner::default().run(&mut session, &mut SimpleSpread::new())?;
//! ```

pub mod inventory_based;
pub mod quoting;
pub mod simple_spread;
pub mod volatility;

pub use inventory_based::{InventoryBased, InventoryParams};
pub use simple_spread::{SimpleSpread, SpreadParams};
pub use volatility::EwmaVolatility;

use tapesim_core::strategy::{Idle, Strategy};

/// Names accepted by [`strategy_from_name`]
pub const STRATEGY_NAMES: &[&str] = &["idle", "simple-spread", "inventory"];

/// Build a strategy with default parameters by name
///
/// Returns `None` for unknown names.
pub fn strategy_from_name(name: &str) -> Option<Box<dyn Strategy>> {
    match name.to_ascii_lowercase().as_str() {
        "idle" => Some(Box::new(Idle)),
        "simple-spread" | "simple_spread" | "spread" => Some(Box::new(SimpleSpread::new())),
        "inventory" | "inventory-based" | "inventory_based" => Some(Box::new(InventoryBased::new())),
        _ => None,
    }
}
