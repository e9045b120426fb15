//! Core types for the simulation engine
//!
//! - `types`: identifiers and enums (OrderId, Side, BookSide, OrderStatus)
//! - `errors`: the `SimError` taxonomy
//! - `order_fsm`: the order lifecycle state machine

pub mod errors;
pub mod order_fsm;
pub mod types;

// Re-export commonly used types
pub use errors::{SimError, SimResult};
pub use order_fsm::{FillError, Order};
pub use types::{
    AssetId, BookSide, FillId, Liquidity, OrderId, OrderStatus, PriceLevel, SessionId, Side,
};
