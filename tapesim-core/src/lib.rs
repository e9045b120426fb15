//! TapeSim Core - Deterministic Replay Simulator for Binary Prediction Markets
//!
//! Replays recorded L2 market-data tapes event by event, lets a user or strategy submit
//! simulated limit orders against the reconstructed books, and keeps an append-only
//! ledger from which the portfolio is always recomputed.
//!
//! ## Architecture
//! - **Deterministic**: same tape + same actions ⇒ byte-identical state and artifacts
//! - **Exact decimals**: prices, sizes and cash are `rust_decimal::Decimal`, never floats
//! - **No look-ahead**: orders only ever match against events at or before the cursor
//! - **Single-writer sessions**: the registry serializes calls per session
//!
//! ## Core Modules
//! - `core`: identifiers, sides, order state machine, errors
//! - `tape`: NDJSON tape reader and typed events
//! - `orderbook`: per-asset L2 books and depth analytics
//! - `execution`: simulated broker, fees, latency models
//! - `ledger`: append-only entries and the portfolio fold
//! - `session`: controller, state, artifacts, registry
//! - `strategy`: strategy trait, batch runner and parallel sweeps
//! - `shadow`: live feed runner with stall detection
//! - `resilience`: kill switch and stall detector
//! - `config`: serde config with env overrides

pub mod config;
pub mod core;
pub mod execution;
pub mod ledger;
pub mod orderbook;
pub mod resilience;
pub mod session;
pub mod shadow;
pub mod strategy;
pub mod tape;
pub mod utils;

// Re-export core types
pub use core::{
    AssetId, BookSide, FillId, Liquidity, Order, OrderId, OrderStatus, PriceLevel, SessionId, Side,
    SimError, SimResult,
};

pub use config::{Config, LoggingConfig, ShadowConfig, SimConfig};
pub use execution::{FeeSchedule, Fill, SimulatedBroker};
pub use ledger::{Ledger, LedgerEntry, PortfolioSnapshot, PositionSnapshot};
pub use orderbook::{BookSet, L2Book};
pub use session::{
    DoneReason, OrderAck, RunManifest, Session, SessionHandle, SessionMode, SessionRegistry,
    SessionState, SessionStatus, StepReport,
};
pub use strategy::{OrderIntent, Strategy, StrategyRunner, SweepJob, SweepRunner};
pub use tape::{Event, EventKind, Tape};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::core::{AssetId, OrderId, OrderStatus, Side, SimError, SimResult};
    pub use crate::session::{DoneReason, Session, SessionRegistry, SessionState};
    pub use crate::strategy::{OrderIntent, Strategy, StrategyRunner};
    pub use crate::tape::{Event, Tape};
    pub use crate::config::SimConfig;
}
