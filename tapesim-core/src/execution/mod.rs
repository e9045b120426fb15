//! Order execution against reconstructed depth
//!
//! - `broker`: the simulated broker (order table, matching, fill log)
//! - `latency`: pluggable first-eligibility models
//! - `fees`: maker/taker fee schedule
//! - `types`: `Fill` and the per-call `MatchContext`

pub mod broker;
pub mod fees;
pub mod latency;
pub mod types;

pub use broker::SimulatedBroker;
pub use fees::{FeeSchedule, BPS_SCALE};
pub use latency::{latency_from_name, EventDelay, LatencyModel, ZeroLatency};
pub use types::{Fill, MatchContext};
