//! Failure containment for live runs
//!
//! - `KillSwitch`: explicit, cloneable cancellation
//! - `StallDetector`: feed freshness and the next stall deadline

pub mod kill_switch;
pub mod stall;

pub use kill_switch::{KillSwitch, KillSwitchState};
pub use stall::{FeedState, StallDetector};
