use crate::execution::FeeSchedule;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sim: SimConfig,
    pub shadow: ShadowConfig,
    pub logging: LoggingConfig,
}

/// Simulation parameters shared by replay, sweep and shadow sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cash deposited into the ledger at cursor 0
    pub starting_cash: Decimal,

    /// Maker / taker fee rates in bps
    pub fees: FeeSchedule,

    /// Latency model name: "zero" or "events:N"
    pub latency: String,

    /// Levels per side included in `get_state()`
    pub depth_levels: usize,

    /// Record mark entries for assets with open inventory
    pub record_marks: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            starting_cash: dec!(1000),
            fees: FeeSchedule::default(),
            latency: default_latency(),
            depth_levels: 10,
            record_marks: true,
        }
    }
}

/// Live (shadow) runner parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Force-terminate when no event arrives for this long
    pub stall_timeout_ms: u64,

    /// Where artifacts are written on termination (none = don't save)
    pub artifact_dir: Option<PathBuf>,

    /// Bounded feed channel capacity
    pub feed_capacity: usize,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            stall_timeout_ms: 30_000,
            artifact_dir: None,
            feed_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON-formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_latency() -> String {
    "zero".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
