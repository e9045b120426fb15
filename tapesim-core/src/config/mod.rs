pub mod types;

pub use types::*;

use crate::core::SimError;
use crate::execution::latency_from_name;
use anyhow::{Context, Result};
use ::config::{Config as ConfigLoader, Environment, File, FileFormat, FileSourceFile};
use rust_decimal::Decimal;
use std::path::Path;

/// Prefix of environment overrides, e.g. `TAPESIM_LOGGING__LEVEL=debug` or
/// `TAPESIM_SHADOW__STALL_TIMEOUT_MS=5000`
pub const ENV_PREFIX: &str = "TAPESIM";

/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn env_source() -> Environment {
    // Single underscore after the prefix; otherwise it defaults to the key separator
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

impl Config {
    /// Load configuration from a JSON file with environment variable overrides
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        Self::build(Some(File::from(config_path).format(FileFormat::Json)), env_source())
            .with_context(|| format!("Failed to load config file {}", config_path.display()))
    }

    /// Defaults plus environment overrides, for runs without a config file
    pub fn from_env() -> Result<Self> {
        Self::build(None, env_source()).context("Failed to load config from environment")
    }

    fn build(file: Option<File<FileSourceFile, FileFormat>>, env: Environment) -> Result<Self> {
        let mut builder = ConfigLoader::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        let cfg: Config = builder.add_source(env).build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.sim.validate()?;

        if self.shadow.stall_timeout_ms == 0 {
            anyhow::bail!("shadow.stall_timeout_ms must be > 0");
        }
        if self.shadow.feed_capacity == 0 {
            anyhow::bail!("shadow.feed_capacity must be > 0");
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "logging.level must be one of {:?}, got {:?}",
                LOG_LEVELS,
                self.logging.level
            );
        }
        Ok(())
    }
}

impl SimConfig {
    pub fn validate(&self) -> std::result::Result<(), SimError> {
        if self.starting_cash < Decimal::ZERO {
            return Err(SimError::Config(format!(
                "sim.starting_cash must be >= 0, got {}",
                self.starting_cash
            )));
        }
        self.fees.validate().map_err(SimError::Config)?;
        latency_from_name(&self.latency)?;
        if self.depth_levels == 0 {
            return Err(SimError::Config("sim.depth_levels must be > 0".into()));
        }
        Ok(())
    }
}

/// Parse a config from a JSON string (used by tests and embedded configs)
pub fn parse_config(json: &str) -> Result<Config> {
    let cfg: Config = ConfigLoader::builder()
        .add_source(File::from_str(json, FileFormat::Json))
        .build()
        .context("invalid config JSON")?
        .try_deserialize()
        .context("invalid config JSON")?;
    cfg.validate()?;
    Ok(cfg)
}
