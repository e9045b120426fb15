//! Common utilities for all binaries
//!
//! Shared initialization, CLI parsing, and setup code.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;
use tapesim_core::config::Config;
use tapesim_core::strategy::{RunReport, Strategy};
use tapesim_core::utils::init_logger;
use tapesim_core::PortfolioSnapshot;
use tapesim_strategies::{strategy_from_name, STRATEGY_NAMES};

/// Common CLI arguments for all binaries
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// JSON config file (defaults plus env overrides when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

/// Load the config named on the command line and apply CLI overrides
pub fn load_config(args: &CommonArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("Loading config {}", path.display()))?,
        None => Config::from_env()?,
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }
    config.validate()?;
    Ok(config)
}

/// Load config and initialize tracing in one go
pub fn setup(args: &CommonArgs) -> Result<Config> {
    let config = load_config(args)?;
    init_logger(&config.logging)?;
    Ok(config)
}

/// Resolve a strategy name given on the command line
pub fn select_strategy(name: &str) -> Result<Box<dyn Strategy>> {
    strategy_from_name(name).ok_or_else(|| anyhow!("unknown strategy {:?}, expected one of {:?}", name, STRATEGY_NAMES))
}

/// Print final statistics
pub fn print_portfolio(portfolio: &PortfolioSnapshot) {
    tracing::info!("=== Final Portfolio ===");
    tracing::info!("Cash: {}", portfolio.cash);
    tracing::info!("Fees paid: {}", portfolio.fees_paid);
    tracing::info!("Realized PnL: {}", portfolio.realized_pnl);
    tracing::info!("Unrealized PnL: {}", portfolio.unrealized_pnl);
    tracing::info!("Equity: {}", portfolio.equity);
    for (asset_id, position) in &portfolio.positions {
        tracing::info!("Position {}: {:?}", asset_id, position);
    }
}

pub fn print_report(report: &RunReport) {
    tracing::info!("=== {} ===", report.strategy);
    tracing::info!("Steps: {} (ticks {})", report.steps, report.ticks);
    tracing::info!(
        "Intents: {} submitted, {} cancelled, {} rejected",
        report.intents.submitted,
        report.intents.cancelled,
        report.intents.rejected
    );
    tracing::info!("Fills: {}", report.final_state.fill_count);
    print_portfolio(&report.final_state.portfolio);
}
