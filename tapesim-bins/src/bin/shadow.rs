//! Shadow-trade a live feed of tape lines read from stdin
//!
//! The run ends when stdin closes, the feed stalls, or on Ctrl+C; artifacts are
//! written to the configured directory on every exit path.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tapesim_bins::common::{print_portfolio, select_strategy, setup, CommonArgs};
use tapesim_core::prelude::*;
use tapesim_core::shadow::{ndjson_feed_blocking, ShadowRunner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a strategy against a live feed on stdin")]
struct Cli {
    /// Assets to pre-create books for
    #[arg(short, long, value_delimiter = ',')]
    assets: Vec<AssetId>,

    /// Strategy: idle, simple-spread or inventory
    #[arg(short, long, default_value = "idle")]
    strategy: String,

    /// Stall timeout override (ms)
    #[arg(long)]
    stall_timeout_ms: Option<u64>,

    /// Artifact directory override
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = setup(&cli.common)?;

    let mut shadow = config.shadow.clone();
    if let Some(ms) = cli.stall_timeout_ms {
        shadow.stall_timeout_ms = ms;
    }
    if cli.out.is_some() {
        shadow.artifact_dir = cli.out.clone();
    }

    tracing::info!("=== Tapesim: Shadow ===");

    let registry = SessionRegistry::new(config.sim.clone());
    let session = Session::live("stdin", &cli.assets, &config.sim)?;
    let id = registry.insert(session);
    let handle = registry.get(&id)?;

    // Stdin is read on its own thread so a stall or kill can end the run while the pipe is still open
    let feed = ndjson_feed_blocking(std::io::BufReader::new(std::io::stdin()), shadow.feed_capacity);
    let runner = ShadowRunner::new(handle, shadow).with_strategy(select_strategy(&cli.strategy)?);

    let kill_switch = runner.kill_switch();
    ctrlc::set_handler(move || kill_switch.trigger("Ctrl+C"))?;

    let outcome = runner.run(feed).await?;
    tracing::info!("Shadow run done: {:?} after {} events", outcome.reason, outcome.events);

    let state = registry.with_session(&id, |s| s.get_state())?;
    print_portfolio(&state.portfolio);
    println!("{}", state.to_json()?);
    Ok(())
}
