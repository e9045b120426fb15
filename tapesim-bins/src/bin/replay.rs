//! Replay one tape against one strategy
//!
//! Prints the final session state as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tapesim_bins::common::{print_report, select_strategy, setup, CommonArgs};
use tapesim_core::strategy::StrategyRunner;
use tapesim_core::Session;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a recorded tape through a strategy")]
struct Cli {
    /// Tape file (JSON lines)
    tape: PathBuf,

    /// Strategy: idle, simple-spread or inventory
    #[arg(short, long, default_value = "idle")]
    strategy: String,

    /// Events applied between strategy ticks
    #[arg(long, default_value_t = 1)]
    step_size: u64,

    /// Directory for run artifacts
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = setup(&cli.common)?;

    tracing::info!("=== Tapesim: Replay ===");
    tracing::info!("Tape: {}", cli.tape.display());

    let mut strategy = select_strategy(&cli.strategy)?;
    let mut session = Session::load(&cli.tape, &config.sim)
        .with_context(|| format!("Loading tape {}", cli.tape.display()))?;

    let report = StrategyRunner::new(cli.step_size).run(&mut session, &mut strategy)?;
    print_report(&report);

    if let Some(dir) = &cli.out {
        let manifest = session
            .save_artifacts(dir)
            .with_context(|| format!("Saving artifacts to {}", dir.display()))?;
        tracing::info!("Artifacts written to {} ({} files)", dir.display(), manifest.files.len());
    }

    println!("{}", report.final_state.to_json()?);
    Ok(())
}
