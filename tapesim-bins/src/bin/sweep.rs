//! Run every (tape, strategy) pair on a worker pool
//!
//! Prints one JSON line per job on stdout, in submission order.

use anyhow::{bail, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tapesim_bins::common::{select_strategy, setup, CommonArgs};
use tapesim_core::strategy::{SweepJob, SweepRunner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay many tapes and strategies in parallel")]
struct Cli {
    /// Tape files (JSON lines)
    #[arg(required = true)]
    tapes: Vec<PathBuf>,

    /// Strategies to run on every tape (comma separated)
    #[arg(short, long, value_delimiter = ',', default_value = "idle")]
    strategies: Vec<String>,

    /// Worker threads (defaults to available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Events applied between strategy ticks
    #[arg(long, default_value_t = 1)]
    step_size: u64,

    /// Root directory for per-job artifacts
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = setup(&cli.common)?;

    let mut jobs = Vec::with_capacity(cli.tapes.len() * cli.strategies.len());
    for tape in &cli.tapes {
        for name in &cli.strategies {
            let strategy = select_strategy(name)?;
            let index = jobs.len();
            let label = format!("{}:{}", tape.display(), name);
            jobs.push(SweepJob {
                label,
                tape_path: tape.clone(),
                config: config.sim.clone(),
                strategy,
                artifact_dir: cli.out.as_ref().map(|root| root.join(format!("job-{:04}", index))),
            });
        }
    }

    let workers = cli
        .workers
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    tracing::info!("=== Tapesim: Sweep ({} jobs, {} workers) ===", jobs.len(), workers);

    let outcomes = SweepRunner::new(workers, cli.step_size).run(jobs);
    let mut failed = 0usize;
    for outcome in &outcomes {
        let line = match &outcome.result {
            Ok(report) => json!({
                "index": outcome.index,
                "label": outcome.label,
                "strategy": report.strategy,
                "fills": report.final_state.fill_count,
                "intents": report.intents,
                "portfolio": report.final_state.portfolio,
            }),
            Err(err) => {
                failed += 1;
                tracing::error!("Job {} failed: {}", outcome.label, err);
                json!({
                    "index": outcome.index,
                    "label": outcome.label,
                    "error": err.to_string(),
                })
            }
        };
        println!("{}", line);
    }

    if failed > 0 {
        bail!("{} of {} jobs failed", failed, outcomes.len());
    }
    Ok(())
}
