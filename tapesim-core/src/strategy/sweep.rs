//! Parallel parameter sweeps
//!
//! Each job owns its tape, config and strategy, so jobs share nothing and run on a
//! bounded pool of scoped worker threads. Jobs are handed out through a bounded
//! crossbeam channel; results come back on an unbounded one and are returned in
//! submission order regardless of completion order.

use super::runner::{RunReport, StrategyRunner};
use super::Strategy;
use crate::config::SimConfig;
use crate::core::{SimError, SimResult};
use crate::session::Session;
use crossbeam::channel;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use tracing::{error, info, warn};

/// One independent (tape, config, strategy) run
pub struct SweepJob {
    pub label: String,
    pub tape_path: PathBuf,
    pub config: SimConfig,
    pub strategy: Box<dyn Strategy>,
    /// Save the run's artifacts here when set
    pub artifact_dir: Option<PathBuf>,
}

impl std::fmt::Debug for SweepJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepJob")
            .field("label", &self.label)
            .field("tape_path", &self.tape_path)
            .field("strategy", &self.strategy.name())
            .field("artifact_dir", &self.artifact_dir)
            .finish()
    }
}

#[derive(Debug)]
pub struct SweepOutcome {
    /// Position of the job in the submitted list
    pub index: usize,
    pub label: String,
    pub result: SimResult<RunReport>,
}

#[derive(Debug, Clone, Copy)]
pub struct SweepRunner {
    workers: usize,
    runner: StrategyRunner,
}

impl SweepRunner {
    pub fn new(workers: usize, step_size: u64) -> Self {
        Self {
            workers: workers.max(1),
            runner: StrategyRunner::new(step_size),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job; one outcome per job, in submission order
    pub fn run(&self, jobs: Vec<SweepJob>) -> Vec<SweepOutcome> {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.clamp(1, total);
        info!(jobs = total, workers, "Sweep starting");

        let (job_tx, job_rx) = channel::bounded::<(usize, SweepJob)>(workers);
        let (result_tx, result_rx) = channel::unbounded::<SweepOutcome>();
        let labels: Vec<String> = jobs.iter().map(|j| j.label.clone()).collect();

        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let runner = self.runner;
                scope.spawn(move || {
                    for (index, job) in job_rx.iter() {
                        let label = job.label.clone();
                        // A panicking strategy fails its own job, not the sweep
                        let result = panic::catch_unwind(AssertUnwindSafe(|| run_job(&runner, job)))
                            .unwrap_or_else(|payload| Err(panicked(&*payload)));
                        if let Err(err) = &result {
                            warn!(worker, job = %label, error = %err, "Sweep job failed");
                        }
                        if result_tx.send(SweepOutcome { index, label, result }).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            for (index, job) in jobs.into_iter().enumerate() {
                if job_tx.send((index, job)).is_err() {
                    error!(index, "Sweep workers exited early");
                    break;
                }
            }
            drop(job_tx);
        });

        let mut slots: Vec<Option<SweepOutcome>> = (0..total).map(|_| None).collect();
        for outcome in result_rx.try_iter() {
            let index = outcome.index;
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(outcome);
            }
        }

        let outcomes: Vec<SweepOutcome> = slots
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(index, (slot, label))| {
                slot.unwrap_or_else(|| SweepOutcome {
                    index,
                    label,
                    result: Err(SimError::Invariant("sweep job produced no result".into())),
                })
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(jobs = total, failed, "Sweep finished");
        outcomes
    }
}

fn panicked(payload: &(dyn Any + Send)) -> SimError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    SimError::Invariant(format!("sweep job panicked: {}", message))
}

fn run_job(runner: &StrategyRunner, job: SweepJob) -> SimResult<RunReport> {
    let SweepJob {
        label,
        tape_path,
        config,
        mut strategy,
        artifact_dir,
    } = job;

    strategy.reset();
    let mut session = Session::load(&tape_path, &config)?;
    let report = runner.run(&mut session, &mut strategy)?;
    if let Some(dir) = artifact_dir {
        session.save_artifacts(&dir)?;
        info!(job = %label, dir = %dir.display(), "Sweep job artifacts saved");
    }
    Ok(report)
}
