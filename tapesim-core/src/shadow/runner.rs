//! Shadow runner
//!
//! ```text
//!            ┌──────────── tokio::select! ────────────┐
//!  feed ────▶│ recv()        → push_event → strategy  │
//!  switch ──▶│ cancelled()   → finish(CANCELLED)      │
//!  timer ───▶│ sleep_until() → finish(STALLED)        │
//!            └─────────────────────────────────────────┘
//!                     closed feed → finish(FEED_CLOSED)
//! ```
//!
//! The session lives behind a registry handle, so callers can query it while the run is
//! in progress. The lock is never held across an await point.

use crate::config::ShadowConfig;
use crate::core::SimResult;
use crate::resilience::{KillSwitch, StallDetector};
use crate::session::{DoneReason, RunManifest, SessionHandle};
use crate::strategy::{Strategy, StrategyRunner};
use crate::tape::Event;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// How a live run ended
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowOutcome {
    pub reason: DoneReason,
    /// Live events applied
    pub events: u64,
    /// Present when artifacts were configured and saved
    pub manifest: Option<RunManifest>,
}

pub struct ShadowRunner {
    session: SessionHandle,
    config: ShadowConfig,
    kill_switch: KillSwitch,
    strategy: Option<Box<dyn Strategy>>,
}

impl ShadowRunner {
    pub fn new(session: SessionHandle, config: ShadowConfig) -> Self {
        Self {
            session,
            config,
            kill_switch: KillSwitch::new(),
            strategy: None,
        }
    }

    /// Consult `strategy` after every live event
    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Share an existing kill switch (e.g. one wired to Ctrl-C)
    pub fn with_kill_switch(mut self, kill_switch: KillSwitch) -> Self {
        self.kill_switch = kill_switch;
        self
    }

    pub fn kill_switch(&self) -> KillSwitch {
        self.kill_switch.clone()
    }

    pub fn session(&self) -> SessionHandle {
        SessionHandle::clone(&self.session)
    }

    /// Consume the feed until cancellation, closure or a stall
    ///
    /// The session is DONE when this returns `Ok`. An error from the session itself aborts
    /// the run; artifacts are still attempted.
    pub async fn run(self, mut feed: mpsc::Receiver<Event>) -> SimResult<ShadowOutcome> {
        let ShadowRunner {
            session,
            config,
            kill_switch,
            mut strategy,
        } = self;

        let mut stall = StallDetector::new(Duration::from_millis(config.stall_timeout_ms));
        let runner = StrategyRunner::default();
        let mut events = 0u64;
        info!(
            session = %session.lock().id(),
            stall_timeout_ms = config.stall_timeout_ms,
            strategy = strategy.as_ref().map(|s| s.name().to_string()).unwrap_or_default(),
            "Shadow run starting"
        );

        let result: SimResult<DoneReason> = loop {
            tokio::select! {
                biased;
                _ = kill_switch.cancelled() => {
                    info!(reason = kill_switch.reason().unwrap_or_default(), "Shadow run cancelled");
                    break Ok(DoneReason::Cancelled);
                }
                maybe_event = feed.recv() => match maybe_event {
                    Some(event) => {
                        stall.record_event();
                        if let Err(err) = apply_event(&session, strategy.as_mut(), &runner, event) {
                            break Err(err);
                        }
                        events += 1;
                    }
                    None => {
                        info!(events, "Feed closed");
                        break Ok(DoneReason::FeedClosed);
                    }
                },
                _ = tokio::time::sleep_until(stall.deadline()) => {
                    warn!(
                        events,
                        idle_ms = stall.time_since_event().as_millis() as u64,
                        "Feed stalled, terminating session"
                    );
                    break Ok(DoneReason::Stalled);
                }
            }
        };

        let mut guard = session.lock();
        if let Ok(reason) = &result {
            guard.finish(*reason);
        }
        let manifest = match &config.artifact_dir {
            Some(dir) => match guard.save_artifacts(dir) {
                Ok(manifest) => Some(manifest),
                Err(err) => {
                    error!(dir = %dir.display(), error = %err, "Failed to save shadow artifacts");
                    None
                }
            },
            None => None,
        };

        let reason = result?;
        let outcome = ShadowOutcome {
            reason: guard.done_reason().unwrap_or(reason),
            events,
            manifest,
        };
        info!(
            session = %guard.id(),
            reason = %outcome.reason,
            events,
            cursor = guard.cursor(),
            "Shadow run finished"
        );
        Ok(outcome)
    }
}

/// Apply one live event and let the strategy react
fn apply_event(
    session: &SessionHandle,
    strategy: Option<&mut Box<dyn Strategy>>,
    runner: &StrategyRunner,
    event: Event,
) -> SimResult<()> {
    let mut session = session.lock();
    let report = session.push_event(event)?;
    if let Some(strategy) = strategy {
        for fill in &report.fills {
            strategy.on_fill(fill);
        }
        runner.tick(&mut session, strategy)?;
    }
    Ok(())
}
