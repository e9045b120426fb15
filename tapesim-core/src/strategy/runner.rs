//! Offline strategy runner
//!
//! ```text
//! loop until DONE:
//!     session.step(step_size)  ──▶ fills ──▶ strategy.on_fill
//!     strategy.on_tick(state)  ──▶ intents ──▶ session.submit_order / cancel_order
//! ```
//!
//! Rejected intents (invalid order, unknown order id) are logged and counted; the run
//! continues. Any other error aborts the run.

use super::{OrderIntent, Strategy};
use crate::core::SimResult;
use crate::execution::Fill;
use crate::session::{Session, SessionState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Counters from applying one batch of intents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentOutcome {
    pub submitted: u64,
    pub cancelled: u64,
    pub rejected: u64,
    pub fills: u64,
}

impl IntentOutcome {
    fn merge(&mut self, other: IntentOutcome) {
        self.submitted += other.submitted;
        self.cancelled += other.cancelled;
        self.rejected += other.rejected;
        self.fills += other.fills;
    }
}

/// Result of a complete strategy run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub strategy: String,
    pub steps: u64,
    pub ticks: u64,
    pub intents: IntentOutcome,
    /// Fills from resting orders during steps
    pub step_fills: u64,
    pub final_state: SessionState,
}

#[derive(Debug, Clone, Copy)]
pub struct StrategyRunner {
    step_size: u64,
}

impl Default for StrategyRunner {
    fn default() -> Self {
        Self { step_size: 1 }
    }
}

impl StrategyRunner {
    /// Consult the strategy every `step_size` events (minimum 1)
    pub fn new(step_size: u64) -> Self {
        Self {
            step_size: step_size.max(1),
        }
    }

    pub fn step_size(&self) -> u64 {
        self.step_size
    }

    /// Drive `session` to DONE with `strategy`
    pub fn run<S: Strategy + ?Sized>(&self, session: &mut Session, strategy: &mut S) -> SimResult<RunReport> {
        info!(
            session = %session.id(),
            strategy = strategy.name(),
            events = session.total_events(),
            step_size = self.step_size,
            "Strategy run starting"
        );

        let mut report = RunReport {
            strategy: strategy.name().to_string(),
            steps: 0,
            ticks: 0,
            intents: IntentOutcome::default(),
            step_fills: 0,
            final_state: session.get_state(),
        };

        while !session.is_done() {
            let step = session.step(self.step_size)?;
            report.steps += 1;
            report.step_fills += step.fills.len() as u64;
            notify_fills(strategy, &step.fills);

            if step.advanced == 0 {
                break;
            }
            let outcome = self.tick(session, strategy)?;
            report.ticks += 1;
            report.intents.merge(outcome);
        }

        report.final_state = session.get_state();
        info!(
            session = %session.id(),
            strategy = %report.strategy,
            steps = report.steps,
            submitted = report.intents.submitted,
            rejected = report.intents.rejected,
            fills = report.step_fills + report.intents.fills,
            equity = %report.final_state.portfolio.equity,
            "Strategy run finished"
        );
        Ok(report)
    }

    /// Consult the strategy once at the session's current cursor and apply its intents
    pub fn tick<S: Strategy + ?Sized>(&self, session: &mut Session, strategy: &mut S) -> SimResult<IntentOutcome> {
        let state = session.get_state();
        let intents = strategy.on_tick(&state);
        apply_intents(session, strategy, intents)
    }
}

/// Apply intents in order at the current cursor
pub fn apply_intents<S: Strategy + ?Sized>(
    session: &mut Session,
    strategy: &mut S,
    intents: Vec<OrderIntent>,
) -> SimResult<IntentOutcome> {
    let mut outcome = IntentOutcome::default();
    for intent in intents {
        match intent {
            OrderIntent::Submit {
                asset_id,
                side,
                limit_price,
                size,
            } => match session.submit_order(&asset_id, side, limit_price, size) {
                Ok(ack) => {
                    outcome.submitted += 1;
                    outcome.fills += ack.fills.len() as u64;
                    notify_fills(strategy, &ack.fills);
                }
                Err(err) if err.is_recoverable() => {
                    outcome.rejected += 1;
                    warn!(strategy = strategy.name(), asset = %asset_id, error = %err, "Intent rejected");
                }
                Err(err) => return Err(err),
            },
            OrderIntent::Cancel { order_id } => match session.cancel_order(order_id) {
                Ok(changed) => {
                    if changed {
                        outcome.cancelled += 1;
                    } else {
                        debug!(order = %order_id, "Cancel of terminal order ignored");
                    }
                }
                Err(err) if err.is_recoverable() => {
                    outcome.rejected += 1;
                    warn!(strategy = strategy.name(), order = %order_id, error = %err, "Cancel rejected");
                }
                Err(err) => return Err(err),
            },
        }
    }
    Ok(outcome)
}

fn notify_fills<S: Strategy + ?Sized>(strategy: &mut S, fills: &[Fill]) {
    for fill in fills {
        strategy.on_fill(fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::core::BookSide;
    use crate::strategy::Idle;
    use crate::tape::{Event, EventKind, LevelUpdate, Tape};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tape() -> Tape {
        let events = (1..=6)
            .map(|seq| Event {
                seq,
                ts_recv: seq,
                asset_id: Some("A".into()),
                kind: EventKind::PriceChange(LevelUpdate {
                    asset_id: "A".into(),
                    side: if seq % 2 == 0 { BookSide::Ask } else { BookSide::Bid },
                    price: if seq % 2 == 0 { dec!(0.55) } else { dec!(0.45) },
                    size: Decimal::from(seq * 10),
                }),
            })
            .collect();
        Tape::from_events("mem", events)
    }

    /// Buys once at the ask, then sends garbage
    struct BuyOnce {
        done: bool,
        fills_seen: usize,
    }

    impl Strategy for BuyOnce {
        fn on_tick(&mut self, state: &SessionState) -> Vec<OrderIntent> {
            let Some(ask) = state.asset("A").and_then(|a| a.best_ask) else {
                return Vec::new();
            };
            if self.done {
                return vec![OrderIntent::buy("A", dec!(2), dec!(1))];
            }
            self.done = true;
            vec![
                OrderIntent::buy("A", ask.price, dec!(5)),
                OrderIntent::cancel(crate::core::OrderId::new(999)),
            ]
        }

        fn on_fill(&mut self, _fill: &crate::execution::Fill) {
            self.fills_seen += 1;
        }

        fn name(&self) -> &str {
            "BuyOnce"
        }
    }

    #[test]
    fn test_idle_runs_to_done() {
        let mut session = Session::from_tape(tape(), &SimConfig::default()).unwrap();
        let report = StrategyRunner::new(2).run(&mut session, &mut Idle).unwrap();
        assert!(report.final_state.done);
        assert_eq!(report.steps, 3);
        assert_eq!(report.intents, IntentOutcome::default());
    }

    #[test]
    fn test_rejections_do_not_abort() {
        let mut session = Session::from_tape(tape(), &SimConfig::default()).unwrap();
        let mut strategy = BuyOnce {
            done: false,
            fills_seen: 0,
        };
        let report = StrategyRunner::default().run(&mut session, &mut strategy).unwrap();
        assert!(report.final_state.done);
        assert_eq!(report.intents.submitted, 1);
        assert_eq!(report.intents.fills, 1);
        assert!(report.intents.rejected >= 2);
        assert_eq!(strategy.fills_seen, 1);
        assert_eq!(report.final_state.portfolio.inventory("A"), dec!(5));
        assert_eq!(report.final_state.fill_count, 1);
    }
}
