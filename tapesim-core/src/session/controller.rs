//! Session controller
//!
//! Drives one simulation: tape → L2 books → broker → ledger, one event at a time.
//!
//! ```text
//!            ┌─────────────────────── step(n) ───────────────────────┐
//!            ▼                                                       │
//!  event[cursor] ──▶ BookSet::apply ──▶ Broker::on_event ──▶ Broker::step(asset)
//!                                                                  │ fills
//!                                                                  ▼
//!                                     Ledger::record ──▶ Ledger::mark (open inventory)
//! ```
//!
//! Every public mutating call is single-writer (the registry wraps sessions in a mutex)
//! and is recorded in the user action log with the cursor at which it happened.

use super::actions::{Action, EquityPoint, UserAction};
use super::artifacts::{self, RunManifest};
use super::state::{AssetState, DoneReason, SessionMode, SessionState, SessionStatus};
use crate::config::SimConfig;
use crate::core::{AssetId, OrderId, OrderStatus, SessionId, SimError, SimResult, Side};
use crate::execution::{latency_from_name, Fill, MatchContext, SimulatedBroker};
use crate::ledger::{Ledger, PortfolioSnapshot};
use crate::orderbook::BookSet;
use crate::tape::{Event, Tape};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of a submission
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Fills produced at submission (TAKER)
    pub fills: Vec<Fill>,
}

/// Result of a `step` / `push_event` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Events actually applied
    pub advanced: u64,
    pub cursor: u64,
    pub done: bool,
    pub fills: Vec<Fill>,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    source: String,
    mode: SessionMode,
    config: SimConfig,
    events: Vec<Event>,
    cursor: usize,
    books: BookSet,
    broker: SimulatedBroker,
    ledger: Ledger,
    actions: Vec<UserAction>,
    equity_curve: Vec<EquityPoint>,
    last_marks: BTreeMap<AssetId, Decimal>,
    done_reason: Option<DoneReason>,
}

impl Session {
    /// Replay session over a loaded tape
    pub fn from_tape(tape: Tape, config: &SimConfig) -> SimResult<Self> {
        let (source, events, asset_ids) = tape.into_parts();
        let books = BookSet::new(&asset_ids);
        let mut session = Self::build(source, SessionMode::Replay, events, books, config)?;
        if session.events.is_empty() {
            session.done_reason = Some(DoneReason::TapeExhausted);
        }
        info!(
            session = %session.id,
            tape = %session.source,
            events = session.events.len(),
            assets = session.books.len(),
            "Session created"
        );
        Ok(session)
    }

    /// Load a tape file and create a replay session over it
    pub fn load(tape_path: impl AsRef<Path>, config: &SimConfig) -> SimResult<Self> {
        Self::from_tape(Tape::load(tape_path)?, config)
    }

    /// Live session fed through `push_event`
    ///
    /// `asset_ids` pre-creates books; assets first seen on the feed get a book on arrival.
    pub fn live<'a>(
        label: impl Into<String>,
        asset_ids: impl IntoIterator<Item = &'a AssetId>,
        config: &SimConfig,
    ) -> SimResult<Self> {
        let books = BookSet::new(asset_ids);
        let session = Self::build(label.into(), SessionMode::Live, Vec::new(), books, config)?;
        info!(session = %session.id, source = %session.source, "Live session created");
        Ok(session)
    }

    fn build(
        source: String,
        mode: SessionMode,
        events: Vec<Event>,
        books: BookSet,
        config: &SimConfig,
    ) -> SimResult<Self> {
        config.validate()?;
        let latency = latency_from_name(&config.latency)?;
        Ok(Self {
            id: SessionId::generate(),
            source,
            mode,
            config: config.clone(),
            events,
            cursor: 0,
            books,
            broker: SimulatedBroker::new(config.fees, latency),
            ledger: Ledger::new(config.starting_cash),
            actions: Vec::new(),
            equity_curve: Vec::new(),
            last_marks: BTreeMap::new(),
            done_reason: None,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Tape path (replay) or feed label (live)
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn cursor(&self) -> u64 {
        self.cursor as u64
    }

    pub fn total_events(&self) -> u64 {
        self.events.len() as u64
    }

    pub fn is_done(&self) -> bool {
        self.done_reason.is_some()
    }

    pub fn done_reason(&self) -> Option<DoneReason> {
        self.done_reason
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_done() {
            SessionStatus::Done
        } else if self.cursor == 0 {
            SessionStatus::NotStarted
        } else {
            SessionStatus::Active
        }
    }

    fn context(&self) -> MatchContext {
        let last = self.cursor.checked_sub(1).and_then(|i| self.events.get(i));
        MatchContext {
            cursor: self.cursor as u64,
            seq: last.map(|e| e.seq).unwrap_or(0),
            ts: last.map(|e| e.ts_recv).unwrap_or(0),
        }
    }

    /// Advance by up to `n` events (clamped to the end of the tape)
    ///
    /// `step(0)` and any step once DONE are no-ops.
    pub fn step(&mut self, n: u64) -> SimResult<StepReport> {
        let start = self.cursor();
        let mut report = StepReport {
            cursor: start,
            ..Default::default()
        };

        if self.mode == SessionMode::Replay && !self.is_done() {
            let remaining = self.events.len() - self.cursor;
            let take = usize::try_from(n).unwrap_or(usize::MAX).min(remaining);
            for _ in 0..take {
                let fills = self.apply_next()?;
                report.fills.extend(fills);
            }
            if self.cursor == self.events.len() {
                self.done_reason = Some(DoneReason::TapeExhausted);
                info!(session = %self.id, cursor = self.cursor, "Tape exhausted");
            }
        }

        report.advanced = self.cursor() - start;
        report.cursor = self.cursor();
        report.done = self.is_done();
        if report.advanced > 0 {
            self.push_equity_point();
        }
        self.record_action(
            start,
            Action::Step {
                requested: n,
                advanced: report.advanced,
            },
            None,
        );
        Ok(report)
    }

    /// Append a live event and apply it immediately
    pub fn push_event(&mut self, event: Event) -> SimResult<StepReport> {
        if self.mode != SessionMode::Live {
            return Err(SimError::Invariant(
                "push_event is only valid on live sessions".into(),
            ));
        }
        if self.is_done() {
            return Err(SimError::Invariant(format!(
                "session {} already finished",
                self.id
            )));
        }
        if let Some(last) = self.events.last() {
            if event.seq < last.seq {
                warn!(
                    session = %self.id,
                    seq = event.seq,
                    last_seq = last.seq,
                    "Live event seq went backwards"
                );
            }
        }

        let start = self.cursor();
        self.events.push(event);
        let fills = self.apply_next()?;
        self.push_equity_point();
        Ok(StepReport {
            advanced: self.cursor() - start,
            cursor: self.cursor(),
            done: false,
            fills,
        })
    }

    /// Apply `events[cursor]` and advance the cursor by one
    fn apply_next(&mut self) -> SimResult<Vec<Fill>> {
        let event = self
            .events
            .get(self.cursor)
            .ok_or_else(|| SimError::Invariant("cursor past end of events".into()))?;
        self.cursor += 1;
        let ctx = MatchContext {
            cursor: self.cursor as u64,
            seq: event.seq,
            ts: event.ts_recv,
        };

        #[cfg(feature = "debug-logging")]
        tracing::trace!(
            session = %self.id,
            cursor = ctx.cursor,
            seq = event.seq,
            kind = event.kind.name(),
            "Applying event"
        );

        let touched = self.books.apply(event);
        self.broker.on_event(event);

        // Every asset with working orders, not only the ones this event touched:
        // delayed orders become eligible on events for other assets too
        let mut fills = Vec::new();
        for asset_id in &self.broker.active_assets() {
            if let Some(book) = self.books.get(asset_id) {
                fills.extend(self.broker.step(asset_id, book, ctx)?);
            }
        }
        for fill in &fills {
            self.ledger.record(fill, ctx.cursor);
        }
        for asset_id in &touched {
            self.refresh_mark(asset_id, ctx.cursor);
        }
        Ok(fills)
    }

    /// Record a mark when the asset carries inventory and its mark price moved
    fn refresh_mark(&mut self, asset_id: &AssetId, cursor: u64) {
        if !self.config.record_marks || self.ledger.inventory(asset_id).is_zero() {
            return;
        }
        let Some(price) = self.books.get(asset_id).and_then(|b| b.mark_price()) else {
            return;
        };
        if self.last_marks.get(asset_id) == Some(&price) {
            return;
        }
        self.ledger.mark(asset_id, price, cursor);
        self.last_marks.insert(asset_id.clone(), price);
    }

    /// Submit a limit order at the current cursor
    pub fn submit_order(
        &mut self,
        asset_id: &str,
        side: Side,
        limit_price: Decimal,
        size: Decimal,
    ) -> SimResult<OrderAck> {
        let ctx = self.context();
        let result = self.broker.submit_order(
            asset_id,
            side,
            limit_price,
            size,
            self.books.get(asset_id),
            ctx,
        );

        match result {
            Ok((order_id, fills)) => {
                for fill in &fills {
                    self.ledger.record(fill, ctx.cursor);
                }
                if !fills.is_empty() {
                    self.refresh_mark(&asset_id.to_string(), ctx.cursor);
                    self.push_equity_point();
                }
                let status = self
                    .broker
                    .order(order_id)
                    .map(|o| o.status)
                    .ok_or_else(|| SimError::Invariant(format!("order {} vanished", order_id)))?;
                let filled: Decimal = fills.iter().map(|f| f.size).sum();
                self.record_action(
                    ctx.cursor,
                    Action::SubmitOrder {
                        asset_id: asset_id.to_string(),
                        side,
                        limit_price,
                        size,
                        order_id: Some(order_id),
                        filled,
                    },
                    None,
                );
                Ok(OrderAck {
                    order_id,
                    status,
                    fills,
                })
            }
            Err(err) => {
                debug!(session = %self.id, error = %err, "Order rejected");
                self.record_action(
                    ctx.cursor,
                    Action::SubmitOrder {
                        asset_id: asset_id.to_string(),
                        side,
                        limit_price,
                        size,
                        order_id: None,
                        filled: Decimal::ZERO,
                    },
                    Some(err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Cancel an order; `Ok(false)` when it was already terminal
    pub fn cancel_order(&mut self, order_id: OrderId) -> SimResult<bool> {
        let cursor = self.cursor();
        let result = self.broker.cancel_order(order_id);
        let error = result.as_ref().err().map(|e| e.to_string());
        self.record_action(
            cursor,
            Action::CancelOrder {
                order_id,
                cancelled: matches!(result, Ok(true)),
            },
            error,
        );
        result
    }

    /// Mark the session DONE; a session that is already DONE keeps its first reason
    pub fn finish(&mut self, reason: DoneReason) {
        let cursor = self.cursor();
        if self.done_reason.is_none() {
            self.done_reason = Some(reason);
            info!(session = %self.id, %reason, cursor, "Session finished");
        }
        self.record_action(cursor, Action::Finish { reason }, None);
    }

    /// Observable state at the current cursor
    pub fn get_state(&self) -> SessionState {
        let depth = self.config.depth_levels;
        let assets = self
            .books
            .iter()
            .map(|(asset_id, book)| {
                let state = AssetState {
                    best_bid: book.best_bid(),
                    best_ask: book.best_ask(),
                    bids: book.top_bids(depth),
                    asks: book.top_asks(depth),
                    mid_price: book.mid_price(),
                    spread: book.spread(),
                    last_trade_price: book.last_trade().map(|t| t.price),
                    crossed: book.is_crossed(),
                };
                (asset_id.clone(), state)
            })
            .collect();
        let ctx = self.context();

        SessionState {
            mode: self.mode,
            status: self.status(),
            done: self.is_done(),
            done_reason: self.done_reason,
            cursor: self.cursor(),
            total_events: self.total_events(),
            current_seq: (self.cursor > 0).then_some(ctx.seq),
            current_ts: (self.cursor > 0).then_some(ctx.ts),
            assets,
            open_orders: self.broker.open_orders().into_iter().cloned().collect(),
            order_count: self.broker.order_count(),
            fill_count: self.broker.fills().len(),
            crossed_observations: self.books.crossed_observations(),
            portfolio: self.ledger.snapshot(),
        }
    }

    /// Fresh portfolio fold
    pub fn portfolio(&self) -> PortfolioSnapshot {
        self.ledger.snapshot()
    }

    /// Write the six artifact files under `dir`
    pub fn save_artifacts(&mut self, dir: impl AsRef<Path>) -> SimResult<RunManifest> {
        let dir = dir.as_ref();
        self.record_action(
            self.cursor(),
            Action::SaveArtifacts {
                dir: dir.display().to_string(),
            },
            None,
        );
        match artifacts::save(self, dir) {
            Ok(manifest) => {
                info!(session = %self.id, dir = %dir.display(), cursor = self.cursor, "Artifacts saved");
                Ok(manifest)
            }
            Err(err) => {
                if let Some(action) = self.actions.last_mut() {
                    action.accepted = false;
                    action.error = Some(err.to_string());
                }
                Err(err)
            }
        }
    }

    fn push_equity_point(&mut self) {
        let snap = self.ledger.snapshot();
        let ctx = self.context();
        self.equity_curve.push(EquityPoint {
            cursor: ctx.cursor,
            seq: ctx.seq,
            ts: ctx.ts,
            cash: snap.cash,
            equity: snap.equity,
            realized_pnl: snap.realized_pnl,
            unrealized_pnl: snap.unrealized_pnl,
        });
    }

    fn record_action(&mut self, cursor: u64, action: Action, error: Option<String>) {
        self.actions.push(UserAction {
            action_id: self.actions.len() as u64 + 1,
            cursor,
            accepted: error.is_none(),
            error,
            action,
        });
    }

    pub fn broker(&self) -> &SimulatedBroker {
        &self.broker
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn books(&self) -> &BookSet {
        &self.books
    }

    pub fn actions(&self) -> &[UserAction] {
        &self.actions
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BookSide;
    use crate::tape::{EventKind, LevelUpdate};
    use rust_decimal_macros::dec;

    fn level_event(seq: u64, side: BookSide, price: Decimal, size: Decimal) -> Event {
        Event {
            seq,
            ts_recv: seq * 100,
            asset_id: Some("A".into()),
            kind: EventKind::PriceChange(LevelUpdate {
                asset_id: "A".into(),
                side,
                price,
                size,
            }),
        }
    }

    fn four_event_tape() -> Tape {
        Tape::from_events(
            "mem",
            vec![
                level_event(1, BookSide::Bid, dec!(0.51), dec!(20)),
                level_event(2, BookSide::Bid, dec!(0.52), dec!(10)),
                level_event(3, BookSide::Ask, dec!(0.54), dec!(40)),
                level_event(4, BookSide::Ask, dec!(0.53), dec!(30)),
            ],
        )
    }

    #[test]
    fn test_lifecycle_and_clamping() {
        let mut session = Session::from_tape(four_event_tape(), &SimConfig::default()).unwrap();
        assert_eq!(session.status(), SessionStatus::NotStarted);

        let before = session.get_state();
        let report = session.step(0).unwrap();
        assert_eq!(report.advanced, 0);
        assert_eq!(session.get_state(), before);

        session.step(2).unwrap();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.get_state().current_seq, Some(2));

        let report = session.step(104).unwrap();
        assert_eq!(report.advanced, 2);
        assert!(report.done);
        assert_eq!(session.cursor(), 4);
        assert_eq!(session.done_reason(), Some(DoneReason::TapeExhausted));

        let done_state = session.get_state();
        let report = session.step(1).unwrap();
        assert_eq!(report.advanced, 0);
        assert_eq!(session.get_state(), done_state);
    }

    #[test]
    fn test_zero_latency_scenario_moves_cash() {
        let mut session = Session::from_tape(four_event_tape(), &SimConfig::default()).unwrap();
        session.step(4).unwrap();
        let ack = session.submit_order("A", Side::Buy, dec!(0.55), dec!(50)).unwrap();
        assert_eq!(ack.status, OrderStatus::PartiallyFilled);
        assert_eq!(ack.fills[0].price, dec!(0.53));
        assert_eq!(ack.fills[0].size, dec!(30));

        let state = session.get_state();
        assert_eq!(state.portfolio.cash, dec!(1000) - dec!(30) * dec!(0.53));
        assert_eq!(state.open_orders.len(), 1);
        assert_eq!(state.open_orders[0].submitted_at_seq, 4);
        // Submission after DONE still works, and fills move the equity curve
        assert_eq!(session.equity_curve().len(), 2);
    }

    #[test]
    fn test_rejections_are_logged_and_recoverable() {
        let mut session = Session::from_tape(four_event_tape(), &SimConfig::default()).unwrap();
        let err = session.submit_order("A", Side::Buy, dec!(1.5), dec!(1)).unwrap_err();
        assert!(err.is_recoverable());
        let err = session.submit_order("nope", Side::Buy, dec!(0.5), dec!(1)).unwrap_err();
        assert!(matches!(err, SimError::InvalidOrder(_)));
        let err = session.cancel_order(OrderId::new(42)).unwrap_err();
        assert!(matches!(err, SimError::OrderNotFound(_)));

        assert_eq!(session.actions().len(), 3);
        assert!(session.actions().iter().all(|a| !a.accepted));
        assert_eq!(session.get_state().order_count, 0);
    }

    #[test]
    fn test_resting_order_fills_on_later_event() {
        let mut session = Session::from_tape(four_event_tape(), &SimConfig::default()).unwrap();
        session.step(3).unwrap();
        // best ask is 0.54 now; 0.535 rests
        let ack = session.submit_order("A", Side::Buy, dec!(0.535), dec!(10)).unwrap();
        assert!(ack.fills.is_empty());

        let report = session.step(1).unwrap();
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.fills[0].price, dec!(0.53));
        assert_eq!(report.fills[0].cursor, 4);
        let state = session.get_state();
        assert!(state.open_orders.is_empty());
        assert_eq!(state.portfolio.inventory("A"), dec!(10));
    }

    #[test]
    fn test_marks_recorded_only_with_inventory() {
        let mut session = Session::from_tape(four_event_tape(), &SimConfig::default()).unwrap();
        session.step(3).unwrap();
        let marks_before = session
            .ledger()
            .entries()
            .iter()
            .filter(|e| e.kind.name() == "mark")
            .count();
        assert_eq!(marks_before, 0);

        session.submit_order("A", Side::Buy, dec!(0.54), dec!(5)).unwrap();
        session.step(1).unwrap();
        let state = session.get_state();
        let position = state.portfolio.position("A").unwrap();
        // Mid after event 4: (0.52 + 0.53) / 2
        assert_eq!(position.mark_price, Some(dec!(0.525)));
    }

    #[test]
    fn test_empty_tape_is_done_immediately() {
        let session = Session::from_tape(Tape::from_events("empty", Vec::new()), &SimConfig::default()).unwrap();
        let state = session.get_state();
        assert!(state.done);
        assert_eq!(state.status, SessionStatus::Done);
        assert_eq!(state.total_events, 0);
    }

    #[test]
    fn test_live_session_push_and_finish() {
        let assets: Vec<AssetId> = vec!["A".into()];
        let mut session = Session::live("feed", &assets, &SimConfig::default()).unwrap();
        session
            .push_event(level_event(1, BookSide::Ask, dec!(0.60), dec!(5)))
            .unwrap();
        assert_eq!(session.cursor(), 1);
        assert!(!session.is_done());
        assert!(session.step(10).unwrap().advanced == 0);

        session.finish(DoneReason::FeedClosed);
        session.finish(DoneReason::Stalled);
        assert_eq!(session.done_reason(), Some(DoneReason::FeedClosed));
        assert!(session
            .push_event(level_event(2, BookSide::Ask, dec!(0.61), dec!(5)))
            .is_err());
    }

    #[test]
    fn test_replay_rejects_push_event() {
        let mut session = Session::from_tape(four_event_tape(), &SimConfig::default()).unwrap();
        assert!(session
            .push_event(level_event(9, BookSide::Bid, dec!(0.1), dec!(1)))
            .is_err());
    }
}
