//! End-to-end replay scenarios against tapes written to disk

mod common;

use common::*;
use rust_decimal_macros::dec;
use tapesim_core::config::SimConfig;
use tapesim_core::execution::FeeSchedule;
use tapesim_core::prelude::*;
use tapesim_core::Liquidity;

fn session(lines: &[String]) -> (tempfile::TempDir, Session) {
    session_with(lines, &SimConfig::default())
}

fn session_with(lines: &[String], config: &SimConfig) -> (tempfile::TempDir, Session) {
    let (dir, path) = write_tape(lines);
    let session = Session::load(&path, config).expect("load session");
    (dir, session)
}

#[test]
fn test_zero_latency_buy_fills_at_best_ask() {
    let config = SimConfig {
        fees: FeeSchedule::new(dec!(0), dec!(100)),
        ..Default::default()
    };
    let (_dir, mut session) = session_with(&four_event_lines(), &config);
    session.step(4).unwrap();
    assert_eq!(session.get_state().asset("A").unwrap().best_ask.unwrap().price, dec!(0.53));

    let ack = session.submit_order("A", Side::Buy, dec!(0.55), dec!(50)).unwrap();
    assert_eq!(ack.fills.len(), 1);
    let fill = &ack.fills[0];
    assert_eq!(fill.price, dec!(0.53));
    assert_eq!(fill.size, dec!(30));
    assert_eq!(fill.liquidity, Liquidity::Taker);
    assert_eq!(fill.fee, dec!(0.159));
    assert_eq!(ack.status, OrderStatus::PartiallyFilled);

    let portfolio = session.get_state().portfolio;
    assert_eq!(portfolio.cash, dec!(1000) - dec!(30) * dec!(0.53) - dec!(0.159));
    assert_eq!(portfolio.fees_paid, dec!(0.159));
    assert_eq!(portfolio.inventory("A"), dec!(30));
}

#[test]
fn test_step_clamps_and_done_is_terminal() {
    let (_dir, mut session) = session(&four_event_lines());
    let initial = session.get_state();
    assert_eq!(session.step(0).unwrap().advanced, 0);
    assert_eq!(session.get_state(), initial);

    let report = session.step(4 + 100).unwrap();
    assert_eq!(report.advanced, 4);
    assert!(report.done);
    assert_eq!(session.cursor(), 4);

    let done = session.get_state();
    assert_eq!(done.done_reason, Some(DoneReason::TapeExhausted));
    assert_eq!(session.step(1).unwrap().advanced, 0);
    assert_eq!(session.get_state(), done);
}

#[test]
fn test_cancel_is_idempotent() {
    let (_dir, mut session) = session(&four_event_lines());
    session.step(4).unwrap();

    let resting = session.submit_order("A", Side::Buy, dec!(0.40), dec!(5)).unwrap();
    assert!(resting.fills.is_empty());
    assert!(session.cancel_order(resting.order_id).unwrap());

    let after_first = session.get_state();
    assert!(!session.cancel_order(resting.order_id).unwrap());
    assert_eq!(session.get_state(), after_first);

    let filled = session.submit_order("A", Side::Buy, dec!(0.53), dec!(1)).unwrap();
    assert_eq!(filled.status, OrderStatus::Filled);
    let before = session.get_state();
    assert!(!session.cancel_order(filled.order_id).unwrap());
    assert_eq!(session.get_state(), before);

    let order = session.broker().order(resting.order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.filled_size, dec!(0));
}

#[test]
fn test_no_look_ahead() {
    let (_dir, mut session) = session(&four_event_lines());
    // Nothing on the ask side yet: must rest, even though later events would fill it
    let ack = session.submit_order("A", Side::Buy, dec!(0.60), dec!(10)).unwrap();
    assert!(ack.fills.is_empty());
    assert_eq!(ack.status, OrderStatus::Open);

    let report = session.step(2).unwrap();
    assert!(report.fills.is_empty());

    let report = session.step(1).unwrap();
    assert_eq!(report.fills.len(), 1);
    let fill = &report.fills[0];
    assert_eq!(fill.price, dec!(0.54));
    assert_eq!(fill.seq, 3);
    assert_eq!(fill.cursor, 3);
    assert_eq!(fill.liquidity, Liquidity::Maker);
}

#[test]
fn test_event_delay_latency() {
    let config = SimConfig {
        latency: "events:1".to_string(),
        ..Default::default()
    };
    let (_dir, mut session) = session_with(&four_event_lines(), &config);
    session.step(3).unwrap();

    // Marketable against 0.54 but not yet eligible
    let ack = session.submit_order("A", Side::Buy, dec!(0.54), dec!(10)).unwrap();
    assert!(ack.fills.is_empty());

    let report = session.step(1).unwrap();
    assert_eq!(report.fills.len(), 1);
    assert_eq!(report.fills[0].price, dec!(0.53));
    assert_eq!(report.fills[0].cursor, 4);
}

#[test]
fn test_delayed_order_fills_on_events_for_other_assets() {
    let lines = vec![
        levels(
            1,
            &[
                ("A", "BUY", "0.40", "10"),
                ("A", "SELL", "0.60", "10"),
                ("B", "SELL", "0.50", "20"),
            ],
        ),
        level(2, "A", "BUY", "0.41", "10"),
        level(3, "A", "BUY", "0.42", "10"),
        level(4, "A", "BUY", "0.43", "10"),
    ];
    let config = SimConfig {
        latency: "events:1".to_string(),
        ..Default::default()
    };
    let (_dir, mut session) = session_with(&lines, &config);
    session.step(1).unwrap();

    let ack = session.submit_order("B", Side::Buy, dec!(0.55), dec!(5)).unwrap();
    assert!(ack.fills.is_empty());

    // B's book never changes again; the order still matches once eligible
    let report = session.step(3).unwrap();
    assert_eq!(report.fills.len(), 1);
    assert_eq!(report.fills[0].order_id, ack.order_id);
    assert_eq!(report.fills[0].price, dec!(0.50));
    assert_eq!(report.fills[0].size, dec!(5));
    assert_eq!(report.fills[0].cursor, 2);
    assert!(session.get_state().open_orders.is_empty());
}

#[test]
fn test_displayed_liquidity_is_not_reused() {
    let mut lines = four_event_lines();
    lines.push(level(5, "A", "SELL", "0.53", "30"));
    let (_dir, mut session) = session(&lines);
    session.step(4).unwrap();

    let first = session.submit_order("A", Side::Buy, dec!(0.53), dec!(20)).unwrap();
    assert_eq!(first.fills[0].size, dec!(20));
    let second = session.submit_order("A", Side::Buy, dec!(0.53), dec!(20)).unwrap();
    assert_eq!(second.fills[0].size, dec!(10));
    let third = session.submit_order("A", Side::Buy, dec!(0.53), dec!(5)).unwrap();
    assert!(third.fills.is_empty());

    // The tape refreshes the 0.53 level: resting orders fill in id order
    let report = session.step(1).unwrap();
    assert_eq!(report.fills.len(), 2);
    assert_eq!(report.fills[0].order_id, second.order_id);
    assert_eq!(report.fills[0].size, dec!(10));
    assert_eq!(report.fills[1].order_id, third.order_id);
    assert_eq!(report.fills[1].size, dec!(5));
    assert!(session.get_state().open_orders.is_empty());
}

#[test]
fn test_crossed_book_is_never_matched() {
    let lines = vec![
        level(1, "A", "BUY", "0.60", "10"),
        level(2, "A", "SELL", "0.55", "10"),
    ];
    let (_dir, mut session) = session(&lines);
    session.step(2).unwrap();

    let state = session.get_state();
    assert!(state.asset("A").unwrap().crossed);
    assert!(state.crossed_observations >= 1);

    let ack = session.submit_order("A", Side::Buy, dec!(0.99), dec!(1)).unwrap();
    assert!(ack.fills.is_empty());
}

#[test]
fn test_invalid_orders_rejected_without_side_effects() {
    let (_dir, mut session) = session(&four_event_lines());
    session.step(4).unwrap();
    let before = session.get_state();

    for (asset, price, size) in [
        ("A", dec!(0), dec!(1)),
        ("A", dec!(1.01), dec!(1)),
        ("A", dec!(0.5), dec!(0)),
        ("A", dec!(0.5), dec!(-3)),
        ("Z", dec!(0.5), dec!(1)),
    ] {
        let err = session.submit_order(asset, Side::Sell, price, size).unwrap_err();
        assert!(matches!(err, SimError::InvalidOrder(_)), "{asset} {price} {size}: {err}");
    }
    assert_eq!(session.get_state(), before);
    assert_eq!(session.actions().iter().filter(|a| !a.accepted).count(), 5);
}

#[test]
fn test_identical_runs_are_byte_identical() {
    let lines = busy_lines(200);
    let run = |lines: &[String]| -> (String, String) {
        let (_dir, mut session) = session(lines);
        let mut ids = Vec::new();
        for round in 0..20u64 {
            session.step(7).unwrap();
            let price = if round % 2 == 0 { dec!(0.53) } else { dec!(0.47) };
            let side = if round % 2 == 0 { Side::Buy } else { Side::Sell };
            if let Ok(ack) = session.submit_order("A", side, price, dec!(15)) {
                ids.push(ack.order_id);
            }
            if round % 5 == 4 {
                if let Some(id) = ids.first().copied() {
                    let _ = session.cancel_order(id);
                }
            }
        }
        session.step(u64::MAX).unwrap();
        let fills = serde_json::to_string(session.broker().fills()).unwrap();
        (session.get_state().to_json().unwrap(), fills)
    };

    let first = run(&lines);
    let second = run(&lines);
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
}
