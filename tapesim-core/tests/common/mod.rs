//! Shared helpers for integration tests: tape lines and temp tape files

#![allow(dead_code)]

use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

/// Legacy single-level update
pub fn level(seq: u64, asset: &str, side: &str, price: &str, size: &str) -> String {
    json!({
        "seq": seq,
        "ts_recv": 1_700_000_000_000u64 + seq,
        "asset_id": asset,
        "price_change": {"side": side, "price": price, "size": size},
    })
    .to_string()
}

/// Modern multi-level update
pub fn levels(seq: u64, updates: &[(&str, &str, &str, &str)]) -> String {
    let changes: Vec<_> = updates
        .iter()
        .map(|(asset, side, price, size)| {
            json!({"asset_id": asset, "side": side, "price": price, "size": size})
        })
        .collect();
    json!({
        "seq": seq,
        "ts_recv": 1_700_000_000_000u64 + seq,
        "price_changes": changes,
    })
    .to_string()
}

pub fn trade(seq: u64, asset: &str, price: &str) -> String {
    json!({
        "seq": seq,
        "ts_recv": 1_700_000_000_000u64 + seq,
        "asset_id": asset,
        "last_trade_price": {"price": price},
    })
    .to_string()
}

pub fn book(seq: u64, asset: &str, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> String {
    let side = |levels: &[(&str, &str)]| -> Vec<serde_json::Value> {
        levels
            .iter()
            .map(|(price, size)| json!({"price": price, "size": size}))
            .collect()
    };
    json!({
        "seq": seq,
        "ts_recv": 1_700_000_000_000u64 + seq,
        "asset_id": asset,
        "book": {"bids": side(bids), "asks": side(asks)},
    })
    .to_string()
}

/// Write `lines` as a tape into a fresh temp dir
pub fn write_tape(lines: &[String]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tape.jsonl");
    let mut body = lines.join("\n");
    body.push('\n');
    std::fs::write(&path, body).expect("write tape");
    (dir, path)
}

/// Four-event tape: bids 0.51x20, 0.52x10 then asks 0.54x40, 0.53x30 on asset "A"
pub fn four_event_lines() -> Vec<String> {
    vec![
        level(1, "A", "BUY", "0.51", "20"),
        level(2, "A", "BUY", "0.52", "10"),
        level(3, "A", "SELL", "0.54", "40"),
        level(4, "A", "SELL", "0.53", "30"),
    ]
}

/// Longer two-asset tape with trades and a snapshot, for determinism and sweeps
pub fn busy_lines(n: u64) -> Vec<String> {
    let mut lines = vec![book(
        1,
        "A",
        &[("0.48", "100"), ("0.47", "200")],
        &[("0.52", "100"), ("0.53", "200")],
    )];
    let mut seq = 1;
    for i in 0..n {
        seq += 1;
        let bid = format!("0.{}", 40 + (i % 8));
        let ask = format!("0.{}", 52 + (i % 6));
        let size = format!("{}", 10 + (i * 7) % 90);
        let line = match i % 4 {
            0 => level(seq, "A", "BUY", &bid, &size),
            1 => level(seq, "A", "SELL", &ask, &size),
            2 => levels(
                seq,
                &[("B", "BUY", "0.30", &size), ("B", "SELL", "0.35", &size)],
            ),
            _ => trade(seq, "A", &ask),
        };
        lines.push(line);
    }
    lines
}
