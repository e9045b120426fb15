//! NDJSON tape reader
//!
//! ## Line schema
//!
//! ```text
//! {"seq": 1, "ts_recv": 1700000000000, "asset_id": "A",
//!  "price_change":  {"side": "BUY", "price": "0.52", "size": "100"}}          legacy
//! {"seq": 2, "asset_id": "A",
//!  "price_changes": [{"asset_id": "B", "side": "SELL", "price": "0.48", ...}]} modern
//! {"seq": 3, "asset_id": "A", "last_trade_price": {"price": "0.52"}}
//! {"seq": 4, "asset_id": "A", "book": {"bids": [...], "asks": [...]}}
//! ```
//!
//! Exactly one payload key per line. Unknown keys are ignored. Prices and sizes may be
//! JSON numbers or strings; `ts_recv` may be an integer or a numeric string.
//!
//! A malformed line fails the whole load: no partial tape is ever returned.

use super::event::{BookSnapshot, Event, EventKind, LevelUpdate, TradePrint};
use crate::core::{AssetId, BookSide, PriceLevel, SimError, SimResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Source label used for lines that do not come from a file (live feeds)
pub const STREAM_SOURCE: &str = "<stream>";

#[derive(Debug, Deserialize)]
struct RawEvent {
    seq: Option<u64>,
    ts_recv: Option<RawTimestamp>,
    asset_id: Option<String>,
    price_change: Option<RawLevel>,
    price_changes: Option<Vec<RawLevel>>,
    last_trade_price: Option<RawTrade>,
    book: Option<BookSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Int(u64),
    Str(String),
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    asset_id: Option<String>,
    side: BookSide,
    price: Decimal,
    size: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTrade {
    Detailed(TradePrint),
    Bare(Decimal),
}

/// Parse one tape line from a live stream
///
/// `line_no` is 1-based and only used for error reporting.
pub fn parse_line(line: &str, line_no: usize) -> SimResult<Event> {
    parse_line_from(STREAM_SOURCE, line, line_no)
}

/// Parse one tape line, attributing errors to `source`
pub fn parse_line_from(source: &str, line: &str, line_no: usize) -> SimResult<Event> {
    let fail = |reason: String| SimError::tape_format(source, line_no, reason);

    let raw: RawEvent =
        serde_json::from_str(line).map_err(|e| fail(format!("invalid JSON: {}", e)))?;

    let seq = raw.seq.ok_or_else(|| fail("missing seq".to_string()))?;

    let ts_recv = match raw.ts_recv {
        None => 0,
        Some(RawTimestamp::Int(ts)) => ts,
        Some(RawTimestamp::Str(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| fail(format!("invalid ts_recv {:?}", s)))?,
    };

    let payloads = [
        raw.price_change.is_some(),
        raw.price_changes.is_some(),
        raw.last_trade_price.is_some(),
        raw.book.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();
    if payloads == 0 {
        return Err(fail(
            "no payload (expected price_change, price_changes, last_trade_price or book)".into(),
        ));
    }
    if payloads > 1 {
        return Err(fail("more than one payload on a single line".into()));
    }

    let event_asset = raw.asset_id.clone();
    let require_asset = |asset: Option<String>| -> SimResult<AssetId> {
        asset
            .filter(|a| !a.is_empty())
            .ok_or_else(|| fail("missing asset_id".to_string()))
    };
    let level = |raw_level: RawLevel| -> SimResult<LevelUpdate> {
        let asset_id = require_asset(raw_level.asset_id.or_else(|| event_asset.clone()))?;
        validate_level(raw_level.price, raw_level.size).map_err(fail)?;
        Ok(LevelUpdate {
            asset_id,
            side: raw_level.side,
            price: raw_level.price,
            size: raw_level.size,
        })
    };

    let kind = if let Some(update) = raw.price_change {
        EventKind::PriceChange(level(update)?)
    } else if let Some(updates) = raw.price_changes {
        let updates = updates.into_iter().map(level).collect::<SimResult<Vec<_>>>()?;
        EventKind::PriceChanges(updates)
    } else if let Some(trade) = raw.last_trade_price {
        let print = match trade {
            RawTrade::Detailed(print) => print,
            RawTrade::Bare(price) => TradePrint {
                price,
                size: None,
                side: None,
            },
        };
        validate_price(print.price).map_err(|reason| fail(format!("trade {}", reason)))?;
        if matches!(print.size, Some(size) if size < Decimal::ZERO) {
            return Err(fail("negative trade size".into()));
        }
        EventKind::LastTradePrice {
            asset_id: require_asset(event_asset.clone())?,
            print,
        }
    } else if let Some(snapshot) = raw.book {
        for PriceLevel { price, size } in snapshot.bids.iter().chain(snapshot.asks.iter()) {
            validate_level(*price, *size).map_err(fail)?;
        }
        EventKind::Book {
            asset_id: require_asset(event_asset.clone())?,
            snapshot,
        }
    } else {
        unreachable!("payload count checked above")
    };

    Ok(Event {
        seq,
        ts_recv,
        asset_id: raw.asset_id,
        kind,
    })
}

/// Outcome prices live in (0, 1]
fn validate_price(price: Decimal) -> Result<(), String> {
    if price <= Decimal::ZERO {
        return Err(format!("non-positive price {}", price));
    }
    if price > Decimal::ONE {
        return Err(format!("price {} above 1", price));
    }
    Ok(())
}

fn validate_level(price: Decimal, size: Decimal) -> Result<(), String> {
    validate_price(price)?;
    if size < Decimal::ZERO {
        return Err(format!("negative size {} at price {}", size, price));
    }
    Ok(())
}

/// A fully loaded, seq-ordered tape
#[derive(Debug, Clone)]
pub struct Tape {
    source: String,
    events: Vec<Event>,
    asset_ids: BTreeSet<AssetId>,
}

impl Tape {
    /// Load and validate a tape file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SimError::TapeIo {
            path: path.to_path_buf(),
            source,
        })?;
        let tape = Self::from_reader(BufReader::new(file), &path.display().to_string())
            .map_err(|err| match err {
                SimError::TapeIo { source, .. } => SimError::TapeIo {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            })?;

        info!(
            tape = %path.display(),
            events = tape.len(),
            assets = tape.asset_ids.len(),
            "Tape loaded"
        );
        Ok(tape)
    }

    /// Parse a tape from any line source; blank lines are skipped
    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> SimResult<Self> {
        let mut events = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source_err| SimError::TapeIo {
                path: source.into(),
                source: source_err,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(parse_line_from(source, &line, idx + 1)?);
        }
        Ok(Self::from_events(source, events))
    }

    /// Build a tape from already-parsed events (stable-sorted by seq)
    pub fn from_events(source: impl Into<String>, mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.seq);
        let asset_ids = discover_assets(&events);
        let source = source.into();
        debug!(source = %source, events = events.len(), "Tape assembled");
        Self {
            source,
            events,
            asset_ids,
        }
    }

    /// File path (or label) this tape was read from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Every asset id referenced anywhere on the tape
    pub fn asset_ids(&self) -> &BTreeSet<AssetId> {
        &self.asset_ids
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<Event>, BTreeSet<AssetId>) {
        (self.source, self.events, self.asset_ids)
    }
}

fn discover_assets(events: &[Event]) -> BTreeSet<AssetId> {
    events
        .iter()
        .flat_map(|e| e.asset_ids().into_iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    #[test]
    fn test_parse_legacy_price_change() {
        let event = parse_line(
            r#"{"seq":1,"ts_recv":1700,"asset_id":"A","price_change":{"side":"BUY","price":"0.52","size":"100"}}"#,
            1,
        )
        .unwrap();
        assert_eq!(event.seq, 1);
        assert_eq!(event.ts_recv, 1700);
        assert_eq!(
            event.kind,
            EventKind::PriceChange(LevelUpdate {
                asset_id: "A".into(),
                side: BookSide::Bid,
                price: dec!(0.52),
                size: dec!(100),
            })
        );
    }

    #[test]
    fn test_parse_batch_inherits_event_asset() {
        let event = parse_line(
            r#"{"seq":2,"ts_recv":"1701","asset_id":"A","price_changes":[{"side":"SELL","price":0.53,"size":5},{"asset_id":"B","side":"bid","price":"0.4","size":"0"}]}"#,
            2,
        )
        .unwrap();
        assert_eq!(event.ts_recv, 1701);
        match event.kind {
            EventKind::PriceChanges(updates) => {
                assert_eq!(updates.len(), 2);
                assert_eq!(updates[0].asset_id, "A");
                assert_eq!(updates[0].side, BookSide::Ask);
                assert_eq!(updates[1].asset_id, "B");
                assert_eq!(updates[1].size, Decimal::ZERO);
            }
            other => panic!("Expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bare_and_detailed_trade() {
        let bare = parse_line(r#"{"seq":3,"asset_id":"A","last_trade_price":"0.51"}"#, 3).unwrap();
        let detailed = parse_line(
            r#"{"seq":4,"asset_id":"A","last_trade_price":{"price":"0.51","size":"3","side":"SELL"}}"#,
            4,
        )
        .unwrap();
        match (bare.kind, detailed.kind) {
            (
                EventKind::LastTradePrice { print: a, .. },
                EventKind::LastTradePrice { print: b, .. },
            ) => {
                assert_eq!(a.price, dec!(0.51));
                assert_eq!(a.size, None);
                assert_eq!(b.size, Some(dec!(3)));
            }
            _ => panic!("Expected trade prints"),
        }
        assert_eq!(bare.ts_recv, 0);
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        let cases = [
            ("not json", "invalid JSON"),
            (r#"{"asset_id":"A","last_trade_price":"0.5"}"#, "missing seq"),
            (r#"{"seq":1,"asset_id":"A"}"#, "no payload"),
            (
                r#"{"seq":1,"asset_id":"A","last_trade_price":"0.5","book":{"bids":[],"asks":[]}}"#,
                "more than one payload",
            ),
            (r#"{"seq":1,"last_trade_price":"0.5"}"#, "missing asset_id"),
            (
                r#"{"seq":1,"asset_id":"A","price_change":{"side":"BUY","price":"0","size":"1"}}"#,
                "non-positive price",
            ),
            (
                r#"{"seq":1,"asset_id":"A","price_change":{"side":"BUY","price":"0.5","size":"-1"}}"#,
                "negative size",
            ),
            (
                r#"{"seq":1,"asset_id":"A","price_change":{"side":"SELL","price":"1.01","size":"1"}}"#,
                "price 1.01 above 1",
            ),
            (
                r#"{"seq":1,"asset_id":"A","price_changes":[{"side":"BUY","price":"79228162514264337593543950335","size":"1"}]}"#,
                "above 1",
            ),
            (r#"{"seq":1,"asset_id":"A","last_trade_price":"2"}"#, "trade price 2 above 1"),
            (
                r#"{"seq":1,"asset_id":"A","book":{"bids":[{"price":"0.4","size":"1"}],"asks":[{"price":"3","size":"1"}]}}"#,
                "price 3 above 1",
            ),
        ];
        for (line, expected) in cases {
            let err = parse_line(line, 9).unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains(expected), "{} -> {}", line, msg);
            assert!(matches!(err, SimError::TapeFormat { line: 9, .. }));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_side() {
        let err = parse_line(
            r#"{"seq":1,"asset_id":"A","price_change":{"side":"MID","price":"0.5","size":"1"}}"#,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::TapeFormat { .. }));
    }

    #[test]
    fn test_from_reader_sorts_and_discovers_assets() {
        let text = concat!(
            r#"{"seq":3,"asset_id":"B","last_trade_price":"0.4"}"#,
            "\n\n",
            r#"{"seq":1,"asset_id":"A","price_change":{"side":"SELL","price":"0.6","size":"1"}}"#,
            "\n",
            r#"{"seq":2,"asset_id":"A","book":{"bids":[{"price":"0.5","size":"2"}],"asks":[]}}"#,
            "\n"
        );
        let tape = Tape::from_reader(Cursor::new(text), "mem").unwrap();
        let seqs: Vec<u64> = tape.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        let assets: Vec<&str> = tape.asset_ids().iter().map(|a| a.as_str()).collect();
        assert_eq!(assets, vec!["A", "B"]);
    }

    #[test]
    fn test_from_reader_reports_line_number() {
        let text = "{\"seq\":1,\"asset_id\":\"A\",\"last_trade_price\":\"0.5\"}\n{oops}\n";
        let err = Tape::from_reader(Cursor::new(text), "mem.jsonl").unwrap_err();
        match err {
            SimError::TapeFormat { path, line, .. } => {
                assert_eq!(path, "mem.jsonl");
                assert_eq!(line, 2);
            }
            other => panic!("Expected TapeFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_tape_is_valid() {
        let tape = Tape::from_reader(Cursor::new(""), "empty").unwrap();
        assert!(tape.is_empty());
        assert!(tape.asset_ids().is_empty());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Tape::load("/definitely/not/here.jsonl").unwrap_err();
        assert!(matches!(err, SimError::TapeIo { .. }));
    }
}
