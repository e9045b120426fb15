//! Event tape: normalized events and the NDJSON reader
//!
//! ```text
//! tape.jsonl ──▶ parse_line ──▶ Event { seq, ts_recv, kind } ──▶ Tape (sorted by seq)
//!                    ▲
//! live feed ─────────┘
//! ```

pub mod event;
pub mod reader;

pub use event::{BookSnapshot, Event, EventKind, LevelUpdate, TradePrint};
pub use reader::{parse_line, parse_line_from, Tape, STREAM_SOURCE};
