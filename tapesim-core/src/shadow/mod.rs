//! Live (shadow) mode
//!
//! Same session mechanics as replay, but events arrive from a live feed and the run ends
//! on cancellation, feed closure or a stall instead of tape exhaustion.

pub mod feed;
pub mod runner;

pub use feed::{ndjson_feed, ndjson_feed_blocking};
pub use runner::{ShadowOutcome, ShadowRunner};
