//! NDJSON live feed
//!
//! Turns a line source (stdin, a socket, a child process) into a bounded event
//! channel. Lines use the tape schema. Unlike tape loading, a malformed line is logged and
//! skipped; the feed keeps running.
//!
//! [`ndjson_feed`] reads on a tokio task. [`ndjson_feed_blocking`] reads on a detached OS
//! thread; use it for process stdin, since tokio's stdin parks a blocking-pool thread that
//! holds the runtime open for as long as the pipe stays open.

use crate::tape::{parse_line, Event};
use std::io::BufRead;
use std::thread;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Parse one feed line; blank lines yield nothing, malformed ones are counted and skipped
fn parse_or_skip(line: &str, line_no: usize, skipped: &mut u64) -> Option<Event> {
    if line.trim().is_empty() {
        return None;
    }
    match parse_line(line, line_no) {
        Ok(event) => Some(event),
        Err(err) => {
            *skipped += 1;
            warn!(line = line_no, error = %err, "Skipping malformed feed line");
            None
        }
    }
}

/// Spawn a reader task; the receiver closes when the source hits EOF or fails
///
/// Must be called from within a tokio runtime.
pub fn ndjson_feed<R>(reader: R, capacity: usize) -> mpsc::Receiver<Event>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut line_no = 0usize;
        let mut skipped = 0u64;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    line_no += 1;
                    let Some(event) = parse_or_skip(&line, line_no, &mut skipped) else {
                        continue;
                    };
                    if tx.send(event).await.is_err() {
                        debug!(line = line_no, "Feed receiver dropped");
                        break;
                    }
                }
                Ok(None) => {
                    debug!(lines = line_no, skipped, "Feed source closed");
                    break;
                }
                Err(err) => {
                    warn!(line = line_no, error = %err, "Feed read failed");
                    break;
                }
            }
        }
    });
    rx
}

/// Read a blocking source on a detached thread
///
/// The thread is never joined: when the consumer finishes early (stall, kill switch) the
/// process can exit while the thread is still parked in `read`. The thread ends on EOF,
/// a read error, or the first send after the receiver is dropped. Safe to call from
/// inside or outside a runtime.
pub fn ndjson_feed_blocking<R>(reader: R, capacity: usize) -> mpsc::Receiver<Event>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let spawned = thread::Builder::new()
        .name("tapesim-feed".into())
        .spawn(move || {
            let mut line_no = 0usize;
            let mut skipped = 0u64;
            for line in reader.lines() {
                line_no += 1;
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(line = line_no, error = %err, "Feed read failed");
                        return;
                    }
                };
                let Some(event) = parse_or_skip(&line, line_no, &mut skipped) else {
                    continue;
                };
                if tx.blocking_send(event).is_err() {
                    debug!(line = line_no, "Feed receiver dropped");
                    return;
                }
            }
            debug!(lines = line_no, skipped, "Feed source closed");
        });
    if let Err(err) = spawned {
        // The sender was dropped with the closure, so the receiver reports a closed feed
        warn!(error = %err, "Failed to spawn feed thread");
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    const INPUT: &str = concat!(
        "{\"seq\":1,\"asset_id\":\"A\",\"last_trade_price\":{\"price\":\"0.5\"}}\n",
        "not json\n",
        "\n",
        "{\"seq\":2}\n",
        "{\"seq\":3,\"asset_id\":\"A\",\"last_trade_price\":\"0.6\"}\n",
    );

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let mut rx = ndjson_feed(Cursor::new(INPUT.as_bytes().to_vec()), 4);
        let mut seqs = Vec::new();
        while let Some(event) = rx.recv().await {
            seqs.push(event.seq);
        }
        assert_eq!(seqs, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_blocking_feed_skips_malformed_lines() {
        let mut rx = ndjson_feed_blocking(Cursor::new(INPUT.as_bytes().to_vec()), 1);
        let mut seqs = Vec::new();
        while let Some(event) = rx.recv().await {
            seqs.push(event.seq);
        }
        assert_eq!(seqs, vec![1, 3]);
    }

    /// Yields its buffered bytes, then blocks like an idle pipe until the gate sender drops
    struct IdlePipe {
        buffered: Cursor<Vec<u8>>,
        gate: std_mpsc::Receiver<()>,
    }

    impl Read for IdlePipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.buffered.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            let _ = self.gate.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_blocking_feed_does_not_hold_the_runtime() {
        let (gate_tx, gate_rx) = std_mpsc::channel::<()>();
        let pipe = std::io::BufReader::new(IdlePipe {
            buffered: Cursor::new(b"{\"seq\":1,\"asset_id\":\"A\",\"last_trade_price\":\"0.5\"}\n".to_vec()),
            gate: gate_rx,
        });

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let first = runtime.block_on(async {
            let mut rx = ndjson_feed_blocking(pipe, 4);
            let first = rx.recv().await.map(|e| e.seq);
            // Consumer stops while the source is still open
            drop(rx);
            first
        });
        assert_eq!(first, Some(1));

        // Reader is parked in `read`, yet the runtime has nothing left to wait for
        let started = Instant::now();
        runtime.shutdown_timeout(Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(gate_tx);
    }
}
