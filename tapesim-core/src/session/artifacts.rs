//! Session artifacts
//!
//! A save writes six files into one directory:
//!
//! ```text
//! user_actions.jsonl   every public mutating call
//! orders.jsonl         every order, final status
//! fills.jsonl          the fill log
//! ledger.jsonl         ledger entries (replayable into the same PortfolioSnapshot)
//! equity_curve.jsonl   equity points
//! run_manifest.json    summary + file list, written last
//! ```
//!
//! ## Save protocol
//!
//! 1. Create `.save.lock` with `create_new`; a second concurrent save into the same
//!    directory fails instead of interleaving. The guard removes the lock on drop.
//! 2. Remove any previous `run_manifest.json`.
//! 3. Each file is written to a hidden temp sibling, flushed, fsynced and renamed.
//! 4. `run_manifest.json` is written last, the same way. Its presence marks the directory
//!    as a complete save; any earlier failure returns `SimError::Artifact` and leaves no
//!    manifest behind.

use super::actions::{EquityPoint, UserAction};
use super::controller::Session;
use super::state::{DoneReason, SessionMode};
use crate::core::{Order, SimError, SimResult};
use crate::execution::{FeeSchedule, Fill};
use crate::ledger::{LedgerEntry, PortfolioSnapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

pub const USER_ACTIONS_FILE: &str = "user_actions.jsonl";
pub const ORDERS_FILE: &str = "orders.jsonl";
pub const FILLS_FILE: &str = "fills.jsonl";
pub const LEDGER_FILE: &str = "ledger.jsonl";
pub const EQUITY_CURVE_FILE: &str = "equity_curve.jsonl";
pub const MANIFEST_FILE: &str = "run_manifest.json";
pub const LOCK_FILE: &str = ".save.lock";

/// Summary statistics stored in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub order_count: usize,
    pub open_order_count: usize,
    pub fill_count: usize,
    pub ledger_entries: usize,
    pub user_actions: usize,
    pub crossed_observations: u64,
    pub portfolio: PortfolioSnapshot,
}

/// One written file and its line count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub name: String,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub session_id: String,
    pub tape_path: String,
    pub mode: SessionMode,
    pub final_cursor: u64,
    pub total_events: u64,
    pub done: bool,
    pub done_reason: Option<DoneReason>,
    pub latency: String,
    pub fees: FeeSchedule,
    pub fold: String,
    pub summary: RunSummary,
    pub files: Vec<ArtifactFile>,
    /// Wall-clock save time (ms since epoch)
    pub saved_at_ms: u64,
}

/// Locks older than this are reported as stale
pub const STALE_LOCK_AFTER: Duration = Duration::from_secs(10 * 60);

/// Exclusive save lock; removed on drop
///
/// The file records `pid=<pid> acquired_at_ms=<ms>` of the holder. A crashed save leaves
/// it behind; saves into that directory fail until it is deleted by hand.
#[derive(Debug)]
struct SaveLock {
    path: PathBuf,
}

impl SaveLock {
    fn acquire(dir: &Path) -> SimResult<Self> {
        let path = dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Self::held_error(&path));
            }
            Err(e) => return Err(SimError::artifact(&path, e)),
        };
        let lock = Self { path };
        writeln!(file, "pid={} acquired_at_ms={}", std::process::id(), now_ms())
            .and_then(|_| file.sync_all())
            .map_err(|e| SimError::artifact(&lock.path, e))?;
        Ok(lock)
    }

    /// Describe the current holder and how to clear a leftover lock
    fn held_error(path: &Path) -> SimError {
        let holder = fs::read_to_string(path).unwrap_or_default();
        let holder = holder.trim();
        let acquired_at_ms = holder
            .split_whitespace()
            .find_map(|field| field.strip_prefix("acquired_at_ms="))
            .and_then(|ms| ms.parse::<u64>().ok());
        let stale = acquired_at_ms
            .map(|ms| now_ms().saturating_sub(ms) > STALE_LOCK_AFTER.as_millis() as u64)
            .unwrap_or(false);
        if stale {
            warn!(path = %path.display(), holder, "Save lock looks stale");
        }
        let holder = if holder.is_empty() { "unknown holder" } else { holder };
        SimError::artifact(
            path,
            format!(
                "another save is in progress ({}{}); if no save is running, delete {}",
                holder,
                if stale { ", stale" } else { "" },
                path.display()
            ),
        )
    }
}

impl Drop for SaveLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove save lock");
        }
    }
}

/// Write `contents` to `dir/name` via temp file + fsync + rename
fn write_atomic<F>(dir: &Path, name: &str, contents: F) -> SimResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let final_path = dir.join(name);
    let tmp_path = dir.join(format!(".{}.tmp", name));

    let result = (|| -> std::io::Result<()> {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        contents(&mut writer)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SimError::artifact(&final_path, e)
    })
}

fn write_jsonl<'a, T, I>(dir: &Path, name: &str, items: I) -> SimResult<ArtifactFile>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut lines = 0usize;
    write_atomic(dir, name, |writer| {
        for item in items {
            serde_json::to_writer(&mut *writer, item)?;
            writeln!(writer)?;
            lines += 1;
        }
        Ok(())
    })?;
    debug!(file = name, lines, "Artifact written");
    Ok(ArtifactFile {
        name: name.to_string(),
        lines,
    })
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

/// Save every artifact of `session` into `dir`
pub fn save(session: &Session, dir: &Path) -> SimResult<RunManifest> {
    fs::create_dir_all(dir).map_err(|e| SimError::artifact(dir, e))?;
    let _lock = SaveLock::acquire(dir)?;

    let manifest_path = dir.join(MANIFEST_FILE);
    match fs::remove_file(&manifest_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(SimError::artifact(&manifest_path, e)),
    }

    let orders: Vec<&Order> = session.broker().orders().collect();
    let files = vec![
        write_jsonl::<UserAction, _>(dir, USER_ACTIONS_FILE, session.actions())?,
        write_jsonl::<Order, _>(dir, ORDERS_FILE, orders.iter().copied())?,
        write_jsonl::<Fill, _>(dir, FILLS_FILE, session.broker().fills())?,
        write_jsonl::<LedgerEntry, _>(dir, LEDGER_FILE, session.ledger().entries())?,
        write_jsonl::<EquityPoint, _>(dir, EQUITY_CURVE_FILE, session.equity_curve())?,
    ];

    let state = session.get_state();
    let manifest = RunManifest {
        session_id: session.id().to_string(),
        tape_path: session.source().to_string(),
        mode: session.mode(),
        final_cursor: state.cursor,
        total_events: state.total_events,
        done: state.done,
        done_reason: state.done_reason,
        latency: session.broker().latency_name(),
        fees: *session.broker().fees(),
        fold: session.ledger().fold_name().to_string(),
        summary: RunSummary {
            order_count: state.order_count,
            open_order_count: state.open_orders.len(),
            fill_count: state.fill_count,
            ledger_entries: session.ledger().len(),
            user_actions: session.actions().len(),
            crossed_observations: state.crossed_observations,
            portfolio: state.portfolio,
        },
        files,
        saved_at_ms: now_ms(),
    };

    write_atomic(dir, MANIFEST_FILE, |writer| {
        serde_json::to_writer_pretty(&mut *writer, &manifest)?;
        writeln!(writer)
    })?;
    Ok(manifest)
}

/// Read a JSONL artifact back into typed records
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> SimResult<Vec<T>> {
    let file = File::open(path).map_err(|e| SimError::artifact(path, e))?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| SimError::artifact(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| SimError::artifact(path, format!("line {}: {}", idx + 1, e)))?;
        records.push(record);
    }
    Ok(records)
}

/// Ledger entries of a completed save
pub fn read_ledger(dir: &Path) -> SimResult<Vec<LedgerEntry>> {
    read_manifest(dir)?;
    read_jsonl(&dir.join(LEDGER_FILE))
}

/// Manifest of a completed save; missing manifest means the save never completed
pub fn read_manifest(dir: &Path) -> SimResult<RunManifest> {
    let path = dir.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path).map_err(|e| SimError::artifact(&path, e))?;
    serde_json::from_str(&text).map_err(|e| SimError::artifact(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _lock = SaveLock::acquire(dir.path()).unwrap();
            assert!(dir.path().join(LOCK_FILE).exists());
            assert!(matches!(
                SaveLock::acquire(dir.path()),
                Err(SimError::Artifact { .. })
            ));
        }
        assert!(!dir.path().join(LOCK_FILE).exists());
        assert!(SaveLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_lock_records_holder() {
        let dir = tempfile::tempdir().unwrap();
        let _lock = SaveLock::acquire(dir.path()).unwrap();
        let contents = fs::read_to_string(dir.path().join(LOCK_FILE)).unwrap();
        assert!(contents.starts_with(&format!("pid={} acquired_at_ms=", std::process::id())));
    }

    #[test]
    fn test_leftover_lock_error_names_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);
        // Left behind by a save that crashed an hour ago
        let acquired_at_ms = now_ms() - 60 * 60 * 1000;
        fs::write(&path, format!("pid=4242 acquired_at_ms={}\n", acquired_at_ms)).unwrap();

        let err = SaveLock::acquire(dir.path()).unwrap_err().to_string();
        assert!(err.contains("pid=4242"), "{err}");
        assert!(err.contains("stale"), "{err}");
        assert!(err.contains(&format!("delete {}", path.display())), "{err}");

        fs::remove_file(&path).unwrap();
        assert!(SaveLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let values = vec![1u32, 2, 3];
        let file = write_jsonl::<u32, _>(dir.path(), "n.jsonl", &values).unwrap();
        assert_eq!(file.lines, 3);
        assert!(!dir.path().join(".n.jsonl.tmp").exists());
        let back: Vec<u32> = read_jsonl(&dir.path().join("n.jsonl")).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_read_ledger_requires_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LEDGER_FILE), "").unwrap();
        assert!(matches!(read_ledger(dir.path()), Err(SimError::Artifact { .. })));
    }
}
