//! Kill switch for live runs
//!
//! A cloneable cancellation handle shared between whoever wants a live run stopped
//! (Ctrl-C handler, a test, an embedding service) and the shadow runner that must stop.
//!
//! ## Usage
//!
//! ```
//! use tapesim_core::resilience::KillSwitch;
//!
//! let kill_switch = KillSwitch::new();
//! let handle = kill_switch.clone();
//! // Any thread may stop the run; the shadow binary does this from its Ctrl-C handler
//! std::thread::spawn(move || handle.trigger("operator")).join().unwrap();
//! assert!(kill_switch.should_stop());
//! assert_eq!(kill_switch.reason().as_deref(), Some("operator"));
//!
//! // In the runner's select loop:
//! // _ = kill_switch.cancelled() => { /* finish CANCELLED */ }
//! ```
//!
//! Triggering is idempotent: the first reason wins.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Kill switch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KillSwitchState {
    /// Normal operation
    Running = 0,
    /// Cancellation requested
    Triggered = 1,
}

impl From<u8> for KillSwitchState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Triggered,
            _ => Self::Running,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KillSwitch {
    state: Arc<AtomicU8>,
    reason: Arc<parking_lot::Mutex<Option<String>>>,
    triggered_at: Arc<parking_lot::Mutex<Option<SystemTime>>>,
    notify: Arc<Notify>,
}

impl KillSwitch {
    /// Create a new kill switch in Running state
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(KillSwitchState::Running as u8)),
            reason: Arc::new(parking_lot::Mutex::new(None)),
            triggered_at: Arc::new(parking_lot::Mutex::new(None)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Request cancellation; wakes every task waiting in [`cancelled`](Self::cancelled)
    pub fn trigger(&self, reason: &str) {
        let previous = self.state.compare_exchange(
            KillSwitchState::Running as u8,
            KillSwitchState::Triggered as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if previous.is_err() {
            debug!(reason, "Kill switch already triggered");
            return;
        }

        warn!(reason, "Kill switch triggered");
        *self.reason.lock() = Some(reason.to_string());
        *self.triggered_at.lock() = Some(SystemTime::now());
        self.notify.notify_waiters();
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.state() == KillSwitchState::Triggered
    }

    pub fn state(&self) -> KillSwitchState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    pub fn triggered_at(&self) -> Option<SystemTime> {
        *self.triggered_at.lock()
    }

    /// Resolve once the switch is triggered (immediately if it already was)
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a trigger in between is not missed
            notified.as_mut().enable();
            if self.should_stop() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}
