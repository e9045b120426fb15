//! Sessions: controller, observable state, artifacts and the registry

pub mod actions;
pub mod artifacts;
pub mod controller;
pub mod registry;
pub mod state;

pub use actions::{Action, EquityPoint, UserAction};
pub use artifacts::{read_ledger, read_manifest, RunManifest, RunSummary};
pub use controller::{OrderAck, Session, StepReport};
pub use registry::{SessionHandle, SessionRegistry};
pub use state::{AssetState, DoneReason, SessionMode, SessionState, SessionStatus};
