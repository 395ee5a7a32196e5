//! Campaign sending: pacing, events and the orchestrator state machine.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial module structure

pub mod events;
pub mod orchestrator;
pub mod pacing;

pub use events::{SendEvent, Severity};
pub use orchestrator::{
    QueueStatus, ReadyRun, RunState, RunSummary, SendOrchestrator, SendQueue, StartOutcome,
};
pub use pacing::{Pacing, MAX_RETRIES};
