//! Gated, retried recovery cycles
//!
//! The [`RecoveryOrchestrator`] owns the decision of whether and how often to
//! act on a detection; [`RecoveryState`] carries the bookkeeping between
//! cycles and every wait goes through a [`Clock`].

pub mod clock;
pub mod orchestrator;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use orchestrator::{CycleOutcome, RecoveryOrchestrator, SkipReason, backoff};
pub use state::RecoveryState;
