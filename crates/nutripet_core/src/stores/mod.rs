//! crates/nutripet_core/src/stores/mod.rs
//!
//! The client-side stores: pure, synchronous state machines with
//! `begin_*`/`apply_*` command pairs. An async driver performs the I/O between
//! `begin` and `apply`; the stores themselves never touch the network.

pub mod detection;
pub mod session;
pub mod stats;

pub use detection::{DetectionPhase, DetectionWorkflow, WorkflowError};
pub use session::{SessionStatus, SessionStore};
pub use stats::StatsStore;
