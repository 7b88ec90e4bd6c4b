//! services/client/src/tasks/mod.rs
//!
//! The asynchronous drivers that sit between the UI (here, the CLI) and the
//! stores. Each task follows the same cycle: lock the store to issue the
//! `begin` command, release the lock across the I/O, then re-lock to `apply`
//! the outcome.

pub mod detection;
pub mod session;
pub mod stats;
