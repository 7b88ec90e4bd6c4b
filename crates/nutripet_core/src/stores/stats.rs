//! crates/nutripet_core/src/stores/stats.rs
//!
//! Fetches and caches the aggregate nutrition/character statistics. Stats are
//! a "view", not a transaction: a failed refresh keeps the last good snapshot
//! around instead of blanking it.

use crate::domain::StatsSnapshot;
use crate::ports::GatewayError;

/// Ties an in-flight stats fetch to the store generation that issued it.
#[derive(Debug, Clone, Copy)]
pub struct FetchTicket {
    seq: u64,
}

/// The stats query store.
#[derive(Debug)]
pub struct StatsStore {
    snapshot: Option<StatsSnapshot>,
    stale: bool,
    fetching: bool,
    error: Option<String>,
    seq: u64,
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsStore {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            stale: false,
            fetching: false,
            error: None,
            seq: 0,
        }
    }

    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Starts a fetch, or returns `None` when there is nothing to do: a fresh
    /// snapshot is already cached, or a fetch is already in flight.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.fetching {
            return None;
        }
        if self.snapshot.is_some() && !self.stale {
            return None;
        }
        self.seq += 1;
        self.fetching = true;
        Some(FetchTicket { seq: self.seq })
    }

    /// Applies the outcome of a fetch. On failure the last good snapshot is
    /// preserved and the error reported separately.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<StatsSnapshot, GatewayError>) {
        if ticket.seq != self.seq {
            return;
        }
        self.fetching = false;
        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.stale = false;
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.to_string());
            }
        }
    }

    /// Marks the cached snapshot stale so the next fetch actually refetches.
    /// The data itself stays available until fresher data replaces it.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Drops the cache entirely (e.g. on logout, when the snapshot belongs to
    /// another user).
    pub fn clear(&mut self) {
        self.seq += 1;
        self.snapshot = None;
        self.stale = false;
        self.fetching = false;
        self.error = None;
    }
}
