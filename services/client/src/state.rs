//! services/client/src/state.rs
//!
//! Defines the application's shared state: the adapters behind their ports and
//! the three stores, each behind its own lock.

use crate::config::Config;
use nutripet_core::ports::{BackendApi, ImageNormalizer, TokenStore};
use nutripet_core::stores::{DetectionWorkflow, SessionStore, StatsStore};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The shared application state, created once at startup and passed to every
/// consuming unit. No ambient singleton: whoever needs the stores gets this
/// context object.
///
/// Each store sits behind its own mutex, which is what serializes commands
/// against one store while letting calls across different stores overlap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api: Arc<dyn BackendApi>,
    pub tokens: Arc<dyn TokenStore>,
    pub normalizer: Arc<dyn ImageNormalizer>,
    pub session: Arc<Mutex<SessionStore>>,
    pub detection: Arc<Mutex<DetectionWorkflow>>,
    pub stats: Arc<Mutex<StatsStore>>,
}

impl AppState {
    /// Creates the state with fresh (empty) stores.
    pub fn new(
        config: Arc<Config>,
        api: Arc<dyn BackendApi>,
        tokens: Arc<dyn TokenStore>,
        normalizer: Arc<dyn ImageNormalizer>,
    ) -> Self {
        Self {
            config,
            api,
            tokens,
            normalizer,
            session: Arc::new(Mutex::new(SessionStore::new())),
            detection: Arc::new(Mutex::new(DetectionWorkflow::new())),
            stats: Arc::new(Mutex::new(StatsStore::new())),
        }
    }
}
