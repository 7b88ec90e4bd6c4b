//! services/client/src/tasks/stats.rs
//!
//! Drives the stats query store. Serves from cache when the snapshot is
//! fresh; on refresh failure the stale snapshot stays available.

use crate::error::ClientError;
use crate::state::AppState;
use nutripet_core::domain::StatsSnapshot;
use tracing::{error, info};

/// Fetches the aggregate stats, or serves the cached snapshot when it is
/// still fresh. Returns `Ok(None)` when a fetch is already in flight.
pub async fn fetch(app: &AppState) -> Result<Option<StatsSnapshot>, ClientError> {
    let ticket = {
        let mut stats = app.stats.lock().await;
        match stats.begin_fetch() {
            Some(ticket) => ticket,
            None => {
                if let Some(snapshot) = stats.snapshot() {
                    info!("Stats served from cache.");
                    return Ok(Some(snapshot.clone()));
                }
                info!("A stats fetch is already in flight; command ignored.");
                return Ok(None);
            }
        }
    };

    let result = app.api.fetch_stats().await;

    let mut stats = app.stats.lock().await;
    match result {
        Ok(snapshot) => {
            info!(
                "Stats refreshed for the last {} days.",
                snapshot.period.days
            );
            stats.apply_fetch(ticket, Ok(snapshot.clone()));
            Ok(Some(snapshot))
        }
        Err(err) => {
            error!("Stats fetch failed: {}", err);
            stats.apply_fetch(ticket, Err(err.clone()));
            Err(ClientError::Gateway(err))
        }
    }
}

/// Marks the cached snapshot stale so the next `fetch` refetches.
pub async fn invalidate(app: &AppState) {
    app.stats.lock().await.invalidate();
}
