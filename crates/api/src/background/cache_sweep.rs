//! Periodic purge of expired result cache entries.
//!
//! Reads already treat expired entries as absent; the sweep only reclaims
//! the space they occupy.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use dancegen_core::store::ResultStore;

/// Run the sweep loop every `interval` until `cancel` is triggered.
pub async fn run(store: Arc<dyn ResultStore>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        backend = store.backend(),
        interval_secs = interval.as_secs(),
        "Cache sweep started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Cache sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match store.purge_expired(Utc::now()).await {
                    Ok(0) => tracing::debug!("Cache sweep: nothing expired"),
                    Ok(purged) => tracing::info!(purged, "Cache sweep: purged expired entries"),
                    Err(e) => tracing::error!(error = %e, "Cache sweep failed"),
                }
            }
        }
    }
}
