//! Idle Connection Reaper
//!
//! Background task that periodically closes pooled connections that
//! have sat idle past the configured timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::transport::TransportPool;

/// Spawns a background task that periodically reaps idle connections.
///
/// The pool also evicts lazily on acquire; the reaper exists so idle
/// sockets are not held open indefinitely between cache operations.
///
/// # Arguments
/// * `pool` - Shared transport pool to reap
/// * `reap_interval_secs` - Interval in seconds between reap runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the
/// task during shutdown.
pub fn spawn_reaper_task(pool: Arc<TransportPool>, reap_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(reap_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting idle-connection reaper with interval of {} seconds",
            reap_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = pool.reap_idle().await;

            if removed > 0 {
                info!("Idle reaper: closed {} idle connections", removed);
            } else {
                debug!("Idle reaper: nothing to close");
            }
        }
    })
}
