//! Transport Pool Module
//!
//! Bounded pool of authenticated store connections with idle eviction
//! and a liveness probe on every borrow.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::transport::Connection;

struct IdleConn {
    conn: Connection,
    since: Instant,
}

impl std::fmt::Debug for IdleConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleConn").field("since", &self.since).finish()
    }
}

// == Transport Pool ==
/// Pool of idle connections to the remote store.
///
/// Borrowed connections are always liveness-tested first; a stale one
/// is discarded and replaced rather than surfaced to the caller. A
/// connection that fails mid-command must be dropped by its borrower,
/// not released back.
#[derive(Debug)]
pub struct TransportPool {
    addr: String,
    password: Option<String>,
    max_idle: usize,
    idle_timeout: Duration,
    idle: Mutex<VecDeque<IdleConn>>,
}

impl TransportPool {
    // == Constructor ==
    /// Creates a pool for the configured store address.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            addr: config.addr.clone(),
            password: config.password.clone(),
            max_idle: config.max_idle,
            idle_timeout: config.idle_timeout,
            idle: Mutex::new(VecDeque::new()),
        }
    }

    // == Acquire ==
    /// Borrows a live, authenticated connection.
    ///
    /// Prefers the most recently released idle connection; dials a new
    /// one when none survives the liveness test. A dial failure is a
    /// connectivity error with no internal retry.
    pub async fn acquire(&self) -> Result<Connection> {
        loop {
            let candidate = {
                let mut idle = self.idle.lock().await;
                idle.pop_back()
            };

            let Some(IdleConn { mut conn, since }) = candidate else {
                break;
            };

            if since.elapsed() >= self.idle_timeout {
                trace!("closing idle connection past timeout");
                continue;
            }

            match conn.ping().await {
                Ok(()) => {
                    trace!("reusing pooled connection");
                    return Ok(conn);
                }
                Err(err) => {
                    warn!("discarding stale pooled connection: {}", err);
                    continue;
                }
            }
        }

        self.dial().await
    }

    /// Dials and authenticates a fresh connection.
    ///
    /// With a password configured the handshake is AUTH; otherwise a
    /// PING probe confirms the store is answering.
    async fn dial(&self) -> Result<Connection> {
        let mut conn = Connection::connect(&self.addr).await?;
        match &self.password {
            Some(password) => conn.auth(password).await?,
            None => conn.ping().await?,
        }
        debug!(addr = %self.addr, "established store connection");
        Ok(conn)
    }

    // == Release ==
    /// Returns a healthy connection to the idle list.
    ///
    /// Connections beyond the idle bound are closed instead of pooled.
    pub async fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock().await;
        if idle.len() >= self.max_idle {
            trace!("idle list full, closing released connection");
            return;
        }
        idle.push_back(IdleConn {
            conn,
            since: Instant::now(),
        });
    }

    // == Reap ==
    /// Closes idle connections past the idle timeout.
    ///
    /// Returns the number of connections closed.
    pub async fn reap_idle(&self) -> usize {
        let mut idle = self.idle.lock().await;
        let before = idle.len();
        let timeout = self.idle_timeout;
        idle.retain(|entry| entry.since.elapsed() < timeout);
        before - idle.len()
    }

    /// Returns the current number of idle connections.
    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }
}
