//! Background maintenance tasks.
//!
//! Expired sessions and cache entries are already ignored on access; these
//! jobs only reclaim their memory.

use std::time::Duration;

use oex_session::SessionStore;
use tokio::time::interval;

use crate::{guard::cache::IntrospectionCache, metrics};

/// How often expired sessions are swept
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// How often expired introspection results are swept
pub const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the Client Agent's session sweep
pub fn start_session_cleanup(sessions: SessionStore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(SESSION_SWEEP_INTERVAL);
        // The first tick completes immediately, nothing to sweep at startup
        interval.tick().await;

        loop {
            interval.tick().await;

            match sessions.purge_expired().await {
                0 => tracing::debug!("Session sweep complete: no expired sessions"),
                removed => {
                    metrics::record_sessions_purged(removed);
                    tracing::info!(removed, "Session sweep complete");
                }
            }
        }
    })
}

/// Start the Resource Guard's cache sweep
pub fn start_cache_cleanup(cache: IntrospectionCache) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(CACHE_SWEEP_INTERVAL);
        interval.tick().await;

        loop {
            interval.tick().await;

            let removed = cache.purge_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "Introspection cache sweep complete");
            }
        }
    })
}
