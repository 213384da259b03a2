//! Bounded cache of positive introspection results.
//!
//! Disabled unless a TTL is configured. Entries never outlive the TTL nor the
//! `expires_in` the authorization server reported for the token, and only
//! active results are stored, so a denial is always re-checked.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::authz::IntrospectionResponse;

/// Upper bound on cached tokens
pub const MAX_ENTRIES: usize = 10_000;

/// Hex SHA-256 of a bearer token
///
/// Used as cache key and, shortened, as the token's identity in logs.
pub fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Debug, Clone)]
struct CachedGrant {
    response: IntrospectionResponse,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct IntrospectionCache {
    entries: Arc<RwLock<HashMap<String, CachedGrant>>>,
    ttl: Duration,
}

impl IntrospectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get(&self, token: &str) -> Option<IntrospectionResponse> {
        let key = token_fingerprint(token);
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(grant) if grant.expires_at > now => return Some(grant.response.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        self.entries.write().await.remove(&key);
        None
    }

    /// Remember an introspection result; inactive results are ignored
    pub async fn insert(&self, token: &str, response: &IntrospectionResponse) {
        if !response.active {
            return;
        }

        let ttl = match response.expires_in {
            Some(0) => return,
            Some(secs) => self.ttl.min(Duration::from_secs(secs)),
            None => self.ttl,
        };

        let mut entries = self.entries.write().await;
        if entries.len() >= MAX_ENTRIES {
            let now = Instant::now();
            entries.retain(|_, grant| grant.expires_at > now);
            if entries.len() >= MAX_ENTRIES {
                tracing::warn!("Introspection cache full, result not cached");
                return;
            }
        }

        entries.insert(
            token_fingerprint(token),
            CachedGrant {
                response: response.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, grant| grant.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
