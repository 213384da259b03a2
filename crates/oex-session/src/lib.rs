//! In-memory, cookie-keyed session storage for the Client Agent.
//!
//! Each session sits behind its own async mutex. A request handler holds the
//! session's guard for as long as it works on the session, so two requests
//! carrying the same cookie are serialized while different sessions never
//! contend with each other.

/// Data held by one session
pub mod models;

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

pub use models::{AccessToken, PendingAuthorization, SessionData};

/// Exclusive access to one session for the duration of a request
pub type SessionHandle = OwnedMutexGuard<SessionData>;

/// Identifier carried in the session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Fresh random (v4) id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Session store shared by all request handlers
///
/// Sessions expire after `ttl` without activity. Expired sessions are
/// treated as absent on access and removed by [`SessionStore::purge_expired`].
/// Shared, in-memory map of live sessions
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<SessionData>>>>>,
    ttl: Duration,
}

impl SessionStore {
    /// Empty store whose sessions expire after `ttl` without a request
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Idle lifetime of a session
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create an empty session and lock it
    pub async fn create(&self) -> (SessionId, SessionHandle) {
        let id = SessionId::new();
        let entry = Arc::new(Mutex::new(SessionData::new(Utc::now())));
        // Locked before it becomes visible, nobody else can be waiting on it
        let handle = Arc::clone(&entry).lock_owned().await;

        self.sessions.write().await.insert(id, entry);
        tracing::debug!(session_id = %id, "Session created");

        (id, handle)
    }

    /// Lock an existing session
    ///
    /// Returns `None` when the session is unknown or has been idle for longer
    /// than the store's TTL. Waits while another request holds the session.
    pub async fn open(&self, id: SessionId) -> Option<SessionHandle> {
        let entry = self.sessions.read().await.get(&id).cloned()?;
        let mut handle = entry.lock_owned().await;

        let now = Utc::now();
        if handle.is_idle(self.ttl, now) {
            drop(handle);
            self.sessions.write().await.remove(&id);
            tracing::debug!(session_id = %id, "Session expired");
            return None;
        }

        handle.last_seen = now;
        Some(handle)
    }

    /// Lock the session named by `id`, or create a new one if that fails
    ///
    /// The returned flag is `true` when a new session was created and the
    /// caller has to hand its id to the browser.
    pub async fn open_or_create(&self, id: Option<SessionId>) -> (SessionId, SessionHandle, bool) {
        if let Some(id) = id {
            if let Some(handle) = self.open(id).await {
                return (id, handle, false);
            }
        }

        let (id, handle) = self.create().await;
        (id, handle, true)
    }

    /// Forget a session, returning whether it existed
    pub async fn remove(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drop every idle session, returning how many were removed
    ///
    /// Sessions locked by an in-flight request are in use and are kept.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(data) => !data.is_idle(self.ttl, now),
            Err(_) => true,
        });

        before - sessions.len()
    }

    /// Number of stored sessions, idle ones included until the next purge
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is stored
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
