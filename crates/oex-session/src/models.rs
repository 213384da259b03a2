use chrono::{DateTime, Duration, Utc};
use oex_pkce::PkceVerifier;

/// An authorization request that was started but whose callback has not arrived yet
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    /// PKCE verifier whose challenge was sent to the authorization endpoint
    pub verifier: PkceVerifier,
    /// Opaque value the authorization server echoes back on the callback
    pub state: String,
}

impl PendingAuthorization {
    /// Pair an existing verifier with the `state` sent alongside it
    pub fn new(verifier: PkceVerifier, state: impl Into<String>) -> Self {
        Self {
            verifier,
            state: state.into(),
        }
    }

    /// A fresh verifier and state for a new flow
    pub fn generate() -> Self {
        Self::new(PkceVerifier::generate(), oex_pkce::generate_state())
    }
}

/// Access token obtained from the token endpoint
#[derive(Clone)]
pub struct AccessToken {
    /// Raw bearer credential
    pub value: String,
    /// `token_type` as reported by the authorization server
    pub token_type: Option<String>,
    /// Refresh token, when the authorization server issued one
    pub refresh_token: Option<String>,
    /// When the token stops being valid, derived from `expires_in`
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Token without any metadata
    pub fn bearer(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            token_type: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Whether `expires_at` has passed; tokens without expiry never expire
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Server-side state of one browser session
///
/// Holds at most one pending authorization and at most one access token.
/// Starting a new flow replaces the pending authorization, storing a token
/// clears it.
#[derive(Debug, Clone)]
pub struct SessionData {
    pending: Option<PendingAuthorization>,
    token: Option<AccessToken>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last time a request touched the session
    pub last_seen: DateTime<Utc>,
}

impl SessionData {
    /// Empty session first seen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            pending: None,
            token: None,
            created_at: now,
            last_seen: now,
        }
    }

    /// Record a new authorization attempt, replacing any earlier one
    pub fn begin_authorization(&mut self, pending: PendingAuthorization) {
        self.pending = Some(pending);
    }

    /// Remove and return the pending authorization
    ///
    /// A verifier is single use: once taken it is gone from the session,
    /// whatever the outcome of the exchange.
    pub fn take_pending(&mut self) -> Option<PendingAuthorization> {
        self.pending.take()
    }

    /// The authorization in progress, if any
    pub fn pending(&self) -> Option<&PendingAuthorization> {
        self.pending.as_ref()
    }

    /// Store the token obtained from a completed exchange
    pub fn store_token(&mut self, token: AccessToken) {
        self.pending = None;
        self.token = Some(token);
    }

    /// The current token, unless it has expired
    pub fn token(&self, now: DateTime<Utc>) -> Option<&AccessToken> {
        self.token.as_ref().filter(|token| !token.is_expired(now))
    }

    /// Drop the token, returning it
    pub fn clear_token(&mut self) -> Option<AccessToken> {
        self.token.take()
    }

    pub(crate) fn is_idle(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen > ttl
    }
}
