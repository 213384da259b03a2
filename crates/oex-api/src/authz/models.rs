use chrono::{DateTime, Duration, Utc};
use oex_session::AccessToken;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Body of a token endpoint response
///
/// Only `access_token` is required. The remaining fields are kept when the
/// authorization server sends them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Turn the response into a session token, failing when `access_token` is missing or empty
    pub fn into_access_token(self, now: DateTime<Utc>) -> Result<AccessToken, ExchangeError> {
        let value = self
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(ExchangeError::MissingAccessToken)?;

        Ok(AccessToken {
            value,
            token_type: self.token_type,
            refresh_token: self.refresh_token,
            // A lifetime too large to represent is treated as no expiry
            expires_at: self
                .expires_in
                .filter(|secs| *secs > 0)
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime)),
        })
    }
}

/// Error body defined by RFC 6749 §5.2
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// Body of an introspection (`/verify`) response
///
/// Inactive tokens come back as `{"active":false}` without any other field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl IntrospectionResponse {
    /// Individual scope tokens of the space delimited `scope` field
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or_default().split_whitespace()
    }

    /// Whether `required` is one of the scope tokens
    ///
    /// Matching is per token: `"mrs profile"` grants `"mrs"`, `"mrsx"` does not.
    pub fn has_scope(&self, required: &str) -> bool {
        self.scopes().any(|scope| scope == required)
    }

    /// Active and carrying the required scope
    pub fn grants(&self, required_scope: &str) -> bool {
        self.active && self.has_scope(required_scope)
    }
}

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Token endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Token endpoint rejected the exchange with {status}: {error}")]
    Rejected { status: StatusCode, error: String },
    #[error("Token endpoint returned an unparseable body: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("Token response has no access_token")]
    MissingAccessToken,
}

#[derive(Error, Debug)]
pub enum IntrospectionError {
    #[error("Introspection endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Introspection endpoint answered {0}")]
    Status(StatusCode),
    #[error("Introspection endpoint returned an unparseable body: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}
