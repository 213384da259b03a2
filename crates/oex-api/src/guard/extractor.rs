use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::authorize;
use crate::{
    authz::IntrospectionError, metrics, middleware::request_id::RequestId, state::GuardState,
};

/// Reasons a request is turned away by the Resource Guard
///
/// The distinction is for logs and metrics. Every variant produces the same
/// response: `401`, `WWW-Authenticate: Bearer` and an empty body.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("No Authorization header")]
    MissingCredential,
    #[error("Authorization header is not a bearer credential")]
    MalformedCredential,
    #[error("Introspection failed: {0}")]
    Introspection(#[from] IntrospectionError),
    #[error("Token is not active")]
    Inactive,
    #[error("Token lacks the required scope")]
    InsufficientScope,
}

impl GuardError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::Introspection(IntrospectionError::Transport(_)) => "transport_failure",
            Self::Introspection(_) => "invalid_introspection_response",
            Self::Inactive => "inactive_token",
            Self::InsufficientScope => "insufficient_scope",
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let reason = self.reason();
        match &self {
            Self::Introspection(IntrospectionError::Transport(_)) => {
                tracing::error!(reason, error = %self, "Access denied, authorization server unreachable");
            }
            Self::Introspection(_) => {
                tracing::warn!(reason, error = %self, "Access denied, bad introspection response");
            }
            _ => tracing::info!(reason, "Access denied"),
        }
        metrics::record_guard_decision(reason);

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
        )
            .into_response()
    }
}

/// Extract the credential of an `Authorization: Bearer <token>` header
///
/// The header is split at its first space. The scheme is compared
/// case-insensitively and the rest, without leading spaces, is the token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, GuardError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(GuardError::MissingCredential)?
        .to_str()
        .map_err(|_| GuardError::MalformedCredential)?;

    let (scheme, credential) = value
        .split_once(' ')
        .ok_or(GuardError::MalformedCredential)?;

    let credential = credential.trim_start_matches(' ');
    if !scheme.eq_ignore_ascii_case("bearer") || credential.is_empty() {
        return Err(GuardError::MalformedCredential);
    }

    Ok(credential)
}

/// A request whose bearer token the authorization server vouched for
///
/// Use this in Resource Guard handlers; the handler only runs when the token
/// is active and carries the required scope.
///
/// # Example
/// ```
/// use axum::Json;
/// use oex_api::guard::Authorized;
///
/// async fn protected(auth: Authorized) -> Json<Vec<String>> {
///     Json(auth.scopes)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authorized {
    pub username: Option<String>,
    pub scopes: Vec<String>,
}

impl<S> FromRequestParts<S> for Authorized
where
    GuardState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GuardError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let guard = GuardState::from_ref(state);

        // Checked before anything else, a request without credential never
        // reaches the authorization server
        let token = bearer_token(&parts.headers)?;

        let request_id = parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate);

        let grant = authorize(&guard, token, &request_id).await?;

        Ok(Self {
            username: grant.username.clone(),
            scopes: grant.scopes().map(String::from).collect(),
        })
    }
}
