//! Resource Guard: bearer token introspection in front of a protected resource.
//!
//! Every request is checked against the authorization server's introspection
//! endpoint, unless a cached positive result is still fresh. Any failure ends
//! in the same bare 401.

pub mod cache;
pub mod extractor;
pub mod routes;

pub use extractor::{Authorized, GuardError, bearer_token};
pub use routes::routes;

use crate::{
    authz::IntrospectionResponse, middleware::request_id::RequestId, state::GuardState,
};

/// Decide whether `token` may reach the protected resource
///
/// Returns the introspection result when the token is active and carries the
/// guard's required scope.
pub async fn authorize(
    guard: &GuardState,
    token: &str,
    request_id: &RequestId,
) -> Result<IntrospectionResponse, GuardError> {
    let fingerprint = cache::token_fingerprint(token);
    let fingerprint = &fingerprint[..12];

    let cached = match &guard.cache {
        Some(cache) => cache.get(token).await,
        None => None,
    };

    let response = match cached {
        Some(response) => {
            tracing::debug!(token = fingerprint, "Introspection served from cache");
            response
        }
        None => {
            let response = guard.auth_server.introspect(token, request_id).await?;
            if let Some(cache) = &guard.cache {
                cache.insert(token, &response).await;
            }
            response
        }
    };

    if !response.active {
        return Err(GuardError::Inactive);
    }
    if !response.has_scope(&guard.required_scope) {
        tracing::debug!(
            token = fingerprint,
            scope = response.scope.as_deref().unwrap_or_default(),
            required = %guard.required_scope,
            "Scope mismatch"
        );
        return Err(GuardError::InsufficientScope);
    }

    tracing::debug!(token = fingerprint, username = ?response.username, "Access granted");
    crate::metrics::record_guard_decision("granted");

    Ok(response)
}
