use axum_extra::extract::PrivateCookieJar;
use oex_session::{SessionHandle, SessionId};

use super::cookies::{SESSION_COOKIE, create_session_cookie};
use crate::state::ClientState;

/// Lock the session named by the request's cookie, creating one when needed
///
/// The cookie is (re)issued on every request so its max-age follows the
/// sliding session TTL. A cookie that does not decrypt or does not name a live
/// session silently starts a new session.
pub async fn resolve(
    state: &ClientState,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, SessionId, SessionHandle) {
    let existing = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<SessionId>().ok());

    let (id, handle, created) = state.sessions.open_or_create(existing).await;
    if created && existing.is_some() {
        tracing::debug!(session_id = %id, "Stale session cookie replaced");
    }

    let cookie = create_session_cookie(
        id,
        &state.environment,
        state.session_ttl_minutes,
        state.cookie_domain.as_deref(),
    );

    (jar.add(cookie), id, handle)
}
