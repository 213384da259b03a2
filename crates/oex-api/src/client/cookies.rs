use axum_extra::extract::cookie::{Cookie, SameSite};
use oex_session::SessionId;

use crate::config::Environment;

/// Name of the encrypted cookie carrying the session id
pub const SESSION_COOKIE: &str = "oex_session";

/// Create the session cookie
///
/// Cookies are secure (HTTPS-only) in production and usable over plain HTTP
/// in development. `SameSite=Lax` keeps the cookie on the top-level redirect
/// back from the authorization server, which the callback depends on.
pub fn create_session_cookie(
    session_id: SessionId,
    environment: &Environment,
    ttl_minutes: i64,
    cookie_domain: Option<&str>,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .max_age(time::Duration::minutes(ttl_minutes))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(environment.is_production())
        .build();

    if let Some(domain) = cookie_domain {
        cookie.set_domain(domain.to_string());
    }

    cookie
}
