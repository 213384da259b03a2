use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::PrivateCookieJar;
use chrono::Utc;
use oex_session::{AccessToken, PendingAuthorization, SessionData};
use serde::Deserialize;

use super::{page, resource, session};
use crate::{
    authz::AuthorizationRequest, error::ApiError, middleware::request_id::RequestId,
    state::ClientState,
};

/// Path of the Client Agent's single entry route
pub const ENTRY_PATH: &str = "/";

pub fn routes() -> Router<ClientState> {
    Router::new().route(ENTRY_PATH, get(entry))
}

/// Query parameters the authorization server may append when redirecting back
#[derive(Debug, Default, Deserialize)]
pub struct EntryParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

async fn entry(
    State(state): State<ClientState>,
    jar: PrivateCookieJar,
    request_id: RequestId,
    Query(params): Query<EntryParams>,
) -> Response {
    let (jar, session_id, mut session) = session::resolve(&state, jar).await;
    tracing::debug!(session_id = %session_id, "Entry request");

    let outcome = drive_flow(&state, &mut session, params, &request_id).await;

    (jar, outcome).into_response()
}

/// Advance the session's authorization flow by one step
///
/// Priority: an error from the authorization server, then a callback code,
/// then an existing token, otherwise a new flow is started.
async fn drive_flow(
    state: &ClientState,
    session: &mut SessionData,
    params: EntryParams,
    request_id: &RequestId,
) -> Result<Response, ApiError> {
    if let Some(error) = params.error {
        // The attempt is over, its verifier must not be reused
        session.take_pending();
        tracing::info!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or_default(),
            "Authorization server returned an error"
        );
        return Ok(page::protocol_error_text(&error, params.error_description.as_deref()).into_response());
    }

    if let Some(code) = params.code {
        let token = exchange_code(state, session, &code, params.state.as_deref(), request_id).await?;
        session.store_token(token);
        tracing::info!("Access token obtained");

        // Drop ?code= from the address bar so a reload cannot replay it
        return Ok(found(&state.entry_url));
    }

    if let Some(token) = session.token(Utc::now()).cloned() {
        return show_resource(state, session, &token, request_id).await;
    }

    Ok(start_authorization(state, session))
}

/// Generate a verifier and state, remember them and send the browser to `/authorize`
fn start_authorization(state: &ClientState, session: &mut SessionData) -> Response {
    let pending = PendingAuthorization::generate();
    let challenge = pending.verifier.challenge();

    let url = state.auth_server.authorize_url(&AuthorizationRequest {
        client_id: &state.client_id,
        scope: &state.scope,
        code_challenge: &challenge,
        state: &pending.state,
        redirect_uri: state.redirect_uri.as_deref(),
    });

    session.begin_authorization(pending);
    tracing::debug!("Authorization flow started");

    found(url.as_str())
}

async fn exchange_code(
    state: &ClientState,
    session: &mut SessionData,
    code: &str,
    callback_state: Option<&str>,
    request_id: &RequestId,
) -> Result<AccessToken, ApiError> {
    // Taken, not read: the verifier is gone whatever happens next
    let pending = session.take_pending().ok_or(ApiError::MissingVerifier)?;

    if pending.verifier.is_expired(state.flow_expiry, Utc::now()) {
        return Err(ApiError::FlowExpired);
    }
    if callback_state != Some(pending.state.as_str()) {
        return Err(ApiError::StateMismatch);
    }

    let token = state
        .auth_server
        .exchange_code(
            code,
            &state.client_id,
            &pending.verifier,
            state.redirect_uri.as_deref(),
            request_id,
        )
        .await?;

    Ok(token)
}

async fn show_resource(
    state: &ClientState,
    session: &mut SessionData,
    token: &AccessToken,
    request_id: &RequestId,
) -> Result<Response, ApiError> {
    let response = resource::fetch(&state.http, &state.resource_url, &token.value, request_id)
        .await
        .map_err(ApiError::ResourceUnavailable)?;

    if response.status == StatusCode::UNAUTHORIZED {
        tracing::info!("Resource rejected the session token, starting over");
        session.clear_token();
        return Ok(found(&state.entry_url));
    }

    Ok(page::resource_page(response.status, &response.body).into_response())
}

/// `302 Found` to `location`
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
