use chrono::Utc;
use oex_pkce::{CODE_CHALLENGE_METHOD, PkceVerifier};
use oex_session::AccessToken;
use reqwest::Url;

use super::models::{
    ExchangeError, IntrospectionError, IntrospectionResponse, OAuthErrorResponse, TokenResponse,
};
use crate::{
    metrics,
    middleware::request_id::{REQUEST_ID_HEADER, RequestId},
};

pub const AUTHORIZE_PATH: &str = "/authorize";
pub const TOKEN_PATH: &str = "/token";
pub const VERIFY_PATH: &str = "/verify";

/// Parameters of the redirect to the authorization endpoint
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationRequest<'a> {
    pub client_id: &'a str,
    pub scope: &'a str,
    pub code_challenge: &'a str,
    pub state: &'a str,
    pub redirect_uri: Option<&'a str>,
}

/// Endpoints of one authorization server plus the HTTP client used to call them
///
/// The `reqwest::Client` carries the request timeout, so a slow authorization
/// server surfaces as a transport error.
#[derive(Debug, Clone)]
pub struct AuthServerClient {
    http: reqwest::Client,
    authorize_endpoint: Url,
    token_endpoint: Url,
    verify_endpoint: Url,
}

impl AuthServerClient {
    /// Create a client for the authorization server rooted at `base_url`
    ///
    /// `base_url` may contain a path prefix (`https://host/auth`), endpoint
    /// paths are appended to it.
    pub fn new(http: reqwest::Client, base_url: &str) -> anyhow::Result<Self> {
        let base = base_url.trim_end_matches('/');

        Ok(Self {
            http,
            authorize_endpoint: Url::parse(&format!("{base}{AUTHORIZE_PATH}"))?,
            token_endpoint: Url::parse(&format!("{base}{TOKEN_PATH}"))?,
            verify_endpoint: Url::parse(&format!("{base}{VERIFY_PATH}"))?,
        })
    }

    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    pub fn verify_endpoint(&self) -> &Url {
        &self.verify_endpoint
    }

    /// Build the URL the user agent is redirected to when a flow starts
    pub fn authorize_url(&self, request: &AuthorizationRequest<'_>) -> Url {
        let mut url = self.authorize_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", request.client_id)
                .append_pair("response_type", "code")
                .append_pair("scope", request.scope)
                .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
                .append_pair("code_challenge", request.code_challenge)
                .append_pair("state", request.state);
            if let Some(redirect_uri) = request.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
        }
        url
    }

    /// Exchange an authorization code for an access token
    ///
    /// # Arguments
    /// * `code` - Authorization code from the callback
    /// * `client_id` - Client identifier the flow was started with
    /// * `verifier` - PKCE verifier whose challenge was sent to `/authorize`
    /// * `redirect_uri` - Redirect URI, when one was sent to `/authorize`
    pub async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        verifier: &PkceVerifier,
        redirect_uri: Option<&str>,
        request_id: &RequestId,
    ) -> Result<AccessToken, ExchangeError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("code_verifier", verifier.secret()),
        ];
        if let Some(redirect_uri) = redirect_uri {
            form.push(("redirect_uri", redirect_uri));
        }

        let result = self.request_token(&form, request_id).await;
        metrics::record_auth_event("token_exchange", "authorization_code", result.is_ok());
        result
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
        request_id: &RequestId,
    ) -> Result<AccessToken, ExchangeError> {
        let response = self
            .http
            .post(self.token_endpoint.clone())
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .form(form)
            .send()
            .await
            .map_err(ExchangeError::Transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(ExchangeError::Transport)?;

        if !status.is_success() {
            let error = serde_json::from_slice::<OAuthErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{} ({description})", e.error),
                    None => e.error,
                })
                .unwrap_or_else(|_| "unspecified".to_string());
            return Err(ExchangeError::Rejected { status, error });
        }

        serde_json::from_slice::<TokenResponse>(&body)?.into_access_token(Utc::now())
    }

    /// Ask the authorization server about a bearer token
    ///
    /// The result is returned as reported; deciding whether it grants access is
    /// up to the caller.
    pub async fn introspect(
        &self,
        token: &str,
        request_id: &RequestId,
    ) -> Result<IntrospectionResponse, IntrospectionError> {
        let result = self.request_introspection(token, request_id).await;
        metrics::record_auth_event("introspection", "token", result.is_ok());
        result
    }

    async fn request_introspection(
        &self,
        token: &str,
        request_id: &RequestId,
    ) -> Result<IntrospectionResponse, IntrospectionError> {
        let response = self
            .http
            .post(self.verify_endpoint.clone())
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .form(&[("token", token)])
            .send()
            .await
            .map_err(IntrospectionError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntrospectionError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(IntrospectionError::Transport)?;

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Build the shared outbound HTTP client with a bounded total and connect timeout
pub fn build_http_client(timeout: std::time::Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}
