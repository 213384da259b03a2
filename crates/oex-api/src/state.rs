use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use oex_session::SessionStore;

use crate::{
    authz::{AuthServerClient, build_http_client},
    config::{ClientAgentConfig, Environment, ResourceGuardConfig},
    guard::cache::IntrospectionCache,
};

/// Shared state of the Client Agent
#[derive(Clone)]
pub struct ClientState {
    pub auth_server: AuthServerClient,
    /// Client used for the protected resource, shares the timeout of `auth_server`
    pub http: reqwest::Client,
    pub sessions: SessionStore,
    pub cookie_key: Key,
    pub environment: Environment,
    pub client_id: String,
    pub scope: String,
    pub redirect_uri: Option<String>,
    pub entry_url: String,
    pub resource_url: String,
    pub cookie_domain: Option<String>,
    pub session_ttl_minutes: i64,
    pub flow_expiry: chrono::Duration,
}

impl ClientState {
    pub fn new(config: ClientAgentConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let http = build_http_client(config.http_timeout())?;
        let auth_server = AuthServerClient::new(http.clone(), &config.auth_server_url)?;

        // Key::from panics below 64 bytes, validate() guarantees the length
        let cookie_key = Key::from(config.cookie_secret.as_bytes());

        Ok(Self {
            auth_server,
            http,
            sessions: SessionStore::new(chrono::Duration::minutes(config.session_ttl_minutes)),
            cookie_key,
            environment: config.env,
            client_id: config.client_id,
            scope: config.scope,
            redirect_uri: config.redirect_uri,
            entry_url: config.entry_url,
            resource_url: config.resource_url,
            cookie_domain: config.cookie_domain,
            session_ttl_minutes: config.session_ttl_minutes,
            flow_expiry: chrono::Duration::minutes(config.flow_expiry_minutes),
        })
    }
}

impl FromRef<ClientState> for Key {
    fn from_ref(state: &ClientState) -> Self {
        state.cookie_key.clone()
    }
}

/// Shared state of the Resource Guard
#[derive(Clone)]
pub struct GuardState {
    pub auth_server: AuthServerClient,
    pub required_scope: String,
    pub cache: Option<IntrospectionCache>,
    pub environment: Environment,
}

impl GuardState {
    pub fn new(config: &ResourceGuardConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let http = build_http_client(config.http_timeout())?;

        Ok(Self {
            auth_server: AuthServerClient::new(http, &config.auth_server_url)?,
            required_scope: config.required_scope.clone(),
            cache: config.introspection_cache_ttl().map(IntrospectionCache::new),
            environment: config.env,
        })
    }
}
