//! Environment based configuration for both services.
//!
//! Values are read from prefixed environment variables (`CLIENT_AGENT_*` and
//! `RESOURCE_GUARD_*`), optionally loaded from a `.env` file first.

use std::{net::SocketAddr, time::Duration};

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

/// Minimum length of the secret the private cookie key is derived from
pub const MIN_COOKIE_SECRET_LEN: usize = 64;

/// Upper bound for session and flow lifetimes, one year
pub const MAX_LIFETIME_MINUTES: i64 = 525_600;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid URL in {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
    #[error("COOKIE_SECRET must be at least {MIN_COOKIE_SECRET_LEN} bytes, got {0}")]
    CookieSecretTooShort(usize),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("RESOURCE_GUARD_REQUIRED_SCOPE must be a single scope token, got {0:?}")]
    CompoundScope(String),
    #[error("HTTP_TIMEOUT_SECS must be greater than zero")]
    ZeroTimeout,
    #[error("{name} must be between 1 and {MAX_LIFETIME_MINUTES} minutes, got {value}")]
    LifetimeOutOfRange { name: &'static str, value: i64 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[serde(alias = "dev")]
    Development,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

fn default_client_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_guard_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn default_http_timeout_secs() -> u64 {
    5
}

fn default_session_ttl_minutes() -> i64 {
    60
}

fn default_flow_expiry_minutes() -> i64 {
    10
}

/// Configuration of the Client Agent (`CLIENT_AGENT_*`)
#[derive(Clone, Debug, Deserialize)]
pub struct ClientAgentConfig {
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_client_bind_addr")]
    pub bind_addr: SocketAddr,
    pub client_id: String,
    /// Space delimited scopes requested at the authorization endpoint
    pub scope: String,
    /// Base URL of the authorization server, `/authorize` and `/token` are appended
    pub auth_server_url: String,
    pub redirect_uri: Option<String>,
    /// Public URL of the agent's entry route, target of the post-exchange redirect
    pub entry_url: String,
    pub resource_url: String,
    pub cookie_secret: String,
    pub cookie_domain: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
    /// How long a started authorization may wait for its callback
    #[serde(default = "default_flow_expiry_minutes")]
    pub flow_expiry_minutes: i64,
}

impl ClientAgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::prefixed("CLIENT_AGENT_").from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_empty("CLIENT_AGENT_CLIENT_ID", &self.client_id)?;
        non_empty("CLIENT_AGENT_SCOPE", &self.scope)?;
        parse_url("CLIENT_AGENT_AUTH_SERVER_URL", &self.auth_server_url)?;
        parse_url("CLIENT_AGENT_ENTRY_URL", &self.entry_url)?;
        parse_url("CLIENT_AGENT_RESOURCE_URL", &self.resource_url)?;
        if let Some(redirect_uri) = &self.redirect_uri {
            parse_url("CLIENT_AGENT_REDIRECT_URI", redirect_uri)?;
        }
        if self.cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(ConfigError::CookieSecretTooShort(self.cookie_secret.len()));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        lifetime_minutes("CLIENT_AGENT_SESSION_TTL_MINUTES", self.session_ttl_minutes)?;
        lifetime_minutes("CLIENT_AGENT_FLOW_EXPIRY_MINUTES", self.flow_expiry_minutes)?;
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Configuration of the Resource Guard (`RESOURCE_GUARD_*`)
#[derive(Clone, Debug, Deserialize)]
pub struct ResourceGuardConfig {
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_guard_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Base URL of the authorization server, `/verify` is appended
    pub auth_server_url: String,
    /// Scope an introspected token must carry to reach the resource
    pub required_scope: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Upper bound for caching positive introspection results, 0 disables the cache
    #[serde(default)]
    pub introspection_cache_ttl_secs: u64,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl ResourceGuardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::prefixed("RESOURCE_GUARD_").from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_url("RESOURCE_GUARD_AUTH_SERVER_URL", &self.auth_server_url)?;
        non_empty("RESOURCE_GUARD_REQUIRED_SCOPE", &self.required_scope)?;
        if self.required_scope.contains(char::is_whitespace) {
            return Err(ConfigError::CompoundScope(self.required_scope.clone()));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn introspection_cache_ttl(&self) -> Option<Duration> {
        (self.introspection_cache_ttl_secs > 0)
            .then(|| Duration::from_secs(self.introspection_cache_ttl_secs))
    }
}

fn non_empty(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(())
}

fn lifetime_minutes(name: &'static str, value: i64) -> Result<(), ConfigError> {
    if !(1..=MAX_LIFETIME_MINUTES).contains(&value) {
        return Err(ConfigError::LifetimeOutOfRange { name, value });
    }
    Ok(())
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_vars() -> Vec<(String, String)> {
        [
            ("CLIENT_AGENT_CLIENT_ID", "demo-client"),
            ("CLIENT_AGENT_SCOPE", "mrs"),
            ("CLIENT_AGENT_AUTH_SERVER_URL", "https://auth.example.com/auth"),
            ("CLIENT_AGENT_ENTRY_URL", "http://localhost:3000/"),
            ("CLIENT_AGENT_RESOURCE_URL", "http://localhost:3001/resource"),
            (
                "CLIENT_AGENT_COOKIE_SECRET",
                "test_cookie_secret_minimum_64_characters_long_for_secure_encryption",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_client_config_defaults() {
        let config: ClientAgentConfig = envy::prefixed("CLIENT_AGENT_")
            .from_iter(client_vars())
            .expect("config should parse");

        assert!(config.validate().is_ok());
        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.session_ttl_minutes, 60);
        assert_eq!(config.flow_expiry_minutes, 10);
        assert!(config.redirect_uri.is_none());
    }

    #[test]
    fn test_client_config_production_alias() {
        let mut vars = client_vars();
        vars.push(("CLIENT_AGENT_ENV".to_string(), "prod".to_string()));

        let config: ClientAgentConfig = envy::prefixed("CLIENT_AGENT_")
            .from_iter(vars)
            .expect("config should parse");

        assert!(config.env.is_production());
    }

    #[test]
    fn test_short_cookie_secret_is_rejected() {
        let mut vars = client_vars();
        vars.retain(|(k, _)| k != "CLIENT_AGENT_COOKIE_SECRET");
        vars.push(("CLIENT_AGENT_COOKIE_SECRET".to_string(), "short".to_string()));

        let config: ClientAgentConfig = envy::prefixed("CLIENT_AGENT_")
            .from_iter(vars)
            .expect("config should parse");

        assert!(matches!(
            config.validate(),
            Err(ConfigError::CookieSecretTooShort(5))
        ));
    }

    #[test]
    fn test_lifetimes_out_of_range_are_rejected() {
        for (name, value) in [
            ("CLIENT_AGENT_SESSION_TTL_MINUTES", "-5"),
            ("CLIENT_AGENT_SESSION_TTL_MINUTES", "0"),
            ("CLIENT_AGENT_FLOW_EXPIRY_MINUTES", "-1"),
            ("CLIENT_AGENT_FLOW_EXPIRY_MINUTES", "9223372036854775807"),
        ] {
            let mut vars = client_vars();
            vars.push((name.to_string(), value.to_string()));

            let config: ClientAgentConfig = envy::prefixed("CLIENT_AGENT_")
                .from_iter(vars)
                .expect("config should parse");

            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::LifetimeOutOfRange { name: rejected, .. }) if rejected == name
                ),
                "{name}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_guard_config() {
        let vars = [
            ("RESOURCE_GUARD_AUTH_SERVER_URL", "https://auth.example.com/auth"),
            ("RESOURCE_GUARD_REQUIRED_SCOPE", "mrs"),
            ("RESOURCE_GUARD_ALLOWED_ORIGINS", "http://a.test,http://b.test"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()));

        let config: ResourceGuardConfig = envy::prefixed("RESOURCE_GUARD_")
            .from_iter(vars)
            .expect("config should parse");

        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert!(config.introspection_cache_ttl().is_none());
    }

    #[test]
    fn test_guard_config_rejects_bad_url() {
        let config = ResourceGuardConfig {
            env: Environment::Development,
            bind_addr: default_guard_bind_addr(),
            auth_server_url: "not a url".to_string(),
            required_scope: "mrs".to_string(),
            http_timeout_secs: 5,
            introspection_cache_ttl_secs: 0,
            allowed_origins: Vec::new(),
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
