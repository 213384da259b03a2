//! HTTP client for the external authorization server.
//!
//! The authorization server is a black box reached over HTTP. Every call made
//! here returns an explicit `Result` so callers branch on each failure kind.

pub mod client;
pub mod models;

pub use client::{
    AUTHORIZE_PATH, AuthServerClient, AuthorizationRequest, TOKEN_PATH, VERIFY_PATH,
    build_http_client,
};
pub use models::{ExchangeError, IntrospectionError, IntrospectionResponse, TokenResponse};
