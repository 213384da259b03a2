use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::authz::ExchangeError;

/// Failures of the Client Agent's entry route
///
/// Everything that ends an authorization attempt maps to a bare 401. The
/// variants exist for the server log only.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No authorization flow in progress for this session")]
    MissingVerifier,
    #[error("Authorization flow expired before the callback arrived")]
    FlowExpired,
    #[error("Callback state does not match the authorization request")]
    StateMismatch,
    #[error("Token exchange failed: {0}")]
    TokenExchange(#[from] ExchangeError),
    #[error("Protected resource unreachable: {0}")]
    ResourceUnavailable(#[source] reqwest::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::TokenExchange(ExchangeError::Transport(_)) | Self::ResourceUnavailable(_) => {
                tracing::error!(error = %self, "Outbound call failed");
            }
            _ => tracing::warn!(error = %self, "Authorization flow rejected"),
        }

        match self.status_code() {
            StatusCode::UNAUTHORIZED => StatusCode::UNAUTHORIZED.into_response(),
            status => (status, "The protected resource is currently unavailable").into_response(),
        }
    }
}
