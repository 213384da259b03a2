use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};

use crate::{
    client, guard,
    state::{ClientState, GuardState},
};

/// Routes of the Client Agent
pub fn client_router() -> Router<ClientState> {
    Router::new()
        .route("/health", get(health))
        .merge(client::routes())
        .fallback(handler_404)
}

/// Routes of the Resource Guard
pub fn guard_router() -> Router<GuardState> {
    Router::new()
        .route("/health", get(health))
        .merge(guard::routes())
        .fallback(handler_404)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
