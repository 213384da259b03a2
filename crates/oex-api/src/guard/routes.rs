use axum::{Json, Router, routing::get};
use serde::Serialize;

use super::Authorized;
use crate::state::GuardState;

/// Path of the protected resource
pub const RESOURCE_PATH: &str = "/resource";

pub fn routes() -> Router<GuardState> {
    Router::new().route(RESOURCE_PATH, get(protected_resource))
}

#[derive(Debug, Serialize)]
struct ProtectedContent {
    message: &'static str,
    username: Option<String>,
    scope: Vec<String>,
}

async fn protected_resource(auth: Authorized) -> Json<ProtectedContent> {
    Json(ProtectedContent {
        message: "Access to the protected resource granted",
        username: auth.username,
        scope: auth.scopes,
    })
}
