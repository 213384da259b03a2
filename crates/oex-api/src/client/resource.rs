use reqwest::StatusCode;

use crate::middleware::request_id::{REQUEST_ID_HEADER, RequestId};

/// Raw answer of the protected resource
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Call the protected resource with the session's bearer token
pub async fn fetch(
    http: &reqwest::Client,
    resource_url: &str,
    token: &str,
    request_id: &RequestId,
) -> Result<ResourceResponse, reqwest::Error> {
    let response = http
        .get(resource_url)
        .bearer_auth(token)
        .header(REQUEST_ID_HEADER, request_id.as_str())
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    Ok(ResourceResponse { status, body })
}
