use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form, Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use cookie::{Cookie, CookieJar as RawCookieJar, Key as RawKey};
use http_body_util::BodyExt;
use oex_api::{
    client::cookies::SESSION_COOKIE,
    config::{ClientAgentConfig, Environment, ResourceGuardConfig},
    middleware::request_id::request_id_middleware,
    router,
    state::{ClientState, GuardState},
};
use oex_session::SessionId;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const TEST_COOKIE_SECRET: &str =
    "test_cookie_secret_minimum_64_characters_long_for_secure_encryption";
pub const TEST_CLIENT_ID: &str = "demo-client";
pub const TEST_SCOPE: &str = "mrs";
pub const ENTRY_URL: &str = "http://localhost:3000/";

/// Requests the mock authorization server has seen
#[derive(Debug, Default)]
struct Recorded {
    token_calls: Vec<HashMap<String, String>>,
    verify_calls: Vec<HashMap<String, String>>,
    resource_auth_headers: Vec<Option<String>>,
}

/// Canned answers of the mock authorization server
#[derive(Debug)]
struct Behaviour {
    token_status: StatusCode,
    token_body: Value,
    verify_status: StatusCode,
    verify_body: Value,
    resource_status: StatusCode,
    resource_body: String,
    /// Added before `/token` and `/verify` answer
    delay: Duration,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            token_status: StatusCode::OK,
            token_body: json!({ "access_token": "tok1" }),
            verify_status: StatusCode::OK,
            verify_body: json!({ "active": false }),
            resource_status: StatusCode::OK,
            resource_body: r#"{"message":"granted"}"#.to_string(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Clone, Default)]
struct MockState {
    recorded: Arc<Mutex<Recorded>>,
    behaviour: Arc<Mutex<Behaviour>>,
}

/// Authorization server plus protected resource, served on an ephemeral port
///
/// Serves `/token`, `/verify` and `/resource`, records what it receives and
/// answers with whatever the test configured.
pub struct MockAuthServer {
    addr: SocketAddr,
    state: MockState,
}

impl MockAuthServer {
    pub async fn start() -> Self {
        let state = MockState::default();

        let app = Router::new()
            .route("/token", post(mock_token))
            .route("/verify", post(mock_verify))
            .route("/resource", get(mock_resource))
            .with_state(state.clone());

        let addr = serve(app).await;

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn resource_url(&self) -> String {
        format!("http://{}/resource", self.addr)
    }

    pub fn set_token_response(&self, status: StatusCode, body: Value) {
        let mut behaviour = self.state.behaviour.lock().unwrap();
        behaviour.token_status = status;
        behaviour.token_body = body;
    }

    pub fn set_verify_response(&self, status: StatusCode, body: Value) {
        let mut behaviour = self.state.behaviour.lock().unwrap();
        behaviour.verify_status = status;
        behaviour.verify_body = body;
    }

    pub fn set_resource_response(&self, status: StatusCode, body: &str) {
        let mut behaviour = self.state.behaviour.lock().unwrap();
        behaviour.resource_status = status;
        behaviour.resource_body = body.to_string();
    }

    /// Make `/token` and `/verify` stall for `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        self.state.behaviour.lock().unwrap().delay = delay;
    }

    pub fn token_calls(&self) -> Vec<HashMap<String, String>> {
        self.state.recorded.lock().unwrap().token_calls.clone()
    }

    pub fn verify_calls(&self) -> Vec<HashMap<String, String>> {
        self.state.recorded.lock().unwrap().verify_calls.clone()
    }

    pub fn resource_auth_headers(&self) -> Vec<Option<String>> {
        self.state.recorded.lock().unwrap().resource_auth_headers.clone()
    }
}

async fn mock_token(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.recorded.lock().unwrap().token_calls.push(form);
    stall(&state).await;
    let behaviour = state.behaviour.lock().unwrap();
    (behaviour.token_status, Json(behaviour.token_body.clone()))
}

async fn mock_verify(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.recorded.lock().unwrap().verify_calls.push(form);
    stall(&state).await;
    let behaviour = state.behaviour.lock().unwrap();
    (behaviour.verify_status, Json(behaviour.verify_body.clone()))
}

async fn stall(state: &MockState) {
    let delay = state.behaviour.lock().unwrap().delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

async fn mock_resource(State(state): State<MockState>, headers: HeaderMap) -> impl IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    state
        .recorded
        .lock()
        .unwrap()
        .resource_auth_headers
        .push(authorization);

    let behaviour = state.behaviour.lock().unwrap();
    (behaviour.resource_status, behaviour.resource_body.clone())
}

/// Serve `app` on 127.0.0.1 with an ephemeral port
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Test server failed");
    });

    addr
}

/// A URL nothing listens on
pub async fn unreachable_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    drop(listener);

    format!("http://{addr}{path}")
}

pub fn client_config(server: &MockAuthServer) -> ClientAgentConfig {
    ClientAgentConfig {
        env: Environment::Development,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        client_id: TEST_CLIENT_ID.to_string(),
        scope: TEST_SCOPE.to_string(),
        auth_server_url: server.base_url(),
        redirect_uri: None,
        entry_url: ENTRY_URL.to_string(),
        resource_url: server.resource_url(),
        cookie_secret: TEST_COOKIE_SECRET.to_string(),
        cookie_domain: None,
        http_timeout_secs: 2,
        session_ttl_minutes: 60,
        flow_expiry_minutes: 10,
    }
}

pub fn guard_config(server: &MockAuthServer) -> ResourceGuardConfig {
    ResourceGuardConfig {
        env: Environment::Development,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        auth_server_url: server.base_url(),
        required_scope: TEST_SCOPE.to_string(),
        http_timeout_secs: 2,
        introspection_cache_ttl_secs: 0,
        allowed_origins: Vec::new(),
    }
}

pub fn client_app(state: ClientState) -> Router {
    router::client_router()
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
}

pub fn guard_app(state: GuardState) -> Router {
    router::guard_router()
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
}

/// Encrypted session cookie, as the Client Agent would have issued it
pub fn session_cookie(cookie_key: &Key, session_id: SessionId) -> String {
    let raw_key = RawKey::try_from(cookie_key.master()).expect("Invalid key");
    let mut raw_jar = RawCookieJar::new();
    raw_jar
        .private_mut(&raw_key)
        .add(Cookie::new(SESSION_COOKIE, session_id.to_string()));

    let encrypted = raw_jar.get(SESSION_COOKIE).expect("Cookie should exist");
    format!("{}={}", encrypted.name(), encrypted.value())
}

/// Session id inside a `name=value` pair issued by the Client Agent
pub fn decrypt_session_id(cookie_key: &Key, cookie: &str) -> SessionId {
    let raw_key = RawKey::try_from(cookie_key.master()).expect("Invalid key");
    let parsed = Cookie::parse(cookie.to_string()).expect("Malformed cookie");

    let mut raw_jar = RawCookieJar::new();
    raw_jar.add_original(parsed);

    raw_jar
        .private(&raw_key)
        .get(SESSION_COOKIE)
        .expect("Cookie does not decrypt")
        .value()
        .parse()
        .expect("Cookie does not hold a session id")
}

/// Helper to make requests to the app under test
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Send a request and get the response
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    /// Send a GET request
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.get_with_headers(uri, &[]).await
    }

    /// Send a GET request carrying a session cookie
    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> TestResponse {
        self.get_with_headers(uri, &[(header::COOKIE, cookie)]).await
    }

    /// Send a GET request with an `Authorization` header
    pub async fn get_with_auth(&self, uri: &str, authorization: &str) -> TestResponse {
        self.get_with_headers(uri, &[(header::AUTHORIZATION, authorization)])
            .await
    }

    pub async fn get_with_headers(
        &self,
        uri: &str,
        headers: &[(header::HeaderName, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            builder = builder.header(name.clone(), HeaderValue::from_str(value).unwrap());
        }

        let request = builder
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }
}

/// Test response wrapper
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: HeaderMap,
}

impl TestResponse {
    /// Get response body as string
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    /// Get response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> &str {
        self.header(header::LOCATION)
            .expect("Response has no Location header")
    }

    /// Full `Set-Cookie` header of the session cookie
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(SESSION_COOKIE))
    }

    /// `name=value` of the session cookie, ready to be sent back
    pub fn session_cookie(&self) -> String {
        let set_cookie = self.set_cookie().expect("Response sets no session cookie");
        set_cookie
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}
