use axum::{Router, middleware, routing::get};
use oex_api::{config::ClientAgentConfig, state::ClientState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ClientAgentConfig::from_env()?;

    oex_api::tracing::init_tracing(&config.env, "client-agent");

    let metrics_handle = oex_api::metrics::init_metrics()?;
    tracing::info!("Prometheus metrics exporter initialized");

    let bind_addr = config.bind_addr;
    let environment = config.env;
    let state = ClientState::new(config)?;

    let _session_cleanup = oex_api::jobs::start_session_cleanup(state.sessions.clone());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let metrics_app = Router::new()
        .route("/metrics", get(oex_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = oex_api::router::client_router()
        .with_state(state)
        .merge(metrics_app)
        .layer(trace_layer)
        .layer(middleware::from_fn(oex_api::metrics::track_metrics))
        .layer(middleware::from_fn(
            oex_api::middleware::request_id::request_id_middleware,
        ));

    let app = oex_api::middleware::security_headers::apply_security_headers(app, environment);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, environment = ?environment, "Client agent listening");
    axum::serve(listener, app).await?;

    Ok(())
}
