use axum::{Router, middleware, routing::get};
use oex_api::{config::ResourceGuardConfig, state::GuardState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ResourceGuardConfig::from_env()?;

    oex_api::tracing::init_tracing(&config.env, "resource-guard");

    let metrics_handle = oex_api::metrics::init_metrics()?;
    let state = GuardState::new(&config)?;

    match &state.cache {
        Some(cache) => {
            let _cache_cleanup = oex_api::jobs::start_cache_cleanup(cache.clone());
            tracing::info!(
                ttl_secs = config.introspection_cache_ttl_secs,
                "Introspection cache enabled"
            );
        }
        None => tracing::info!("Introspection cache disabled, every request is introspected"),
    }

    let cors = oex_api::middleware::cors::create_cors_layer(&config.allowed_origins);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let metrics_app = Router::new()
        .route("/metrics", get(oex_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = oex_api::router::guard_router()
        .with_state(state)
        .merge(metrics_app)
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(oex_api::metrics::track_metrics))
        .layer(middleware::from_fn(
            oex_api::middleware::request_id::request_id_middleware,
        ));

    let app = oex_api::middleware::security_headers::apply_security_headers(app, config.env);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        required_scope = %config.required_scope,
        "Resource guard listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
