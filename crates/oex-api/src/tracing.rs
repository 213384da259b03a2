//! Log output of the Client Agent and the Resource Guard.
//!
//! Both binaries log to stdout. Credentials never reach the log: the guard
//! logs a short token fingerprint, and `AccessToken` and `PkceVerifier` redact
//! themselves in `Debug`.

use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::Environment;

const DEVELOPMENT_DIRECTIVES: &str = "info,oex_api=debug,oex_session=debug,tower_http=debug";
const PRODUCTION_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn";

/// Filter used when `RUST_LOG` is unset
fn default_directives(env: &Environment) -> &'static str {
    if env.is_production() {
        PRODUCTION_DIRECTIVES
    } else {
        DEVELOPMENT_DIRECTIVES
    }
}

/// Install the global subscriber for `service`
///
/// Development prints multi-line events with their source location. Production
/// prints one flattened JSON object per event, carrying the `request` span
/// (request id, method, path) opened by the request-id middleware. `RUST_LOG`
/// replaces the default filter.
pub fn init_tracing(env: &Environment, service: &'static str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(env)));
    let registry = tracing_subscriber::registry();

    if env.is_production() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .flatten_event(true)
                    .with_filter(filter),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(filter),
            )
            .init();
    }

    tracing::info!(service, environment = ?env, "Logging initialized");
}
