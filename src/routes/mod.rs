//! HTTP routes and the layer stack around them.
//!
//! - `health`: health probes and metrics, exempt from both gates
//! - `info`: service index and the 404 fallback
//! - `momo`: mobile-money operations, rate limited and API-key protected
//!
//! Governed requests flow rate limiter → API key guard (protected routes) →
//! handler, with the error normalizer wrapped around all of it.

pub mod health;
pub mod info;
pub mod momo;

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::middleware::{self, auth::API_KEY_HEADER, rate_limit};
use crate::state::AppState;

/// Builds the complete application router.
pub fn router(state: AppState) -> Router {
    // Probes stay reachable for orchestrators even when a client is over quota.
    let probes = Router::new()
        .route("/health", get(health::health))
        .route("/health/detailed", get(health::detailed))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .method_not_allowed_fallback(info::not_found);

    let momo = momo::routes().route_layer(from_fn_with_state(state.clone(), middleware::auth::api_key_middleware));

    let downloads = ServeDir::new(&state.config.downloads.dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(info::not_found.into_service());

    // Wrong-method requests answer like unknown routes: rate limited, no key check.
    let governed = Router::new()
        .route("/", get(info::service_info))
        .nest("/api/momo", momo)
        .nest_service("/downloads", downloads)
        .fallback(info::not_found)
        .method_not_allowed_fallback(info::not_found)
        .layer(from_fn_with_state(state.clone(), rate_limit::rate_limit_middleware));

    with_boundary(probes.merge(governed), state)
}

/// Wraps routes in the outer layer stack: body limit, panic catcher, error
/// normalizer, security headers, access log and CORS.
pub fn with_boundary(routes: Router<AppState>, state: AppState) -> Router {
    let cfg = state.config.clone();
    let cors = cors_layer(&cfg.cors.origin);

    routes
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes))
        .layer(CatchPanicLayer::custom(middleware::errors::panic_response))
        .layer(from_fn_with_state(state, middleware::errors::normalize_errors_middleware))
        .layer(from_fn_with_state(cfg, middleware::security_headers::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, HeaderName::from_static(API_KEY_HEADER)])
        .expose_headers([
            rate_limit::X_RATELIMIT_LIMIT,
            rate_limit::X_RATELIMIT_REMAINING,
            rate_limit::X_RATELIMIT_RESET,
        ])
        .allow_credentials(true);
    // Validated at config load; an unparsable origin simply allows none.
    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => layer,
    }
}
