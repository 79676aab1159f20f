use crate::state::AppState;
use crate::types::{timestamp_now, DetailedHealth, HealthStatus, ProbeStatus, ProcessInfo, SystemInfo};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

fn health_status(state: &AppState) -> HealthStatus {
    HealthStatus {
        status: "healthy",
        timestamp: timestamp_now(),
        uptime: state.metrics.uptime_seconds(),
        environment: state.config.app.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
    }
}

// Basic health check - lightweight, no rate limiting
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("Health check requested");
    Json(health_status(&state))
}

// Detailed health information with platform details
pub async fn detailed(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("Detailed health check requested");
    let health = health_status(&state);
    let uptime = health.uptime;
    Json(DetailedHealth {
        health,
        system: SystemInfo {
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
            cpu_cores: num_cpus::get(),
            physical_cores: num_cpus::get_physical(),
        },
        process: ProcessInfo { pid: std::process::id(), uptime },
    })
}

// Readiness probe: protected routes cannot serve anything until an API key is configured
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    if state.config.api_key().is_some() {
        (StatusCode::OK, Json(ProbeStatus { status: "ready", timestamp: timestamp_now(), reason: None }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ProbeStatus {
                status: "not ready",
                timestamp: timestamp_now(),
                reason: Some("API key not configured"),
            }),
        )
    }
}

// Liveness probe: answering at all is the signal
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(ProbeStatus { status: "alive", timestamp: timestamp_now(), reason: None }))
}

// Metrics endpoint: returns JSON snapshot
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.get_snapshot();
    Json(snapshot)
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let body = format!(
        "# HELP momo_gateway_requests_admitted Requests admitted by the rate limiter\n# TYPE momo_gateway_requests_admitted counter\nmomo_gateway_requests_admitted {}\n\
# HELP momo_gateway_requests_rate_limited Requests rejected by the rate limiter\n# TYPE momo_gateway_requests_rate_limited counter\nmomo_gateway_requests_rate_limited {}\n\
# HELP momo_gateway_auth_failures Requests rejected by the API key guard\n# TYPE momo_gateway_auth_failures counter\nmomo_gateway_auth_failures {}\n\
# HELP momo_gateway_errors_normalized Failed requests rendered as error envelopes\n# TYPE momo_gateway_errors_normalized counter\nmomo_gateway_errors_normalized {}\n\
# HELP momo_gateway_uptime_seconds Uptime seconds\n# TYPE momo_gateway_uptime_seconds gauge\nmomo_gateway_uptime_seconds {}\n",
        m.requests_admitted,
        m.requests_rate_limited,
        m.auth_failures,
        m.errors_normalized,
        m.uptime_seconds,
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
