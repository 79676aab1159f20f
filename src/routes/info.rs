use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::state::AppState;
use crate::types::{timestamp_now, AppInfo, EndpointIndex, ServiceInfo};

/// `GET /`: what this service is and where its endpoints live.
pub async fn service_info(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("Root endpoint accessed");
    Json(ServiceInfo {
        success: true,
        message: "MoMo gateway is running",
        app: AppInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            environment: state.config.app.environment.clone(),
            port: state.config.server.port,
            timestamp: timestamp_now(),
        },
        endpoints: EndpointIndex {
            health: "/health",
            momo: "/api/momo",
            downloads: "/downloads",
            metrics: "/metrics",
        },
        features: vec![
            "MoMo payment integration",
            "Health monitoring and status checks",
            "Secure API with authentication",
            "Per-client rate limiting",
        ],
        status: "operational",
        uptime: state.metrics.uptime_seconds(),
    })
}

/// Fallback for every unmatched route.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    tracing::warn!("404 - Endpoint not found: {}", uri);
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Endpoint not found", "path": uri.to_string() })))
}
