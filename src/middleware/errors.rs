//! The outermost failure boundary.
//!
//! Every [`AppError`](crate::error::AppError) raised below this layer, from a
//! handler, an extractor or the panic catcher, arrives here as a
//! [`PendingError`] response extension and is rendered exactly once. Gate
//! rejections (rate limit, API key) carry their own bodies and pass through
//! untouched.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;

use crate::error::{normalize, AppError, PendingError, RequestContext};
use crate::state::AppState;

/// Renders pending failures into the uniform error envelope.
///
/// Headers set by inner layers (quota headers in particular) are preserved.
pub async fn normalize_errors_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_request(&req);
    let res = next.run(req).await;

    let (mut parts, body) = res.into_parts();
    let Some(PendingError(err)) = parts.extensions.remove::<PendingError>() else {
        return Response::from_parts(parts, body);
    };

    let diagnostics = state.config.is_development();
    let (status, envelope) = normalize(&err, &ctx, diagnostics);
    let error_id = uuid::Uuid::new_v4();

    if status.is_server_error() {
        tracing::error!(
            %error_id,
            status = status.as_u16(),
            kind = err.name(),
            path = %ctx.path,
            method = %ctx.method,
            error = ?err,
            "Unhandled error occurred"
        );
    } else {
        tracing::warn!(
            %error_id,
            status = status.as_u16(),
            kind = err.name(),
            path = %ctx.path,
            method = %ctx.method,
            error = %err,
            "Request failed"
        );
    }
    state.metrics.inc_errors_normalized();

    let bytes = match serde_json::to_vec(&envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(%error_id, "Failed to serialize error envelope: {}", e);
            br#"{"isError":true,"message":"Internal server error"}"#.to_vec()
        }
    };

    parts.status = status;
    parts.headers.remove(CONTENT_LENGTH);
    parts.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(bytes))
}

/// Turns a caught handler panic into an unclassified failure for the normalizer.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::Internal(anyhow::anyhow!("handler panicked: {}", detail)).into_response()
}
