use axum::{
    extract::{connect_info::ConnectInfo, Request, State},
    http::{header::USER_AGENT, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use subtle::ConstantTimeEq;

use super::ip::client_id;
use crate::state::AppState;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Why a request was refused by [`authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("Missing x-api-key header")]
    MissingCredential,
    /// No key is configured on the server. An operator problem, not a client one.
    #[error("API authentication not properly configured")]
    ServerMisconfigured,
    #[error("Invalid API key")]
    InvalidCredential,
}

impl AuthFailure {
    pub fn status(self) -> StatusCode {
        match self {
            AuthFailure::MissingCredential | AuthFailure::InvalidCredential => StatusCode::UNAUTHORIZED,
            AuthFailure::ServerMisconfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short title used as the `error` field of the rejection body.
    pub fn title(self) -> &'static str {
        match self {
            AuthFailure::MissingCredential => "Authentication required",
            AuthFailure::ServerMisconfigured => "Server configuration error",
            AuthFailure::InvalidCredential => "Authentication failed",
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.title(), "message": self.to_string() }))).into_response()
    }
}

/// Checks a presented API key against the configured one.
///
/// Rules are applied in order: a missing (or empty) header is rejected before
/// the server configuration is consulted. An empty configured key counts as unset.
pub fn authenticate(header_value: Option<&str>, configured_secret: Option<&str>) -> Result<(), AuthFailure> {
    let provided = header_value.filter(|v| !v.is_empty()).ok_or(AuthFailure::MissingCredential)?;
    let expected = configured_secret.filter(|s| !s.is_empty()).ok_or(AuthFailure::ServerMisconfigured)?;
    if constant_time_key_eq(provided, expected) {
        Ok(())
    } else {
        Err(AuthFailure::InvalidCredential)
    }
}

/// Constant-time comparison of API keys.
///
/// When lengths differ a dummy comparison keeps timing independent of where
/// the mismatch is.
fn constant_time_key_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// First characters of a rejected key, enough to correlate log lines.
fn key_hint(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{}...", prefix)
}

/// Middleware guarding protected routes with the `x-api-key` header.
///
/// Applied with `route_layer` so only matched protected routes are checked.
pub async fn api_key_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    // Non-UTF-8 bytes are replaced, which can never equal a configured key.
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let failure = match authenticate(provided.as_deref(), state.config.api_key()) {
        Ok(()) => {
            tracing::debug!(path = %req.uri().path(), "API key validation successful");
            return next.run(req).await;
        }
        Err(failure) => failure,
    };

    let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let client = client_id(req.headers(), remote_ip, state.config.rate_limit.trust_proxy_headers);
    let user_agent = req.headers().get(USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or("-");
    let path = req.uri().path();

    match failure {
        AuthFailure::MissingCredential => {
            tracing::warn!(client = %client, user_agent, path, "API request missing x-api-key header");
        }
        AuthFailure::ServerMisconfigured => {
            tracing::error!(path, "API_KEY is not configured; refusing protected request");
        }
        AuthFailure::InvalidCredential => {
            let hint = key_hint(provided.as_deref().unwrap_or_default());
            tracing::warn!(client = %client, user_agent, path, provided_key = %hint, "Invalid API key provided");
        }
    }
    state.metrics.inc_auth_failures();

    failure.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_header() {
        assert_eq!(authenticate(None, Some("secret")), Err(AuthFailure::MissingCredential));
        assert_eq!(authenticate(Some(""), Some("secret")), Err(AuthFailure::MissingCredential));
        // Missing wins even when the server is misconfigured.
        assert_eq!(authenticate(None, None), Err(AuthFailure::MissingCredential));
    }

    #[test]
    fn unset_secret_is_a_server_error() {
        for header in ["secret", "anything", "x"] {
            assert_eq!(authenticate(Some(header), None), Err(AuthFailure::ServerMisconfigured));
            assert_eq!(authenticate(Some(header), Some("")), Err(AuthFailure::ServerMisconfigured));
        }
        assert_eq!(AuthFailure::ServerMisconfigured.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn wrong_and_right_key() {
        assert_eq!(authenticate(Some("secreT"), Some("secret")), Err(AuthFailure::InvalidCredential));
        assert_eq!(authenticate(Some("secret-but-longer"), Some("secret")), Err(AuthFailure::InvalidCredential));
        assert_eq!(authenticate(Some("secret"), Some("secret")), Ok(()));
    }

    #[test]
    fn failure_messages() {
        assert_eq!(AuthFailure::MissingCredential.to_string(), "Missing x-api-key header");
        assert_eq!(AuthFailure::InvalidCredential.to_string(), "Invalid API key");
        assert_eq!(AuthFailure::MissingCredential.title(), "Authentication required");
        assert_eq!(AuthFailure::InvalidCredential.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn key_hint_is_char_safe() {
        assert_eq!(key_hint("abcdefghijkl"), "abcdefgh...");
        assert_eq!(key_hint("ключ-ключ-ключ"), "ключ-клю...");
    }
}
