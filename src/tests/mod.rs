//! API-level and integration tests.
//!
//! ## Test Modules
//!
//! - **pipeline_api_tests**: rate limiting and API key gating through the full router
//! - **error_tests**: the error boundary (envelopes, panics, body limits)
//! - **health_api_tests**: health probes, metrics and the service index
//! - **config_tests**: configuration loading and validation
//!
//! Run a single module with e.g. `cargo test pipeline_api_tests`.

pub mod config_tests;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request},
    response::Response,
};
use std::net::SocketAddr;

use crate::config::AppConfig;

pub const TEST_KEY: &str = "test-api-key-0123456789";

/// Default configuration with an API key set.
pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.api_key = Some(TEST_KEY.to_string());
    cfg
}

/// A request as it would arrive from `ip` through `into_make_service_with_connect_info`.
pub fn request_from(ip: &str, method: Method, uri: &str, api_key: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    let mut req = builder.body(body).unwrap();
    let addr: SocketAddr = format!("{}:40000", ip).parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
