//! # MoMo Gateway Backend Library
//!
//! An HTTP service fronting mobile-money ("MoMo") payment operations. Every
//! governed request passes through a small request-governance pipeline before
//! it reaches a handler:
//!
//! 1. a per-client fixed-window **rate limiter** (100 requests / 15 minutes by default),
//! 2. an **API key guard** on the `/api/momo` routes,
//! 3. an **error normalizer** that renders any failure into one JSON envelope.
//!
//! ## Core Components
//!
//! - [`config`]: Layered configuration (embedded defaults, files, environment)
//! - [`error`]: Handler error type and the envelope normalization
//! - [`metrics`]: Pipeline counters
//! - [`middleware`]: Rate limiting, API key authentication, error boundary, security headers
//! - [`routes`]: HTTP handlers and the router
//! - [`state`]: Shared application state
//! - [`types`]: Response bodies

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
