//! Middleware components for HTTP request processing.
//!
//! Together these form the request-governance pipeline: every governed request
//! is rate limited, protected routes then check the API key, and failures from
//! anywhere below the boundary are normalized into one error envelope.

pub mod auth;
pub mod errors;
pub mod ip;
pub mod rate_limit;
pub mod security_headers;

pub use rate_limit::{Decision, RateLimiter};
