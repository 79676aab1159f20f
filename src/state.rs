use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::RateLimiter;

/// The shared application state.
///
/// Cloned into every handler and stateful middleware; all members are cheap
/// handles onto shared data.
#[derive(Clone)]
pub struct AppState {
    /// The application configuration, including the API key and the
    /// diagnostic-mode switch.
    pub config: Arc<AppConfig>,
    /// Pipeline counters exposed on `/metrics`.
    pub metrics: Metrics,
    /// Per-client request windows, one store per router.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Creates the state with a rate limiter sized from `config.rate_limit`.
    pub fn new(config: AppConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_seconds);
        Self { config: Arc::new(config), metrics: Metrics::new(), rate_limiter }
    }
}
