//! Per-client fixed-window rate limiting.
//!
//! Each client keeps a log of the arrival instants it was admitted at. The log
//! is exact within the window, and since rejected requests are never logged it
//! holds at most `max_requests` entries, so memory is bounded by
//! `clients × max_requests` instants. Idle clients are dropped lazily on their
//! next request and by [`cleanup_task`].

use super::ip::client_id;
use crate::state::AppState;
use axum::{
    extract::{connect_info::ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use dashmap::DashMap;
use serde_json::json;
use std::{collections::VecDeque, net::SocketAddr, sync::Arc, time::Duration};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Upper bound for the window so `now + window` can never overflow.
pub const MAX_WINDOW_SECONDS: u64 = 366 * 24 * 60 * 60;

/// Arrival instants of one client's admitted requests, oldest first.
#[derive(Debug, Default)]
struct ClientWindow {
    arrivals: VecDeque<DateTime<Utc>>,
}

impl ClientWindow {
    // A timestamp ahead of `now` (clock stepped back) stays live.
    fn is_live(t: DateTime<Utc>, now: DateTime<Utc>, window: TimeDelta) -> bool {
        now.signed_duration_since(t) < window
    }

    fn prune(&mut self, now: DateTime<Utc>, window: TimeDelta) {
        self.arrivals.retain(|&t| Self::is_live(t, now, window));
    }

    fn is_expired(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        !self.arrivals.iter().any(|&t| Self::is_live(t, now, window))
    }
}

/// Outcome of [`RateLimiter::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: usize,
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

impl Decision {
    /// Writes the `X-RateLimit-*` quota headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        let reset = self.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Ok(value) = HeaderValue::from_str(&reset) {
            headers.insert(X_RATELIMIT_RESET, value);
        }
    }
}

/// A thread-safe per-client request log.
///
/// Cloning is cheap and shares the underlying store. Requests from the same
/// client serialize on that client's map shard, so concurrent callers cannot
/// push a client past its quota.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<DashMap<String, ClientWindow>>,
    max_requests: usize,
    window: TimeDelta,
}

impl RateLimiter {
    /// Creates a new `RateLimiter`.
    ///
    /// # Arguments
    ///
    /// * `max_requests` - The maximum number of requests admitted per client within the window.
    /// * `window_seconds` - The duration of the window in seconds, capped at [`MAX_WINDOW_SECONDS`].
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        let secs = window_seconds.min(MAX_WINDOW_SECONDS) as i64;
        Self { windows: Arc::new(DashMap::new()), max_requests, window: TimeDelta::seconds(secs) }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds())
    }

    pub fn window_seconds(&self) -> u64 {
        self.window.num_seconds().max(0) as u64
    }

    /// Decides whether a request from `client` arriving at `now` is admitted.
    ///
    /// Admitted requests are logged; rejected ones are not.
    pub fn admit(&self, client: &str, now: DateTime<Utc>) -> Decision {
        let window = self.window;
        let reset_at = now + window;

        // Drop the record of a client whose whole log has expired.
        self.windows.remove_if(client, |_, w| w.is_expired(now, window));

        let mut entry = self.windows.entry(client.to_string()).or_default();
        entry.prune(now, window);

        if entry.arrivals.len() >= self.max_requests {
            return Decision { allowed: false, limit: self.max_requests, remaining: 0, reset_at };
        }

        entry.arrivals.push_back(now);
        Decision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests - entry.arrivals.len(),
            reset_at,
        }
    }

    /// Prunes every client log and drops the ones left empty. Returns how many were dropped.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let window = self.window;
        let before = self.windows.len();
        self.windows.retain(|_, w| {
            w.prune(now, window);
            !w.arrivals.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently holding a record.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// An Axum middleware that applies the shared [`RateLimiter`] to every request.
///
/// Quota headers are attached to admitted and rejected responses alike. A
/// rejected request never reaches the inner service.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let client = client_id(req.headers(), remote_ip, state.config.rate_limit.trust_proxy_headers);

    let decision = state.rate_limiter.admit(&client, Utc::now());

    if !decision.allowed {
        let retry_after = state.rate_limiter.window_seconds();
        tracing::warn!(
            client = %client,
            max_requests = decision.limit,
            window_seconds = retry_after,
            path = %req.uri().path(),
            method = %req.method(),
            "Rate limit exceeded"
        );
        state.metrics.inc_rate_limited();

        let mut res = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too many requests",
                "message": "Rate limit exceeded. Please try again later.",
                "retryAfter": retry_after,
            })),
        )
            .into_response();
        decision.apply_headers(res.headers_mut());
        res.headers_mut().insert(RETRY_AFTER, HeaderValue::from(retry_after));
        return res;
    }

    state.metrics.inc_admitted();
    let mut res = next.run(req).await;
    decision.apply_headers(res.headers_mut());
    res
}

/// A background task that periodically drops idle clients from a `RateLimiter`.
pub async fn cleanup_task(limiter: RateLimiter, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;
        let dropped = limiter.sweep(Utc::now());
        if dropped > 0 {
            tracing::debug!(dropped, remaining = limiter.tracked_clients(), "Swept idle rate-limit records");
        }
    }
}
