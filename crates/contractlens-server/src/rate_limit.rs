//! Per-client request limiting.
//!
//! Fixed windows: each client gets `max_requests` per `window`, counted from
//! its first request in the window. Clients are keyed by peer IP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::ApiError;

/// Windows tracked before expired ones are swept.
const SWEEP_THRESHOLD: usize = 10_000;

/// Key used when the peer address is unknown (e.g. in-process requests).
const UNKNOWN_CLIENT: &str = "unknown";

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests from this IP, please try again later.";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32, reset_in: Duration },
    Limited { reset_in: Duration },
}

pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count one request from `client` at `now`.
    pub fn check(&self, client: &str, now: Instant) -> Admission {
        // Poisoning leaves the counts intact.
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let reset_in = self.window.saturating_sub(now.duration_since(entry.started));
        if entry.count >= self.max_requests {
            return Admission::Limited { reset_in };
        }
        entry.count += 1;
        Admission::Allowed {
            remaining: self.max_requests - entry.count,
            reset_in,
        }
    }
}

/// Middleware: reject clients over their budget with 429, stamp `RateLimit-*` headers otherwise.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), |ci| ci.0.ip().to_string());

    match limiter.check(&client, Instant::now()) {
        Admission::Allowed {
            remaining,
            reset_in,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("ratelimit-limit", HeaderValue::from(limiter.max_requests()));
            headers.insert("ratelimit-remaining", HeaderValue::from(remaining));
            headers.insert("ratelimit-reset", HeaderValue::from(ceil_secs(reset_in)));
            response
        }
        Admission::Limited { reset_in } => {
            warn!(client = %client, path = %request.uri().path(), "rate limit exceeded");
            let retry_after = ceil_secs(limiter.window());
            let mut response = ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                RATE_LIMITED_MESSAGE,
                format!(
                    "Limit of {} requests per {}s reached",
                    limiter.max_requests(),
                    retry_after
                ),
            )
            .with("retryAfter", retry_after)
            .into_response();
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(ceil_secs(reset_in)));
            headers.insert("ratelimit-limit", HeaderValue::from(limiter.max_requests()));
            headers.insert("ratelimit-remaining", HeaderValue::from(0u32));
            headers.insert("ratelimit-reset", HeaderValue::from(ceil_secs(reset_in)));
            response
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_millis().div_ceil(1000) as u64
}
