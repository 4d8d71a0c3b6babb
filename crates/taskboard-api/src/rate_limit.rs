//! Fixed-window request limiting per client IP.
//!
//! Each client gets a counter that resets when its window elapses. The map
//! of tracked clients is capped; when it is full, expired windows are pruned
//! and, if that frees nothing, unseen clients are refused until it does.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window.
    pub max_requests: u32,
    pub window: Duration,
    pub max_tracked_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            max_tracked_clients: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window resets.
    pub reset_after: Duration,
}

impl RateLimitStatus {
    fn reset_secs(&self) -> u64 {
        (self.reset_after.as_millis() as u64).div_ceil(1000)
    }
}

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, client: IpAddr) -> RateLimitStatus {
        self.check_at(client, Instant::now())
    }

    /// Records one request from `client` at `now`.
    pub fn check_at(&self, client: IpAddr, now: Instant) -> RateLimitStatus {
        let limit = self.config.max_requests;
        let window = self.config.window;
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        if !windows.contains_key(&client) && windows.len() >= self.config.max_tracked_clients {
            windows.retain(|_, w| now.duration_since(w.started) < window);
            debug!("Rate limiter pruned to {} tracked clients", windows.len());

            if windows.len() >= self.config.max_tracked_clients {
                let reset_after = windows
                    .values()
                    .map(|w| window.saturating_sub(now.duration_since(w.started)))
                    .min()
                    .unwrap_or(window);
                return RateLimitStatus {
                    allowed: false,
                    limit,
                    remaining: 0,
                    reset_after,
                };
            }
        }

        let entry = windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        let allowed = entry.count < limit;
        if allowed {
            entry.count += 1;
        }

        RateLimitStatus {
            allowed,
            limit,
            remaining: limit - entry.count,
            reset_after: window.saturating_sub(now.duration_since(entry.started)),
        }
    }
}

/// Middleware: count the request against its peer address and answer 429
/// once the window is used up. Requests without connection info (e.g. in
/// tests) share one bucket.
pub async fn limit_requests(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let status = limiter.check(client);
    let mut response = if status.allowed {
        next.run(req).await
    } else {
        warn!("Rate limit exceeded for {}", client);
        ApiError::RateLimited {
            retry_after: status.reset_secs(),
        }
        .into_response()
    };

    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("ratelimit-limit"),
        HeaderValue::from(status.limit),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-remaining"),
        HeaderValue::from(status.remaining),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-reset"),
        HeaderValue::from(status.reset_secs()),
    );

    response
}
