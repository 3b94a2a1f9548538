use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::errors::ApiError;
use crate::routes::auth::ServerState;

/// Register/login attempts a single client may make per minute.
pub const AUTH_ATTEMPTS_PER_MINUTE: u32 = 5;

// idle full buckets are dropped once the map grows past this
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self { tokens: capacity, last_refill: now }
    }

    fn refill(&mut self, capacity: f64, per_sec: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * per_sec).min(capacity);
        self.last_refill = now;
    }

    /// Take one token, or report how long until one is available.
    fn try_acquire(&mut self, capacity: f64, per_sec: f64, now: Instant) -> Result<(), Duration> {
        self.refill(capacity, per_sec, now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / per_sec))
        }
    }
}

/// Fixed per-client limit: `capacity` attempts, refilled evenly over `window`.
#[derive(Debug)]
pub struct Throttle {
    buckets: DashMap<String, TokenBucket>,
    capacity: f64,
    per_sec: f64,
}

impl Throttle {
    pub fn new(capacity: u32, window: Duration) -> Self {
        let capacity = f64::from(capacity.max(1));
        let window = window.as_secs_f64().max(f64::EPSILON);
        Self { buckets: DashMap::new(), capacity, per_sec: capacity / window }
    }

    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    /// `Err(retry_after)` once `client` is out of attempts.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), Duration> {
        if self.buckets.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }
        let mut bucket = self
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::full(self.capacity, now));
        bucket.try_acquire(self.capacity, self.per_sec, now)
    }

    fn prune(&self, now: Instant) {
        let (capacity, per_sec) = (self.capacity, self.per_sec);
        self.buckets.retain(|_, b| {
            b.refill(capacity, per_sec, now);
            b.tokens < capacity
        });
        debug!(remaining = self.buckets.len(), "pruned idle throttle buckets");
    }
}

/// Peer address from `ConnectInfo`. Requests without one (in-process
/// callers) share a single bucket.
fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Answer 429 with `Retry-After` once the caller exhausts its attempts.
pub async fn limit_auth_attempts(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&req);
    if let Err(retry_after) = state.throttle.check(&client) {
        warn!(%client, path = %req.uri().path(), retry_after_secs = retry_after.as_secs_f64(), "auth attempts throttled");
        return Err(ApiError::TooManyRequests(retry_after));
    }
    Ok(next.run(req).await)
}
