use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{config::RateLimitConfig, state::AppState};

pub const THROTTLED_MESSAGE: &str = "Too many requests from this IP, please try again later.";

// windows are swept once the table grows past this
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter per client address.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(cfg: &RateLimitConfig) -> Self {
        Self {
            max_requests: cfg.max_requests,
            window: Duration::from_secs(cfg.window_secs),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub async fn allow(&self, key: IpAddr) -> bool {
        self.allow_at(key, Instant::now()).await
    }

    async fn allow_at(&self, key: IpAddr, now: Instant) -> bool {
        let mut lock = self.windows.lock().await;
        if lock.len() > SWEEP_THRESHOLD {
            let window = self.window;
            lock.retain(|_, w| now.duration_since(w.started) < window);
        }
        let entry = lock.entry(key).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Middleware for the `/api` tree.
pub async fn limit_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.limiter.allow(ip).await {
        warn!(%ip, "rate limit exceeded");
        return (StatusCode::TOO_MANY_REQUESTS, THROTTLED_MESSAGE).into_response();
    }
    next.run(req).await
}
