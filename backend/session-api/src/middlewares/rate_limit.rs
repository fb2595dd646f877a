use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::models::AuthenticatedUser;

const RATE_LIMIT_PER_USER: u32 = 1000; // requests per window
const RATE_LIMIT_PER_IP: u32 = 2000; // requests per window
const RATE_WINDOW_SECONDS: u64 = 900; // 15 minutes

// Counters for keys past their window are dead weight; sweep once the map
// grows past this.
const SWEEP_THRESHOLD: usize = 10_000;

/// In-process fixed-window counter. One instance covers all request keys;
/// counters reset when the process restarts.
pub struct FixedWindowLimiter {
    window: Duration,
    entries: Mutex<HashMap<String, (Instant, u32)>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one hit against `key`; false once `limit` is reached within
    /// the current window.
    pub async fn check(&self, key: &str, limit: u32) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        if entries.len() > SWEEP_THRESHOLD {
            let window = self.window;
            entries.retain(|_, (started, _)| now.duration_since(*started) < window);
        }

        let entry = entries.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }

        if entry.1 >= limit {
            return false;
        }
        entry.1 += 1;
        true
    }
}

lazy_static! {
    static ref LIMITER: FixedWindowLimiter =
        FixedWindowLimiter::new(Duration::from_secs(RATE_WINDOW_SECONDS));
}

/// Client address used for limiter keys. Proxy headers take precedence over
/// the socket address because deployments put nginx in front of the service.
fn client_ip(headers: &HeaderMap, extensions: &axum::http::Extensions) -> String {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    // x-forwarded-for carries a hop list; the leftmost entry is the client
    if let Some(list) = header_str("x-forwarded-for") {
        if let Some(first) = list.split(',').next() {
            return first.trim().to_string();
        }
    }

    // RFC 7239 Forwarded: for=1.2.3.4;proto=https;by=...
    if let Some(spec) = header_str("forwarded") {
        let for_value = spec
            .split(';')
            .map(str::trim)
            .find_map(|pair| pair.strip_prefix("for="));
        if let Some(addr) = for_value {
            return addr.trim().trim_matches('"').to_string();
        }
    }

    if let Some(addr) = header_str("x-real-ip") {
        return addr.trim().to_string();
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn limit_override(var: &str, default: u32) -> u32 {
    std::env::var(var)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Per-user and per-IP request limiting for the session routes. Runs after
/// authentication, so the user identity is already in request extensions.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Result<Response, StatusCode> {
    // RATE_LIMIT_DISABLED=1 switches the limiter off for load testing
    if std::env::var("RATE_LIMIT_DISABLED").unwrap_or_default() == "1" {
        tracing::debug!("rate limiter disabled");
        return Ok(next.run(request).await);
    }

    let ip = client_ip(request.headers(), request.extensions());
    let user_id = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.user_id.clone());

    // The user budget is consumed before the shared IP budget
    if let Some(uid) = user_id {
        let per_user = limit_override("RATE_LIMIT_PER_USER", RATE_LIMIT_PER_USER);
        if !LIMITER.check(&format!("user:{}", uid), per_user).await {
            tracing::warn!(user_id = %uid, "request rate limit hit");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    let per_ip = limit_override("RATE_LIMIT_PER_IP", RATE_LIMIT_PER_IP);
    if !LIMITER.check(&format!("ip:{}", ip), per_ip).await {
        tracing::warn!(ip = %ip, "request rate limit hit");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(request).await)
}
