//! In-memory sliding-window rate limiter for the login endpoint.
use axum::{extract::ConnectInfo, http::HeaderMap};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Records a request for `identifier` and reports whether it is within the limit.
    pub async fn check(&self, identifier: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let history = requests.entry(identifier.to_string()).or_default();
        history.retain(|&timestamp| now.duration_since(timestamp) < self.window);

        if history.len() < self.max_requests {
            history.push(now);
            true
        } else {
            false
        }
    }

    /// Drops identifiers with no requests inside the window.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        requests.retain(|_, history| {
            history.retain(|&timestamp| now.duration_since(timestamp) < self.window);
            !history.is_empty()
        });

        tracing::debug!("Rate limiter cleanup: {} active identifiers", requests.len());
    }
}

/// Client address: first `X-Forwarded-For` hop, then the socket peer.
pub fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
