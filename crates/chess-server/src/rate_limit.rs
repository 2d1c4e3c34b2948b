//! Per-caller fixed-window rate limiting.
//!
//! A caller is identified by the first `X-Forwarded-For` entry when the
//! server sits behind a proxy, else by the peer address.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Windows are pruned once the map grows past this many callers.
const PRUNE_THRESHOLD: usize = 4_096;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// `limit` requests per `window`; a limit of 0 disables the limiter.
    pub fn new(limit: u32, window: Duration) -> Self {
        RateLimiter {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        RateLimiter::new(limit, Duration::from_secs(60))
    }

    pub fn per_second(limit: u32) -> Self {
        RateLimiter::new(limit, Duration::from_secs(1))
    }

    /// Count one request from `caller`. Returns false if it is over the limit.
    pub fn check(&self, caller: &str) -> bool {
        self.check_at(caller, Instant::now())
    }

    fn check_at(&self, caller: &str, now: Instant) -> bool {
        if self.limit == 0 {
            return true;
        }

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(caller.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Who is calling, for rate limiting and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerKey(pub String);

impl<S> FromRequestParts<S> for CallerKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return Ok(CallerKey(ip.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(CallerKey(peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn window_limits_then_resets() {
        let limiter = RateLimiter::per_second(2);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(limiter.check_at("a", t0));
        assert!(!limiter.check_at("a", t0 + Duration::from_millis(500)));
        // Separate callers, separate budgets.
        assert!(limiter.check_at("b", t0));
        // New window.
        assert!(limiter.check_at("a", t0 + Duration::from_millis(1_000)));
    }

    #[test]
    fn zero_disables() {
        let limiter = RateLimiter::per_minute(0);
        for _ in 0..100 {
            assert!(limiter.check("a"));
        }
    }

    #[tokio::test]
    async fn caller_key_prefers_forwarded_for() {
        let req = Request::builder()
            .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let key = CallerKey::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(key, CallerKey("203.0.113.7".into()));
    }

    #[tokio::test]
    async fn caller_key_falls_back_to_peer() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts
            .extensions
            .insert(ConnectInfo("198.51.100.2:5555".parse::<SocketAddr>().unwrap()));
        let key = CallerKey::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(key, CallerKey("198.51.100.2".into()));
    }
}
