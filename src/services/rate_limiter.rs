//! Login rate limiting
//!
//! Two sliding windows guard the login endpoint:
//! - failed attempts per username (case-insensitive): 5 per 15 minutes
//! - login requests per client IP: 10 per minute

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

pub const USERNAME_LIMIT: usize = 5;
pub const USERNAME_WINDOW_MINUTES: i64 = 15;
pub const IP_LIMIT: usize = 10;
pub const IP_WINDOW_MINUTES: i64 = 1;

/// Timestamps of recent hits per key, pruned lazily
struct SlidingWindow<K> {
    hits: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
    limit: usize,
    window: Duration,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            hits: RwLock::new(HashMap::new()),
            limit,
            window,
        }
    }

    /// Seconds until the key may try again, or `None` when it is not limited
    async fn retry_after(&self, key: K) -> Option<i64> {
        let now = Utc::now();
        let cutoff = now - self.window;
        let mut hits = self.hits.write().await;
        let times = hits.entry(key).or_default();
        times.retain(|t| *t > cutoff);

        if times.len() < self.limit {
            return None;
        }
        let oldest = times.iter().min().copied().unwrap_or(now);
        Some(((oldest + self.window) - now).num_seconds().max(1))
    }

    async fn record(&self, key: K) {
        self.hits.write().await.entry(key).or_default().push(Utc::now());
    }

    async fn clear(&self, key: &K) {
        self.hits.write().await.remove(key);
    }

    async fn sweep(&self) {
        let cutoff = Utc::now() - self.window;
        self.hits.write().await.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
    }
}

pub struct LoginRateLimiter {
    by_username: SlidingWindow<String>,
    by_ip: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            by_username: SlidingWindow::new(USERNAME_LIMIT, Duration::minutes(USERNAME_WINDOW_MINUTES)),
            by_ip: SlidingWindow::new(IP_LIMIT, Duration::minutes(IP_WINDOW_MINUTES)),
        }
    }

    /// `Some(seconds)` while the username has too many recent failures
    pub async fn username_retry_after(&self, username: &str) -> Option<i64> {
        self.by_username.retry_after(username.to_lowercase()).await
    }

    pub async fn record_failed_attempt(&self, username: &str) {
        self.by_username.record(username.to_lowercase()).await;
    }

    /// Forget failures after a successful login
    pub async fn clear_username_attempts(&self, username: &str) {
        self.by_username.clear(&username.to_lowercase()).await;
    }

    /// `Some(seconds)` while the IP has sent too many login requests
    pub async fn ip_retry_after(&self, ip: IpAddr) -> Option<i64> {
        self.by_ip.retry_after(ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.by_ip.record(ip).await;
    }

    /// Drop expired entries; run periodically
    pub async fn cleanup(&self) {
        self.by_username.sweep().await;
        self.by_ip.sweep().await;
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
