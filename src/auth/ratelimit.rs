//! Per-IP request rate limiting
//!
//! This module provides IP-based request rate limiting over a fixed
//! window. Once an IP exhausts its allowance the remaining requests in
//! the window are rejected; the counter resets when the window rolls over.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Entry tracking requests for an IP address
#[derive(Debug, Clone)]
struct WindowEntry {
    /// Number of requests in the current window
    count: u32,

    /// Start of the current window
    window_start: Instant,
}

impl WindowEntry {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }
}

/// Request rate limiter
///
/// Thread-safe limiter that counts requests per IP over a rolling window.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    entries: RwLock<HashMap<IpAddr, WindowEntry>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a limiter allowing `max_requests` per second
    pub fn per_second(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    /// Maximum number of requests allowed per window
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count one request from an IP
    ///
    /// Returns `true` if the request fits within the allowance
    pub fn allow(&self, ip: IpAddr) -> bool {
        let mut entries = self.entries.write().unwrap();
        let now = Instant::now();

        let entry = entries.entry(ip).or_insert_with(WindowEntry::new);

        // Roll the window over once it has elapsed
        if now.duration_since(entry.window_start) >= self.window {
            *entry = WindowEntry::new();
        }

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }

    /// Get the number of requests counted for an IP in its current window
    ///
    /// Returns 0 if nothing is recorded or the window has elapsed
    pub fn request_count(&self, ip: IpAddr) -> u32 {
        let entries = self.entries.read().unwrap();
        let now = Instant::now();

        if let Some(entry) = entries.get(&ip) {
            if now.duration_since(entry.window_start) >= self.window {
                return 0;
            }
            return entry.count;
        }

        0
    }

    /// Clean up entries whose window has elapsed
    ///
    /// Should be called periodically to free memory
    pub fn cleanup(&self) {
        let mut entries = self.entries.write().unwrap();
        let now = Instant::now();

        entries.retain(|_, entry| now.duration_since(entry.window_start) < self.window);
    }

    /// Get current number of tracked IPs
    pub fn tracked_ips_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}
