//! Per-source-IP admission control with a sliding window.
//!
//! Each source IP owns a FIFO of admission timestamps. A connection is
//! admitted when, after evicting entries older than the window, fewer
//! than `RATE_LIMIT_MAX_CONNECTIONS` remain. Eviction runs before the
//! count check, so an arrival exactly at the window boundary is admitted.
//!
//! The bucket table itself is bounded: beyond `RATE_LIMIT_MAX_TRACKED_IPS`
//! distinct addresses the least-recently-seen bucket is evicted, and each
//! check opportunistically sweeps a few stale buckets.

use crate::config::{
    RATE_LIMIT_MAX_CONNECTIONS, RATE_LIMIT_MAX_TRACKED_IPS, RATE_LIMIT_WINDOW_MS,
};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Stale buckets examined per check.
const GC_SWEEP_BUCKETS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub tracked_ips: usize,
    pub evicted_buckets: u64,
}

pub struct RateLimiter {
    window: Duration,
    max_per_window: usize,
    max_tracked: usize,
    buckets: HashMap<IpAddr, VecDeque<Instant>>,
    /// Least-recently-checked first.
    access_order: VecDeque<IpAddr>,
    evicted_buckets: u64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(
            RATE_LIMIT_WINDOW_MS,
            RATE_LIMIT_MAX_CONNECTIONS,
            RATE_LIMIT_MAX_TRACKED_IPS,
        )
    }

    pub fn with_limits(window_ms: u64, max_per_window: usize, max_tracked: usize) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            max_per_window,
            max_tracked: max_tracked.max(1),
            buckets: HashMap::new(),
            access_order: VecDeque::new(),
            evicted_buckets: 0,
        }
    }

    /// Check and record an admission. Returns true if allowed.
    pub fn check(&mut self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    /// Deterministic-clock variant of [`check`](Self::check).
    pub fn check_at(&mut self, ip: IpAddr, now: Instant) -> bool {
        self.sweep_stale(now);

        if !self.buckets.contains_key(&ip) && self.buckets.len() >= self.max_tracked {
            self.evict_lru();
        }

        let window = self.window;
        let bucket = self.buckets.entry(ip).or_default();
        while let Some(&oldest) = bucket.front() {
            if now.duration_since(oldest) >= window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        let admit = bucket.len() < self.max_per_window;
        if admit {
            bucket.push_back(now);
        }
        self.touch(ip);
        admit
    }

    /// Admissions currently counted against `ip`.
    pub fn bucket_len(&self, ip: IpAddr) -> usize {
        self.buckets.get(&ip).map(VecDeque::len).unwrap_or(0)
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            tracked_ips: self.buckets.len(),
            evicted_buckets: self.evicted_buckets,
        }
    }

    fn touch(&mut self, ip: IpAddr) {
        self.access_order.retain(|&a| a != ip);
        self.access_order.push_back(ip);
    }

    /// Drop up to `GC_SWEEP_BUCKETS` buckets whose every entry has aged
    /// out of the window.
    fn sweep_stale(&mut self, now: Instant) {
        let mut examined = 0;
        let mut idx = 0;
        while examined < GC_SWEEP_BUCKETS && idx < self.access_order.len() {
            let ip = self.access_order[idx];
            let stale = self
                .buckets
                .get(&ip)
                .map(|b| {
                    b.back()
                        .map(|&t| now.duration_since(t) >= self.window)
                        .unwrap_or(true)
                })
                .unwrap_or(true);
            if stale {
                self.buckets.remove(&ip);
                self.access_order.remove(idx);
                debug!("rate limiter: collected stale bucket for {}", ip);
            } else {
                idx += 1;
            }
            examined += 1;
        }
    }

    fn evict_lru(&mut self) {
        if let Some(ip) = self.access_order.pop_front() {
            self.buckets.remove(&ip);
            self.evicted_buckets += 1;
            debug!("rate limiter: evicted LRU bucket for {}", ip);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
