//! Runtime statistics.
//!
//! Counters are atomics so the monitor task can snapshot them while the
//! reactor runs; only the reactor ever mutates them.

use crate::types::{now, Protocol};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct HoneypotStats {
    total_connections: AtomicU64,
    attacks_logged: AtomicU64,
    rate_limited: AtomicU64,
    http_attacks: AtomicU64,
    telnet_attacks: AtomicU64,
    ftp_attacks: AtomicU64,
    mqtt_attacks: AtomicU64,
    start_time: AtomicU64,
}

/// Point-in-time copy for external readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_connections: u64,
    pub attacks_logged: u64,
    pub rate_limited: u64,
    pub http_attacks: u64,
    pub telnet_attacks: u64,
    pub ftp_attacks: u64,
    pub mqtt_attacks: u64,
    pub start_time: u64,
}

impl HoneypotStats {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            attacks_logged: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            http_attacks: AtomicU64::new(0),
            telnet_attacks: AtomicU64::new(0),
            ftp_attacks: AtomicU64::new(0),
            mqtt_attacks: AtomicU64::new(0),
            start_time: AtomicU64::new(now()),
        }
    }

    pub fn record_connection(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attack(&self, proto: Protocol) {
        self.attacks_logged.fetch_add(1, Ordering::Relaxed);
        let counter = match proto {
            Protocol::Http => &self.http_attacks,
            Protocol::Telnet => &self.telnet_attacks,
            Protocol::Ftp => &self.ftp_attacks,
            Protocol::Mqtt => &self.mqtt_attacks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            attacks_logged: self.attacks_logged.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            http_attacks: self.http_attacks.load(Ordering::Relaxed),
            telnet_attacks: self.telnet_attacks.load(Ordering::Relaxed),
            ftp_attacks: self.ftp_attacks.load(Ordering::Relaxed),
            mqtt_attacks: self.mqtt_attacks.load(Ordering::Relaxed),
            start_time: self.start_time.load(Ordering::Relaxed),
        }
    }

    /// Zero all counters and restart the clock.
    pub fn reset(&self) {
        self.total_connections.store(0, Ordering::Relaxed);
        self.attacks_logged.store(0, Ordering::Relaxed);
        self.rate_limited.store(0, Ordering::Relaxed);
        self.http_attacks.store(0, Ordering::Relaxed);
        self.telnet_attacks.store(0, Ordering::Relaxed);
        self.ftp_attacks.store(0, Ordering::Relaxed);
        self.mqtt_attacks.store(0, Ordering::Relaxed);
        self.start_time.store(now(), Ordering::Relaxed);
    }
}

impl Default for HoneypotStats {
    fn default() -> Self {
        Self::new()
    }
}
