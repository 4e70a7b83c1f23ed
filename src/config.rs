//! Honeypot configuration and compile-time limits.
//!
//! # Design Goals
//!
//! 1. **Bounded memory usage** — session count, per-session byte budget,
//!    log ring and rate-limiter table all have hard caps. A scanner cannot
//!    exhaust memory by connecting often or sending large payloads.
//!
//! 2. **DoS resistance** — per-IP sliding-window admission control plus a
//!    global session cap keep the reactor responsive under floods.
//!
//! 3. **Plausibility over compliance** — the service banners below only
//!    need to be convincing enough for automated attackers; they are not
//!    protocol-conformant implementations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Honeypot version, reported in the startup banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// NETWORK LIMITS
// =============================================================================

/// Maximum number of listening ports.
pub const MAX_LISTENING_PORTS: usize = 6;

/// Maximum concurrent accepted sessions.
/// Arrivals beyond this are closed immediately without a read.
pub const MAX_CONCURRENT_CONNECTIONS: usize = 6;

/// Idle timeout for a session. Scanners that connect and go quiet are
/// reaped on the periodic sweep.
pub const CONNECTION_TIMEOUT_MS: u64 = 10_000;

/// Interval between idle sweeps (monotonic time).
pub const CLEANUP_INTERVAL_MS: u64 = 5_000;

/// Per-session inbound byte budget. Bytes past this are read and
/// discarded so a peer cannot grow the session buffer unboundedly.
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// Read chunk per readiness wakeup.
pub const READ_CHUNK_SIZE: usize = 512;

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Sliding window over which per-IP connections are counted.
pub const RATE_LIMIT_WINDOW_MS: u64 = 60_000;

/// Admissions allowed per source IP within the window.
pub const RATE_LIMIT_MAX_CONNECTIONS: usize = 10;

/// Maximum distinct source IPs tracked by the rate limiter.
/// The least-recently-seen bucket is evicted beyond this, so the table
/// stays bounded no matter how many addresses probe us.
pub const RATE_LIMIT_MAX_TRACKED_IPS: usize = 4 * RATE_LIMIT_MAX_CONNECTIONS;

// =============================================================================
// LOGGING
// =============================================================================

/// Capacity of the in-memory attack log ring.
pub const MAX_LOG_ENTRIES: usize = 100;

/// Byte cap for the durable log mirror. On overflow the file is rotated
/// by dropping its oldest half.
pub const FLASH_LOG_SIZE: u64 = 16 * 1024;

/// Hash at most this many leading payload bytes per record.
pub const PAYLOAD_HASH_LIMIT: usize = 512;

// =============================================================================
// SERVICE BANNERS
// =============================================================================

/// FTP control-channel greeting.
pub const FTP_BANNER: &str = "220 FTP Server Ready\r\n";

/// Telnet greeting, followed by the login prompt.
pub const TELNET_BANNER: &str = "\r\nWelcome to Device Login\r\n\r\n";

/// Telnet username prompt.
pub const TELNET_LOGIN_PROMPT: &str = "login: ";

/// Telnet password prompt.
pub const TELNET_PASSWORD_PROMPT: &str = "Password: ";

/// MQTT CONNACK, return code 0x05 (Not Authorized).
pub const MQTT_CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x05];

// =============================================================================
// RUNTIME CONFIGURATION
// =============================================================================

/// Default listening ports (HTTP 80/8080, Telnet 23/2323, FTP 21,
/// MQTT 1883).
pub const DEFAULT_PORTS: [u16; 6] = [80, 23, 21, 1883, 8080, 2323];

/// Runtime configuration. Mutable only while the reactor is stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoneypotConfig {
    /// Ports to listen on. Each must belong to a known protocol family.
    pub ports: Vec<u16>,
    /// Maximum concurrent sessions.
    pub max_connections: usize,
    /// Session idle timeout in milliseconds.
    pub connection_timeout_ms: u64,
    /// Hand captured records to the attack logger.
    pub enable_logging: bool,
    /// Expose records for off-device upload (transport is external).
    pub enable_remote_upload: bool,
    /// Directory holding the durable log mirror.
    pub data_dir: PathBuf,
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.to_vec(),
            max_connections: MAX_CONCURRENT_CONNECTIONS,
            connection_timeout_ms: CONNECTION_TIMEOUT_MS,
            enable_logging: true,
            enable_remote_upload: false,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl HoneypotConfig {
    /// Validate the configuration against the closed port set and the
    /// compile-time limits.
    pub fn validate(&self) -> Result<(), crate::error::HoneypotError> {
        use crate::error::HoneypotError;
        use crate::types::Protocol;

        if self.ports.is_empty() {
            return Err(HoneypotError::InvalidArg("no listening ports configured"));
        }
        if self.ports.len() > MAX_LISTENING_PORTS {
            return Err(HoneypotError::InvalidArg("too many listening ports"));
        }
        for &port in &self.ports {
            if Protocol::classify(port).is_none() {
                return Err(HoneypotError::InvalidArg("port has no protocol mapping"));
            }
        }
        if self.max_connections == 0 {
            return Err(HoneypotError::InvalidArg("max_connections must be nonzero"));
        }
        if self.connection_timeout_ms == 0 {
            return Err(HoneypotError::InvalidArg("connection_timeout_ms must be nonzero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(HoneypotConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_port_rejected() {
        let cfg = HoneypotConfig {
            ports: vec![80, 31337],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_ports_rejected() {
        let cfg = HoneypotConfig {
            ports: vec![],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
