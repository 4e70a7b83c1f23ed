//! Low-interaction IoT honeypot.
//!
//! Listens on a closed set of TCP ports, impersonates HTTP, Telnet, FTP
//! and MQTT just deeply enough to harvest credentials and payload
//! fingerprints from automated attackers, and records every attempt as a
//! bounded [`AttackRecord`] kept in a crash-safe ring with a durable
//! JSON-lines mirror.

pub mod config;
pub mod error;
pub mod flash;
pub mod logger;
pub mod net;
pub mod rate_limit;
pub mod services;
pub mod stats;
pub mod types;

pub use config::{HoneypotConfig, DEFAULT_PORTS, VERSION};
pub use error::HoneypotError;
pub use logger::{AttackLogger, LoggerStats};
pub use net::{Honeypot, HoneypotHandle};
pub use rate_limit::RateLimiter;
pub use stats::{HoneypotStats, StatsSnapshot};
pub use types::{AttackRecord, Protocol};
